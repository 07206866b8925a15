use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info};

#[derive(Debug, Serialize, Deserialize)]
pub struct Config {
    pub render: RenderConfig,
    #[serde(default)]
    pub publish: PublishConfig,
}

impl Config {
    pub fn trace_loaded(&self) {
        info!(
            program = %self.render.program,
            artifact_dir = %self.render.artifact_dir.display(),
            targets = self.render.targets.len(),
            publish_branch = %self.publish.publish_branch,
            "Loaded Config"
        );
        debug!(?self, "Config loaded (full debug)");
    }
}

/// What to render: the external renderer program and the ordered output targets.
#[derive(Debug, Serialize, Deserialize)]
pub struct RenderConfig {
    /// The external rendering command. Invoked once per target.
    pub program: String,
    #[serde(default = "default_encoding")]
    pub encoding: String,
    /// Where the renderer writes its output, and what publish syncs from.
    #[serde(default = "default_artifact_dir")]
    pub artifact_dir: PathBuf,
    #[serde(default = "RenderTarget::default_set")]
    pub targets: Vec<RenderTarget>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    Web,
    Pdf,
    Epub,
}

impl Format {
    /// Identifier passed to the external renderer.
    pub fn id(self) -> &'static str {
        match self {
            Format::Web => "web",
            Format::Pdf => "pdf",
            Format::Epub => "epub",
        }
    }
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

/// One output target plus its cosmetic options. The option values are opaque
/// here: they are forwarded to the renderer untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderTarget {
    pub format: Format,
    #[serde(default)]
    pub stylesheet: Option<String>,
    #[serde(default)]
    pub cover_image: Option<String>,
    #[serde(default)]
    pub before_body: Option<String>,
    #[serde(default)]
    pub after_body: Option<String>,
    #[serde(default)]
    pub citation_package: Option<String>,
    #[serde(default)]
    pub number_sections: Option<bool>,
}

impl RenderTarget {
    pub fn bare(format: Format) -> Self {
        RenderTarget {
            format,
            stylesheet: None,
            cover_image: None,
            before_body: None,
            after_body: None,
            citation_package: None,
            number_sections: None,
        }
    }

    /// The canonical target list when the config omits one: web, then PDF, then EPUB.
    pub fn default_set() -> Vec<RenderTarget> {
        vec![
            RenderTarget::bare(Format::Web),
            RenderTarget::bare(Format::Pdf),
            RenderTarget::bare(Format::Epub),
        ]
    }

    /// Pass-through flags for the external renderer, in declaration order.
    pub fn option_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        let mut push = |flag: &str, value: &str| {
            args.push(flag.to_string());
            args.push(value.to_string());
        };
        if let Some(v) = &self.stylesheet {
            push("--stylesheet", v);
        }
        if let Some(v) = &self.cover_image {
            push("--cover-image", v);
        }
        if let Some(v) = &self.before_body {
            push("--include-before", v);
        }
        if let Some(v) = &self.after_body {
            push("--include-after", v);
        }
        if let Some(v) = &self.citation_package {
            push("--citation-package", v);
        }
        if let Some(v) = self.number_sections {
            push("--number-sections", if v { "true" } else { "false" });
        }
        args
    }

    pub fn trace_loaded(&self) {
        info!(
            format = self.format.id(),
            options = self.option_args().len() / 2,
            "Loaded render target"
        );
    }
}

/// Where (and when) to publish the rendered artifacts.
#[derive(Debug, Serialize, Deserialize)]
pub struct PublishConfig {
    /// The long-lived branch holding the published book.
    #[serde(default = "default_publish_branch")]
    pub publish_branch: String,
    /// Publishing only happens for builds of this branch.
    #[serde(default = "default_source_branch")]
    pub source_branch: String,
    #[serde(default = "default_commit_name")]
    pub commit_name: String,
    #[serde(default = "default_commit_email")]
    pub commit_email: String,
    /// Overrides the GitHub remote derived from the repository slug.
    /// Mainly useful for publishing to a local repository in tests.
    #[serde(default)]
    pub remote: Option<String>,
}

impl Default for PublishConfig {
    fn default() -> Self {
        PublishConfig {
            publish_branch: default_publish_branch(),
            source_branch: default_source_branch(),
            commit_name: default_commit_name(),
            commit_email: default_commit_email(),
            remote: None,
        }
    }
}

fn default_encoding() -> String {
    "UTF-8".to_string()
}

fn default_artifact_dir() -> PathBuf {
    PathBuf::from("_book")
}

fn default_publish_branch() -> String {
    "gh-pages".to_string()
}

fn default_source_branch() -> String {
    "main".to_string()
}

fn default_commit_name() -> String {
    "bookpress".to_string()
}

fn default_commit_email() -> String {
    "bookpress@localhost".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_set_is_web_then_pdf_then_epub() {
        let formats: Vec<Format> = RenderTarget::default_set()
            .iter()
            .map(|t| t.format)
            .collect();
        assert_eq!(formats, vec![Format::Web, Format::Pdf, Format::Epub]);
    }

    #[test]
    fn option_args_forwards_declared_options_in_order() {
        let mut target = RenderTarget::bare(Format::Web);
        target.stylesheet = Some("style.css".into());
        target.citation_package = Some("natbib".into());
        target.number_sections = Some(true);
        assert_eq!(
            target.option_args(),
            vec![
                "--stylesheet",
                "style.css",
                "--citation-package",
                "natbib",
                "--number-sections",
                "true",
            ]
        );
    }

    #[test]
    fn bare_target_has_no_option_args() {
        assert!(RenderTarget::bare(Format::Epub).option_args().is_empty());
    }
}
