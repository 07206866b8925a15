//! Render-target orchestrator: one external renderer invocation per target,
//! in declared order, aborting on the first failure.

use std::process::{Command, ExitStatus};
use tracing::{error, info};

use crate::config::{Format, RenderConfig};

#[derive(Debug)]
pub enum RenderError {
    /// The renderer process could not be launched at all.
    Spawn {
        format: Format,
        source: std::io::Error,
    },
    /// The renderer ran and reported failure.
    Failed { format: Format, status: ExitStatus },
}

impl std::fmt::Display for RenderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RenderError::Spawn { format, source } => {
                write!(f, "failed to launch renderer for target '{format}': {source}")
            }
            RenderError::Failed { format, status } => {
                write!(f, "renderer failed for target '{format}': {status}")
            }
        }
    }
}

impl std::error::Error for RenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RenderError::Spawn { source, .. } => Some(source),
            RenderError::Failed { .. } => None,
        }
    }
}

/// Which targets actually rendered, for the CLI summary.
#[derive(Debug)]
pub struct RenderReport {
    pub rendered: Vec<Format>,
}

/// Invoke the configured renderer once per target, stopping at the first
/// failure. The renderer's own stdout/stderr pass through untouched; the only
/// diagnostics this run produces are its tracing events.
pub fn run(config: &RenderConfig) -> Result<RenderReport, RenderError> {
    let mut rendered = Vec::new();

    for target in &config.targets {
        let format = target.format;
        info!(
            program = %config.program,
            format = format.id(),
            encoding = %config.encoding,
            "Rendering target"
        );

        let status = Command::new(&config.program)
            .arg(format.id())
            .arg("--encoding")
            .arg(&config.encoding)
            .arg("--output")
            .arg(&config.artifact_dir)
            .args(target.option_args())
            .status();

        match status {
            Ok(s) if s.success() => {
                info!(
                    format = format.id(),
                    artifact_dir = %config.artifact_dir.display(),
                    status = ?s,
                    "Rendered target"
                );
                rendered.push(format);
            }
            Ok(s) => {
                error!(
                    format = format.id(),
                    "Renderer exited with non-zero code: {}", s
                );
                return Err(RenderError::Failed { format, status: s });
            }
            Err(e) => {
                error!(
                    error = ?e,
                    program = %config.program,
                    format = format.id(),
                    "Failed to launch renderer process"
                );
                return Err(RenderError::Spawn { format, source: e });
            }
        }
    }

    info!(count = rendered.len(), "All render targets completed");
    Ok(RenderReport { rendered })
}
