use std::path::Path;
use std::process::{Command, Stdio};

use crate::config::RendererConfig;
use crate::error::{AppError, Result};

const STDERR_TAIL: usize = 2000;

pub trait HtmlRenderer: Send + Sync {
    /// Write `output_dir/output_name` from the PDF at `input`.
    fn render(&self, input: &Path, output_dir: &Path, output_name: &str) -> Result<()>;
}

/// Runs pdf2htmlEX, optionally behind a wrapper such as `docker run ...`.
///
/// No timeout is applied; a hung renderer blocks its caller.
#[derive(Debug, Clone)]
pub struct Pdf2HtmlEx {
    program: String,
    wrapper_args: Vec<String>,
    args: Vec<String>,
}

impl Pdf2HtmlEx {
    pub fn from_config(config: &RendererConfig) -> Self {
        Self {
            program: config.program.clone(),
            wrapper_args: config.wrapper_args.clone(),
            args: config.args.clone(),
        }
    }

    fn command(&self, input: &Path, output_dir: &Path, output_name: &str) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.wrapper_args)
            .args(&self.args)
            .arg("--dest-dir")
            .arg(output_dir)
            .arg(input)
            .arg(output_name)
            .stdin(Stdio::null());
        cmd
    }
}

impl HtmlRenderer for Pdf2HtmlEx {
    fn render(&self, input: &Path, output_dir: &Path, output_name: &str) -> Result<()> {
        let mut cmd = self.command(input, output_dir, output_name);
        tracing::debug!("Running renderer: {:?}", cmd);

        let output = cmd.output().map_err(|e| AppError::Render {
            status: "spawn failed".to_string(),
            stderr: format!("{}: {}", self.program, e),
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stderr = stderr.trim();
            let skip = stderr.chars().count().saturating_sub(STDERR_TAIL);
            return Err(AppError::Render {
                status: output.status.to_string(),
                stderr: stderr.chars().skip(skip).collect(),
            });
        }
        Ok(())
    }
}
