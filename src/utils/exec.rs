//! External command execution.
//!
//! Used to drive the bundler collaborator. Output streams are inherited so
//! the tool's own diagnostics reach the terminal unchanged.

use anyhow::{Context, Result, bail};
use std::path::Path;
use std::process::Command;

/// Run an external command in `cwd`. A non-zero exit status is an error.
pub fn run_command(command: &[String], cwd: &Path) -> Result<()> {
    let Some((program, args)) = command.split_first() else {
        bail!("empty command");
    };

    let status = Command::new(program)
        .args(args)
        .current_dir(cwd)
        .status()
        .with_context(|| format!("running `{program}`"))?;

    if !status.success() {
        bail!("`{}` exited with {status}", command.join(" "));
    }

    Ok(())
}
