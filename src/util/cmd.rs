//! Command logging for the git subprocess layer.

use std::process::Command;
use tracing::debug;

/// Log a command just before execution.
///
/// Renders the invocation as a single shell-like line so a `--verbose` run
/// reads as a transcript of the git calls made. Emitted at debug level with
/// target `shepr::cmd`, so `RUST_LOG=shepr::cmd=debug` isolates it.
pub fn log_cmd(cmd: &Command) {
    let line = render(cmd);
    match cmd.get_current_dir() {
        Some(dir) => debug!(target: "shepr::cmd", cwd = %dir.display(), "{line}"),
        None => debug!(target: "shepr::cmd", "{line}"),
    }
}

fn render(cmd: &Command) -> String {
    let mut line = cmd.get_program().to_string_lossy().into_owned();
    for arg in cmd.get_args() {
        let arg = arg.to_string_lossy();
        line.push(' ');
        if arg.contains(' ') {
            line.push('\'');
            line.push_str(&arg);
            line.push('\'');
        } else {
            line.push_str(&arg);
        }
    }
    line
}
