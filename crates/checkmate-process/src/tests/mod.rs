//! Tests that drive real child processes through `/bin/sh`.

use std::process::Command;
use std::time::Duration;

use crate::{OutputBatch, ProcessHandle};

mod behaviour;
mod unit;

/// Builds a `sh -c <script>` command.
fn shell(script: &str) -> Command {
    let mut command = Command::new("/bin/sh");
    command.arg("-c").arg(script);
    command
}

/// Spawns `script` with a short poll interval.
fn spawn_shell(script: &str) -> ProcessHandle {
    ProcessHandle::spawn(shell(script))
        .expect("spawn shell")
        .with_poll_interval(Duration::from_millis(50))
}

/// Runs the read loop to completion and concatenates every batch.
fn collect_all(handle: &mut ProcessHandle) -> OutputBatch {
    let mut all = OutputBatch::default();
    while let Some(batch) = handle.read_lines().expect("read lines") {
        all.stdout.extend(batch.stdout);
        all.stderr.extend(batch.stderr);
    }
    all
}
