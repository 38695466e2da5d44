//! Unit tests for the read loop.

use std::process::Command;
use std::time::{Duration, Instant};

use rstest::rstest;

use super::{collect_all, shell, spawn_shell};
use crate::{ProcessError, ProcessHandle, describe_status};

#[test]
fn separates_stdout_and_stderr() {
    let mut handle = spawn_shell("echo out; echo err >&2; echo more");
    let output = collect_all(&mut handle);

    assert_eq!(output.stdout, vec!["out", "more"]);
    assert_eq!(output.stderr, vec!["err"]);
}

#[test]
fn keeps_partial_line_until_newline_arrives() {
    let mut handle = spawn_shell("printf 'foo.py:1'; sleep 0.2; printf '0: late\\n'");
    let output = collect_all(&mut handle);

    assert_eq!(output.stdout, vec!["foo.py:10: late"]);
}

#[test]
fn drain_flushes_unterminated_fragments() {
    let mut handle = spawn_shell("printf 'no newline'; printf 'tail' >&2");
    let output = collect_all(&mut handle);

    assert_eq!(output.stdout, vec!["no newline"]);
    assert_eq!(output.stderr, vec!["tail"]);
}

#[test]
fn interleaved_bulk_output_does_not_deadlock() {
    let script = "i=0; while [ $i -lt 20000 ]; do echo \"out $i\"; echo \"err $i\" >&2; i=$((i+1)); done";
    let mut handle = spawn_shell(script);
    let output = collect_all(&mut handle);

    assert_eq!(output.stdout.len(), 20_000);
    assert_eq!(output.stderr.len(), 20_000);
    assert_eq!(output.stdout.last().map(String::as_str), Some("out 19999"));
    assert_eq!(output.stderr.first().map(String::as_str), Some("err 0"));
}

#[test]
fn read_lines_returns_sentinel_after_drain() {
    let mut handle = spawn_shell("echo done");
    let _ = collect_all(&mut handle);

    assert!(handle.is_drained());
    for _ in 0..3 {
        assert!(handle.read_lines().expect("read lines").is_none());
    }
}

#[test]
fn second_drain_is_rejected() {
    let mut handle = spawn_shell("true");
    let _ = collect_all(&mut handle);

    let error = handle.drain().expect_err("second drain must fail");
    assert!(matches!(error, ProcessError::AlreadyDrained));
}

#[test]
fn quiet_child_does_not_hang_past_poll_interval() {
    let start = Instant::now();
    let mut handle = spawn_shell("sleep 0.3");
    let output = collect_all(&mut handle);

    assert!(output.is_empty());
    assert!(start.elapsed() < Duration::from_secs(5));
}

#[rstest]
#[case("exit 0", "0")]
#[case("exit 3", "3")]
#[case("kill -9 $$", "signal 9")]
fn reports_exit_status(#[case] script: &str, #[case] expected: &str) {
    let mut handle = spawn_shell(script);
    let _ = collect_all(&mut handle);

    let status = handle.wait().expect("wait");
    assert_eq!(describe_status(status), expected);
}

#[test]
fn status_is_none_while_running() {
    let mut handle = spawn_shell("sleep 1");
    assert!(handle.status().expect("status").is_none());
}

#[test]
fn spawn_failure_is_reported() {
    let command = Command::new("/nonexistent/checker-binary");
    let error = ProcessHandle::spawn(command).expect_err("spawn must fail");
    assert!(matches!(error, ProcessError::Spawn { .. }), "got {error}");
    assert!(error.to_string().contains("checker-binary"));
}

#[test]
fn child_stdin_is_null() {
    let mut handle = ProcessHandle::spawn(shell("cat; echo end")).expect("spawn");
    let output = collect_all(&mut handle);
    assert_eq!(output.stdout, vec!["end"]);
}
