//! Behaviour-driven tests for the streaming read loop.

use std::cell::RefCell;

use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};

use super::{collect_all, spawn_shell};
use crate::{OutputBatch, ProcessHandle};

#[derive(Default)]
struct TestWorld {
    handle: Option<ProcessHandle>,
    output: OutputBatch,
}

#[fixture]
fn world() -> RefCell<TestWorld> {
    RefCell::new(TestWorld::default())
}

#[given("a checker that runs {script}")]
fn given_checker(world: &RefCell<TestWorld>, script: String) {
    let script_text = script.trim_matches('"');
    world.borrow_mut().handle = Some(spawn_shell(script_text));
}

#[when("the output is read to completion")]
fn when_read_all(world: &RefCell<TestWorld>) {
    let mut w = world.borrow_mut();
    let mut handle = w.handle.take().expect("checker was not started");
    w.output = collect_all(&mut handle);
    w.handle = Some(handle);
}

#[then("stdout holds {count} lines")]
fn then_stdout_count(world: &RefCell<TestWorld>, count: usize) {
    assert_eq!(world.borrow().output.stdout.len(), count);
}

#[then("stderr holds {count} lines")]
fn then_stderr_count(world: &RefCell<TestWorld>, count: usize) {
    assert_eq!(world.borrow().output.stderr.len(), count);
}

#[then("the last stdout line is {text}")]
fn then_last_stdout(world: &RefCell<TestWorld>, text: String) {
    let w = world.borrow();
    assert_eq!(
        w.output.stdout.last().map(String::as_str),
        Some(text.trim_matches('"'))
    );
}

#[then("further reads report no more output")]
fn then_sentinel(world: &RefCell<TestWorld>) {
    let mut w = world.borrow_mut();
    let handle = w.handle.as_mut().expect("checker was not started");
    assert!(handle.read_lines().expect("read lines").is_none());
    assert!(handle.read_lines().expect("read lines").is_none());
}

#[scenario(
    path = "tests/features/streaming.feature",
    name = "Interleaved streams are collected line by line"
)]
fn interleaved_streams(world: RefCell<TestWorld>) {
    drop(world);
}

#[scenario(
    path = "tests/features/streaming.feature",
    name = "Output written just before exit is not lost"
)]
fn output_before_exit(world: RefCell<TestWorld>) {
    drop(world);
}
