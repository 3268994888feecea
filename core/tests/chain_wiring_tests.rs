// tests/chain_wiring_tests.rs
mod common;

use common::*;
use seqflow::{Chain, StepKind};

// One recording step per entry of `layout`.
fn build(layout: &[StepKind], recorder: &Recorder) -> Chain<i32> {
  let chain = Chain::<i32>::new("layout");
  for kind in layout {
    match kind {
      StepKind::Process => chain.process(adding_step(recorder, "p", 1)),
      StepKind::ErrorHandler => chain.error(recording_step(recorder, "e")),
      StepKind::State => chain.state(recording_step(recorder, "s")),
      _ => unreachable!("layouts only use process, error and state"),
    };
  }
  chain
}

#[test]
fn test_each_process_step_links_to_nearest_following_process() {
  use StepKind::*;
  let layouts: Vec<Vec<StepKind>> = vec![
    vec![Process, Process],
    vec![Process, ErrorHandler, Process, Process],
    vec![State, Process, State, ErrorHandler, Process, ErrorHandler],
    vec![Process, Process, Process, Process, Process],
  ];

  for layout in layouts {
    let chain = build(&layout, &Recorder::new());
    chain.finalize();
    let steps = chain.steps();

    for (idx, step) in steps.iter().enumerate() {
      let expected_next = steps[idx + 1..]
        .iter()
        .find(|s| s.kind() == Process)
        .filter(|_| step.kind() == Process)
        .map(|s| s.id());
      let expected_error = steps[idx + 1..]
        .iter()
        .find(|s| s.kind() == ErrorHandler)
        .filter(|_| step.kind() == Process)
        .map(|s| s.id());

      assert_eq!(step.next_step_id(), expected_next, "layout {:?}, step {}", layout, idx);
      assert_eq!(step.error_handler_id(), expected_error, "layout {:?}, step {}", layout, idx);
    }

    let last_process = steps.iter().rev().find(|s| s.kind() == Process).unwrap();
    assert_eq!(last_process.next_step_id(), None);
  }
}

#[test]
fn test_finalize_twice_does_not_duplicate_invocations() {
  setup_tracing();
  let recorder = Recorder::new();
  let chain = Chain::<i32>::new("twice");
  chain
    .process(adding_step(&recorder, "a", 1))
    .process(adding_step(&recorder, "b", 1))
    .process(recording_step(&recorder, "c"));

  chain.finalize();
  let wiring: Vec<_> = chain.steps().iter().map(|s| (s.next_step_id(), s.error_handler_id())).collect();
  chain.finalize();
  let rewired: Vec<_> = chain.steps().iter().map(|s| (s.next_step_id(), s.error_handler_id())).collect();
  assert_eq!(wiring, rewired);

  chain.run().unwrap();
  assert_eq!(recorder.entries(), vec!["a:None", "b:Some(1)", "c:Some(2)"]);
}

#[test]
fn test_appending_after_finalize_requires_new_finalize() {
  let recorder = Recorder::new();
  let chain = Chain::<i32>::new("grow");
  chain.process(adding_step(&recorder, "a", 1)).finalize();
  assert!(chain.is_ready());

  chain.process(recording_step(&recorder, "b"));
  assert!(!chain.is_ready());
  assert!(chain.run().is_err());

  chain.finalize().run().unwrap();
  assert_eq!(recorder.entries(), vec!["a:None", "b:Some(1)"]);
}

#[test]
fn test_state_and_error_steps_are_never_link_sources() {
  let chain = build(
    &[StepKind::State, StepKind::ErrorHandler, StepKind::Process, StepKind::ErrorHandler],
    &Recorder::new(),
  );
  chain.finalize();
  let steps = chain.steps();
  assert_eq!(steps[0].next_step_id(), None);
  assert_eq!(steps[1].error_handler_id(), None);
  assert_eq!(steps[2].error_handler_id(), Some(steps[3].id()));
}
