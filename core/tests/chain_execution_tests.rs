// tests/chain_execution_tests.rs
mod common;

use common::*;
use seqflow::{Chain, ErrorClass, Registry, SequencerError, StepKind, StepOptions, StepStatus};
use std::time::Duration;

#[test]
fn test_two_process_steps_pass_data_forward() {
  setup_tracing();
  let recorder = Recorder::new();
  let registry = Registry::<i32>::new();

  registry
    .register("main")
    .unwrap()
    .process(adding_step(&recorder, "f1", 1))
    .process(adding_step(&recorder, "f2", 1))
    .finalize()
    .run()
    .unwrap();

  assert_eq!(recorder.entries(), vec!["f1:None", "f2:Some(1)"]);
  let chain = registry.chain("main").unwrap();
  let first = &chain.steps()[0];
  assert_eq!(first.status(), StepStatus::Done);
  assert_eq!(first.last_data(), Some(1));
  // The last step advanced too, with nothing after it.
  assert_eq!(chain.steps()[1].status(), StepStatus::Done);
  assert_eq!(chain.steps()[1].last_data(), Some(2));
}

#[test]
fn test_fail_routes_to_error_handler() {
  setup_tracing();
  let recorder = Recorder::new();
  let registry = Registry::<i32>::new();

  registry
    .register("main")
    .unwrap()
    .process(failing_step(&recorder, "f1", 500))
    .error(recording_step(&recorder, "eh"))
    .finalize()
    .run()
    .unwrap();

  assert_eq!(recorder.entries(), vec!["f1:None", "eh:Some(500)"]);
  let chain = registry.chain("main").unwrap();
  assert_eq!(chain.steps()[0].status(), StepStatus::Error);
  assert_eq!(chain.steps()[0].last_data(), Some(500));
  assert_eq!(chain.steps()[1].status(), StepStatus::InProcess);
}

#[test]
fn test_error_handler_runs_once_and_skips_process_steps_in_between() {
  setup_tracing();
  let recorder = Recorder::new();
  let chain = Chain::<i32>::new("mixed");
  chain
    .process(adding_step(&recorder, "a", 1))
    .process(failing_step(&recorder, "b", 7))
    .process(recording_step(&recorder, "c"))
    .error(recording_step(&recorder, "eh"))
    .finalize();

  chain.run().unwrap();
  assert_eq!(recorder.entries(), vec!["a:None", "b:Some(1)", "eh:Some(7)"]);
  assert_eq!(recorder.count("eh:Some(7)"), 1);

  let statuses: Vec<_> = chain.snapshot().into_iter().map(|s| s.status).collect();
  assert_eq!(
    statuses,
    vec![StepStatus::Done, StepStatus::Error, StepStatus::Initial, StepStatus::InProcess]
  );
}

#[test]
fn test_fail_without_error_handler_stops_the_chain() {
  let recorder = Recorder::new();
  let chain = Chain::<i32>::new("unhandled");
  chain
    .process(failing_step(&recorder, "a", 1))
    .process(recording_step(&recorder, "b"))
    .finalize();

  chain.run().unwrap();
  assert_eq!(recorder.entries(), vec!["a:None"]);
  assert_eq!(chain.steps()[0].status(), StepStatus::Error);
  assert_eq!(chain.steps()[1].status(), StepStatus::Initial);
}

#[test]
fn test_run_requires_finalize() {
  let chain = Chain::<i32>::new("raw");
  chain.process(|_, _| {});
  let err = chain.run().unwrap_err();
  assert_eq!(
    err,
    SequencerError::NotReady {
      chain: "raw".into(),
      steps: 1,
    }
  );
  assert_eq!(err.class(), ErrorClass::State);
}

#[test]
fn test_run_on_empty_chain_fails() {
  let chain = Chain::<i32>::new("empty");
  let err = chain.finalize().run().unwrap_err();
  assert_eq!(err, SequencerError::EmptyChain { chain: "empty".into() });
  assert_eq!(err.class(), ErrorClass::State);
  assert!(err.to_string().contains("empty"));
}

#[test]
fn test_rerun_resets_statuses_and_restarts_from_first_step() {
  let recorder = Recorder::new();
  let parked = Parked::new();
  let chain = Chain::<i32>::new("rerun");
  chain
    .process(adding_step(&recorder, "a", 1))
    .process(parking_step(&recorder, "b", &parked))
    .process(recording_step(&recorder, "c"))
    .finalize();

  chain.run().unwrap();
  let stale = parked.take().unwrap();
  assert_eq!(chain.steps()[0].status(), StepStatus::Done);

  chain.run().unwrap();
  let fresh = parked.take().unwrap();
  assert_eq!(recorder.entries(), vec!["a:None", "b:Some(1)", "a:None", "b:Some(1)"]);

  // Both clones point at the same handler: one signal gets through.
  assert!(fresh.advance(10));
  assert!(!stale.advance(20));
  assert_eq!(recorder.entries().last().map(String::as_str), Some("c:Some(10)"));
}

#[tokio::test]
async fn test_deferred_signals_drive_the_chain() {
  setup_tracing();
  let recorder = Recorder::new();
  let chain = Chain::<i32>::new("deferred");
  let rec = recorder.clone();
  chain
    .process(move |_, handler| {
      rec.push("start");
      tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        handler.advance(41);
      });
    })
    .process(adding_step(&recorder, "sync", 1))
    .finalize();

  chain.run().unwrap();
  assert_eq!(recorder.entries(), vec!["start"]);
  assert_eq!(chain.steps()[0].status(), StepStatus::InProcess);

  tokio::time::sleep(Duration::from_millis(50)).await;
  assert_eq!(recorder.entries(), vec!["start", "sync:Some(41)"]);
  assert_eq!(chain.steps()[1].last_data(), Some(42));
}

#[test]
fn test_pushed_steps_without_exec_pass_data_through() {
  let recorder = Recorder::new();
  let chain = Chain::<i32>::new("passthrough");
  chain.process(adding_step(&recorder, "a", 5));
  chain.push(StepOptions::new(StepKind::Process)).unwrap();
  chain.push(StepOptions::new(StepKind::After).exec(recording_step(&recorder, "after"))).unwrap();
  chain.process(recording_step(&recorder, "b")).finalize();

  chain.run().unwrap();
  // AFTER steps are kept but never wired, so they never run.
  assert_eq!(recorder.entries(), vec!["a:None", "b:Some(5)"]);
  assert_eq!(chain.steps()[1].last_data(), Some(5));
  assert_eq!(chain.steps()[2].status(), StepStatus::Initial);
}

#[test]
fn test_first_step_without_exec_starts_the_next_one() {
  setup_tracing();
  let recorder = Recorder::new();
  let chain = Chain::<i32>::new("empty_start");
  chain.push(StepOptions::new(StepKind::Process)).unwrap();
  chain
    .process(adding_step(&recorder, "second", 1))
    .process(recording_step(&recorder, "third"))
    .finalize();

  chain.run().unwrap();
  assert_eq!(recorder.entries(), vec!["second:None", "third:Some(1)"]);
  let statuses: Vec<_> = chain.snapshot().into_iter().map(|s| s.status).collect();
  assert_eq!(
    statuses,
    vec![StepStatus::Done, StepStatus::Done, StepStatus::InProcess]
  );
  assert_eq!(chain.steps()[0].last_data(), None);
}

#[test]
fn test_push_rejects_options_without_kind() {
  let chain = Chain::<i32>::new("opts");
  let err = chain.push(StepOptions::default()).unwrap_err();
  assert_eq!(err, SequencerError::MissingOptions { chain: "opts".into() });
  assert_eq!(err.class(), ErrorClass::Configuration);
  assert!(chain.is_empty());
}

#[test]
fn test_explicit_and_default_contexts() {
  let recorder = Recorder::new();
  let chain = Chain::<i32>::new("ctx");
  let rec = recorder.clone();
  chain
    .process_in(100, |base: &i32, _data, handler| {
      handler.advance(*base);
    })
    .process(move |data, handler| {
      let step = handler.step();
      rec.push(format!("{}:{}:{:?}", step.chain(), step.kind(), data));
    })
    .finalize();

  chain.run().unwrap();
  assert_eq!(recorder.entries(), vec!["ctx:process:Some(100)"]);
}

#[test]
fn test_then_is_an_alias_of_process() {
  let recorder = Recorder::new();
  let chain = Chain::<i32>::new("alias");
  chain
    .then(adding_step(&recorder, "a", 1))
    .then(adding_step(&recorder, "b", 1))
    .finalize();
  chain.run().unwrap();
  assert!(chain.steps().iter().all(|s| s.kind() == StepKind::Process));
  assert_eq!(recorder.entries(), vec!["a:None", "b:Some(1)"]);
}

#[test]
fn test_lock_all_neutralizes_in_flight_step() {
  let recorder = Recorder::new();
  let parked = Parked::new();
  let chain = Chain::<i32>::new("locked");
  chain
    .process(parking_step(&recorder, "a", &parked))
    .process(recording_step(&recorder, "b"))
    .finalize();

  chain.run().unwrap();
  chain.lock_all();
  assert!(!parked.take().unwrap().advance(1));
  assert_eq!(recorder.entries(), vec!["a:None"]);
  assert_eq!(chain.steps()[0].status(), StepStatus::InProcess);
}
