// seqflow/examples/basic_chain.rs

use seqflow::{Chain, SequencerError, StepStatus};
use tracing::info;

#[derive(Clone, Debug, Default)]
struct Order {
  id: u32,
  total_cents: u64,
  log: Vec<String>,
}

fn main() -> Result<(), SequencerError> {
  tracing_subscriber::fmt().with_max_level(tracing::Level::DEBUG).init();

  info!("--- Basic Chain Example ---");

  let chain = Chain::<Order>::new("order");
  chain
    .process(|_, handler| {
      let order = Order {
        id: 7,
        total_cents: 1_250,
        log: vec!["created".to_string()],
      };
      info!(step = %handler.step().id(), "Creating order.");
      handler.advance(order);
    })
    .process(|order, handler| {
      let mut order = order.unwrap_or_default();
      order.total_cents += 300;
      order.log.push("shipping added".to_string());
      handler.advance(order);
    })
    .process(|order, handler| {
      let mut order = order.unwrap_or_default();
      order.log.push("confirmed".to_string());
      info!(id = order.id, total = order.total_cents, "Order confirmed.");
      handler.advance(order);
    })
    .finalize()
    .run()?;

  for snapshot in chain.snapshot() {
    assert_eq!(snapshot.status, StepStatus::Done);
    info!(step = %snapshot.id, kind = %snapshot.kind, log = ?snapshot.last_data.as_ref().map(|o| &o.log), "Step finished.");
  }
  Ok(())
}
