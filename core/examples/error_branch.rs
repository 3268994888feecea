// seqflow/examples/error_branch.rs

use seqflow::{Chain, SequencerError};
use std::time::Duration;
use tracing::{info, warn};

#[derive(Clone, Debug)]
enum Payment {
  Authorized(u64),
  Declined(String),
}

#[tokio::main]
async fn main() -> Result<(), SequencerError> {
  tracing_subscriber::fmt().with_max_level(tracing::Level::INFO).init();

  info!("--- Error Branch Example ---");

  let chain = Chain::<Payment>::new("payment");
  chain
    .process(|_, handler| {
      // Completion arrives later, from a spawned task.
      tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        handler.fail(Payment::Declined("card expired".to_string()));
      });
    })
    .process(|payment, handler| {
      info!(?payment, "Capturing payment.");
      handler.advance(Payment::Authorized(0));
    })
    .error(|payment, _handler| {
      warn!(?payment, "Payment failed, notifying customer.");
    })
    .finalize()
    .run()?;

  tokio::time::sleep(Duration::from_millis(50)).await;
  for snapshot in chain.snapshot() {
    info!(step = %snapshot.id, kind = %snapshot.kind, status = ?snapshot.status, "Final state.");
  }
  Ok(())
}
