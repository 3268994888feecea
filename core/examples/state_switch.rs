// seqflow/examples/state_switch.rs

use seqflow::{Registry, SequencerError};
use tracing::info;

fn main() -> Result<(), SequencerError> {
  tracing_subscriber::fmt().with_max_level(tracing::Level::DEBUG).init();

  info!("--- State Switch Example ---");

  let registry = Registry::<String>::new();

  registry
    .register("splash")?
    .process(|_, handler| {
      info!("Showing splash screen.");
      handler.advance("assets loaded".to_string());
    })
    .process(|data, handler| {
      info!(?data, "Splash done.");
      handler.advance(String::new());
    })
    .finalize();

  registry
    .register("login")?
    .state(|_, handler| {
      // No stored session: go straight to the guest menu.
      if let Err(e) = handler.change_state("menu") {
        tracing::error!(error = %e, "State change failed.");
      }
    })
    .finalize();

  registry
    .register("menu")?
    .process(|_, handler| {
      info!("Menu shown as guest.");
      handler.advance("guest".to_string());
    })
    .finalize();

  registry.transition("splash")?;
  registry.transition("login")?;
  info!(active = ?registry.active(), chains = ?registry.names(), "Done.");
  Ok(())
}
