//! `colloquy check` — verify the configured backend is reachable.

use crate::BackendArgs;
use anyhow::Context;
use colloquy_core::provider::Provider;

pub async fn run(args: BackendArgs) -> anyhow::Result<bool> {
    let provider = args.provider().context("configuring the backend")?;

    match provider.health_check().await {
        Ok(true) => {
            println!("{}: reachable (model: {})", provider.name(), args.model);
            Ok(true)
        }
        Ok(false) => {
            println!("{}: responded but unhealthy", provider.name());
            Ok(false)
        }
        Err(e) => {
            println!("{}: unreachable ({e})", provider.name());
            Ok(false)
        }
    }
}
