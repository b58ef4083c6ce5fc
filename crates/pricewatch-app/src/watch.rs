//! Terminal price watcher.
//!
//! Runs a synchronization controller against a remote pricewatch
//! server and prints the displayed price as updates arrive.

use crate::config::ClientConfig;
use crate::error::AppResult;
use pricewatch_client::{Backoff, ClientSyncController, RemoteControlPlane};
use pricewatch_core::ClientId;
use std::sync::Arc;
use tracing::info;

/// Watch a server's price stream until ctrl-c.
pub async fn run_watch(server: String, client: String, config: ClientConfig) -> AppResult<()> {
    let control = Arc::new(
        RemoteControlPlane::new(server).map_err(pricewatch_client::ClientError::Control)?,
    );
    let mut controller = ClientSyncController::new(
        control,
        ClientId::new(client),
        Backoff::new(config.into()),
    );

    controller.start().await?;
    println!("{}", controller.displayed_price());

    loop {
        let next = tokio::select! {
            _ = tokio::signal::ctrl_c() => None,
            update = controller.next_update() => Some(update),
        };

        match next {
            None => {
                info!("Shutdown signal received");
                controller.shutdown().await;
                return Ok(());
            }
            Some(update) => match update? {
                Some(update) => {
                    let marker = if update.breached { "  [breach]" } else { "" };
                    println!("{}{}", controller.displayed_price(), marker);
                }
                None => return Ok(()),
            },
        }
    }
}
