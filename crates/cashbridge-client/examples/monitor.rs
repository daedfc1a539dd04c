//! Connects to a running bridge service and logs hardware activity.
//!
//! Run with:
//!
//! ```sh
//! cargo run --example monitor
//! ```
//!
//! Set `BRIDGE_URL` to point at a bridge on a non-default endpoint.

use cashbridge_client::protocol::{CreditEvent, EventKind};
use cashbridge_client::{BridgeClient, BridgeConfig};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> cashbridge_core::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut config = BridgeConfig::default();
    if let Ok(url) = std::env::var("BRIDGE_URL") {
        config.url = url;
    }

    let client = BridgeClient::with_config(config);

    client.on(EventKind::Credit, |event| match event.payload::<CreditEvent>() {
        Ok(credit) => info!(
            denomination = credit.denomination,
            device = %credit.device_id,
            "Credit accepted"
        ),
        Err(e) => warn!(error = %e, "Unreadable credit payload"),
    });
    client.on(EventKind::Jam, |event| {
        warn!(device = %event.device_id, "Device jammed");
    });
    client.on(EventKind::Status, |event| {
        info!(device = %event.device_id, data = ?event.data, "Device status");
    });
    client.on(EventKind::Disconnected, |_| {
        warn!("Bridge connection lost");
    });

    client.connect().await?;

    match client.request_hopper_levels().await {
        Ok(hoppers) => {
            for hopper in hoppers {
                info!(
                    hopper = %hopper.hopper_id,
                    denomination = hopper.denomination,
                    level = hopper.current_level,
                    capacity = hopper.capacity,
                    low = hopper.is_low(),
                    "Hopper level"
                );
            }
        }
        Err(e) => warn!(error = %e, "Hopper level snapshot failed"),
    }

    client.start_session();
    client.enable_acceptance();
    info!("Session started; accepting money. Ctrl-C to stop.");

    tokio::signal::ctrl_c()
        .await
        .map_err(cashbridge_core::Error::Io)?;

    client.disable_acceptance();
    client.end_session();
    client.disconnect().await;
    Ok(())
}
