use anyhow::Result;
use tokio::io::{self, BufReader};
use tracing::info;
use trip_tracker::TrackerConfig;

use mileage::{HostConfig, Output};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    mileage::init_tracing();

    let config = TrackerConfig::from_env();
    let host = HostConfig::from_env();
    info!(plan = ?host.plan_tier, used = host.auto_trips_used, "starting mileage tracker");

    mileage::replay(BufReader::new(io::stdin()), Output::new(io::stdout()), config, host.quota())
        .await
}
