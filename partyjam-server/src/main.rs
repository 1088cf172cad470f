use log::info;
use partyjam_core::{Config, PartyJam};

#[tokio::main]
async fn main() {
    partyjam_server::logging::init_logger();

    info!("Starting partyjam...");
    let partyjam = PartyJam::new(Config::default());

    partyjam_server::run_server(partyjam).await
}
