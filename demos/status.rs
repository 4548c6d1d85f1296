use std::env;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use mcstatus::{JavaServer, McServer, DEFAULT_TIMEOUT};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let address = env::args().nth(1).unwrap_or_else(|| "localhost".to_string());

    let server = JavaServer::lookup(&address)?;
    info!("Resolved {} to {} (handshake host {})", address, server, server.host());

    match server.ping(DEFAULT_TIMEOUT) {
        Ok(latency) => println!("ping: {:.1} ms", latency.as_secs_f64() * 1000.0),
        Err(e) => error!("Ping failed: {}", e),
    }

    let status = server.status_default()?;
    let common = status.common();
    println!("version: {} (protocol {})", common.version.name, common.version.protocol);
    println!("players: {}/{}", common.players.online, common.players.max);
    println!("motd:    {}", common.motd);
    println!("latency: {:.1} ms", common.latency.as_secs_f64() * 1000.0);

    Ok(())
}
