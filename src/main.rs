use std::sync::Arc;

use subnet_mesh::config::MeshConfig;
use subnet_mesh::membership::service::MeshNode;
use subnet_mesh::probe::IcmpProbe;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        // .with_max_level(tracing::Level::DEBUG)
        .with_max_level(tracing::Level::INFO)
        .init();

    let config = MeshConfig::default();
    let node = MeshNode::new(config.clone(), Arc::new(IcmpProbe::new())).await?;

    tracing::info!(
        "Starting node {} (registration port {}, acknowledgment port {})",
        node.local_address(),
        config.registration_port,
        config.acknowledgment_port
    );

    let report = node.initialize().await;
    tracing::info!(
        "Initial discovery: {} hosts scanned, {} registrations sent",
        report.hosts,
        report.registrations()
    );
    node.report_peers().await;

    let discovery = tokio::spawn(node.clone().run_periodic_discovery(config.discovery_interval));

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down");
    discovery.abort();

    Ok(())
}
