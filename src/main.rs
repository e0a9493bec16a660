#[tokio::main]
async fn main() -> anyhow::Result<()> {
    site_cloner::telemetry::init();
    let cfg = site_cloner::config::Config::load()?;
    let port = cfg.port;

    let (app, state) = site_cloner::build_app(cfg).await?;

    use tracing::info;
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "server starting");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(site_cloner::services::housekeeping::shutdown_signal())
        .await?;

    state.cloner.renderer().shutdown().await;
    info!("server stopped");
    Ok(())
}
