use tracing::info;

use loginlab_web::config::WebServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    // Config
    // - LOGINLAB_CONFIG points at an optional TOML file (host, port, locale, [[users]]).
    // - LOGINLAB_WEB_HOST / LOGINLAB_WEB_PORT / LOGINLAB_LOCALE override it.
    let cfg = WebServerConfig::from_env()?;

    info!(
        "Starting loginlab web on http://{}:{} (version {})",
        cfg.host,
        cfg.port,
        loginlab_common::VERSION
    );

    loginlab_web::server::serve(cfg).await
}
