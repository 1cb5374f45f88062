use std::net::SocketAddr;

use anyhow::Context;

use turnstile_api::config::AppConfig;
use turnstile_api::tls;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    turnstile_observability::init();

    let config = AppConfig::from_env().context("invalid configuration")?;

    if rustls::crypto::ring::default_provider().install_default().is_err() {
        tracing::debug!("rustls crypto provider already installed");
    }

    let keystore = tls::generate_self_signed(&config.keystore_dir, &config.tls_domains)
        .context("failed to generate keystore")?;
    let tls_config = keystore
        .rustls_config()
        .await
        .context("failed to load keystore")?;

    let app = turnstile_api::app::build_app(&config).await?;

    let http_addr = SocketAddr::new(config.host, config.http_port);
    let https_addr = SocketAddr::new(config.host, config.https_port);

    let listener = tokio::net::TcpListener::bind(http_addr)
        .await
        .with_context(|| format!("failed to bind {http_addr}"))?;

    tracing::info!(%http_addr, %https_addr, "listening");

    let plain = async {
        axum::serve(listener, app.clone())
            .await
            .context("http server failed")
    };
    let secure = async {
        axum_server::bind_rustls(https_addr, tls_config)
            .serve(app.clone().into_make_service())
            .await
            .context("https server failed")
    };

    tokio::try_join!(plain, secure)?;
    Ok(())
}
