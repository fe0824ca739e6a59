//! Example: Keeping an ODP session alive
//!
//! Logs in (or resumes from the stored token), lets the refresh and
//! heartbeat schedulers run, and stops them on Ctrl-C.
//!
//! # Setup
//!
//! 1. Provide credentials through `.env` or the environment:
//!    ```bash
//!    export ODP_HOST=https://odp.example.com
//!    export ODP_USERNAME=bot
//!    export ODP_PASSWORD=...
//!    ```
//!
//! 2. Optionally resolve a data service:
//!    ```bash
//!    export ODP_APP=Adam
//!    export ODP_SERVICE=orders
//!    ```
//!
//! 3. Run this example:
//!    ```bash
//!    RUST_LOG=odp_session_infra=debug cargo run --example keep_alive
//!    ```

use odp_session_infra::{config, Authenticator, DocumentClient, ListOptions, ServiceDirectory};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = config::load()?;
    let auth = Authenticator::from_config(&config)?;
    let session = auth.resume_or_login(config.credentials()).await?;
    info!(user = session.username().unwrap_or("unknown"), "session ready");

    if let (Ok(app), Ok(service)) = (std::env::var("ODP_APP"), std::env::var("ODP_SERVICE")) {
        let transport = odp_session_infra::HttpTransport::from_config(&config.http)?;
        let directory = ServiceDirectory::new(
            std::sync::Arc::new(transport),
            auth.token_supplier(),
            config.endpoints(),
        );
        match DocumentClient::for_service(&directory, &app, &service).await {
            Ok(documents) => {
                let page = documents.list(&ListOptions::default().count(5)).await?;
                info!(status = page.status, url = documents.base_url(), "first page fetched");
            }
            Err(err) => warn!(error = %err, category = ?err.category(), "service lookup failed"),
        }
    }

    tokio::signal::ctrl_c().await?;
    auth.shutdown().await;
    let status = auth.maintenance_status();
    info!(idle = status.is_idle(), "stopped");
    Ok(())
}
