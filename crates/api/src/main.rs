use std::sync::Arc;

use anyhow::Context;

use casebridge_api::app::{self, AppState};
use casebridge_api::config::ApiConfig;
use casebridge_infra::{Database, SqliteKvStore};

const MAX_DB_CONNECTIONS: u32 = 8;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is normal outside development.
    let _ = dotenvy::dotenv();
    casebridge_observability::init();

    let config = ApiConfig::from_env().context("invalid configuration")?;

    let db = Database::connect(&config.database_url, MAX_DB_CONNECTIONS)
        .await
        .context("failed to open database")?;
    tracing::info!(schema_version = db.schema_version().await?, "database ready");

    if let Some(admin) = &config.bootstrap_admin {
        if let Some(user) = db
            .users()
            .ensure_bootstrap_admin(&admin.email, &admin.password)
            .await
            .context("failed to create bootstrap admin")?
        {
            tracing::info!(user_id = %user.id, email = %user.email, "bootstrap admin created");
        }
    }

    let kv = SqliteKvStore::new(db.pool().clone());
    let purged = kv.purge_expired().await?;
    if purged > 0 {
        tracing::info!(purged, "removed expired sessions and OAuth states");
    }

    let bind_addr = config.bind_addr;
    let state = AppState::new(db, Arc::new(kv), config).context("failed to build LawPay client")?;
    let router = app::build_app(state);

    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, router).await?;
    Ok(())
}
