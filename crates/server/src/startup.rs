use std::{env, net::SocketAddr};

use axum::Router;
use configs::AppConfig;
use migration::MigratorTrait;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::routes;
use crate::state::AppState;

fn build_cors() -> CorsLayer {
    CorsLayer::very_permissive()
}

/// Config file first (`CONFIG_PATH`, default `config.toml`); without one,
/// `SERVER_HOST`/`SERVER_PORT`/`DATABASE_URL` from the environment.
/// The flag tells whether the file was used.
pub fn load_config() -> anyhow::Result<(AppConfig, bool)> {
    match configs::load_default() {
        Ok(mut cfg) => {
            cfg.normalize_and_validate()?;
            Ok((cfg, true))
        }
        Err(_) => {
            let mut cfg = AppConfig::default();
            cfg.server.host = env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
            cfg.server.port = env::var("SERVER_PORT")
                .ok()
                .and_then(|p| p.parse::<u16>().ok())
                .unwrap_or(8081);
            cfg.server.worker_threads = env::var("TOKIO_WORKER_THREADS").ok().and_then(|v| v.parse::<usize>().ok());
            cfg.normalize_and_validate()?;
            Ok((cfg, false))
        }
    }
}

fn bind_addr(cfg: &AppConfig) -> anyhow::Result<SocketAddr> {
    Ok(format!("{}:{}", cfg.server.host, cfg.server.port).parse()?)
}

/// Connect, optionally migrate, and serve until the listener fails.
pub async fn run(cfg: AppConfig) -> anyhow::Result<()> {
    let db = models::db::connect_with_config(&models::db::DatabaseConfig::from(&cfg.database)).await?;
    if cfg.database.run_migrations {
        migration::Migrator::up(&db, None).await?;
        info!("migrations applied");
    } else {
        warn!("database.run_migrations is off; assuming schema is current");
    }

    let state = AppState::from_db(db, cfg.listing);
    let app: Router = routes::build_router(state, build_cors());

    let addr = bind_addr(&cfg)?;
    info!(%addr, "starting http server");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
