//! Application startup and lifecycle management.

use secrecy::ExposeSecret;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;

use crate::config::{RentalConfig, StorageBackend};
use crate::services::{EmailProvider, LogEmailService, SmtpEmailService};
use crate::store::{MemoryStore, MongoStore, RentalStore};
use crate::{build_router, AppState};

pub struct Application {
    listener: TcpListener,
    router: axum::Router,
}

impl Application {
    /// Connect the backing store, bootstrap the admin account and bind the listener.
    pub async fn build(config: RentalConfig) -> anyhow::Result<Self> {
        let store: Arc<dyn RentalStore> = match config.storage {
            StorageBackend::Mongo => {
                let store = MongoStore::connect(
                    config.mongodb.uri.expose_secret(),
                    &config.mongodb.database,
                )
                .await?;
                store.init_indexes().await?;
                tracing::info!(database = %config.mongodb.database, "Connected to MongoDB");
                Arc::new(store)
            }
            StorageBackend::Memory => {
                tracing::warn!("Using in-memory storage; data is lost on restart");
                Arc::new(MemoryStore::new())
            }
        };

        let email: Arc<dyn EmailProvider> = if config.smtp.enabled {
            Arc::new(SmtpEmailService::new(&config.smtp)?)
        } else {
            tracing::info!("SMTP disabled; outgoing email is logged only");
            Arc::new(LogEmailService)
        };

        let admin = config.admin.clone();
        let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
        let state = AppState::new(config, store, email);

        if let Some(admin) = admin {
            state.auth.bootstrap_admin(&admin).await?;
        }

        let listener = TcpListener::bind(addr).await?;
        Ok(Self {
            listener,
            router: build_router(state),
        })
    }

    pub fn port(&self) -> u16 {
        self.listener
            .local_addr()
            .map(|addr| addr.port())
            .unwrap_or_default()
    }

    pub async fn run_until_stopped(self) -> anyhow::Result<()> {
        tracing::info!(address = ?self.listener.local_addr().ok(), "Listening");

        axum::serve(
            self.listener,
            self.router
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await?;

        tracing::info!("Service shutdown complete");
        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
