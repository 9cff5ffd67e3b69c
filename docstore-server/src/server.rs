use crate::config::ServerConfig;
use crate::handlers::{create_router, AppState};
use axum::Router;
use docstore::service::CrudService;
use docstore_fjall_adapter::FjallModule;
use std::net::SocketAddr;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

/// Builds the CRUD service described by `config`: opens the store, checks its
/// identifier policy and bootstraps the manifest collections.
///
/// Blocks on storage; call it from a blocking context.
pub fn build_service(config: &ServerConfig) -> anyhow::Result<CrudService> {
    let mut builder = CrudService::builder().identifier_policy(config.identifier_policy);

    if config.in_memory {
        log::warn!("Running with an in-memory store, nothing will be persisted");
    } else {
        let db_path = config.data_dir.to_string_lossy();
        builder = builder.load_module(
            FjallModule::with_config()
                .production_preset()
                .db_path(&db_path)
                .build(),
        );
    }

    let service = builder.manifest(&config.manifest).build()?;
    Ok(service)
}

/// HTTP server for docstore collections
pub struct DocStoreServer {
    router: Router,
    bind_addr: SocketAddr,
    service: CrudService,
}

impl DocStoreServer {
    pub fn new(bind_addr: SocketAddr, service: CrudService, request_timeout: Duration) -> Self {
        let state = AppState {
            service: service.clone(),
            request_timeout,
        };
        let router = create_router(state)
            .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()));

        DocStoreServer {
            router,
            bind_addr,
            service,
        }
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serves until Ctrl-C, then flushes and closes the store.
    pub async fn start(self) -> anyhow::Result<()> {
        let server = axum::Server::try_bind(&self.bind_addr)?;

        log::info!("Listening on http://{}", self.bind_addr);
        log::info!("  POST   /db/:collection         - Create document");
        log::info!("  GET    /db/:collection         - List documents");
        log::info!("  GET    /db/:collection/:id     - Read document");
        log::info!("  PUT    /db/:collection/:id     - Replace document");
        log::info!("  DELETE /db/:collection/:id     - Delete document");
        log::info!("  POST   /db/search/:collection  - Search (not implemented)");

        server
            .serve(self.router.into_make_service())
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        log::info!("Server stopped, closing store");
        let service = self.service;
        tokio::task::spawn_blocking(move || service.close()).await??;
        log::info!("Store closed");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Could not listen for the shutdown signal: {}", e);
        return;
    }
    log::info!("Shutdown signal received");
}
