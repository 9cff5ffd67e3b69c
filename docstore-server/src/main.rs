use clap::Parser;
use docstore_server::{build_service, Args, DocStoreServer, ServerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let mut config = ServerConfig::load(&args.config)?;
    config.apply(&args);
    log::info!("Starting docstore server with {:?}", config);

    let bind_addr = config.bind_addr()?;
    let request_timeout = config.request_timeout();
    let service = tokio::task::spawn_blocking(move || build_service(&config)).await??;

    DocStoreServer::new(bind_addr, service, request_timeout)
        .start()
        .await
}
