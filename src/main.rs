use std::sync::Arc;

use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use profile_uploads::{
    AppConfig, UploadPipeline,
    storage::{BlobStore, RecordStore},
    web_pages,
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "profile_uploads=debug,tower_http=info,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env();
    let blobs = BlobStore::new(config.public_dir.clone(), config.upload_path.clone());
    blobs.initialize().await?;
    let records = RecordStore::open(&config.data_dir).await?;
    let pipeline = Arc::new(UploadPipeline::new(blobs, records));

    let router = web_pages::router(pipeline, config.max_upload_bytes);
    let bind_address = config.bind_address();
    let tcp_listener = tokio::net::TcpListener::bind(&bind_address).await?;

    tracing::info!("listening on http://{}", bind_address);

    axum::serve(tcp_listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    Ok(())
}
