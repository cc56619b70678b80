use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use outfit_api::{
    config::{Config, SessionBackend},
    db::{create_redis_client, MemorySessionStore, RedisSessionStore, SessionStore},
    routes::{create_router, AppState},
    services::{
        catalog::CatalogLoader,
        providers::{ChatProvider, ImageProvider, OpenAiProvider},
        selector::OutfitSelector,
        tryon::{DirectoryGarmentResolver, TryOnCache},
        Stylist,
    },
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("outfit_api=info,tower_http=info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let store: Arc<dyn SessionStore> = match config.session_backend {
        SessionBackend::Redis => {
            let client = create_redis_client(&config.redis_url)?;
            Arc::new(RedisSessionStore::new(client, config.session_ttl_secs))
        }
        SessionBackend::Memory => Arc::new(MemorySessionStore::new()),
    };

    // The catalog is required for every request, so fail fast on a bad file
    let catalog = Arc::new(CatalogLoader::new(
        config.outfits_path(),
        config.products_path(),
    ));
    catalog.load_outfits().await?;
    catalog.load_products().await?;

    let (chat, images): (Option<Arc<dyn ChatProvider>>, Option<Arc<dyn ImageProvider>>) =
        match &config.openai_api_key {
            Some(api_key) => {
                let provider = Arc::new(OpenAiProvider::new(
                    api_key.clone(),
                    config.openai_api_url.clone(),
                    config.image_model.clone(),
                    Duration::from_secs(config.chat_timeout_secs),
                    Duration::from_secs(config.image_timeout_secs),
                ));
                let chat: Arc<dyn ChatProvider> = provider.clone();
                let images: Arc<dyn ImageProvider> = provider;
                (Some(chat), Some(images))
            }
            None => {
                tracing::warn!("OPENAI_API_KEY not set, outfits will use local fallback");
                (None, None)
            }
        };

    let stylist = Stylist::new(
        catalog,
        OutfitSelector::new(chat, config.chat_model.clone(), config.chat_temperature),
        TryOnCache::new(images, config.media_dir.clone()),
        Arc::new(DirectoryGarmentResolver::new(config.garment_dir.clone())),
        config.model_image_path.clone(),
    );

    tracing::info!(
        session_backend = store.name(),
        data_dir = %config.data_dir.display(),
        "Application state ready"
    );

    let app = create_router(Arc::new(AppState { store, stylist }));

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server running");
    axum::serve(listener, app).await?;

    Ok(())
}
