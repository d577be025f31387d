//! kitchen-api: a small local recipe box backend.
//!
//! Keeps the recipe collection in one JSON file, stores images in a folder
//! tree under a media root and imports recipes from web pages that embed
//! schema.org JSON-LD.

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

pub mod api;
pub mod config;
pub mod error;
pub mod import;
pub mod jsonld;
pub mod media;
pub mod models;
pub mod store;
pub mod upload;

use config::Config;
use import::{ImportError, Importer};
use media::{MediaManager, PUBLIC_PREFIX};
use store::{JsonFileStore, RecipeStore};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RecipeStore>,
    pub media: MediaManager,
    pub importer: Importer,
}

impl AppState {
    pub fn new(store: Arc<dyn RecipeStore>, media: MediaManager, importer: Importer) -> Self {
        Self {
            store,
            media,
            importer,
        }
    }

    /// File-backed state laid out under the configured data root.
    pub fn from_config(config: &Config) -> Result<Self, ImportError> {
        let media = MediaManager::new(config.media_dir());
        let importer = Importer::new(&config.fetch_settings(), media.clone())?;
        let store = Arc::new(JsonFileStore::new(config.recipes_file()));
        Ok(Self::new(store, media, importer))
    }
}

/// Create the recipe file directory and the media root if they are missing.
pub async fn bootstrap(config: &Config) -> std::io::Result<()> {
    if let Some(parent) = config.recipes_file().parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::create_dir_all(config.media_dir()).await
}

/// Build application router
pub fn build_router(state: AppState, config: &Config) -> Router {
    let media_files = ServeDir::new(state.media.root());

    let router = Router::new()
        .route("/health", get(api::health))
        .route(
            "/api/recipes",
            get(api::list_recipes).post(api::save_recipes),
        )
        .route("/api/upload", post(api::upload_image))
        .route("/api/file", delete(api::delete_file))
        .route("/api/folder", delete(api::delete_folder))
        .route("/api/rename-folder", post(api::rename_folder))
        .route("/api/import-recipe", post(api::import_recipe))
        .nest_service(PUBLIC_PREFIX, media_files);

    let router = match &config.static_dir {
        Some(dir) => router.fallback_service(ServeDir::new(dir)),
        None => router,
    };

    router
        .layer(DefaultBodyLimit::max(config.max_body_bytes()))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
