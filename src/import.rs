use std::time::Duration;

use scraper::Html;
use tracing::{info, warn};
use url::Url;

use crate::jsonld::{self, RecipeSource};
use crate::media::{MediaError, MediaManager};
use crate::models::Recipe;
use crate::upload::extension_of;

// ── Constants ────────────────────────────────────────────────────────────────

/// Many recipe sites turn away clients that do not look like a browser.
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";
const DEFAULT_IMAGE_EXT: &str = ".jpg";

// ── Error type ───────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("{0}")]
    InvalidUrl(String),
    #[error("Upstream returned HTTP {0}")]
    Upstream(u16),
    #[error("{0}")]
    Request(String),
    #[error("No structured recipe data found (JSON-LD)")]
    NoRecipeData,
    #[error("Failed to store image: {0}")]
    Storage(#[from] MediaError),
}

// ── Settings ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub connect_timeout: Duration,
    pub timeout: Duration,
    pub insecure_ssl: bool,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            timeout: Duration::from_secs(10),
            insecure_ssl: false,
        }
    }
}

// ── Importer ─────────────────────────────────────────────────────────────────

/// Turns a recipe page URL into a [`Recipe`], downloading its picture into
/// the media root. The result is not saved to the collection.
#[derive(Clone)]
pub struct Importer {
    client: reqwest::Client,
    media: MediaManager,
}

impl Importer {
    pub fn new(settings: &FetchSettings, media: MediaManager) -> Result<Self, ImportError> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            ),
        );
        headers.insert(
            reqwest::header::ACCEPT_LANGUAGE,
            reqwest::header::HeaderValue::from_static("en-US,en;q=0.9"),
        );

        let mut builder = reqwest::ClientBuilder::new()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .user_agent(USER_AGENT)
            .default_headers(headers);

        if settings.insecure_ssl {
            builder = builder.danger_accept_invalid_certs(true);
        }

        let client = builder
            .build()
            .map_err(|e| ImportError::Request(e.to_string()))?;

        Ok(Self { client, media })
    }

    pub async fn import(&self, url: &str) -> Result<Recipe, ImportError> {
        let page_url = validate_url(url)?;
        let html = self.fetch_html(&page_url).await?;
        let source = extract_source(&html).ok_or(ImportError::NoRecipeData)?;

        let image = source.image_url();
        let mut recipe = source.into_recipe(url);

        if let Some(raw) = image {
            match page_url.join(&raw) {
                Ok(image_url) => match self.download_image(&image_url).await {
                    Ok(path) => recipe.image_url = path,
                    Err(e) => warn!(image = %image_url, "failed to download image: {}", e),
                },
                Err(e) => warn!(image = %raw, "unusable image URL: {}", e),
            }
        }

        info!(url, title = %recipe.title, "imported recipe");
        Ok(recipe)
    }

    async fn fetch_html(&self, url: &Url) -> Result<String, ImportError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(request_error)?;

        if !response.status().is_success() {
            return Err(ImportError::Upstream(response.status().as_u16()));
        }

        response
            .text()
            .await
            .map_err(|e| ImportError::Request(e.to_string()))
    }

    async fn download_image(&self, url: &Url) -> Result<String, ImportError> {
        let response = self
            .client
            .get(url.clone())
            .header(reqwest::header::ACCEPT, "image/*,*/*;q=0.8")
            .send()
            .await
            .map_err(request_error)?;

        if !response.status().is_success() {
            return Err(ImportError::Upstream(response.status().as_u16()));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ImportError::Request(e.to_string()))?;

        let file_name = format!(
            "import-{}{}",
            chrono::Utc::now().timestamp_millis(),
            image_extension(url)
        );
        Ok(self.media.write_file(None, &file_name, &bytes).await?)
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────────

fn validate_url(url: &str) -> Result<Url, ImportError> {
    let parsed =
        Url::parse(url.trim()).map_err(|_| ImportError::InvalidUrl("Invalid URL".to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ImportError::InvalidUrl(
            "Only http and https URLs are allowed".to_string(),
        ));
    }
    Ok(parsed)
}

fn request_error(e: reqwest::Error) -> ImportError {
    if e.is_timeout() {
        ImportError::Request(format!("TimeoutError: {}", e))
    } else if e.is_connect() {
        ImportError::Request(format!("ConnectError: {}", e))
    } else {
        ImportError::Request(format!("RequestError: {}", e))
    }
}

/// The parsed document is dropped here, before any further `.await`.
pub fn extract_source(html: &str) -> Option<RecipeSource> {
    let document = Html::parse_document(html);
    jsonld::find_recipe_node(&document).map(|node| RecipeSource::from_node(&node))
}

/// Extension of the URL path (query excluded), `.jpg` when there is none.
fn image_extension(url: &Url) -> String {
    let ext = extension_of(url.path());
    if ext.is_empty() {
        DEFAULT_IMAGE_EXT.to_string()
    } else {
        ext
    }
}
