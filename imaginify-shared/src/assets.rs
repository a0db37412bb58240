/// Image queries that combine CDN search with local image records
///
/// Full-text search over image content happens at the CDN (Cloudinary). A
/// search returns CDN asset ids; the local `images` table is then restricted
/// to those ids and paginated the same way as an unfiltered listing.
///
/// # Example
///
/// ```no_run
/// use imaginify_shared::assets::{get_all_images, AllImagesQuery, CloudinaryClient, CloudinaryConfig};
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), imaginify_shared::assets::AssetError> {
/// let cdn = CloudinaryClient::new(CloudinaryConfig {
///     cloud_name: Some("demo".to_string()),
///     api_key: Some("123".to_string()),
///     api_secret: Some("secret".to_string()),
/// });
///
/// let result = get_all_images(&pool, &cdn, AllImagesQuery {
///     page: 2,
///     search_query: "tags=cat".to_string(),
///     ..Default::default()
/// }).await?;
/// println!("{} of {} pages", result.data.len(), result.total_pages);
/// # Ok(())
/// # }
/// ```

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::PgPool;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::DataError;
use crate::models::image::{Image, ImageFilter, ImageView};
use crate::models::pagination::{Page, Pagination, DEFAULT_PAGE_LIMIT};

/// CDN folder every uploaded asset lives in
pub const ASSET_FOLDER: &str = "imaginify";

const CLOUDINARY_API_URL: &str = "https://api.cloudinary.com/v1_1";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Largest page the search API accepts
const SEARCH_PAGE_SIZE: u32 = 500;

/// Upper bound on cursor pages fetched for one search
const MAX_SEARCH_PAGES: usize = 20;

#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("CDN request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("CDN returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error(transparent)]
    Data(#[from] DataError),
}

/// Searches CDN assets and returns their public ids
#[async_trait]
pub trait AssetSearch: Send + Sync {
    async fn search_public_ids(&self, expression: &str) -> Result<Vec<String>, AssetError>;
}

/// Search expression scoped to [`ASSET_FOLDER`]
pub fn search_expression(search_query: &str) -> String {
    let search_query = search_query.trim();
    if search_query.is_empty() {
        format!("folder={}", ASSET_FOLDER)
    } else {
        format!("folder={} AND {}", ASSET_FOLDER, search_query)
    }
}

#[derive(Debug, Clone, Default)]
pub struct CloudinaryConfig {
    pub cloud_name: Option<String>,
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
}

struct Credentials<'a> {
    cloud_name: &'a str,
    api_key: &'a str,
    api_secret: &'a str,
}

pub struct CloudinaryClient {
    client: Client,
    config: CloudinaryConfig,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    resources: Vec<SearchResource>,

    #[serde(default)]
    next_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResource {
    public_id: String,
}

impl CloudinaryClient {
    pub fn new(config: CloudinaryConfig) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                warn!("Failed to build HTTP client with timeout: {}", e);
                Client::new()
            });

        Self { client, config }
    }

    fn credentials(&self) -> Result<Credentials<'_>, AssetError> {
        fn required<'a>(value: &'a Option<String>, name: &str) -> Result<&'a str, AssetError> {
            value
                .as_deref()
                .filter(|v| !v.is_empty())
                .ok_or_else(|| AssetError::Config(format!("{} is not set", name)))
        }

        Ok(Credentials {
            cloud_name: required(&self.config.cloud_name, "CLOUDINARY_CLOUD_NAME")?,
            api_key: required(&self.config.api_key, "CLOUDINARY_API_KEY")?,
            api_secret: required(&self.config.api_secret, "CLOUDINARY_API_SECRET")?,
        })
    }

    async fn search_page(
        &self,
        credentials: &Credentials<'_>,
        expression: &str,
        cursor: Option<&str>,
    ) -> Result<SearchResponse, AssetError> {
        let mut body = json!({
            "expression": expression,
            "max_results": SEARCH_PAGE_SIZE,
        });
        if let Some(cursor) = cursor {
            body["next_cursor"] = json!(cursor);
        }

        let response = self
            .client
            .post(format!(
                "{}/{}/resources/search",
                CLOUDINARY_API_URL, credentials.cloud_name
            ))
            .basic_auth(credentials.api_key, Some(credentials.api_secret))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AssetError::Api {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl AssetSearch for CloudinaryClient {
    async fn search_public_ids(&self, expression: &str) -> Result<Vec<String>, AssetError> {
        let credentials = self.credentials()?;

        let mut public_ids = Vec::new();
        let mut cursor: Option<String> = None;

        for _ in 0..MAX_SEARCH_PAGES {
            let page = self
                .search_page(&credentials, expression, cursor.as_deref())
                .await?;
            public_ids.extend(page.resources.into_iter().map(|r| r.public_id));

            match page.next_cursor {
                Some(next) if !next.is_empty() => cursor = Some(next),
                _ => {
                    debug!(expression = %expression, results = public_ids.len(), "CDN search complete");
                    return Ok(public_ids);
                }
            }
        }

        warn!(
            expression = %expression,
            results = public_ids.len(),
            "CDN search truncated after {} pages",
            MAX_SEARCH_PAGES
        );
        Ok(public_ids)
    }
}

/// Input of [`get_all_images`]; missing fields take their defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AllImagesQuery {
    pub page: i64,
    pub limit: i64,

    /// CDN search expression; empty lists every image
    pub search_query: String,
}

impl Default for AllImagesQuery {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_PAGE_LIMIT,
            search_query: String::new(),
        }
    }
}

/// Output of [`get_all_images`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllImages {
    pub data: Vec<ImageView>,
    pub total_pages: i64,

    /// Number of stored images regardless of the search
    pub saved_images: i64,
}

/// Resolves a search query to an image filter
///
/// An empty query matches everything and skips the CDN round trip.
pub async fn search_filter(
    search: &dyn AssetSearch,
    search_query: &str,
) -> Result<ImageFilter, AssetError> {
    if search_query.trim().is_empty() {
        return Ok(ImageFilter::default());
    }

    let public_ids = search
        .search_public_ids(&search_expression(search_query))
        .await?;
    Ok(ImageFilter::by_public_ids(public_ids))
}

/// Public image gallery, optionally narrowed by a CDN search
pub async fn get_all_images(
    pool: &PgPool,
    search: &dyn AssetSearch,
    query: AllImagesQuery,
) -> Result<AllImages, AssetError> {
    let pagination = Pagination::new(query.page, query.limit);
    let filter = search_filter(search, &query.search_query).await?;

    let data = Image::list(pool, &filter, pagination).await?;
    let total = Image::count(pool, &filter).await?;
    let saved_images = Image::count(pool, &ImageFilter::default()).await?;

    Ok(AllImages {
        data,
        total_pages: pagination.total_pages(total),
        saved_images,
    })
}

/// Images owned by one user, most recently updated first
pub async fn get_user_images(
    pool: &PgPool,
    author_id: Uuid,
    pagination: Pagination,
) -> Result<Page<ImageView>, DataError> {
    let filter = ImageFilter::by_author(author_id);

    let data = Image::list(pool, &filter, pagination).await?;
    let total = Image::count(pool, &filter).await?;

    Ok(Page {
        data,
        total_pages: pagination.total_pages(total),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeSearch {
        ids: Vec<String>,
        expressions: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl AssetSearch for FakeSearch {
        async fn search_public_ids(&self, expression: &str) -> Result<Vec<String>, AssetError> {
            self.expressions.lock().unwrap().push(expression.to_string());
            Ok(self.ids.clone())
        }
    }

    #[test]
    fn test_search_expression() {
        assert_eq!(search_expression(""), "folder=imaginify");
        assert_eq!(search_expression("  "), "folder=imaginify");
        assert_eq!(search_expression("tags=cat"), "folder=imaginify AND tags=cat");
    }

    #[tokio::test]
    async fn test_empty_query_skips_cdn() {
        let search = FakeSearch::default();

        let filter = search_filter(&search, "").await.unwrap();
        assert_eq!(filter, ImageFilter::default());
        assert!(search.expressions.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_query_restricts_to_cdn_ids() {
        let search = FakeSearch {
            ids: vec!["imaginify/a".to_string(), "imaginify/b".to_string()],
            ..Default::default()
        };

        let filter = search_filter(&search, "tags=cat").await.unwrap();
        assert_eq!(
            filter.public_ids,
            Some(vec!["imaginify/a".to_string(), "imaginify/b".to_string()])
        );
        assert_eq!(filter.author_id, None);
        assert_eq!(
            *search.expressions.lock().unwrap(),
            vec!["folder=imaginify AND tags=cat".to_string()]
        );
    }

    #[tokio::test]
    async fn test_missing_credentials_is_config_error() {
        let client = CloudinaryClient::new(CloudinaryConfig {
            cloud_name: Some("demo".to_string()),
            api_key: None,
            api_secret: Some("secret".to_string()),
        });

        let result = client.search_public_ids("folder=imaginify").await;
        match result {
            Err(AssetError::Config(message)) => assert!(message.contains("CLOUDINARY_API_KEY")),
            other => panic!("expected config error, got {:?}", other.map(|ids| ids.len())),
        }
    }

    #[test]
    fn test_all_images_query_defaults() {
        let query = AllImagesQuery::default();
        assert_eq!(query.page, 1);
        assert_eq!(query.limit, 9);
        assert!(query.search_query.is_empty());

        let query: AllImagesQuery = serde_json::from_str(r#"{"search_query": "cat"}"#).unwrap();
        assert_eq!(query.page, 1);
        assert_eq!(query.limit, 9);
        assert_eq!(query.search_query, "cat");
    }
}
