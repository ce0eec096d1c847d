use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::models::CatalogEntry;

const GOOGLE_BOOKS_API_URL: &str = "https://www.googleapis.com/books/v1/volumes";

#[derive(Debug, Deserialize)]
struct VolumesResponse {
    #[serde(default)]
    items: Vec<Volume>,
}

#[derive(Debug, Deserialize)]
struct Volume {
    id: String,
    #[serde(rename = "volumeInfo", default)]
    volume_info: VolumeInfo,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VolumeInfo {
    title: Option<String>,
    #[serde(default)]
    authors: Vec<String>,
    description: Option<String>,
    published_date: Option<String>,
    image_links: Option<ImageLinks>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: u16,
    message: String,
}

#[derive(Debug, Deserialize)]
struct ImageLinks {
    thumbnail: Option<String>,
}

impl From<Volume> for CatalogEntry {
    fn from(volume: Volume) -> Self {
        let info = volume.volume_info;
        let thumbnail_url = info
            .image_links
            .and_then(|links| links.thumbnail)
            .unwrap_or_else(|| cover_url(&volume.id));

        CatalogEntry {
            title: info.title.unwrap_or_else(|| "Untitled".to_string()),
            authors: info.authors,
            description: info.description,
            thumbnail_url: Some(thumbnail_url),
            published_date: info.published_date,
            // The provider never supplies curated tags.
            local_tags: Vec::new(),
            id: volume.id,
        }
    }
}

fn cover_url(volume_id: &str) -> String {
    format!(
        "https://books.google.com/books/publisher/content/images/frontcover/{}?fife=w400-h600&source=gbs_api",
        volume_id
    )
}

/// Search client for the Google Books volumes API.
pub struct GoogleBooksClient {
    client: Client,
    api_key: Option<String>,
    max_results: u32,
}

impl GoogleBooksClient {
    pub fn new(api_key: Option<String>, max_results: u32) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("inkreads/0.1")
            .build()?;
        Ok(Self {
            client,
            api_key,
            max_results,
        })
    }

    pub async fn search(&self, query: &str) -> Result<Vec<CatalogEntry>> {
        let mut params = vec![
            ("q", query.to_string()),
            ("maxResults", self.max_results.to_string()),
        ];
        if let Some(key) = &self.api_key {
            params.push(("key", key.clone()));
        }

        let response = self
            .client
            .get(GOOGLE_BOOKS_API_URL)
            .query(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(status_error(status, &error_text));
        }

        let volumes: VolumesResponse = response.json().await?;
        let entries = parse_entries(volumes);
        tracing::debug!("Google Books returned {} volumes for '{}'", entries.len(), query);
        Ok(entries)
    }
}

/// Google reports API-level failures as a JSON `error` object; anything else
/// (proxies, HTML error pages) only has a status worth reporting.
fn status_error(status: StatusCode, body: &str) -> AppError {
    match serde_json::from_str::<ApiErrorResponse>(body) {
        Ok(parsed) => AppError::BooksApi(format!("{} ({})", parsed.error.message, parsed.error.code)),
        Err(_) => anyhow::anyhow!("Google Books search failed: HTTP {}", status).into(),
    }
}

fn parse_entries(response: VolumesResponse) -> Vec<CatalogEntry> {
    response.items.into_iter().map(CatalogEntry::from).collect()
}
