use std::time::Duration;

use anyhow::{Context, Result};

use fullsnack_core::models::{FoodImage, ImagePreview};
use fullsnack_core::unsplash::{PREVIEW_COUNT, Photo, SearchResponse, to_food_image, to_preview};

const SEARCH_URL: &str = "https://api.unsplash.com/search/photos";

pub struct UnsplashClient {
    client: reqwest::Client,
    access_key: String,
}

impl UnsplashClient {
    pub fn new(access_key: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(format!(
                "fullsnack/{} (nutrition tracker)",
                env!("CARGO_PKG_VERSION")
            ))
            .timeout(Duration::from_secs(8))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client, access_key })
    }

    async fn search(&self, query: &str, per_page: u32) -> Result<Vec<Photo>> {
        let per_page = per_page.to_string();
        let resp = self
            .client
            .get(SEARCH_URL)
            .header("Accept-Version", "v1")
            .header("Authorization", format!("Client-ID {}", self.access_key))
            .query(&[
                ("query", query),
                ("per_page", per_page.as_str()),
                ("orientation", "squarish"),
            ])
            .send()
            .await
            .context("Failed to reach Unsplash")?
            .error_for_status()
            .context("Unsplash search failed")?;

        let data: SearchResponse = resp
            .json()
            .await
            .context("Failed to parse Unsplash search response")?;
        Ok(data.results)
    }

    pub async fn preview(&self, query: &str) -> Result<Vec<ImagePreview>> {
        let photos = self.search(query, PREVIEW_COUNT).await?;
        Ok(photos.into_iter().map(|p| to_preview(p, query)).collect())
    }

    /// The first usable image for `query`, ready to store on an entry.
    pub async fn first_image(&self, query: &str) -> Result<Option<FoodImage>> {
        let photos = self.search(query, 1).await?;
        Ok(photos.first().and_then(to_food_image))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // --- Integration tests (need UNSPLASH_ACCESS_KEY and network) ---

    fn client() -> UnsplashClient {
        let key = std::env::var("UNSPLASH_ACCESS_KEY").unwrap();
        UnsplashClient::new(key).unwrap()
    }

    #[tokio::test]
    #[ignore = "hits Unsplash API"]
    async fn test_preview_returns_images() {
        let images = client().preview("ramen").await.unwrap();
        assert!(!images.is_empty());
        assert!(images.len() <= PREVIEW_COUNT as usize);
    }

    #[tokio::test]
    #[ignore = "hits Unsplash API"]
    async fn test_first_image_has_credit() {
        let image = client().first_image("apple").await.unwrap().unwrap();
        assert_eq!(image.source.as_deref(), Some("Unsplash"));
        assert!(image.url.starts_with("https://"));
    }
}
