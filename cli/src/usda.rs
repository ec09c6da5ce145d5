use std::time::Duration;

use anyhow::{Context, Result};

use fullsnack_core::models::NutritionFacts;
use fullsnack_core::usda::{SearchResponse, best_match};

const SEARCH_URL: &str = "https://api.nal.usda.gov/fdc/v1/foods/search";
const PAGE_SIZE: &str = "5";
const DATA_TYPES: [&str; 3] = ["Survey (FNDDS)", "SR Legacy", "Branded"];

pub struct UsdaClient {
    client: reqwest::Client,
    api_key: String,
}

impl UsdaClient {
    pub fn new(api_key: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(format!(
                "fullsnack/{} (nutrition tracker)",
                env!("CARGO_PKG_VERSION")
            ))
            .timeout(Duration::from_secs(10))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client, api_key })
    }

    /// Look up the best nutrition match for a food name. `Ok(None)` when
    /// USDA has no foods for the query.
    pub async fn lookup(&self, query: &str) -> Result<Option<NutritionFacts>> {
        let mut params = vec![
            ("api_key", self.api_key.as_str()),
            ("query", query),
            ("pageSize", PAGE_SIZE),
        ];
        params.extend(DATA_TYPES.iter().map(|t| ("dataType", *t)));

        let resp = self
            .client
            .get(SEARCH_URL)
            .query(&params)
            .send()
            .await
            .context("Failed to reach USDA FoodData Central")?
            .error_for_status()
            .context("USDA search failed")?;

        let data: SearchResponse = resp
            .json()
            .await
            .context("Failed to parse USDA search response")?;

        let facts = best_match(query, &data.foods);
        tracing::debug!(query, found = facts.is_some(), "nutrition lookup");
        Ok(facts)
    }
}
