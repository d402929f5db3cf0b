use async_trait::async_trait;
use serde_json::Value;

use crate::{
    entities::RideHistoryRecord,
    error::{invalid_input_error, upstream_error, Error},
    history::{synthesize_records, HistoryFeed},
};

pub const DEFAULT_FEED_URL: &str = "https://jsonplaceholder.typicode.com/photos";

/// Counts the items of a public demo endpoint and synthesizes a ride record for
/// each; the items themselves are discarded.
#[derive(Clone, Debug)]
pub struct PlaceholderHistoryFeed {
    url: String,
    client: reqwest::Client,
}

impl PlaceholderHistoryFeed {
    pub fn new(url: String) -> Self {
        Self {
            url,
            client: reqwest::Client::new(),
        }
    }
}

impl Default for PlaceholderHistoryFeed {
    fn default() -> Self {
        Self::new(DEFAULT_FEED_URL.into())
    }
}

#[tracing::instrument(skip(client))]
pub async fn fetch_items(client: &reqwest::Client, url: &str) -> Result<Vec<Value>, Error> {
    let res = client.get(url).send().await?;

    let status_code = res.status().as_u16();

    if (400..500).contains(&status_code) {
        return Err(invalid_input_error());
    } else if status_code != 200 {
        return Err(upstream_error());
    }

    let data: Value = res.json().await?;

    match data {
        Value::Array(items) => Ok(items),
        _ => Err(upstream_error()),
    }
}

#[async_trait]
impl HistoryFeed for PlaceholderHistoryFeed {
    #[tracing::instrument(skip(self), fields(url = %self.url))]
    async fn fetch_records(&self) -> Result<Vec<RideHistoryRecord>, Error> {
        let items = fetch_items(&self.client, &self.url).await?;

        tracing::info!("synthesizing {} history records", items.len());

        Ok(synthesize_records(items.len()))
    }
}
