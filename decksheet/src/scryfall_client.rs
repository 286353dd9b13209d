extern crate reqwest;
extern crate tokio;

use lazy_static::lazy_static;
use log::debug;
use tokio::time::{Duration, Instant};

use crate::error::Result;

// headers required according to https://scryfall.com/docs/api/
const USER_AGENT: &str = "decksheet/0.1";
const ACCEPT: &str = "application/json;q=0.9,*/*;q=0.8";
const SCRYFALL_COOLDOWN: Duration = Duration::from_millis(100);

// use a blocking mutex since we are only holding the lock to reserve the next slot
lazy_static! {
    static ref NEXT_SCRYFALL_CALL: std::sync::Mutex<Instant> =
        std::sync::Mutex::new(Instant::now());
}

fn reserve_call_slot() -> Instant {
    let mut next = NEXT_SCRYFALL_CALL
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    let slot = (*next).max(Instant::now());
    *next = slot + SCRYFALL_COOLDOWN;
    slot
}

#[derive(Clone)]
pub struct ScryfallClient {
    client: reqwest::Client,
}

impl ScryfallClient {
    pub fn new() -> Result<ScryfallClient> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::USER_AGENT,
            reqwest::header::HeaderValue::from_static(USER_AGENT),
        );
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static(ACCEPT),
        );
        Ok(ScryfallClient {
            client: reqwest::Client::builder()
                .default_headers(headers)
                .build()?,
        })
    }

    /// GET with query parameters, spaced at least `SCRYFALL_COOLDOWN` apart
    /// from every other call made through any client.
    pub async fn call_with_query(
        &self,
        uri: &str,
        query: &[(&str, &str)],
    ) -> std::result::Result<reqwest::Response, reqwest::Error> {
        tokio::time::sleep_until(reserve_call_slot()).await;
        debug!("calling scryfall API: {} {:?}", uri, query);
        self.client.get(uri).query(query).send().await
    }

    pub async fn call(&self, uri: &str) -> std::result::Result<reqwest::Response, reqwest::Error> {
        tokio::time::sleep_until(reserve_call_slot()).await;
        debug!("calling scryfall: {}", uri);
        self.client.get(uri).send().await
    }
}
