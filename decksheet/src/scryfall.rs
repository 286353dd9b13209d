use log::{debug, info};
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::overrides::OverrideTable;
use crate::scryfall_client::ScryfallClient;

const SCRYFALL_NAMED: &str = "https://api.scryfall.com/cards/named";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageOrigin {
    Override,
    Lookup,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedImage {
    pub url: String,
    pub origin: ImageOrigin,
}

/// Pulls the "large" image uri out of a scryfall card object. Cards with
/// two faces only carry image uris per face, the front face is used.
pub fn large_image_uri(d: &Map<String, Value>) -> Option<String> {
    if d.contains_key("image_uris") {
        Some(d["image_uris"]["large"].as_str()?.to_string())
    } else if d.contains_key("card_faces") {
        let card_faces = d["card_faces"].as_array()?;
        Some(card_faces.first()?["image_uris"]["large"].as_str()?.to_string())
    } else {
        None
    }
}

// scryfall answers failed lookups with an error object instead of a card
fn error_details(d: &Map<String, Value>) -> Option<String> {
    if d.get("object")?.as_str()? == "error" {
        Some(
            d.get("details")
                .and_then(Value::as_str)
                .unwrap_or("unknown error")
                .to_string(),
        )
    } else {
        None
    }
}

pub fn image_uri_from_answer(name: &str, answer: &Map<String, Value>) -> Result<String> {
    if let Some(details) = error_details(answer) {
        return Err(Error::CardNotFound {
            name: name.to_string(),
            details,
        });
    }
    large_image_uri(answer).ok_or_else(|| Error::MissingImageUri {
        name: name.to_string(),
    })
}

pub async fn query_large_image_uri(name: &str, client: &ScryfallClient) -> Result<String> {
    let response = client
        .call_with_query(SCRYFALL_NAMED, &[("fuzzy", name)])
        .await?;
    debug!("scryfall answered {} for {:?}", response.status(), name);
    // error objects come with a 4xx status, read the body regardless
    let answer = response.json::<Map<String, Value>>().await?;
    image_uri_from_answer(name, &answer)
}

pub async fn resolve_image(
    name: &str,
    overrides: &OverrideTable,
    client: &ScryfallClient,
) -> Result<ResolvedImage> {
    if let Some(url) = overrides.get(name) {
        info!("using override image url for {}", name);
        return Ok(ResolvedImage {
            url: url.to_string(),
            origin: ImageOrigin::Override,
        });
    }
    let url = query_large_image_uri(name, client).await?;
    Ok(ResolvedImage {
        url,
        origin: ImageOrigin::Lookup,
    })
}
