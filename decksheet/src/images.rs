use image::DynamicImage;
use lazy_static::lazy_static;
use log::{debug, info};
use regex::Regex;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::decklist::Decklist;
use crate::error::{Error, Result};
use crate::overrides::OverrideTable;
use crate::scryfall::resolve_image;
use crate::scryfall_client::ScryfallClient;

/// Turns a card name into a file name. Split and transform cards are named
/// `A // B`, the slashes become ` AND `.
pub fn sanitize_card_name(name: &str) -> String {
    lazy_static! {
        static ref UNSAFE: Regex = Regex::new(r#"[/\\:*?"<>|\x00-\x1f]"#).unwrap();
    }
    UNSAFE
        .replace_all(&name.replace("//", " AND "), "_")
        .into_owned()
}

/// Downloaded card images of one deck, one jpeg per distinct card name.
#[derive(Debug, Clone)]
pub struct CardImageCache {
    dir: PathBuf,
}

impl CardImageCache {
    pub fn new(dir: impl Into<PathBuf>) -> CardImageCache {
        CardImageCache { dir: dir.into() }
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.jpg", sanitize_card_name(name)))
    }

    pub fn load(&self, name: &str) -> Result<DynamicImage> {
        let path = self.path_for(name);
        debug!("loading card image {}", path.display());
        let bytes = std::fs::read(&path).map_err(Error::io(&path))?;
        Ok(image::load_from_memory(&bytes)?)
    }
}

pub async fn download_image(
    name: &str,
    overrides: &OverrideTable,
    client: &ScryfallClient,
    cache: &CardImageCache,
) -> Result<PathBuf> {
    let resolved = resolve_image(name, overrides, client).await?;
    debug!("image url for {}: {} ({:?})", name, resolved.url, resolved.origin);
    let response = client.call(&resolved.url).await?;
    let status = response.status();
    if !status.is_success() {
        return Err(Error::Retrieval {
            url: resolved.url,
            status,
        });
    }
    let bytes = response.bytes().await?;
    let path = cache.path_for(name);
    tokio::fs::write(&path, &bytes)
        .await
        .map_err(Error::io(&path))?;
    info!("downloaded {} ({} bytes)", name, bytes.len());
    Ok(path)
}

/// Downloads every distinct card of the deck, at most `jobs` at a time.
/// The first failure cancels the downloads still in flight.
pub async fn download_all_images(
    decklist: &Decklist,
    overrides: Arc<OverrideTable>,
    client: ScryfallClient,
    cache: &CardImageCache,
    jobs: usize,
) -> Result<usize> {
    let permits = Arc::new(Semaphore::new(jobs.max(1)));
    let mut tasks = JoinSet::new();
    let mut seen = std::collections::HashSet::new();
    for name in decklist.distinct_names() {
        // two names may share a file once sanitized
        let file_name = sanitize_card_name(name);
        if !seen.insert(file_name.clone()) {
            debug!("{} shares the image file {:?} with an earlier card", name, file_name);
            continue;
        }
        let name = name.to_string();
        let permits = permits.clone();
        let overrides = overrides.clone();
        let client = client.clone();
        let cache = cache.clone();
        tasks.spawn(async move {
            let _permit = permits
                .acquire_owned()
                .await
                .expect("download semaphore is never closed");
            download_image(&name, &overrides, &client, &cache).await
        });
    }
    let mut downloaded = 0;
    while let Some(joined) = tasks.join_next().await {
        joined??;
        downloaded += 1;
    }
    Ok(downloaded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn split_card_name() {
        assert_eq!(sanitize_card_name("Cut // Ribbons"), "Cut  AND  Ribbons");
    }

    #[test]
    fn plain_name_unchanged() {
        assert_eq!(
            sanitize_card_name("Jace, the Mind Sculptor"),
            "Jace, the Mind Sculptor"
        );
    }

    #[test]
    fn other_unsafe_characters() {
        assert_eq!(
            sanitize_card_name("Who/What/When/Where/Why"),
            "Who_What_When_Where_Why"
        );
        assert_eq!(sanitize_card_name("Ach! Hans, Run!?"), "Ach! Hans, Run!_");
    }

    #[test]
    fn download_and_load_agree() {
        let cache = CardImageCache::new("deck/output/card_images");
        assert_eq!(
            cache.path_for("Fire // Ice"),
            Path::new("deck/output/card_images/Fire  AND  Ice.jpg")
        );
        assert_eq!(cache.path_for("Fire // Ice"), cache.path_for("Fire // Ice"));
    }

    // answers every request on its own thread: paths starting with /ok get
    // a small body, everything else a 404
    fn serve_images() -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let requests = Arc::new(AtomicUsize::new(0));
        let counter = requests.clone();
        std::thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(mut stream) = stream else { continue };
                counter.fetch_add(1, Ordering::SeqCst);
                let mut reader = BufReader::new(stream.try_clone().unwrap());
                let mut request_line = String::new();
                reader.read_line(&mut request_line).unwrap();
                let mut header = String::new();
                while reader.read_line(&mut header).unwrap() > 2 {
                    header.clear();
                }
                let path = request_line.split(' ').nth(1).unwrap_or("/");
                let response = if path.starts_with("/ok") {
                    "HTTP/1.1 200 OK\r\nContent-Length: 4\r\nConnection: close\r\n\r\njpeg"
                } else {
                    "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
                };
                let _ = stream.write_all(response.as_bytes());
            }
        });
        (base, requests)
    }

    fn scratch_cache(test: &str) -> CardImageCache {
        let dir = std::env::temp_dir().join(format!("decksheet-images-{}-{}", test, std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        CardImageCache::new(dir)
    }

    fn overrides(entries: &[(&str, String)]) -> OverrideTable {
        let map: std::collections::HashMap<&str, &str> =
            entries.iter().map(|(n, u)| (*n, u.as_str())).collect();
        serde_json::from_value(serde_json::to_value(map).unwrap()).unwrap()
    }

    #[tokio::test]
    async fn not_found_is_retrieval_error() {
        let (base, _) = serve_images();
        let url = format!("{}/missing/opt.jpg", base);
        let table = overrides(&[("Opt", url.clone())]);
        let client = ScryfallClient::new().unwrap();
        let cache = scratch_cache("404");
        match download_image("Opt", &table, &client, &cache).await {
            Err(Error::Retrieval { url: failed, status }) => {
                assert_eq!(failed, url);
                assert_eq!(status, reqwest::StatusCode::NOT_FOUND);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(!cache.path_for("Opt").exists());
    }

    #[tokio::test]
    async fn download_writes_cache_file() {
        let (base, _) = serve_images();
        let table = overrides(&[("Fire // Ice", format!("{}/ok/fire.jpg", base))]);
        let client = ScryfallClient::new().unwrap();
        let cache = scratch_cache("ok");
        let path = download_image("Fire // Ice", &table, &client, &cache)
            .await
            .unwrap();
        assert_eq!(path, cache.path_for("Fire // Ice"));
        assert_eq!(std::fs::read(&path).unwrap(), b"jpeg");
    }

    #[tokio::test]
    async fn names_sharing_a_file_download_once() {
        let (base, requests) = serve_images();
        let table = overrides(&[
            ("A/B", format!("{}/ok/a.jpg", base)),
            ("A_B", format!("{}/ok/b.jpg", base)),
        ]);
        let decklist = crate::decklist::parse_decklist("2\tA/B\n1\tA_B\n3\tA/B\n").unwrap();
        let cache = scratch_cache("shared");
        let downloaded = download_all_images(
            &decklist,
            Arc::new(table),
            ScryfallClient::new().unwrap(),
            &cache,
            4,
        )
        .await
        .unwrap();
        assert_eq!(downloaded, 1);
        assert_eq!(requests.load(Ordering::SeqCst), 1);
        assert!(cache.path_for("A_B").exists());
    }

    #[tokio::test]
    async fn one_failed_card_fails_the_deck() {
        let (base, _) = serve_images();
        let table = overrides(&[
            ("Opt", format!("{}/ok/opt.jpg", base)),
            ("Shock", format!("{}/gone/shock.jpg", base)),
            ("Forest", format!("{}/ok/forest.jpg", base)),
        ]);
        let decklist =
            crate::decklist::parse_decklist("4\tOpt\n4\tShock\n20\tForest\n").unwrap();
        let result = download_all_images(
            &decklist,
            Arc::new(table),
            ScryfallClient::new().unwrap(),
            &scratch_cache("failed"),
            1,
        )
        .await;
        assert!(matches!(result, Err(Error::Retrieval { .. })));
    }

    #[test]
    fn load_missing_image() {
        let cache = CardImageCache::new(std::env::temp_dir().join("decksheet-no-such-dir"));
        assert!(matches!(cache.load("Opt"), Err(Error::Io { .. })));
    }
}
