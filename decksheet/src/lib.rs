extern crate image;
extern crate lazy_static;
extern crate log;
extern crate regex;
extern crate reqwest;
extern crate serde;
extern crate serde_json;
extern crate tokio;

use log::{debug, info};
use std::path::{Path, PathBuf};
use std::sync::Arc;

mod error;
pub use crate::error::{Error, ParseErrorKind, Result};

mod decklist;
pub use crate::decklist::{Decklist, DecklistEntry, parse_decklist, parse_line};

mod images;
pub use crate::images::{CardImageCache, download_all_images, download_image, sanitize_card_name};

mod overrides;
pub use crate::overrides::OverrideTable;

mod scryfall;
pub use crate::scryfall::{ImageOrigin, ResolvedImage, query_large_image_uri, resolve_image};

mod scryfall_client;
pub use crate::scryfall_client::ScryfallClient;

mod sheet;
pub use crate::sheet::{
    Placement, SheetLayout, Slot, compose_sheet, encode_sheet, plan_placements, save_sheet,
};

pub const DECKLIST_FILE: &str = "decklist.txt";
pub const OUTPUT_DIR: &str = "output";
pub const CARD_IMAGES_DIR: &str = "card_images";
pub const COMPLETED_TEMPLATE_DIR: &str = "completed_template";
pub const COMPLETED_TEMPLATE_FILE: &str = "completed_template.jpg";

pub const DEFAULT_JOBS: usize = 4;

/// Everything that stays the same for all decks of one run.
#[derive(Debug, Clone)]
pub struct Settings {
    pub layout: SheetLayout,
    pub template: Option<PathBuf>,
    pub jobs: usize,
    pub clean: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            layout: SheetLayout::TABLETOP,
            template: None,
            jobs: DEFAULT_JOBS,
            clean: false,
        }
    }
}

/// Where one deck is read from and written to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeckRequest {
    pub name: String,
    pub decklist: PathBuf,
    pub output: PathBuf,
}

impl DeckRequest {
    /// `<root>/<name>/decklist.txt` with output in `<root>/<name>/output`.
    pub fn in_folder(root: &Path, name: &str) -> DeckRequest {
        let folder = root.join(name);
        DeckRequest {
            name: name.to_string(),
            decklist: folder.join(DECKLIST_FILE),
            output: folder.join(OUTPUT_DIR),
        }
    }

    pub fn card_images_dir(&self) -> PathBuf {
        self.output.join(CARD_IMAGES_DIR)
    }

    pub fn completed_template_path(&self) -> PathBuf {
        self.output
            .join(COMPLETED_TEMPLATE_DIR)
            .join(COMPLETED_TEMPLATE_FILE)
    }

    /// Creates a fresh output tree. A leftover empty directory is replaced,
    /// one with contents is only removed when `clean` is set.
    pub fn prepare_output(&self, clean: bool) -> Result<()> {
        let out = &self.output;
        if out.exists() {
            let is_empty = std::fs::read_dir(out)
                .map_err(Error::io(out))?
                .next()
                .is_none();
            if is_empty {
                debug!("removing empty output directory {}", out.display());
                std::fs::remove_dir(out).map_err(Error::io(out))?;
            } else if clean {
                info!("removing output directory {}", out.display());
                std::fs::remove_dir_all(out).map_err(Error::io(out))?;
            } else {
                return Err(Error::OutputDirNotEmpty(out.clone()));
            }
        }
        for dir in [
            self.card_images_dir(),
            self.output.join(COMPLETED_TEMPLATE_DIR),
        ] {
            std::fs::create_dir_all(&dir).map_err(Error::io(&dir))?;
        }
        Ok(())
    }
}

/// Runs one deck from decklist to finished sheet and returns the path of
/// the sheet. Any error leaves the output directory as it is.
pub async fn process_deck(
    request: &DeckRequest,
    settings: &Settings,
    client: &ScryfallClient,
    overrides: Arc<OverrideTable>,
) -> Result<PathBuf> {
    let decklist = Decklist::from_file(&request.decklist)?;
    info!(
        "{}: {} entries, {} cards",
        request.name,
        decklist.entries.len(),
        decklist.card_count()
    );
    // fail before downloading anything if the deck can't fit
    plan_placements(&decklist, &settings.layout)?;

    request.prepare_output(settings.clean)?;
    let cache = CardImageCache::new(request.card_images_dir());
    let downloaded =
        download_all_images(&decklist, overrides, client.clone(), &cache, settings.jobs).await?;
    info!("{}: downloaded {} card images", request.name, downloaded);

    let template = match &settings.template {
        Some(path) => settings.layout.load_template(path)?,
        None => settings.layout.blank_template()?,
    };
    let sheet = compose_sheet(template, &settings.layout, &decklist, |name| {
        cache.load(name)
    })?;
    let path = request.completed_template_path();
    save_sheet(&sheet, &path)?;
    info!("{}: wrote {}", request.name, path.display());
    Ok(path)
}
