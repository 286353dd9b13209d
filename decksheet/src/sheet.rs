use image::imageops::FilterType;
use image::{DynamicImage, GenericImage, ImageFormat, Rgb, RgbImage};
use log::{debug, info};
use std::collections::HashMap;
use std::io::Cursor;
use std::path::Path;

use crate::decklist::Decklist;
use crate::error::{Error, Result};

/// Grid geometry of a sheet. The last cell stays empty, tabletop simulator
/// uses it for the hidden card.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SheetLayout {
    pub rows: u32,
    pub columns: u32,
    pub cell_width: u32,
    pub cell_height: u32,
}

impl SheetLayout {
    pub const TABLETOP: SheetLayout = SheetLayout {
        rows: 7,
        columns: 10,
        cell_width: 406,
        cell_height: 580,
    };

    pub fn width(&self) -> u32 {
        self.columns.saturating_mul(self.cell_width)
    }

    pub fn height(&self) -> u32 {
        self.rows.saturating_mul(self.cell_height)
    }

    pub fn capacity(&self) -> usize {
        (self.rows as usize)
            .saturating_mul(self.columns as usize)
            .saturating_sub(1)
    }

    /// No dimension may be zero and the sheet must fit in `u32` pixels.
    pub fn validate(&self) -> Result<()> {
        let fits = self.columns.checked_mul(self.cell_width).is_some()
            && self.rows.checked_mul(self.cell_height).is_some();
        let empty = [self.rows, self.columns, self.cell_width, self.cell_height].contains(&0);
        if empty || !fits {
            return Err(Error::InvalidLayout(*self));
        }
        Ok(())
    }

    pub fn blank_template(&self) -> Result<RgbImage> {
        self.validate()?;
        Ok(RgbImage::from_pixel(
            self.width(),
            self.height(),
            Rgb([255, 255, 255]),
        ))
    }

    /// Loads a template image and drops its alpha channel.
    pub fn load_template(&self, path: &Path) -> Result<RgbImage> {
        self.validate()?;
        let bytes = std::fs::read(path).map_err(Error::io(path))?;
        let template = image::load_from_memory(&bytes)?.to_rgb8();
        if template.dimensions() != (self.width(), self.height()) {
            return Err(Error::TemplateSize {
                expected: (self.width(), self.height()),
                found: template.dimensions(),
            });
        }
        Ok(template)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub row: u32,
    pub column: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement<'a> {
    pub name: &'a str,
    pub slot: Slot,
}

/// One placement per physical card, row-major from the top left.
pub fn plan_placements<'a>(
    decklist: &'a Decklist,
    layout: &SheetLayout,
) -> Result<Vec<Placement<'a>>> {
    layout.validate()?;
    let cards = decklist.card_count();
    if cards > layout.capacity() {
        return Err(Error::CapacityExceeded {
            cards,
            capacity: layout.capacity(),
        });
    }
    let mut placements = Vec::with_capacity(cards);
    let (mut row, mut column) = (0, 0);
    for entry in decklist.entries.iter() {
        for _ in 0..entry.quantity {
            placements.push(Placement {
                name: &entry.name,
                slot: Slot { row, column },
            });
            column += 1;
            if column == layout.columns {
                column = 0;
                row += 1;
            }
        }
    }
    Ok(placements)
}

/// Fills the template with the deck's cards. `load` is called once per
/// distinct card name; every image is stretched to exactly one cell.
pub fn compose_sheet<F>(
    mut template: RgbImage,
    layout: &SheetLayout,
    decklist: &Decklist,
    mut load: F,
) -> Result<RgbImage>
where
    F: FnMut(&str) -> Result<DynamicImage>,
{
    layout.validate()?;
    if template.dimensions() != (layout.width(), layout.height()) {
        return Err(Error::TemplateSize {
            expected: (layout.width(), layout.height()),
            found: template.dimensions(),
        });
    }
    let placements = plan_placements(decklist, layout)?;
    let mut cells: HashMap<&str, RgbImage> = HashMap::new();
    for placement in placements.iter() {
        if !cells.contains_key(placement.name) {
            let cell = load(placement.name)?
                .resize_exact(layout.cell_width, layout.cell_height, FilterType::Triangle)
                .to_rgb8();
            cells.insert(placement.name, cell);
        }
        let cell = &cells[placement.name];
        debug!(
            "placing {} at row {}, column {}",
            placement.name, placement.slot.row, placement.slot.column
        );
        template.copy_from(
            cell,
            placement.slot.column * layout.cell_width,
            placement.slot.row * layout.cell_height,
        )?;
    }
    info!(
        "composed {} cards from {} images",
        placements.len(),
        cells.len()
    );
    Ok(template)
}

pub fn encode_sheet(sheet: &RgbImage) -> Result<Vec<u8>> {
    let mut bytes = Cursor::new(Vec::new());
    sheet.write_to(&mut bytes, ImageFormat::Jpeg)?;
    Ok(bytes.into_inner())
}

pub fn save_sheet(sheet: &RgbImage, path: &Path) -> Result<()> {
    let bytes = encode_sheet(sheet)?;
    std::fs::write(path, bytes).map_err(Error::io(path))
}
