use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use image::ImageReader;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::map::{TileMetrics, TileMetricsError};
use crate::sprite_keys::{validate_sheet_key, SheetKeyError};
use crate::world::{SpriteRef, Unit};

/// Sheet whose first frame defines the tile size of the whole map.
pub const BASE_SHEET: &str = "blanks";
pub const CURSOR_SHEET: &str = "cursor";
pub const UNIT_SHEET: &str = "units";
pub const SPRITE_MANIFEST_FILE: &str = "sprites.json";

const ARROW_SIZE: u32 = 9;
const ARROW_FILL: [u8; 4] = [252, 224, 64, 255];
const ARROW_EDGE: [u8; 4] = [0, 0, 0, 255];
#[rustfmt::skip]
const ARROW_PATTERN: [u8; 81] = [
    0, 0, 2, 2, 2, 2, 2, 0, 0,
    0, 0, 2, 1, 1, 1, 2, 0, 0,
    0, 0, 2, 1, 1, 1, 2, 0, 0,
    2, 2, 2, 1, 1, 1, 2, 2, 2,
    2, 1, 1, 1, 1, 1, 1, 1, 2,
    0, 2, 1, 1, 1, 1, 1, 2, 0,
    0, 0, 2, 1, 1, 1, 2, 0, 0,
    0, 0, 0, 2, 1, 2, 0, 0, 0,
    0, 0, 0, 0, 2, 0, 0, 0, 0,
];

#[derive(Debug, Error)]
pub enum SpriteBankError {
    #[error("failed to read sprite manifest {path}: {source}")]
    ManifestRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse sprite manifest {path}: {source}")]
    ManifestParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid sprite sheet key '{key}': {source}")]
    InvalidSheetKey {
        key: String,
        #[source]
        source: SheetKeyError,
    },
    #[error("sprite sheet '{key}' is listed twice")]
    DuplicateSheet { key: String },
    #[error("failed to load sprite sheet '{key}' from {path}: {source}")]
    ImageLoad {
        key: String,
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error(
        "sprite sheet '{key}' is {image_width}x{image_height}px, \
which is not a whole number of {frame_width}x{frame_height}px frames"
    )]
    FrameGrid {
        key: String,
        frame_width: u32,
        frame_height: u32,
        image_width: u32,
        image_height: u32,
    },
    #[error("sprite buffer of {len} bytes does not hold {width}x{height} RGBA pixels")]
    MalformedSprite { width: u32, height: u32, len: usize },
    #[error("required base sprite sheet '{sheet}' is missing or empty")]
    MissingBaseSprite { sheet: &'static str },
    #[error("base sprite has an unusable size: {0}")]
    InvalidBaseSprite(#[from] TileMetricsError),
}

/// An RGBA8 image. Pixels with zero alpha are transparent when blitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sprite {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
}

impl Sprite {
    pub fn from_rgba(width: u32, height: u32, rgba: Vec<u8>) -> Result<Self, SpriteBankError> {
        if rgba.len() != width as usize * height as usize * 4 {
            return Err(SpriteBankError::MalformedSprite {
                width,
                height,
                len: rgba.len(),
            });
        }
        Ok(Self {
            width,
            height,
            rgba,
        })
    }

    pub fn solid(width: u32, height: u32, color: [u8; 4]) -> Self {
        let rgba = color
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * 4)
            .collect();
        Self {
            width,
            height,
            rgba,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn rgba(&self) -> &[u8] {
        &self.rgba
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = (y as usize * self.width as usize + x as usize) * 4;
        let mut pixel = [0; 4];
        pixel.copy_from_slice(&self.rgba[offset..offset + 4]);
        Some(pixel)
    }

    /// Cuts a row-major grid of `frame_width` x `frame_height` frames.
    fn slice_frames(&self, frame_width: u32, frame_height: u32) -> Vec<Sprite> {
        let columns = self.width / frame_width;
        let rows = self.height / frame_height;
        let mut frames = Vec::with_capacity((columns * rows) as usize);
        for row in 0..rows {
            for column in 0..columns {
                let mut rgba = Vec::with_capacity(frame_width as usize * frame_height as usize * 4);
                for y in 0..frame_height {
                    let src_y = (row * frame_height + y) as usize;
                    let start = (src_y * self.width as usize + (column * frame_width) as usize) * 4;
                    rgba.extend_from_slice(&self.rgba[start..start + frame_width as usize * 4]);
                }
                frames.push(Sprite {
                    width: frame_width,
                    height: frame_height,
                    rgba,
                });
            }
        }
        frames
    }
}

/// The small arrow drawn over the selected unit.
pub fn selection_arrow() -> Sprite {
    let rgba = ARROW_PATTERN
        .iter()
        .flat_map(|cell| match cell {
            1 => ARROW_FILL,
            2 => ARROW_EDGE,
            _ => [0, 0, 0, 0],
        })
        .collect();
    Sprite {
        width: ARROW_SIZE,
        height: ARROW_SIZE,
        rgba,
    }
}

/// Cursor overlay frames. Back frames are drawn under walls and units,
/// front frames over them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CursorFrame {
    BackEmpty,
    BackOccupied,
    BackBelow,
    FrontEmpty,
    FrontOccupied,
    FrontBelow,
}

impl CursorFrame {
    pub const fn index(self) -> usize {
        match self {
            CursorFrame::BackEmpty => 0,
            CursorFrame::BackOccupied => 1,
            CursorFrame::BackBelow => 2,
            CursorFrame::FrontEmpty => 3,
            CursorFrame::FrontOccupied => 4,
            CursorFrame::FrontBelow => 5,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpriteSheet {
    frames: Vec<Sprite>,
}

impl SpriteSheet {
    pub fn new(frames: Vec<Sprite>) -> Self {
        Self { frames }
    }

    pub fn frame(&self, index: usize) -> Option<&Sprite> {
        self.frames.get(index)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SpriteManifest {
    sheets: Vec<SheetEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SheetEntry {
    key: String,
    frame_width: u32,
    frame_height: u32,
}

/// Every sprite the map draws, keyed by sheet. Built once at start-up and
/// read-only afterwards.
#[derive(Debug, Clone)]
pub struct SpriteBank {
    sheets: HashMap<String, SpriteSheet>,
    metrics: TileMetrics,
    arrow: Sprite,
}

impl SpriteBank {
    /// Fails when the base sheet is absent or its first frame is too small
    /// to derive tile metrics from.
    pub fn new(sheets: HashMap<String, SpriteSheet>) -> Result<Self, SpriteBankError> {
        let base = sheets
            .get(BASE_SHEET)
            .and_then(|sheet| sheet.frame(0))
            .ok_or(SpriteBankError::MissingBaseSprite { sheet: BASE_SHEET })?;
        let metrics = TileMetrics::new(base.width(), base.height())?;
        Ok(Self {
            sheets,
            metrics,
            arrow: selection_arrow(),
        })
    }

    /// Loads `sprites.json` from `dir` and one `<key>.png` strip per listed
    /// sheet.
    pub fn load(dir: &Path) -> Result<Self, SpriteBankError> {
        let manifest_path = dir.join(SPRITE_MANIFEST_FILE);
        let raw = fs::read_to_string(&manifest_path).map_err(|source| {
            SpriteBankError::ManifestRead {
                path: manifest_path.clone(),
                source,
            }
        })?;
        let manifest: SpriteManifest =
            serde_json::from_str(&raw).map_err(|source| SpriteBankError::ManifestParse {
                path: manifest_path.clone(),
                source,
            })?;

        let mut sheets = HashMap::with_capacity(manifest.sheets.len());
        for entry in manifest.sheets {
            validate_sheet_key(&entry.key).map_err(|source| SpriteBankError::InvalidSheetKey {
                key: entry.key.clone(),
                source,
            })?;
            if sheets.contains_key(&entry.key) {
                return Err(SpriteBankError::DuplicateSheet { key: entry.key });
            }
            let sheet = load_sheet(dir, &entry)?;
            debug!(sheet = %entry.key, frames = sheet.len(), "sprite_sheet_loaded");
            sheets.insert(entry.key, sheet);
        }

        let bank = Self::new(sheets)?;
        info!(
            dir = %dir.display(),
            sheets = bank.sheets.len(),
            tile_width = bank.metrics.tile_width(),
            tile_height = bank.metrics.tile_height(),
            "sprite_bank_loaded"
        );
        Ok(bank)
    }

    pub fn metrics(&self) -> TileMetrics {
        self.metrics
    }

    pub fn sheet(&self, key: &str) -> Option<&SpriteSheet> {
        self.sheets.get(key)
    }

    pub fn frame(&self, sheet: &str, index: usize) -> Option<&Sprite> {
        self.sheets.get(sheet).and_then(|sheet| sheet.frame(index))
    }

    pub fn terrain(&self, sprite: SpriteRef<'_>) -> Option<&Sprite> {
        self.frame(sprite.sheet, sprite.index)
    }

    pub fn cursor(&self, frame: CursorFrame) -> Option<&Sprite> {
        self.frame(CURSOR_SHEET, frame.index())
    }

    /// Units are drawn from one frame per facing direction.
    pub fn unit(&self, unit: &Unit) -> Option<&Sprite> {
        self.frame(UNIT_SHEET, unit.direction().index())
    }

    pub fn arrow(&self) -> &Sprite {
        &self.arrow
    }
}

fn load_sheet(dir: &Path, entry: &SheetEntry) -> Result<SpriteSheet, SpriteBankError> {
    let path = dir.join(format!("{}.png", entry.key));
    let image_error = |source| SpriteBankError::ImageLoad {
        key: entry.key.clone(),
        path: path.clone(),
        source,
    };
    let reader = ImageReader::open(&path)
        .map_err(|error| image_error(image::ImageError::IoError(error)))?;
    let image = reader.decode().map_err(image_error)?.to_rgba8();
    let (image_width, image_height) = image.dimensions();

    if entry.frame_width == 0
        || entry.frame_height == 0
        || image_width % entry.frame_width != 0
        || image_height % entry.frame_height != 0
    {
        return Err(SpriteBankError::FrameGrid {
            key: entry.key.clone(),
            frame_width: entry.frame_width,
            frame_height: entry.frame_height,
            image_width,
            image_height,
        });
    }

    let strip = Sprite::from_rgba(image_width, image_height, image.into_raw())?;
    Ok(SpriteSheet::new(
        strip.slice_frames(entry.frame_width, entry.frame_height),
    ))
}
