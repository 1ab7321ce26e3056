//! Decoded images and sprite-sheet frames

use parking_lot::Mutex;
use std::collections::HashMap;

use super::AssetError;

/// Sub-region of a sprite sheet, in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameRect {
    /// Left edge
    pub x: u32,
    /// Top edge
    pub y: u32,
    /// Width
    pub width: u32,
    /// Height
    pub height: u32,
}

type FrameKey = (u32, u32, u32, u32);

/// Decoded RGBA8 image ready for upload
#[derive(Debug)]
pub struct Sprite {
    key: String,
    width: u32,
    height: u32,
    pixels: Vec<u8>,
    frames: Mutex<HashMap<FrameKey, FrameRect>>,
}

impl Sprite {
    /// Decode PNG bytes read for `key`
    pub fn decode(key: &str, bytes: &[u8]) -> Result<Self, AssetError> {
        let image = image::load_from_memory(bytes).map_err(|e| AssetError::Decode {
            key: key.to_string(),
            reason: e.to_string(),
        })?;

        let rgba = image.to_rgba8();
        let (width, height) = rgba.dimensions();
        log::trace!("Decoded sprite '{key}' ({width}x{height})");

        Ok(Self::from_rgba(key, width, height, rgba.into_raw()))
    }

    /// Sprite from raw RGBA8 pixels
    pub fn from_rgba(key: &str, width: u32, height: u32, pixels: Vec<u8>) -> Self {
        Self {
            key: key.to_string(),
            width,
            height,
            pixels,
            frames: Mutex::new(HashMap::new()),
        }
    }

    /// Key the sprite was registered under
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Width in pixels
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// RGBA8 pixel data, row major
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Frame at (`row`, `column`) of a sheet split into `frame_width` x `frame_height` cells.
    ///
    /// Returns `None` when the cell falls outside the image. Computed frames
    /// are memoized per sprite.
    pub fn frame(&self, row: u32, column: u32, frame_width: u32, frame_height: u32) -> Option<FrameRect> {
        if frame_width == 0 || frame_height == 0 {
            return None;
        }

        let key = (row, column, frame_width, frame_height);
        if let Some(frame) = self.frames.lock().get(&key) {
            return Some(*frame);
        }

        let x = column.checked_mul(frame_width)?;
        let y = row.checked_mul(frame_height)?;
        if x.checked_add(frame_width)? > self.width || y.checked_add(frame_height)? > self.height {
            return None;
        }

        let frame = FrameRect {
            x,
            y,
            width: frame_width,
            height: frame_height,
        };
        self.frames.lock().insert(key, frame);
        Some(frame)
    }
}
