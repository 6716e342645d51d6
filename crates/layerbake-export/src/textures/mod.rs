//! Texture baking, bitmap containers and bitmap file output
//!
//! Binds scene images to GPU textures, reads their mip chains back and packs
//! them into [`Mipmap`] containers (DXT-compressed or raw RGBA8).

mod bitmap;
pub mod dds;
mod gl_texture;
mod writer;

pub use bitmap::{Bitmap, Compression, DxtLevel, DynamicTextMap, Mipmap, PixelFormat};
pub use gl_texture::{compute_alpha, ActiveTexture, GlTexture};
pub use writer::{BitmapWriter, BitmapWriterOptions};

use thiserror::Error;

use layerbake_render::GpuError;

/// Texture baking errors
#[derive(Error, Debug)]
pub enum TextureError {
    #[error("Failed to load image '{image}' into a GPU texture: {source}")]
    GlLoad {
        image: String,
        #[source]
        source: GpuError,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid mipmap level: {level} (max: {max})")]
    InvalidMipLevel { level: u32, max: u32 },

    #[error("Mip level {level} expects {expected} bytes, got {actual}")]
    LevelSizeMismatch {
        level: u32,
        expected: usize,
        actual: usize,
    },
}

pub type TextureResult<T> = Result<T, TextureError>;

/// Nearest power of two, rounding in log2 space
///
/// `2^round(log2(dim))`: 384 rounds up to 512, 320 rounds down to 256.
pub fn nearest_pot(dim: u32) -> u32 {
    if dim == 0 {
        return 0;
    }
    let exponent = f64::from(dim).log2().round() as u32;
    1u32 << exponent.min(31)
}

/// Power-of-two dimensions for an image of the given size
pub fn pot_dimensions(width: u32, height: u32) -> (u32, u32) {
    (nearest_pot(width), nearest_pot(height))
}
