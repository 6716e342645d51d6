//! Texture context trait

use thiserror::Error;

/// GPU texture object name
pub type TextureName = u32;

/// The reserved "no texture" name
pub const NO_TEXTURE: TextureName = 0;

/// Backend failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GpuError {
    #[error("Texture {width}x{height} exceeds the maximum size {max}")]
    TextureTooLarge { width: u32, height: u32, max: u32 },

    #[error("Invalid texture dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("Pixel buffer holds {actual} bytes, expected {expected}")]
    PixelBufferSize { expected: usize, actual: usize },

    #[error("No texture named {0}")]
    UnknownTexture(TextureName),
}

pub type GpuResult<T> = Result<T, GpuError>;

/// Fixed-function 2D texture state of a single context
///
/// All per-texture queries act on the currently bound texture. Querying a
/// level that does not exist is a contract violation; implementations may
/// report it as a zero size.
pub trait GpuContext {
    /// Texture bound to the 2D target
    fn bound_texture(&self) -> TextureName;

    /// Bind a texture to the 2D target (`NO_TEXTURE` unbinds)
    fn bind_texture(&mut self, name: TextureName);

    /// Automatic mipmap generation parameter of the bound texture
    fn generate_mipmap(&self) -> bool;

    /// Set the automatic mipmap generation parameter of the bound texture
    ///
    /// Enabling it regenerates every level below the base level.
    fn set_generate_mipmap(&mut self, enabled: bool);

    /// (width, height) of a level of the bound texture
    fn level_size(&self, level: u32) -> (u32, u32);

    /// Read a level of the bound texture as tightly packed RGBA8
    ///
    /// `out` must hold `width * height * 4` bytes for that level.
    fn read_level(&self, level: u32, out: &mut [u8]);

    /// Allocate a texture holding `rgba` as its base level
    ///
    /// The binding point is left unchanged.
    fn upload(&mut self, width: u32, height: u32, rgba: &[u8]) -> GpuResult<TextureName>;

    /// Replace the base level of an existing texture, dropping its other levels
    ///
    /// The name, the binding point and the generation parameter are kept.
    /// With generation enabled the chain is rebuilt from the new base level.
    fn respecify(&mut self, name: TextureName, width: u32, height: u32, rgba: &[u8]) -> GpuResult<()>;

    /// Delete a texture; unbinds it if bound
    fn free(&mut self, name: TextureName);
}
