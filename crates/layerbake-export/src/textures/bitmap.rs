//! Runtime bitmap containers

use serde::Serialize;

use crate::textures::{TextureError, TextureResult};

/// How mip levels are stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    /// Raw pixels in the base pixel format
    Uncompressed,
    /// DXT block compression
    DirectX,
}

/// DXT variant used with [`Compression::DirectX`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DxtLevel {
    /// BC1, no alpha
    #[serde(rename = "DXT1")]
    Dxt1,
    /// BC3, interpolated alpha
    #[serde(rename = "DXT5")]
    Dxt5,
}

impl DxtLevel {
    /// DDS FourCC code
    pub fn fourcc(&self) -> [u8; 4] {
        match self {
            DxtLevel::Dxt1 => *b"DXT1",
            DxtLevel::Dxt5 => *b"DXT5",
        }
    }

    /// Bytes per 4x4 block
    pub fn block_size(&self) -> usize {
        match self {
            DxtLevel::Dxt1 => 8,
            DxtLevel::Dxt5 => 16,
        }
    }

    fn codec(&self) -> texpresso::Format {
        match self {
            DxtLevel::Dxt1 => texpresso::Format::Bc1,
            DxtLevel::Dxt5 => texpresso::Format::Bc3,
        }
    }
}

/// Base pixel format of a bitmap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PixelFormat {
    /// 8 bits per channel RGBA
    #[serde(rename = "RGB8888")]
    Rgb8888,
}

impl PixelFormat {
    pub fn bits_per_pixel(&self) -> u32 {
        match self {
            PixelFormat::Rgb8888 => 32,
        }
    }
}

/// Number of levels in a full chain down to 1x1
fn full_chain_levels(width: u32, height: u32) -> u32 {
    let largest = width.max(height).max(1);
    32 - largest.leading_zeros()
}

/// Static bitmap with a mip chain
#[derive(Debug, Clone)]
pub struct Mipmap {
    name: String,
    width: u32,
    height: u32,
    compression: Compression,
    format: PixelFormat,
    dxt: DxtLevel,
    levels: Vec<Option<Vec<u8>>>,
}

impl Mipmap {
    /// Create an empty container
    ///
    /// A `level_hint` of 0 resolves to the full chain down to 1x1; any other
    /// value is capped at the full chain length.
    pub fn new(
        name: impl Into<String>,
        width: u32,
        height: u32,
        level_hint: u32,
        compression: Compression,
        format: PixelFormat,
        dxt: DxtLevel,
    ) -> Self {
        let full = full_chain_levels(width, height);
        let num_levels = if level_hint == 0 { full } else { level_hint.min(full) };

        Self {
            name: name.into(),
            width,
            height,
            compression,
            format,
            dxt,
            levels: vec![None; num_levels as usize],
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn compression(&self) -> Compression {
        self.compression
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn dxt(&self) -> DxtLevel {
        self.dxt
    }

    /// Resolved number of mip levels
    pub fn num_levels(&self) -> u32 {
        self.levels.len() as u32
    }

    /// (width, height) of a level
    pub fn level_dimensions(&self, level: u32) -> (u32, u32) {
        ((self.width >> level).max(1), (self.height >> level).max(1))
    }

    /// Stored byte size of a level
    pub fn level_byte_size(&self, level: u32) -> usize {
        let (width, height) = self.level_dimensions(level);
        match self.compression {
            Compression::DirectX => self.dxt.codec().compressed_size(width as usize, height as usize),
            Compression::Uncompressed => {
                width as usize * height as usize * (self.format.bits_per_pixel() / 8) as usize
            }
        }
    }

    /// Stored bytes of a level, if it has been filled
    pub fn level(&self, level: u32) -> Option<&[u8]> {
        self.levels.get(level as usize).and_then(|l| l.as_deref())
    }

    /// Total stored bytes
    pub fn data_size(&self) -> usize {
        self.levels.iter().flatten().map(Vec::len).sum()
    }

    /// Stored level as RGBA8, decoding DXT blocks if needed
    pub fn decode_level(&self, level: u32) -> TextureResult<Vec<u8>> {
        let data = self.level(level).ok_or(TextureError::InvalidMipLevel {
            level,
            max: self.num_levels().saturating_sub(1),
        })?;

        match self.compression {
            Compression::Uncompressed => Ok(data.to_vec()),
            Compression::DirectX => {
                let (width, height) = self.level_dimensions(level);
                let mut rgba = vec![0u8; width as usize * height as usize * 4];
                self.dxt
                    .codec()
                    .decompress(data, width as usize, height as usize, &mut rgba);
                Ok(rgba)
            }
        }
    }

    /// DXT-encode an RGBA8 level and store it
    pub fn compress_image(&mut self, level: u32, rgba: &[u8]) -> TextureResult<()> {
        self.check_level(level, rgba)?;
        let (width, height) = self.level_dimensions(level);
        let codec = self.dxt.codec();

        let mut encoded = vec![0u8; codec.compressed_size(width as usize, height as usize)];
        codec.compress(
            rgba,
            width as usize,
            height as usize,
            texpresso::Params::default(),
            &mut encoded,
        );
        self.levels[level as usize] = Some(encoded);
        Ok(())
    }

    /// Store an RGBA8 level as-is
    pub fn set_level(&mut self, level: u32, rgba: &[u8]) -> TextureResult<()> {
        self.check_level(level, rgba)?;
        self.levels[level as usize] = Some(rgba.to_vec());
        Ok(())
    }

    fn check_level(&self, level: u32, rgba: &[u8]) -> TextureResult<()> {
        if level >= self.num_levels() {
            return Err(TextureError::InvalidMipLevel {
                level,
                max: self.num_levels().saturating_sub(1),
            });
        }

        let (width, height) = self.level_dimensions(level);
        let expected = width as usize * height as usize * 4;
        if rgba.len() != expected {
            return Err(TextureError::LevelSizeMismatch {
                level,
                expected,
                actual: rgba.len(),
            });
        }
        Ok(())
    }
}

/// Bitmap drawn at runtime, without pixel payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DynamicTextMap {
    pub name: String,
}

/// Bitmap referenced by a layer
#[derive(Debug, Clone)]
pub enum Bitmap {
    Mipmap(Mipmap),
    DynamicText(DynamicTextMap),
}

impl Bitmap {
    pub fn name(&self) -> &str {
        match self {
            Bitmap::Mipmap(mipmap) => mipmap.name(),
            Bitmap::DynamicText(map) => &map.name,
        }
    }

    pub fn as_mipmap(&self) -> Option<&Mipmap> {
        match self {
            Bitmap::Mipmap(mipmap) => Some(mipmap),
            Bitmap::DynamicText(_) => None,
        }
    }

    pub fn is_dynamic(&self) -> bool {
        matches!(self, Bitmap::DynamicText(_))
    }
}
