//! Bitmap file output
//!
//! Writes baked [`Mipmap`]s to disk. Names ending in `.dds` are written as a
//! DDS container with every stored level; names ending in `.bmp` get the
//! base level as an uncompressed BMP.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageFormat, RgbaImage};

use crate::textures::{dds, Mipmap, TextureError, TextureResult};

/// Bitmap writer options
#[derive(Debug, Clone)]
pub struct BitmapWriterOptions {
    /// Write `.dds` bitmaps
    pub write_dds: bool,

    /// Write `.bmp` bitmaps
    pub write_bmp: bool,

    /// Replace files that already exist
    pub overwrite: bool,
}

impl Default for BitmapWriterOptions {
    fn default() -> Self {
        Self {
            write_dds: true,
            write_bmp: true,
            overwrite: true,
        }
    }
}

/// Writes bitmaps into an output directory
#[derive(Debug, Clone, Default)]
pub struct BitmapWriter {
    options: BitmapWriterOptions,
}

impl BitmapWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: BitmapWriterOptions) -> Self {
        Self { options }
    }

    /// Write one bitmap into `dir`
    ///
    /// Returns the written path, or `None` when the bitmap was skipped by
    /// the options or because the file exists and `overwrite` is off.
    pub fn write(&self, mipmap: &Mipmap, dir: impl AsRef<Path>) -> TextureResult<Option<PathBuf>> {
        let dir = dir.as_ref();
        let path = dir.join(mipmap.name());

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);

        let enabled = match extension.as_deref() {
            Some("dds") => self.options.write_dds,
            Some("bmp") => self.options.write_bmp,
            _ => {
                return Err(TextureError::Parse(format!(
                    "Unknown bitmap file type for '{}'",
                    mipmap.name()
                )))
            }
        };

        if !enabled {
            tracing::debug!(bitmap = mipmap.name(), "Skipping disabled bitmap type");
            return Ok(None);
        }
        if path.exists() && !self.options.overwrite {
            tracing::debug!(path = %path.display(), "Keeping existing bitmap");
            return Ok(None);
        }

        fs::create_dir_all(dir)?;

        if extension.as_deref() == Some("dds") {
            let mut writer = BufWriter::new(File::create(&path)?);
            let bytes = dds::write_dds(mipmap, &mut writer)?;
            writer.flush()?;
            tracing::debug!(path = %path.display(), bytes, "Wrote DDS");
        } else {
            self.write_bmp(mipmap, &path)?;
        }

        Ok(Some(path))
    }

    fn write_bmp(&self, mipmap: &Mipmap, path: &Path) -> TextureResult<()> {
        let (width, height) = mipmap.level_dimensions(0);
        let rgba = mipmap.decode_level(0)?;

        let img = RgbaImage::from_raw(width, height, rgba).ok_or_else(|| {
            TextureError::Parse(format!("Base level of '{}' has the wrong size", mipmap.name()))
        })?;

        DynamicImage::ImageRgba8(img).save_with_format(path, ImageFormat::Bmp)?;
        tracing::debug!(path = %path.display(), width, height, "Wrote BMP");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::textures::{Compression, DxtLevel, PixelFormat};
    use tempfile::TempDir;

    fn filled(name: &str, size: u32, compression: Compression) -> Mipmap {
        let hint = if compression == Compression::DirectX { 0 } else { 1 };
        let mut mipmap = Mipmap::new(name, size, size, hint, compression, PixelFormat::Rgb8888, DxtLevel::Dxt1);
        for level in 0..mipmap.num_levels() {
            let (w, h) = mipmap.level_dimensions(level);
            let data = [10u8, 20, 30, 255].repeat((w * h) as usize);
            match compression {
                Compression::DirectX => mipmap.compress_image(level, &data).unwrap(),
                Compression::Uncompressed => mipmap.set_level(level, &data).unwrap(),
            }
        }
        mipmap
    }

    #[test]
    fn test_write_dds() {
        let dir = TempDir::new().unwrap();
        let mipmap = filled("Brick.dds", 8, Compression::DirectX);

        let path = BitmapWriter::new().write(&mipmap, dir.path()).unwrap().unwrap();
        assert_eq!(path, dir.path().join("Brick.dds"));

        let bytes = fs::read(&path).unwrap();
        assert_eq!(&bytes[0..4], b"DDS ");
        // header + 32 + 8 + 8 + 8
        assert_eq!(bytes.len(), 128 + 56);
    }

    #[test]
    fn test_write_bmp() {
        let dir = TempDir::new().unwrap();
        let mipmap = filled("Sky.bmp", 4, Compression::Uncompressed);

        let path = BitmapWriter::new().write(&mipmap, dir.path()).unwrap().unwrap();
        let decoded = image::open(&path).unwrap().to_rgba8();
        assert_eq!(decoded.dimensions(), (4, 4));
        assert_eq!(decoded.get_pixel(0, 0).0, [10, 20, 30, 255]);
    }

    #[test]
    fn test_disabled_and_existing_are_skipped() {
        let dir = TempDir::new().unwrap();
        let mipmap = filled("Sky.bmp", 4, Compression::Uncompressed);

        let no_bmp = BitmapWriter::with_options(BitmapWriterOptions {
            write_bmp: false,
            ..Default::default()
        });
        assert!(no_bmp.write(&mipmap, dir.path()).unwrap().is_none());

        BitmapWriter::new().write(&mipmap, dir.path()).unwrap();
        let keep = BitmapWriter::with_options(BitmapWriterOptions {
            overwrite: false,
            ..Default::default()
        });
        assert!(keep.write(&mipmap, dir.path()).unwrap().is_none());
    }
}
