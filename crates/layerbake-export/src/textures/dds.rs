//! DDS (DirectDraw Surface) container output
//!
//! Writes [`Mipmap`] bitmaps as DDS files: DXT1/DXT5 FourCC surfaces for
//! block-compressed chains, 32-bit RGBA for uncompressed ones. The header
//! reader is used to inspect written files.

use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::textures::{Compression, DxtLevel, Mipmap, TextureError, TextureResult};

/// DDS file magic number "DDS "
pub const DDS_MAGIC: u32 = 0x2053_4444;

/// Size of [`DdsHeader`] on disk
const HEADER_SIZE: u32 = 124;

/// Size of [`PixelFormat`] on disk
const PIXEL_FORMAT_SIZE: u32 = 32;

/// DDS header flags
pub mod flags {
    pub const CAPS: u32 = 0x1;
    pub const HEIGHT: u32 = 0x2;
    pub const WIDTH: u32 = 0x4;
    pub const PITCH: u32 = 0x8;
    pub const PIXEL_FORMAT: u32 = 0x1000;
    pub const MIPMAP_COUNT: u32 = 0x20000;
    pub const LINEAR_SIZE: u32 = 0x80000;
}

/// Caps flags
pub mod caps {
    pub const COMPLEX: u32 = 0x8;
    pub const TEXTURE: u32 = 0x1000;
    pub const MIPMAP: u32 = 0x400000;
}

/// DDS pixel format flags
pub mod pf_flags {
    pub const ALPHAPIXELS: u32 = 0x1;
    pub const FOURCC: u32 = 0x4;
    pub const RGB: u32 = 0x40;
}

/// DDS pixel format (32 bytes)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PixelFormat {
    pub flags: u32,
    pub fourcc: [u8; 4],
    pub rgb_bit_count: u32,
    pub r_bit_mask: u32,
    pub g_bit_mask: u32,
    pub b_bit_mask: u32,
    pub a_bit_mask: u32,
}

impl PixelFormat {
    /// Block-compressed surface
    pub fn fourcc(code: [u8; 4]) -> Self {
        Self {
            flags: pf_flags::FOURCC,
            fourcc: code,
            ..Self::default()
        }
    }

    /// 32-bit RGBA in byte order R, G, B, A
    pub fn rgba8() -> Self {
        Self {
            flags: pf_flags::RGB | pf_flags::ALPHAPIXELS,
            fourcc: [0; 4],
            rgb_bit_count: 32,
            r_bit_mask: 0x0000_00FF,
            g_bit_mask: 0x0000_FF00,
            b_bit_mask: 0x00FF_0000,
            a_bit_mask: 0xFF00_0000,
        }
    }

    fn parse<R: Read>(reader: &mut R) -> TextureResult<Self> {
        let size = reader.read_u32::<LittleEndian>()?;
        if size != PIXEL_FORMAT_SIZE {
            return Err(TextureError::Parse(format!(
                "Invalid DDS pixel format size: expected {}, got {}",
                PIXEL_FORMAT_SIZE, size
            )));
        }

        let flags = reader.read_u32::<LittleEndian>()?;
        let mut fourcc = [0u8; 4];
        reader.read_exact(&mut fourcc)?;

        Ok(Self {
            flags,
            fourcc,
            rgb_bit_count: reader.read_u32::<LittleEndian>()?,
            r_bit_mask: reader.read_u32::<LittleEndian>()?,
            g_bit_mask: reader.read_u32::<LittleEndian>()?,
            b_bit_mask: reader.read_u32::<LittleEndian>()?,
            a_bit_mask: reader.read_u32::<LittleEndian>()?,
        })
    }

    fn write<W: Write>(&self, writer: &mut W) -> TextureResult<()> {
        writer.write_u32::<LittleEndian>(PIXEL_FORMAT_SIZE)?;
        writer.write_u32::<LittleEndian>(self.flags)?;
        writer.write_all(&self.fourcc)?;
        writer.write_u32::<LittleEndian>(self.rgb_bit_count)?;
        writer.write_u32::<LittleEndian>(self.r_bit_mask)?;
        writer.write_u32::<LittleEndian>(self.g_bit_mask)?;
        writer.write_u32::<LittleEndian>(self.b_bit_mask)?;
        writer.write_u32::<LittleEndian>(self.a_bit_mask)?;
        Ok(())
    }

    /// Get FourCC as string
    pub fn fourcc_string(&self) -> String {
        String::from_utf8_lossy(&self.fourcc).to_string()
    }
}

/// DDS header (124 bytes, after the magic)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DdsHeader {
    pub flags: u32,
    pub height: u32,
    pub width: u32,
    pub pitch_or_linear_size: u32,
    pub mipmap_count: u32,
    pub pixel_format: PixelFormat,
    pub caps: u32,
}

impl DdsHeader {
    /// Header describing a bitmap's mip chain
    pub fn for_mipmap(mipmap: &Mipmap) -> Self {
        let levels = mipmap.num_levels();
        let mut header_flags = flags::CAPS | flags::HEIGHT | flags::WIDTH | flags::PIXEL_FORMAT;
        let mut header_caps = caps::TEXTURE;

        if levels > 1 {
            header_flags |= flags::MIPMAP_COUNT;
            header_caps |= caps::COMPLEX | caps::MIPMAP;
        }

        let pixel_format = match mipmap.compression() {
            Compression::DirectX => {
                header_flags |= flags::LINEAR_SIZE;
                PixelFormat::fourcc(mipmap.dxt().fourcc())
            }
            Compression::Uncompressed => {
                header_flags |= flags::PITCH;
                PixelFormat::rgba8()
            }
        };

        let pitch_or_linear_size = match mipmap.compression() {
            Compression::DirectX => mipmap.level_byte_size(0) as u32,
            Compression::Uncompressed => mipmap.width() * 4,
        };

        Self {
            flags: header_flags,
            height: mipmap.height(),
            width: mipmap.width(),
            pitch_or_linear_size,
            mipmap_count: levels,
            pixel_format,
            caps: header_caps,
        }
    }

    /// Parse magic and header from reader
    pub fn parse<R: Read>(reader: &mut R) -> TextureResult<Self> {
        let magic = reader.read_u32::<LittleEndian>()?;
        if magic != DDS_MAGIC {
            return Err(TextureError::Parse(format!(
                "Invalid DDS magic: expected {:08X}, found {:08X}",
                DDS_MAGIC, magic
            )));
        }

        let size = reader.read_u32::<LittleEndian>()?;
        if size != HEADER_SIZE {
            return Err(TextureError::Parse(format!(
                "Invalid DDS header size: expected {}, got {}",
                HEADER_SIZE, size
            )));
        }

        let flags = reader.read_u32::<LittleEndian>()?;
        let height = reader.read_u32::<LittleEndian>()?;
        let width = reader.read_u32::<LittleEndian>()?;
        let pitch_or_linear_size = reader.read_u32::<LittleEndian>()?;
        let _depth = reader.read_u32::<LittleEndian>()?;
        let mipmap_count = reader.read_u32::<LittleEndian>()?;

        // Reserved1 (11 u32s)
        let mut reserved = [0u8; 44];
        reader.read_exact(&mut reserved)?;

        let pixel_format = PixelFormat::parse(reader)?;
        let caps = reader.read_u32::<LittleEndian>()?;

        // caps2, caps3, caps4, reserved2
        let mut tail = [0u8; 16];
        reader.read_exact(&mut tail)?;

        Ok(Self {
            flags,
            height,
            width,
            pitch_or_linear_size,
            mipmap_count,
            pixel_format,
            caps,
        })
    }

    /// Write magic and header
    pub fn write<W: Write>(&self, writer: &mut W) -> TextureResult<()> {
        writer.write_u32::<LittleEndian>(DDS_MAGIC)?;
        writer.write_u32::<LittleEndian>(HEADER_SIZE)?;
        writer.write_u32::<LittleEndian>(self.flags)?;
        writer.write_u32::<LittleEndian>(self.height)?;
        writer.write_u32::<LittleEndian>(self.width)?;
        writer.write_u32::<LittleEndian>(self.pitch_or_linear_size)?;
        writer.write_u32::<LittleEndian>(0)?; // depth
        writer.write_u32::<LittleEndian>(self.mipmap_count)?;
        writer.write_all(&[0u8; 44])?;
        self.pixel_format.write(writer)?;
        writer.write_u32::<LittleEndian>(self.caps)?;
        writer.write_all(&[0u8; 16])?;
        Ok(())
    }

    /// Check if this has mipmaps
    pub fn has_mipmaps(&self) -> bool {
        self.caps & caps::MIPMAP != 0 && self.mipmap_count > 1
    }

    /// DXT variant named by the FourCC, if any
    pub fn dxt_level(&self) -> Option<DxtLevel> {
        if self.pixel_format.flags & pf_flags::FOURCC == 0 {
            return None;
        }
        match &self.pixel_format.fourcc {
            b"DXT1" => Some(DxtLevel::Dxt1),
            b"DXT5" => Some(DxtLevel::Dxt5),
            _ => None,
        }
    }
}

/// Read the magic and header at the start of a DDS stream
pub fn read_dds_header<R: Read>(reader: &mut R) -> TextureResult<DdsHeader> {
    DdsHeader::parse(reader)
}

/// Write a complete mip chain as a DDS stream
///
/// Returns the number of bytes written.
pub fn write_dds<W: Write>(mipmap: &Mipmap, writer: &mut W) -> TextureResult<usize> {
    DdsHeader::for_mipmap(mipmap).write(writer)?;
    let mut written = 4 + HEADER_SIZE as usize;

    for level in 0..mipmap.num_levels() {
        let data = mipmap.level(level).ok_or(TextureError::InvalidMipLevel {
            level,
            max: mipmap.num_levels().saturating_sub(1),
        })?;
        writer.write_all(data)?;
        written += data.len();
    }

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::textures::PixelFormat as BasePixelFormat;
    use std::io::Cursor;

    fn filled(mut mipmap: Mipmap) -> Mipmap {
        for level in 0..mipmap.num_levels() {
            let (w, h) = mipmap.level_dimensions(level);
            let data = vec![128u8; (w * h * 4) as usize];
            match mipmap.compression() {
                Compression::DirectX => mipmap.compress_image(level, &data).unwrap(),
                Compression::Uncompressed => mipmap.set_level(level, &data).unwrap(),
            }
        }
        mipmap
    }

    #[test]
    fn test_write_compressed_chain() {
        let mipmap = filled(Mipmap::new("a.dds", 16, 8, 0, Compression::DirectX, BasePixelFormat::Rgb8888, DxtLevel::Dxt5));
        let mut out = Vec::new();
        let written = write_dds(&mipmap, &mut out).unwrap();

        assert_eq!(written, out.len());
        assert_eq!(&out[..4], b"DDS ");
        assert_eq!(out.len(), 128 + mipmap.data_size());

        let header = DdsHeader::parse(&mut Cursor::new(&out)).unwrap();
        assert_eq!((header.width, header.height), (16, 8));
        assert_eq!(header.mipmap_count, 5);
        assert!(header.has_mipmaps());
        assert_eq!(header.dxt_level(), Some(DxtLevel::Dxt5));
        assert_eq!(header.pitch_or_linear_size, 8 * 16);
        assert_eq!(header.pixel_format.fourcc_string(), "DXT5");
    }

    #[test]
    fn test_write_uncompressed() {
        let mipmap = filled(Mipmap::new("a.bmp", 4, 2, 1, Compression::Uncompressed, BasePixelFormat::Rgb8888, DxtLevel::Dxt1));
        let mut out = Vec::new();
        write_dds(&mipmap, &mut out).unwrap();

        let header = DdsHeader::parse(&mut Cursor::new(&out)).unwrap();
        assert!(!header.has_mipmaps());
        assert_eq!(header.dxt_level(), None);
        assert_eq!(header.pixel_format, PixelFormat::rgba8());
        assert_eq!(header.pitch_or_linear_size, 16);
        assert_eq!(header.flags & flags::PITCH, flags::PITCH);
    }

    #[test]
    fn test_incomplete_chain_rejected() {
        let mipmap = Mipmap::new("a.dds", 4, 4, 0, Compression::DirectX, BasePixelFormat::Rgb8888, DxtLevel::Dxt1);
        let mut out = Vec::new();
        assert!(matches!(
            write_dds(&mipmap, &mut out),
            Err(TextureError::InvalidMipLevel { level: 0, .. })
        ));
    }

    #[test]
    fn test_bad_magic() {
        let err = DdsHeader::parse(&mut Cursor::new(b"BMP not a dds file")).unwrap_err();
        assert!(matches!(err, TextureError::Parse(_)));
    }
}
