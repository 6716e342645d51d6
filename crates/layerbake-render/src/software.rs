//! CPU implementation of [`GpuContext`]

use std::cell::Cell;
use std::collections::HashMap;

use image::{imageops, RgbaImage};

use crate::context::{GpuContext, GpuError, GpuResult, TextureName, NO_TEXTURE};

/// Default maximum texture edge, matching common fixed-function hardware
const DEFAULT_MAX_TEXTURE_SIZE: u32 = 8192;

/// Counters of work done by the backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GpuStats {
    pub uploads: usize,
    pub frees: usize,
    pub binds: usize,
    pub level_reads: usize,
    pub mipmap_generations: usize,
    pub respecifications: usize,
}

#[derive(Debug)]
struct SoftTexture {
    /// levels[0] is the base level
    levels: Vec<RgbaImage>,
    generate_mipmap: bool,
}

impl SoftTexture {
    /// Rebuild every level below the base level
    fn regenerate(&mut self) {
        self.levels.truncate(1);
        let (mut width, mut height) = self.levels[0].dimensions();

        while width > 1 || height > 1 {
            width = (width / 2).max(1);
            height = (height / 2).max(1);
            let prev = &self.levels[self.levels.len() - 1];
            let next = imageops::resize(prev, width, height, imageops::FilterType::Triangle);
            self.levels.push(next);
        }
    }
}

/// Headless texture context
///
/// Texture names are handed out from 1 upward and never reused within one
/// context.
#[derive(Debug)]
pub struct SoftwareGpu {
    textures: HashMap<TextureName, SoftTexture>,
    next_name: TextureName,
    bound: TextureName,
    max_texture_size: u32,
    stats: GpuStats,
    // read_level takes &self
    level_reads: Cell<usize>,
}

impl SoftwareGpu {
    pub fn new() -> Self {
        Self {
            textures: HashMap::new(),
            next_name: 1,
            bound: NO_TEXTURE,
            max_texture_size: DEFAULT_MAX_TEXTURE_SIZE,
            stats: GpuStats::default(),
            level_reads: Cell::new(0),
        }
    }

    /// Context rejecting uploads larger than `max` on either axis
    pub fn with_max_texture_size(max: u32) -> Self {
        Self {
            max_texture_size: max,
            ..Self::new()
        }
    }

    pub fn stats(&self) -> GpuStats {
        GpuStats {
            level_reads: self.level_reads.get(),
            ..self.stats
        }
    }

    /// Number of live textures
    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    pub fn is_texture(&self, name: TextureName) -> bool {
        self.textures.contains_key(&name)
    }

    /// Number of levels currently held by a texture
    pub fn level_count(&self, name: TextureName) -> usize {
        self.textures.get(&name).map_or(0, |t| t.levels.len())
    }

    fn bound_mut(&mut self) -> Option<&mut SoftTexture> {
        self.textures.get_mut(&self.bound)
    }

    /// Validate a base level against the context limits
    fn base_level(&self, width: u32, height: u32, rgba: &[u8]) -> GpuResult<RgbaImage> {
        if width == 0 || height == 0 {
            return Err(GpuError::InvalidDimensions { width, height });
        }
        if width > self.max_texture_size || height > self.max_texture_size {
            return Err(GpuError::TextureTooLarge {
                width,
                height,
                max: self.max_texture_size,
            });
        }

        let expected = width as usize * height as usize * 4;
        RgbaImage::from_raw(width, height, rgba.to_vec()).ok_or(GpuError::PixelBufferSize {
            expected,
            actual: rgba.len(),
        })
    }

    fn bound_level(&self, level: u32) -> Option<&RgbaImage> {
        self.textures
            .get(&self.bound)
            .and_then(|t| t.levels.get(level as usize))
    }
}

impl Default for SoftwareGpu {
    fn default() -> Self {
        Self::new()
    }
}

impl GpuContext for SoftwareGpu {
    fn bound_texture(&self) -> TextureName {
        self.bound
    }

    fn bind_texture(&mut self, name: TextureName) {
        self.stats.binds += 1;
        self.bound = name;
    }

    fn generate_mipmap(&self) -> bool {
        self.textures
            .get(&self.bound)
            .is_some_and(|t| t.generate_mipmap)
    }

    fn set_generate_mipmap(&mut self, enabled: bool) {
        let mut regenerated = false;
        if let Some(texture) = self.bound_mut() {
            texture.generate_mipmap = enabled;
            if enabled {
                texture.regenerate();
                regenerated = true;
            }
        }
        if regenerated {
            self.stats.mipmap_generations += 1;
            tracing::trace!(texture = self.bound, levels = self.level_count(self.bound), "Regenerated mip chain");
        }
    }

    fn level_size(&self, level: u32) -> (u32, u32) {
        self.bound_level(level).map_or((0, 0), RgbaImage::dimensions)
    }

    fn read_level(&self, level: u32, out: &mut [u8]) {
        if let Some(image) = self.bound_level(level) {
            self.level_reads.set(self.level_reads.get() + 1);
            let raw = image.as_raw();
            let len = raw.len().min(out.len());
            out[..len].copy_from_slice(&raw[..len]);
        }
    }

    fn upload(&mut self, width: u32, height: u32, rgba: &[u8]) -> GpuResult<TextureName> {
        let base = self.base_level(width, height, rgba)?;

        let name = self.next_name;
        self.next_name += 1;
        self.textures.insert(
            name,
            SoftTexture {
                levels: vec![base],
                generate_mipmap: false,
            },
        );
        self.stats.uploads += 1;
        tracing::trace!(texture = name, width, height, "Uploaded texture");
        Ok(name)
    }

    fn respecify(&mut self, name: TextureName, width: u32, height: u32, rgba: &[u8]) -> GpuResult<()> {
        let base = self.base_level(width, height, rgba)?;
        let texture = self
            .textures
            .get_mut(&name)
            .ok_or(GpuError::UnknownTexture(name))?;

        texture.levels = vec![base];
        if texture.generate_mipmap {
            texture.regenerate();
            self.stats.mipmap_generations += 1;
        }
        self.stats.respecifications += 1;
        tracing::trace!(texture = name, width, height, "Respecified texture");
        Ok(())
    }

    fn free(&mut self, name: TextureName) {
        if self.textures.remove(&name).is_some() {
            self.stats.frees += 1;
            if self.bound == name {
                self.bound = NO_TEXTURE;
            }
        }
    }
}
