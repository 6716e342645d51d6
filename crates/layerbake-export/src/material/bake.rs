//! Image bake path: POT resize, policy, mip readback

use layerbake_core::{Image, Texture};
use layerbake_render::GpuContext;

use crate::textures::{
    pot_dimensions, Compression, DxtLevel, GlTexture, Mipmap, PixelFormat, TextureResult,
};

/// Container settings chosen from a texture's flags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BakePolicy {
    /// 0 for the full chain
    pub level_hint: u32,
    pub compression: Compression,
    pub dxt: DxtLevel,
}

impl BakePolicy {
    pub fn for_texture(texture: &Texture) -> Self {
        let (level_hint, compression) = if texture.use_mipmap {
            (0, Compression::DirectX)
        } else {
            (1, Compression::Uncompressed)
        };
        let dxt = if texture.use_alpha || texture.use_calculate_alpha {
            DxtLevel::Dxt5
        } else {
            DxtLevel::Dxt1
        };

        Self {
            level_hint,
            compression,
            dxt,
        }
    }
}

/// Bitmap name an image bakes to
///
/// Everything from the first `.` of the image name is dropped, then the
/// extension follows the mipmap flag: `Brick.001` becomes `Brick.dds` or
/// `Brick.bmp`.
pub fn normalized_bitmap_name(image_name: &str, use_mipmap: bool) -> String {
    let stem = image_name.split('.').next().unwrap_or(image_name);
    let extension = if use_mipmap { "dds" } else { "bmp" };
    format!("{stem}.{extension}")
}

/// Bake an image into a bitmap container named `name`
///
/// Images that are not a power of two on both axes are resized in place
/// first. GPU state is restored before returning, on success and on error.
pub fn bake_image<G: GpuContext>(
    gpu: &mut G,
    image: &mut Image,
    texture: &Texture,
    name: &str,
) -> TextureResult<Mipmap> {
    let (width, height) = image.size();
    let (pot_width, pot_height) = pot_dimensions(width, height);
    if (pot_width, pot_height) != (width, height) {
        tracing::warn!(
            image = %image.name,
            width,
            height,
            pot_width,
            pot_height,
            "Image is not a power of two, resizing"
        );
        image.scale(pot_width, pot_height);
    }

    let policy = BakePolicy::for_texture(texture);
    let mut mipmap = Mipmap::new(
        name,
        pot_width,
        pot_height,
        policy.level_hint,
        policy.compression,
        PixelFormat::Rgb8888,
        policy.dxt,
    );
    tracing::info!(
        bitmap = name,
        width = pot_width,
        height = pot_height,
        levels = mipmap.num_levels(),
        compression = ?policy.compression,
        dxt = ?policy.dxt,
        "Baking bitmap"
    );

    let mut binding = GlTexture::acquire(gpu, image)?;
    let mut active = binding.activate();
    if texture.use_mipmap {
        active.generate_mipmap();
    }

    for level in 0..mipmap.num_levels() {
        let data = active.level_data(level, texture.use_calculate_alpha);
        tracing::debug!(bitmap = name, level, bytes = data.len(), "Read mip level");
        match policy.compression {
            Compression::DirectX => mipmap.compress_image(level, &data)?,
            Compression::Uncompressed => mipmap.set_level(level, &data)?,
        }
    }

    Ok(mipmap)
}

#[cfg(test)]
mod tests {
    use super::*;
    use layerbake_core::Color;
    use layerbake_render::SoftwareGpu;

    fn texture(use_mipmap: bool, use_alpha: bool, calc_alpha: bool) -> Texture {
        Texture {
            use_mipmap,
            use_alpha,
            use_calculate_alpha: calc_alpha,
            ..Texture::image("Tex", Some("Img"))
        }
    }

    #[test]
    fn test_policy() {
        let p = BakePolicy::for_texture(&texture(true, true, false));
        assert_eq!((p.level_hint, p.compression, p.dxt), (0, Compression::DirectX, DxtLevel::Dxt5));

        let p = BakePolicy::for_texture(&texture(true, false, false));
        assert_eq!((p.level_hint, p.compression, p.dxt), (0, Compression::DirectX, DxtLevel::Dxt1));

        let p = BakePolicy::for_texture(&texture(true, false, true));
        assert_eq!(p.dxt, DxtLevel::Dxt5);

        let p = BakePolicy::for_texture(&texture(false, true, false));
        assert_eq!((p.level_hint, p.compression), (1, Compression::Uncompressed));
    }

    #[test]
    fn test_normalized_name() {
        assert_eq!(normalized_bitmap_name("Brick.001.png", true), "Brick.dds");
        assert_eq!(normalized_bitmap_name("Brick", false), "Brick.bmp");
        assert_eq!(normalized_bitmap_name(".hidden", true), ".dds");
    }

    #[test]
    fn test_bake_resizes_and_restores_binding() {
        let mut gpu = SoftwareGpu::new();
        let host = gpu.upload(1, 1, &[0, 0, 0, 255]).unwrap();
        gpu.bind_texture(host);

        let mut image = Image::solid("Img", 384, 384, Color::rgb(1.0, 0.0, 0.0));
        let mipmap = bake_image(&mut gpu, &mut image, &texture(true, false, false), "Img.dds").unwrap();

        assert_eq!(image.size(), (512, 512));
        assert_eq!((mipmap.width(), mipmap.height()), (512, 512));
        assert_eq!(mipmap.num_levels(), 10);
        assert!((0..10).all(|level| mipmap.level(level).is_some()));
        assert_eq!(mipmap.dxt(), DxtLevel::Dxt1);

        assert_eq!(gpu.bound_texture(), host);
        assert!(!gpu.generate_mipmap());
        assert_eq!(image.bindcode, 0);
        assert_eq!(gpu.texture_count(), 1);
    }

    #[test]
    fn test_bake_resizes_resident_texture() {
        let mut gpu = SoftwareGpu::new();
        let mut image = Image::solid("Img", 384, 384, Color::rgb(0.0, 1.0, 0.0));
        image.bindcode = gpu.upload(384, 384, image.pixels().as_raw()).unwrap();
        let resident = image.bindcode;

        let mipmap = bake_image(&mut gpu, &mut image, &texture(true, false, false), "Img.dds").unwrap();

        assert_eq!((mipmap.width(), mipmap.height()), (512, 512));
        assert_eq!(mipmap.num_levels(), 10);
        assert_eq!(mipmap.level_dimensions(9), (1, 1));
        assert_eq!(image.bindcode, resident);
        assert!(gpu.is_texture(resident));
        assert_eq!(gpu.level_count(resident), 10);
        let stats = gpu.stats();
        assert_eq!((stats.uploads, stats.respecifications, stats.frees), (1, 1, 0));
    }

    #[test]
    fn test_bake_uncompressed_with_computed_alpha() {
        let mut gpu = SoftwareGpu::new();
        let mut image = Image::solid("Img", 4, 4, Color::new(10.0 / 255.0, 20.0 / 255.0, 30.0 / 255.0, 1.0));
        let mipmap = bake_image(&mut gpu, &mut image, &texture(false, false, true), "Img.bmp").unwrap();

        assert_eq!(mipmap.compression(), Compression::Uncompressed);
        assert_eq!(mipmap.num_levels(), 1);
        let level = mipmap.level(0).unwrap();
        assert_eq!(&level[0..4], &[10, 20, 30, 20]);
        assert_eq!(gpu.stats().mipmap_generations, 0);
    }

    #[test]
    fn test_bake_failure_leaves_image_unbound() {
        let mut gpu = SoftwareGpu::with_max_texture_size(64);
        let mut image = Image::solid("Big", 128, 128, Color::WHITE);

        let err = bake_image(&mut gpu, &mut image, &texture(true, true, false), "Big.dds").unwrap_err();
        assert!(matches!(err, crate::textures::TextureError::GlLoad { ref image, .. } if image == "Big"));
        assert_eq!(image.bindcode, 0);
        assert_eq!(gpu.texture_count(), 0);
    }
}
