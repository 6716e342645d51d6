//! Scoped GPU texture binding for scene images
//!
//! [`GlTexture`] makes sure an [`Image`] has a GPU texture for as long as it
//! lives, allocating one if the image had none and freeing it again on drop.
//! [`GlTexture::activate`] binds that texture for a block of work; the
//! returned [`ActiveTexture`] puts the host's texture state back when it goes
//! out of scope, whichever way the block exits.

use layerbake_core::Image;
use layerbake_render::{GpuContext, TextureName, NO_TEXTURE};

use crate::textures::{TextureError, TextureResult};

/// GPU texture backing a scene image
pub struct GlTexture<'a, G: GpuContext> {
    gpu: &'a mut G,
    image: &'a mut Image,
    /// The texture was allocated here and is freed on drop
    owns: bool,
}

impl<'a, G: GpuContext> GlTexture<'a, G> {
    /// Ensure `image` has a GPU texture holding its current pixels
    ///
    /// An existing texture is reused; if the image was resized since it was
    /// filled, its base level is respecified in place.
    ///
    /// # Errors
    ///
    /// [`TextureError::GlLoad`] when the backend cannot allocate or refill
    /// the texture.
    pub fn acquire(gpu: &'a mut G, image: &'a mut Image) -> TextureResult<Self> {
        let owns = image.bindcode == NO_TEXTURE;
        let (width, height) = image.size();
        let load_error = |source| TextureError::GlLoad {
            image: image.name.clone(),
            source,
        };

        if owns {
            let name = gpu
                .upload(width, height, image.pixels().as_raw())
                .map_err(load_error)?;
            tracing::debug!(image = %image.name, texture = name, "Allocated GPU texture");
            image.bindcode = name;
        } else if image.is_gpu_stale() {
            gpu.respecify(image.bindcode, width, height, image.pixels().as_raw())
                .map_err(load_error)?;
            tracing::debug!(image = %image.name, texture = image.bindcode, width, height, "Refilled resized GPU texture");
        }
        image.mark_gpu_current();

        Ok(Self { gpu, image, owns })
    }

    /// Texture name of the image
    pub fn bindcode(&self) -> TextureName {
        self.image.bindcode
    }

    /// Bind the image's texture until the returned guard is dropped
    pub fn activate(&mut self) -> ActiveTexture<'_, G> {
        let previous = self.gpu.bound_texture();
        let changed_state = previous != self.image.bindcode;
        if changed_state {
            self.gpu.bind_texture(self.image.bindcode);
        }

        ActiveTexture {
            gpu: &mut *self.gpu,
            previous,
            changed_state,
            mipmap_state: None,
        }
    }
}

impl<G: GpuContext> Drop for GlTexture<'_, G> {
    fn drop(&mut self) {
        if self.owns {
            self.gpu.free(self.image.bindcode);
            self.image.bindcode = NO_TEXTURE;
        }
    }
}

/// Image texture bound to the 2D target
pub struct ActiveTexture<'t, G: GpuContext> {
    gpu: &'t mut G,
    previous: TextureName,
    changed_state: bool,
    /// Generation parameter before [`ActiveTexture::generate_mipmap`]
    mipmap_state: Option<bool>,
}

impl<G: GpuContext> ActiveTexture<'_, G> {
    /// Turn on automatic mipmap generation for the bound texture
    ///
    /// Must happen before any level below 0 is queried.
    pub fn generate_mipmap(&mut self) {
        if self.mipmap_state.is_none() {
            self.mipmap_state = Some(self.gpu.generate_mipmap());
        }
        self.gpu.set_generate_mipmap(true);
    }

    /// (width, height) of a mip level
    pub fn level_size(&self, level: u32) -> (u32, u32) {
        self.gpu.level_size(level)
    }

    /// Read back a mip level as RGBA8
    ///
    /// With `calc_alpha` the alpha channel is replaced by the mean of the
    /// colour channels.
    pub fn level_data(&self, level: u32, calc_alpha: bool) -> Vec<u8> {
        let (width, height) = self.gpu.level_size(level);
        let mut buf = vec![0u8; width as usize * height as usize * 4];
        self.gpu.read_level(level, &mut buf);

        if calc_alpha {
            compute_alpha(&mut buf);
        }
        buf
    }
}

impl<G: GpuContext> Drop for ActiveTexture<'_, G> {
    fn drop(&mut self) {
        // The generation parameter belongs to the texture being unbound
        if let Some(state) = self.mipmap_state.take() {
            self.gpu.set_generate_mipmap(state);
        }
        if self.changed_state {
            self.gpu.bind_texture(self.previous);
        }
    }
}

/// Overwrite each pixel's alpha with the truncated mean of R, G and B
pub fn compute_alpha(rgba: &mut [u8]) {
    for pixel in rgba.chunks_exact_mut(4) {
        let sum = u16::from(pixel[0]) + u16::from(pixel[1]) + u16::from(pixel[2]);
        pixel[3] = (sum / 3) as u8;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use layerbake_core::Color;
    use layerbake_render::{GpuResult, SoftwareGpu};
    use proptest::prelude::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Call {
        Bind(TextureName),
        SetGenerate(bool),
        Respecify(TextureName),
        Free(TextureName),
    }

    /// Software context that records state-changing calls
    #[derive(Default)]
    struct TracingGpu {
        inner: SoftwareGpu,
        calls: Vec<Call>,
    }

    impl GpuContext for TracingGpu {
        fn bound_texture(&self) -> TextureName {
            self.inner.bound_texture()
        }
        fn bind_texture(&mut self, name: TextureName) {
            self.calls.push(Call::Bind(name));
            self.inner.bind_texture(name);
        }
        fn generate_mipmap(&self) -> bool {
            self.inner.generate_mipmap()
        }
        fn set_generate_mipmap(&mut self, enabled: bool) {
            self.calls.push(Call::SetGenerate(enabled));
            self.inner.set_generate_mipmap(enabled);
        }
        fn level_size(&self, level: u32) -> (u32, u32) {
            self.inner.level_size(level)
        }
        fn read_level(&self, level: u32, out: &mut [u8]) {
            self.inner.read_level(level, out);
        }
        fn upload(&mut self, width: u32, height: u32, rgba: &[u8]) -> GpuResult<TextureName> {
            self.inner.upload(width, height, rgba)
        }
        fn respecify(&mut self, name: TextureName, width: u32, height: u32, rgba: &[u8]) -> GpuResult<()> {
            self.calls.push(Call::Respecify(name));
            self.inner.respecify(name, width, height, rgba)
        }
        fn free(&mut self, name: TextureName) {
            self.calls.push(Call::Free(name));
            self.inner.free(name);
        }
    }

    fn host_texture(gpu: &mut impl GpuContext) -> TextureName {
        let name = gpu.upload(1, 1, &[9, 9, 9, 9]).unwrap();
        gpu.bind_texture(name);
        name
    }

    #[test]
    fn test_acquire_owns_and_frees() {
        let mut gpu = SoftwareGpu::new();
        let mut image = Image::solid("owned", 4, 4, Color::WHITE);

        {
            let texture = GlTexture::acquire(&mut gpu, &mut image).unwrap();
            assert_ne!(texture.bindcode(), NO_TEXTURE);
        }

        assert_eq!(image.bindcode, NO_TEXTURE);
        assert_eq!(gpu.texture_count(), 0);
        assert_eq!(gpu.stats().frees, 1);
    }

    #[test]
    fn test_existing_binding_is_not_freed() {
        let mut gpu = SoftwareGpu::new();
        let mut image = Image::solid("resident", 4, 4, Color::WHITE);
        image.bindcode = gpu.upload(4, 4, image.pixels().as_raw()).unwrap();
        let resident = image.bindcode;

        {
            let texture = GlTexture::acquire(&mut gpu, &mut image).unwrap();
            assert_eq!(texture.bindcode(), resident);
        }

        assert_eq!(image.bindcode, resident);
        assert!(gpu.is_texture(resident));
        assert_eq!(gpu.stats().uploads, 1);
    }

    #[test]
    fn test_acquire_failure_reports_image() {
        let mut gpu = SoftwareGpu::with_max_texture_size(2);
        let mut image = Image::solid("huge.png", 4, 4, Color::WHITE);

        let err = GlTexture::acquire(&mut gpu, &mut image).err().unwrap();
        match err {
            TextureError::GlLoad { image: name, .. } => assert_eq!(name, "huge.png"),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(image.bindcode, NO_TEXTURE);
    }

    #[test]
    fn test_activation_restores_previous_binding() {
        let mut gpu = SoftwareGpu::new();
        let host = host_texture(&mut gpu);
        let mut image = Image::solid("img", 2, 2, Color::BLACK);

        let mut texture = GlTexture::acquire(&mut gpu, &mut image).unwrap();
        {
            let active = texture.activate();
            assert_eq!(active.level_size(0), (2, 2));
        }
        drop(texture);

        assert_eq!(gpu.bound_texture(), host);
    }

    #[test]
    fn test_already_bound_texture_is_left_alone() {
        let mut gpu = TracingGpu::default();
        let mut image = Image::solid("img", 2, 2, Color::BLACK);
        image.bindcode = host_texture(&mut gpu);
        gpu.calls.clear();

        let mut texture = GlTexture::acquire(&mut gpu, &mut image).unwrap();
        drop(texture.activate());
        drop(texture);

        assert!(gpu.calls.is_empty());
    }

    #[test]
    fn test_mipmap_parameter_restored_before_rebind() {
        let mut gpu = TracingGpu::default();
        let host = host_texture(&mut gpu);
        let mut image = Image::solid("img", 8, 8, Color::WHITE);

        let mut texture = GlTexture::acquire(&mut gpu, &mut image).unwrap();
        let name = texture.bindcode();
        {
            let mut active = texture.activate();
            active.generate_mipmap();
            assert_eq!(active.level_size(3), (1, 1));
        }
        drop(texture);

        assert_eq!(
            &gpu.calls[1..],
            &[
                Call::Bind(name),
                Call::SetGenerate(true),
                Call::SetGenerate(false),
                Call::Bind(host),
                Call::Free(name),
            ]
        );
        assert_eq!(gpu.bound_texture(), host);
    }

    #[test]
    fn test_state_restored_when_bake_fails_midway() {
        let mut gpu = SoftwareGpu::new();
        let host = host_texture(&mut gpu);
        let mut image = Image::solid("img", 4, 4, Color::WHITE);

        let result: TextureResult<()> = (|| {
            let mut texture = GlTexture::acquire(&mut gpu, &mut image)?;
            let mut active = texture.activate();
            active.generate_mipmap();
            let _ = active.level_data(0, false);
            Err(TextureError::InvalidMipLevel { level: 1, max: 0 })
        })();

        assert!(result.is_err());
        assert_eq!(gpu.bound_texture(), host);
        assert!(!gpu.generate_mipmap());
        assert_eq!(gpu.texture_count(), 1);
        assert_eq!(image.bindcode, NO_TEXTURE);
    }

    #[test]
    fn test_enabled_mipmap_parameter_survives_activation() {
        let mut gpu = TracingGpu::default();
        let host = host_texture(&mut gpu);
        let mut image = Image::solid("img", 4, 4, Color::WHITE);
        image.bindcode = gpu.upload(4, 4, image.pixels().as_raw()).unwrap();
        let resident = image.bindcode;
        gpu.bind_texture(resident);
        gpu.set_generate_mipmap(true);
        gpu.bind_texture(host);
        gpu.calls.clear();

        {
            let mut texture = GlTexture::acquire(&mut gpu, &mut image).unwrap();
            let mut active = texture.activate();
            active.generate_mipmap();
            assert_eq!(active.level_size(2), (1, 1));
        }
        assert_eq!(
            gpu.calls,
            vec![
                Call::Bind(resident),
                Call::SetGenerate(true),
                Call::SetGenerate(true),
                Call::Bind(host),
            ]
        );

        let result: TextureResult<()> = (|| {
            let mut texture = GlTexture::acquire(&mut gpu, &mut image)?;
            let mut active = texture.activate();
            active.generate_mipmap();
            let _ = active.level_data(1, false);
            Err(TextureError::LevelSizeMismatch {
                level: 1,
                expected: 16,
                actual: 0,
            })
        })();
        assert!(result.is_err());
        assert_eq!(gpu.bound_texture(), host);

        gpu.bind_texture(resident);
        assert!(gpu.generate_mipmap());
        assert_eq!(image.bindcode, resident);
    }

    #[test]
    fn test_resized_resident_texture_is_refilled() {
        let mut gpu = TracingGpu::default();
        let mut image = Image::solid("img", 3, 3, Color::WHITE);
        image.bindcode = gpu.upload(3, 3, image.pixels().as_raw()).unwrap();
        let resident = image.bindcode;
        image.scale(4, 4);
        gpu.calls.clear();

        {
            let mut texture = GlTexture::acquire(&mut gpu, &mut image).unwrap();
            assert_eq!(texture.bindcode(), resident);
            assert_eq!(texture.activate().level_size(0), (4, 4));
        }

        assert_eq!(gpu.calls[0], Call::Respecify(resident));
        assert!(!gpu.calls.contains(&Call::Free(resident)));
        assert!(!image.is_gpu_stale());
        assert!(gpu.inner.is_texture(resident));
    }

    #[test]
    fn test_state_restored_on_panic() {
        let mut gpu = SoftwareGpu::new();
        let host = host_texture(&mut gpu);
        let mut image = Image::solid("img", 4, 4, Color::WHITE);

        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let mut texture = GlTexture::acquire(&mut gpu, &mut image).unwrap();
            let mut active = texture.activate();
            active.generate_mipmap();
            panic!("readback failed");
        }));

        assert!(outcome.is_err());
        assert_eq!(gpu.bound_texture(), host);
        assert_eq!(gpu.texture_count(), 1);
    }

    #[test]
    fn test_level_data_with_computed_alpha() {
        let mut gpu = SoftwareGpu::new();
        let mut image = Image::new("rgb", image::RgbaImage::from_pixel(1, 1, image::Rgba([10, 20, 30, 255])));

        let mut texture = GlTexture::acquire(&mut gpu, &mut image).unwrap();
        let active = texture.activate();
        assert_eq!(active.level_data(0, false), vec![10, 20, 30, 255]);
        assert_eq!(active.level_data(0, true), vec![10, 20, 30, 20]);
    }

    #[test]
    fn test_compute_alpha_every_pixel() {
        let mut buf = vec![10, 20, 30, 0, 255, 255, 254, 0, 1, 1, 0, 99];
        compute_alpha(&mut buf);
        assert_eq!(buf, vec![10, 20, 30, 20, 255, 255, 254, 254, 1, 1, 0, 0]);
    }

    proptest! {
        #[test]
        fn prop_compute_alpha_keeps_color(pixels in proptest::collection::vec(any::<[u8; 4]>(), 0..64)) {
            let mut buf: Vec<u8> = pixels.iter().flatten().copied().collect();
            compute_alpha(&mut buf);

            for (orig, out) in pixels.iter().zip(buf.chunks_exact(4)) {
                prop_assert_eq!(&orig[..3], &out[..3]);
                let mean = (u32::from(orig[0]) + u32::from(orig[1]) + u32::from(orig[2])) / 3;
                prop_assert_eq!(u32::from(out[3]), mean);
            }
        }
    }
}
