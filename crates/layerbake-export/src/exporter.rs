//! Export session
//!
//! Owns the GPU context, the resource registry and the material converter
//! for one pass over a scene.

use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

use layerbake_core::Scene;
use layerbake_render::GpuContext;

use crate::json::{JsonError, ManifestExporter, ManifestOptions};
use crate::manager::{ResourceManager, DEFAULT_TEXTURES_PAGE};
use crate::material::{MaterialConverter, MaterialError};
use crate::textures::{BitmapWriter, BitmapWriterOptions, TextureError};

/// Session level errors
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Material export failed: {0}")]
    Material(#[from] MaterialError),

    #[error("Texture output failed: {0}")]
    Texture(#[from] TextureError),

    #[error("Manifest output failed: {0}")]
    Manifest(#[from] JsonError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ExportResult<T> = Result<T, ExportError>;

/// Export options
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Directory files are written to; nothing is written when unset
    pub output_dir: Option<PathBuf>,

    /// Write baked bitmaps as DDS/BMP files
    pub write_textures: bool,

    /// Write `manifest.json`
    pub write_manifest: bool,

    /// Log and record failed materials instead of aborting
    pub continue_on_error: bool,

    /// Page bitmaps are registered in
    pub textures_page: String,

    pub bitmap_writer: BitmapWriterOptions,

    pub manifest: ManifestOptions,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            output_dir: None,
            write_textures: true,
            write_manifest: true,
            continue_on_error: false,
            textures_page: DEFAULT_TEXTURES_PAGE.to_string(),
            bitmap_writer: BitmapWriterOptions::default(),
            manifest: ManifestOptions::default(),
        }
    }
}

/// A material that could not be exported
#[derive(Debug, Clone, Serialize)]
pub struct ExportFailure {
    pub object: String,
    pub material: String,
    pub error: String,
}

/// Summary of an export session
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExportReport {
    /// Materials exported successfully
    pub materials: usize,
    pub layers: usize,
    pub bitmaps: usize,
    /// Bitmaps baked on the GPU
    pub baked: usize,
    /// Layers that reused a bitmap baked earlier in the session
    pub reused: usize,
    pub failures: Vec<ExportFailure>,
    pub files_written: Vec<PathBuf>,
}

/// Scene exporter
pub struct Exporter<G: GpuContext> {
    options: ExportOptions,
    gpu: G,
    mgr: ResourceManager,
    converter: MaterialConverter,
}

impl<G: GpuContext> Exporter<G> {
    /// Create exporter with default options
    pub fn new(gpu: G) -> Self {
        Self::with_options(gpu, ExportOptions::default())
    }

    /// Create exporter with custom options
    pub fn with_options(gpu: G, options: ExportOptions) -> Self {
        let mgr = ResourceManager::with_textures_page(options.textures_page.clone());
        Self {
            options,
            gpu,
            mgr,
            converter: MaterialConverter::new(),
        }
    }

    pub fn options(&self) -> &ExportOptions {
        &self.options
    }

    pub fn gpu(&self) -> &G {
        &self.gpu
    }

    pub fn manager(&self) -> &ResourceManager {
        &self.mgr
    }

    /// Export every material of every object in the scene
    ///
    /// Images are resized in place when they are not a power of two. Files
    /// are written when an output directory is configured.
    pub fn export_scene(&mut self, scene: &mut Scene) -> ExportResult<ExportReport> {
        let Scene {
            world,
            images,
            materials,
            objects,
        } = scene;

        let mut report = ExportReport::default();

        for object in objects.iter() {
            for material_name in &object.materials {
                let result = materials
                    .iter()
                    .find(|m| m.name == *material_name)
                    .ok_or_else(|| MaterialError::MissingMaterial {
                        material: material_name.clone(),
                        object: object.name.clone(),
                    })
                    .and_then(|material| {
                        self.converter.export_material(
                            &mut self.mgr,
                            &mut self.gpu,
                            images,
                            world,
                            object,
                            material,
                        )
                    });

                match result {
                    Ok(_) => report.materials += 1,
                    Err(e) if self.options.continue_on_error => {
                        tracing::error!(
                            object = %object.name,
                            material = %material_name,
                            error = %e,
                            "Skipping material"
                        );
                        report.failures.push(ExportFailure {
                            object: object.name.clone(),
                            material: material_name.clone(),
                            error: e.to_string(),
                        });
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        }

        report.layers = self.mgr.layer_count();
        report.bitmaps = self.mgr.bitmap_count();
        report.baked = self.converter.baked_count();
        report.reused = self.converter.reused_count();

        if let Some(dir) = self.options.output_dir.clone() {
            report.files_written = self.write_outputs(&dir)?;
        }

        tracing::info!(
            materials = report.materials,
            layers = report.layers,
            bitmaps = report.bitmaps,
            failures = report.failures.len(),
            "Export finished"
        );
        Ok(report)
    }

    /// Write bitmaps and the manifest into `dir`
    ///
    /// Bitmaps go to `<dir>/<page>/`. Returns the written paths.
    pub fn write_outputs(&self, dir: &Path) -> ExportResult<Vec<PathBuf>> {
        std::fs::create_dir_all(dir)?;
        let mut written = Vec::new();

        if self.options.write_textures {
            let writer = BitmapWriter::with_options(self.options.bitmap_writer.clone());
            for (key, bitmap) in self.mgr.bitmaps() {
                let Some(mipmap) = bitmap.as_mipmap() else {
                    continue;
                };
                if let Some(path) = writer.write(mipmap, dir.join(&key.page))? {
                    written.push(path);
                }
            }
        }

        if self.options.write_manifest {
            let path = dir.join("manifest.json");
            ManifestExporter::with_options(self.options.manifest.clone()).export(&self.mgr, &path)?;
            tracing::debug!(path = %path.display(), "Wrote manifest");
            written.push(path);
        }

        Ok(written)
    }
}
