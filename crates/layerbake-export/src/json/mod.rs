//! JSON manifest of an export session
//!
//! Lists every registered material, layer and bitmap with the fields a
//! runtime loader needs to reassemble them.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use serde_json::json;
use thiserror::Error;

use crate::manager::ResourceManager;
use crate::textures::Bitmap;

/// JSON export errors
#[derive(Error, Debug)]
pub enum JsonError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type JsonResult<T> = Result<T, JsonError>;

/// Manifest options
#[derive(Debug, Clone)]
pub struct ManifestOptions {
    /// Use pretty-print formatting
    pub pretty: bool,

    /// List the stored byte size of every mip level
    pub include_levels: bool,
}

impl Default for ManifestOptions {
    fn default() -> Self {
        Self {
            pretty: true,
            include_levels: false,
        }
    }
}

/// Manifest exporter
#[derive(Debug, Clone, Default)]
pub struct ManifestExporter {
    options: ManifestOptions,
}

impl ManifestExporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: ManifestOptions) -> Self {
        Self { options }
    }

    /// Build the manifest document
    pub fn build(&self, mgr: &ResourceManager) -> serde_json::Value {
        let materials: Vec<_> = mgr
            .materials()
            .map(|(key, material)| {
                json!({
                    "name": key.name,
                    "page": key.page,
                    "layers": material.layers.iter().map(|k| &k.name).collect::<Vec<_>>(),
                })
            })
            .collect();

        let layers: Vec<_> = mgr
            .layers()
            .map(|(key, layer)| {
                json!({
                    "name": key.name,
                    "page": key.page,
                    "state": layer.state,
                    "ambient": layer.ambient,
                    "preshade": layer.preshade,
                    "runtime": layer.runtime,
                    "specular": layer.specular,
                    "uvw_src": layer.uvw_src,
                    "texture": layer.texture.as_ref().map(|k| &k.name),
                })
            })
            .collect();

        let bitmaps: Vec<_> = mgr
            .bitmaps()
            .map(|(key, bitmap)| match bitmap {
                Bitmap::DynamicText(_) => json!({
                    "type": "dynamic_text",
                    "name": key.name,
                    "page": key.page,
                }),
                Bitmap::Mipmap(mipmap) => {
                    let mut entry = json!({
                        "type": "mipmap",
                        "name": key.name,
                        "page": key.page,
                        "width": mipmap.width(),
                        "height": mipmap.height(),
                        "levels": mipmap.num_levels(),
                        "compression": mipmap.compression(),
                        "format": mipmap.format(),
                        "dxt": mipmap.dxt(),
                        "data_size": mipmap.data_size(),
                    });
                    if self.options.include_levels {
                        let sizes: Vec<_> = (0..mipmap.num_levels())
                            .map(|level| mipmap.level(level).map_or(0, <[u8]>::len))
                            .collect();
                        entry["level_sizes"] = json!(sizes);
                    }
                    entry
                }
            })
            .collect();

        json!({
            "metadata": {
                "material_count": mgr.material_count(),
                "layer_count": mgr.layer_count(),
                "bitmap_count": mgr.bitmap_count(),
                "textures_page": mgr.textures_page(),
            },
            "materials": materials,
            "layers": layers,
            "bitmaps": bitmaps,
        })
    }

    /// Write the manifest to a file
    pub fn export(&self, mgr: &ResourceManager, output_path: impl AsRef<Path>) -> JsonResult<()> {
        let value = self.build(mgr);
        let file = File::create(output_path)?;
        let writer = BufWriter::new(file);

        if self.options.pretty {
            serde_json::to_writer_pretty(writer, &value)?;
        } else {
            serde_json::to_writer(writer, &value)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::{Layer, RuntimeMaterial};
    use crate::textures::{Compression, DxtLevel, DynamicTextMap, Mipmap, PixelFormat};
    use tempfile::TempDir;

    fn registry() -> ResourceManager {
        let mut mgr = ResourceManager::new();

        let mut mipmap = Mipmap::new("Brick.dds", 4, 4, 0, Compression::DirectX, PixelFormat::Rgb8888, DxtLevel::Dxt1);
        for level in 0..mipmap.num_levels() {
            let (w, h) = mipmap.level_dimensions(level);
            mipmap.compress_image(level, &vec![90u8; (w * h * 4) as usize]).unwrap();
        }
        let brick = mgr.add_bitmap(Bitmap::Mipmap(mipmap));
        mgr.add_bitmap(Bitmap::DynamicText(DynamicTextMap { name: "Sign_DynText".into() }));

        let mut layer = Layer::new("Wall_Brick");
        layer.texture = Some(brick);
        let layer = mgr.add_layer("Level", layer);

        let mat = mgr.add_material("Level", RuntimeMaterial::new("Wall"));
        mgr.material_mut(&mat).unwrap().layers.push(layer);
        mgr
    }

    #[test]
    fn test_manifest_contents() {
        let manifest = ManifestExporter::new().build(&registry());

        assert_eq!(manifest["metadata"]["bitmap_count"], 2);
        assert_eq!(manifest["materials"][0]["layers"][0], "Wall_Brick");
        assert_eq!(manifest["layers"][0]["texture"], "Brick.dds");
        assert_eq!(manifest["bitmaps"][0]["dxt"], "DXT1");
        assert_eq!(manifest["bitmaps"][0]["compression"], "directx");
        assert_eq!(manifest["bitmaps"][0]["levels"], 3);
        assert!(manifest["bitmaps"][0].get("level_sizes").is_none());
        assert_eq!(manifest["bitmaps"][1]["type"], "dynamic_text");
    }

    #[test]
    fn test_level_sizes() {
        let exporter = ManifestExporter::with_options(ManifestOptions {
            include_levels: true,
            ..Default::default()
        });
        let manifest = exporter.build(&registry());
        assert_eq!(manifest["bitmaps"][0]["level_sizes"], json!([8, 8, 8]));
    }

    #[test]
    fn test_export_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("manifest.json");
        ManifestExporter::new().export(&registry(), &path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["layers"][0]["name"], "Wall_Brick");
    }
}
