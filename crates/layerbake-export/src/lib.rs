//! layerbake Export Pipeline
//!
//! Converts host scene materials into runtime materials:
//! - Texture bake adapter (scoped GPU binding, mip readback)
//! - Bitmap containers with DXT encoding
//! - Material/layer conversion with per-session bitmap dedup
//! - DDS/BMP bitmap files and a JSON manifest

pub mod exporter;
pub mod json;
pub mod manager;
pub mod material;
pub mod textures;

pub use exporter::{ExportError, ExportFailure, ExportOptions, ExportReport, ExportResult, Exporter};
pub use json::{ManifestExporter, ManifestOptions};
pub use manager::{Key, ObjectKind, ResourceManager};
pub use material::{Layer, MaterialConverter, MaterialError, RuntimeMaterial};
pub use textures::{Bitmap, BitmapWriter, BitmapWriterOptions, Mipmap, TextureError};
