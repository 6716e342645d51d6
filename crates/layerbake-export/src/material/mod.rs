//! Material and layer export
//!
//! Converts host materials into runtime materials. Every enabled texture
//! slot becomes one [`Layer`]; image slots are baked into bitmaps that are
//! shared between layers for the rest of the export session.

mod bake;
mod converter;
mod layer;

pub use bake::{bake_image, normalized_bitmap_name, BakePolicy};
pub use converter::{propagate_material_settings, MaterialConverter};
pub use layer::{blend_flags, shade_flags, Layer, LayerState, RuntimeMaterial};

use thiserror::Error;

use crate::textures::TextureError;

/// Material export errors
#[derive(Error, Debug)]
pub enum MaterialError {
    #[error("Texture '{texture}' of material '{material}' has unsupported type '{kind}'")]
    UnsupportedTexture {
        texture: String,
        kind: String,
        material: String,
    },

    #[error("Object '{object}' references unknown material '{material}'")]
    MissingMaterial { material: String, object: String },

    #[error("Texture '{texture}' references unknown image '{image}'")]
    MissingImage { image: String, texture: String },

    #[error(transparent)]
    Texture(#[from] TextureError),
}

pub type MaterialResult<T> = Result<T, MaterialError>;
