//! Runtime material and layer objects

use serde::Serialize;

use layerbake_core::Color;

use crate::manager::Key;

/// Layer blend state bits
pub mod blend_flags {
    pub const INVERT_ALPHA: u32 = 0x1000;
}

/// Layer shade state bits
pub mod shade_flags {
    pub const NO_FOG: u32 = 0x100;
    pub const REALLY_NO_FOG: u32 = 0x10000;
}

/// Render state bitmasks of a layer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LayerState {
    pub blend_flags: u32,
    pub shade_flags: u32,
}

/// One texturing pass of a runtime material
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Layer {
    pub name: String,
    pub state: LayerState,
    pub ambient: Color,
    pub preshade: Color,
    pub runtime: Color,
    pub specular: Color,
    /// UV channel index the layer samples with
    pub uvw_src: u32,
    /// Bitmap drawn by this layer, if any
    pub texture: Option<Key>,
}

impl Layer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: LayerState::default(),
            ambient: Color::BLACK,
            preshade: Color::BLACK,
            runtime: Color::BLACK,
            specular: Color::BLACK,
            uvw_src: 0,
            texture: None,
        }
    }
}

/// Exported material: an ordered list of layers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RuntimeMaterial {
    pub name: String,
    pub layers: Vec<Key>,
}

impl RuntimeMaterial {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            layers: Vec::new(),
        }
    }
}
