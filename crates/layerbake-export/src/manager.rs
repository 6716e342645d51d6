//! Runtime object registry
//!
//! Everything the exporter produces is registered here and referenced by
//! [`Key`]. Materials and layers live in the page of the object they were
//! exported for; bitmaps live in the shared textures page.

use serde::Serialize;

use crate::material::{Layer, RuntimeMaterial};
use crate::textures::Bitmap;

/// Default name of the page bitmaps are registered in
pub const DEFAULT_TEXTURES_PAGE: &str = "Textures";

/// Kind of a registered object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ObjectKind {
    Material,
    Layer,
    Mipmap,
    DynamicTextMap,
}

/// Reference to a registered object
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Key {
    pub kind: ObjectKind,
    pub name: String,
    pub page: String,
    #[serde(skip)]
    index: usize,
}

impl std::fmt::Display for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}/{}", self.kind, self.page, self.name)
    }
}

/// Registry of exported materials, layers and bitmaps
#[derive(Debug)]
pub struct ResourceManager {
    textures_page: String,
    materials: Vec<(Key, RuntimeMaterial)>,
    layers: Vec<(Key, Layer)>,
    bitmaps: Vec<(Key, Bitmap)>,
}

impl ResourceManager {
    pub fn new() -> Self {
        Self::with_textures_page(DEFAULT_TEXTURES_PAGE)
    }

    pub fn with_textures_page(page: impl Into<String>) -> Self {
        Self {
            textures_page: page.into(),
            materials: Vec::new(),
            layers: Vec::new(),
            bitmaps: Vec::new(),
        }
    }

    /// Page bitmaps are registered in
    pub fn textures_page(&self) -> &str {
        &self.textures_page
    }

    pub fn add_material(&mut self, page: &str, material: RuntimeMaterial) -> Key {
        let key = Key {
            kind: ObjectKind::Material,
            name: material.name.clone(),
            page: page.to_string(),
            index: self.materials.len(),
        };
        self.materials.push((key.clone(), material));
        key
    }

    pub fn add_layer(&mut self, page: &str, layer: Layer) -> Key {
        let key = Key {
            kind: ObjectKind::Layer,
            name: layer.name.clone(),
            page: page.to_string(),
            index: self.layers.len(),
        };
        self.layers.push((key.clone(), layer));
        key
    }

    /// Register a bitmap in the textures page
    pub fn add_bitmap(&mut self, bitmap: Bitmap) -> Key {
        let kind = match bitmap {
            Bitmap::Mipmap(_) => ObjectKind::Mipmap,
            Bitmap::DynamicText(_) => ObjectKind::DynamicTextMap,
        };
        let key = Key {
            kind,
            name: bitmap.name().to_string(),
            page: self.textures_page.clone(),
            index: self.bitmaps.len(),
        };
        self.bitmaps.push((key.clone(), bitmap));
        key
    }

    pub fn material(&self, key: &Key) -> Option<&RuntimeMaterial> {
        if key.kind != ObjectKind::Material {
            return None;
        }
        self.materials.get(key.index).map(|(_, m)| m)
    }

    pub fn material_mut(&mut self, key: &Key) -> Option<&mut RuntimeMaterial> {
        if key.kind != ObjectKind::Material {
            return None;
        }
        self.materials.get_mut(key.index).map(|(_, m)| m)
    }

    pub fn layer(&self, key: &Key) -> Option<&Layer> {
        if key.kind != ObjectKind::Layer {
            return None;
        }
        self.layers.get(key.index).map(|(_, l)| l)
    }

    pub fn bitmap(&self, key: &Key) -> Option<&Bitmap> {
        match key.kind {
            ObjectKind::Mipmap | ObjectKind::DynamicTextMap => {
                self.bitmaps.get(key.index).map(|(_, b)| b)
            }
            _ => None,
        }
    }

    /// First registered material with the given name
    pub fn find_material(&self, name: &str) -> Option<(&Key, &RuntimeMaterial)> {
        self.materials().find(|(key, _)| key.name == name)
    }

    pub fn materials(&self) -> impl Iterator<Item = (&Key, &RuntimeMaterial)> {
        self.materials.iter().map(|(k, m)| (k, m))
    }

    pub fn layers(&self) -> impl Iterator<Item = (&Key, &Layer)> {
        self.layers.iter().map(|(k, l)| (k, l))
    }

    pub fn bitmaps(&self) -> impl Iterator<Item = (&Key, &Bitmap)> {
        self.bitmaps.iter().map(|(k, b)| (k, b))
    }

    pub fn material_count(&self) -> usize {
        self.materials.len()
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub fn bitmap_count(&self) -> usize {
        self.bitmaps.len()
    }
}

impl Default for ResourceManager {
    fn default() -> Self {
        Self::new()
    }
}
