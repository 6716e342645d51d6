//! Host scene model
//!
//! The read-mostly inputs of an export: images, textures, materials, meshes
//! and the objects tying them together. A scene is normally loaded from a
//! JSON description; images are decoded with the `image` crate or generated
//! as solid fills.
//!
//! Images are the only mutable part of a scene during export: they may be
//! resized to power-of-two dimensions and carry a transient GPU handle.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use image::{imageops, Rgba, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result, ResultExt};
use crate::types::Color;

/// GPU texture name; 0 means "no texture"
pub type Bindcode = u32;

/// Source bitmap owned by the host scene
#[derive(Debug, Clone)]
pub struct Image {
    /// Image name as known to the host (may carry `.001`-style suffixes)
    pub name: String,
    /// GPU texture currently holding this image, 0 if unallocated
    pub bindcode: Bindcode,
    pixels: RgbaImage,
    /// Pixels changed since the texture named by `bindcode` was filled
    gpu_stale: bool,
}

impl Image {
    /// Wrap decoded RGBA pixels
    pub fn new(name: impl Into<String>, pixels: RgbaImage) -> Self {
        Self {
            name: name.into(),
            bindcode: 0,
            pixels,
            gpu_stale: false,
        }
    }

    /// Create an image filled with a single colour
    pub fn solid(name: impl Into<String>, width: u32, height: u32, color: Color) -> Self {
        Self::new(name, RgbaImage::from_pixel(width, height, Rgba(color.to_rgba8())))
    }

    /// Decode an image file
    pub fn open(name: impl Into<String>, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::FileNotFound(path.to_path_buf()));
        }
        let pixels = image::open(path)?.to_rgba8();
        Ok(Self::new(name, pixels))
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// (width, height) in pixels
    pub fn size(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    /// Raw RGBA8 pixel store
    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    /// Resize the pixel store in place
    ///
    /// A texture already allocated for the image keeps its old contents and
    /// is marked stale until [`Image::mark_gpu_current`].
    pub fn scale(&mut self, width: u32, height: u32) {
        self.pixels = imageops::resize(&self.pixels, width, height, imageops::FilterType::Triangle);
        self.gpu_stale = self.bindcode != 0;
    }

    /// Whether the allocated texture no longer matches the pixel store
    pub fn is_gpu_stale(&self) -> bool {
        self.gpu_stale && self.bindcode != 0
    }

    /// Record that the allocated texture holds the current pixels
    pub fn mark_gpu_current(&mut self) {
        self.gpu_stale = false;
    }
}

/// Texture type tag, matched case-insensitively
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TextureKind {
    /// Bitmap texture backed by an [`Image`]
    Image,
    /// Placeholder texture that contributes nothing
    None,
    /// Any other texture type, kept lower-cased
    Other(String),
}

impl TextureKind {
    /// Lower-cased type tag
    pub fn as_str(&self) -> &str {
        match self {
            TextureKind::Image => "image",
            TextureKind::None => "none",
            TextureKind::Other(kind) => kind,
        }
    }
}

impl From<String> for TextureKind {
    fn from(value: String) -> Self {
        match value.to_lowercase().as_str() {
            "image" => TextureKind::Image,
            "none" => TextureKind::None,
            other => TextureKind::Other(other.to_string()),
        }
    }
}

impl From<&str> for TextureKind {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<TextureKind> for String {
    fn from(value: TextureKind) -> Self {
        value.as_str().to_string()
    }
}

impl std::fmt::Display for TextureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn yes() -> bool {
    true
}

/// Texture datablock referenced by a slot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Texture {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: TextureKind,
    /// Name of the bound image, if any
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default = "yes")]
    pub use_mipmap: bool,
    #[serde(default = "yes")]
    pub use_alpha: bool,
    /// Derive alpha from the mean of the colour channels
    #[serde(default)]
    pub use_calculate_alpha: bool,
    #[serde(default)]
    pub invert_alpha: bool,
}

impl Texture {
    /// Image texture with default flags
    pub fn image(name: impl Into<String>, image: Option<&str>) -> Self {
        Self {
            name: name.into(),
            kind: TextureKind::Image,
            image: image.map(str::to_string),
            use_mipmap: true,
            use_alpha: true,
            use_calculate_alpha: false,
            invert_alpha: false,
        }
    }

    /// Texture of an arbitrary type without an image
    pub fn of_kind(name: impl Into<String>, kind: impl Into<TextureKind>) -> Self {
        Self {
            kind: kind.into(),
            ..Self::image(name, None)
        }
    }
}

/// Material texture slot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextureSlot {
    #[serde(rename = "use", default = "yes")]
    pub enabled: bool,
    pub texture: Texture,
    /// UV channel name to map this slot with
    #[serde(default)]
    pub uv_layer: String,
}

impl TextureSlot {
    pub fn new(texture: Texture, uv_layer: impl Into<String>) -> Self {
        Self {
            enabled: true,
            texture,
            uv_layer: uv_layer.into(),
        }
    }

    /// Slot name, which is the name of its texture
    pub fn name(&self) -> &str {
        &self.texture.name
    }
}

fn default_diffuse() -> Color {
    Color::rgb(0.8, 0.8, 0.8)
}

fn default_specular() -> Color {
    Color::WHITE
}

/// Host material with its ordered texture slots
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Material {
    pub name: String,
    /// Whether the material is affected by fog
    #[serde(default = "yes")]
    pub use_mist: bool,
    #[serde(default = "default_diffuse")]
    pub diffuse_color: Color,
    #[serde(default = "default_specular")]
    pub specular_color: Color,
    /// Empty entries are `None`
    #[serde(default)]
    pub texture_slots: Vec<Option<TextureSlot>>,
}

impl Material {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            use_mist: true,
            diffuse_color: default_diffuse(),
            specular_color: default_specular(),
            texture_slots: Vec::new(),
        }
    }

    /// Append a slot, returning self for chaining
    pub fn with_slot(mut self, slot: Option<TextureSlot>) -> Self {
        self.texture_slots.push(slot);
        self
    }
}

/// Mesh data relevant to material export
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Mesh {
    /// UV channel names in channel order
    #[serde(default)]
    pub uv_layers: Vec<String>,
}

fn default_page() -> String {
    "Default".to_string()
}

/// Scene object whose materials are exported
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneObject {
    pub name: String,
    /// Page the object's runtime objects are registered in
    #[serde(default = "default_page")]
    pub page: String,
    #[serde(default)]
    pub mesh: Mesh,
    /// Names of the materials used by this object
    #[serde(default)]
    pub materials: Vec<String>,
}

impl SceneObject {
    pub fn new(name: impl Into<String>, uv_layers: &[&str]) -> Self {
        Self {
            name: name.into(),
            page: default_page(),
            mesh: Mesh {
                uv_layers: uv_layers.iter().map(|s| s.to_string()).collect(),
            },
            materials: Vec::new(),
        }
    }
}

/// Global scene settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct World {
    #[serde(default)]
    pub ambient_color: Color,
}

/// Image entry of a scene description
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ImageDesc {
    /// Image decoded from a file, relative to the description
    File { name: String, path: PathBuf },
    /// Generated solid fill
    Solid {
        name: String,
        width: u32,
        height: u32,
        color: Color,
    },
}

impl ImageDesc {
    pub fn name(&self) -> &str {
        match self {
            ImageDesc::File { name, .. } | ImageDesc::Solid { name, .. } => name,
        }
    }
}

/// On-disk scene description
#[derive(Debug, Clone, Deserialize)]
pub struct SceneDescription {
    #[serde(default)]
    pub world: World,
    #[serde(default)]
    pub images: Vec<ImageDesc>,
    #[serde(default)]
    pub materials: Vec<Material>,
    #[serde(default)]
    pub objects: Vec<SceneObject>,
}

/// Complete host scene
#[derive(Debug, Clone, Default)]
pub struct Scene {
    pub world: World,
    pub images: HashMap<String, Image>,
    pub materials: Vec<Material>,
    pub objects: Vec<SceneObject>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load and validate a scene description file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::FileNotFound(path.to_path_buf()));
        }
        let text = std::fs::read_to_string(path)?;
        let base_dir = path.parent().unwrap_or(Path::new("."));
        Self::from_json_str(&text, base_dir)
            .with_context(|| format!("loading scene {}", path.display()))
    }

    /// Parse a scene description, resolving image paths against `base_dir`
    pub fn from_json_str(text: &str, base_dir: &Path) -> Result<Self> {
        let description: SceneDescription = serde_json::from_str(text)?;
        Self::from_description(description, base_dir)
    }

    /// Build a scene from a parsed description
    pub fn from_description(description: SceneDescription, base_dir: &Path) -> Result<Self> {
        let mut scene = Scene {
            world: description.world,
            images: HashMap::with_capacity(description.images.len()),
            materials: description.materials,
            objects: description.objects,
        };

        for desc in description.images {
            let image = match &desc {
                ImageDesc::File { name, path } => Image::open(name.clone(), base_dir.join(path))
                    .with_context(|| format!("image '{}'", name))?,
                ImageDesc::Solid { name, width, height, color } => {
                    if *width == 0 || *height == 0 {
                        return Err(Error::invalid_data(format!(
                            "image '{}' has zero size {}x{}",
                            name, width, height
                        )));
                    }
                    Image::solid(name.clone(), *width, *height, *color)
                }
            };
            tracing::debug!(image = %desc.name(), width = image.width(), height = image.height(), "Loaded image");
            scene.images.insert(desc.name().to_string(), image);
        }

        scene.validate()?;
        Ok(scene)
    }

    /// Check that every name reference in the scene resolves
    pub fn validate(&self) -> Result<()> {
        for object in &self.objects {
            for material in &object.materials {
                if self.material(material).is_none() {
                    return Err(Error::invalid_reference(format!(
                        "object '{}' uses unknown material '{}'",
                        object.name, material
                    )));
                }
            }
        }

        for material in &self.materials {
            for slot in material.texture_slots.iter().flatten() {
                if let Some(image) = &slot.texture.image {
                    if !self.images.contains_key(image) {
                        return Err(Error::invalid_reference(format!(
                            "texture '{}' in material '{}' uses unknown image '{}'",
                            slot.texture.name, material.name, image
                        )));
                    }
                }
            }
        }

        Ok(())
    }

    /// Find a material by name
    pub fn material(&self, name: &str) -> Option<&Material> {
        self.materials.iter().find(|m| m.name == name)
    }

    /// Add an image keyed by its name
    pub fn add_image(&mut self, image: Image) {
        self.images.insert(image.name.clone(), image);
    }
}
