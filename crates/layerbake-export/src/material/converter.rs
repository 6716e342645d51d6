//! Host material to runtime material conversion

use std::collections::HashMap;

use layerbake_core::{Image, Material, SceneObject, Texture, TextureKind, TextureSlot, World};
use layerbake_render::GpuContext;

use crate::manager::{Key, ResourceManager};
use crate::material::{
    bake_image, blend_flags, normalized_bitmap_name, shade_flags, Layer, MaterialError,
    MaterialResult, RuntimeMaterial,
};
use crate::textures::{Bitmap, DynamicTextMap};

/// Copy material level settings onto a layer
pub fn propagate_material_settings(layer: &mut Layer, material: &Material, world: &World) {
    if !material.use_mist {
        layer.state.shade_flags |= shade_flags::NO_FOG | shade_flags::REALLY_NO_FOG;
    }

    layer.ambient = world.ambient_color;
    layer.preshade = material.diffuse_color;
    layer.runtime = material.diffuse_color;
    layer.specular = material.specular_color;
}

/// Layer waiting for its material to finish exporting
#[derive(Debug)]
struct PendingLayer {
    layer: Layer,
    /// Placeholder bitmap registered together with the layer
    dynamic_text: Option<DynamicTextMap>,
}

impl From<Layer> for PendingLayer {
    fn from(layer: Layer) -> Self {
        Self {
            layer,
            dynamic_text: None,
        }
    }
}

/// Converts materials for one export session
///
/// Bitmaps are baked once per normalized name and shared by every layer
/// that needs them afterwards.
#[derive(Debug, Default)]
pub struct MaterialConverter {
    bitmaps: HashMap<String, Key>,
    baked: usize,
    reused: usize,
}

impl MaterialConverter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of bitmaps baked so far
    pub fn baked_count(&self) -> usize {
        self.baked
    }

    /// Number of layers that reused an already baked bitmap
    pub fn reused_count(&self) -> usize {
        self.reused
    }

    /// Export one material as used by `object`
    ///
    /// The returned material always has at least one layer. The material
    /// and its layers are registered only once every slot has exported; on
    /// error nothing but already baked bitmaps is left in `mgr`.
    pub fn export_material<G: GpuContext>(
        &mut self,
        mgr: &mut ResourceManager,
        gpu: &mut G,
        images: &mut HashMap<String, Image>,
        world: &World,
        object: &SceneObject,
        material: &Material,
    ) -> MaterialResult<Key> {
        tracing::info!(material = %material.name, object = %object.name, "Exporting material");

        let mut pending = self.export_texture_slots(mgr, gpu, images, world, object, material)?;
        if pending.is_empty() {
            let mut layer = Layer::new(format!("{}_AutoLayer", material.name));
            propagate_material_settings(&mut layer, material, world);
            tracing::debug!(layer = %layer.name, "No texture layers, adding default layer");
            pending.push(layer.into());
        }

        let mut runtime = RuntimeMaterial::new(&material.name);
        for PendingLayer {
            mut layer,
            dynamic_text,
        } in pending
        {
            if let Some(map) = dynamic_text {
                layer.texture = Some(mgr.add_bitmap(Bitmap::DynamicText(map)));
            }
            runtime.layers.push(mgr.add_layer(&object.page, layer));
        }

        Ok(mgr.add_material(&object.page, runtime))
    }

    fn export_texture_slots<G: GpuContext>(
        &mut self,
        mgr: &mut ResourceManager,
        gpu: &mut G,
        images: &mut HashMap<String, Image>,
        world: &World,
        object: &SceneObject,
        material: &Material,
    ) -> MaterialResult<Vec<PendingLayer>> {
        let slots = material
            .texture_slots
            .iter()
            .flatten()
            .filter(|slot| slot.enabled);

        let mut pending = Vec::new();
        for slot in slots {
            let mut layer = Layer::new(format!("{}_{}", material.name, slot.name()));
            propagate_material_settings(&mut layer, material, world);
            layer.uvw_src = uv_channel(object, slot, &layer.name);

            match &slot.texture.kind {
                TextureKind::Image => {
                    let dynamic_text =
                        self.export_texture_image(mgr, gpu, images, &mut layer, &slot.texture)?;
                    pending.push(PendingLayer {
                        layer,
                        dynamic_text,
                    });
                }
                TextureKind::None => {
                    tracing::debug!(texture = slot.name(), "Skipping texture of type none");
                }
                TextureKind::Other(kind) => {
                    return Err(MaterialError::UnsupportedTexture {
                        texture: slot.name().to_string(),
                        kind: kind.clone(),
                        material: material.name.clone(),
                    });
                }
            }
        }

        Ok(pending)
    }

    /// Fill a layer from an image texture, baking its bitmap if needed
    ///
    /// A texture without an image gets no bitmap here; the placeholder to
    /// register for it is returned instead.
    fn export_texture_image<G: GpuContext>(
        &mut self,
        mgr: &mut ResourceManager,
        gpu: &mut G,
        images: &mut HashMap<String, Image>,
        layer: &mut Layer,
        texture: &Texture,
    ) -> MaterialResult<Option<DynamicTextMap>> {
        if texture.invert_alpha {
            layer.state.blend_flags |= blend_flags::INVERT_ALPHA;
        }

        let Some(image_name) = texture.image.as_deref() else {
            let name = format!("{}_DynText", layer.name);
            tracing::debug!(layer = %layer.name, bitmap = %name, "Texture has no image, using dynamic text map");
            return Ok(Some(DynamicTextMap { name }));
        };

        let image = images
            .get_mut(image_name)
            .ok_or_else(|| MaterialError::MissingImage {
                image: image_name.to_string(),
                texture: texture.name.clone(),
            })?;

        let name = normalized_bitmap_name(&image.name, texture.use_mipmap);
        if let Some(key) = self.bitmaps.get(&name) {
            tracing::debug!(layer = %layer.name, bitmap = %name, "Reusing baked bitmap");
            self.reused += 1;
            layer.texture = Some(key.clone());
            return Ok(None);
        }

        let mipmap = bake_image(gpu, image, texture, &name)?;
        let key = mgr.add_bitmap(Bitmap::Mipmap(mipmap));
        self.baked += 1;
        self.bitmaps.insert(name, key.clone());
        layer.texture = Some(key);
        Ok(None)
    }
}

/// Index of the slot's UV channel on the object's mesh, 0 if not found
fn uv_channel(object: &SceneObject, slot: &TextureSlot, layer: &str) -> u32 {
    match object
        .mesh
        .uv_layers
        .iter()
        .position(|uv| *uv == slot.uv_layer)
    {
        Some(index) => index as u32,
        None => {
            tracing::warn!(
                layer,
                uv_layer = %slot.uv_layer,
                object = %object.name,
                "UV channel not found on mesh, using the first channel"
            );
            0
        }
    }
}
