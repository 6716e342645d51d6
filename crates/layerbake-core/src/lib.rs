//! layerbake Core Library
//!
//! This crate provides the host scene model, common value types, error
//! handling and logging setup shared across all layerbake components.

pub mod error;
pub mod logging;
pub mod scene;
pub mod types;

pub use error::{Error, Result, ResultExt};
pub use scene::{Image, Material, Mesh, Scene, SceneObject, Texture, TextureKind, TextureSlot, World};
pub use types::*;
