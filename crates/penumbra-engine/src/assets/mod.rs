//! Asset loading boundary.
//!
//! A loader turns a scene file into [`RawPrimitive`]s. It does not decode
//! images or validate geometry; [`crate::scene::stage_primitives`] does that
//! and decides what to skip.

mod gltf_loader;

use std::path::{Path, PathBuf};

use crate::scene::RawPrimitive;

pub use gltf_loader::GltfLoader;

#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse glTF document: {0}")]
    Gltf(#[from] gltf::Error),

    #[error("buffer {index} is not loaded")]
    MissingBuffer { index: usize },

    #[error("buffer view {view} (offset {offset}, length {length}) exceeds buffer of {available} bytes")]
    ViewOutOfBounds {
        view: usize,
        offset: usize,
        length: usize,
        available: usize,
    },
}

pub trait AssetLoader {
    /// Reads `scene_file`, resolving relative resources against `resource_dir`.
    fn load(&self, scene_file: &Path, resource_dir: &Path) -> Result<Vec<RawPrimitive>, AssetError>;

    /// [`AssetLoader::load`] with resources next to the scene file.
    fn load_file(&self, scene_file: &Path) -> Result<Vec<RawPrimitive>, AssetError> {
        let dir = scene_file.parent().unwrap_or_else(|| Path::new("."));
        self.load(scene_file, dir)
    }
}
