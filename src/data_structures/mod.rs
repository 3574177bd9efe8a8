//! Engine data structures: models, textures and instances.
//!
//! - `model` contains mesh and material definitions, GPU resources for 3D models
//! - `texture` contains the GPU texture wrapper and creation utilities
//! - `instance` holds per-instance transformation and attribute data

pub mod instance;
pub mod model;
pub mod texture;
