//! luminous-field
//!
//! A small real-time scene renderer built on wgpu: a skybox, a field of
//! drifting instanced boxes, OBJ butterflies flapping their wings and an FPS
//! overlay, seen through a free-fly camera. The scene is composed of flows
//! that the event loop in [`flow`] drives every frame.
//!
//! High-level modules
//! - `camera`: free-fly camera, controller and the camera uniform
//! - `config`: TOML scene configuration with defaults
//! - `context`: central GPU and window context that owns device/queue/pipelines
//! - `data_structures`: GPU-side data models (meshes, materials, instances, textures)
//! - `entities`: the scene parts (skybox, boxes, butterflies, overlay) as flows
//! - `flow`: high level flow control and the event loop
//! - `pipelines`: render pipelines (model, boxes, skybox, light, text)
//! - `resources`: OBJ/MTL parsing and loading of models, textures and cubemaps
//! - `render`: render composition for efficient pipeline reuse
//!

pub mod camera;
pub mod config;
pub mod context;
pub mod data_structures;
pub mod entities;
pub mod flow;
pub mod pipelines;
pub mod render;
pub mod resources;

// Re-exports commonly used types for convenience in downstream code.
pub use cgmath;
pub use winit::event::DeviceEvent;
pub use winit::event::WindowEvent;
