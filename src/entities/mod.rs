//! The parts of the scene, each one a [`GraphicsFlow`](crate::flow::GraphicsFlow).
//!
//! - `skybox` draws the cubemap behind everything
//! - `boxes` animates the field of drifting cubes and carries the light
//! - `butterfly` flies the OBJ butterflies around the origin
//! - `overlay` counts frames and shows the FPS
//!
//! Every module exposes a `constructor` that builds its flow from the
//! [`SceneConfig`](crate::config::SceneConfig) once the GPU is ready.

use rand::{SeedableRng, rngs::StdRng};
use wgpu::util::DeviceExt;

use crate::data_structures::instance::InstanceRaw;

pub mod boxes;
pub mod butterfly;
pub mod overlay;
pub mod skybox;

/// A fixed seed makes a scene reproducible, no seed draws one from the OS.
pub fn scene_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}

pub(crate) fn mk_instance_buffer(device: &wgpu::Device, raws: &[InstanceRaw], label: &str) -> wgpu::Buffer {
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(label),
        contents: bytemuck::cast_slice(raws),
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
    })
}

/// Uploads `raws`, growing the buffer when the instance count outgrew it.
pub(crate) fn write_instances(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    buffer: &mut wgpu::Buffer,
    raws: &[InstanceRaw],
    label: &str,
) {
    let needed = std::mem::size_of_val(raws) as wgpu::BufferAddress;
    if needed > buffer.size() {
        *buffer = mk_instance_buffer(device, raws, label);
    } else if needed > 0 {
        queue.write_buffer(buffer, 0, bytemuck::cast_slice(raws));
    }
}
