use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::{data_structures::texture, resources::load_binary};

/// Bind group layout of a model material: diffuse, specular and normal maps,
/// one shared sampler and the Phong uniform.
pub fn material_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    let texture_entry = |binding| wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            multisampled: false,
            view_dimension: wgpu::TextureViewDimension::D2,
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
        },
        count: None,
    };
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[
            texture_entry(0),
            texture_entry(1),
            texture_entry(2),
            wgpu::BindGroupLayoutEntry {
                binding: 3,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 4,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
        ],
        label: Some("Material bind group layout"),
    })
}

pub fn cubemap_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    view_dimension: wgpu::TextureViewDimension::Cube,
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ],
        label: Some("Skybox bind group layout"),
    })
}

pub async fn load_texture(
    path: &Path,
    is_normal_map: bool,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
) -> anyhow::Result<texture::Texture> {
    let data = load_binary(path).await?;
    let label = path.to_string_lossy();
    let format = path.extension().and_then(|ext| ext.to_str());
    texture::Texture::from_bytes(device, queue, &data, &label, format, is_normal_map)
        .with_context(|| format!("could not decode texture {}", path.display()))
}

/// Loads the six skybox faces (+X, -X, +Y, -Y, +Z, -Z) into one cube texture.
pub async fn load_cubemap(
    faces: &[PathBuf; 6],
    device: &wgpu::Device,
    queue: &wgpu::Queue,
) -> anyhow::Result<texture::Texture> {
    let loads = faces.iter().map(|path| async move {
        let data = load_binary(path).await?;
        let img = image::load_from_memory(&data)
            .with_context(|| format!("could not decode skybox face {}", path.display()))?;
        anyhow::Ok(img.to_rgba8())
    });
    let images = futures::future::try_join_all(loads).await?;
    log::info!(
        "loaded skybox faces of {}x{}",
        images[0].width(),
        images[0].height()
    );
    texture::Texture::create_cubemap(device, queue, &images, "skybox cubemap")
}
