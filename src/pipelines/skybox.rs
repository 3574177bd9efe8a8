use crate::{
    data_structures::texture::Texture,
    pipelines::basic::{DepthMode, mk_render_pipeline},
    resources::texture::cubemap_layout,
};

/// The sky is a fullscreen triangle at the far plane. View rays are rebuilt
/// from the inverse projection and view matrices in the camera uniform, so no
/// vertex buffer is bound.
pub fn mk_skybox_pipeline(
    device: &wgpu::Device,
    config: &wgpu::SurfaceConfiguration,
    camera_bind_group_layout: &wgpu::BindGroupLayout,
) -> (wgpu::RenderPipeline, wgpu::BindGroupLayout) {
    let cubemap_layout = cubemap_layout(device);
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Skybox Pipeline Layout"),
        bind_group_layouts: &[camera_bind_group_layout, &cubemap_layout],
        push_constant_ranges: &[],
    });
    let shader = wgpu::ShaderModuleDescriptor {
        label: Some("Skybox Shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("skybox.wgsl").into()),
    };
    let pipeline = mk_render_pipeline(
        device,
        &layout,
        config.format,
        Some(wgpu::BlendState::REPLACE),
        Some(Texture::DEPTH_FORMAT),
        // Depth is cleared to 1.0; the sky only fills what nothing else covered
        DepthMode {
            write: false,
            compare: wgpu::CompareFunction::LessEqual,
        },
        None,
        &[],
        shader,
    );
    (pipeline, cubemap_layout)
}

pub fn mk_skybox_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    cubemap: &Texture,
    sampler: &wgpu::Sampler,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&cubemap.view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
        label: Some("skybox_bind_group"),
    })
}
