//! Render pipelines shared by every flow.
//!
//! - `basic` holds the pipeline builder and the textured model pipeline
//! - `boxes` renders the instanced cube field
//! - `skybox` renders the cubemap behind everything else
//! - `light` owns the point light uniform
//! - `text` draws overlay text (requires the `ui` feature)

pub mod basic;
pub mod boxes;
pub mod light;
pub mod skybox;
#[cfg(feature = "ui")]
pub mod text;

#[derive(Debug)]
pub struct Pipelines {
    pub model: wgpu::RenderPipeline,
    pub boxes: wgpu::RenderPipeline,
    pub skybox: wgpu::RenderPipeline,
    pub skybox_layout: wgpu::BindGroupLayout,
}

impl Pipelines {
    pub fn new(
        device: &wgpu::Device,
        config: &wgpu::SurfaceConfiguration,
        camera_bind_group_layout: &wgpu::BindGroupLayout,
        light_bind_group_layout: &wgpu::BindGroupLayout,
    ) -> Self {
        let model = basic::mk_model_pipeline(
            device,
            config,
            camera_bind_group_layout,
            light_bind_group_layout,
        );
        let boxes = boxes::mk_box_pipeline(
            device,
            config,
            camera_bind_group_layout,
            light_bind_group_layout,
        );
        let (skybox, skybox_layout) =
            skybox::mk_skybox_pipeline(device, config, camera_bind_group_layout);
        Self {
            model,
            boxes,
            skybox,
            skybox_layout,
        }
    }
}
