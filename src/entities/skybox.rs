use instant::Duration;
use winit::event::{DeviceEvent, WindowEvent};

use crate::{
    config::SceneConfig,
    context::{Context, InitContext},
    data_structures::texture::{Texture, create_default_sampler},
    flow::{FlowConstructor, GraphicsFlow, Out},
    pipelines::skybox::mk_skybox_bind_group,
    render::Render,
    resources::texture::load_cubemap,
};

/// The cubemap drawn behind the scene.
///
/// The cubemap is loaded by the constructor. The bind group needs the skybox
/// pipeline layout that only exists on the [`Context`], so it is created in
/// `on_init`.
pub struct SkyboxFlow {
    cubemap: Texture,
    bind_group: Option<wgpu::BindGroup>,
}

impl SkyboxFlow {
    pub async fn new(ctx: &InitContext, scene: &SceneConfig) -> anyhow::Result<Self> {
        let faces = scene.skybox.faces(&scene.assets.root);
        let cubemap = load_cubemap(&faces, &ctx.device, &ctx.queue).await?;
        Ok(Self {
            cubemap,
            bind_group: None,
        })
    }
}

pub fn constructor<S: 'static, E: 'static>(scene: &SceneConfig) -> FlowConstructor<S, E> {
    let scene = scene.clone();
    Box::new(move |ctx| {
        Box::pin(async move {
            let flow = SkyboxFlow::new(&ctx, &scene).await?;
            anyhow::Ok(Box::new(flow) as Box<dyn GraphicsFlow<S, E>>)
        })
    })
}

impl<S, E> GraphicsFlow<S, E> for SkyboxFlow {
    fn on_init(&mut self, ctx: &mut Context, _: &mut S) -> Out<S, E> {
        let fallback;
        let sampler = match &self.cubemap.sampler {
            Some(sampler) => sampler,
            None => {
                fallback = create_default_sampler(&ctx.device);
                &fallback
            }
        };
        self.bind_group = Some(mk_skybox_bind_group(
            &ctx.device,
            &ctx.pipelines.skybox_layout,
            &self.cubemap,
            sampler,
        ));
        Out::Empty
    }

    fn on_update(&mut self, _: &Context, _: &mut S, _: Duration) -> Out<S, E> {
        Out::Empty
    }

    fn on_tick(&mut self, _: &Context, _: &mut S) -> Out<S, E> {
        Out::Empty
    }

    fn on_device_events(&mut self, _: &Context, _: &mut S, _: &DeviceEvent) -> Out<S, E> {
        Out::Empty
    }

    fn on_window_events(&mut self, _: &Context, _: &mut S, _: &WindowEvent) -> Out<S, E> {
        Out::Empty
    }

    fn on_custom_events(&mut self, _: &Context, _: &mut S, event: E) -> Option<E> {
        Some(event)
    }

    fn on_render<'pass>(&self) -> Render<'_, 'pass> {
        match &self.bind_group {
            Some(bind_group) => Render::Sky(bind_group),
            None => Render::None,
        }
    }
}
