use std::sync::Arc;

use anyhow::Context as _;
use winit::window::{CursorGrabMode, Window};

use crate::{
    camera::{CameraResources, Projection},
    config::SceneConfig,
    data_structures::texture,
    pipelines::{
        Pipelines,
        light::{LightResources, LightUniform},
    },
};

/// Where the light sits until a flow moves it.
pub const DEFAULT_LIGHT_POSITION: [f32; 3] = [0.0, 10.0, 0.0];

/// Central GPU and window state owned by the event loop.
///
/// Flows read it every frame and may change it through `Out::Configure`.
#[derive(Debug)]
pub struct Context {
    pub(crate) window: Arc<Window>,
    pub(crate) depth_texture: texture::Texture,
    pub surface: wgpu::Surface<'static>,
    pub device: Arc<wgpu::Device>,
    pub queue: Arc<wgpu::Queue>,
    pub config: wgpu::SurfaceConfiguration,
    pub camera: CameraResources,
    pub projection: Projection,
    pub light: LightResources,
    pub pipelines: Pipelines,
    pub clear_colour: wgpu::Color,
    pub tick_duration_millis: u64,
}

impl Context {
    pub async fn new(window: Arc<Window>, scene: &SceneConfig) -> anyhow::Result<Self> {
        let size = window.inner_size();

        // The instance is a handle to our GPU
        log::info!("wgpu setup");
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let surface = instance
            .create_surface(window.clone())
            .context("could not create a surface for the window")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("no suitable graphics adapter")?;
        log::info!("using adapter {:?}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("Luminous Field Device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
                trace: wgpu::Trace::Off,
            })
            .await
            .context("could not open the graphics device")?;

        let surface_caps = surface.get_capabilities(&adapter);
        // Shaders output linear colour and rely on an Srgb surface for the conversion.
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .context("the surface supports no texture format")?;
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        let cam = &scene.camera;
        let projection = Projection::new(
            config.width,
            config.height,
            cgmath::Deg(cam.fov),
            cam.znear,
            cam.zfar,
        );
        let camera = CameraResources::new(&device, cam, &projection);

        let depth_texture = texture::Texture::create_depth_texture(
            &device,
            [config.width, config.height],
            "depth_texture",
        );

        let light = LightResources::new(
            LightUniform::new(DEFAULT_LIGHT_POSITION, [1.0, 1.0, 1.0]),
            &device,
        );

        let pipelines = Pipelines::new(
            &device,
            &config,
            &camera.bind_group_layout,
            &light.bind_group_layout,
        );

        let [r, g, b] = scene.window.clear_colour;
        let ctx = Self {
            window,
            depth_texture,
            surface,
            device: Arc::new(device),
            queue: Arc::new(queue),
            config,
            camera,
            projection,
            light,
            pipelines,
            clear_colour: wgpu::Color { r, g, b, a: 1.0 },
            tick_duration_millis: 1000,
        };
        if scene.window.capture_cursor {
            ctx.capture_cursor(true);
        }
        Ok(ctx)
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    /// Locks (or confines, where locking is unsupported) and hides the cursor.
    pub fn capture_cursor(&self, capture: bool) {
        if capture {
            let grabbed = self
                .window
                .set_cursor_grab(CursorGrabMode::Locked)
                .or_else(|_| self.window.set_cursor_grab(CursorGrabMode::Confined));
            if let Err(e) = grabbed {
                log::warn!("could not grab the cursor: {e}");
            }
        } else if let Err(e) = self.window.set_cursor_grab(CursorGrabMode::None) {
            log::warn!("could not release the cursor: {e}");
        }
        self.window.set_cursor_visible(!capture);
    }
}

/// The part of [`Context`] flow constructors may use while loading assets.
#[derive(Clone, Debug)]
pub struct InitContext {
    pub device: Arc<wgpu::Device>,
    pub queue: Arc<wgpu::Queue>,
    pub surface_format: wgpu::TextureFormat,
    pub width: u32,
    pub height: u32,
}

impl From<&Context> for InitContext {
    fn from(ctx: &Context) -> Self {
        Self {
            device: ctx.device.clone(),
            queue: ctx.queue.clone(),
            surface_format: ctx.config.format,
            width: ctx.config.width,
            height: ctx.config.height,
        }
    }
}
