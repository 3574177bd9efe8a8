//! Frame counter shown in the window title and, with the `ui` feature, as
//! text in the top-left corner.

use instant::Duration;
use winit::event::{DeviceEvent, WindowEvent};

use crate::{
    config::SceneConfig,
    context::{Context, InitContext},
    flow::{FlowConstructor, GraphicsFlow, Out},
    render::Render,
};

/// Counts frames and recomputes the rate once per elapsed second.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FpsCounter {
    frames: u32,
    elapsed: Duration,
    fps: u32,
}

impl FpsCounter {
    /// Registers one frame that took `dt`. Returns the new rate whenever a
    /// second has passed since the last one.
    pub fn tick(&mut self, dt: Duration) -> Option<u32> {
        self.frames += 1;
        self.elapsed += dt;
        if self.elapsed < Duration::from_secs(1) {
            return None;
        }
        self.fps = (self.frames as f64 / self.elapsed.as_secs_f64()).round() as u32;
        self.frames = 0;
        self.elapsed = Duration::ZERO;
        Some(self.fps)
    }

    pub fn fps(&self) -> u32 {
        self.fps
    }
}

pub fn window_title(base: &str, fps: u32) -> String {
    format!("{base} - {fps} FPS")
}

pub struct OverlayFlow {
    title: String,
    counter: FpsCounter,
    #[cfg(feature = "ui")]
    text: text::FpsText,
}

impl OverlayFlow {
    #[allow(unused_variables)]
    pub fn new(ctx: &InitContext, scene: &SceneConfig) -> Self {
        Self {
            title: scene.window.title.clone(),
            counter: FpsCounter::default(),
            #[cfg(feature = "ui")]
            text: text::FpsText::new(ctx, scene),
        }
    }
}

pub fn constructor<S: 'static, E: 'static>(scene: &SceneConfig) -> FlowConstructor<S, E> {
    let scene = scene.clone();
    Box::new(move |ctx| {
        Box::pin(async move {
            let flow = OverlayFlow::new(&ctx, &scene);
            anyhow::Ok(Box::new(flow) as Box<dyn GraphicsFlow<S, E>>)
        })
    })
}

impl<S, E> GraphicsFlow<S, E> for OverlayFlow {
    fn on_init(&mut self, _: &mut Context, _: &mut S) -> Out<S, E> {
        Out::Empty
    }

    fn on_update(&mut self, ctx: &Context, _: &mut S, dt: Duration) -> Out<S, E> {
        if let Some(fps) = self.counter.tick(dt) {
            ctx.window().set_title(&window_title(&self.title, fps));
            #[cfg(feature = "ui")]
            self.text.set_fps(fps);
            #[cfg(not(feature = "ui"))]
            log::info!("{fps} FPS");
        }
        #[cfg(feature = "ui")]
        self.text.prepare(ctx);
        Out::Empty
    }

    fn on_tick(&mut self, _: &Context, _: &mut S) -> Out<S, E> {
        #[cfg(feature = "ui")]
        self.text.trim();
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

    #[cfg(feature = "ui")]
    fn on_render<'pass>(&self) -> Render<'_, 'pass> {
        Render::Overlay(Box::new(
            move |_: &Context, render_pass: &mut wgpu::RenderPass<'pass>| {
                self.text.render(render_pass)
            },
        ))
    }

    #[cfg(not(feature = "ui"))]
    fn on_render<'pass>(&self) -> Render<'_, 'pass> {
        Render::None
    }
}

#[cfg(feature = "ui")]
mod text {
    use glyphon::{Attrs, Buffer, Color, Family, Metrics, Shaping, TextArea, TextBounds};

    use crate::{
        config::SceneConfig,
        context::{Context, InitContext},
        pipelines::text::TextPipeline,
    };

    const MARGIN: f32 = 18.0;
    const SHADOW_OFFSET: f32 = 2.0;

    /// "FPS: n" drawn twice: a black shadow, then the text itself.
    pub(super) struct FpsText {
        pipeline: TextPipeline,
        buffer: Buffer,
        family: Option<String>,
        colour: Color,
    }

    impl FpsText {
        pub(super) fn new(ctx: &InitContext, scene: &SceneConfig) -> Self {
            let mut pipeline = TextPipeline::new(&ctx.device, &ctx.queue, ctx.surface_format);
            let family = scene
                .overlay
                .font
                .as_ref()
                .and_then(|font| pipeline.load_font(&scene.asset(font)));
            if family.is_none() {
                log::info!("overlay uses the system sans-serif font");
            }

            let size = scene.overlay.font_size;
            let mut buffer = Buffer::new(&mut pipeline.font_system, Metrics::new(size, size * 1.2));
            buffer.set_size(
                &mut pipeline.font_system,
                Some(ctx.width as f32),
                Some(ctx.height as f32),
            );
            let [r, g, b] = scene.overlay.colour;
            let mut text = Self {
                pipeline,
                buffer,
                family,
                colour: Color::rgb(r, g, b),
            };
            text.set_fps(0);
            text
        }

        pub(super) fn set_fps(&mut self, fps: u32) {
            let family = match &self.family {
                Some(name) => Family::Name(name),
                None => Family::SansSerif,
            };
            let font_system = &mut self.pipeline.font_system;
            self.buffer.set_text(
                font_system,
                &format!("FPS: {fps}"),
                &Attrs::new().family(family),
                Shaping::Advanced,
            );
            self.buffer.shape_until_scroll(font_system, false);
        }

        pub(super) fn prepare(&mut self, ctx: &Context) {
            let (width, height) = (ctx.config.width, ctx.config.height);
            let bounds = TextBounds {
                left: 0,
                top: 0,
                right: width as i32,
                bottom: height as i32,
            };
            let area = |offset: f32, colour: Color| TextArea {
                buffer: &self.buffer,
                left: MARGIN + offset,
                top: MARGIN + offset,
                scale: 1.0,
                bounds,
                default_color: colour,
                custom_glyphs: &[],
            };
            let areas = [area(SHADOW_OFFSET, Color::rgb(0, 0, 0)), area(0.0, self.colour)];
            if let Err(e) = self
                .pipeline
                .prepare(&ctx.device, &ctx.queue, width, height, areas)
            {
                log::warn!("could not prepare overlay text: {e}");
            }
        }

        pub(super) fn render(&self, render_pass: &mut wgpu::RenderPass<'_>) {
            if let Err(e) = self.pipeline.render(render_pass) {
                log::warn!("could not draw overlay text: {e}");
            }
        }

        pub(super) fn trim(&mut self) {
            self.pipeline.trim();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_rate_before_a_second() {
        let mut counter = FpsCounter::default();
        for _ in 0..59 {
            assert_eq!(counter.tick(Duration::from_millis(16)), None);
        }
        assert_eq!(counter.fps(), 0);
    }

    #[test]
    fn rate_is_frames_per_elapsed_second() {
        let mut counter = FpsCounter::default();
        let rates: Vec<_> = (0..120)
            .filter_map(|_| counter.tick(Duration::from_millis(20)))
            .collect();
        // 50 frames of 20 ms make up each second
        assert_eq!(rates, [50, 50]);
        assert_eq!(counter.fps(), 50);
    }

    #[test]
    fn a_slow_frame_still_reports() {
        let mut counter = FpsCounter::default();
        counter.tick(Duration::from_millis(500));
        assert_eq!(counter.tick(Duration::from_millis(1500)), Some(1));
        assert_eq!(counter.tick(Duration::from_millis(10)), None);
    }

    #[test]
    fn title_carries_the_rate() {
        assert_eq!(window_title("The Luminous Field", 60), "The Luminous Field - 60 FPS");
    }
}
