//! Render composition and pipeline batching.
//!
//! Flows describe what they want drawn with a [`Render`]. The engine sorts the
//! pieces of every flow into per-pipeline batches and draws the batches in a
//! fixed order: textured models, boxes, the sky, then overlays.

use wgpu::RenderPass;

use crate::{context::Context, data_structures::model::Model};

/// Data for instanced object rendering: a model and its instance buffer.
///
/// The instance buffer holds `amount` [`InstanceRaw`](crate::data_structures::instance::InstanceRaw)
/// entries and is bound to vertex slot 1.
pub struct Instanced<'a> {
    pub instance: &'a wgpu::Buffer,
    pub model: &'a Model,
    pub amount: usize,
}

/// Specifies how a flow should be rendered.
///
/// # Variants
///
/// - `None` renders nothing
/// - `Model(Instanced)` renders a textured, instanced model
/// - `Boxes(Instanced)` renders flat-coloured instanced geometry
/// - `Sky(&BindGroup)` renders a cubemap behind the scene
/// - `Overlay(...)` runs a closure after all 3D geometry, used for text
///
pub enum Render<'a, 'pass>
where
    'pass: 'a,
{
    None,
    Model(Instanced<'a>),
    Boxes(Instanced<'a>),
    Sky(&'a wgpu::BindGroup),
    Overlay(Box<dyn 'a + FnOnce(&Context, &mut wgpu::RenderPass<'pass>)>),
}

/// Per-pipeline batches collected from all flows for one frame.
pub(crate) struct Batches<'a, 'pass> {
    pub models: Vec<Instanced<'a>>,
    pub boxes: Vec<Instanced<'a>>,
    pub skies: Vec<&'a wgpu::BindGroup>,
    #[allow(clippy::type_complexity)]
    pub overlays: Vec<Box<dyn 'a + FnOnce(&Context, &mut wgpu::RenderPass<'pass>)>>,
}

impl<'a, 'pass> Default for Batches<'a, 'pass> {
    fn default() -> Self {
        Self {
            models: Vec::new(),
            boxes: Vec::new(),
            skies: Vec::new(),
            overlays: Vec::new(),
        }
    }
}

impl<'a, 'pass> Render<'a, 'pass> {
    pub(crate) fn set_pipelines(self, batches: &mut Batches<'a, 'pass>) {
        match self {
            Render::Model(instanced) => batches.models.push(instanced),
            Render::Boxes(instanced) => batches.boxes.push(instanced),
            Render::Sky(group) => batches.skies.push(group),
            Render::Overlay(f) => batches.overlays.push(f),
            Render::None => (),
        }
    }
}

impl<'a, 'pass> Batches<'a, 'pass> {
    /// Issues every batch into `render_pass` in draw order.
    pub(crate) fn draw(self, ctx: &'a Context, render_pass: &mut RenderPass<'pass>) {
        use crate::data_structures::model::DrawModel;

        render_pass.set_pipeline(&ctx.pipelines.model);
        for instanced in self.models {
            if instanced.amount == 0 || instanced.instance.size() == 0 {
                log::warn!("skipping a model draw with zero instances");
                continue;
            }
            render_pass.set_vertex_buffer(1, instanced.instance.slice(..));
            render_pass.draw_model_instanced(
                instanced.model,
                0..instanced.amount as u32,
                &ctx.camera.bind_group,
                &ctx.light.bind_group,
            );
        }

        render_pass.set_pipeline(&ctx.pipelines.boxes);
        for instanced in self.boxes {
            if instanced.amount == 0 || instanced.instance.size() == 0 {
                log::warn!("skipping a box draw with zero instances");
                continue;
            }
            render_pass.set_vertex_buffer(1, instanced.instance.slice(..));
            render_pass.draw_untextured_instanced(
                instanced.model,
                0..instanced.amount as u32,
                &ctx.camera.bind_group,
                &ctx.light.bind_group,
            );
        }

        if !self.skies.is_empty() {
            render_pass.set_pipeline(&ctx.pipelines.skybox);
            render_pass.set_bind_group(0, &ctx.camera.bind_group, &[]);
            for sky in self.skies {
                render_pass.set_bind_group(1, sky, &[]);
                render_pass.draw(0..3, 0..1);
            }
        }

        for overlay in self.overlays {
            overlay(ctx, render_pass);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlays_are_batched_in_flow_order() {
        let mut batches = Batches::default();
        let renders: Vec<Render<'_, '_>> = vec![
            Render::Overlay(Box::new(|_: &Context, _: &mut RenderPass<'_>| {})),
            Render::None,
            Render::Overlay(Box::new(|_: &Context, _: &mut RenderPass<'_>| {})),
        ];
        for render in renders {
            render.set_pipelines(&mut batches);
        }

        assert_eq!(batches.overlays.len(), 2);
        assert!(batches.models.is_empty());
        assert!(batches.boxes.is_empty());
        assert!(batches.skies.is_empty());
    }
}
