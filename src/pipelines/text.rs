//! Text rendering on top of the 3D scene, backed by glyphon.

use std::path::Path;

use glyphon::{
    Cache, FontSystem, PrepareError, RenderError, Resolution, SwashCache, TextArea, TextAtlas,
    TextRenderer, Viewport,
};

use crate::data_structures::texture::Texture;

pub struct TextPipeline {
    pub font_system: FontSystem,
    swash_cache: SwashCache,
    viewport: Viewport,
    atlas: TextAtlas,
    renderer: TextRenderer,
}

impl TextPipeline {
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue, format: wgpu::TextureFormat) -> Self {
        let cache = Cache::new(device);
        let viewport = Viewport::new(device, &cache);
        let mut atlas = TextAtlas::new(device, queue, &cache, format);
        // The scene pass has a depth attachment, text ignores it
        let renderer = TextRenderer::new(
            &mut atlas,
            device,
            wgpu::MultisampleState::default(),
            Some(wgpu::DepthStencilState {
                format: Texture::DEPTH_FORMAT,
                depth_write_enabled: false,
                depth_compare: wgpu::CompareFunction::Always,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
        );
        Self {
            font_system: FontSystem::new(),
            swash_cache: SwashCache::new(),
            viewport,
            atlas,
            renderer,
        }
    }

    /// Adds a font file to the font system and returns its family name, or
    /// `None` if the file could not be read.
    pub fn load_font(&mut self, path: &Path) -> Option<String> {
        let db = self.font_system.db_mut();
        let known = db.len();
        if let Err(e) = db.load_font_file(path) {
            log::warn!("could not load font {}: {e}", path.display());
            return None;
        }
        let family = db
            .faces()
            .nth(known)
            .and_then(|face| face.families.first())
            .map(|(name, _)| name.clone());
        if family.is_none() {
            log::warn!("{} holds no usable font face", path.display());
        }
        family
    }

    pub fn prepare<'a>(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        width: u32,
        height: u32,
        areas: impl IntoIterator<Item = TextArea<'a>>,
    ) -> Result<(), PrepareError> {
        self.viewport.update(queue, Resolution { width, height });
        self.renderer.prepare(
            device,
            queue,
            &mut self.font_system,
            &mut self.atlas,
            &self.viewport,
            areas,
            &mut self.swash_cache,
        )
    }

    pub fn render(&self, pass: &mut wgpu::RenderPass<'_>) -> Result<(), RenderError> {
        self.renderer.render(&self.atlas, &self.viewport, pass)
    }

    /// Drops glyphs that were not used since the last call.
    pub fn trim(&mut self) {
        self.atlas.trim();
    }
}
