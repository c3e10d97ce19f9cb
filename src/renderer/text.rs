//! Glyphon text drawn on top of the canvas.
//!
//! Text lives in named slots. Each slot owns one shaped glyphon buffer and the
//! rectangle it is drawn into; only slots with content are prepared each frame.

use glyphon::{
    Attrs, Buffer, Cache, Color, Family, FontSystem, Metrics, Resolution, Shaping, SwashCache,
    TextArea, TextAtlas, TextBounds, TextRenderer as GlyphonTextRenderer, Viewport, Weight,
};
use std::collections::HashMap;
use wgpu::{Device, Queue, RenderPass};

use crate::error::AppError;

/// Font settings for one slot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    pub size: f32,
    pub line_height: f32,
    pub color: Color,
    pub bold: bool,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self::sized(14.0)
    }
}

impl TextStyle {
    /// Slate text at `size` px with a 1.3 line height.
    pub fn sized(size: f32) -> Self {
        Self {
            size,
            line_height: (size * 1.3).round(),
            color: Color::rgb(226, 232, 240),
            bold: false,
        }
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    fn attrs(&self) -> Attrs<'static> {
        let weight = if self.bold { Weight::BOLD } else { Weight::NORMAL };
        Attrs::new().family(Family::SansSerif).weight(weight)
    }
}

/// Window-pixel rectangle a slot is laid out and clipped to.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TextRect {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl TextRect {
    pub fn new(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self {
            left,
            top,
            width: width.max(1.0),
            height: height.max(1.0),
        }
    }

    fn bounds(&self) -> TextBounds {
        TextBounds {
            left: self.left as i32,
            top: self.top as i32,
            right: (self.left + self.width) as i32,
            bottom: (self.top + self.height) as i32,
        }
    }
}

struct TextSlot {
    buffer: Buffer,
    style: TextStyle,
    rect: TextRect,
    content: String,
}

/// Glyph atlas, font system and every named slot.
pub struct TextRenderer {
    font_system: FontSystem,
    swash_cache: SwashCache,
    viewport: Viewport,
    atlas: TextAtlas,
    renderer: GlyphonTextRenderer,
    slots: HashMap<&'static str, TextSlot>,
}

impl TextRenderer {
    pub fn new(device: &Device, queue: &Queue, surface_format: wgpu::TextureFormat) -> Self {
        let cache = Cache::new(device);
        let viewport = Viewport::new(device, &cache);
        let mut atlas = TextAtlas::new(device, queue, &cache, surface_format);
        let renderer =
            GlyphonTextRenderer::new(&mut atlas, device, wgpu::MultisampleState::default(), None);
        let font_system = FontSystem::new();
        log::debug!("font system loaded {} faces", font_system.db().len());

        Self {
            font_system,
            swash_cache: SwashCache::new(),
            viewport,
            atlas,
            renderer,
            slots: HashMap::new(),
        }
    }

    /// Creates (or replaces) slot `id`, initially empty.
    pub fn add_slot(&mut self, id: &'static str, style: TextStyle, rect: TextRect) {
        let mut buffer = Buffer::new(
            &mut self.font_system,
            Metrics::new(style.size, style.line_height),
        );
        buffer.set_size(&mut self.font_system, Some(rect.width), Some(rect.height));
        self.slots.insert(
            id,
            TextSlot {
                buffer,
                style,
                rect,
                content: String::new(),
            },
        );
    }

    /// Replaces a slot's text, reshaping only when it changed.
    pub fn set_text(&mut self, id: &str, text: &str) -> Result<(), AppError> {
        let slot = self
            .slots
            .get_mut(id)
            .ok_or_else(|| AppError::Text(format!("no text slot '{id}'")))?;
        if slot.content == text {
            return Ok(());
        }
        slot.buffer
            .set_text(&mut self.font_system, text, slot.style.attrs(), Shaping::Advanced);
        slot.buffer.shape_until_scroll(&mut self.font_system, false);
        slot.content.clear();
        slot.content.push_str(text);
        Ok(())
    }

    /// Moves a slot, re-wrapping its text when the size changed.
    pub fn place(&mut self, id: &str, rect: TextRect) -> Result<(), AppError> {
        let slot = self
            .slots
            .get_mut(id)
            .ok_or_else(|| AppError::Text(format!("no text slot '{id}'")))?;
        if (slot.rect.width, slot.rect.height) != (rect.width, rect.height) {
            slot.buffer
                .set_size(&mut self.font_system, Some(rect.width), Some(rect.height));
            slot.buffer.shape_until_scroll(&mut self.font_system, false);
        }
        slot.rect = rect;
        Ok(())
    }

    pub fn resize(&mut self, queue: &Queue, width: u32, height: u32) {
        self.viewport.update(queue, Resolution { width, height });
    }

    /// Uploads glyphs for every non-empty slot.
    pub fn prepare(&mut self, device: &Device, queue: &Queue) -> Result<(), glyphon::PrepareError> {
        let areas = self
            .slots
            .values()
            .filter(|slot| !slot.content.is_empty())
            .map(|slot| TextArea {
                buffer: &slot.buffer,
                left: slot.rect.left,
                top: slot.rect.top,
                scale: 1.0,
                bounds: slot.rect.bounds(),
                default_color: slot.style.color,
                custom_glyphs: &[],
            });

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

    pub fn render(&mut self, render_pass: &mut RenderPass) -> Result<(), glyphon::RenderError> {
        self.renderer.render(&self.atlas, &self.viewport, render_pass)
    }

    /// Evicts glyphs that were not used this frame.
    pub fn trim(&mut self) {
        self.atlas.trim();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_never_collapses() {
        let rect = TextRect::new(10.0, 20.0, -5.0, 0.0);
        assert_eq!((rect.width, rect.height), (1.0, 1.0));
        let bounds = TextRect::new(10.5, 20.0, 100.0, 30.0).bounds();
        assert_eq!((bounds.left, bounds.right, bounds.bottom), (10, 110, 50));
    }

    #[test]
    fn test_style_builders() {
        let style = TextStyle::sized(20.0).bold().with_color(Color::rgb(1, 2, 3));
        assert_eq!(style.line_height, 26.0);
        assert!(style.bold);
        assert_eq!(style.color, Color::rgb(1, 2, 3));
    }
}
