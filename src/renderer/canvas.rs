//! # Canvas Renderer
//!
//! Draws a [`DrawList`] in one batched, indexed draw call. Every shape becomes
//! one quad (4 vertices, 6 indices) whose fragment coverage is computed in
//! `shaders/canvas.wgsl` from a signed distance, so circles, rings and thick
//! lines come out antialiased without extra geometry.
//!
//! Shapes arrive in the nominal drawing space and are mapped through the
//! current [`Letterbox`] into window pixels, then into normalized device
//! coordinates with the Y axis flipped.

use std::mem;
use wgpu::{
    self, BlendState, BufferUsages, ColorTargetState, ColorWrites, Device, FragmentState,
    MultisampleState, PrimitiveState, RenderPass, RenderPipeline, VertexAttribute,
    VertexBufferLayout, VertexState, util::DeviceExt,
};

use crate::projector::{Letterbox, Viewport};
use crate::renderer::draw_list::{DrawList, Shape};

/// Extra pixels around every quad so the antialiased edge is not clipped.
const EDGE_MARGIN: f32 = 1.0;
/// Thinnest stroke the shader can cover reliably.
const MIN_HALF_WIDTH: f32 = 0.5;

#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ShapeKind {
    Rect = 0,
    Circle = 1,
    Glow = 2,
    Ring = 3,
    Line = 4,
}

/// Vertex layout shared with `canvas.wgsl`. 48 bytes.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CanvasVertex {
    /// Normalized device coordinates.
    position: [f32; 2],
    color: [f32; 4],
    /// Window-pixel offset from the shape's reference point.
    local: [f32; 2],
    /// `[kind, extent_a, extent_b, 0]`
    params: [f32; 4],
}

impl CanvasVertex {
    const ATTRIBUTES: [VertexAttribute; 4] =
        wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x4, 2 => Float32x2, 3 => Float32x4];

    fn desc<'a>() -> VertexBufferLayout<'a> {
        VertexBufferLayout {
            array_stride: mem::size_of::<CanvasVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// Vertices and indices for one frame.
#[derive(Debug, Default)]
pub struct Geometry {
    pub vertices: Vec<CanvasVertex>,
    pub indices: Vec<u32>,
}

impl Geometry {
    pub fn quad_count(&self) -> usize {
        self.vertices.len() / 4
    }
}

/// Window pixels to NDC.
struct NdcMapper {
    width: f32,
    height: f32,
}

impl NdcMapper {
    fn map(&self, x: f32, y: f32) -> [f32; 2] {
        [(x / self.width) * 2.0 - 1.0, 1.0 - (y / self.height) * 2.0]
    }
}

struct QuadBuilder<'a> {
    geometry: &'a mut Geometry,
    ndc: NdcMapper,
}

impl QuadBuilder<'_> {
    /// Pushes a quad centred on `center` spanned by `axis_u`/`axis_v` (unit vectors)
    /// with half-extents `eu`/`ev`.
    #[allow(clippy::too_many_arguments)]
    fn push(
        &mut self,
        center: (f32, f32),
        axis_u: (f32, f32),
        axis_v: (f32, f32),
        eu: f32,
        ev: f32,
        color: [f32; 4],
        params: [f32; 4],
    ) {
        let base = self.geometry.vertices.len() as u32;
        for (lu, lv) in [(-eu, -ev), (eu, -ev), (eu, ev), (-eu, ev)] {
            let x = center.0 + axis_u.0 * lu + axis_v.0 * lv;
            let y = center.1 + axis_u.1 * lu + axis_v.1 * lv;
            self.geometry.vertices.push(CanvasVertex {
                position: self.ndc.map(x, y),
                color,
                local: [lu, lv],
                params,
            });
        }
        self.geometry
            .indices
            .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }
}

/// Converts a draw list into quads in window space.
pub fn build_geometry(list: &DrawList, letterbox: &Letterbox, window: Viewport) -> Geometry {
    let mut geometry = Geometry {
        vertices: Vec::with_capacity(list.len() * 4),
        indices: Vec::with_capacity(list.len() * 6),
    };
    let mut quads = QuadBuilder {
        geometry: &mut geometry,
        ndc: NdcMapper {
            width: window.width.max(1.0),
            height: window.height.max(1.0),
        },
    };
    let s = letterbox.scale;
    let x_axis = (1.0, 0.0);
    let y_axis = (0.0, 1.0);

    for shape in list.shapes() {
        match *shape {
            Shape::Circle {
                center,
                radius,
                color,
            } => {
                let r = radius * s;
                let c = letterbox.to_window(center.0, center.1);
                let e = r + EDGE_MARGIN;
                quads.push(c, x_axis, y_axis, e, e, color.0, params(ShapeKind::Circle, r, 0.0));
            }
            Shape::Glow {
                center,
                radius,
                color,
            } => {
                let r = radius * s;
                let c = letterbox.to_window(center.0, center.1);
                quads.push(c, x_axis, y_axis, r, r, color.0, params(ShapeKind::Glow, r, 0.0));
            }
            Shape::Ring {
                center,
                radius,
                width,
                color,
            } => {
                let r = radius * s;
                let w = (width * s).max(MIN_HALF_WIDTH * 2.0);
                let c = letterbox.to_window(center.0, center.1);
                let e = r + w / 2.0 + EDGE_MARGIN;
                quads.push(c, x_axis, y_axis, e, e, color.0, params(ShapeKind::Ring, r, w));
            }
            Shape::Line {
                from,
                to,
                width,
                color,
            } => {
                let a = letterbox.to_window(from.0, from.1);
                let b = letterbox.to_window(to.0, to.1);
                let (dx, dy) = (b.0 - a.0, b.1 - a.1);
                let length = (dx * dx + dy * dy).sqrt();
                let dir = if length > f32::EPSILON {
                    (dx / length, dy / length)
                } else {
                    x_axis
                };
                let normal = (-dir.1, dir.0);
                let half_length = length / 2.0;
                let half_width = (width * s / 2.0).max(MIN_HALF_WIDTH);
                let c = ((a.0 + b.0) / 2.0, (a.1 + b.1) / 2.0);
                quads.push(
                    c,
                    dir,
                    normal,
                    half_length + half_width + EDGE_MARGIN,
                    half_width + EDGE_MARGIN,
                    color.0,
                    params(ShapeKind::Line, half_length, half_width),
                );
            }
            Shape::Rect {
                x,
                y,
                width,
                height,
                color,
            } => {
                let (hw, hh) = (width * s / 2.0, height * s / 2.0);
                let c = letterbox.to_window(x + width / 2.0, y + height / 2.0);
                quads.push(c, x_axis, y_axis, hw, hh, color.0, params(ShapeKind::Rect, 0.0, 0.0));
            }
        }
    }
    geometry
}

fn params(kind: ShapeKind, a: f32, b: f32) -> [f32; 4] {
    [kind as u32 as f32, a, b, 0.0]
}

/// Batched shape renderer.
pub struct CanvasRenderer {
    render_pipeline: RenderPipeline,
    window: Viewport,
    letterbox: Letterbox,
    nominal: Viewport,
}

impl CanvasRenderer {
    pub fn new(device: &Device, surface_format: wgpu::TextureFormat, nominal: Viewport) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Canvas Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/canvas.wgsl").into()),
        });

        let render_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Canvas Pipeline Layout"),
                bind_group_layouts: &[],
                push_constant_ranges: &[],
            });

        let render_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Canvas Pipeline"),
            layout: Some(&render_pipeline_layout),
            vertex: VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[CanvasVertex::desc()],
                compilation_options: Default::default(),
            },
            fragment: Some(FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(ColorTargetState {
                    format: surface_format,
                    blend: Some(BlendState::ALPHA_BLENDING),
                    write_mask: ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                // Line quads can be wound either way depending on direction.
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: MultisampleState {
                count: 1,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            multiview: None,
            cache: None,
        });

        Self {
            render_pipeline,
            window: nominal,
            letterbox: Letterbox::fit(nominal, nominal),
            nominal,
        }
    }

    /// Must be called whenever the surface is resized.
    pub fn resize(&mut self, width: f32, height: f32) {
        self.window = Viewport::new(width, height);
        self.letterbox = Letterbox::fit(self.nominal, self.window);
    }

    pub fn letterbox(&self) -> Letterbox {
        self.letterbox
    }

    /// Draws every shape in `list` with a single indexed draw call, clipped to
    /// the letterboxed drawing area.
    pub fn render(&self, device: &Device, render_pass: &mut RenderPass, list: &DrawList) {
        if list.is_empty() {
            return;
        }
        let geometry = build_geometry(list, &self.letterbox, self.window);
        if geometry.indices.is_empty() {
            return;
        }

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Canvas Vertex Buffer"),
            contents: bytemuck::cast_slice(&geometry.vertices),
            usage: BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Canvas Index Buffer"),
            contents: bytemuck::cast_slice(&geometry.indices),
            usage: BufferUsages::INDEX,
        });

        if let Some((x, y, w, h)) = self.scissor() {
            render_pass.set_scissor_rect(x, y, w, h);
        }
        render_pass.set_pipeline(&self.render_pipeline);
        render_pass.set_vertex_buffer(0, vertex_buffer.slice(..));
        render_pass.set_index_buffer(index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        render_pass.draw_indexed(0..geometry.indices.len() as u32, 0, 0..1);
    }

    /// Letterboxed area in whole pixels, clamped to the surface.
    fn scissor(&self) -> Option<(u32, u32, u32, u32)> {
        let max_w = self.window.width.max(0.0) as u32;
        let max_h = self.window.height.max(0.0) as u32;
        let x = (self.letterbox.offset_x.max(0.0) as u32).min(max_w);
        let y = (self.letterbox.offset_y.max(0.0) as u32).min(max_h);
        let w = ((self.nominal.width * self.letterbox.scale).round() as u32).min(max_w - x);
        let h = ((self.nominal.height * self.letterbox.scale).round() as u32).min(max_h - y);
        (w > 0 && h > 0).then_some((x, y, w, h))
    }
}
