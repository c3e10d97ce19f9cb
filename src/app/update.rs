//! Per-frame update and render.

use crate::app::event_handler::App;
use crate::color::Color;
use crate::renderer::hud::HudInput;

impl App {
    /// Ticks the scene, rebuilds the draw list and presents one frame.
    ///
    /// The scheduler decides whether the simulation advances; drawing happens on
    /// every refresh so camera moves stay responsive while paused. A minimised
    /// window or an unavailable surface skips the frame.
    pub fn handle_redraw(&mut self) {
        let Some(window) = self.window.as_ref() else {
            return;
        };
        if window.is_minimized().unwrap_or(false) {
            return;
        }
        let Some(state) = self.state.as_mut() else {
            return;
        };

        state.profiler.start_section("frame");

        state.profiler.start_section("tick");
        state.session.on_frame();
        state.profiler.end_section("tick");

        state.profiler.start_section("draw");
        state.draw_list.clear();
        state.session.scene().draw(&mut state.draw_list);
        state.profiler.end_section("draw");

        state.profiler.start_section("hud");
        let level = state.session.level();
        let content = state.session.poll_content().clone();
        let (title, status, selection, pulses, tuning) = {
            let scene = state.session.scene();
            (
                scene.scene().title(),
                scene.scene().status(),
                scene.describe_selection(),
                scene.scene().pulse_count(),
                scene.tuning_label(),
            )
        };
        let input = HudInput {
            title,
            status,
            rate: state.session.scheduler.rate(),
            paused: state.session.scheduler.is_paused(),
            fps: state.fps,
            pulses,
            tuning,
            selection,
            level,
            content: &content,
        };
        if let Err(err) = state.hud.apply(&mut state.text_renderer, &input) {
            log::warn!("HUD update failed: {err}");
        }
        if let Err(err) = state
            .text_renderer
            .prepare(&state.gpu.device, &state.gpu.queue)
        {
            log::warn!("failed to prepare text: {err}");
        }
        state.profiler.end_section("hud");

        let Some(frame) = state.gpu.acquire() else {
            state.profiler.end_section("frame");
            return;
        };

        state.profiler.start_section("present");
        let mut encoder = state
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });
        {
            let Color([r, g, b, a]) = Color::BLACK;
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Canvas Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &frame.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: r as f64,
                            g: g as f64,
                            b: b as f64,
                            a: a as f64,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            state
                .canvas
                .render(&state.gpu.device, &mut render_pass, &state.draw_list);

            let (width, height) = state.gpu.size();
            render_pass.set_scissor_rect(0, 0, width, height);
            if let Err(err) = state.text_renderer.render(&mut render_pass) {
                log::warn!("text render failed: {err}");
            }
        }

        state.gpu.queue.submit(Some(encoder.finish()));
        window.pre_present_notify();
        frame.texture.present();
        state.text_renderer.trim();
        state.profiler.end_section("present");

        state.fps = crate::profiling::data::lock().record_frame();
        state.profiler.end_section("frame");
    }
}
