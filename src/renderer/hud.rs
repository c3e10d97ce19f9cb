//! Heads-up display text.
//!
//! The HUD is four glyphon buffers: a header with the scene title and state, a
//! stats line, the selection panel and the content panel. Composition is plain
//! string work so it can be tested without a GPU; [`Hud::apply`] pushes the
//! result into the [`TextRenderer`].

use glyphon::Color;

use crate::content::ContentState;
use crate::error::AppError;
use crate::renderer::text::{TextRect, TextRenderer, TextStyle};
use crate::topic::Level;

const MARGIN: f32 = 16.0;
const PANEL_WIDTH: f32 = 340.0;
const KEY_POINTS_SHOWN: usize = 3;

const HEADER: &str = "hud_header";
const STATS: &str = "hud_stats";
const SELECTION: &str = "hud_selection";
const CONTENT: &str = "hud_content";

/// Everything the HUD shows for one frame.
#[derive(Debug, Clone)]
pub struct HudInput<'a> {
    pub title: &'a str,
    pub status: String,
    pub rate: f32,
    pub paused: bool,
    pub fps: f64,
    pub pulses: Option<usize>,
    /// Selected tunable and its value.
    pub tuning: Option<String>,
    pub selection: Option<String>,
    pub level: Level,
    pub content: &'a ContentState,
}

/// Composed HUD strings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HudText {
    pub header: String,
    pub stats: String,
    pub selection: String,
    pub content: String,
}

impl HudText {
    pub fn compose(input: &HudInput<'_>) -> Self {
        Self {
            header: format!("{}\n{}", input.title, input.status),
            stats: stats_line(input),
            selection: input.selection.clone().unwrap_or_default(),
            content: content_text(input.content, input.level),
        }
    }
}

fn stats_line(input: &HudInput<'_>) -> String {
    let mut line = format!("{:.1}x", input.rate);
    if input.paused {
        line.push_str(" | PAUSED");
    }
    line.push_str(&format!(" | {:.0} fps", input.fps));
    if let Some(pulses) = input.pulses {
        line.push_str(&format!(" | {pulses} signals"));
    }
    if let Some(tuning) = &input.tuning {
        line.push_str(&format!(" | {tuning}"));
    }
    line
}

fn content_text(state: &ContentState, level: Level) -> String {
    match state {
        ContentState::Idle => String::new(),
        ContentState::Loading => format!("Loading {} content...", level.display_name()),
        ContentState::Failed(banner) => banner.clone(),
        ContentState::Ready(content) => {
            let mut text = format!(
                "{} ({})\n\n{}",
                content.title,
                level.display_name(),
                content.introduction
            );
            if !content.key_points.is_empty() {
                text.push('\n');
                for point in content.key_points.iter().take(KEY_POINTS_SHOWN) {
                    text.push_str(&format!("\n- {point}"));
                }
            }
            text
        }
    }
}

/// Owns the HUD's text buffers inside a [`TextRenderer`].
#[derive(Debug, Default)]
pub struct Hud {
    last: HudText,
}

impl Hud {
    /// Creates the HUD buffers laid out for a `width` x `height` window.
    pub fn new(text: &mut TextRenderer, width: f32, height: f32) -> Self {
        let [header, stats, selection, content] = layout(width, height);
        text.add_slot(HEADER, TextStyle::sized(22.0).bold(), header);
        text.add_slot(
            STATS,
            TextStyle::sized(13.0).with_color(Color::rgb(148, 163, 184)),
            stats,
        );
        text.add_slot(
            SELECTION,
            TextStyle::sized(14.0).with_color(Color::rgb(250, 204, 21)),
            selection,
        );
        text.add_slot(CONTENT, TextStyle::sized(13.0), content);
        Self::default()
    }

    /// Re-anchors every buffer after a window resize.
    pub fn resize(&self, text: &mut TextRenderer, width: f32, height: f32) -> Result<(), AppError> {
        for (id, rect) in [HEADER, STATS, SELECTION, CONTENT]
            .into_iter()
            .zip(layout(width, height))
        {
            text.place(id, rect)?;
        }
        Ok(())
    }

    /// Pushes changed strings into the text renderer.
    pub fn apply(&mut self, text: &mut TextRenderer, input: &HudInput<'_>) -> Result<(), AppError> {
        let next = HudText::compose(input);
        if next == self.last {
            return Ok(());
        }
        text.set_text(HEADER, &next.header)?;
        text.set_text(STATS, &next.stats)?;
        text.set_text(SELECTION, &next.selection)?;
        text.set_text(CONTENT, &next.content)?;
        self.last = next;
        Ok(())
    }
}

/// Header and stats top-left, selection bottom-left, content down the right.
fn layout(width: f32, height: f32) -> [TextRect; 4] {
    let panel = PANEL_WIDTH.min(width * 0.4);
    [
        TextRect::new(MARGIN, MARGIN, width - panel - MARGIN * 3.0, 64.0),
        TextRect::new(MARGIN, MARGIN + 64.0, width * 0.5, 20.0),
        TextRect::new(MARGIN, (height - 90.0).max(0.0), width * 0.5, 80.0),
        TextRect::new(width - panel - MARGIN, MARGIN, panel, height - MARGIN * 2.0),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::LearningContent;

    fn input<'a>(content: &'a ContentState) -> HudInput<'a> {
        HudInput {
            title: "Connectome",
            status: "510 neurons".to_string(),
            rate: 2.0,
            paused: false,
            fps: 59.6,
            pulses: Some(42),
            tuning: None,
            selection: None,
            level: Level::Beginner,
            content,
        }
    }

    /// Stats carry the rate, pause flag, fps, pulse count and tuned parameter.
    #[test]
    fn test_stats_line() {
        let state = ContentState::Idle;
        let mut hud = input(&state);
        assert_eq!(HudText::compose(&hud).stats, "2.0x | 60 fps | 42 signals");

        hud.paused = true;
        hud.pulses = None;
        assert_eq!(HudText::compose(&hud).stats, "2.0x | PAUSED | 60 fps");

        hud.tuning = Some("firing rate 1.25".to_string());
        assert_eq!(
            HudText::compose(&hud).stats,
            "2.0x | PAUSED | 60 fps | firing rate 1.25"
        );
    }

    #[test]
    fn test_header_and_selection() {
        let state = ContentState::Idle;
        let mut hud = input(&state);
        hud.selection = Some("Frontal neuron".to_string());
        let text = HudText::compose(&hud);
        assert_eq!(text.header, "Connectome\n510 neurons");
        assert_eq!(text.selection, "Frontal neuron");
        assert!(text.content.is_empty());
    }

    /// Loading and failure states replace the content panel with a banner.
    #[test]
    fn test_content_banners() {
        let loading = ContentState::Loading;
        assert!(HudText::compose(&input(&loading)).content.starts_with("Loading"));

        let failed = ContentState::Failed("Content service is at capacity.".to_string());
        assert_eq!(
            HudText::compose(&input(&failed)).content,
            "Content service is at capacity."
        );
    }

    /// Only the first few key points are listed.
    #[test]
    fn test_ready_content() {
        let ready = ContentState::Ready(LearningContent {
            title: "Neuroscience".to_string(),
            introduction: "Neurons talk in spikes.".to_string(),
            key_points: (1..=5).map(|i| format!("point {i}")).collect(),
            deep_dive: String::new(),
            curated_sub_topics: Vec::new(),
            industry_updates: Vec::new(),
            viz_prompt: String::new(),
        });
        let content = HudText::compose(&input(&ready)).content;
        assert!(content.starts_with("Neuroscience (Beginner)\n\nNeurons talk in spikes."));
        assert!(content.contains("- point 3"));
        assert!(!content.contains("- point 4"));
    }

    #[test]
    fn test_layout_fits_window() {
        let [header, _, selection, content] = layout(800.0, 600.0);
        assert_eq!(header.left, MARGIN);
        assert!(selection.top < 600.0);
        let right = content.left + content.width;
        assert!((right - (800.0 - MARGIN)).abs() < 1e-3);
    }
}
