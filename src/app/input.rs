//! Keyboard and mouse mapping.
//!
//! Raw winit input is translated into [`Command`]s here so the event handler only
//! deals with intent.

use winit::event::MouseScrollDelta;
use winit::keyboard::{self, NamedKey};

use crate::camera::ZOOM_STEP;
use crate::scene::SceneAction;
use crate::topic::SceneKey;

/// Pixels of touchpad scroll treated as one wheel notch.
const PIXELS_PER_NOTCH: f32 = 50.0;

/// Something the user asked the application to do.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    SelectScene(SceneKey),
    TogglePause,
    Step,
    Scene(SceneAction),
    Zoom(f32),
    /// Multiply the simulation rate.
    ScaleRate(f32),
    CycleLevel,
    Quit,
}

macro_rules! match_char_key {
    ($c:expr, {
        $($key:literal => $variant:expr),* $(,)?
    }) => {{
        match $c.to_ascii_lowercase().as_str() {
            $($key => Some($variant),)*
            _ => None,
        }
    }};
}

macro_rules! match_named_key {
    ($k:expr, {
        $($key:ident => $variant:expr),* $(,)?
    }) => {{
        match $k {
            $(NamedKey::$key => Some($variant),)*
            _ => None,
        }
    }};
}

/// Maps a pressed key to its command.
pub fn command_for_key(key: &keyboard::Key) -> Option<Command> {
    match key {
        keyboard::Key::Named(named) => match_named_key!(named, {
            Space => Command::TogglePause,
            Escape => Command::Quit,
            Tab => Command::Scene(SceneAction::NextTunable),
            ArrowUp => Command::Scene(SceneAction::Nudge(1.0)),
            ArrowDown => Command::Scene(SceneAction::Nudge(-1.0)),
        }),

        keyboard::Key::Character(c) => {
            if let Some(digit) = c.chars().next().and_then(|ch| ch.to_digit(10)) {
                return SceneKey::from_digit(digit).map(Command::SelectScene);
            }
            match_char_key!(c, {
                "." => Command::Step,
                "r" => Command::Scene(SceneAction::Reset),
                "n" => Command::Scene(SceneAction::NextStage),
                "o" => Command::Scene(SceneAction::Observe),
                "h" => Command::Scene(SceneAction::Hadamard(0)),
                "j" => Command::Scene(SceneAction::Hadamard(1)),
                "e" => Command::Scene(SceneAction::Entangle),
                "m" => Command::Scene(SceneAction::Measure(0)),
                "g" => Command::Scene(SceneAction::CycleEventType),
                "b" => Command::Scene(SceneAction::ToggleShell),
                "+" => Command::Zoom(ZOOM_STEP),
                "=" => Command::Zoom(ZOOM_STEP),
                "-" => Command::Zoom(-ZOOM_STEP),
                "[" => Command::ScaleRate(0.5),
                "]" => Command::ScaleRate(2.0),
                "l" => Command::CycleLevel,
            })
        }

        _ => None,
    }
}

/// Zoom change for one wheel event; scrolling up zooms in.
pub fn wheel_zoom(delta: MouseScrollDelta) -> f32 {
    let notches = match delta {
        MouseScrollDelta::LineDelta(_, y) => y,
        MouseScrollDelta::PixelDelta(position) => position.y as f32 / PIXELS_PER_NOTCH,
    };
    notches * ZOOM_STEP
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{SceneContext, SceneParams};
    use crate::topic::Topic;
    use winit::dpi::PhysicalPosition;
    use winit::keyboard::Key;

    fn char_key(c: &str) -> Key {
        Key::Character(c.into())
    }

    /// Number row selects topics in catalogue order; zero is the fallback scene.
    #[test]
    fn test_digits_select_scenes() {
        assert_eq!(
            command_for_key(&char_key("1")),
            Some(Command::SelectScene(SceneKey::Topic(Topic::Astronomy)))
        );
        assert_eq!(
            command_for_key(&char_key("8")),
            Some(Command::SelectScene(SceneKey::Topic(Topic::Neuroscience)))
        );
        assert_eq!(
            command_for_key(&char_key("0")),
            Some(Command::SelectScene(SceneKey::Spacetime))
        );
        assert_eq!(command_for_key(&char_key("9")), None);
    }

    #[test]
    fn test_letters_are_case_insensitive() {
        assert_eq!(
            command_for_key(&char_key("R")),
            Some(Command::Scene(SceneAction::Reset))
        );
        assert_eq!(
            command_for_key(&char_key("j")),
            Some(Command::Scene(SceneAction::Hadamard(1)))
        );
        assert_eq!(command_for_key(&char_key("z")), None);
    }

    #[test]
    fn test_named_keys() {
        assert_eq!(
            command_for_key(&Key::Named(NamedKey::Space)),
            Some(Command::TogglePause)
        );
        assert_eq!(
            command_for_key(&Key::Named(NamedKey::Escape)),
            Some(Command::Quit)
        );
        assert_eq!(
            command_for_key(&Key::Named(NamedKey::Tab)),
            Some(Command::Scene(SceneAction::NextTunable))
        );
        assert_eq!(command_for_key(&Key::Named(NamedKey::Enter)), None);
    }

    fn press(context: &mut SceneContext, key: NamedKey) -> bool {
        match command_for_key(&Key::Named(key)) {
            Some(Command::Scene(action)) => context.apply(action),
            other => panic!("{key:?} mapped to {other:?}"),
        }
    }

    fn tunable(context: &SceneContext, index: usize) -> f32 {
        context.scene().tunables()[index].value
    }

    /// Tab picks a parameter and the arrows step it, clamped to the scene's range.
    #[test]
    fn test_arrows_tune_network() {
        let key = SceneKey::Topic(Topic::ArtificialIntelligence);
        let mut context = SceneContext::init(key, SceneParams::default(), Some(1));
        assert_eq!(context.tuning_label().as_deref(), Some("threshold 0.50"));

        assert!(press(&mut context, NamedKey::ArrowUp));
        assert!((tunable(&context, 0) - 0.55).abs() < 1e-5);

        assert!(press(&mut context, NamedKey::Tab));
        assert!(press(&mut context, NamedKey::Tab));
        assert_eq!(context.tuning_label().as_deref(), Some("dropout 0.10"));
        for _ in 0..20 {
            press(&mut context, NamedKey::ArrowUp);
        }
        assert_eq!(tunable(&context, 2), 0.6);
        for _ in 0..20 {
            press(&mut context, NamedKey::ArrowDown);
        }
        assert_eq!(tunable(&context, 2), 0.0);

        assert!(press(&mut context, NamedKey::Tab));
        assert!(context.tuning_label().unwrap_or_default().starts_with("threshold"));
    }

    /// Every scene with parameters exposes them to the arrow keys.
    #[test]
    fn test_arrows_reach_every_tunable_scene() {
        let cases = [
            (Topic::Neuroscience, "firing rate"),
            (Topic::QuantumComputing, "decoherence"),
            (Topic::ParticlePhysics, "field (T)"),
            (Topic::QuantumPhysics, "level n"),
        ];
        for (topic, name) in cases {
            let mut context =
                SceneContext::init(SceneKey::Topic(topic), SceneParams::default(), Some(2));
            let before = tunable(&context, 0);
            assert!(press(&mut context, NamedKey::ArrowUp), "{topic:?}");
            assert!(tunable(&context, 0) > before, "{topic:?}");
            assert!(context.tuning_label().unwrap_or_default().starts_with(name));
        }

        let mut solar =
            SceneContext::init(SceneKey::Topic(Topic::Astronomy), SceneParams::default(), Some(2));
        assert!(!press(&mut solar, NamedKey::ArrowUp));
        assert!(!press(&mut solar, NamedKey::Tab));
        assert_eq!(solar.tuning_label(), None);
    }

    /// One notch is one zoom step, whichever device produced it.
    #[test]
    fn test_wheel_zoom() {
        assert!((wheel_zoom(MouseScrollDelta::LineDelta(0.0, 1.0)) - ZOOM_STEP).abs() < 1e-6);
        assert!((wheel_zoom(MouseScrollDelta::LineDelta(0.0, -2.0)) + 2.0 * ZOOM_STEP).abs() < 1e-6);
        let pixels = MouseScrollDelta::PixelDelta(PhysicalPosition::new(0.0, 100.0));
        assert!((wheel_zoom(pixels) - 2.0 * ZOOM_STEP).abs() < 1e-6);
    }
}
