//! Learning content for the HUD.
//!
//! Content is an external collaborator: the scenes never depend on it. A
//! [`ContentProvider`] returns display strings for a topic and level; the
//! [`ContentLoader`] runs it off the render thread and exposes only a
//! loading/ready/failed state that the HUD polls each frame.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use thiserror::Error;

use crate::topic::{Level, Topic};

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("content quota exhausted, try again shortly")]
    QuotaExhausted,

    #[error("content provider failed: {0}")]
    Provider(String),

    #[error("no content for {topic}/{level}")]
    NotFound { topic: String, level: String },

    #[error("failed to read content library: {0}")]
    Io(#[from] std::io::Error),

    #[error("content library is malformed: {0}")]
    Parse(#[from] serde_json::Error),
}

impl ContentError {
    /// Classifies a raw provider message.
    pub fn from_provider_message(message: &str) -> Self {
        let lower = message.to_lowercase();
        if lower.contains("quota") || lower.contains("429") || lower.contains("resource_exhausted") {
            ContentError::QuotaExhausted
        } else {
            ContentError::Provider(message.to_string())
        }
    }

    /// Short text for the error banner.
    pub fn banner(&self) -> String {
        match self {
            ContentError::QuotaExhausted => {
                "Content service is at capacity. Please wait a moment.".to_string()
            }
            other => format!("Content unavailable: {other}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubTopic {
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndustryUpdate {
    pub headline: String,
    pub summary: String,
    pub date: String,
}

/// Everything the HUD can show for one topic and level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningContent {
    pub title: String,
    pub introduction: String,
    #[serde(default)]
    pub key_points: Vec<String>,
    #[serde(default)]
    pub deep_dive: String,
    #[serde(default)]
    pub curated_sub_topics: Vec<SubTopic>,
    #[serde(default)]
    pub industry_updates: Vec<IndustryUpdate>,
    #[serde(default)]
    pub viz_prompt: String,
}

/// Source of learning content.
pub trait ContentProvider: Send + Sync {
    fn fetch(&self, topic: Topic, level: Level) -> Result<LearningContent, ContentError>;
}

/// Built-in text for every topic and level.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlaceholderProvider;

impl PlaceholderProvider {
    fn introduction(topic: Topic) -> &'static str {
        match topic {
            Topic::Astronomy => "The eight planets circle the Sun on nearly flat orbits.",
            Topic::Astrophysics => "Stars are born when cold gas clouds collapse under gravity.",
            Topic::Cosmology => "The universe grew from a hot dense state into a web of galaxies.",
            Topic::QuantumPhysics => "An electron has no single position until it is observed.",
            Topic::ParticlePhysics => "Colliders smash protons and reconstruct what flies out.",
            Topic::ArtificialIntelligence => "Neural networks pass signals through weighted layers.",
            Topic::QuantumComputing => "Qubits hold superpositions and can be entangled.",
            Topic::Neuroscience => "Neurons fire spikes that travel along a dense connectome.",
        }
    }

    fn viz_prompt(topic: Topic) -> &'static str {
        match topic {
            Topic::Astronomy => "Drag to orbit the system and click a planet to inspect it.",
            Topic::Astrophysics => "Press N to move from cloud to accretion disk to atmosphere.",
            Topic::Cosmology => "Press N to step through the cosmic epochs.",
            Topic::QuantumPhysics => "Press O to observe the electron and collapse its cloud.",
            Topic::ParticlePhysics => "Press G to change the event type and R to replay it.",
            Topic::ArtificialIntelligence => "Use Tab and the arrow keys to tune threshold, noise and dropout.",
            Topic::QuantumComputing => "Apply H, entangle with E, measure with M. Drag a qubit to move it.",
            Topic::Neuroscience => "Click a neuron to see its region and firing rate.",
        }
    }
}

impl ContentProvider for PlaceholderProvider {
    fn fetch(&self, topic: Topic, level: Level) -> Result<LearningContent, ContentError> {
        let name = topic.display_name();
        Ok(LearningContent {
            title: format!("{name}: {}", level.display_name()),
            introduction: Self::introduction(topic).to_string(),
            key_points: vec![
                format!("What {name} studies"),
                format!("Core models used in {name}"),
                format!("Open questions in {name}"),
            ],
            deep_dive: String::new(),
            curated_sub_topics: Vec::new(),
            industry_updates: Vec::new(),
            viz_prompt: Self::viz_prompt(topic).to_string(),
        })
    }
}

/// One library value: content, or the message a provider failed with when the
/// library was exported.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum LibraryEntry {
    Content(LearningContent),
    Failure { error: String },
}

/// Content read from a JSON file keyed `"<Topic>/<Level>"`, e.g.
/// `"Quantum Physics/Advanced"`.
///
/// An entry of the form `{"error": "..."}` replays a provider failure.
#[derive(Debug, Clone, Default)]
pub struct LibraryProvider {
    entries: HashMap<String, LibraryEntry>,
}

impl LibraryProvider {
    pub fn key(topic: Topic, level: Level) -> String {
        format!("{}/{}", topic.display_name(), level.display_name())
    }

    pub fn from_json_str(json: &str) -> Result<Self, ContentError> {
        Ok(Self {
            entries: serde_json::from_str(json)?,
        })
    }

    pub fn from_path(path: &Path) -> Result<Self, ContentError> {
        let text = std::fs::read_to_string(path)?;
        let library = Self::from_json_str(&text)?;
        log::info!(
            "content library loaded from {} ({} entries)",
            path.display(),
            library.len()
        );
        Ok(library)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ContentProvider for LibraryProvider {
    fn fetch(&self, topic: Topic, level: Level) -> Result<LearningContent, ContentError> {
        match self.entries.get(&Self::key(topic, level)) {
            Some(LibraryEntry::Content(content)) => Ok(content.clone()),
            Some(LibraryEntry::Failure { error }) => {
                Err(ContentError::from_provider_message(error))
            }
            None => Err(ContentError::NotFound {
                topic: topic.display_name().to_string(),
                level: level.display_name().to_string(),
            }),
        }
    }
}

/// What the HUD shows in the content area.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentState {
    Idle,
    Loading,
    Ready(LearningContent),
    Failed(String),
}

type Delivery = (u64, Result<LearningContent, ContentError>);

/// Runs provider fetches on worker threads and keeps only the latest result.
pub struct ContentLoader {
    provider: Arc<dyn ContentProvider>,
    sender: Sender<Delivery>,
    receiver: Receiver<Delivery>,
    generation: u64,
    state: ContentState,
}

impl ContentLoader {
    pub fn new(provider: Arc<dyn ContentProvider>) -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            provider,
            sender,
            receiver,
            generation: 0,
            state: ContentState::Idle,
        }
    }

    /// Starts a fetch. Any result from an earlier request is discarded.
    pub fn request(&mut self, topic: Topic, level: Level) {
        self.generation += 1;
        self.state = ContentState::Loading;

        let generation = self.generation;
        let provider = Arc::clone(&self.provider);
        let sender = self.sender.clone();
        let spawned = std::thread::Builder::new()
            .name("content-fetch".to_string())
            .spawn(move || {
                let result = provider.fetch(topic, level);
                let _ = sender.send((generation, result));
            });
        if let Err(err) = spawned {
            log::error!("could not start content fetch: {err}");
            self.state = ContentState::Failed(ContentError::Io(err).banner());
        }
    }

    /// Drains finished fetches without blocking and returns the current state.
    pub fn poll(&mut self) -> &ContentState {
        while let Ok((generation, result)) = self.receiver.try_recv() {
            if generation != self.generation {
                log::debug!("discarding stale content result #{generation}");
                continue;
            }
            self.state = match result {
                Ok(content) => {
                    log::info!("content ready: {}", content.title);
                    ContentState::Ready(content)
                }
                Err(err) => {
                    log::warn!("content failed: {err}");
                    ContentState::Failed(err.banner())
                }
            };
        }
        &self.state
    }

    pub fn state(&self) -> &ContentState {
        &self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    #[test]
    fn test_error_classification() {
        assert!(matches!(
            ContentError::from_provider_message("429 Too Many Requests"),
            ContentError::QuotaExhausted
        ));
        assert!(matches!(
            ContentError::from_provider_message("RESOURCE_EXHAUSTED: daily limit"),
            ContentError::QuotaExhausted
        ));
        assert!(matches!(
            ContentError::from_provider_message("connection reset"),
            ContentError::Provider(_)
        ));
    }

    /// Every topic and level has placeholder text.
    #[test]
    fn test_placeholder_complete() {
        let provider = PlaceholderProvider;
        for topic in Topic::ALL {
            for level in [Level::Beginner, Level::Intermediate, Level::Advanced] {
                let content = provider.fetch(topic, level).expect("placeholder");
                assert!(content.title.contains(topic.display_name()));
                assert!(!content.introduction.is_empty());
            }
        }
    }

    #[test]
    fn test_library_lookup() {
        let library = LibraryProvider::from_json_str(
            r#"{"Quantum Physics/Advanced": {"title": "Decoherence", "introduction": "Why the cat is not both."}}"#,
        )
        .expect("parses");
        let hit = library
            .fetch(Topic::QuantumPhysics, Level::Advanced)
            .expect("present");
        assert_eq!(hit.title, "Decoherence");
        assert!(hit.key_points.is_empty());
        assert!(matches!(
            library.fetch(Topic::Cosmology, Level::Advanced),
            Err(ContentError::NotFound { .. })
        ));
    }

    /// Recorded failures are classified like live provider messages.
    #[test]
    fn test_library_replays_failures() {
        let library = LibraryProvider::from_json_str(
            r#"{
                "Cosmology/Beginner": {"error": "429 Too Many Requests"},
                "Cosmology/Advanced": {"error": "upstream timeout"}
            }"#,
        )
        .expect("parses");
        assert_eq!(library.len(), 2);
        let quota = library
            .fetch(Topic::Cosmology, Level::Beginner)
            .expect_err("recorded failure");
        assert!(matches!(quota, ContentError::QuotaExhausted));
        assert!(quota.banner().contains("capacity"));
        assert!(matches!(
            library.fetch(Topic::Cosmology, Level::Advanced),
            Err(ContentError::Provider(message)) if message == "upstream timeout"
        ));
    }

    fn wait_settled(loader: &mut ContentLoader) -> ContentState {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if !matches!(loader.poll(), ContentState::Loading) {
                break;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        std::thread::sleep(Duration::from_millis(20));
        loader.poll().clone()
    }

    /// Only the latest request's result is shown.
    #[test]
    fn test_loader_discards_stale() {
        let mut loader = ContentLoader::new(Arc::new(PlaceholderProvider));
        assert_eq!(loader.state(), &ContentState::Idle);
        loader.request(Topic::Astronomy, Level::Beginner);
        loader.request(Topic::Neuroscience, Level::Advanced);
        match wait_settled(&mut loader) {
            ContentState::Ready(content) => assert!(content.title.starts_with("Neuroscience")),
            other => panic!("unexpected state {other:?}"),
        }
    }

    /// Provider failures become a banner, never a panic.
    #[test]
    fn test_loader_failure_banner() {
        let mut loader = ContentLoader::new(Arc::new(LibraryProvider::default()));
        loader.request(Topic::Cosmology, Level::Beginner);
        match wait_settled(&mut loader) {
            ContentState::Failed(banner) => assert!(banner.contains("Cosmology")),
            other => panic!("unexpected state {other:?}"),
        }
    }
}
