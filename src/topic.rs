//! Topic, level and scene selection keys.

use serde::{Deserialize, Serialize};

/// Subject areas with a dedicated scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Topic {
    Astronomy,
    Astrophysics,
    Cosmology,
    QuantumPhysics,
    ParticlePhysics,
    ArtificialIntelligence,
    QuantumComputing,
    Neuroscience,
}

impl Topic {
    pub const ALL: [Topic; 8] = [
        Topic::Astronomy,
        Topic::Astrophysics,
        Topic::Cosmology,
        Topic::QuantumPhysics,
        Topic::ParticlePhysics,
        Topic::ArtificialIntelligence,
        Topic::QuantumComputing,
        Topic::Neuroscience,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            Topic::Astronomy => "Astronomy",
            Topic::Astrophysics => "Astrophysics",
            Topic::Cosmology => "Cosmology",
            Topic::QuantumPhysics => "Quantum Physics",
            Topic::ParticlePhysics => "Particle Physics",
            Topic::ArtificialIntelligence => "Artificial Intelligence",
            Topic::QuantumComputing => "Quantum Computing",
            Topic::Neuroscience => "Neuroscience",
        }
    }
}

/// Depth of the accompanying content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Level {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
}

impl Level {
    pub fn display_name(&self) -> &'static str {
        match self {
            Level::Beginner => "Beginner",
            Level::Intermediate => "Intermediate",
            Level::Advanced => "Advanced",
        }
    }

    pub fn next(self) -> Self {
        match self {
            Level::Beginner => Level::Intermediate,
            Level::Intermediate => Level::Advanced,
            Level::Advanced => Level::Beginner,
        }
    }
}

/// Selects exactly one scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SceneKey {
    Topic(Topic),
    /// General-relativity scene used when no topic scene applies.
    #[default]
    Spacetime,
}

impl SceneKey {
    /// Topic used for content lookup; the fallback scene borrows Astrophysics.
    pub fn topic(&self) -> Topic {
        match self {
            SceneKey::Topic(topic) => *topic,
            SceneKey::Spacetime => Topic::Astrophysics,
        }
    }

    /// Maps number-row digits: `1`-`8` to topics, `0` to the fallback.
    pub fn from_digit(digit: u32) -> Option<Self> {
        match digit {
            0 => Some(SceneKey::Spacetime),
            1..=8 => Some(SceneKey::Topic(Topic::ALL[digit as usize - 1])),
            _ => None,
        }
    }
}
