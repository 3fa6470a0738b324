//! # catpoint-adapter-fake-classifier
//!
//! Stand-in for a real image-recognition model, used until one is wired in.
//!
//! ## Modes
//!
//! | Mode | Config value | Behaviour |
//! |------|--------------|-----------|
//! | [`ClassifierMode::Random`] | `random` | Draws a confidence in `0..100` and reports a cat when it reaches the threshold |
//! | [`ClassifierMode::AlwaysCat`] | `cat` | Every non-empty image contains a cat |
//! | [`ClassifierMode::NeverCat`] | `no_cat` | No image contains a cat |
//!
//! Empty images never contain a cat, whatever the mode.
//!
//! ## Dependency rule
//!
//! Depends on `catpoint-app` (port traits) and `catpoint-domain` only.

use std::fmt;
use std::future::Future;
use std::str::FromStr;

use rand::Rng;

use catpoint_app::ports::ImageClassifier;
use catpoint_domain::error::CatpointError;
use catpoint_domain::image::Image;

/// How the fake classifier answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClassifierMode {
    #[default]
    Random,
    AlwaysCat,
    NeverCat,
}

impl fmt::Display for ClassifierMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Random => f.write_str("random"),
            Self::AlwaysCat => f.write_str("cat"),
            Self::NeverCat => f.write_str("no_cat"),
        }
    }
}

/// Returned when a mode name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown classifier mode `{0}` (expected random, cat or no_cat)")]
pub struct UnknownModeError(pub String);

impl FromStr for ClassifierMode {
    type Err = UnknownModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "random" => Ok(Self::Random),
            "cat" => Ok(Self::AlwaysCat),
            "no_cat" => Ok(Self::NeverCat),
            other => Err(UnknownModeError(other.to_string())),
        }
    }
}

/// Image classifier that never looks at the pixels.
#[derive(Debug, Clone, Default)]
pub struct FakeImageClassifier {
    mode: ClassifierMode,
}

impl FakeImageClassifier {
    #[must_use]
    pub fn new(mode: ClassifierMode) -> Self {
        Self { mode }
    }

    #[must_use]
    pub fn mode(&self) -> ClassifierMode {
        self.mode
    }

    fn decide(&self, image: &Image, confidence_threshold: f32) -> bool {
        if image.is_empty() {
            return false;
        }
        match self.mode {
            ClassifierMode::Random => {
                let confidence: f32 = rand::thread_rng().gen_range(0.0..100.0);
                confidence >= confidence_threshold
            }
            ClassifierMode::AlwaysCat => true,
            ClassifierMode::NeverCat => false,
        }
    }
}

impl ImageClassifier for FakeImageClassifier {
    fn classify_contains_cat(
        &self,
        image: &Image,
        confidence_threshold: f32,
    ) -> impl Future<Output = Result<bool, CatpointError>> + Send {
        let cat = self.decide(image, confidence_threshold);
        tracing::debug!(mode = %self.mode, cat, "fake classification");
        async move { Ok(cat) }
    }
}
