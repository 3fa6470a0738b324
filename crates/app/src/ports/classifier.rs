//! Image classifier port — the cat detector.

use std::future::Future;

use catpoint_domain::error::CatpointError;
use catpoint_domain::image::Image;

/// Decides whether a camera frame shows a cat.
pub trait ImageClassifier {
    /// Return `true` when `image` contains a cat with at least
    /// `confidence_threshold` percent confidence.
    fn classify_contains_cat(
        &self,
        image: &Image,
        confidence_threshold: f32,
    ) -> impl Future<Output = Result<bool, CatpointError>> + Send;
}

impl<T: ImageClassifier + Send + Sync> ImageClassifier for std::sync::Arc<T> {
    fn classify_contains_cat(
        &self,
        image: &Image,
        confidence_threshold: f32,
    ) -> impl Future<Output = Result<bool, CatpointError>> + Send {
        (**self).classify_contains_cat(image, confidence_threshold)
    }
}
