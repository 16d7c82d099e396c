//! Nearest-length reference selection.

use std::sync::Arc;

use super::{ReferenceCatalog, ReferenceError, ReferenceResult};
use crate::models::{word_count, ReferenceClip};

/// Picks the reference clip whose transcript length best matches a sentence.
#[derive(Debug, Clone)]
pub struct ReferenceSelector {
    catalog: Arc<ReferenceCatalog>,
}

impl ReferenceSelector {
    pub fn new(catalog: Arc<ReferenceCatalog>) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &ReferenceCatalog {
        &self.catalog
    }

    /// Select the clip minimizing `|words(sentence) - words(transcript)|`.
    ///
    /// Ties go to the earliest clip in catalog order.
    pub fn select(&self, sentence: &str) -> ReferenceResult<&ReferenceClip> {
        let target = word_count(sentence);

        let mut best: Option<(&ReferenceClip, usize)> = None;
        for clip in self.catalog.iter() {
            let distance = clip.word_count().abs_diff(target);
            match best {
                Some((_, best_distance)) if best_distance <= distance => {}
                _ => best = Some((clip, distance)),
            }
        }

        best.map(|(clip, _)| clip).ok_or(ReferenceError::EmptyCatalog)
    }
}
