//! Reference catalog loading.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::{ReferenceError, ReferenceResult};
use crate::models::ReferenceClip;

#[derive(Debug, Deserialize)]
struct CatalogFile {
    references: CatalogReferences,
}

/// `references` is either a list of entries or an object keyed by id.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CatalogReferences {
    List(Vec<CatalogEntry>),
    Keyed(serde_json::Map<String, serde_json::Value>),
}

#[derive(Debug, Deserialize)]
struct CatalogEntry {
    id: String,
    text: String,
    audio: PathBuf,
}

/// Entry of the keyed form; audio defaults to `<id>.wav`.
#[derive(Debug, Deserialize)]
struct KeyedEntry {
    text: String,
    #[serde(default)]
    audio: Option<PathBuf>,
}

impl CatalogReferences {
    /// Entries in file order.
    fn into_entries(self) -> Result<Vec<CatalogEntry>, serde_json::Error> {
        match self {
            CatalogReferences::List(entries) => Ok(entries),
            CatalogReferences::Keyed(map) => map
                .into_iter()
                .map(|(id, value)| {
                    let entry: KeyedEntry = serde_json::from_value(value)?;
                    let audio = entry
                        .audio
                        .unwrap_or_else(|| PathBuf::from(format!("{}.wav", id)));
                    Ok(CatalogEntry {
                        id,
                        text: entry.text,
                        audio,
                    })
                })
                .collect(),
        }
    }
}

/// Immutable, insertion-ordered set of reference clips.
///
/// Insertion order is the tie-break order used by [`ReferenceSelector`].
///
/// [`ReferenceSelector`]: super::ReferenceSelector
#[derive(Debug, Clone, Default)]
pub struct ReferenceCatalog {
    clips: Vec<ReferenceClip>,
}

impl ReferenceCatalog {
    /// Build a catalog from clips, rejecting duplicate ids and empty transcripts.
    pub fn from_clips(clips: Vec<ReferenceClip>) -> ReferenceResult<Self> {
        let mut seen = HashSet::new();
        for clip in &clips {
            if !seen.insert(clip.id.as_str()) {
                return Err(ReferenceError::DuplicateId(clip.id.clone()));
            }
            if clip.word_count() == 0 {
                return Err(ReferenceError::EmptyTranscript(clip.id.clone()));
            }
        }
        Ok(Self { clips })
    }

    /// Load a catalog JSON file.
    ///
    /// `references` may be a list of `{id, text, audio}` objects or an
    /// object mapping each id to `{text, audio?}`. Relative audio paths resolve against the catalog file's directory.
    /// Every referenced audio file must exist.
    pub fn load(path: &Path) -> ReferenceResult<Self> {
        let content = fs::read_to_string(path).map_err(|source| ReferenceError::ReadFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let entries = serde_json::from_str::<CatalogFile>(&content)
            .and_then(|file| file.references.into_entries())
            .map_err(|source| ReferenceError::ParseFailed {
                path: path.to_path_buf(),
                source,
            })?;

        let base = path.parent().unwrap_or_else(|| Path::new(""));
        let mut clips = Vec::with_capacity(entries.len());
        for entry in entries {
            let audio = if entry.audio.is_absolute() {
                entry.audio
            } else {
                base.join(entry.audio)
            };
            if !audio.exists() {
                return Err(ReferenceError::AudioMissing {
                    id: entry.id,
                    path: audio,
                });
            }
            clips.push(ReferenceClip::new(entry.id, entry.text, audio));
        }

        let catalog = Self::from_clips(clips)?;
        tracing::info!(
            "Loaded {} reference clips from {}",
            catalog.len(),
            path.display()
        );
        Ok(catalog)
    }

    pub fn get(&self, id: &str) -> Option<&ReferenceClip> {
        self.clips.iter().find(|c| c.id == id)
    }

    /// Clips in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &ReferenceClip> {
        self.clips.iter()
    }

    pub fn len(&self) -> usize {
        self.clips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }
}
