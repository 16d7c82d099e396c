//! Sentence synthesizer: split, voice each sentence, stitch.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::engine::{TtsEngine, TtsRequest};
use super::sentences::split_sentences;
use super::{wav, SynthesisError};
use crate::models::{ReferenceClip, ReferenceOverride};
use crate::references::ReferenceSelector;

/// File name of the combined waveform inside the output directory.
pub const COMBINED_AUDIO_FILE: &str = "generated_audio.wav";

/// Directory (under the output directory) holding per-sentence waveforms.
const CHUNKS_DIR: &str = "sentence_chunks";

/// One scheduled sentence.
#[derive(Debug, Clone)]
pub struct SentenceChunk {
    pub index: usize,
    pub text: String,
    pub reference: ReferenceClip,
    pub audio_path: PathBuf,
}

/// Output of a successful synthesis.
#[derive(Debug, Clone)]
pub struct SynthesisResult {
    pub combined_audio_path: PathBuf,
    pub sentence_count: usize,
    /// Wall time spent inside the engine.
    pub total_synthesis_time: Duration,
    /// Length of the combined audio.
    pub duration_secs: f64,
    /// Reference clip id used for each sentence, in order.
    pub references_used: Vec<String>,
}

/// Voices text sentence by sentence through a [`TtsEngine`].
pub struct SentenceSynthesizer {
    engine: Arc<dyn TtsEngine>,
    selector: ReferenceSelector,
    speed: f32,
}

impl SentenceSynthesizer {
    pub fn new(engine: Arc<dyn TtsEngine>, selector: ReferenceSelector) -> Self {
        Self {
            engine,
            selector,
            speed: 1.0,
        }
    }

    pub fn with_speed(mut self, speed: f32) -> Self {
        self.speed = speed;
        self
    }

    /// Synthesize `text` choosing a catalog reference per sentence.
    pub fn synthesize(&self, text: &str, output_dir: &Path) -> Result<SynthesisResult, SynthesisError> {
        self.synthesize_with(text, output_dir, None)
    }

    /// Synthesize `text`; a reference override applies to every sentence.
    ///
    /// Engine calls run strictly in sentence order. Any sentence failure
    /// aborts the whole synthesis and no combined file is left behind.
    pub fn synthesize_with(
        &self,
        text: &str,
        output_dir: &Path,
        reference_override: Option<&ReferenceOverride>,
    ) -> Result<SynthesisResult, SynthesisError> {
        let sentences = split_sentences(text);
        if sentences.is_empty() {
            return Err(SynthesisError::NoSentences);
        }

        let chunks_dir = output_dir.join(CHUNKS_DIR);
        fs::create_dir_all(&chunks_dir)
            .map_err(|e| SynthesisError::io("creating sentence directory", e))?;

        let result = self.run_sentences(&sentences, &chunks_dir, reference_override);
        let chunks = match result {
            Ok(chunks) => chunks,
            Err(e) => {
                remove_dir_best_effort(&chunks_dir);
                return Err(e);
            }
        };

        let combined_audio_path = output_dir.join(COMBINED_AUDIO_FILE);
        let inputs: Vec<PathBuf> = chunks.iter().map(|c| c.audio_path.clone()).collect();
        let summary = match wav::concatenate(&inputs, &combined_audio_path) {
            Ok(summary) => summary,
            Err(e) => {
                let _ = fs::remove_file(&combined_audio_path);
                remove_dir_best_effort(&chunks_dir);
                return Err(e);
            }
        };

        remove_dir_best_effort(&chunks_dir);

        let total_synthesis_time = self.elapsed_total(&chunks);
        tracing::info!(
            "Combined {} sentences into {} ({:.2}s of audio)",
            chunks.len(),
            combined_audio_path.display(),
            summary.duration_secs()
        );

        Ok(SynthesisResult {
            combined_audio_path,
            sentence_count: chunks.len(),
            total_synthesis_time,
            duration_secs: summary.duration_secs(),
            references_used: chunks.into_iter().map(|c| c.chunk.reference.id).collect(),
        })
    }

    fn run_sentences(
        &self,
        sentences: &[String],
        chunks_dir: &Path,
        reference_override: Option<&ReferenceOverride>,
    ) -> Result<Vec<TimedChunk>, SynthesisError> {
        let mut chunks = Vec::with_capacity(sentences.len());

        for (index, sentence) in sentences.iter().enumerate() {
            let reference = match reference_override {
                Some(o) => ReferenceClip::new("override", o.transcript.clone(), o.audio_path.clone()),
                None => self.selector.select(sentence)?.clone(),
            };

            tracing::info!(
                "Synthesizing sentence {}/{} with reference '{}': {}",
                index + 1,
                sentences.len(),
                reference.id,
                sentence
            );

            let sentence_dir = chunks_dir.join(index.to_string());
            fs::create_dir_all(&sentence_dir)
                .map_err(|e| SynthesisError::io("creating sentence directory", e))?;

            let request = TtsRequest {
                text: sentence,
                reference_audio: Some(&reference.audio_path),
                reference_text: Some(&reference.transcript),
                speed: self.speed,
                output_dir: &sentence_dir,
            };

            let started = Instant::now();
            let audio_path = self
                .engine
                .synthesize(&request)
                .map_err(|source| SynthesisError::SentenceFailed {
                    index,
                    sentence: sentence.clone(),
                    source,
                })?;
            let elapsed = started.elapsed();
            tracing::debug!("Sentence {} took {:.2}s", index + 1, elapsed.as_secs_f64());

            chunks.push(TimedChunk {
                chunk: SentenceChunk {
                    index,
                    text: sentence.clone(),
                    reference,
                    audio_path,
                },
                elapsed,
            });
        }

        Ok(chunks)
    }

    fn elapsed_total(&self, chunks: &[TimedChunk]) -> Duration {
        chunks.iter().map(|c| c.elapsed).sum()
    }
}

struct TimedChunk {
    chunk: SentenceChunk,
    elapsed: Duration,
}

impl std::ops::Deref for TimedChunk {
    type Target = SentenceChunk;

    fn deref(&self) -> &SentenceChunk {
        &self.chunk
    }
}

fn remove_dir_best_effort(dir: &Path) {
    if let Err(e) = fs::remove_dir_all(dir) {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!("Failed to remove {}: {}", dir.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::references::ReferenceCatalog;
    use crate::testing::ToneTtsEngine;
    use hound::WavReader;
    use tempfile::tempdir;

    fn selector() -> ReferenceSelector {
        let clips = vec![
            ReferenceClip::new("two", "aa bb", "two.wav"),
            ReferenceClip::new("five", "aa bb cc dd ee", "five.wav"),
        ];
        ReferenceSelector::new(Arc::new(ReferenceCatalog::from_clips(clips).unwrap()))
    }

    fn combined_samples(path: &Path) -> Vec<i16> {
        WavReader::open(path)
            .unwrap()
            .samples::<i16>()
            .map(|s| s.unwrap())
            .collect()
    }

    #[test]
    fn segments_follow_sentence_order() {
        let dir = tempdir().unwrap();
        let engine = Arc::new(ToneTtsEngine::new(1000));
        let synth = SentenceSynthesizer::new(engine.clone(), selector());

        let result = synth
            .synthesize("One two. Three four five six! Seven?", dir.path())
            .unwrap();

        assert_eq!(result.sentence_count, 3);
        assert_eq!(result.references_used, vec!["two", "five", "two"]);

        // Each call writes samples equal to its 1-based call number
        let samples = combined_samples(&result.combined_audio_path);
        let mut order: Vec<i16> = samples.clone();
        order.dedup();
        assert_eq!(order, vec![1, 2, 3]);
        assert!((result.duration_secs - samples.len() as f64 / 1000.0).abs() < 1e-9);

        let texts: Vec<String> = engine.calls().into_iter().map(|c| c.text).collect();
        assert_eq!(texts, vec!["One two.", "Three four five six!", "Seven?"]);
    }

    #[test]
    fn per_sentence_files_are_removed() {
        let dir = tempdir().unwrap();
        let synth = SentenceSynthesizer::new(Arc::new(ToneTtsEngine::new(1000)), selector());

        synth.synthesize("Hello there. How are you?", dir.path()).unwrap();

        assert!(dir.path().join(COMBINED_AUDIO_FILE).exists());
        assert!(!dir.path().join("sentence_chunks").exists());
    }

    #[test]
    fn override_applies_to_all_sentences() {
        let dir = tempdir().unwrap();
        let engine = Arc::new(ToneTtsEngine::new(1000));
        let synth = SentenceSynthesizer::new(engine.clone(), selector()).with_speed(0.8);
        let custom = ReferenceOverride::new("my_voice.wav", "my transcript");

        let result = synth
            .synthesize_with("First. Second one here.", dir.path(), Some(&custom))
            .unwrap();

        assert_eq!(result.references_used, vec!["override", "override"]);
        for call in engine.calls() {
            assert_eq!(call.reference_audio.as_deref(), Some(Path::new("my_voice.wav")));
            assert_eq!(call.reference_text.as_deref(), Some("my transcript"));
            assert_eq!(call.speed, 0.8);
        }
    }

    #[test]
    fn failure_aborts_without_combined_audio() {
        let dir = tempdir().unwrap();
        let engine = Arc::new(ToneTtsEngine::new(1000).failing_on_call(2));
        let synth = SentenceSynthesizer::new(engine.clone(), selector());

        let err = synth
            .synthesize("One. Two. Three.", dir.path())
            .unwrap_err();

        match &err {
            SynthesisError::SentenceFailed { index, sentence, .. } => {
                assert_eq!(*index, 1);
                assert_eq!(sentence, "Two.");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(err.diagnostic().unwrap().contains("scripted failure"));
        // Third sentence never reached the engine
        assert_eq!(engine.calls().len(), 2);
        assert!(!dir.path().join(COMBINED_AUDIO_FILE).exists());
        assert!(!dir.path().join("sentence_chunks").exists());
    }

    #[test]
    fn missing_output_is_reported() {
        let dir = tempdir().unwrap();
        let engine = Arc::new(ToneTtsEngine::new(1000).silent_on_call(1));
        let synth = SentenceSynthesizer::new(engine, selector());

        let err = synth.synthesize("Only one.", dir.path()).unwrap_err();
        assert!(matches!(
            err,
            SynthesisError::SentenceFailed {
                source: crate::synthesis::TtsError::OutputMissing { .. },
                ..
            }
        ));
    }

    #[test]
    fn empty_text_is_rejected() {
        let dir = tempdir().unwrap();
        let synth = SentenceSynthesizer::new(Arc::new(ToneTtsEngine::new(1000)), selector());
        assert!(matches!(
            synth.synthesize("   ", dir.path()),
            Err(SynthesisError::NoSentences)
        ));
    }

    #[test]
    fn empty_catalog_fails_selection() {
        let dir = tempdir().unwrap();
        let selector = ReferenceSelector::new(Arc::new(ReferenceCatalog::default()));
        let synth = SentenceSynthesizer::new(Arc::new(ToneTtsEngine::new(1000)), selector);

        assert!(matches!(
            synth.synthesize("Hello.", dir.path()),
            Err(SynthesisError::Reference(_))
        ));
    }
}
