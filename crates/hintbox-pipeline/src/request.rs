//! Mutation requests.
//!
//! Callers collect every pending edit into a [`MutationBatch`] before the
//! pipeline runs. Execution order is fixed by pipeline stage, never by the
//! order requests were supplied; within one stage, requests of that stage's
//! kind apply in supply order.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use hintbox_core::{Error, HintParams, Result, TrackId};
use hintbox_store::CryptSpec;

/// Upper bound on requests of any single kind per invocation.
pub const MAX_REQUESTS_PER_KIND: usize = 20;

/// Which track(s) an edit applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrackSelector {
    Id(TrackId),
    All,
}

/// One per-track edit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TrackEdit {
    Remove(TrackId),
    SetLanguage {
        target: TrackSelector,
        code: String,
    },
    /// Start delay in milliseconds; zero clears any existing edit list.
    SetDelay {
        track: TrackId,
        delay_ms: u32,
    },
    /// Applied only to tracks already protected.
    SetKmsUri {
        target: TrackSelector,
        uri: String,
    },
}

/// One metadata-store edit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum MetaEdit {
    SetType {
        scope: MetaScopeSpec,
        meta_type: Option<[u8; 4]>,
    },
    AddItem {
        scope: MetaScopeSpec,
        name: String,
        mime_type: String,
        data: Option<Vec<u8>>,
    },
    RemoveItem {
        scope: MetaScopeSpec,
        item: u32,
    },
    SetPrimaryItem {
        scope: MetaScopeSpec,
        item: u32,
    },
    SetXml {
        scope: MetaScopeSpec,
        xml: Vec<u8>,
        binary: bool,
    },
    RemoveXml {
        scope: MetaScopeSpec,
    },
}

/// Serializable counterpart of the store's meta scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MetaScopeSpec {
    File,
    Movie,
    Track(TrackId),
}

/// Container conversion directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConvertKind {
    Isma { renumber_es_ids: bool },
    ThreeGp,
}

/// Protection directive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CryptAction {
    Encrypt(CryptSpec),
    Decrypt,
}

/// An SDP line injected at session finalize.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SdpLine {
    Session(String),
    Track { track: TrackId, line: String },
}

/// All pending edits for one pipeline invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MutationBatch {
    /// Sources ingested through the media importer, in request order.
    pub sources: Vec<PathBuf>,
    /// Movies whose tracks are concatenated onto the input, in request order.
    pub concat_sources: Vec<PathBuf>,
    pub track_edits: Vec<TrackEdit>,
    pub meta_edits: Vec<MetaEdit>,
    pub sdp_lines: Vec<SdpLine>,
    pub add_brands: Vec<String>,
    pub remove_brands: Vec<String>,
    pub copyrights: Vec<(String, String)>,
    pub chapters: Vec<(u64, String)>,
    /// Chapter text file parsed during session finalization.
    pub chapter_file: Option<PathBuf>,
    pub convert: Option<ConvertKind>,
    pub crypt: Option<CryptAction>,
    pub hint: Option<HintParams>,
    /// Fragment duration in seconds; mutually exclusive with hinting.
    pub fragment_seconds: Option<f64>,
    /// Preserve scene/OD tracks after ingest.
    pub keep_system_tracks: bool,
    /// Strip system tracks even without any ingest.
    pub remove_system_tracks: bool,
    pub remove_hint_tracks: bool,
    /// Rewrite clock references onto a shared root-OD systems track.
    pub sync_clock_references: bool,
    /// Request flat storage.
    pub flat_storage: bool,
    /// Request tight (sample-based) interleaving after hinting.
    pub full_interleave: bool,
    /// Interleave window in milliseconds; zero selects streamable layout.
    pub interleave_window_ms: u32,
    pub output: Option<PathBuf>,
}

impl Default for MutationBatch {
    fn default() -> Self {
        Self {
            sources: Vec::new(),
            concat_sources: Vec::new(),
            track_edits: Vec::new(),
            meta_edits: Vec::new(),
            sdp_lines: Vec::new(),
            add_brands: Vec::new(),
            remove_brands: Vec::new(),
            copyrights: Vec::new(),
            chapters: Vec::new(),
            chapter_file: None,
            convert: None,
            crypt: None,
            hint: None,
            fragment_seconds: None,
            keep_system_tracks: false,
            remove_system_tracks: false,
            remove_hint_tracks: false,
            sync_clock_references: false,
            flat_storage: false,
            full_interleave: false,
            interleave_window_ms: 500,
            output: None,
        }
    }
}

impl MutationBatch {
    /// Validate request ceilings and cross-request consistency.
    pub fn validate(&self) -> Result<()> {
        let kinds: [(&str, usize); 8] = [
            ("source", self.sources.len()),
            ("concatenation", self.concat_sources.len()),
            ("track edit", self.track_edits.len()),
            ("meta edit", self.meta_edits.len()),
            ("sdp line", self.sdp_lines.len()),
            ("brand", self.add_brands.len() + self.remove_brands.len()),
            ("copyright", self.copyrights.len()),
            ("chapter", self.chapters.len()),
        ];
        for (kind, count) in kinds {
            if count > MAX_REQUESTS_PER_KIND {
                return Err(Error::InvalidRequest(format!(
                    "{count} {kind} requests exceed the limit of {MAX_REQUESTS_PER_KIND}"
                )));
            }
        }
        for edit in &self.track_edits {
            if let TrackEdit::SetLanguage { code, .. } = edit {
                if code.len() != 3 {
                    return Err(Error::InvalidRequest(format!(
                        "language code {code:?} is not 3 characters"
                    )));
                }
            }
        }
        if self.keep_system_tracks && self.remove_system_tracks {
            return Err(Error::InvalidRequest(
                "cannot both keep and remove system tracks".into(),
            ));
        }
        Ok(())
    }

    /// Whether anything at all was requested.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
            && self.concat_sources.is_empty()
            && self.track_edits.is_empty()
            && self.meta_edits.is_empty()
            && self.sdp_lines.is_empty()
            && self.add_brands.is_empty()
            && self.remove_brands.is_empty()
            && self.copyrights.is_empty()
            && self.chapters.is_empty()
            && self.chapter_file.is_none()
            && self.convert.is_none()
            && self.crypt.is_none()
            && self.hint.is_none()
            && self.fragment_seconds.is_none()
            && !self.remove_system_tracks
            && !self.remove_hint_tracks
            && !self.sync_clock_references
    }
}

/// Parses a chapter text file into `(start_ms, title)` pairs.
///
/// Each chapter occupies one line of the form `HH:MM:SS.mmm Title`. Blank
/// lines and lines starting with `#` are skipped. Entries must be in
/// ascending start order.
pub fn chapters_from_file(path: &Path) -> Result<Vec<(u64, String)>> {
    let text = fs::read_to_string(path)?;
    let mut chapters = Vec::new();
    let mut last_start = None;
    for (lineno, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let (stamp, title) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let start_ms = parse_timestamp_ms(stamp).ok_or_else(|| {
            Error::InvalidRequest(format!(
                "bad chapter timestamp {:?} on line {}",
                stamp,
                lineno + 1
            ))
        })?;
        if last_start.is_some_and(|prev| start_ms <= prev) {
            return Err(Error::InvalidRequest(format!(
                "chapter on line {} does not start after the previous one",
                lineno + 1
            )));
        }
        last_start = Some(start_ms);
        let title = title.trim();
        let title = if title.is_empty() {
            format!("Chapter {}", chapters.len() + 1)
        } else {
            title.to_owned()
        };
        chapters.push((start_ms, title));
    }
    Ok(chapters)
}

fn parse_timestamp_ms(stamp: &str) -> Option<u64> {
    let (clock, millis) = match stamp.split_once('.') {
        Some((clock, frac)) => {
            if frac.is_empty() || frac.len() > 3 || !frac.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            // "5" means 500ms, "05" means 50ms.
            let scale = 10u64.pow(3 - frac.len() as u32);
            (clock, frac.parse::<u64>().ok()? * scale)
        }
        None => (stamp, 0),
    };
    let mut parts = clock.split(':').rev();
    let seconds: u64 = parts.next()?.parse().ok()?;
    let minutes: u64 = parts.next().map_or(Ok(0), str::parse).ok()?;
    let hours: u64 = parts.next().map_or(Ok(0), str::parse).ok()?;
    if parts.next().is_some() || seconds >= 60 || minutes >= 60 {
        return None;
    }
    Some(((hours * 60 + minutes) * 60 + seconds) * 1000 + millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_batch_validates() {
        let batch = MutationBatch::default();
        assert!(batch.validate().is_ok());
        assert!(batch.is_empty());
    }

    #[test]
    fn per_kind_ceiling_is_enforced() {
        let mut batch = MutationBatch::default();
        for n in 0..=MAX_REQUESTS_PER_KIND {
            batch.chapters.push((n as u64 * 1000, format!("Chapter {n}")));
        }
        let err = batch.validate().unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));
    }

    #[test]
    fn brand_ceiling_counts_both_lists() {
        let mut batch = MutationBatch::default();
        for n in 0..12 {
            batch.add_brands.push(format!("bl{n:02}"));
            batch.remove_brands.push(format!("br{n:02}"));
        }
        assert!(batch.validate().is_err());
    }

    #[test]
    fn bad_language_code_is_rejected() {
        let mut batch = MutationBatch::default();
        batch.track_edits.push(TrackEdit::SetLanguage {
            target: TrackSelector::All,
            code: "english".into(),
        });
        assert!(batch.validate().is_err());
    }

    #[test]
    fn keep_and_remove_system_tracks_conflict() {
        let batch = MutationBatch {
            keep_system_tracks: true,
            remove_system_tracks: true,
            ..MutationBatch::default()
        };
        assert!(batch.validate().is_err());
    }

    fn chapter_file(contents: &str) -> tempfile::NamedTempFile {
        use std::io::Write;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn chapter_file_is_parsed() {
        let file = chapter_file(
            "# intro markers\n\
             00:00:00.000 Opening\n\
             \n\
             00:01:30.500 Second act\n\
             01:02:03 Finale\n",
        );
        let chapters = chapters_from_file(file.path()).unwrap();
        assert_eq!(
            chapters,
            vec![
                (0, "Opening".to_owned()),
                (90_500, "Second act".to_owned()),
                (3_723_000, "Finale".to_owned()),
            ]
        );
    }

    #[test]
    fn untitled_chapters_are_numbered() {
        let file = chapter_file("00:00:05.0\n00:00:10.25 Named\n00:00:20\n");
        let chapters = chapters_from_file(file.path()).unwrap();
        assert_eq!(chapters[0], (5_000, "Chapter 1".to_owned()));
        assert_eq!(chapters[1], (10_250, "Named".to_owned()));
        assert_eq!(chapters[2], (20_000, "Chapter 3".to_owned()));
    }

    #[test]
    fn out_of_order_chapters_are_rejected() {
        let file = chapter_file("00:00:10.000 Later\n00:00:05.000 Earlier\n");
        assert!(matches!(
            chapters_from_file(file.path()),
            Err(Error::InvalidRequest(_))
        ));
    }

    #[test]
    fn malformed_timestamp_is_rejected() {
        let file = chapter_file("00:90:00.000 Bad minutes\n");
        assert!(chapters_from_file(file.path()).is_err());
        let file = chapter_file("twelve seconds in\n");
        assert!(chapters_from_file(file.path()).is_err());
    }
}
