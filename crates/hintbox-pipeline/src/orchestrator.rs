//! The movie mutation orchestrator.
//!
//! Stages run in a fixed order regardless of the order mutation requests
//! were supplied. Any stage failure short-circuits the remainder and drops
//! the movie handle without committing; state a prior stage already wrote
//! to disk stays written.

use std::fmt;
use std::path::{Path, PathBuf};

use bytes::Bytes;

use hintbox_core::{Error, OpenMode, ProgressSender, Result, StorageLayout, TrackId};
use hintbox_store::{
    convert, crypt, fragment, CommitTarget, ImportOptions, MediaImporter, MetaScope, Movie,
    RawImporter,
};

use crate::clock::setup_clock_references;
use crate::hint::synthesize_hints;
use crate::profiles::strip_system_tracks;
use crate::request::{
    chapters_from_file, ConvertKind, CryptAction, MetaEdit, MetaScopeSpec, MutationBatch, SdpLine,
    TrackEdit, TrackSelector,
};

/// Pipeline stage, used for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Open,
    Ingest,
    StripSystemTracks,
    MetaEdits,
    TrackEdits,
    Convert,
    Crypt,
    Hint,
    Fragment,
    StorageModeSelect,
    SessionFinalize,
    Commit,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Open => "open",
            Stage::Ingest => "ingest",
            Stage::StripSystemTracks => "strip-system-tracks",
            Stage::MetaEdits => "meta-edits",
            Stage::TrackEdits => "track-edits",
            Stage::Convert => "convert",
            Stage::Crypt => "crypt",
            Stage::Hint => "hint",
            Stage::Fragment => "fragment",
            Stage::StorageModeSelect => "storage-mode-select",
            Stage::SessionFinalize => "session-finalize",
            Stage::Commit => "commit",
        };
        f.write_str(name)
    }
}

/// What one pipeline invocation produced.
#[derive(Debug, Default)]
pub struct PipelineReport {
    /// Whether the movie was written (false means discarded unchanged).
    pub saved: bool,
    /// Path holding the result when one was written.
    pub output: Option<PathBuf>,
    pub hinted_tracks: u32,
    pub hint_bandwidth_kbps: u32,
    pub warnings: Vec<String>,
}

/// Runs mutation batches against movies.
pub struct Orchestrator {
    importer: Box<dyn MediaImporter>,
    progress: ProgressSender,
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new(Box::new(RawImporter), ProgressSender::noop())
    }
}

impl Orchestrator {
    pub fn new(importer: Box<dyn MediaImporter>, progress: ProgressSender) -> Self {
        Self { importer, progress }
    }

    /// Execute one mutation batch against the movie at `input`.
    pub fn run(&self, input: &Path, mode: OpenMode, batch: &MutationBatch) -> Result<PipelineReport> {
        batch.validate()?;
        let mut report = PipelineReport::default();

        let mut movie = self.stage(Stage::Open, Movie::open(input, mode))?;
        let target = CommitTarget::new(input, batch.output.clone());

        let ingested = self.ingest(&mut movie, batch)?;
        if batch.remove_system_tracks || (ingested && !batch.keep_system_tracks) {
            let removed = self.stage(Stage::StripSystemTracks, strip_system_tracks(&mut movie))?;
            tracing::debug!("Stripped {removed} system track(s)");
        }

        self.stage(Stage::MetaEdits, self.apply_meta_edits(&mut movie, batch))?;
        self.stage(Stage::TrackEdits, self.apply_track_edits(&mut movie, batch))?;
        if batch.sync_clock_references {
            self.stage(Stage::TrackEdits, setup_clock_references(&mut movie).map(|_| ()))?;
        }

        // With no explicit directive, freshly built single-AV movies are
        // converted to ISMA shape.
        let convert = match batch.convert {
            Some(kind) => Some(kind),
            None if ingested && movie.is_single_av() => {
                tracing::info!("Ingested movie is single audio+video; applying ISMA conversion");
                Some(ConvertKind::Isma {
                    renumber_es_ids: false,
                })
            }
            None => None,
        };
        match convert {
            Some(ConvertKind::Isma { renumber_es_ids }) => {
                self.stage(Stage::Convert, convert::make_isma(&mut movie, renumber_es_ids))?;
            }
            Some(ConvertKind::ThreeGp) => {
                self.stage(Stage::Convert, convert::make_3gp(&mut movie))?;
            }
            None => {}
        }
        match &batch.crypt {
            Some(CryptAction::Encrypt(spec)) => {
                self.stage(Stage::Crypt, crypt::encrypt_movie(&mut movie, spec).map(|_| ()))?;
            }
            Some(CryptAction::Decrypt) => {
                self.stage(Stage::Crypt, crypt::decrypt_movie(&mut movie).map(|_| ()))?;
            }
            None => {}
        }

        // Fragmentation and hinting are mutually exclusive; fragmentation
        // wins, writes to its own path, and ends the pipeline early.
        if let Some(seconds) = batch.fragment_seconds {
            if batch.hint.is_some() {
                let warning = "both hinting and fragmentation requested; hinting skipped".to_string();
                tracing::warn!("{warning}");
                report.warnings.push(warning);
            }
            let seconds = if seconds < fragment::MIN_FRAGMENT_SECONDS {
                let warning = format!(
                    "fragment duration raised to the {}s minimum",
                    fragment::MIN_FRAGMENT_SECONDS
                );
                tracing::warn!("{warning}");
                report.warnings.push(warning);
                fragment::MIN_FRAGMENT_SECONDS
            } else {
                seconds
            };
            self.stage(
                Stage::Fragment,
                fragment::fragment_movie(&mut movie, seconds, &self.progress),
            )?;
            self.commit(movie, &target, &mut report)?;
            return Ok(report);
        }

        let hinted = if let Some(params) = &batch.hint {
            let outcome = self.stage(
                Stage::Hint,
                synthesize_hints(&mut movie, params, &self.progress),
            )?;
            report.hinted_tracks = outcome.hinted_tracks;
            report.hint_bandwidth_kbps = outcome.bandwidth_kbps;
            report.warnings.extend(outcome.warnings);
            outcome.hinted_tracks > 0
        } else {
            false
        };

        let layout = if hinted && batch.full_interleave {
            StorageLayout::Tight
        } else if batch.interleave_window_ms == 0 {
            StorageLayout::Streamable
        } else if batch.flat_storage {
            StorageLayout::Flat
        } else {
            StorageLayout::Interleaved
        };
        movie.set_storage_layout(layout, batch.interleave_window_ms);

        self.stage(Stage::SessionFinalize, self.finalize_session(&mut movie, batch))?;
        self.commit(movie, &target, &mut report)?;
        Ok(report)
    }

    fn stage<T>(&self, stage: Stage, result: Result<T>) -> Result<T> {
        result.map_err(|e| {
            tracing::error!("Pipeline stage {stage} failed: {e}");
            Error::stage(stage.to_string(), e.to_string())
        })
    }

    fn ingest(&self, movie: &mut Movie, batch: &MutationBatch) -> Result<bool> {
        for source in &batch.sources {
            self.stage(
                Stage::Ingest,
                self.importer
                    .import(movie, source, &ImportOptions::default(), &self.progress),
            )?;
        }
        for source in &batch.concat_sources {
            let other = self.stage(Stage::Ingest, Movie::open(source, OpenMode::Read))?;
            self.stage(Stage::Ingest, movie.append_from(&other))?;
        }
        if batch.remove_hint_tracks {
            let removed = movie.remove_hint_tracks();
            tracing::debug!("Removed {removed} hint track(s)");
        }
        Ok(!batch.sources.is_empty() || !batch.concat_sources.is_empty())
    }

    fn apply_meta_edits(&self, movie: &mut Movie, batch: &MutationBatch) -> Result<()> {
        for edit in &batch.meta_edits {
            match edit {
                MetaEdit::SetType { scope, meta_type } => {
                    movie.meta_mut(resolve_scope(movie, *scope)?)?.set_meta_type(*meta_type);
                }
                MetaEdit::AddItem {
                    scope,
                    name,
                    mime_type,
                    data,
                } => {
                    movie.meta_mut(resolve_scope(movie, *scope)?)?.add_item(
                        Some(name.clone()),
                        Some(mime_type.clone()),
                        None,
                        data.clone().map(Bytes::from),
                    );
                }
                MetaEdit::RemoveItem { scope, item } => {
                    movie
                        .meta_mut(resolve_scope(movie, *scope)?)?
                        .remove_item((*item).into())?;
                }
                MetaEdit::SetPrimaryItem { scope, item } => {
                    movie
                        .meta_mut(resolve_scope(movie, *scope)?)?
                        .set_primary_item((*item).into())?;
                }
                MetaEdit::SetXml { scope, xml, binary } => {
                    movie
                        .meta_mut(resolve_scope(movie, *scope)?)?
                        .set_xml(Bytes::from(xml.clone()), *binary);
                }
                MetaEdit::RemoveXml { scope } => {
                    movie.meta_mut(resolve_scope(movie, *scope)?)?.remove_xml();
                }
            }
        }
        Ok(())
    }

    fn apply_track_edits(&self, movie: &mut Movie, batch: &MutationBatch) -> Result<()> {
        for edit in &batch.track_edits {
            match edit {
                TrackEdit::Remove(id) => {
                    let index = require_track(movie, *id)?;
                    movie.remove_track(index)?;
                }
                TrackEdit::SetLanguage { target, code } => {
                    for index in select_tracks(movie, *target)? {
                        movie.set_track_language(index, code)?;
                    }
                }
                TrackEdit::SetDelay { track, delay_ms } => {
                    let index = require_track(movie, *track)?;
                    apply_delay(movie, index, *delay_ms)?;
                }
                TrackEdit::SetKmsUri { target, uri } => match target {
                    TrackSelector::Id(id) => {
                        let index = require_track(movie, *id)?;
                        crypt::change_kms_uri(movie, index, uri)?;
                    }
                    TrackSelector::All => {
                        for index in 0..movie.track_count() {
                            if movie.track(index)?.is_protected() {
                                crypt::change_kms_uri(movie, index, uri)?;
                            }
                        }
                    }
                },
            }
        }
        Ok(())
    }

    fn finalize_session(&self, movie: &mut Movie, batch: &MutationBatch) -> Result<()> {
        for line in &batch.sdp_lines {
            match line {
                SdpLine::Session(text) => movie.sdp_add_session_line(text),
                SdpLine::Track { track, line } => {
                    // The target may be a media track; resolve it to the
                    // hint track packetizing it.
                    let index = require_track(movie, *track)?;
                    let index = if movie.track(index)?.hint_info().is_some() {
                        index
                    } else {
                        movie
                            .tracks()
                            .iter()
                            .position(|t| t.hint_source() == Some(*track))
                            .ok_or_else(|| {
                                Error::InvalidRequest(format!(
                                    "track {track} has no hint track for SDP injection"
                                ))
                            })?
                    };
                    movie.sdp_add_track_line(index, line)?;
                }
            }
        }
        for (language, notice) in &batch.copyrights {
            movie.set_copyright(language, notice);
        }
        for (start_ms, title) in &batch.chapters {
            movie.add_chapter(*start_ms, title);
        }
        if let Some(path) = &batch.chapter_file {
            for (start_ms, title) in chapters_from_file(path)? {
                movie.add_chapter(start_ms, &title);
            }
        }
        // Brand additions and removals are independent lists.
        for brand in &batch.add_brands {
            movie.add_compatible_brand(brand);
        }
        for brand in &batch.remove_brands {
            movie.remove_compatible_brand(brand);
        }
        Ok(())
    }

    fn commit(
        &self,
        mut movie: Movie,
        target: &CommitTarget,
        report: &mut PipelineReport,
    ) -> Result<()> {
        if !movie.needs_save() {
            tracing::info!("No mutation altered the movie; discarding unsaved");
            movie.discard();
            return Ok(());
        }
        let output = target.output();
        self.stage(Stage::Commit, movie.write(&output, &self.progress))?;
        if target.replaces_input() {
            self.stage(Stage::Commit, target.replace_input())?;
            report.output = Some(target.input().to_path_buf());
        } else {
            report.output = Some(output);
        }
        report.saved = true;
        Ok(())
    }
}

fn resolve_scope(movie: &Movie, spec: MetaScopeSpec) -> Result<MetaScope> {
    Ok(match spec {
        MetaScopeSpec::File => MetaScope::File,
        MetaScopeSpec::Movie => MetaScope::Movie,
        MetaScopeSpec::Track(id) => {
            require_track(movie, id)?;
            MetaScope::Track(id)
        }
    })
}

fn require_track(movie: &Movie, id: TrackId) -> Result<usize> {
    movie
        .track_index(id)
        .ok_or_else(|| Error::track_not_found(id))
}

fn select_tracks(movie: &Movie, target: TrackSelector) -> Result<Vec<usize>> {
    match target {
        TrackSelector::All => Ok((0..movie.track_count()).collect()),
        TrackSelector::Id(id) => Ok(vec![require_track(movie, id)?]),
    }
}

/// Delay is expressed as an empty edit segment followed by a normal segment
/// spanning the track's prior duration; zero delay just clears the list.
fn apply_delay(movie: &mut Movie, index: usize, delay_ms: u32) -> Result<()> {
    use hintbox_store::EditMode;

    movie.clear_edit_segments(index)?;
    if delay_ms == 0 {
        return Ok(());
    }
    let timescale = u64::from(movie.timescale());
    let empty = (u64::from(delay_ms) * timescale + 500) / 1000;
    movie.append_edit_segment(index, empty, EditMode::Empty)?;
    let media = movie.track_duration(index)?;
    movie.append_edit_segment(index, media, EditMode::Normal)?;
    Ok(())
}
