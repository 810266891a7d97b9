//! The [`Movie`]: an opened container instance and its persistence.
//!
//! A movie owns its tracks, the root object descriptor membership, profile
//! indicators, session metadata, brands, chapters, and the storage layout.
//! Persistence is an opaque serialized representation (magic header followed
//! by a bincode payload); box-level ISO-BMFF encoding is outside this crate.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use hintbox_core::{
    Error, MediaType, OpenMode, ProfileCategory, ProgressSender, Result, Specification,
    StorageLayout, TrackId, PROFILE_NOT_REQUIRED,
};

use crate::meta::MetaStore;
use crate::session::SessionInfo;
use crate::track::{EditMode, EditSegment, Esd, Sample, Track};

const MAGIC: &[u8; 8] = b"HINTBOX1";

/// Default movie timescale (units per second).
pub const DEFAULT_MOVIE_TIMESCALE: u32 = 600;

/// Per-category profile/level indicators.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ProfileSet {
    od: u8,
    scene: u8,
    graphics: u8,
    audio: u8,
    visual: u8,
    inline_scene: u8,
}

impl Default for ProfileSet {
    fn default() -> Self {
        Self {
            od: PROFILE_NOT_REQUIRED,
            scene: PROFILE_NOT_REQUIRED,
            graphics: PROFILE_NOT_REQUIRED,
            audio: PROFILE_NOT_REQUIRED,
            visual: PROFILE_NOT_REQUIRED,
            inline_scene: 0,
        }
    }
}

/// A copyright notice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Copyright {
    pub language: String,
    pub notice: String,
}

/// A chapter marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chapter {
    pub start_ms: u64,
    pub title: String,
}

/// The persisted movie state.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct MovieData {
    timescale: u32,
    next_track_id: u32,
    tracks: Vec<Track>,
    /// Root object descriptor membership; `None` means no root OD exists.
    root_od: Option<Vec<TrackId>>,
    profiles: ProfileSet,
    file_meta: MetaStore,
    movie_meta: MetaStore,
    session: SessionInfo,
    major_brand: Option<String>,
    compatible_brands: Vec<String>,
    copyrights: Vec<Copyright>,
    chapters: Vec<Chapter>,
    layout: StorageLayout,
    interleave_window_ms: u32,
    fragment_duration_ms: Option<u32>,
    default_sync_track: Option<TrackId>,
}

impl Default for MovieData {
    fn default() -> Self {
        Self {
            timescale: DEFAULT_MOVIE_TIMESCALE,
            next_track_id: 1,
            tracks: Vec::new(),
            root_od: Some(Vec::new()),
            profiles: ProfileSet::default(),
            file_meta: MetaStore::default(),
            movie_meta: MetaStore::default(),
            session: SessionInfo::default(),
            major_brand: None,
            compatible_brands: Vec::new(),
            copyrights: Vec::new(),
            chapters: Vec::new(),
            layout: StorageLayout::Interleaved,
            interleave_window_ms: 500,
            fragment_duration_ms: None,
            default_sync_track: None,
        }
    }
}

/// An opened container instance.
#[derive(Debug)]
pub struct Movie {
    path: PathBuf,
    mode: OpenMode,
    needs_save: bool,
    data: MovieData,
}

impl Movie {
    // -- Lifecycle ----------------------------------------------------------

    /// Open (or, with a create mode, start) a movie at `path`.
    pub fn open(path: impl Into<PathBuf>, mode: OpenMode) -> Result<Self> {
        let path = path.into();
        if mode.creates() {
            let mut data = MovieData::default();
            data.layout = if mode == OpenMode::CreateFlat {
                StorageLayout::Flat
            } else {
                StorageLayout::Interleaved
            };
            tracing::debug!("Creating movie at {} ({mode})", path.display());
            return Ok(Self {
                path,
                mode,
                needs_save: false,
                data,
            });
        }

        let raw = std::fs::read(&path)?;
        if raw.len() < MAGIC.len() || &raw[..MAGIC.len()] != MAGIC {
            return Err(Error::StorageFailure(format!(
                "{} is not a hintbox movie",
                path.display()
            )));
        }
        let data: MovieData = bincode::deserialize(&raw[MAGIC.len()..])
            .map_err(|e| Error::StorageFailure(format!("corrupt movie: {e}")))?;
        tracing::debug!(
            "Opened {} ({mode}): {} track(s)",
            path.display(),
            data.tracks.len()
        );
        Ok(Self {
            path,
            mode,
            needs_save: false,
            data,
        })
    }

    /// Write the movie to `target`. Reports coarse progress per track.
    pub fn write(&mut self, target: &Path, progress: &ProgressSender) -> Result<()> {
        if self.mode == OpenMode::Read {
            return Err(Error::StorageFailure(
                "movie was opened read-only".to_string(),
            ));
        }
        progress.send("Writing", 0.0);
        let payload = bincode::serialize(&self.data)
            .map_err(|e| Error::StorageFailure(format!("serialize failed: {e}")))?;
        let total = self.data.tracks.len().max(1) as f32;
        for i in 0..self.data.tracks.len() {
            progress.send("Writing", (i as f32) / total);
        }
        let mut out = Vec::with_capacity(MAGIC.len() + payload.len());
        out.extend_from_slice(MAGIC);
        out.extend_from_slice(&payload);
        std::fs::write(target, &out)
            .map_err(|e| Error::StorageFailure(format!("write {}: {e}", target.display())))?;
        progress.send("Writing", 1.0);
        self.needs_save = false;
        Ok(())
    }

    /// Discard the movie without writing.
    pub fn discard(self) {
        tracing::debug!("Discarding movie {} unsaved", self.path.display());
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn open_mode(&self) -> OpenMode {
        self.mode
    }

    /// Whether any mutation stage altered persisted state.
    #[must_use]
    pub fn needs_save(&self) -> bool {
        self.needs_save
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.needs_save = true;
    }

    #[must_use]
    pub fn timescale(&self) -> u32 {
        self.data.timescale
    }

    // -- Tracks -------------------------------------------------------------

    #[must_use]
    pub fn track_count(&self) -> usize {
        self.data.tracks.len()
    }

    pub fn track(&self, index: usize) -> Result<&Track> {
        self.data
            .tracks
            .get(index)
            .ok_or_else(|| Error::track_not_found(format!("index {index}")))
    }

    pub(crate) fn track_mut(&mut self, index: usize) -> Result<&mut Track> {
        self.data
            .tracks
            .get_mut(index)
            .ok_or_else(|| Error::track_not_found(format!("index {index}")))
    }

    /// Position of the track with the given ID.
    #[must_use]
    pub fn track_index(&self, id: TrackId) -> Option<usize> {
        self.data.tracks.iter().position(|t| t.id == id)
    }

    #[must_use]
    pub fn tracks(&self) -> &[Track] {
        &self.data.tracks
    }

    /// Create a new empty track; IDs are monotonic and never reused.
    pub fn add_track(&mut self, media_type: MediaType, timescale: u32) -> TrackId {
        let id = TrackId::new(self.data.next_track_id);
        self.data.next_track_id += 1;
        self.data.tracks.push(Track::new(id, media_type, timescale));
        self.needs_save = true;
        id
    }

    /// Remove the track at `index`, dropping its root-OD membership and any
    /// default sync designation.
    pub fn remove_track(&mut self, index: usize) -> Result<Track> {
        if index >= self.data.tracks.len() {
            return Err(Error::track_not_found(format!("index {index}")));
        }
        let track = self.data.tracks.remove(index);
        if let Some(root) = self.data.root_od.as_mut() {
            root.retain(|id| *id != track.id);
        }
        if self.data.default_sync_track == Some(track.id) {
            self.data.default_sync_track = None;
        }
        self.needs_save = true;
        Ok(track)
    }

    pub fn media_type(&self, index: usize) -> Result<MediaType> {
        Ok(self.track(index)?.media_type)
    }

    pub fn sample_count(&self, index: usize) -> Result<usize> {
        Ok(self.track(index)?.sample_count())
    }

    /// The track's primary elementary stream descriptor, if any.
    pub fn primary_descriptor(&self, index: usize) -> Result<Option<&Esd>> {
        Ok(self.track(index)?.primary_descriptor())
    }

    /// Replace (or install) the track's primary descriptor.
    pub fn set_descriptor(&mut self, index: usize, esd: Esd) -> Result<()> {
        let track = self.track_mut(index)?;
        if track.descriptors.is_empty() {
            track.descriptors.push(esd);
        } else {
            track.descriptors[0] = esd;
        }
        self.needs_save = true;
        Ok(())
    }

    /// Append a sample to the track at `index`.
    pub fn add_sample(&mut self, index: usize, sample: Sample) -> Result<()> {
        self.track_mut(index)?.samples.push(sample);
        self.needs_save = true;
        Ok(())
    }

    /// Set the track's ISO 639-2 language code.
    pub fn set_track_language(&mut self, index: usize, language: &str) -> Result<()> {
        if language.len() != 3 {
            return Err(Error::InvalidRequest(format!(
                "language code must be 3 characters, got {language:?}"
            )));
        }
        self.track_mut(index)?.language = language.to_string();
        self.needs_save = true;
        Ok(())
    }

    // -- Edit lists ---------------------------------------------------------

    /// Remove all edit list entries of the track.
    pub fn clear_edit_segments(&mut self, index: usize) -> Result<()> {
        let track = self.track_mut(index)?;
        if !track.edits.is_empty() {
            track.edits.clear();
            self.needs_save = true;
        }
        Ok(())
    }

    /// Append an edit segment (duration in movie timescale units).
    pub fn append_edit_segment(&mut self, index: usize, duration: u64, mode: EditMode) -> Result<()> {
        self.track_mut(index)?.edits.push(EditSegment { duration, mode });
        self.needs_save = true;
        Ok(())
    }

    /// Track media duration expressed in movie timescale units.
    pub fn track_duration(&self, index: usize) -> Result<u64> {
        let track = self.track(index)?;
        let media = track.duration();
        Ok(media * u64::from(self.data.timescale) / u64::from(track.timescale.max(1)))
    }

    // -- Root object descriptor ---------------------------------------------

    /// Whether the movie carries a root object descriptor at all.
    #[must_use]
    pub fn has_root_od(&self) -> bool {
        self.data.root_od.is_some()
    }

    /// Number of streams referenced by the root object descriptor.
    #[must_use]
    pub fn root_od_stream_count(&self) -> usize {
        self.data.root_od.as_ref().map_or(0, Vec::len)
    }

    pub fn is_track_in_root_od(&self, index: usize) -> Result<bool> {
        let id = self.track(index)?.id;
        Ok(self
            .data
            .root_od
            .as_ref()
            .is_some_and(|root| root.contains(&id)))
    }

    pub fn add_track_to_root_od(&mut self, index: usize) -> Result<()> {
        let id = self.track(index)?.id;
        let root = self.data.root_od.get_or_insert_with(Vec::new);
        if !root.contains(&id) {
            root.push(id);
            self.needs_save = true;
        }
        Ok(())
    }

    pub fn remove_track_from_root_od(&mut self, index: usize) -> Result<()> {
        let id = self.track(index)?.id;
        if let Some(root) = self.data.root_od.as_mut() {
            let before = root.len();
            root.retain(|t| *t != id);
            if root.len() != before {
                self.needs_save = true;
            }
        }
        Ok(())
    }

    /// Replace the whole root object descriptor (`None` removes it).
    pub fn set_root_od(&mut self, members: Option<Vec<TrackId>>) {
        self.data.root_od = members;
        self.needs_save = true;
    }

    /// Designate the track all others synchronize their clocks to.
    pub fn set_default_sync_track(&mut self, index: usize) -> Result<()> {
        let id = self.track(index)?.id;
        if self.data.default_sync_track != Some(id) {
            self.data.default_sync_track = Some(id);
            self.needs_save = true;
        }
        Ok(())
    }

    #[must_use]
    pub fn default_sync_track(&self) -> Option<TrackId> {
        self.data.default_sync_track
    }

    // -- Profile indicators -------------------------------------------------

    #[must_use]
    pub fn profile_indication(&self, category: ProfileCategory) -> u8 {
        match category {
            ProfileCategory::ObjectDescriptor => self.data.profiles.od,
            ProfileCategory::Scene => self.data.profiles.scene,
            ProfileCategory::Graphics => self.data.profiles.graphics,
            ProfileCategory::Audio => self.data.profiles.audio,
            ProfileCategory::Visual => self.data.profiles.visual,
            ProfileCategory::Inline => self.data.profiles.inline_scene,
        }
    }

    pub fn set_profile_indication(&mut self, category: ProfileCategory, value: u8) {
        let slot = match category {
            ProfileCategory::ObjectDescriptor => &mut self.data.profiles.od,
            ProfileCategory::Scene => &mut self.data.profiles.scene,
            ProfileCategory::Graphics => &mut self.data.profiles.graphics,
            ProfileCategory::Audio => &mut self.data.profiles.audio,
            ProfileCategory::Visual => &mut self.data.profiles.visual,
            ProfileCategory::Inline => &mut self.data.profiles.inline_scene,
        };
        if *slot != value {
            *slot = value;
            self.needs_save = true;
        }
    }

    // -- Classification -----------------------------------------------------

    /// Guess the specification family of this presentation.
    ///
    /// `Isma` when every populated non-hint track is audio/visual/text and at
    /// least one carries a descriptor; `Mpeg4` when scene or OD streams are
    /// present; `Unknown` otherwise.
    #[must_use]
    pub fn guess_specification(&self) -> Specification {
        let mut has_esd = false;
        let mut has_media = false;
        for track in &self.data.tracks {
            match track.media_type {
                MediaType::Scene | MediaType::ObjectDescriptor => {
                    return Specification::Mpeg4;
                }
                MediaType::Hint => {}
                MediaType::Visual | MediaType::Audio | MediaType::Text => {
                    if track.sample_count() > 0 {
                        has_media = true;
                        if track.primary_descriptor().is_some() {
                            has_esd = true;
                        }
                    }
                }
                MediaType::Other => return Specification::Unknown,
            }
        }
        if has_media && has_esd {
            Specification::Isma
        } else {
            Specification::Unknown
        }
    }

    /// Whether the presentation is a single audio + single video pair.
    #[must_use]
    pub fn is_single_av(&self) -> bool {
        let mut audio = 0usize;
        let mut video = 0usize;
        for track in &self.data.tracks {
            if track.sample_count() == 0 {
                continue;
            }
            match track.media_type {
                MediaType::Audio => audio += 1,
                MediaType::Visual => video += 1,
                MediaType::Scene | MediaType::ObjectDescriptor => return false,
                _ => {}
            }
        }
        audio == 1 && video == 1
    }

    // -- Concatenation ------------------------------------------------------

    /// Append another movie: samples of tracks matching by media type (in
    /// source order) are appended; unmatched tracks become new tracks with
    /// fresh IDs.
    pub fn append_from(&mut self, other: &Movie) -> Result<()> {
        let original = self.data.tracks.len();
        let mut claimed = vec![false; original];
        for incoming in &other.data.tracks {
            if incoming.media_type == MediaType::Hint {
                continue;
            }
            let target = (0..original)
                .find(|&i| !claimed[i] && self.data.tracks[i].media_type == incoming.media_type);
            match target {
                Some(idx) => {
                    claimed[idx] = true;
                    self.data.tracks[idx]
                        .samples
                        .extend(incoming.samples.iter().cloned());
                }
                None => {
                    let id = self.add_track(incoming.media_type, incoming.timescale);
                    let idx = self.track_index(id).ok_or_else(|| {
                        Error::track_not_found(format!("freshly added track {id}"))
                    })?;
                    let track = &mut self.data.tracks[idx];
                    track.samples = incoming.samples.clone();
                    track.descriptors = incoming.descriptors.clone();
                    track.language = incoming.language.clone();
                }
            }
        }
        self.needs_save = true;
        Ok(())
    }

    // -- Hint track upkeep --------------------------------------------------

    /// Remove every hint track and clear any session SDP content.
    pub fn remove_hint_tracks(&mut self) -> usize {
        let before = self.data.tracks.len();
        let removed_ids: Vec<TrackId> = self
            .data
            .tracks
            .iter()
            .filter(|t| t.media_type == MediaType::Hint)
            .map(|t| t.id)
            .collect();
        self.data.tracks.retain(|t| t.media_type != MediaType::Hint);
        if let Some(root) = self.data.root_od.as_mut() {
            root.retain(|id| !removed_ids.contains(id));
        }
        let removed = before - self.data.tracks.len();
        if removed > 0 || !self.data.session.is_empty() {
            self.data.session = SessionInfo::default();
            self.needs_save = true;
        }
        removed
    }

    // -- Session ------------------------------------------------------------

    #[must_use]
    pub fn session(&self) -> &SessionInfo {
        &self.data.session
    }

    pub(crate) fn session_mut(&mut self) -> &mut SessionInfo {
        self.needs_save = true;
        &mut self.data.session
    }

    // -- Meta stores --------------------------------------------------------

    pub fn meta(&self, scope: crate::meta::MetaScope) -> Result<&MetaStore> {
        match scope {
            crate::meta::MetaScope::File => Ok(&self.data.file_meta),
            crate::meta::MetaScope::Movie => Ok(&self.data.movie_meta),
            crate::meta::MetaScope::Track(id) => {
                let idx = self
                    .track_index(id)
                    .ok_or_else(|| Error::track_not_found(id))?;
                Ok(&self.data.tracks[idx].meta)
            }
        }
    }

    pub fn meta_mut(&mut self, scope: crate::meta::MetaScope) -> Result<&mut MetaStore> {
        self.needs_save = true;
        match scope {
            crate::meta::MetaScope::File => Ok(&mut self.data.file_meta),
            crate::meta::MetaScope::Movie => Ok(&mut self.data.movie_meta),
            crate::meta::MetaScope::Track(id) => {
                let idx = self
                    .track_index(id)
                    .ok_or_else(|| Error::track_not_found(id))?;
                Ok(&mut self.data.tracks[idx].meta)
            }
        }
    }

    // -- Brands, copyright, chapters ----------------------------------------

    pub fn set_major_brand(&mut self, brand: &str) {
        self.data.major_brand = Some(brand.to_string());
        self.needs_save = true;
    }

    #[must_use]
    pub fn major_brand(&self) -> Option<&str> {
        self.data.major_brand.as_deref()
    }

    pub fn add_compatible_brand(&mut self, brand: &str) {
        if !self.data.compatible_brands.iter().any(|b| b == brand) {
            self.data.compatible_brands.push(brand.to_string());
            self.needs_save = true;
        }
    }

    pub fn remove_compatible_brand(&mut self, brand: &str) {
        let before = self.data.compatible_brands.len();
        self.data.compatible_brands.retain(|b| b != brand);
        if self.data.compatible_brands.len() != before {
            self.needs_save = true;
        }
    }

    #[must_use]
    pub fn compatible_brands(&self) -> &[String] {
        &self.data.compatible_brands
    }

    /// Set the copyright notice for a language, replacing any existing one.
    pub fn set_copyright(&mut self, language: &str, notice: &str) {
        if let Some(existing) = self
            .data
            .copyrights
            .iter_mut()
            .find(|c| c.language == language)
        {
            existing.notice = notice.to_string();
        } else {
            self.data.copyrights.push(Copyright {
                language: language.to_string(),
                notice: notice.to_string(),
            });
        }
        self.needs_save = true;
    }

    #[must_use]
    pub fn copyrights(&self) -> &[Copyright] {
        &self.data.copyrights
    }

    pub fn add_chapter(&mut self, start_ms: u64, title: &str) {
        self.data.chapters.push(Chapter {
            start_ms,
            title: title.to_string(),
        });
        self.needs_save = true;
    }

    #[must_use]
    pub fn chapters(&self) -> &[Chapter] {
        &self.data.chapters
    }

    // -- Storage layout -----------------------------------------------------

    /// Select the storage layout. The window is only meaningful for
    /// time-interleaved storage.
    pub fn set_storage_layout(&mut self, layout: StorageLayout, window_ms: u32) {
        if self.data.layout != layout || self.data.interleave_window_ms != window_ms {
            self.data.layout = layout;
            self.data.interleave_window_ms = window_ms;
            self.needs_save = true;
        }
    }

    #[must_use]
    pub fn storage_layout(&self) -> StorageLayout {
        self.data.layout
    }

    #[must_use]
    pub fn interleave_window_ms(&self) -> u32 {
        self.data.interleave_window_ms
    }

    pub(crate) fn set_fragmented(&mut self, fragment_duration_ms: u32) {
        self.data.fragment_duration_ms = Some(fragment_duration_ms);
        self.needs_save = true;
    }

    #[must_use]
    pub fn fragment_duration_ms(&self) -> Option<u32> {
        self.data.fragment_duration_ms
    }
}
