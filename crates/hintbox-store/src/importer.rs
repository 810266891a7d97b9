//! Media ingest.
//!
//! [`MediaImporter`] is the seam between the orchestrator and whatever can
//! turn an external source into track samples. [`RawImporter`] is the
//! built-in implementation: it classifies the source by extension, chunks
//! the bytes into fixed-duration samples, and attaches a descriptor for
//! MPEG-4 stream kinds.

use std::fs;
use std::path::Path;

use hintbox_core::{
    Error, MediaType, ProgressSender, Result, StreamType, TrackId, OTI_AVC_VISUAL,
    OTI_MPEG2_AAC_LC, OTI_MPEG4_AUDIO, OTI_MPEG4_VISUAL,
};

use crate::movie::Movie;
use crate::track::{Esd, Sample};

/// Settings applied to one import.
#[derive(Debug, Clone)]
pub struct ImportOptions {
    /// Timescale of the new track.
    pub timescale: u32,
    /// Duration assigned to each ingested sample, in track timescale units.
    pub sample_duration: u32,
    /// ISO 639-2 language code, if known.
    pub language: Option<String>,
    /// Source bytes are split into samples of at most this size.
    pub chunk_size: usize,
    /// Add audio/visual tracks to the root object descriptor. Scene and
    /// object descriptor streams always join it.
    pub add_to_root_od: bool,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            timescale: 1000,
            sample_duration: 40,
            language: None,
            chunk_size: 4096,
            add_to_root_od: false,
        }
    }
}

/// A source-to-track ingest collaborator.
pub trait MediaImporter {
    /// Whether this importer recognizes the source.
    fn probe(&self, path: &Path) -> bool;

    /// Ingest the source as a new track.
    fn import(
        &self,
        movie: &mut Movie,
        path: &Path,
        options: &ImportOptions,
        progress: &ProgressSender,
    ) -> Result<TrackId>;
}

/// Extension-based raw byte importer.
#[derive(Debug, Default)]
pub struct RawImporter;

/// What an extension maps to: media type plus the descriptor to attach.
fn classify(extension: &str) -> Option<(MediaType, Option<(StreamType, u8)>)> {
    match extension {
        "m4v" | "cmp" => Some((MediaType::Visual, Some((StreamType::Visual, OTI_MPEG4_VISUAL)))),
        "264" | "h264" | "avc" => {
            Some((MediaType::Visual, Some((StreamType::Visual, OTI_AVC_VISUAL))))
        }
        "aac" | "adts" => Some((MediaType::Audio, Some((StreamType::Audio, OTI_MPEG4_AUDIO)))),
        "latm" => Some((MediaType::Audio, Some((StreamType::Audio, OTI_MPEG2_AAC_LC)))),
        "bt" | "bifs" => Some((MediaType::Scene, Some((StreamType::Scene, 0x01)))),
        "od" => Some((
            MediaType::ObjectDescriptor,
            Some((StreamType::ObjectDescriptor, 0x01)),
        )),
        "txt" | "srt" => Some((MediaType::Text, None)),
        _ => None,
    }
}

impl MediaImporter for RawImporter {
    fn probe(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| classify(&e.to_ascii_lowercase()).is_some())
            .unwrap_or(false)
    }

    fn import(
        &self,
        movie: &mut Movie,
        path: &Path,
        options: &ImportOptions,
        progress: &ProgressSender,
    ) -> Result<TrackId> {
        let source_name = path.display().to_string();
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .ok_or_else(|| Error::import(&source_name, "source has no extension"))?;
        let (media_type, descriptor) = classify(&extension)
            .ok_or_else(|| Error::import(&source_name, "unrecognized source format"))?;

        let data = fs::read(path)?;
        if data.is_empty() {
            return Err(Error::import(&source_name, "source is empty"));
        }
        if options.chunk_size == 0 {
            return Err(Error::InvalidRequest("chunk size must be non-zero".into()));
        }

        let id = movie.add_track(media_type, options.timescale);
        let index = movie
            .track_index(id)
            .ok_or_else(|| Error::track_not_found(id))?;

        let chunks: Vec<_> = data.chunks(options.chunk_size).collect();
        let total = chunks.len() as f32;
        for (n, chunk) in chunks.into_iter().enumerate() {
            movie.add_sample(index, Sample::new(chunk.to_vec(), options.sample_duration))?;
            progress.send("Importing", (n as f32 + 1.0) / total);
        }

        if let Some((stream_type, oti)) = descriptor {
            movie.set_descriptor(index, Esd::new(id.as_u32(), stream_type, oti))?;
        }
        if let Some(lang) = &options.language {
            movie.set_track_language(index, lang)?;
        }

        let systems = matches!(media_type, MediaType::Scene | MediaType::ObjectDescriptor);
        if systems || (options.add_to_root_od && media_type.is_av()) {
            movie.add_track_to_root_od(index)?;
        }

        tracing::info!("Imported {source_name} as track {id} ({media_type})");
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hintbox_core::OpenMode;
    use std::io::Write;

    fn source(dir: &tempfile::TempDir, name: &str, len: usize) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut f = fs::File::create(&path).unwrap();
        f.write_all(&vec![0xABu8; len]).unwrap();
        path
    }

    #[test]
    fn probe_matches_known_extensions() {
        let imp = RawImporter;
        assert!(imp.probe(Path::new("clip.m4v")));
        assert!(imp.probe(Path::new("Scene.BT")));
        assert!(!imp.probe(Path::new("notes.pdf")));
        assert!(!imp.probe(Path::new("no_extension")));
    }

    #[test]
    fn import_chunks_into_samples() {
        let dir = tempfile::tempdir().unwrap();
        let path = source(&dir, "clip.m4v", 10_000);
        let mut movie = Movie::open("import.hbx", OpenMode::CreateInterleaved).unwrap();
        let opts = ImportOptions {
            chunk_size: 4096,
            ..ImportOptions::default()
        };
        let id = RawImporter
            .import(&mut movie, &path, &opts, &ProgressSender::noop())
            .unwrap();

        let index = movie.track_index(id).unwrap();
        let track = movie.track(index).unwrap();
        assert_eq!(track.media_type(), MediaType::Visual);
        assert_eq!(track.sample_count(), 3);
        let esd = track.primary_descriptor().unwrap();
        assert_eq!(esd.decoder_config.object_type_indication, OTI_MPEG4_VISUAL);
        assert!(!movie.is_track_in_root_od(index).unwrap());
    }

    #[test]
    fn scene_import_joins_root_od() {
        let dir = tempfile::tempdir().unwrap();
        let path = source(&dir, "scene.bt", 128);
        let mut movie = Movie::open("scene.hbx", OpenMode::CreateInterleaved).unwrap();
        let id = RawImporter
            .import(
                &mut movie,
                &path,
                &ImportOptions::default(),
                &ProgressSender::noop(),
            )
            .unwrap();
        let index = movie.track_index(id).unwrap();
        assert!(movie.is_track_in_root_od(index).unwrap());
    }

    #[test]
    fn unknown_format_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = source(&dir, "clip.xyz", 16);
        let mut movie = Movie::open("bad.hbx", OpenMode::CreateInterleaved).unwrap();
        let err = RawImporter
            .import(
                &mut movie,
                &path,
                &ImportOptions::default(),
                &ProgressSender::noop(),
            )
            .unwrap_err();
        assert!(matches!(err, Error::ImportFailure { .. }));
    }

    #[test]
    fn language_option_is_applied() {
        let dir = tempfile::tempdir().unwrap();
        let path = source(&dir, "audio.aac", 256);
        let mut movie = Movie::open("lang.hbx", OpenMode::CreateInterleaved).unwrap();
        let opts = ImportOptions {
            language: Some("fre".into()),
            ..ImportOptions::default()
        };
        let id = RawImporter
            .import(&mut movie, &path, &opts, &ProgressSender::noop())
            .unwrap();
        let index = movie.track_index(id).unwrap();
        assert_eq!(movie.track(index).unwrap().language(), "fre");
    }
}
