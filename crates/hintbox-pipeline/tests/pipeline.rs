//! End-to-end pipeline scenarios against movies on disk.

use std::path::{Path, PathBuf};

use hintbox_core::{
    HintParams, MediaType, OpenMode, ProgressSender, StorageLayout, StreamType,
};
use hintbox_pipeline::{MutationBatch, Orchestrator, TrackEdit, TrackSelector};
use hintbox_store::{Esd, Movie, Sample};

/// Write a movie with one video and one audio track to `dir/movie.hbx`.
fn seed_av_movie(dir: &Path) -> PathBuf {
    let path = dir.join("movie.hbx");
    let mut movie = Movie::open(&path, OpenMode::CreateInterleaved).unwrap();
    let v = movie.add_track(MediaType::Visual, 90000);
    for _ in 0..4 {
        movie.add_sample(0, Sample::new(vec![0x11u8; 2000], 22500)).unwrap();
    }
    movie
        .set_descriptor(0, Esd::new(v.as_u32(), StreamType::Visual, 0x20))
        .unwrap();
    let a = movie.add_track(MediaType::Audio, 48000);
    for _ in 0..4 {
        movie.add_sample(1, Sample::new(vec![0x22u8; 300], 12000)).unwrap();
    }
    movie
        .set_descriptor(1, Esd::new(a.as_u32(), StreamType::Audio, 0x40))
        .unwrap();
    movie.write(&path, &ProgressSender::noop()).unwrap();
    path
}

#[test]
fn hinting_commits_over_the_input() {
    let dir = tempfile::tempdir().unwrap();
    let input = seed_av_movie(dir.path());

    let batch = MutationBatch {
        hint: Some(HintParams::default()),
        ..MutationBatch::default()
    };
    let report = Orchestrator::default()
        .run(&input, OpenMode::ReadWrite, &batch)
        .unwrap();

    assert!(report.saved);
    assert_eq!(report.output.as_deref(), Some(input.as_path()));
    assert_eq!(report.hinted_tracks, 2);
    assert!(report.hint_bandwidth_kbps > 0);

    // The input path now holds the hinted movie; the scratch output is gone.
    let reopened = Movie::open(&input, OpenMode::Read).unwrap();
    assert_eq!(reopened.track_count(), 4);
    let hint_count = reopened
        .tracks()
        .iter()
        .filter(|t| t.media_type() == MediaType::Hint)
        .count();
    assert_eq!(hint_count, 2);
    assert!(!dir.path().join("out_movie.hbx").exists());
}

#[test]
fn single_av_grouping_survives_commit() {
    let dir = tempfile::tempdir().unwrap();
    let input = seed_av_movie(dir.path());
    let batch = MutationBatch {
        hint: Some(HintParams::default()),
        ..MutationBatch::default()
    };
    Orchestrator::default()
        .run(&input, OpenMode::ReadWrite, &batch)
        .unwrap();

    let reopened = Movie::open(&input, OpenMode::Read).unwrap();
    let mut groupings = Vec::new();
    for track in reopened.tracks() {
        if let Some(info) = track.hint_info() {
            let source = reopened
                .track_index(track.hint_source().unwrap())
                .unwrap();
            let kind = reopened.tracks()[source].media_type();
            groupings.push((kind, info.group, info.priority));
        }
    }
    assert!(groupings.contains(&(MediaType::Visual, 2, 2)));
    assert!(groupings.contains(&(MediaType::Audio, 2, 1)));
}

#[test]
fn fragmentation_wins_over_hinting() {
    let dir = tempfile::tempdir().unwrap();
    let input = seed_av_movie(dir.path());

    let batch = MutationBatch {
        hint: Some(HintParams::default()),
        fragment_seconds: Some(2.0),
        ..MutationBatch::default()
    };
    let report = Orchestrator::default()
        .run(&input, OpenMode::ReadWrite, &batch)
        .unwrap();

    assert!(report.saved);
    assert_eq!(report.hinted_tracks, 0);
    assert!(report.warnings.iter().any(|w| w.contains("hinting skipped")));

    let reopened = Movie::open(&input, OpenMode::Read).unwrap();
    assert_eq!(reopened.fragment_duration_ms(), Some(2000));
    assert!(reopened
        .tracks()
        .iter()
        .all(|t| t.media_type() != MediaType::Hint));
}

#[test]
fn sub_minimum_fragment_duration_is_floored() {
    let dir = tempfile::tempdir().unwrap();
    let input = seed_av_movie(dir.path());
    let batch = MutationBatch {
        fragment_seconds: Some(0.1),
        ..MutationBatch::default()
    };
    let report = Orchestrator::default()
        .run(&input, OpenMode::ReadWrite, &batch)
        .unwrap();
    assert!(report.warnings.iter().any(|w| w.contains("minimum")));

    let reopened = Movie::open(&input, OpenMode::Read).unwrap();
    assert_eq!(reopened.fragment_duration_ms(), Some(500));
}

#[test]
fn lone_small_sample_is_embedded_not_hinted() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("lone.hbx");
    let mut movie = Movie::open(&input, OpenMode::CreateInterleaved).unwrap();
    let a = movie.add_track(MediaType::Audio, 48000);
    movie.add_sample(0, Sample::new(vec![0x33u8; 100], 48000)).unwrap();
    movie
        .set_descriptor(0, Esd::new(a.as_u32(), StreamType::Audio, 0x40))
        .unwrap();
    movie.add_track_to_root_od(0).unwrap();
    movie.write(&input, &ProgressSender::noop()).unwrap();

    let batch = MutationBatch {
        hint: Some(HintParams::default()),
        ..MutationBatch::default()
    };
    let report = Orchestrator::default()
        .run(&input, OpenMode::ReadWrite, &batch)
        .unwrap();

    assert_eq!(report.hinted_tracks, 0);
    assert_eq!(report.hint_bandwidth_kbps, 0);

    let reopened = Movie::open(&input, OpenMode::Read).unwrap();
    assert_eq!(reopened.track_count(), 1);
    assert_eq!(reopened.session().embedded.len(), 1);
}

#[test]
fn wildcard_language_applies_to_every_track() {
    let dir = tempfile::tempdir().unwrap();
    let input = seed_av_movie(dir.path());

    let batch = MutationBatch {
        track_edits: vec![TrackEdit::SetLanguage {
            target: TrackSelector::All,
            code: "ger".into(),
        }],
        ..MutationBatch::default()
    };
    Orchestrator::default()
        .run(&input, OpenMode::ReadWrite, &batch)
        .unwrap();

    let reopened = Movie::open(&input, OpenMode::Read).unwrap();
    for track in reopened.tracks() {
        assert_eq!(track.language(), "ger");
    }
}

#[test]
fn chapter_file_lands_in_the_movie() {
    let dir = tempfile::tempdir().unwrap();
    let input = seed_av_movie(dir.path());
    let chapters = dir.path().join("chapters.txt");
    std::fs::write(&chapters, "00:00:00.000 Opening\n00:01:00.000 Middle\n").unwrap();

    let batch = MutationBatch {
        chapter_file: Some(chapters),
        ..MutationBatch::default()
    };
    Orchestrator::default()
        .run(&input, OpenMode::ReadWrite, &batch)
        .unwrap();

    let reopened = Movie::open(&input, OpenMode::Read).unwrap();
    assert_eq!(reopened.chapters().len(), 2);
    assert_eq!(reopened.chapters()[1].start_ms, 60_000);
    assert_eq!(reopened.chapters()[1].title, "Middle");
}

#[test]
fn explicit_output_leaves_the_input_alone() {
    let dir = tempfile::tempdir().unwrap();
    let input = seed_av_movie(dir.path());
    let output = dir.path().join("edited.hbx");

    let remove_id = Movie::open(&input, OpenMode::Read)
        .unwrap()
        .tracks()[1]
        .id();
    let batch = MutationBatch {
        track_edits: vec![TrackEdit::Remove(remove_id)],
        output: Some(output.clone()),
        ..MutationBatch::default()
    };
    let report = Orchestrator::default()
        .run(&input, OpenMode::ReadWrite, &batch)
        .unwrap();
    assert_eq!(report.output.as_deref(), Some(output.as_path()));

    assert_eq!(Movie::open(&input, OpenMode::Read).unwrap().track_count(), 2);
    assert_eq!(Movie::open(&output, OpenMode::Read).unwrap().track_count(), 1);
}

#[test]
fn untouched_movie_is_discarded_not_written() {
    let dir = tempfile::tempdir().unwrap();
    let input = seed_av_movie(dir.path());
    let before = std::fs::metadata(&input).unwrap().modified().unwrap();

    let report = Orchestrator::default()
        .run(&input, OpenMode::ReadWrite, &MutationBatch::default())
        .unwrap();
    assert!(!report.saved);
    assert!(report.output.is_none());
    assert_eq!(std::fs::metadata(&input).unwrap().modified().unwrap(), before);
}

#[test]
fn stage_failures_name_the_stage() {
    let dir = tempfile::tempdir().unwrap();
    let input = seed_av_movie(dir.path());
    let batch = MutationBatch {
        track_edits: vec![TrackEdit::Remove(hintbox_core::TrackId::new(99))],
        ..MutationBatch::default()
    };
    let err = Orchestrator::default()
        .run(&input, OpenMode::ReadWrite, &batch)
        .unwrap_err();
    match err {
        hintbox_core::Error::Stage { stage, .. } => assert_eq!(stage, "track-edits"),
        other => panic!("expected stage error, got {other}"),
    }
    // Nothing was committed.
    assert_eq!(Movie::open(&input, OpenMode::Read).unwrap().track_count(), 2);
}

#[test]
fn tight_interleave_only_after_hinting() {
    let dir = tempfile::tempdir().unwrap();
    let input = seed_av_movie(dir.path());
    let batch = MutationBatch {
        hint: Some(HintParams::default()),
        full_interleave: true,
        ..MutationBatch::default()
    };
    Orchestrator::default()
        .run(&input, OpenMode::ReadWrite, &batch)
        .unwrap();
    let reopened = Movie::open(&input, OpenMode::Read).unwrap();
    assert_eq!(reopened.storage_layout(), StorageLayout::Tight);

    // Without hinting the same request falls back to windowed interleaving.
    let dir2 = tempfile::tempdir().unwrap();
    let input2 = seed_av_movie(dir2.path());
    let batch = MutationBatch {
        full_interleave: true,
        ..MutationBatch::default()
    };
    Orchestrator::default()
        .run(&input2, OpenMode::ReadWrite, &batch)
        .unwrap();
    let reopened = Movie::open(&input2, OpenMode::Read).unwrap();
    assert_eq!(reopened.storage_layout(), StorageLayout::Interleaved);
}
