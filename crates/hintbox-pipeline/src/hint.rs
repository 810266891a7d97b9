//! Hint synthesis: decides, per track, whether to hint, group, or embed.

use hintbox_core::{
    Error, HintParams, MediaType, ProgressSender, Result, Specification, StreamType,
    BASE_PAYLOAD_TYPE, LAST_PAYLOAD_TYPE, PCK_USE_INTERLEAVING,
};
use hintbox_store::hinter::{HinterSettings, RtpHinter};
use hintbox_store::{IodMode, Movie};

/// Result of one synthesis run.
#[derive(Debug, Default)]
pub struct HintOutcome {
    pub hinted_tracks: u32,
    pub embedded_tracks: u32,
    pub bandwidth_kbps: u32,
    pub warnings: Vec<String>,
}

/// Synthesize hint tracks for every eligible media track of the movie.
///
/// Presentations with exactly one audio and one video track share RTP
/// session group 2 (video priority 2, audio priority 1); any other track
/// gets its own group. Tracks that belong to the root object descriptor and
/// carry a single small sample are embedded into the session description
/// instead of hinted. After the first successful hint track, per-track
/// failures are logged and skipped rather than aborting the run.
pub fn synthesize_hints(
    movie: &mut Movie,
    params: &HintParams,
    progress: &ProgressSender,
) -> Result<HintOutcome> {
    let has_iod = movie.has_root_od() && movie.root_od_stream_count() > 0;
    let isma_like = movie.guess_specification() == Specification::Isma;
    let single_av = movie.is_single_av();

    // The first systems track of the root OD becomes the default sync track.
    for index in 0..movie.track_count() {
        let kind = movie.track(index)?.media_type();
        if matches!(kind, MediaType::Scene | MediaType::ObjectDescriptor)
            && movie.is_track_in_root_od(index)?
        {
            movie.set_default_sync_track(index)?;
            break;
        }
    }

    let mut outcome = HintOutcome::default();
    let mut next_group: u32 = if single_av { 3 } else { 1 };
    let mut prev_ocr: Option<u32> = None;
    let mut single_clock = true;

    let original_count = movie.track_count();
    for index in 0..original_count {
        let track = movie.track(index)?;
        let media_type = track.media_type();
        if track.sample_count() == 0 || media_type == MediaType::Hint {
            continue;
        }
        if isma_like
            && !matches!(
                media_type,
                MediaType::Audio | MediaType::Visual | MediaType::Text
            )
        {
            continue;
        }

        // One group per considered track, burned even when the track ends up
        // embedded or unhintable.
        let (group, priority) = match media_type {
            MediaType::Visual if single_av => (2, 2),
            MediaType::Audio if single_av => (2, 1),
            _ => {
                let g = next_group;
                next_group += 1;
                (g, 1)
            }
        };

        let mut copy_data = params.copy_media_data;
        let mut has_esd = false;
        if let Some(esd) = track.primary_descriptor() {
            has_esd = true;
            // A zero OCR ES id means the stream clocks itself off its own
            // elementary stream.
            let clock_id = if esd.ocr_es_id != 0 {
                esd.ocr_es_id
            } else {
                esd.es_id
            };
            match prev_ocr {
                None if clock_id != 0 => prev_ocr = Some(clock_id),
                Some(previous) if esd.ocr_es_id != 0 && previous != esd.ocr_es_id => {
                    single_clock = false;
                }
                _ => {}
            }
            // Object descriptor samples must never be referenced by pointer
            // into the original media data.
            if esd.decoder_config.stream_type == StreamType::ObjectDescriptor {
                copy_data = true;
            }
        }

        // Single-sample root-OD streams go straight into the session
        // description when they fit.
        if has_esd
            && !params.regular_iod
            && track.sample_count() == 1
            && movie.is_track_in_root_od(index)?
        {
            match movie.embed_sample_in_session(index) {
                Ok(()) => {
                    outcome.embedded_tracks += 1;
                    continue;
                }
                Err(Error::SizeLimitExceeded { .. }) => {}
                Err(e) => return Err(e),
            }
        }

        let mut flags = params.base_flags;
        if params.interleave {
            flags |= PCK_USE_INTERLEAVING;
        }
        let payload_type = u32::from(BASE_PAYLOAD_TYPE) + outcome.hinted_tracks;
        if payload_type > u32::from(LAST_PAYLOAD_TYPE) {
            return Err(Error::InvalidRequest(format!(
                "no dynamic RTP payload types left after {} hinted tracks",
                outcome.hinted_tracks
            )));
        }
        let settings = HinterSettings {
            mtu_size: params.mtu_size,
            max_packet_time_ms: params.max_packet_time_ms,
            clock_rate_hz: params.clock_rate_hz,
            flags,
            payload_type: payload_type as u8,
            copy_data,
            group,
            priority,
        };

        match hint_one_track(movie, index, settings, has_iod, progress) {
            Ok(bandwidth) => {
                outcome.hinted_tracks += 1;
                outcome.bandwidth_kbps += bandwidth;
            }
            Err(e) if outcome.hinted_tracks > 0 => {
                tracing::warn!("Skipping unhintable track at index {index}: {e}");
                outcome
                    .warnings
                    .push(format!("track at index {index} was not hinted: {e}"));
            }
            Err(e) => return Err(e),
        }
    }

    let iod_mode = if !has_iod {
        IodMode::None
    } else if params.regular_iod {
        IodMode::Regular
    } else {
        IodMode::Isma
    };
    movie.finalize_hint_session(iod_mode, outcome.bandwidth_kbps);

    if !single_clock {
        let warning =
            "streams use multiple clock references; some servers may refuse the presentation"
                .to_string();
        tracing::warn!("{warning}");
        outcome.warnings.push(warning);
    }
    Ok(outcome)
}

fn hint_one_track(
    movie: &mut Movie,
    index: usize,
    settings: HinterSettings,
    has_iod: bool,
    progress: &ProgressSender,
) -> Result<u32> {
    let mut hinter = RtpHinter::new(movie, index, settings)?;
    hinter.process(progress)?;
    let bandwidth = hinter.bandwidth_kbps();
    tracing::debug!(
        "Packetized track {index}: {bandwidth} kbps, interleaving {}",
        if hinter.interleaved() { "on" } else { "off" }
    );
    hinter.finalize(has_iod)?;
    Ok(bandwidth)
}
