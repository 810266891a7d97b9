//! Profile-level rewriting and system-track stripping.
//!
//! The two always run together: non-AV tracks are removed, and the
//! container-level profile indicators are recomputed from the descriptors of
//! the tracks that remain. Removal is a two-pass filter so no index
//! arithmetic has to account for tracks shifting into removed slots.

use hintbox_core::{
    MediaType, ProfileCategory, Result, StreamType, AVC_VISUAL_PROFILE, OTI_AVC_VISUAL,
    OTI_MPEG2_AAC_LC, OTI_MPEG2_AAC_MAIN, OTI_MPEG2_AAC_SSR, OTI_MPEG4_AUDIO, OTI_MPEG4_VISUAL,
    PROFILE_NOT_REQUIRED, PROFILE_UNDEFINED_STREAM, PROFILE_UNSPECIFIED,
};
use hintbox_store::Movie;

/// Remove every track that is not visual, audio, or text, and recompute the
/// audio/visual profile indicators from the survivors. Returns the number of
/// tracks removed.
pub fn strip_system_tracks(movie: &mut Movie) -> Result<usize> {
    movie.set_profile_indication(ProfileCategory::Audio, PROFILE_UNSPECIFIED);
    movie.set_profile_indication(ProfileCategory::Visual, PROFILE_UNSPECIFIED);
    // Keep the root OD alive while tracks leave it.
    movie.set_profile_indication(ProfileCategory::ObjectDescriptor, 1);

    let removals: Vec<usize> = (0..movie.track_count())
        .filter(|&i| {
            !matches!(
                movie.tracks()[i].media_type(),
                MediaType::Visual | MediaType::Audio | MediaType::Text
            )
        })
        .collect();
    for &index in removals.iter().rev() {
        let removed = movie.remove_track(index)?;
        tracing::debug!("Removed {} track {}", removed.media_type(), removed.id());
    }

    for index in 0..movie.track_count() {
        if movie.is_track_in_root_od(index)? {
            movie.remove_track_from_root_od(index)?;
        }
        check_media_profile(movie, index)?;
    }

    for category in [ProfileCategory::Audio, ProfileCategory::Visual] {
        if movie.profile_indication(category) == PROFILE_UNSPECIFIED {
            movie.set_profile_indication(category, PROFILE_NOT_REQUIRED);
        }
    }
    movie.set_profile_indication(ProfileCategory::ObjectDescriptor, PROFILE_NOT_REQUIRED);
    movie.set_profile_indication(ProfileCategory::Scene, PROFILE_NOT_REQUIRED);
    movie.set_profile_indication(ProfileCategory::Graphics, PROFILE_NOT_REQUIRED);
    movie.set_profile_indication(ProfileCategory::Inline, 0);

    Ok(removals.len())
}

/// Raise the stored audio or visual profile indicator to cover the track's
/// stream, from its primary descriptor.
pub fn check_media_profile(movie: &mut Movie, index: usize) -> Result<()> {
    let Some(esd) = movie.track(index)?.primary_descriptor() else {
        return Ok(());
    };
    let oti = esd.decoder_config.object_type_indication;
    let (category, implied) = match esd.decoder_config.stream_type {
        StreamType::Visual => {
            let level = match oti {
                OTI_MPEG4_VISUAL => esd.decoder_config.profile_level(),
                OTI_AVC_VISUAL => Some(AVC_VISUAL_PROFILE),
                _ => None,
            };
            (ProfileCategory::Visual, level)
        }
        StreamType::Audio => {
            let level = match oti {
                OTI_MPEG4_AUDIO | OTI_MPEG2_AAC_MAIN | OTI_MPEG2_AAC_LC | OTI_MPEG2_AAC_SSR => {
                    esd.decoder_config.profile_level()
                }
                _ => None,
            };
            (ProfileCategory::Audio, level)
        }
        _ => return Ok(()),
    };
    let current = movie.profile_indication(category);
    match implied {
        Some(level) if level > current => movie.set_profile_indication(category, level),
        // An unknown codec marks the category only while no concrete
        // level has claimed it.
        None if current == PROFILE_UNSPECIFIED => {
            movie.set_profile_indication(category, PROFILE_UNDEFINED_STREAM);
        }
        _ => {}
    }
    Ok(())
}
