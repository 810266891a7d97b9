//! Container conversions: ISMA 1.0 and 3GP rewrites.

use hintbox_core::{Error, MediaType, ProfileCategory, Result, PROFILE_NOT_REQUIRED};

use crate::movie::Movie;

/// Rewrite the movie into ISMA 1.0 shape.
///
/// The root object descriptor is rebuilt to reference exactly the audio and
/// video tracks, profile indicators outside audio/visual are cleared, and the
/// ISMA brand is applied. With `renumber_es_ids` the elementary stream IDs
/// are reassigned sequentially from 1.
pub fn make_isma(movie: &mut Movie, renumber_es_ids: bool) -> Result<()> {
    if !movie.is_single_av() {
        return Err(Error::InvalidRequest(
            "ISMA conversion requires exactly one audio and one video track".into(),
        ));
    }

    let av: Vec<_> = movie
        .tracks()
        .iter()
        .filter(|t| matches!(t.media_type(), MediaType::Audio | MediaType::Visual))
        .map(|t| t.id())
        .collect();
    movie.set_root_od(Some(av));

    if renumber_es_ids {
        let mut next = 1u32;
        for index in 0..movie.track_count() {
            let track = movie.track_mut(index)?;
            for esd in &mut track.descriptors {
                esd.es_id = next;
                next += 1;
            }
        }
    }

    movie.set_profile_indication(ProfileCategory::ObjectDescriptor, PROFILE_NOT_REQUIRED);
    movie.set_profile_indication(ProfileCategory::Scene, PROFILE_NOT_REQUIRED);
    movie.set_profile_indication(ProfileCategory::Graphics, PROFILE_NOT_REQUIRED);
    movie.set_profile_indication(ProfileCategory::Inline, 0);

    movie.set_major_brand("isma");
    movie.add_compatible_brand("mp42");
    tracing::info!("Converted movie to ISMA 1.0");
    Ok(())
}

/// Rewrite the movie into 3GP shape.
///
/// Systems tracks and the root object descriptor do not exist in 3GP, so
/// scene and object descriptor tracks are dropped along with the descriptor
/// itself, and the 3GP brand is applied.
pub fn make_3gp(movie: &mut Movie) -> Result<()> {
    let mut index = 0;
    while index < movie.track_count() {
        let kind = movie.track(index)?.media_type();
        if matches!(kind, MediaType::Scene | MediaType::ObjectDescriptor) {
            movie.remove_track(index)?;
        } else {
            index += 1;
        }
    }
    movie.set_root_od(None);

    movie.set_major_brand("3gp4");
    movie.add_compatible_brand("isom");
    tracing::info!("Converted movie to 3GP");
    Ok(())
}
