//! Clock reference synchronization.
//!
//! Picks one systems track from the root object descriptor as the shared
//! timing reference and points every other stream's clock reference at it.
//! Best-effort: with no candidate, or a single-track movie, nothing happens.

use hintbox_core::{MediaType, Result};
use hintbox_store::Movie;

/// Rewrite every stream's clock reference onto a shared root-OD systems
/// track. Returns the number of descriptors rewritten.
pub fn setup_clock_references(movie: &mut Movie) -> Result<usize> {
    if movie.track_count() < 2 {
        return Ok(0);
    }

    let mut candidate = None;
    for index in 0..movie.track_count() {
        let kind = movie.track(index)?.media_type();
        if !matches!(kind, MediaType::Scene | MediaType::ObjectDescriptor) {
            continue;
        }
        if movie.is_track_in_root_od(index)? {
            candidate = Some(index);
            break;
        }
    }
    let Some(reference_index) = candidate else {
        return Ok(0);
    };

    let reference = movie.track(reference_index)?;
    let ocr_id = reference
        .primary_descriptor()
        .map(|esd| esd.es_id)
        .unwrap_or_else(|| reference.id().as_u32());

    let mut rewritten = 0usize;
    for index in 0..movie.track_count() {
        if index == reference_index {
            continue;
        }
        let Some(esd) = movie.track(index)?.primary_descriptor() else {
            continue;
        };
        if esd.ocr_es_id == ocr_id {
            continue;
        }
        let mut updated = esd.clone();
        updated.ocr_es_id = ocr_id;
        movie.set_descriptor(index, updated)?;
        rewritten += 1;
    }

    if rewritten > 0 {
        tracing::debug!("Synchronized {rewritten} stream(s) to clock reference {ocr_id}");
    }
    Ok(rewritten)
}
