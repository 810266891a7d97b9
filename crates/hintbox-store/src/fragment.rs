//! Movie fragmentation.
//!
//! Fragmentation is recorded as a storage property: the movie carries the
//! fragment duration and the writer lays samples out fragment by fragment.
//! Fragmented movies cannot also be hinted; the orchestrator resolves that
//! conflict before calling in here.

use hintbox_core::{Error, ProgressSender, Result};

use crate::movie::Movie;

/// Shortest fragment duration accepted, in seconds.
pub const MIN_FRAGMENT_SECONDS: f64 = 0.5;

/// Mark the movie for fragmented storage with the given fragment duration.
pub fn fragment_movie(
    movie: &mut Movie,
    fragment_seconds: f64,
    progress: &ProgressSender,
) -> Result<()> {
    if !fragment_seconds.is_finite() || fragment_seconds < MIN_FRAGMENT_SECONDS {
        return Err(Error::InvalidRequest(format!(
            "fragment duration {fragment_seconds}s is below the {MIN_FRAGMENT_SECONDS}s minimum"
        )));
    }
    if movie.tracks().iter().any(|t| t.hint_info().is_some()) {
        return Err(Error::InvalidRequest(
            "movie carries hint tracks and cannot be fragmented".into(),
        ));
    }

    let duration_ms = (fragment_seconds * 1000.0).round() as u32;
    movie.set_fragmented(duration_ms);
    progress.send("Fragmenting", 1.0);
    tracing::info!("Fragmenting movie every {duration_ms} ms");
    Ok(())
}
