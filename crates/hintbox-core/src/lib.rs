//! hintbox-core: shared types, IDs, errors, and media-domain enums.
//!
//! This crate is the foundational dependency for the other hintbox crates,
//! providing type-safe identifiers, a unified error type, the MPEG-4
//! stream/profile constants the mutation pipeline reasons about, and the
//! RTP hinting parameter types.

pub mod error;
pub mod hint;
pub mod ids;
pub mod media;
pub mod progress;

// Re-export the most commonly used items at the crate root.
pub use error::{Error, Result};
pub use hint::*;
pub use ids::*;
pub use media::*;
pub use progress::ProgressSender;
