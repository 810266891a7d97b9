//! hintbox-pipeline: the ordered movie-mutation pipeline.
//!
//! Mutation requests are collected into a [`MutationBatch`] and executed by
//! the [`Orchestrator`] in a fixed stage order, independent of the order the
//! requests were supplied:
//!
//! ```text
//! Open -> Ingest -> StripSystemTracks -> MetaEdits -> TrackEdits
//!      -> Convert -> Crypt -> [Hint | Fragment] -> StorageModeSelect
//!      -> SessionFinalize -> Commit
//! ```
//!
//! The individual stages are also usable on their own:
//!
//! - [`clock::setup_clock_references`] -- shared timing reference selection
//! - [`profiles::strip_system_tracks`] -- system-track stripping and
//!   profile-level rewriting
//! - [`hint::synthesize_hints`] -- RTP hint-track synthesis

pub mod clock;
pub mod hint;
pub mod orchestrator;
pub mod profiles;
pub mod request;

pub use hint::HintOutcome;
pub use orchestrator::{Orchestrator, PipelineReport, Stage};
pub use request::{
    chapters_from_file, ConvertKind, CryptAction, MetaEdit, MetaScopeSpec, MutationBatch, SdpLine,
    TrackEdit, TrackSelector, MAX_REQUESTS_PER_KIND,
};
