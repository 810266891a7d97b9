//! hintbox-store: the movie store collaborator.
//!
//! This crate provides:
//!
//! - **[`Movie`]** -- an opened container instance: tracks, descriptors,
//!   root object descriptor, profile indicators, session metadata, brands,
//!   chapters, storage layout, and a pending-mutation flag.
//! - **Persistence** -- an opaque serialized representation (magic header +
//!   bincode), opened and committed through [`Movie::open`] / [`Movie::write`].
//! - **[`RtpHinter`]** -- the hint-track encoder: packetizes one media track
//!   into a hint track, estimating bandwidth and naming the RTP payload.
//! - **Session assembly** ([`session`]) -- SDP lines, inline sample
//!   embedding, and object-descriptor modes for hinted presentations.
//! - **[`MediaImporter`]** -- the ingest collaborator trait, with
//!   [`RawImporter`] for raw byte sources.
//! - **Converters and protection** ([`convert`], [`crypt`]) -- ISMA / 3GP
//!   brand rewrites and ISMA stream protection.
//! - **[`CommitTarget`]** -- default output naming and atomic input
//!   replacement.

pub mod commit;
pub mod convert;
pub mod crypt;
pub mod fragment;
pub mod hinter;
pub mod importer;
pub mod meta;
pub mod movie;
pub mod session;
pub mod track;

// Re-export key types at the crate root.
pub use commit::CommitTarget;
pub use crypt::CryptSpec;
pub use hinter::{HinterSettings, RtpHinter};
pub use importer::{ImportOptions, MediaImporter, RawImporter};
pub use meta::{MetaItem, MetaScope, MetaStore};
pub use movie::{Chapter, Movie};
pub use session::{IodMode, SessionInfo};
pub use track::{DecoderConfig, EditMode, EditSegment, Esd, Protection, Sample, Track};
