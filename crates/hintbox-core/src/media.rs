//! Media-domain enums and MPEG-4 constants for the mutation pipeline.
//!
//! All enums serialize in lowercase (via `serde(rename_all = "lowercase")`)
//! and implement `Display` manually for consistent string representation.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// MediaType
// ---------------------------------------------------------------------------

/// Media type of a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Visual,
    Audio,
    Text,
    Hint,
    /// Scene description (BIFS).
    Scene,
    /// Object descriptor stream.
    #[serde(rename = "od")]
    ObjectDescriptor,
    Other,
}

impl MediaType {
    /// Whether the track carries audio/visual/text media, i.e. survives
    /// system-track stripping.
    #[must_use]
    pub fn is_av(&self) -> bool {
        matches!(self, Self::Visual | Self::Audio | Self::Text)
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Visual => write!(f, "visual"),
            Self::Audio => write!(f, "audio"),
            Self::Text => write!(f, "text"),
            Self::Hint => write!(f, "hint"),
            Self::Scene => write!(f, "scene"),
            Self::ObjectDescriptor => write!(f, "od"),
            Self::Other => write!(f, "other"),
        }
    }
}

// ---------------------------------------------------------------------------
// StreamType (MPEG-4 Systems stream type codes)
// ---------------------------------------------------------------------------

/// MPEG-4 elementary stream type, as carried in a decoder configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamType {
    #[serde(rename = "od")]
    ObjectDescriptor,
    ClockReference,
    Scene,
    Visual,
    Audio,
    Mpeg7,
    Ipmp,
    Oci,
    MpegJ,
}

impl StreamType {
    /// The MPEG-4 Systems stream type code.
    #[must_use]
    pub fn code(&self) -> u8 {
        match self {
            Self::ObjectDescriptor => 0x01,
            Self::ClockReference => 0x02,
            Self::Scene => 0x03,
            Self::Visual => 0x04,
            Self::Audio => 0x05,
            Self::Mpeg7 => 0x06,
            Self::Ipmp => 0x07,
            Self::Oci => 0x08,
            Self::MpegJ => 0x09,
        }
    }

    /// Decode an MPEG-4 Systems stream type code.
    #[must_use]
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0x01 => Some(Self::ObjectDescriptor),
            0x02 => Some(Self::ClockReference),
            0x03 => Some(Self::Scene),
            0x04 => Some(Self::Visual),
            0x05 => Some(Self::Audio),
            0x06 => Some(Self::Mpeg7),
            0x07 => Some(Self::Ipmp),
            0x08 => Some(Self::Oci),
            0x09 => Some(Self::MpegJ),
            _ => None,
        }
    }
}

impl fmt::Display for StreamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ObjectDescriptor => write!(f, "od"),
            Self::ClockReference => write!(f, "clockreference"),
            Self::Scene => write!(f, "scene"),
            Self::Visual => write!(f, "visual"),
            Self::Audio => write!(f, "audio"),
            Self::Mpeg7 => write!(f, "mpeg7"),
            Self::Ipmp => write!(f, "ipmp"),
            Self::Oci => write!(f, "oci"),
            Self::MpegJ => write!(f, "mpegj"),
        }
    }
}

// ---------------------------------------------------------------------------
// Object type indications and profile constants
// ---------------------------------------------------------------------------

/// MPEG-4 Part 2 visual.
pub const OTI_MPEG4_VISUAL: u8 = 0x20;
/// AVC / H.264 visual.
pub const OTI_AVC_VISUAL: u8 = 0x21;
/// MPEG-4 AAC audio.
pub const OTI_MPEG4_AUDIO: u8 = 0x40;
/// MPEG-2 AAC Main profile audio.
pub const OTI_MPEG2_AAC_MAIN: u8 = 0x66;
/// MPEG-2 AAC Low Complexity profile audio.
pub const OTI_MPEG2_AAC_LC: u8 = 0x67;
/// MPEG-2 AAC Scalable Sampling Rate profile audio.
pub const OTI_MPEG2_AAC_SSR: u8 = 0x68;

/// Visual profile-level implied by an AVC stream.
pub const AVC_VISUAL_PROFILE: u8 = 0x15;

/// Profile indicator has not been computed yet.
pub const PROFILE_UNSPECIFIED: u8 = 0x00;
/// A stream of the category is present but defines no profile.
pub const PROFILE_UNDEFINED_STREAM: u8 = 0xFE;
/// No decoder capability required for the category.
pub const PROFILE_NOT_REQUIRED: u8 = 0xFF;

/// Profile/level indicator category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileCategory {
    #[serde(rename = "od")]
    ObjectDescriptor,
    Scene,
    Graphics,
    Audio,
    Visual,
    /// Interactivity / inline-scene flag.
    Inline,
}

impl fmt::Display for ProfileCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ObjectDescriptor => write!(f, "od"),
            Self::Scene => write!(f, "scene"),
            Self::Graphics => write!(f, "graphics"),
            Self::Audio => write!(f, "audio"),
            Self::Visual => write!(f, "visual"),
            Self::Inline => write!(f, "inline"),
        }
    }
}

// ---------------------------------------------------------------------------
// StorageLayout
// ---------------------------------------------------------------------------

/// Storage layout of a committed movie.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageLayout {
    /// Media data written in import order, metadata at the end.
    Flat,
    /// Metadata up front so playback can start before the download ends.
    Streamable,
    /// Time-windowed interleaving of all tracks.
    #[default]
    Interleaved,
    /// Sample-based (tight) interleaving, only meaningful after hinting.
    Tight,
}

impl fmt::Display for StorageLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flat => write!(f, "flat"),
            Self::Streamable => write!(f, "streamable"),
            Self::Interleaved => write!(f, "interleaved"),
            Self::Tight => write!(f, "tight"),
        }
    }
}

// ---------------------------------------------------------------------------
// Specification
// ---------------------------------------------------------------------------

/// The specification family a movie most closely matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Specification {
    /// ISMA-style audio/video presentation.
    Isma,
    /// Full MPEG-4 Systems presentation (scene and/or OD streams).
    Mpeg4,
    Unknown,
}

impl fmt::Display for Specification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Isma => write!(f, "isma"),
            Self::Mpeg4 => write!(f, "mpeg4"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

// ---------------------------------------------------------------------------
// OpenMode
// ---------------------------------------------------------------------------

/// How a movie is opened or created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpenMode {
    /// Read-only; any mutation is rejected at commit time.
    Read,
    /// Open an existing movie for editing.
    ReadWrite,
    /// Create a new movie with flat storage.
    CreateFlat,
    /// Create a new movie with interleaved storage.
    CreateInterleaved,
}

impl OpenMode {
    /// Whether this mode creates a new file rather than opening one.
    #[must_use]
    pub fn creates(&self) -> bool {
        matches!(self, Self::CreateFlat | Self::CreateInterleaved)
    }
}

impl fmt::Display for OpenMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read => write!(f, "read"),
            Self::ReadWrite => write!(f, "readwrite"),
            Self::CreateFlat => write!(f, "createflat"),
            Self::CreateInterleaved => write!(f, "createinterleaved"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_type_display_and_serde() {
        assert_eq!(MediaType::Visual.to_string(), "visual");
        assert_eq!(MediaType::ObjectDescriptor.to_string(), "od");
        let json = serde_json::to_string(&MediaType::ObjectDescriptor).unwrap();
        assert_eq!(json, r#""od""#);
        let back: MediaType = serde_json::from_str(&json).unwrap();
        assert_eq!(back, MediaType::ObjectDescriptor);
    }

    #[test]
    fn av_classification() {
        assert!(MediaType::Visual.is_av());
        assert!(MediaType::Audio.is_av());
        assert!(MediaType::Text.is_av());
        assert!(!MediaType::Hint.is_av());
        assert!(!MediaType::Scene.is_av());
        assert!(!MediaType::ObjectDescriptor.is_av());
    }

    #[test]
    fn stream_type_codes_roundtrip() {
        for code in 1u8..=9 {
            let st = StreamType::from_code(code).unwrap();
            assert_eq!(st.code(), code);
        }
        assert!(StreamType::from_code(0).is_none());
        assert!(StreamType::from_code(0x20).is_none());
    }

    #[test]
    fn profile_sentinels() {
        assert_eq!(PROFILE_UNSPECIFIED, 0x00);
        assert_eq!(PROFILE_UNDEFINED_STREAM, 0xFE);
        assert_eq!(PROFILE_NOT_REQUIRED, 0xFF);
    }

    #[test]
    fn storage_layout_default_and_display() {
        assert_eq!(StorageLayout::default(), StorageLayout::Interleaved);
        assert_eq!(StorageLayout::Tight.to_string(), "tight");
        assert_eq!(StorageLayout::Streamable.to_string(), "streamable");
    }

    #[test]
    fn open_mode_creates() {
        assert!(OpenMode::CreateFlat.creates());
        assert!(OpenMode::CreateInterleaved.creates());
        assert!(!OpenMode::Read.creates());
        assert!(!OpenMode::ReadWrite.creates());
    }

    #[test]
    fn specification_display() {
        assert_eq!(Specification::Isma.to_string(), "isma");
        assert_eq!(Specification::Mpeg4.to_string(), "mpeg4");
        assert_eq!(Specification::Unknown.to_string(), "unknown");
    }
}
