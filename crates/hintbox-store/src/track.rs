//! Track model: samples, edit lists, elementary stream descriptors, ISMA
//! protection state, and hint-track payloads.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use hintbox_core::{MediaType, StreamType, TrackId};

use crate::meta::MetaStore;

/// One media sample: payload, duration in track timescale units, sync flag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sample {
    pub data: Bytes,
    pub duration: u32,
    pub sync: bool,
}

impl Sample {
    /// Create a sync sample with the given payload and duration.
    pub fn new(data: impl Into<Bytes>, duration: u32) -> Self {
        Self {
            data: data.into(),
            duration,
            sync: true,
        }
    }
}

/// Decoder configuration subset consulted by the pipeline.
///
/// When `decoder_specific_info` is present its leading byte carries the
/// profile-level indication extracted by the (external) bitstream parser.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecoderConfig {
    pub stream_type: StreamType,
    pub object_type_indication: u8,
    pub decoder_specific_info: Option<Bytes>,
}

impl DecoderConfig {
    /// Profile-level indication from the decoder-specific info, if any.
    #[must_use]
    pub fn profile_level(&self) -> Option<u8> {
        self.decoder_specific_info
            .as_ref()
            .and_then(|dsi| dsi.first().copied())
    }
}

/// Elementary stream descriptor. Only the first descriptor of a track is
/// consulted for hinting and profile decisions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Esd {
    pub es_id: u32,
    /// ID of the stream this one synchronizes to; 0 = self.
    pub ocr_es_id: u32,
    pub decoder_config: DecoderConfig,
}

impl Esd {
    /// Create a descriptor with no clock reference and no specific info.
    pub fn new(es_id: u32, stream_type: StreamType, object_type_indication: u8) -> Self {
        Self {
            es_id,
            ocr_es_id: 0,
            decoder_config: DecoderConfig {
                stream_type,
                object_type_indication,
                decoder_specific_info: None,
            },
        }
    }
}

/// Edit list segment kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditMode {
    /// Nothing is presented for the segment duration.
    Empty,
    /// Media plays normally for the segment duration.
    Normal,
}

/// One edit list entry. Durations are in movie timescale units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditSegment {
    pub duration: u64,
    pub mode: EditMode,
}

/// ISMA protection state of an encrypted track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Protection {
    pub scheme_uri: String,
    pub kms_uri: String,
}

/// Payload of one RTP hint packet: either copied into the hint track or a
/// reference into the source track's media data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum HintPayload {
    Inline(Bytes),
    Reference {
        track: TrackId,
        sample: u32,
        offset: u32,
        len: u32,
    },
}

/// One packet of a hint sample.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HintPacket {
    pub payload: HintPayload,
}

/// One hint sample: the packets covering one source media sample.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HintSample {
    pub packets: Vec<HintPacket>,
}

/// Packetization metadata of a synthesized hint track.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HintInfo {
    pub payload_type: u8,
    pub payload_name: String,
    pub mtu_size: u32,
    pub max_packet_time_ms: u32,
    pub flags: u32,
    pub bandwidth_kbps: u32,
    pub group: u32,
    pub priority: u8,
    pub copied_data: bool,
    pub samples: Vec<HintSample>,
    pub sdp_lines: Vec<String>,
}

/// A track inside a movie.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Track {
    pub(crate) id: TrackId,
    pub(crate) media_type: MediaType,
    pub(crate) timescale: u32,
    pub(crate) language: String,
    pub(crate) samples: Vec<Sample>,
    pub(crate) edits: Vec<EditSegment>,
    pub(crate) descriptors: Vec<Esd>,
    pub(crate) protection: Option<Protection>,
    /// For hint tracks: the media track this one packetizes.
    pub(crate) hint_source: Option<TrackId>,
    pub(crate) hint: Option<HintInfo>,
    pub(crate) meta: MetaStore,
}

impl Track {
    pub(crate) fn new(id: TrackId, media_type: MediaType, timescale: u32) -> Self {
        Self {
            id,
            media_type,
            timescale,
            language: "und".to_string(),
            samples: Vec::new(),
            edits: Vec::new(),
            descriptors: Vec::new(),
            protection: None,
            hint_source: None,
            hint: None,
            meta: MetaStore::default(),
        }
    }

    /// Stable track identifier.
    #[must_use]
    pub fn id(&self) -> TrackId {
        self.id
    }

    #[must_use]
    pub fn media_type(&self) -> MediaType {
        self.media_type
    }

    #[must_use]
    pub fn timescale(&self) -> u32 {
        self.timescale
    }

    /// ISO 639-2 language code ("und" when unset).
    #[must_use]
    pub fn language(&self) -> &str {
        &self.language
    }

    #[must_use]
    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    #[must_use]
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Media duration in track timescale units.
    #[must_use]
    pub fn duration(&self) -> u64 {
        self.samples.iter().map(|s| u64::from(s.duration)).sum()
    }

    /// The first elementary stream descriptor, if any.
    #[must_use]
    pub fn primary_descriptor(&self) -> Option<&Esd> {
        self.descriptors.first()
    }

    #[must_use]
    pub fn edits(&self) -> &[EditSegment] {
        &self.edits
    }

    #[must_use]
    pub fn protection(&self) -> Option<&Protection> {
        self.protection.as_ref()
    }

    #[must_use]
    pub fn is_protected(&self) -> bool {
        self.protection.is_some()
    }

    /// For hint tracks, the packetization metadata.
    #[must_use]
    pub fn hint_info(&self) -> Option<&HintInfo> {
        self.hint.as_ref()
    }

    /// For hint tracks, the source media track.
    #[must_use]
    pub fn hint_source(&self) -> Option<TrackId> {
        self.hint_source
    }

    #[must_use]
    pub fn meta(&self) -> &MetaStore {
        &self.meta
    }
}
