//! Session-level metadata for hinted presentations: SDP lines, the object
//! descriptor announced to clients, and inline-embedded single samples.

use base64::Engine as _;
use serde::{Deserialize, Serialize};

use hintbox_core::{Error, Result, StreamType, TrackId};

use crate::movie::Movie;

/// How the root object descriptor is represented in the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IodMode {
    /// No root object descriptor existed.
    None,
    /// Full (non-ISMA) object descriptor.
    Regular,
    /// ISMA-reduced object descriptor.
    Isma,
}

impl std::fmt::Display for IodMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Regular => write!(f, "regular"),
            Self::Isma => write!(f, "isma"),
        }
    }
}

/// A single sample embedded inline in the session description instead of
/// being hinted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddedStream {
    pub track: TrackId,
    pub stream_type: StreamType,
    /// Base64-expanded sample payload.
    pub payload_b64: String,
}

/// The session object descriptor after finalization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionIod {
    pub mode: IodMode,
    pub payload_b64: String,
    pub bandwidth_kbps: u32,
}

/// Session-level metadata accumulated during hint synthesis.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionInfo {
    /// Session-scoped SDP lines.
    pub sdp_lines: Vec<String>,
    /// Finalized object descriptor, if any.
    pub iod: Option<SessionIod>,
    /// Samples embedded inline instead of hinted.
    pub embedded: Vec<EmbeddedStream>,
}

impl SessionInfo {
    /// Whether the session carries no content at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sdp_lines.is_empty() && self.iod.is_none() && self.embedded.is_empty()
    }
}

/// Base64 payload ceiling for object-descriptor and scene streams.
const EMBED_LIMIT_SYSTEMS: usize = 2048;
/// Base64 payload ceiling for audio/visual/text elementary streams.
const EMBED_LIMIT_MEDIA: usize = 1024;

/// The descriptor size limit applicable to inline embedding for a stream
/// type; zero means the type is never embeddable.
#[must_use]
pub fn embed_limit(stream_type: StreamType) -> usize {
    match stream_type {
        StreamType::ObjectDescriptor | StreamType::Scene => EMBED_LIMIT_SYSTEMS,
        StreamType::Audio | StreamType::Visual => EMBED_LIMIT_MEDIA,
        _ => 0,
    }
}

/// Whether a sample of `data_len` bytes fits inline for the given stream
/// type, accounting for the 33% base64 expansion.
#[must_use]
pub fn can_embed_sample(data_len: usize, stream_type: StreamType) -> bool {
    let limit = embed_limit(stream_type);
    if limit == 0 {
        return false;
    }
    let inflated = data_len + data_len / 3;
    inflated <= limit
}

impl Movie {
    /// Embed the single sample of the track at `index` inline in the session
    /// description.
    ///
    /// # Errors
    ///
    /// Fails when the track has no descriptor, does not have exactly one
    /// sample, or the base64-expanded sample exceeds the descriptor limit.
    pub fn embed_sample_in_session(&mut self, index: usize) -> Result<()> {
        let track = self.track(index)?;
        let esd = track
            .primary_descriptor()
            .ok_or_else(|| Error::DescriptorMissing(format!("track {}", track.id())))?;
        let stream_type = esd.decoder_config.stream_type;
        if track.sample_count() != 1 {
            return Err(Error::InvalidRequest(format!(
                "track {} has {} samples; only single-sample tracks can be embedded",
                track.id(),
                track.sample_count()
            )));
        }
        let sample = &track.samples()[0];
        if !can_embed_sample(sample.data.len(), stream_type) {
            let inflated = sample.data.len() + sample.data.len() / 3;
            return Err(Error::size_limit(
                format!("track {} sample", track.id()),
                inflated,
                embed_limit(stream_type),
            ));
        }
        let id = track.id();
        let payload_b64 = base64::engine::general_purpose::STANDARD.encode(&sample.data);
        self.session_mut().embedded.push(EmbeddedStream {
            track: id,
            stream_type,
            payload_b64,
        });
        tracing::info!("Embedded single sample of track {id} in session description");
        Ok(())
    }

    /// Finalize the hinted session: record the object-descriptor mode and the
    /// aggregate bandwidth, and emit the session-level SDP.
    pub fn finalize_hint_session(&mut self, mode: IodMode, bandwidth_kbps: u32) {
        let iod = match mode {
            IodMode::None => None,
            IodMode::Regular | IodMode::Isma => {
                let members: Vec<String> = self
                    .tracks()
                    .iter()
                    .filter(|t| {
                        self.track_index(t.id())
                            .and_then(|i| self.is_track_in_root_od(i).ok())
                            .unwrap_or(false)
                    })
                    .map(|t| t.id().to_string())
                    .collect();
                let descriptor = format!(
                    "iod mode={mode} bw={bandwidth_kbps} streams=[{}]",
                    members.join(",")
                );
                Some(SessionIod {
                    mode,
                    payload_b64: base64::engine::general_purpose::STANDARD
                        .encode(descriptor.as_bytes()),
                    bandwidth_kbps,
                })
            }
        };
        let session = self.session_mut();
        if bandwidth_kbps > 0 {
            session.sdp_lines.push(format!("b=AS:{bandwidth_kbps}"));
        }
        if let Some(iod) = &iod {
            session.sdp_lines.push(format!(
                "a=mpeg4-iod:\"data:application/mpeg4-iod;base64,{}\"",
                iod.payload_b64
            ));
        }
        session.iod = iod;
    }

    /// Append a session-scoped SDP line.
    pub fn sdp_add_session_line(&mut self, line: &str) {
        self.session_mut().sdp_lines.push(line.to_string());
    }

    /// Append a media-scoped SDP line to the hint track at `index`.
    pub fn sdp_add_track_line(&mut self, index: usize, line: &str) -> Result<()> {
        let track = self.track_mut(index)?;
        let hint = track.hint.as_mut().ok_or_else(|| {
            Error::InvalidRequest(format!("track {} is not a hint track", track.id))
        })?;
        hint.sdp_lines.push(line.to_string());
        self.mark_dirty();
        Ok(())
    }
}
