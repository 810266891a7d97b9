//! RTP hinting parameters shared by the synthesizer and the hint-track
//! encoder.

use serde::{Deserialize, Serialize};

/// First RTP payload type allocated during one synthesis run. Payload types
/// increase monotonically from here, one per hinted track.
pub const BASE_PAYLOAD_TYPE: u8 = 96;

/// Last dynamic RTP payload type (RFC 3551 dynamic range is 96..=127).
pub const LAST_PAYLOAD_TYPE: u8 = 127;

/// Size of the fixed RTP packet header, subtracted from the path MTU before
/// packetization.
pub const RTP_HEADER_SIZE: u32 = 12;

/// Packetization flag: interleave access units across packets.
pub const PCK_USE_INTERLEAVING: u32 = 1 << 0;
/// Packetization flag: aggregate multiple access units per packet.
pub const PCK_USE_MULTI: u32 = 1 << 1;
/// Packetization flag: force generic MPEG-4 transport.
pub const PCK_FORCE_MPEG4: u32 = 1 << 2;

/// Parameters for one hint synthesis run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HintParams {
    /// Path MTU in bytes, already reduced by [`RTP_HEADER_SIZE`].
    pub mtu_size: u32,
    /// Maximum packet duration in milliseconds (0 = unbounded).
    pub max_packet_time_ms: u32,
    /// RTP clock rate in Hz (0 = use each track's timescale).
    pub clock_rate_hz: u32,
    /// Base packetization flags applied to every track.
    pub base_flags: u32,
    /// Copy media data into the hint track instead of referencing it.
    pub copy_media_data: bool,
    /// Request packet interleaving.
    pub interleave: bool,
    /// Force a regular (non-ISMA) object descriptor in the session.
    pub regular_iod: bool,
}

impl Default for HintParams {
    fn default() -> Self {
        Self {
            mtu_size: 1500 - RTP_HEADER_SIZE,
            max_packet_time_ms: 0,
            clock_rate_hz: 0,
            base_flags: 0,
            copy_media_data: false,
            interleave: false,
            regular_iod: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_account_for_rtp_header() {
        let p = HintParams::default();
        assert_eq!(p.mtu_size, 1488);
        assert!(!p.copy_media_data);
        assert!(!p.regular_iod);
    }

    #[test]
    fn flags_are_distinct_bits() {
        assert_eq!(PCK_USE_INTERLEAVING & PCK_USE_MULTI, 0);
        assert_eq!(PCK_USE_MULTI & PCK_FORCE_MPEG4, 0);
    }
}
