//! RTP hint-track encoder.
//!
//! An [`RtpHinter`] is an ephemeral synthesis context bound to one source
//! track: it packetizes the track's samples against the path MTU, estimates
//! the stream bandwidth, names the RTP payload, and finally materializes a
//! hint track inside the movie. Wire-level payload headers are out of scope;
//! the hint representation stays inside the container.

use hintbox_core::{
    Error, MediaType, ProgressSender, Result, StreamType, TrackId, OTI_AVC_VISUAL,
    OTI_MPEG4_VISUAL, PCK_USE_INTERLEAVING,
};

use crate::movie::Movie;
use crate::track::{HintInfo, HintPacket, HintPayload, HintSample};

/// Per-track settings resolved by the synthesizer before hinting.
#[derive(Debug, Clone)]
pub struct HinterSettings {
    pub mtu_size: u32,
    pub max_packet_time_ms: u32,
    pub clock_rate_hz: u32,
    pub flags: u32,
    pub payload_type: u8,
    pub copy_data: bool,
    pub group: u32,
    pub priority: u8,
}

/// Hint synthesis context for one source track.
#[derive(Debug)]
pub struct RtpHinter<'a> {
    movie: &'a mut Movie,
    track_index: usize,
    settings: HinterSettings,
    payload_name: String,
    clock_rate: u32,
    bandwidth_kbps: u32,
    hint_samples: Vec<HintSample>,
}

impl<'a> RtpHinter<'a> {
    /// Bind a hinter to the track at `track_index`, validating that the
    /// stream can be packetized at all.
    pub fn new(
        movie: &'a mut Movie,
        track_index: usize,
        settings: HinterSettings,
    ) -> Result<Self> {
        if settings.mtu_size == 0 {
            return Err(Error::InvalidRequest("MTU size must be non-zero".into()));
        }
        let track = movie.track(track_index)?;
        let (payload_name, default_rate) = resolve_payload(
            track.media_type(),
            track.primary_descriptor().map(|esd| {
                (
                    esd.decoder_config.stream_type,
                    esd.decoder_config.object_type_indication,
                )
            }),
            track.timescale(),
        )?;
        let clock_rate = if settings.clock_rate_hz > 0 {
            settings.clock_rate_hz
        } else {
            default_rate
        };
        Ok(Self {
            movie,
            track_index,
            settings,
            payload_name,
            clock_rate,
            bandwidth_kbps: 0,
            hint_samples: Vec::new(),
        })
    }

    /// The RTP payload name this track will be announced with.
    #[must_use]
    pub fn payload_name(&self) -> &str {
        &self.payload_name
    }

    /// Estimated bandwidth in kbps; valid after [`process`](Self::process).
    #[must_use]
    pub fn bandwidth_kbps(&self) -> u32 {
        self.bandwidth_kbps
    }

    /// Packetize the source track.
    pub fn process(&mut self, progress: &ProgressSender) -> Result<()> {
        let track = self.movie.track(self.track_index)?;
        let source_id = track.id();
        let mtu = self.settings.mtu_size as usize;
        let copy = self.settings.copy_data;

        let total = track.sample_count().max(1) as f32;
        let mut payload_bytes: u64 = 0;
        let mut packet_count: u64 = 0;

        for (sample_idx, sample) in track.samples().iter().enumerate() {
            let mut packets = Vec::new();
            let mut offset = 0usize;
            // A zero-length sample still occupies one packet.
            loop {
                let len = (sample.data.len() - offset).min(mtu);
                let payload = if copy {
                    HintPayload::Inline(sample.data.slice(offset..offset + len))
                } else {
                    HintPayload::Reference {
                        track: source_id,
                        sample: sample_idx as u32,
                        offset: offset as u32,
                        len: len as u32,
                    }
                };
                packets.push(HintPacket { payload });
                payload_bytes += len as u64;
                packet_count += 1;
                offset += len;
                if offset >= sample.data.len() {
                    break;
                }
            }
            self.hint_samples.push(HintSample { packets });
            progress.send("Hinting", (sample_idx as f32 + 1.0) / total);
        }

        // Payload plus the 12-byte RTP header per packet, over the media
        // duration, rounded up to whole kbps.
        let wire_bits = (payload_bytes + packet_count * u64::from(hintbox_core::RTP_HEADER_SIZE)) * 8;
        let duration = track.duration();
        let timescale = u64::from(track.timescale().max(1));
        self.bandwidth_kbps = if duration == 0 {
            (wire_bits / 1000) as u32
        } else {
            (wire_bits * timescale).div_ceil(duration * 1000) as u32
        };
        Ok(())
    }

    /// Materialize the hint track inside the movie and emit its media SDP.
    ///
    /// `has_iod` controls whether the media description references the
    /// session object descriptor via an ES ID attribute.
    pub fn finalize(self, has_iod: bool) -> Result<TrackId> {
        let source = self.movie.track(self.track_index)?;
        let source_id = source.id();
        let media_kind = match source.media_type() {
            MediaType::Visual => "video",
            MediaType::Audio => "audio",
            _ => "application",
        };
        let es_id = source.primary_descriptor().map(|esd| esd.es_id);

        let hint_id = self.movie.add_track(MediaType::Hint, self.clock_rate);
        let hint_index = self
            .movie
            .track_index(hint_id)
            .ok_or_else(|| Error::track_not_found(hint_id))?;

        let mut sdp_lines = vec![
            format!(
                "m={media_kind} 0 RTP/AVP {}",
                self.settings.payload_type
            ),
            format!(
                "a=rtpmap:{} {}/{}",
                self.settings.payload_type, self.payload_name, self.clock_rate
            ),
            format!("a=control:trackID={hint_id}"),
        ];
        if has_iod {
            if let Some(es_id) = es_id {
                sdp_lines.push(format!("a=mpeg4-esid:{es_id}"));
            }
        }
        if self.settings.group > 0 {
            sdp_lines.push(format!("a=mid:L{}", self.settings.group));
        }

        let track = self.movie.track_mut(hint_index)?;
        track.hint_source = Some(source_id);
        track.hint = Some(HintInfo {
            payload_type: self.settings.payload_type,
            payload_name: self.payload_name,
            mtu_size: self.settings.mtu_size,
            max_packet_time_ms: self.settings.max_packet_time_ms,
            flags: self.settings.flags,
            bandwidth_kbps: self.bandwidth_kbps,
            group: self.settings.group,
            priority: self.settings.priority,
            copied_data: self.settings.copy_data,
            samples: self.hint_samples,
            sdp_lines,
        });
        self.movie.mark_dirty();
        tracing::debug!(
            "Created hint track {hint_id} for track {source_id} ({} kbps)",
            self.bandwidth_kbps
        );
        Ok(hint_id)
    }

    /// Whether interleaved packetization was requested for this track.
    #[must_use]
    pub fn interleaved(&self) -> bool {
        self.settings.flags & PCK_USE_INTERLEAVING != 0
    }
}

/// Resolve the RTP payload name and default clock rate for a track.
fn resolve_payload(
    media_type: MediaType,
    descriptor: Option<(StreamType, u8)>,
    timescale: u32,
) -> Result<(String, u32)> {
    match descriptor {
        Some((StreamType::Visual, oti)) => {
            let name = match oti {
                OTI_MPEG4_VISUAL => "MP4V-ES",
                OTI_AVC_VISUAL => "H264",
                _ => "mpeg4-generic",
            };
            Ok((name.to_string(), 90000))
        }
        Some((StreamType::Audio, _)) => Ok(("mpeg4-generic".to_string(), timescale)),
        Some((StreamType::Scene | StreamType::ObjectDescriptor, _)) => {
            Ok(("mpeg4-generic".to_string(), 1000))
        }
        Some((other, _)) => Err(Error::UnsupportedStreamType(other.to_string())),
        None => match media_type {
            MediaType::Visual => Ok(("H263-1998".to_string(), 90000)),
            MediaType::Audio => Ok(("AMR".to_string(), 8000)),
            MediaType::Text => Ok(("3gpp-tt".to_string(), 1000)),
            other => Err(Error::UnsupportedStreamType(other.to_string())),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::track::{Esd, Sample};
    use hintbox_core::OpenMode;

    fn settings(mtu: u32, copy: bool) -> HinterSettings {
        HinterSettings {
            mtu_size: mtu,
            max_packet_time_ms: 0,
            clock_rate_hz: 0,
            flags: 0,
            payload_type: 96,
            copy_data: copy,
            group: 0,
            priority: 1,
        }
    }

    fn movie_with_visual(sample_len: usize, oti: u8) -> Movie {
        let mut movie = Movie::open("hint.hbx", OpenMode::CreateInterleaved).unwrap();
        let id = movie.add_track(MediaType::Visual, 90000);
        movie
            .add_sample(0, Sample::new(vec![7u8; sample_len], 90000))
            .unwrap();
        movie
            .set_descriptor(0, Esd::new(id.as_u32(), StreamType::Visual, oti))
            .unwrap();
        movie
    }

    #[test]
    fn packetizes_against_mtu() {
        let mut movie = movie_with_visual(2500, 0x20);
        let mut hinter = RtpHinter::new(&mut movie, 0, settings(1000, false)).unwrap();
        hinter.process(&ProgressSender::noop()).unwrap();
        assert_eq!(hinter.hint_samples.len(), 1);
        assert_eq!(hinter.hint_samples[0].packets.len(), 3);
    }

    #[test]
    fn copy_mode_inlines_payload() {
        let mut movie = movie_with_visual(100, 0x20);
        let mut hinter = RtpHinter::new(&mut movie, 0, settings(1000, true)).unwrap();
        hinter.process(&ProgressSender::noop()).unwrap();
        match &hinter.hint_samples[0].packets[0].payload {
            HintPayload::Inline(data) => assert_eq!(data.len(), 100),
            HintPayload::Reference { .. } => panic!("expected inline payload"),
        }
    }

    #[test]
    fn reference_mode_points_at_source() {
        let mut movie = movie_with_visual(100, 0x20);
        let source_id = movie.track(0).unwrap().id();
        let mut hinter = RtpHinter::new(&mut movie, 0, settings(1000, false)).unwrap();
        hinter.process(&ProgressSender::noop()).unwrap();
        match &hinter.hint_samples[0].packets[0].payload {
            HintPayload::Reference { track, sample, len, .. } => {
                assert_eq!(*track, source_id);
                assert_eq!(*sample, 0);
                assert_eq!(*len, 100);
            }
            HintPayload::Inline(_) => panic!("expected reference payload"),
        }
    }

    #[test]
    fn payload_names_follow_object_type() {
        let mut m1 = movie_with_visual(10, 0x20);
        let h1 = RtpHinter::new(&mut m1, 0, settings(1000, false)).unwrap();
        assert_eq!(h1.payload_name(), "MP4V-ES");

        let mut m2 = movie_with_visual(10, 0x21);
        let h2 = RtpHinter::new(&mut m2, 0, settings(1000, false)).unwrap();
        assert_eq!(h2.payload_name(), "H264");
    }

    #[test]
    fn descriptorless_audio_uses_amr() {
        let mut movie = Movie::open("amr.hbx", OpenMode::CreateFlat).unwrap();
        movie.add_track(MediaType::Audio, 8000);
        movie.add_sample(0, Sample::new(vec![0u8; 32], 160)).unwrap();
        let hinter = RtpHinter::new(&mut movie, 0, settings(1000, false)).unwrap();
        assert_eq!(hinter.payload_name(), "AMR");
    }

    #[test]
    fn clock_reference_stream_is_unsupported() {
        let mut movie = Movie::open("cr.hbx", OpenMode::CreateFlat).unwrap();
        let id = movie.add_track(MediaType::Other, 1000);
        movie.add_sample(0, Sample::new(vec![0u8; 4], 100)).unwrap();
        movie
            .set_descriptor(0, Esd::new(id.as_u32(), StreamType::ClockReference, 0))
            .unwrap();
        let err = RtpHinter::new(&mut movie, 0, settings(1000, false)).unwrap_err();
        assert!(matches!(err, Error::UnsupportedStreamType(_)));
    }

    #[test]
    fn finalize_creates_hint_track_with_sdp() {
        let mut movie = movie_with_visual(2500, 0x20);
        let mut hinter = RtpHinter::new(&mut movie, 0, settings(1000, false)).unwrap();
        hinter.process(&ProgressSender::noop()).unwrap();
        let bw = hinter.bandwidth_kbps();
        let hint_id = hinter.finalize(true).unwrap();

        assert_eq!(movie.track_count(), 2);
        let hint_index = movie.track_index(hint_id).unwrap();
        let hint = movie.track(hint_index).unwrap();
        assert_eq!(hint.media_type(), MediaType::Hint);
        let info = hint.hint_info().unwrap();
        assert_eq!(info.payload_type, 96);
        assert_eq!(info.bandwidth_kbps, bw);
        assert!(info.sdp_lines.iter().any(|l| l.starts_with("m=video")));
        assert!(info
            .sdp_lines
            .iter()
            .any(|l| l.contains("a=rtpmap:96 MP4V-ES/90000")));
        assert!(info.sdp_lines.iter().any(|l| l.starts_with("a=mpeg4-esid:")));
    }

    #[test]
    fn bandwidth_counts_rtp_headers() {
        // 1 second of media, 2500 payload bytes in 3 packets.
        let mut movie = movie_with_visual(2500, 0x20);
        let mut hinter = RtpHinter::new(&mut movie, 0, settings(1000, false)).unwrap();
        hinter.process(&ProgressSender::noop()).unwrap();
        // (2500 + 3*12) * 8 bits over 1s = 20288 bits -> ceil to 21 kbps.
        assert_eq!(hinter.bandwidth_kbps(), 21);
    }

    #[test]
    fn zero_mtu_is_rejected() {
        let mut movie = movie_with_visual(10, 0x20);
        assert!(RtpHinter::new(&mut movie, 0, settings(0, false)).is_err());
    }
}
