//! DCA framing.
//!
//! ```text
//! DCA0:  [i16 len][opus frame][i16 len][opus frame]...
//! DCA1:  "DCA1" [i32 json len][json metadata] then DCA0 body
//! ```
//!
//! All integers are little-endian.

use super::{AudioClip, AudioError};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use serde_json::json;

/// Magic prefix of a DCA1 file.
pub const DCA1_MAGIC: &[u8; 4] = b"DCA1";

/// Decode a DCA0 or DCA1 payload into its Opus frames.
///
/// A truncated trailing frame ends the clip, as a partially written file is
/// still playable up to that point.
pub fn decode(mut data: Bytes) -> Result<AudioClip, AudioError> {
    let total = data.len();

    if data.starts_with(DCA1_MAGIC) {
        data.advance(DCA1_MAGIC.len());
        if data.remaining() < 4 {
            return Err(AudioError::InvalidHeader("missing metadata length".into()));
        }
        let meta_len = data.get_i32_le();
        let meta_len = usize::try_from(meta_len)
            .map_err(|_| AudioError::InvalidHeader(format!("negative metadata length {meta_len}")))?;
        if data.remaining() < meta_len {
            return Err(AudioError::InvalidHeader("metadata exceeds file size".into()));
        }
        data.advance(meta_len);
    }

    let mut frames = Vec::new();
    while data.remaining() >= 2 {
        let offset = total - data.remaining();
        let length = data.get_i16_le();
        if length <= 0 {
            return Err(AudioError::InvalidFrame { offset, length });
        }
        let length = length as usize;
        if data.remaining() < length {
            break;
        }
        frames.push(data.split_to(length));
    }

    if frames.is_empty() {
        return Err(AudioError::NoFrames);
    }
    Ok(AudioClip::new(frames))
}

/// DCA1 header describing a 48kHz stereo Opus stream.
pub fn dca1_header() -> Bytes {
    let metadata = json!({
        "dca": {
            "version": 1,
            "tool": {
                "name": env!("CARGO_PKG_NAME"),
                "version": env!("CARGO_PKG_VERSION"),
                "url": null,
                "author": null
            }
        },
        "opus": {
            "mode": "voip",
            "sample_rate": 48000,
            "frame_size": 960,
            "abr": null,
            "vbr": true,
            "channels": 2
        },
        "info": null,
        "origin": null,
        "extra": null
    })
    .to_string();

    let mut header = BytesMut::with_capacity(8 + metadata.len());
    header.put_slice(DCA1_MAGIC);
    header.put_i32_le(metadata.len() as i32);
    header.put_slice(metadata.as_bytes());
    header.freeze()
}

/// Length-prefix a single frame for a DCA stream.
pub fn encode_frame(frame: &[u8]) -> Result<Bytes, AudioError> {
    let len = i16::try_from(frame.len()).map_err(|_| AudioError::FrameTooLarge(frame.len()))?;
    let mut out = BytesMut::with_capacity(2 + frame.len());
    out.put_i16_le(len);
    out.put_slice(frame);
    Ok(out.freeze())
}
