//! ConnectRPC frame: `[flags:u8][length:u32-be][payload:length bytes]`,
//! gzip-compressed when the request carries 3 or more messages.

use std::io::{Read, Write};

use bytes::Bytes;
use cgate_provider_core::CursorFrameFlags;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

pub fn gzip(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}

pub fn gunzip(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut decoder = GzDecoder::new(data);
    let mut out = Vec::new();
    decoder.read_to_end(&mut out)?;
    Ok(out)
}

/// Frames one request payload, compressing it when `message_count >= 3`.
pub fn encode_frame(payload: &[u8], message_count: usize) -> Bytes {
    let (flags, body) = if message_count >= 3 {
        match gzip(payload) {
            Ok(compressed) => (CursorFrameFlags::GZIP, compressed),
            Err(_) => (CursorFrameFlags::RAW, payload.to_vec()),
        }
    } else {
        (CursorFrameFlags::RAW, payload.to_vec())
    };
    let mut out = Vec::with_capacity(body.len() + 5);
    out.push(flags);
    out.extend_from_slice(&(body.len() as u32).to_be_bytes());
    out.extend_from_slice(&body);
    Bytes::from(out)
}

#[derive(Debug)]
pub struct DecodedFrame {
    pub flags: u8,
    pub payload: Vec<u8>,
}

/// Accumulates bytes arriving over a streamed HTTP response and yields
/// complete ConnectRPC frames, tolerating an incomplete trailing frame.
#[derive(Default)]
pub struct FrameDecoder {
    buf: Vec<u8>,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Drains every complete frame currently buffered.
    pub fn drain_frames(&mut self) -> Vec<DecodedFrame> {
        let mut frames = Vec::new();
        let mut consumed = 0;
        loop {
            let remaining = &self.buf[consumed..];
            if remaining.len() < 5 {
                break;
            }
            let flags = remaining[0];
            let length = u32::from_be_bytes(remaining[1..5].try_into().unwrap()) as usize;
            if remaining.len() < 5 + length {
                break;
            }
            let raw_payload = &remaining[5..5 + length];
            let payload = if flags & 0x03 != 0 {
                match gunzip(raw_payload) {
                    Ok(decompressed) => decompressed,
                    Err(err) => {
                        tracing::warn!(event = "cursor_frame_gunzip_failed", error = %err);
                        raw_payload.to_vec()
                    }
                }
            } else {
                raw_payload.to_vec()
            };
            frames.push(DecodedFrame { flags, payload });
            consumed += 5 + length;
        }
        self.buf.drain(..consumed);
        frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_uncompressed_frame_below_three_messages() {
        let frame = encode_frame(b"hello", 1);
        let mut decoder = FrameDecoder::new();
        decoder.push(&frame);
        let frames = decoder.drain_frames();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].flags, CursorFrameFlags::RAW);
        assert_eq!(frames[0].payload, b"hello");
    }

    #[test]
    fn round_trips_gzip_frame_at_three_messages() {
        let frame = encode_frame(b"hello world this is compressible", 3);
        let mut decoder = FrameDecoder::new();
        decoder.push(&frame);
        let frames = decoder.drain_frames();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].flags, CursorFrameFlags::GZIP);
        assert_eq!(frames[0].payload, b"hello world this is compressible");
    }

    #[test]
    fn tolerates_incomplete_trailing_frame() {
        let full = encode_frame(b"complete", 1);
        let mut decoder = FrameDecoder::new();
        decoder.push(&full);
        decoder.push(&[0x00, 0x00, 0x00]); // partial header of a second frame
        let frames = decoder.drain_frames();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].payload, b"complete");
    }

    #[test]
    fn assembles_frame_split_across_pushes() {
        let full = encode_frame(b"split-me", 1);
        let mut decoder = FrameDecoder::new();
        decoder.push(&full[..3]);
        assert!(decoder.drain_frames().is_empty());
        decoder.push(&full[3..]);
        let frames = decoder.drain_frames();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].payload, b"split-me");
    }
}
