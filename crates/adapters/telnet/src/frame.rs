//! Frame tokenizer for the line-oriented hub protocol.
//!
//! A frame starts with one of the [`SENTINELS`] and ends with CRLF. Bytes
//! before a sentinel (prompts such as `GNET> `, echo noise) are skipped.
//! An incomplete frame stays buffered until its terminator arrives; one
//! that grows past the maximum length without a terminator is discarded.

use std::io;

use bytes::{Buf, BytesMut};
use tokio_util::codec::Decoder;

/// Leading markers: `~` unsolicited notification, `#` command echo, `?` query response.
pub const SENTINELS: [u8; 3] = [b'~', b'#', b'?'];

/// Frame terminator.
pub const TERMINATOR: &[u8] = b"\r\n";

/// Longest accepted frame, terminator included.
pub const MAX_FRAME_LENGTH: usize = 1024;

/// [`Decoder`] yielding complete frames, terminator included.
#[derive(Debug, Clone)]
pub struct FrameDecoder {
    max_length: usize,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameDecoder {
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_length(MAX_FRAME_LENGTH)
    }

    #[must_use]
    pub fn with_max_length(max_length: usize) -> Self {
        Self { max_length }
    }
}

fn find_terminator(buf: &[u8]) -> Option<usize> {
    buf.windows(TERMINATOR.len())
        .position(|window| window == TERMINATOR)
}

impl Decoder for FrameDecoder {
    type Item = String;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<String>, io::Error> {
        loop {
            let Some(start) = src.iter().position(|byte| SENTINELS.contains(byte)) else {
                src.clear();
                return Ok(None);
            };
            src.advance(start);

            if let Some(end) = find_terminator(&src[..src.len().min(self.max_length)]) {
                let frame = src.split_to(end + TERMINATOR.len());
                return Ok(Some(String::from_utf8_lossy(&frame).into_owned()));
            }
            if src.len() < self.max_length {
                return Ok(None);
            }
            tracing::debug!(
                max_length = self.max_length,
                "discarding oversized frame without terminator"
            );
            src.advance(1);
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<String>, io::Error> {
        if let Some(frame) = self.decode(src)? {
            return Ok(Some(frame));
        }
        if !src.is_empty() {
            tracing::debug!(pending = src.len(), "discarding partial frame at end of stream");
            src.clear();
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_all(decoder: &mut FrameDecoder, buf: &mut BytesMut) -> Vec<String> {
        let mut frames = Vec::new();
        while let Some(frame) = decoder.decode(buf).unwrap() {
            frames.push(frame);
        }
        frames
    }

    #[test]
    fn should_emit_multiple_frames_in_arrival_order() {
        let mut decoder = FrameDecoder::new();
        let mut buf = BytesMut::from(&b"~OUTPUT,12,1,55.00\r\n~DEVICE,9,3,3\r\n"[..]);

        let frames = decode_all(&mut decoder, &mut buf);

        assert_eq!(frames, vec!["~OUTPUT,12,1,55.00\r\n", "~DEVICE,9,3,3\r\n"]);
        assert!(buf.is_empty());
    }

    #[test]
    fn should_yield_same_frame_regardless_of_fragmentation() {
        let wire = b"GNET> ~OUTPUT,12,1,55.00\r\n#DEVICE,9,3,4\r\n";
        let mut whole = BytesMut::from(&wire[..]);
        let expected = decode_all(&mut FrameDecoder::new(), &mut whole);

        for chunk_size in 1..wire.len() {
            let mut decoder = FrameDecoder::new();
            let mut buf = BytesMut::new();
            let mut frames = Vec::new();
            for chunk in wire.chunks(chunk_size) {
                buf.extend_from_slice(chunk);
                frames.extend(decode_all(&mut decoder, &mut buf));
            }
            assert_eq!(frames, expected, "chunk size {chunk_size}");
        }
    }

    #[test]
    fn should_keep_partial_frame_buffered() {
        let mut decoder = FrameDecoder::new();
        let mut buf = BytesMut::from(&b"~OUTPUT,12,1,5"[..]);

        assert_eq!(decoder.decode(&mut buf).unwrap(), None);
        assert_eq!(&buf[..], b"~OUTPUT,12,1,5");

        buf.extend_from_slice(b"5.00\r");
        assert_eq!(decoder.decode(&mut buf).unwrap(), None);
        buf.extend_from_slice(b"\n");
        assert_eq!(
            decoder.decode(&mut buf).unwrap().as_deref(),
            Some("~OUTPUT,12,1,55.00\r\n")
        );
    }

    #[test]
    fn should_skip_bytes_without_sentinel() {
        let mut decoder = FrameDecoder::new();
        let mut buf = BytesMut::from(&b"login: GNET> \r\n"[..]);

        assert_eq!(decoder.decode(&mut buf).unwrap(), None);
        assert!(buf.is_empty());
    }

    #[test]
    fn should_discard_oversized_frame() {
        let mut decoder = FrameDecoder::with_max_length(16);
        let mut buf = BytesMut::from(&b"~OUTPUT,1234567890123456789"[..]);

        assert_eq!(decoder.decode(&mut buf).unwrap(), None);
        buf.extend_from_slice(b"\r\n~DEVICE,9,3,3\r\n");

        let frames = decode_all(&mut decoder, &mut buf);
        assert_eq!(frames, vec!["~DEVICE,9,3,3\r\n"]);
    }

    #[test]
    fn should_discard_partial_frame_at_eof() {
        let mut decoder = FrameDecoder::new();
        let mut buf = BytesMut::from(&b"~OUTPUT,12,1,55.00\r\n~OUTPUT,1"[..]);

        assert!(decoder.decode_eof(&mut buf).unwrap().is_some());
        assert_eq!(decoder.decode_eof(&mut buf).unwrap(), None);
        assert!(buf.is_empty());
    }
}
