//! Binary envelope for one queued message.
//!
//! Extended layout, big-endian throughout:
//!
//! ```text
//! [version:1][routing_hash:4][timestamp:8][attempts:2][id:16][source_client_id:8]?[body...]
//! ```
//!
//! The source client id is only present when the `HAS_SOURCE` flag is set. The
//! legacy layout has no version byte and no routing hash:
//!
//! ```text
//! [timestamp:8][attempts:2][id:16][body...]
//! ```
//!
//! The body carries no length prefix; it is whatever follows the header.

use std::io::{self, Write};

use thiserror::Error;

use crate::message::{Message, MessageId, VersionFlags, MIN_LEGACY_MESSAGE_LEN, MSG_ID_LENGTH};
use crate::wire::envelope::{EnvelopeFormat, EnvelopeLayout};

const MAX_HEADER_LEN: usize = 39;

#[derive(Debug, Error)]
#[error("failed to write message envelope after {written} bytes: {source}")]
pub struct EncodeError {
    /// Bytes accepted by the writer before it failed. Diagnostic only; the
    /// record must be treated as not written.
    pub written: u64,
    pub source: io::Error,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("invalid message buffer size ({size}), {layout} layout needs at least {required} bytes")]
    InvalidBufferSize {
        size: usize,
        required: usize,
        layout: EnvelopeLayout,
    },
}

pub fn encode<W: Write + ?Sized>(message: &Message, writer: &mut W) -> Result<u64, EncodeError> {
    let version = message.version().with(VersionFlags::EXTENDED_FORMAT);
    let mut header = [0_u8; MAX_HEADER_LEN];
    header[0] = version.bits();
    header[1..5].copy_from_slice(&message.routing_hash().to_be_bytes());
    header[5..13].copy_from_slice(&message.timestamp().to_be_bytes());
    header[13..15].copy_from_slice(&message.attempts().to_be_bytes());
    header[15..31].copy_from_slice(message.id().as_bytes());

    let mut header_len = EnvelopeLayout::Extended.header_len();
    if version.contains(VersionFlags::HAS_SOURCE) {
        let source = message.source_client_id().unwrap_or_default();
        header[31..39].copy_from_slice(&source.to_be_bytes());
        header_len = EnvelopeLayout::ExtendedWithSource.header_len();
    }

    let mut written = 0;
    write_counted(writer, &header[..header_len], &mut written)?;
    write_counted(writer, message.body(), &mut written)?;
    Ok(written)
}

pub fn encode_legacy<W: Write + ?Sized>(
    message: &Message,
    writer: &mut W,
) -> Result<u64, EncodeError> {
    let mut header = [0_u8; MIN_LEGACY_MESSAGE_LEN];
    header[0..8].copy_from_slice(&message.timestamp().to_be_bytes());
    header[8..10].copy_from_slice(&message.attempts().to_be_bytes());
    header[10..26].copy_from_slice(message.id().as_bytes());

    let mut written = 0;
    write_counted(writer, &header, &mut written)?;
    write_counted(writer, message.body(), &mut written)?;
    Ok(written)
}

pub fn encode_with_format<W: Write + ?Sized>(
    message: &Message,
    format: EnvelopeFormat,
    writer: &mut W,
) -> Result<u64, EncodeError> {
    match format {
        EnvelopeFormat::Extended => encode(message, writer),
        EnvelopeFormat::Legacy => encode_legacy(message, writer),
    }
}

pub fn encode_to_vec(message: &Message, format: EnvelopeFormat) -> Result<Vec<u8>, EncodeError> {
    let mut buffer = Vec::with_capacity(MAX_HEADER_LEN + message.body().len());
    encode_with_format(message, format, &mut buffer)?;
    Ok(buffer)
}

pub fn decode(bytes: &[u8]) -> Result<Message, DecodeError> {
    ensure_len(bytes, EnvelopeLayout::Legacy)?;

    let flags = VersionFlags::from_bits(bytes[0]);
    let layout = EnvelopeLayout::from_flags(flags);
    ensure_len(bytes, layout)?;

    match layout {
        EnvelopeLayout::Legacy => Ok(decode_legacy(bytes)),
        EnvelopeLayout::Extended | EnvelopeLayout::ExtendedWithSource => {
            Ok(decode_extended(bytes, flags, layout))
        }
    }
}

fn decode_extended(bytes: &[u8], flags: VersionFlags, layout: EnvelopeLayout) -> Message {
    let routing_hash = u32::from_be_bytes(be_array(bytes, 1));
    let timestamp = i64::from_be_bytes(be_array(bytes, 5));
    let attempts = u16::from_be_bytes(be_array(bytes, 13));
    let id = MessageId::from(be_array::<MSG_ID_LENGTH>(bytes, 15));

    let source_client_id = match layout {
        EnvelopeLayout::ExtendedWithSource => Some(i64::from_be_bytes(be_array(bytes, 31))),
        _ => None,
    };

    Message::from_envelope_fields(
        flags,
        routing_hash,
        timestamp,
        attempts,
        id,
        source_client_id,
        bytes[layout.header_len()..].to_vec(),
    )
}

// Legacy records are normalized to the extended representation in memory. A
// routing hash of zero marks them as unusable for affinity decisions.
fn decode_legacy(bytes: &[u8]) -> Message {
    let timestamp = i64::from_be_bytes(be_array(bytes, 0));
    let attempts = u16::from_be_bytes(be_array(bytes, 8));
    let id = MessageId::from(be_array::<MSG_ID_LENGTH>(bytes, 10));

    Message::from_envelope_fields(
        VersionFlags::EXTENDED_FORMAT,
        0,
        timestamp,
        attempts,
        id,
        None,
        bytes[MIN_LEGACY_MESSAGE_LEN..].to_vec(),
    )
}

fn ensure_len(bytes: &[u8], layout: EnvelopeLayout) -> Result<(), DecodeError> {
    let required = layout.header_len();
    if bytes.len() < required {
        return Err(DecodeError::InvalidBufferSize {
            size: bytes.len(),
            required,
            layout,
        });
    }
    Ok(())
}

// Callers must have checked the length with `ensure_len` first.
fn be_array<const N: usize>(bytes: &[u8], offset: usize) -> [u8; N] {
    let mut out = [0_u8; N];
    out.copy_from_slice(&bytes[offset..offset + N]);
    out
}

fn write_counted<W: Write + ?Sized>(
    writer: &mut W,
    mut data: &[u8],
    written: &mut u64,
) -> Result<(), EncodeError> {
    while !data.is_empty() {
        match writer.write(data) {
            Ok(0) => {
                return Err(EncodeError {
                    written: *written,
                    source: io::Error::from(io::ErrorKind::WriteZero),
                });
            }
            Ok(size) => {
                *written += size as u64;
                data = &data[size..];
            }
            Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
            Err(source) => {
                return Err(EncodeError {
                    written: *written,
                    source,
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::{self, Write};

    use super::{decode, encode, encode_legacy, encode_to_vec, DecodeError};
    use crate::message::{Message, MessageId, VersionFlags};
    use crate::wire::envelope::{EnvelopeFormat, EnvelopeLayout};

    fn sample_with_source() -> Message {
        Message::from_envelope_fields(
            VersionFlags::from_bits(0x81),
            42,
            1000,
            3,
            MessageId::from([0xAA; 16]),
            Some(7),
            b"hi".to_vec(),
        )
    }

    struct FailingWriter {
        capacity: usize,
        accepted: Vec<u8>,
    }

    impl Write for FailingWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            let room = self.capacity - self.accepted.len();
            if room == 0 {
                return Err(io::Error::new(io::ErrorKind::Other, "disk full"));
            }
            let size = room.min(buf.len());
            self.accepted.extend_from_slice(&buf[..size]);
            Ok(size)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn encodes_extended_record_with_source_byte_for_byte() {
        let mut buffer = Vec::new();
        let written = encode(&sample_with_source(), &mut buffer).expect("encode should work");

        let mut expected = vec![0x81, 0, 0, 0, 42, 0, 0, 0, 0, 0, 0, 3, 232, 0, 3];
        expected.extend_from_slice(&[0xAA; 16]);
        expected.extend_from_slice(&[0, 0, 0, 0, 0, 0, 0, 7]);
        expected.extend_from_slice(b"hi");

        assert_eq!(written, 41);
        assert_eq!(buffer, expected);

        let decoded = decode(&buffer).expect("decode should work");
        assert_eq!(decoded, sample_with_source());
    }

    #[test]
    fn round_trips_constructed_messages() {
        let messages = [
            Message::new(MessageId::generate(), b"plain".to_vec()),
            Message::with_routing(MessageId::generate(), Vec::new(), "orders", None),
            Message::with_routing(MessageId::generate(), vec![0; 4096], "orders", Some(99)),
        ];

        for mut message in messages {
            message.set_attempts(12);
            let encoded =
                encode_to_vec(&message, EnvelopeFormat::Extended).expect("encode should work");
            let decoded = decode(&encoded).expect("decode should work");

            assert_eq!(decoded, message);
            assert_eq!(decoded.attempts(), 12);
        }
    }

    #[test]
    fn decodes_legacy_record_with_normalized_header() {
        let mut buffer = vec![0_u8; 26];
        buffer.extend_from_slice(b"ab");

        let decoded = decode(&buffer).expect("legacy record should decode");

        assert_eq!(decoded.version(), VersionFlags::EXTENDED_FORMAT);
        assert_eq!(decoded.routing_hash(), 0);
        assert_eq!(decoded.timestamp(), 0);
        assert_eq!(decoded.attempts(), 0);
        assert_eq!(decoded.id(), MessageId::from([0; 16]));
        assert_eq!(decoded.source_client_id(), None);
        assert_eq!(decoded.body(), b"ab");
    }

    #[test]
    fn legacy_writer_output_is_readable() {
        let mut message =
            Message::with_routing(MessageId::generate(), b"old consumer".to_vec(), "k", Some(5));
        message.set_attempts(2);

        let mut buffer = Vec::new();
        let written = encode_legacy(&message, &mut buffer).expect("legacy encode should work");
        assert_eq!(written as usize, 26 + b"old consumer".len());
        assert_eq!(&buffer[0..8], &message.timestamp().to_be_bytes());

        let decoded = decode(&buffer).expect("legacy record should decode");
        assert_eq!(decoded.id(), message.id());
        assert_eq!(decoded.timestamp(), message.timestamp());
        assert_eq!(decoded.attempts(), 2);
        assert_eq!(decoded.body(), message.body());
        assert_eq!(decoded.routing_hash(), 0);
        assert_eq!(decoded.source_client_id(), None);
    }

    #[test]
    fn rejects_buffers_below_legacy_minimum() {
        for size in [0, 1, 25] {
            let error = decode(&vec![0_u8; size]).expect_err("short buffer should fail");
            assert_eq!(
                error,
                DecodeError::InvalidBufferSize {
                    size,
                    required: 26,
                    layout: EnvelopeLayout::Legacy,
                }
            );
        }
    }

    #[test]
    fn rechecks_length_once_extended_flag_is_seen() {
        let mut buffer = vec![0_u8; 26];
        buffer[0] = 0x80;
        let error = decode(&buffer).expect_err("truncated extended header should fail");
        assert!(matches!(
            error,
            DecodeError::InvalidBufferSize {
                size: 26,
                required: 31,
                layout: EnvelopeLayout::Extended,
            }
        ));

        let mut buffer = vec![0_u8; 38];
        buffer[0] = 0x81;
        let error = decode(&buffer).expect_err("missing source id should fail");
        assert!(matches!(
            error,
            DecodeError::InvalidBufferSize {
                required: 39,
                layout: EnvelopeLayout::ExtendedWithSource,
                ..
            }
        ));
    }

    #[test]
    fn tolerates_and_preserves_unknown_flag_bits() {
        let mut buffer = vec![0xC0, 0, 0, 0, 9];
        buffer.extend_from_slice(&5_i64.to_be_bytes());
        buffer.extend_from_slice(&1_u16.to_be_bytes());
        buffer.extend_from_slice(&[0x11; 16]);
        buffer.extend_from_slice(b"body");

        let decoded = decode(&buffer).expect("unknown bits should be tolerated");
        assert_eq!(decoded.version().bits(), 0xC0);
        assert_eq!(decoded.routing_hash(), 9);
        assert_eq!(decoded.source_client_id(), None);
        assert_eq!(decoded.body(), b"body");

        let reencoded = encode_to_vec(&decoded, EnvelopeFormat::Extended).expect("encode");
        assert_eq!(reencoded, buffer);
    }

    #[test]
    fn empty_body_is_allowed() {
        let message = Message::new(MessageId::generate(), Vec::new());
        let encoded = encode_to_vec(&message, EnvelopeFormat::Extended).expect("encode");

        assert_eq!(encoded.len(), 31);
        assert_eq!(decode(&encoded).expect("decode").body(), b"");
    }

    #[test]
    fn decoding_is_deterministic() {
        let encoded = encode_to_vec(&sample_with_source(), EnvelopeFormat::Extended).expect("encode");
        assert_eq!(decode(&encoded), decode(&encoded));
    }

    #[test]
    fn reports_partial_write_count_on_failure() {
        let mut writer = FailingWriter {
            capacity: 20,
            accepted: Vec::new(),
        };

        let error = encode(&sample_with_source(), &mut writer).expect_err("writer should fail");

        assert_eq!(error.written, 20);
        assert_eq!(error.source.kind(), io::ErrorKind::Other);
        assert!(error.to_string().contains("after 20 bytes"));
    }
}
