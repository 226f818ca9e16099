//! Wire codec for the ABX exchange protocol.
//!
//! Requests are two bytes, `[call type, payload]`. Responses are zero or more
//! back-to-back record frames with the following layout (all integers
//! big-endian):
//!
//! ```text
//! +--------+------+----------+-------+----------+
//! | symbol | side | quantity | price | sequence |
//! | 4      | 1    | 4 (i32)  | 4     | 4 (i32)  |
//! +--------+------+----------+-------+----------+
//!   0..4     4      5..9       9..13   13..17
//! ```
//!
//! There is no checksum and no length field: exactly
//! [`RECORD_SIZE`](crate::defs::RECORD_SIZE) bytes make one record.

use crate::defs::{CALL_RESEND, CALL_STREAM_ALL, RECORD_SIZE, REQUEST_SIZE};
use crate::errors::CodecError;
use crate::record::Record;

/// Encodes the "stream all records" request.
pub fn encode_stream_all_request() -> [u8; REQUEST_SIZE] {
    [CALL_STREAM_ALL, 0]
}

/// Encodes a "resend one record" request.
///
/// The payload is a single byte, so only sequences `0..=255` can be
/// addressed even though sequences are 32-bit on the wire.
///
/// # Errors
/// Returns [`CodecError::SequenceOutOfRange`] for any other sequence.
pub fn encode_resend_request(sequence: i32) -> Result<[u8; REQUEST_SIZE], CodecError> {
    let payload = u8::try_from(sequence).map_err(|_| CodecError::SequenceOutOfRange(sequence))?;
    Ok([CALL_RESEND, payload])
}

/// Decodes one record frame.
///
/// # Errors
/// Returns [`CodecError::MalformedFrame`] if `bytes` is shorter than a frame.
/// Extra trailing bytes are ignored.
pub fn decode_record(bytes: &[u8]) -> Result<Record, CodecError> {
    if bytes.len() < RECORD_SIZE {
        return Err(CodecError::MalformedFrame {
            expected: RECORD_SIZE,
            actual: bytes.len(),
        });
    }

    let mut symbol = [0u8; 4];
    symbol.copy_from_slice(&bytes[0..4]);

    Ok(Record {
        symbol,
        side: bytes[4],
        quantity: read_i32(bytes, 5),
        price: read_i32(bytes, 9),
        sequence: read_i32(bytes, 13),
    })
}

/// Encodes a record into its wire frame. Used by the exchange simulator.
pub fn encode_record(record: &Record) -> [u8; RECORD_SIZE] {
    let mut frame = [0u8; RECORD_SIZE];
    frame[0..4].copy_from_slice(&record.symbol);
    frame[4] = record.side;
    frame[5..9].copy_from_slice(&record.quantity.to_be_bytes());
    frame[9..13].copy_from_slice(&record.price.to_be_bytes());
    frame[13..17].copy_from_slice(&record.sequence.to_be_bytes());
    frame
}

fn read_i32(bytes: &[u8], offset: usize) -> i32 {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&bytes[offset..offset + 4]);
    i32::from_be_bytes(raw)
}
