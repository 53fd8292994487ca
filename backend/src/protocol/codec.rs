//! Frame encoding and decoding
//!
//! ```text
//! +-------+---------+------+---------------------+
//! | magic | version | kind | bincode body        |
//! | FSPL  | u16 LE  | u8   | fixint, LE, no tail |
//! +-------+---------+------+---------------------+
//! ```

use bincode::Options;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::io::{self, Read, Write};
use thiserror::Error;

use crate::models::{Fields, InterpolationRequest};

/// Leading bytes of every frame
pub const MAGIC: [u8; 4] = *b"FSPL";

/// Current wire format version
pub const FORMAT_VERSION: u16 = 1;

/// Size of the fixed frame header (magic + version + kind)
pub const HEADER_LEN: usize = 7;

/// What a frame carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FrameKind {
    Request = 1,
    Fields = 2,
}

impl FrameKind {
    fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(FrameKind::Request),
            2 => Some(FrameKind::Fields),
            _ => None,
        }
    }
}

impl fmt::Display for FrameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameKind::Request => f.write_str("request"),
            FrameKind::Fields => f.write_str("fields"),
        }
    }
}

/// Errors raised while encoding or decoding protocol frames
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("cannot encode {kind} frame: {reason}")]
    Encode { kind: FrameKind, reason: String },

    #[error("frame header truncated: {actual} of {HEADER_LEN} bytes")]
    TruncatedHeader { actual: usize },

    #[error("bad frame magic {found:?}")]
    BadMagic { found: [u8; 4] },

    #[error("unsupported protocol version {found} (expected {FORMAT_VERSION})")]
    UnsupportedVersion { found: u16 },

    #[error("unknown frame kind tag {0}")]
    UnknownFrameKind(u8),

    #[error("expected a {expected} frame, got a {found} frame")]
    UnexpectedFrame { expected: FrameKind, found: FrameKind },

    #[error("{kind} frame body truncated")]
    TruncatedBody { kind: FrameKind },

    #[error("malformed {kind} frame body: {reason}")]
    Malformed { kind: FrameKind, reason: String },

    #[error("protocol stream i/o failed: {0}")]
    Io(#[from] io::Error),
}

impl ProtocolError {
    /// True when the failure happened while producing a frame
    pub fn is_encode(&self) -> bool {
        matches!(self, ProtocolError::Encode { .. })
    }
}

fn wire() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_little_endian()
        .reject_trailing_bytes()
}

fn encode_frame<T: Serialize>(kind: FrameKind, value: &T) -> Result<Vec<u8>, ProtocolError> {
    let encode_err = |err: bincode::Error| ProtocolError::Encode {
        kind,
        reason: err.to_string(),
    };
    let body_len = wire().serialized_size(value).map_err(encode_err)?;

    let mut frame = Vec::with_capacity(HEADER_LEN + body_len as usize);
    frame.extend_from_slice(&MAGIC);
    frame.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    frame.push(kind as u8);
    wire().serialize_into(&mut frame, value).map_err(encode_err)?;
    Ok(frame)
}

fn decode_frame<T: DeserializeOwned>(expected: FrameKind, bytes: &[u8]) -> Result<T, ProtocolError> {
    if bytes.len() < HEADER_LEN {
        return Err(ProtocolError::TruncatedHeader {
            actual: bytes.len(),
        });
    }
    let (header, body) = bytes.split_at(HEADER_LEN);

    let magic = [header[0], header[1], header[2], header[3]];
    if magic != MAGIC {
        return Err(ProtocolError::BadMagic { found: magic });
    }
    let version = u16::from_le_bytes([header[4], header[5]]);
    if version != FORMAT_VERSION {
        return Err(ProtocolError::UnsupportedVersion { found: version });
    }
    let found = FrameKind::from_tag(header[6]).ok_or(ProtocolError::UnknownFrameKind(header[6]))?;
    if found != expected {
        return Err(ProtocolError::UnexpectedFrame { expected, found });
    }

    wire().deserialize(body).map_err(|err| match *err {
        bincode::ErrorKind::Io(ref io_err) if io_err.kind() == io::ErrorKind::UnexpectedEof => {
            ProtocolError::TruncatedBody { kind: expected }
        }
        other => ProtocolError::Malformed {
            kind: expected,
            reason: other.to_string(),
        },
    })
}

/// Encode a request frame
///
/// # Errors
///
/// Returns `Encode` if the info path is not valid UTF-8.
pub fn encode_request(request: &InterpolationRequest) -> Result<Vec<u8>, ProtocolError> {
    encode_frame(FrameKind::Request, request)
}

/// Decode a request frame
///
/// # Example
/// ```
/// use fieldsplit_core_rs::protocol::{decode_request, encode_request};
/// use fieldsplit_core_rs::{BinaryType, Grid, InterpolationRequest};
///
/// let grid = Grid::new(vec![0.1], vec![0.2], vec![0.3]).unwrap();
/// let request = InterpolationRequest::new(BinaryType::Bns, grid, "bns.info");
///
/// let bytes = encode_request(&request).unwrap();
/// assert_eq!(decode_request(&bytes).unwrap(), request);
/// ```
pub fn decode_request(bytes: &[u8]) -> Result<InterpolationRequest, ProtocolError> {
    decode_frame(FrameKind::Request, bytes)
}

/// Encode a fields frame
pub fn encode_fields(fields: &Fields) -> Result<Vec<u8>, ProtocolError> {
    encode_frame(FrameKind::Fields, fields)
}

/// Decode a fields frame
///
/// Fails on unknown or missing field names and on ragged columns.
pub fn decode_fields(bytes: &[u8]) -> Result<Fields, ProtocolError> {
    decode_frame(FrameKind::Fields, bytes)
}

/// Read one request frame from a stream until EOF
pub fn read_request<R: Read>(mut reader: R) -> Result<InterpolationRequest, ProtocolError> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    decode_request(&bytes)
}

/// Write one request frame to a stream
pub fn write_request<W: Write>(mut writer: W, request: &InterpolationRequest) -> Result<(), ProtocolError> {
    writer.write_all(&encode_request(request)?)?;
    writer.flush()?;
    Ok(())
}

/// Read one fields frame from a stream until EOF
pub fn read_fields<R: Read>(mut reader: R) -> Result<Fields, ProtocolError> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    decode_fields(&bytes)
}

/// Write one fields frame to a stream
pub fn write_fields<W: Write>(mut writer: W, fields: &Fields) -> Result<(), ProtocolError> {
    writer.write_all(&encode_fields(fields)?)?;
    writer.flush()?;
    Ok(())
}
