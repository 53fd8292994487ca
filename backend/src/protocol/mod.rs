//! Worker protocol
//!
//! Stable binary encoding for the two payloads exchanged with a worker
//! process: one `InterpolationRequest` on its stdin, one `Fields` on its
//! stdout.
//!
//! # Critical Invariants
//!
//! 1. **Lossless**: `decode(encode(x)) == x`, floats bit-for-bit
//! 2. **Strict**: truncated, trailing or malformed input is an error,
//!    never an empty result
//! 3. **Self-describing header**: magic, version and frame kind are
//!    checked before the body is touched

pub mod codec;

pub use codec::{
    decode_fields, decode_request, encode_fields, encode_request, read_fields, read_request,
    write_fields, write_request, FrameKind, ProtocolError, FORMAT_VERSION, HEADER_LEN, MAGIC,
};
