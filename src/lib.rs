// num_enum's derive for `BinaryType` generates a `Self::Primitive` reference
// that is ambiguous with the enum's `Primitive` variant; this is a
// deny-by-default future-incompat lint, not yet a hard error.
#![allow(ambiguous_associated_items)]
//! # nrbf
//!
//! A validating codec for the legacy .NET Remoting Binary Format: the
//! length-prefixed, tag-based, reference-bearing serialization format that
//! clipboard and drag-drop payloads historically travel in.
//!
//! The crate does exactly two things:
//!
//! * **Parse** an untrusted byte stream into a read-only record graph backed
//!   by an append-only arena, enforcing a closed grammar with an
//!   allowed-next-record check at every transition. Malformed or hostile
//!   input fails fast with a byte offset; no record the active schema did
//!   not predict is ever constructed, and no type is ever activated from
//!   the stream.
//! * **Write** a fixed whitelist of value shapes back into the same format,
//!   with per-call string interning and run-length coalescing of nulls.
//!
//! ```no_run
//! use nrbf::{extract_value, parse, try_write_value, Value};
//!
//! let mut buf = Vec::new();
//! assert!(try_write_value(&mut buf, &Value::String("hello".into()))?);
//!
//! let graph = parse(buf.as_slice())?;
//! assert_eq!(extract_value(&graph), Some(Value::String("hello".into())));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

/// Common error types: decoding, encoding.
pub mod error;
/// Byte-level primitives: little-endian numbers, length-prefixed strings.
pub mod io;
/// Parse driver: grammar state machine, limits, value extraction.
pub mod parse;
/// Record model: tags, schema descriptors, arena, record shapes.
pub mod record;
/// Public value model crossing the codec boundary.
pub mod value;
/// Write driver: whitelist serialization with string interning.
pub mod write;

// -----------------------------------------------------------------------------
//  Frequently used public types
// -----------------------------------------------------------------------------

/// Error and result types.
pub use error::{DecodeError, DecodeResult, EncodeError, EncodeResult};
/// Parsing: entry points, limits, extraction.
pub use parse::{extract_value, parse, parse_with_limits, AllowedRecords, ParseLimits};
/// Record graph: arena, records, identifiers.
pub use record::{
    ArrayRecord, ClassRecord, DateTime, Graph, Id, Primitive, PrimitiveType, Record, RecordMap,
    RecordType, Slot, TimeSpan,
};
/// Values crossing the boundary.
pub use value::{PrimitiveArray, Value};
/// Writing: whitelist serializers.
pub use write::{
    try_write_value, write_primitive, write_primitive_array, write_primitive_list, write_string,
    write_string_array, write_string_list, write_string_map, StringRegistry,
};
