//! JSON rendering module
//!
//! Incremental JSON text generation for table exports.
//!
//! # Overview
//!
//! - `value` - column value → JSON scalar token
//! - `row` - row → object members at an indent level
//! - `framing` - open/separator/close tokens per output mode

mod framing;
mod row;
mod value;

pub use framing::Framer;
pub use row::{MissingKey, RowRenderer, DEFAULT_INDENT};
pub use value::{encode_value, escape_into, key_text, write_key, write_quoted, write_value};
