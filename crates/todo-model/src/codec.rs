//! Canonical byte encoding of a [`Todo`].
//!
//! The canonical form is a field-named JSON object:
//!
//! ```json
//! {"title":"t1","assignee":"bob","description":"","status":"assigned","updated":"2024-01-01T00:00:00Z"}
//! ```
//!
//! Decoding is whitespace-insensitive and tolerates missing fields, which
//! take their zero value. Fresh todos are always built with [`Todo::new`],
//! never by decoding an empty object.

use crate::error::CodecError;
use crate::todo::Todo;

/// Encode a todo into its canonical blob.
pub fn encode(todo: &Todo) -> Result<Vec<u8>, CodecError> {
    Ok(serde_json::to_vec(todo)?)
}

/// Decode a todo from its canonical blob.
pub fn decode(data: &[u8]) -> Result<Todo, CodecError> {
    Ok(serde_json::from_slice(data)?)
}
