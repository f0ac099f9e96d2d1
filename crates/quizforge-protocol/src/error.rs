//! Error types for the protocol layer.
//!
//! Each crate in Quizforge defines its own error enum. A `ProtocolError`
//! always means the bytes or the envelope were wrong, never that the
//! game refused the request.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[error("encode failed: {0}")]
    Encode(#[source] serde_json::Error),

    /// Deserialization failed: malformed JSON, an unknown `kind`, or a
    /// missing envelope field.
    #[error("decode failed: {0}")]
    Decode(#[source] serde_json::Error),

    /// The envelope parsed but does not describe a message this side
    /// accepts: a payload that doesn't fit its kind, or an outbound-only
    /// kind sent by a client.
    #[error("malformed message: {0}")]
    MalformedMessage(String),
}
