//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts into
//! [`HomeBusError`] at port boundaries.

/// Top-level error shared by the domain, application, and adapter layers.
#[derive(Debug, thiserror::Error)]
pub enum HomeBusError {
    /// A domain invariant was violated.
    #[error("validation error")]
    Validation(#[from] ValidationError),

    /// A referenced record does not exist.
    #[error("not found")]
    NotFound(#[from] NotFoundError),

    /// The persistence collaborator failed.
    #[error("storage error")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// An inbound topic or payload could not be decoded.
    #[error("decode error")]
    Decode(#[from] DecodeError),

    /// An outbound message could not be handed to the broker.
    #[error("publish error")]
    Publish(#[from] PublishError),
}

/// Domain invariant violations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// An identifier was empty.
    #[error("identifier must not be empty")]
    EmptyIdentifier,

    /// An identifier contained a topic-reserved character.
    #[error("identifier {0:?} contains a reserved topic character")]
    ReservedCharacter(String),

    /// A name field was empty.
    #[error("name must not be empty")]
    EmptyName,
}

/// A lookup by id found nothing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{entity} {id} not found")]
pub struct NotFoundError {
    /// Kind of record that was looked up (e.g. `"Device"`).
    pub entity: &'static str,
    /// The identifier that was requested.
    pub id: String,
}

/// Reasons an inbound broker message is dropped.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// The topic does not match any recognized address shape.
    #[error("unrecognized topic {0:?}")]
    UnrecognizedTopic(String),

    /// The payload is not valid UTF-8.
    #[error("payload is not valid UTF-8")]
    NotUtf8,

    /// The payload carries no usable numeric value.
    #[error("payload has no numeric value")]
    MissingValue,

    /// A device-control payload does not express an on/off status.
    #[error("payload has no recognizable device status")]
    MissingStatus,

    /// An alert payload carries no message.
    #[error("alert payload has no message")]
    MissingMessage,
}

/// Failures handing an outbound message to the broker.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    /// The broker connection is not established; nothing was queued.
    #[error("broker not connected")]
    NotConnected,

    /// The payload could not be serialized.
    #[error("failed to encode payload")]
    Encode(#[source] serde_json::Error),

    /// The transport rejected the message.
    #[error("broker transport error")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),
}
