//! Type definitions for chat primitives
//!

/// The author of a `Message`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Role {
    /// A `System` message is an authoritative message which is used to
    /// instruct the model. It appears first in a request.
    System,

    /// A message authored by the user
    User,
}

/// A `Message` sent to a chat model
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Message {
    /// The author of the message
    pub role: Role,
    /// The contents of the message
    pub content: String,
}

impl Message {
    pub(crate) fn new(role: Role, content: String) -> Message {
        Message { role, content }
    }

    pub(crate) fn system<S: Into<String>>(content: S) -> Message {
        Message::new(Role::System, content.into())
    }

    pub(crate) fn user<S: Into<String>>(content: S) -> Message {
        Message::new(Role::User, content.into())
    }
}
