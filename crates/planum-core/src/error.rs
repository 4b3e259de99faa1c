//! Error types for graph mutation and command execution.

use thiserror::Error;

use crate::identifier::Id;

/// Errors raised by the element graph primitives.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("element <{0}> already exists")]
    DuplicateId(Id),

    #[error("parent <{0}> is not a container in this graph")]
    InvalidParent(Id),

    #[error("element <{0}> does not exist")]
    UnknownElement(Id),

    #[error("endpoint <{endpoint}> of <{element}> does not exist")]
    UnknownEndpoint { element: Id, endpoint: Id },

    #[error("element <{0}> still has children")]
    NotEmpty(Id),

    #[error("element <{0}> is not a root element")]
    NotARoot(Id),

    #[error("root element <{0}> cannot be added or removed as a child")]
    RootElement(Id),

    #[error("element <{0}> has no {1}")]
    MissingField(Id, &'static str),
}

/// Errors raised while executing, undoing or redoing commands.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CommandError {
    #[error("no command handler registered for <{0}>")]
    NoHandler(String),

    #[error("command handler for <{0}> is already registered")]
    DuplicateHandler(String),

    #[error("command <{0}> is not allowed")]
    NotAllowed(String),

    #[error("command context is not a {0}")]
    InvalidContext(&'static str),

    #[error("command stack is busy reverting")]
    Busy,

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("model error: {0}")]
    Model(String),
}
