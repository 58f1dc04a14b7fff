//! Error type shared by the editor core and the persistence layer.
//!
//! Graph-level errors (`UnknownResourceType` through `InvalidConnection`)
//! are local and recoverable: the interaction controller absorbs them and
//! turns them into notices. The remaining variants come from persistence
//! and import, and surface to the user as dismissible messages.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// The `(provider, resourceType)` pair is not in the taxonomy.
    #[error("Unknown resource type '{resource_type}' for provider '{provider}'")]
    UnknownResourceType {
        provider: String,
        resource_type: String,
    },

    #[error("Node '{0}' not found")]
    NodeNotFound(String),

    #[error("Edge {from} -> {to} already exists")]
    DuplicateEdge { from: String, to: String },

    #[error("Node '{0}' cannot be connected to itself")]
    SelfLoopNotAllowed(String),

    /// Rejected by the connection rule table.
    #[error("Cannot connect '{from}' to '{to}': {reason}")]
    InvalidConnection {
        from: String,
        to: String,
        reason: String,
    },

    #[error("Architecture '{0}' not found")]
    ArchitectureNotFound(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    /// Transport or store failure.
    #[error("Persistence failure: {0}")]
    PersistenceFailure(String),

    /// Corrupt or incompatible export file.
    #[error("Malformed import: {0}")]
    MalformedImport(String),
}

impl Error {
    /// Errors raised by graph mutations and the rule table. These never
    /// propagate past the interaction controller.
    pub fn is_model_error(&self) -> bool {
        matches!(
            self,
            Error::UnknownResourceType { .. }
                | Error::NodeNotFound(_)
                | Error::DuplicateEdge { .. }
                | Error::SelfLoopNotAllowed(_)
                | Error::InvalidConnection { .. }
        )
    }

    /// Short, actionable message for a dismissible notice.
    pub fn notice(&self) -> String {
        match self {
            Error::UnknownResourceType {
                provider,
                resource_type,
            } => format!("{provider} {resource_type} is not an available resource"),
            Error::NodeNotFound(_) => "That resource no longer exists on the canvas".to_string(),
            Error::DuplicateEdge { .. } => "These resources are already connected".to_string(),
            Error::SelfLoopNotAllowed(_) => "A resource cannot be connected to itself".to_string(),
            Error::InvalidConnection { reason, .. } => reason.clone(),
            Error::ArchitectureNotFound(_) => {
                "This architecture no longer exists; refresh the saved list".to_string()
            }
            Error::Validation(msg) => msg.clone(),
            Error::PersistenceFailure(_) => {
                "Could not reach the architecture store; your canvas is unchanged".to_string()
            }
            Error::MalformedImport(_) => "file is not a valid architecture export".to_string(),
        }
    }
}
