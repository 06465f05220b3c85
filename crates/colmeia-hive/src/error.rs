//! Error types for the hive node.

use thiserror::Error;

/// Result type for hive operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in hive operations.
///
/// The vote and membership variants are precondition failures meant to be
/// shown to the acting member as-is. Nothing in the core retries.
#[derive(Debug, Error)]
pub enum Error {
    /// No authenticated user behind the request
    #[error("not authenticated")]
    Unauthenticated,

    /// Actor is not a member of the group
    #[error("you are not a member of this group")]
    NotMember,

    /// Group does not exist
    #[error("group not found: {0}")]
    GroupNotFound(String),

    /// Group is being disbanded
    #[error("group {0} is being deleted")]
    GroupDeleting(String),

    /// No group uses this invite code
    #[error("invalid invite code")]
    InvalidInviteCode,

    /// User already has a member record in the group
    #[error("you are already a member of this group")]
    AlreadyMember,

    /// Vote does not exist
    #[error("vote not found")]
    VoteNotFound,

    /// Vote is no longer pending
    #[error("this vote has already been concluded")]
    VoteAlreadyResolved,

    /// Actor already voted
    #[error("you have already voted")]
    DuplicateVote,

    /// Actor has no vote to remove
    #[error("you have not voted")]
    NotVoted,

    /// Only the creator may cancel a vote
    #[error("only the creator can cancel this vote")]
    NotCreator,

    /// The creator's vote is permanent
    #[error("the creator of a vote cannot remove their vote")]
    CreatorCannotRemove,

    /// A pending vote already targets this record
    #[error("a pending vote already exists for this item")]
    DuplicatePendingVote,

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this error is a rule the acting member broke, as opposed to
    /// an infrastructure failure.
    pub fn is_precondition(&self) -> bool {
        !matches!(
            self,
            Error::Storage(_) | Error::Serialization(_) | Error::Io(_) | Error::Config(_)
        )
    }
}

impl From<rocksdb::Error> for Error {
    fn from(e: rocksdb::Error) -> Self {
        Error::Storage(e.to_string())
    }
}
