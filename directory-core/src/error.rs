//! The canonical error taxonomy of the directory core (spec §7).
//!
//! Every fallible operation in this crate returns [`LdapError`]. `Conflict`
//! is the one variant that must never reach a caller outside the
//! transaction retry loop (see [`crate::txn`]).

use thiserror::Error;

/// Result alias used throughout the directory core.
pub type LdapResult<T> = Result<T, LdapError>;

/// The result-code taxonomy a directory operation can fail with.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LdapError {
    #[error("invalid DN syntax: {0}")]
    DnSyntax(String),

    #[error("invalid attribute syntax for {attribute}: {reason}")]
    AttributeSyntax { attribute: String, reason: String },

    #[error("no such attribute: {0}")]
    NoSuchAttribute(String),

    #[error("invalid attribute identifier: {0}")]
    InvalidAttributeIdentifier(String),

    #[error("object class violation: {0}")]
    ObjectClassViolation(String),

    #[error("no such object: {0}")]
    NoSuchObject(String),

    #[error("entry already exists: {0}")]
    AlreadyExists(String),

    #[error("operation not allowed on the root DSE")]
    NotAllowedOnRootDse,

    #[error("operation not allowed on a non-leaf entry: {0}")]
    NotAllowedOnNonLeaf(String),

    #[error("insufficient access rights")]
    InsufficientAccessRights,

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("authentication method not supported: {0}")]
    AuthMethodNotSupported(String),

    #[error("size limit exceeded")]
    SizeLimitExceeded,

    #[error("time limit exceeded")]
    TimeLimitExceeded,

    #[error("referral")]
    Referral(Vec<String>),

    #[error("partial result, unresolved suffix: {0}")]
    PartialResult(String),

    #[error("affects multiple DSAs")]
    AffectsMultipleDSAs,

    #[error("busy")]
    Busy,

    #[error("directory service unavailable")]
    Unavailable,

    #[error("unwilling to perform: {0}")]
    UnwillingToPerform(String),

    #[error("operation error: {0}")]
    OperationError(String),

    #[error("canceled")]
    Canceled,

    #[error("invalid search filter syntax: {0}")]
    InvalidSearchFilterSyntax(String),

    /// Internal: a read-write transaction lost a write-write race at
    /// commit time. Caught only by the Operation Manager's retry loop
    /// (spec §4.4); must never escape to a client.
    #[error("internal: transaction conflict")]
    Conflict,
}

impl LdapError {
    /// True for the two "keep looking elsewhere" results that carry URLs
    /// or an unresolved suffix the client must see unchanged (spec §7).
    pub fn is_referral_like(&self) -> bool {
        matches!(self, LdapError::Referral(_) | LdapError::PartialResult(_))
    }
}
