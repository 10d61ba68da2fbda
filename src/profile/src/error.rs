//! Error types for profile compilation and analysis

use thiserror::Error;

/// Errors raised while compiling a glob-style attachment pattern
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PatternError {
    /// A `{` without a closing `}` or a `}` without an opening `{`
    #[error("unbalanced brace group in pattern '{pattern}' at offset {position}")]
    UnbalancedBrace {
        /// Offending pattern
        pattern: String,
        /// Byte offset of the unmatched brace
        position: usize,
    },

    /// Empty pattern (nothing to anchor)
    #[error("pattern is empty and cannot be anchored")]
    Empty,

    /// The translated expression was rejected by the regex engine
    #[error("invalid pattern '{pattern}': {reason}")]
    InvalidRegex {
        /// Offending pattern
        pattern: String,
        /// Regex engine diagnostic
        reason: String,
    },
}

/// Errors raised when a tree does not describe a well-formed profile
///
/// Every variant carries the location of the offending node as a slash
/// separated path with 1-based sibling indices, e.g.
/// `profiles/profile[2]/ros_topic[1]`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StructureError {
    /// Element is not valid at this position
    #[error("unexpected element <{tag}> at {location}")]
    UnexpectedElement {
        /// Tag found
        tag: String,
        /// Node location
        location: String,
    },

    /// Profile without a `name` attribute
    #[error("profile at {location} has no name")]
    MissingName {
        /// Node location
        location: String,
    },

    /// Rule without any object attachment
    #[error("rule at {location} has no attachments")]
    MissingAttachments {
        /// Node location
        location: String,
    },

    /// Rule without a permissions block
    #[error("rule at {location} has no permissions")]
    MissingPermissions {
        /// Node location
        location: String,
    },

    /// Permission verb outside the known vocabulary
    #[error("unknown permission '{verb}' at {location}")]
    UnknownPermission {
        /// Verb found
        verb: String,
        /// Node location
        location: String,
    },

    /// Rule element named after an unknown object kind
    #[error("unknown object kind '{kind}' at {location}")]
    UnknownObjectKind {
        /// Kind found
        kind: String,
        /// Node location
        location: String,
    },

    /// Qualifier attribute other than ALLOW or DENY
    #[error("unknown qualifier '{qualifier}' at {location}")]
    UnknownQualifier {
        /// Qualifier found
        qualifier: String,
        /// Node location
        location: String,
    },

    /// Required child element or text missing
    #[error("missing '{field}' at {location}")]
    MissingField {
        /// Relative path of the missing field
        field: String,
        /// Node location
        location: String,
    },

    /// Two profiles share a name inside one storage
    #[error("duplicate profile name '{name}'")]
    DuplicateProfile {
        /// Shared name
        name: String,
    },
}

/// Profile engine errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProfileError {
    /// Pattern compilation failed
    #[error("Pattern error: {0}")]
    Pattern(#[from] PatternError),

    /// Malformed profile structure
    #[error("Structure error: {0}")]
    Structure(#[from] StructureError),

    /// Malformed structural query
    #[error("Invalid query '{path}': {reason}")]
    InvalidQuery {
        /// Query path as given
        path: String,
        /// What is wrong with it
        reason: String,
    },
}

/// Result type for profile operations
pub type Result<T> = std::result::Result<T, ProfileError>;
