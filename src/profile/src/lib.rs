//! # ComArmor Profile Module
//!
//! Profile model and rule tooling for ComArmor access-control policies.
//!
//! ## Features
//!
//! - **Pattern Compiler**: Glob attachments (`*`, `**`, `?`, `{a,b}`) compiled to anchored regexes
//! - **Pattern Cache**: Concurrent compiled-pattern cache with hit/miss statistics
//! - **Profile Trees**: Generic element trees with a path query subset and XML rendering
//! - **Typed Profiles**: Structure-checked conversion between trees and profile records
//! - **Storage**: Subject filtering and per-kind rule extraction across many trees
//! - **Compression**: Merging of equivalent rules and canonical ordering
//!
//! ## Module Structure
//!
//! ```text
//! profile/
//! ├── pattern/    - Glob translation and compiled-pattern cache
//! ├── tree/       - Element tree, path queries, XML rendering
//! ├── types/      - Qualifier, permission, object kind, attachment
//! ├── profile/    - Profile and rule records
//! ├── storage/    - Profile trees and storage
//! └── compress/   - Rule compression and sorting
//! ```

pub mod compress;
pub mod error;
pub mod pattern;
pub mod profile;
pub mod storage;
pub mod tree;
pub mod types;

pub use compress::{
    compress, compress_storage, compress_tree, sort_element, sort_profile, sort_storage, sort_tree,
};
pub use error::{PatternError, ProfileError, Result, StructureError};
pub use pattern::{compile, CacheStats, CompiledPattern, PatternCache, PatternCacheConfig};
pub use profile::{Profile, ProfileItem, Rule};
pub use storage::{ProfileStorage, ProfileTree, PROFILES_TAG};
pub use tree::Element;
pub use types::{Attachment, ObjectKind, Permission, Qualifier};
