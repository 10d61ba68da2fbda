//! # ComArmor Discovery Module
//!
//! Derives candidate profiles from a point-in-time dump of middleware
//! participants and their publications and subscriptions.
//!
//! ## Module Structure
//!
//! ```text
//! discovery/
//! ├── snapshot/     - Typed discovery records
//! ├── mapping/      - Namespace prefix and permission tables
//! └── synthesizer/  - Profile synthesis
//! ```

pub mod error;
pub mod mapping;
pub mod snapshot;
pub mod synthesizer;

pub use error::{DiscoveryError, Result};
pub use mapping::EndpointKind;
pub use snapshot::{DiscoverySnapshot, EndpointDirection, EndpointRecord, ParticipantRecord};
pub use synthesizer::{synthesize, Synthesizer, SynthesizerConfig};
