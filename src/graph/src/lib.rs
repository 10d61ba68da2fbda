//! # ComArmor Graph Module
//!
//! Subject/object access graphs derived from profile storage.
//!
//! ## Features
//!
//! - **Access Graph**: Subjects and objects as nodes, permission verbs as edges
//! - **Data-flow Direction**: Edges point the way data flows, not the way access is granted
//! - **Evaluation**: Fail-closed ALLOW/DENY resolution per edge
//! - **Visualisation**: Graphviz DOT export with per-kind and per-verdict colours
//!
//! ## Module Structure
//!
//! ```text
//! graph/
//! ├── graph/      - Access graph, nodes and edges
//! ├── builder/    - Graph construction and direction table
//! ├── evaluator/  - Edge resolution against profile storage
//! └── dot/        - Graphviz export
//! ```

pub mod builder;
pub mod dot;
pub mod evaluator;
pub mod graph;

pub use builder::{build, connect, flow_of, Flow};
pub use dot::{edge_color, node_color};
pub use evaluator::{evaluate, EvaluationReport, Evaluator, EvaluatorConfig, Resolution};
pub use graph::{Access, AccessEdge, AccessGraph, AccessNode, NodeRole};
