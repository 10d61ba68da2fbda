//! Access graph construction
//!
//! Every subject attachment of a profile becomes a subject node and every
//! object attachment of its rules an object node of the rule's kind. Each
//! permission verb adds one edge, oriented by [`flow_of`].

use crate::graph::AccessGraph;
use comarmor_profile::{Permission, Profile, ProfileStorage};
use petgraph::graph::NodeIndex;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Direction data takes for a verb, seen from the subject
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Flow {
    /// Subject produces toward the object: edge is subject -> object
    Outbound,
    /// Subject consumes from the object: edge is object -> subject
    Inbound,
}

/// Direction table keyed by verb
pub fn flow_of(permission: Permission) -> Flow {
    match permission {
        Permission::Publish | Permission::Call | Permission::RosPublish | Permission::RosCall => {
            Flow::Outbound
        }
        Permission::Subscribe
        | Permission::Execute
        | Permission::RosSubscribe
        | Permission::RosExecute => Flow::Inbound,
    }
}

/// Add one verb between a subject and an object, oriented by data flow
pub fn connect(
    graph: &mut AccessGraph,
    subject: NodeIndex,
    object: NodeIndex,
    permission: Permission,
) {
    match flow_of(permission) {
        Flow::Outbound => graph.add_edge(subject, object, permission),
        Flow::Inbound => graph.add_edge(object, subject, permission),
    };
}

/// Build the access graph of every profile in `storage`
///
/// Nested profiles contribute their own subjects and rules. Rules of either
/// qualifier add edges; qualifiers are resolved later by the evaluator.
pub fn build(storage: &ProfileStorage) -> AccessGraph {
    let mut graph = AccessGraph::new();

    for tree in storage {
        for profile in tree.walk() {
            add_profile(&mut graph, profile);
        }
    }

    debug!(
        subjects = graph.subject_count(),
        objects = graph.object_count(),
        edges = graph.edge_count(),
        "built access graph"
    );
    graph
}

fn add_profile(graph: &mut AccessGraph, profile: &Profile) {
    for subject in &profile.attachments {
        let s = graph.add_subject(subject.as_str());
        for rule in profile.rules() {
            for object in &rule.attachments {
                let o = graph.add_object(rule.kind, object.as_str());
                for permission in &rule.permissions {
                    connect(graph, s, o, *permission);
                }
            }
        }
    }
}
