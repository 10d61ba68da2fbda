//! Access graph structure
//!
//! Subjects are keyed by name and objects by (kind, name), so a topic and a
//! service sharing a name stay distinct nodes. Edges are unique per
//! (source, target, verb).

use comarmor_profile::{ObjectKind, Permission, Qualifier};
use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Whether a node is a subject or an object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeRole {
    Subject,
    Object,
}

/// Graph node
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccessNode {
    /// Subject or object name, as written in the attachment
    pub name: String,

    pub role: NodeRole,

    /// Object kind; `None` for subjects
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ObjectKind>,
}

impl AccessNode {
    pub fn subject(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            role: NodeRole::Subject,
            kind: None,
        }
    }

    pub fn object(kind: ObjectKind, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            role: NodeRole::Object,
            kind: Some(kind),
        }
    }

    pub fn is_subject(&self) -> bool {
        self.role == NodeRole::Subject
    }
}

impl fmt::Display for AccessNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Graph edge: one permission verb and its resolved qualifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccessEdge {
    pub permission: Permission,

    /// `None` until the edge has been evaluated
    #[serde(default)]
    pub qualifier: Option<Qualifier>,
}

impl AccessEdge {
    pub fn new(permission: Permission) -> Self {
        Self {
            permission,
            qualifier: None,
        }
    }
}

impl fmt::Display for AccessEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.permission.as_str())
    }
}

/// One verb between a subject and an object, whichever way the edge points
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Access {
    pub edge: EdgeIndex,
    pub subject: NodeIndex,
    pub object: NodeIndex,
    pub permission: Permission,
}

/// Directed subject/object graph
#[derive(Debug, Clone, Default)]
pub struct AccessGraph {
    graph: DiGraph<AccessNode, AccessEdge>,
    subjects: HashMap<String, NodeIndex>,
    objects: HashMap<(ObjectKind, String), NodeIndex>,
    edges: HashMap<(NodeIndex, NodeIndex, Permission), EdgeIndex>,
}

impl AccessGraph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a subject node, or return the existing one
    pub fn add_subject(&mut self, name: &str) -> NodeIndex {
        if let Some(&index) = self.subjects.get(name) {
            return index;
        }
        let index = self.graph.add_node(AccessNode::subject(name));
        self.subjects.insert(name.to_string(), index);
        index
    }

    /// Add an object node, or return the existing one
    pub fn add_object(&mut self, kind: ObjectKind, name: &str) -> NodeIndex {
        let key = (kind, name.to_string());
        if let Some(&index) = self.objects.get(&key) {
            return index;
        }
        let index = self.graph.add_node(AccessNode::object(kind, name));
        self.objects.insert(key, index);
        index
    }

    /// Add a `permission` edge from `source` to `target`, or return the existing one
    pub fn add_edge(
        &mut self,
        source: NodeIndex,
        target: NodeIndex,
        permission: Permission,
    ) -> EdgeIndex {
        if let Some(&index) = self.edges.get(&(source, target, permission)) {
            return index;
        }
        let index = self
            .graph
            .add_edge(source, target, AccessEdge::new(permission));
        self.edges.insert((source, target, permission), index);
        index
    }

    pub fn subject(&self, name: &str) -> Option<NodeIndex> {
        self.subjects.get(name).copied()
    }

    pub fn object(&self, kind: ObjectKind, name: &str) -> Option<NodeIndex> {
        self.objects.get(&(kind, name.to_string())).copied()
    }

    pub fn node(&self, index: NodeIndex) -> Option<&AccessNode> {
        self.graph.node_weight(index)
    }

    pub fn edge(&self, index: EdgeIndex) -> Option<&AccessEdge> {
        self.graph.edge_weight(index)
    }

    /// Subject nodes in insertion order
    pub fn subjects(&self) -> impl Iterator<Item = (NodeIndex, &AccessNode)> + '_ {
        self.graph
            .node_indices()
            .filter_map(move |i| self.graph.node_weight(i).map(|n| (i, n)))
            .filter(|(_, n)| n.is_subject())
    }

    /// Object nodes in insertion order
    pub fn objects(&self) -> impl Iterator<Item = (NodeIndex, &AccessNode)> + '_ {
        self.graph
            .node_indices()
            .filter_map(move |i| self.graph.node_weight(i).map(|n| (i, n)))
            .filter(|(_, n)| !n.is_subject())
    }

    /// Every verb linking `subject` to an object, in either direction
    pub fn accesses(&self, subject: NodeIndex) -> Vec<Access> {
        let outgoing = self
            .graph
            .edges_directed(subject, Direction::Outgoing)
            .map(|e| (e.id(), e.target(), e.weight().permission));
        let incoming = self
            .graph
            .edges_directed(subject, Direction::Incoming)
            .map(|e| (e.id(), e.source(), e.weight().permission));

        let mut accesses: Vec<Access> = outgoing
            .chain(incoming)
            .map(|(edge, object, permission)| Access {
                edge,
                subject,
                object,
                permission,
            })
            .collect();
        accesses.sort_by_key(|a| a.edge.index());
        accesses
    }

    /// Record the resolved qualifier of an edge
    pub fn set_qualifier(&mut self, edge: EdgeIndex, qualifier: Qualifier) {
        if let Some(weight) = self.graph.edge_weight_mut(edge) {
            weight.qualifier = Some(qualifier);
        }
    }

    /// Qualifier of the `permission` edge between a subject and an object
    ///
    /// Returns `None` when there is no such edge or it has not been evaluated.
    pub fn qualifier(
        &self,
        subject: &str,
        kind: ObjectKind,
        object: &str,
        permission: Permission,
    ) -> Option<Qualifier> {
        let s = self.subject(subject)?;
        let o = self.object(kind, object)?;
        let edge = self
            .edges
            .get(&(s, o, permission))
            .or_else(|| self.edges.get(&(o, s, permission)))?;
        self.graph.edge_weight(*edge)?.qualifier
    }

    /// Whether an edge `source -> target` carrying `permission` exists
    pub fn has_edge(&self, source: NodeIndex, target: NodeIndex, permission: Permission) -> bool {
        self.edges.contains_key(&(source, target, permission))
    }

    /// Every edge as (source, target, edge)
    pub fn edges(&self) -> impl Iterator<Item = (&AccessNode, &AccessNode, &AccessEdge)> + '_ {
        self.graph
            .edge_references()
            .map(move |e| (&self.graph[e.source()], &self.graph[e.target()], e.weight()))
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn subject_count(&self) -> usize {
        self.subjects.len()
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Underlying petgraph graph
    pub fn inner(&self) -> &DiGraph<AccessNode, AccessEdge> {
        &self.graph
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nodes_are_deduplicated() {
        let mut graph = AccessGraph::new();
        let a = graph.add_subject("/talker");
        let b = graph.add_subject("/talker");
        assert_eq!(a, b);

        let topic = graph.add_object(ObjectKind::RosTopic, "/chatter");
        let service = graph.add_object(ObjectKind::RosService, "/chatter");
        assert_ne!(topic, service);
        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.subject_count(), 1);
        assert_eq!(graph.object_count(), 2);
    }

    #[test]
    fn test_edges_unique_per_verb() {
        let mut graph = AccessGraph::new();
        let s = graph.add_subject("/talker");
        let o = graph.add_object(ObjectKind::Topic, "/chatter");

        let first = graph.add_edge(s, o, Permission::Publish);
        let again = graph.add_edge(s, o, Permission::Publish);
        graph.add_edge(o, s, Permission::Subscribe);

        assert_eq!(first, again);
        assert_eq!(graph.edge_count(), 2);
        assert!(graph.has_edge(s, o, Permission::Publish));
        assert!(!graph.has_edge(o, s, Permission::Publish));
    }

    #[test]
    fn test_accesses_cover_both_directions() {
        let mut graph = AccessGraph::new();
        let s = graph.add_subject("/node");
        let out = graph.add_object(ObjectKind::Topic, "/out");
        let inp = graph.add_object(ObjectKind::Topic, "/in");
        graph.add_edge(s, out, Permission::Publish);
        graph.add_edge(inp, s, Permission::Subscribe);

        let accesses = graph.accesses(s);
        assert_eq!(accesses.len(), 2);
        assert_eq!(accesses[0].object, out);
        assert_eq!(accesses[1].object, inp);
        assert_eq!(accesses[1].permission, Permission::Subscribe);
    }

    #[test]
    fn test_qualifier_lookup() {
        let mut graph = AccessGraph::new();
        let s = graph.add_subject("/node");
        let o = graph.add_object(ObjectKind::Topic, "/in");
        let edge = graph.add_edge(o, s, Permission::Subscribe);

        assert_eq!(
            graph.qualifier("/node", ObjectKind::Topic, "/in", Permission::Subscribe),
            None
        );
        graph.set_qualifier(edge, Qualifier::Allow);
        assert_eq!(
            graph.qualifier("/node", ObjectKind::Topic, "/in", Permission::Subscribe),
            Some(Qualifier::Allow)
        );
        assert_eq!(
            graph.qualifier("/node", ObjectKind::Service, "/in", Permission::Subscribe),
            None
        );
    }
}
