//! Graphviz export

use crate::graph::{AccessEdge, AccessGraph, AccessNode, NodeRole};
use comarmor_profile::{ObjectKind, Permission, Qualifier};
use petgraph::dot::Dot;
use petgraph::graph::{DiGraph, EdgeReference, NodeIndex};

const SUBJECT_COLOR: &str = "#38761dff";

fn kind_color(kind: ObjectKind) -> &'static str {
    match kind {
        ObjectKind::Topic | ObjectKind::RosTopic => "#0b5394ff",
        ObjectKind::Service | ObjectKind::RosService => "#741b47ff",
        ObjectKind::Action | ObjectKind::RosAction => "#351c75ff",
        ObjectKind::RosParameter => "#bf9000ff",
    }
}

fn qualifier_color(qualifier: Qualifier) -> &'static str {
    match qualifier {
        Qualifier::Allow => "green",
        Qualifier::Deny => "red",
    }
}

fn permission_color(permission: Permission) -> &'static str {
    match permission {
        Permission::Publish
        | Permission::Subscribe
        | Permission::RosPublish
        | Permission::RosSubscribe => "#3d85c6",
        Permission::Call | Permission::Execute | Permission::RosCall | Permission::RosExecute => {
            "#a64d79"
        }
    }
}

/// Fill colour of a node
pub fn node_color(node: &AccessNode) -> &'static str {
    match (node.role, node.kind) {
        (NodeRole::Object, Some(kind)) => kind_color(kind),
        _ => SUBJECT_COLOR,
    }
}

/// Line colour of an edge: its verdict once evaluated, its verb before
pub fn edge_color(edge: &AccessEdge) -> &'static str {
    match edge.qualifier {
        Some(qualifier) => qualifier_color(qualifier),
        None => permission_color(edge.permission),
    }
}

impl AccessGraph {
    /// Render as a Graphviz digraph
    ///
    /// Nodes are labelled by name, edges by verb.
    pub fn to_dot(&self) -> String {
        let graph = self.inner();
        let edge_attrs = |_: &DiGraph<AccessNode, AccessEdge>, edge: EdgeReference<'_, AccessEdge>| {
            format!("color=\"{}\"", edge_color(edge.weight()))
        };
        let node_attrs = |_: &DiGraph<AccessNode, AccessEdge>, (_, node): (NodeIndex, &AccessNode)| {
            format!(
                "color=\"{}\" style=filled fontcolor=white",
                node_color(node)
            )
        };
        format!(
            "{}",
            Dot::with_attr_getters(graph, &[], &edge_attrs, &node_attrs)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_colors() {
        assert_eq!(node_color(&AccessNode::subject("/a")), "#38761dff");
        assert_eq!(
            node_color(&AccessNode::object(ObjectKind::RosService, "/s")),
            "#741b47ff"
        );

        let mut edge = AccessEdge::new(Permission::RosCall);
        assert_eq!(edge_color(&edge), "#a64d79");
        edge.qualifier = Some(Qualifier::Deny);
        assert_eq!(edge_color(&edge), "red");
    }

    #[test]
    fn test_to_dot() {
        let mut graph = AccessGraph::new();
        let s = graph.add_subject("/talker");
        let o = graph.add_object(ObjectKind::Topic, "/chatter");
        let e = graph.add_edge(s, o, Permission::Publish);
        graph.set_qualifier(e, Qualifier::Allow);

        let dot = graph.to_dot();
        assert!(dot.starts_with("digraph"));
        assert!(dot.contains("label = \"/talker\""));
        assert!(dot.contains("label = \"publish\""));
        assert!(dot.contains("color=\"green\""));
        assert!(dot.contains("color=\"#0b5394ff\""));
    }
}
