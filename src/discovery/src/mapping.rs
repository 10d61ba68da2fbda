//! Namespace prefix and permission tables
//!
//! Middleware endpoints carry a two-character namespace prefix, either on
//! their partition or on the topic name itself:
//!
//! | Prefix | Endpoint | Object kind |
//! |---|---|---|
//! | `rt` | topic | `ros_topic` |
//! | `rq` | service request | `ros_service` |
//! | `rr` | service reply | `ros_service` |

use crate::snapshot::EndpointDirection;
use comarmor_profile::{ObjectKind, Permission};
use serde::{Deserialize, Serialize};

const PREFIX_LEN: usize = 2;

/// What an endpoint carries, read from its namespace prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndpointKind {
    RosTopic,
    RosRequest,
    RosReply,
}

impl EndpointKind {
    /// Look up a two-character prefix
    pub fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix {
            "rt" => Some(EndpointKind::RosTopic),
            "rq" => Some(EndpointKind::RosRequest),
            "rr" => Some(EndpointKind::RosReply),
            _ => None,
        }
    }

    /// Object kind of the rule the endpoint maps to
    pub fn object_kind(&self) -> ObjectKind {
        match self {
            EndpointKind::RosTopic => ObjectKind::RosTopic,
            EndpointKind::RosRequest | EndpointKind::RosReply => ObjectKind::RosService,
        }
    }

    /// Name suffix the middleware appends for this endpoint, if any
    pub fn suffix(&self) -> Option<&'static str> {
        match self {
            EndpointKind::RosTopic => None,
            EndpointKind::RosRequest => Some("Request"),
            EndpointKind::RosReply => Some("Reply"),
        }
    }

    /// Drop the request/reply suffix from an object name
    pub fn strip_suffix<'a>(&self, name: &'a str) -> &'a str {
        self.suffix()
            .and_then(|suffix| name.strip_suffix(suffix))
            .unwrap_or(name)
    }

    /// Permission verb for an endpoint of this kind in `direction`
    ///
    /// Publishing a request or subscribing to a reply is the client side of
    /// a service (`ros_call`); the opposite pair is the server side
    /// (`ros_execute`).
    pub fn permission(&self, direction: EndpointDirection) -> Permission {
        match (direction, self) {
            (EndpointDirection::Publication, EndpointKind::RosTopic) => Permission::RosPublish,
            (EndpointDirection::Publication, EndpointKind::RosRequest) => Permission::RosCall,
            (EndpointDirection::Publication, EndpointKind::RosReply) => Permission::RosExecute,
            (EndpointDirection::Subscription, EndpointKind::RosTopic) => Permission::RosSubscribe,
            (EndpointDirection::Subscription, EndpointKind::RosRequest) => Permission::RosExecute,
            (EndpointDirection::Subscription, EndpointKind::RosReply) => Permission::RosCall,
        }
    }
}

/// Split a prefixed name into its prefix and remainder
///
/// Returns `None` when the name is shorter than a prefix.
pub fn split_prefix(name: &str) -> Option<(&str, &str)> {
    Some((name.get(..PREFIX_LEN)?, name.get(PREFIX_LEN..)?))
}

/// Object name of a topic published under `partition`
///
/// The partition minus its prefix is the namespace; an empty namespace
/// places the topic at the root.
pub fn remap(partition: &str, topic: &str) -> String {
    let namespace = partition.get(PREFIX_LEN..).unwrap_or("");
    if namespace.is_empty() {
        format!("/{}", topic)
    } else {
        format!("{}/{}", namespace, topic)
    }
}
