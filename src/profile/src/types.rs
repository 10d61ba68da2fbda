//! Core profile vocabulary

use crate::error::PatternError;
use crate::pattern::{self, CompiledPattern, PatternCache};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Rule or edge disposition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Qualifier {
    /// Grant the permission
    Allow,
    /// Refuse the permission
    Deny,
}

impl Qualifier {
    /// Attribute value used in profile trees
    pub fn as_str(&self) -> &'static str {
        match self {
            Qualifier::Allow => "ALLOW",
            Qualifier::Deny => "DENY",
        }
    }

    /// Parse an attribute value
    pub fn from_attribute(value: &str) -> Option<Self> {
        match value {
            "ALLOW" => Some(Qualifier::Allow),
            "DENY" => Some(Qualifier::Deny),
            _ => None,
        }
    }
}

impl fmt::Display for Qualifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Permission verb
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    Call,
    Execute,
    Publish,
    Subscribe,
    RosCall,
    RosExecute,
    RosPublish,
    RosSubscribe,
}

impl Permission {
    /// Every known verb
    pub const ALL: [Permission; 8] = [
        Permission::Call,
        Permission::Execute,
        Permission::Publish,
        Permission::Subscribe,
        Permission::RosCall,
        Permission::RosExecute,
        Permission::RosPublish,
        Permission::RosSubscribe,
    ];

    /// Element tag used in profile trees
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::Call => "call",
            Permission::Execute => "execute",
            Permission::Publish => "publish",
            Permission::Subscribe => "subscribe",
            Permission::RosCall => "ros_call",
            Permission::RosExecute => "ros_execute",
            Permission::RosPublish => "ros_publish",
            Permission::RosSubscribe => "ros_subscribe",
        }
    }

    /// Parse an element tag
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.as_str() == tag)
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of object a rule governs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    Topic,
    Service,
    Action,
    RosTopic,
    RosService,
    RosAction,
    RosParameter,
}

impl ObjectKind {
    /// Every known kind
    pub const ALL: [ObjectKind; 7] = [
        ObjectKind::Topic,
        ObjectKind::Service,
        ObjectKind::Action,
        ObjectKind::RosTopic,
        ObjectKind::RosService,
        ObjectKind::RosAction,
        ObjectKind::RosParameter,
    ];

    /// Rule element tag
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectKind::Topic => "topic",
            ObjectKind::Service => "service",
            ObjectKind::Action => "action",
            ObjectKind::RosTopic => "ros_topic",
            ObjectKind::RosService => "ros_service",
            ObjectKind::RosAction => "ros_action",
            ObjectKind::RosParameter => "ros_parameter",
        }
    }

    /// Parse a rule element tag
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == tag)
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A glob pattern naming a subject or object
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Attachment {
    pattern: String,
}

impl Attachment {
    /// Create an attachment from its pattern text
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
        }
    }

    /// Pattern text
    pub fn as_str(&self) -> &str {
        &self.pattern
    }

    /// Compile the pattern
    pub fn compile(&self) -> Result<CompiledPattern, PatternError> {
        pattern::compile(&self.pattern)
    }

    /// Whether `candidate` matches, compiling through `cache`
    pub fn matches(&self, cache: &PatternCache, candidate: &str) -> Result<bool, PatternError> {
        cache.is_match(&self.pattern, candidate)
    }
}

impl fmt::Display for Attachment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pattern)
    }
}

impl From<&str> for Attachment {
    fn from(pattern: &str) -> Self {
        Self::new(pattern)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qualifier_round_trip() {
        assert_eq!(Qualifier::from_attribute("ALLOW"), Some(Qualifier::Allow));
        assert_eq!(Qualifier::from_attribute("DENY"), Some(Qualifier::Deny));
        assert_eq!(Qualifier::from_attribute("allow"), None);
        assert_eq!(
            serde_json::to_string(&Qualifier::Deny).unwrap(),
            "\"DENY\""
        );
    }

    #[test]
    fn test_permission_tags() {
        for permission in Permission::ALL {
            assert_eq!(Permission::from_tag(permission.as_str()), Some(permission));
            let json = serde_json::to_string(&permission).unwrap();
            assert_eq!(json, format!("\"{}\"", permission.as_str()));
        }
        assert_eq!(Permission::from_tag("read"), None);
    }

    #[test]
    fn test_object_kind_tags() {
        for kind in ObjectKind::ALL {
            assert_eq!(ObjectKind::from_tag(kind.as_str()), Some(kind));
        }
        assert_eq!(ObjectKind::from_tag("profile"), None);
        assert_eq!(ObjectKind::from_tag("attachment"), None);
    }

    #[test]
    fn test_attachment_matching() {
        let cache = PatternCache::default();
        let attachment = Attachment::new("/chatter*");
        assert!(attachment.matches(&cache, "/chatter_out").unwrap());
        assert!(!attachment.matches(&cache, "/other").unwrap());
        assert!(Attachment::new("{a").compile().is_err());
    }
}
