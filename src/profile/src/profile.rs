//! Profile and rule records
//!
//! Both are plain value records: every transformation in this crate builds new
//! records instead of mutating the ones it was given.

use crate::error::{PatternError, StructureError};
use crate::pattern::PatternCache;
use crate::tree::{child_location, Element};
use crate::types::{Attachment, ObjectKind, Permission, Qualifier};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

pub(crate) const PROFILE_TAG: &str = "profile";
pub(crate) const ATTACHMENT_TAG: &str = "attachment";
pub(crate) const ATTACHMENTS_TAG: &str = "attachments";
pub(crate) const PERMISSIONS_TAG: &str = "permissions";
const NAME_ATTR: &str = "name";
const QUALIFIER_ATTR: &str = "qualifier";
const MODIFIER_ATTR: &str = "modifier";

/// One ALLOW/DENY statement over objects of a single kind
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rule {
    /// Object kind governed by the rule
    pub kind: ObjectKind,

    /// Allow or deny
    pub qualifier: Qualifier,

    /// Optional modifier tag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modifier: Option<String>,

    /// Object name patterns
    pub attachments: Vec<Attachment>,

    /// Permission verbs, in document order
    pub permissions: Vec<Permission>,
}

impl Rule {
    /// Create a rule with no attachments or permissions
    pub fn new(kind: ObjectKind, qualifier: Qualifier) -> Self {
        Self {
            kind,
            qualifier,
            modifier: None,
            attachments: Vec::new(),
            permissions: Vec::new(),
        }
    }

    /// Shorthand for an ALLOW rule
    pub fn allow(kind: ObjectKind) -> Self {
        Self::new(kind, Qualifier::Allow)
    }

    /// Shorthand for a DENY rule
    pub fn deny(kind: ObjectKind) -> Self {
        Self::new(kind, Qualifier::Deny)
    }

    pub fn with_modifier(mut self, modifier: impl Into<String>) -> Self {
        self.modifier = Some(modifier.into());
        self
    }

    pub fn with_attachment(mut self, pattern: impl Into<String>) -> Self {
        self.attachments.push(Attachment::new(pattern));
        self
    }

    pub fn with_permission(mut self, permission: Permission) -> Self {
        self.permissions.push(permission);
        self
    }

    /// Permission verbs as an unordered set
    pub fn permission_set(&self) -> BTreeSet<Permission> {
        self.permissions.iter().copied().collect()
    }

    /// Whether the rule lists `permission`
    pub fn grants(&self, permission: Permission) -> bool {
        self.permissions.contains(&permission)
    }

    /// Whether any attachment pattern matches `object`
    pub fn covers(&self, cache: &PatternCache, object: &str) -> Result<bool, PatternError> {
        for attachment in &self.attachments {
            if attachment.matches(cache, object)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Whether the rule applies to `permission` on `object`
    pub fn applies_to(
        &self,
        cache: &PatternCache,
        object: &str,
        permission: Permission,
    ) -> Result<bool, PatternError> {
        Ok(self.grants(permission) && self.covers(cache, object)?)
    }

    /// Build a rule from its element, checking structure
    pub fn from_element(element: &Element, location: &str) -> Result<Self, StructureError> {
        let kind = ObjectKind::from_tag(&element.tag).ok_or_else(|| {
            StructureError::UnknownObjectKind {
                kind: element.tag.clone(),
                location: location.to_string(),
            }
        })?;

        let raw_qualifier =
            element
                .attribute(QUALIFIER_ATTR)
                .ok_or_else(|| StructureError::MissingField {
                    field: format!("@{}", QUALIFIER_ATTR),
                    location: location.to_string(),
                })?;
        let qualifier = Qualifier::from_attribute(raw_qualifier).ok_or_else(|| {
            StructureError::UnknownQualifier {
                qualifier: raw_qualifier.to_string(),
                location: location.to_string(),
            }
        })?;

        let mut rule = Rule::new(kind, qualifier);
        rule.modifier = element.attribute(MODIFIER_ATTR).map(str::to_string);

        let mut seen_attachments = false;
        let mut seen_permissions = false;
        let mut counters = SiblingCounter::default();
        for child in &element.children {
            let child_loc = counters.location(location, &child.tag);
            match child.tag.as_str() {
                ATTACHMENTS_TAG => {
                    seen_attachments = true;
                    let mut inner = SiblingCounter::default();
                    for attachment in &child.children {
                        let loc = inner.location(&child_loc, &attachment.tag);
                        rule.attachments.push(parse_attachment(attachment, &loc)?);
                    }
                }
                PERMISSIONS_TAG => {
                    seen_permissions = true;
                    let mut inner = SiblingCounter::default();
                    for permission in &child.children {
                        let loc = inner.location(&child_loc, &permission.tag);
                        let verb = Permission::from_tag(&permission.tag).ok_or_else(|| {
                            StructureError::UnknownPermission {
                                verb: permission.tag.clone(),
                                location: loc,
                            }
                        })?;
                        rule.permissions.push(verb);
                    }
                }
                _ => {
                    return Err(StructureError::UnexpectedElement {
                        tag: child.tag.clone(),
                        location: child_loc,
                    })
                }
            }
        }

        if !seen_attachments || rule.attachments.is_empty() {
            return Err(StructureError::MissingAttachments {
                location: location.to_string(),
            });
        }
        if !seen_permissions {
            return Err(StructureError::MissingPermissions {
                location: location.to_string(),
            });
        }

        Ok(rule)
    }

    /// Render the rule as a tree element
    pub fn to_element(&self) -> Element {
        let mut element =
            Element::new(self.kind.as_str()).with_attribute(QUALIFIER_ATTR, self.qualifier.as_str());
        if let Some(modifier) = &self.modifier {
            element = element.with_attribute(MODIFIER_ATTR, modifier.clone());
        }

        let attachments = Element::new(ATTACHMENTS_TAG).with_children(
            self.attachments
                .iter()
                .map(|a| Element::new(ATTACHMENT_TAG).with_text(a.as_str())),
        );
        let permissions = Element::new(PERMISSIONS_TAG)
            .with_children(self.permissions.iter().map(|p| Element::new(p.as_str())));

        element.with_child(attachments).with_child(permissions)
    }
}

/// A rule or a nested profile, kept in document order
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileItem {
    Rule(Rule),
    Profile(Profile),
}

impl ProfileItem {
    pub fn as_rule(&self) -> Option<&Rule> {
        match self {
            ProfileItem::Rule(rule) => Some(rule),
            ProfileItem::Profile(_) => None,
        }
    }

    pub fn as_profile(&self) -> Option<&Profile> {
        match self {
            ProfileItem::Rule(_) => None,
            ProfileItem::Profile(profile) => Some(profile),
        }
    }

    /// Render the item as a tree element
    pub fn to_element(&self) -> Element {
        match self {
            ProfileItem::Rule(rule) => rule.to_element(),
            ProfileItem::Profile(profile) => profile.to_element(),
        }
    }
}

impl From<Rule> for ProfileItem {
    fn from(rule: Rule) -> Self {
        ProfileItem::Rule(rule)
    }
}

impl From<Profile> for ProfileItem {
    fn from(profile: Profile) -> Self {
        ProfileItem::Profile(profile)
    }
}

/// A named policy for the subjects matched by its attachments
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Profile {
    /// Profile name
    pub name: String,

    /// Subject name patterns
    #[serde(default)]
    pub attachments: Vec<Attachment>,

    /// Optional modifier tag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modifier: Option<String>,

    /// Rules and nested profiles, in document order
    #[serde(default)]
    pub items: Vec<ProfileItem>,
}

impl Profile {
    /// Create an empty profile
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attachments: Vec::new(),
            modifier: None,
            items: Vec::new(),
        }
    }

    pub fn with_attachment(mut self, pattern: impl Into<String>) -> Self {
        self.attachments.push(Attachment::new(pattern));
        self
    }

    pub fn with_modifier(mut self, modifier: impl Into<String>) -> Self {
        self.modifier = Some(modifier.into());
        self
    }

    pub fn with_rule(mut self, rule: Rule) -> Self {
        self.items.push(ProfileItem::Rule(rule));
        self
    }

    pub fn with_profile(mut self, profile: Profile) -> Self {
        self.items.push(ProfileItem::Profile(profile));
        self
    }

    /// Rules of this profile only, in document order
    pub fn rules(&self) -> impl Iterator<Item = &Rule> + '_ {
        self.items.iter().filter_map(ProfileItem::as_rule)
    }

    /// Directly nested profiles, in document order
    pub fn profiles(&self) -> impl Iterator<Item = &Profile> + '_ {
        self.items.iter().filter_map(ProfileItem::as_profile)
    }

    /// Whether any attachment pattern matches `subject`
    pub fn attaches_to(&self, cache: &PatternCache, subject: &str) -> Result<bool, PatternError> {
        for attachment in &self.attachments {
            if attachment.matches(cache, subject)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// This profile followed by its nested profiles, depth first
    pub fn walk(&self) -> Vec<&Profile> {
        let mut out = vec![self];
        for child in self.profiles() {
            out.extend(child.walk());
        }
        out
    }

    /// Rules of `kind` in this profile and its nested profiles, in document order
    ///
    /// A nested profile's rules come at the position the nested profile
    /// takes among its siblings.
    pub fn rules_of(&self, kind: ObjectKind) -> Vec<&Rule> {
        let mut out = Vec::new();
        self.collect_rules(kind, &mut out);
        out
    }

    fn collect_rules<'a>(&'a self, kind: ObjectKind, out: &mut Vec<&'a Rule>) {
        for item in &self.items {
            match item {
                ProfileItem::Rule(rule) if rule.kind == kind => out.push(rule),
                ProfileItem::Rule(_) => {}
                ProfileItem::Profile(nested) => nested.collect_rules(kind, out),
            }
        }
    }

    /// Total number of rules including nested profiles
    pub fn rule_count(&self) -> usize {
        self.walk().iter().map(|p| p.rules().count()).sum()
    }

    /// Build a profile from its element, checking structure
    pub fn from_element(element: &Element, location: &str) -> Result<Self, StructureError> {
        if element.tag != PROFILE_TAG {
            return Err(StructureError::UnexpectedElement {
                tag: element.tag.clone(),
                location: location.to_string(),
            });
        }

        let name = element
            .attribute(NAME_ATTR)
            .filter(|n| !n.is_empty())
            .ok_or_else(|| StructureError::MissingName {
                location: location.to_string(),
            })?;

        let mut profile = Profile::new(name);
        profile.modifier = element.attribute(MODIFIER_ATTR).map(str::to_string);

        let mut counters = SiblingCounter::default();
        for child in &element.children {
            let child_loc = counters.location(location, &child.tag);
            match child.tag.as_str() {
                ATTACHMENT_TAG => profile.attachments.push(parse_attachment(child, &child_loc)?),
                PROFILE_TAG => profile
                    .items
                    .push(Profile::from_element(child, &child_loc)?.into()),
                _ => profile.items.push(Rule::from_element(child, &child_loc)?.into()),
            }
        }

        Ok(profile)
    }

    /// Render the profile as a tree element
    ///
    /// Attachments come first, then rules and nested profiles in their order.
    pub fn to_element(&self) -> Element {
        let mut element = Element::new(PROFILE_TAG).with_attribute(NAME_ATTR, self.name.clone());
        if let Some(modifier) = &self.modifier {
            element = element.with_attribute(MODIFIER_ATTR, modifier.clone());
        }
        element
            .with_children(
                self.attachments
                    .iter()
                    .map(|a| Element::new(ATTACHMENT_TAG).with_text(a.as_str())),
            )
            .with_children(self.items.iter().map(ProfileItem::to_element))
    }
}

fn parse_attachment(element: &Element, location: &str) -> Result<Attachment, StructureError> {
    if element.tag != ATTACHMENT_TAG {
        return Err(StructureError::UnexpectedElement {
            tag: element.tag.clone(),
            location: location.to_string(),
        });
    }
    element
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(Attachment::new)
        .ok_or_else(|| StructureError::MissingField {
            field: "text()".to_string(),
            location: location.to_string(),
        })
}

/// Hands out 1-based per-tag sibling locations
#[derive(Default)]
pub(crate) struct SiblingCounter {
    seen: HashMap<String, usize>,
}

impl SiblingCounter {
    pub(crate) fn location(&mut self, parent: &str, tag: &str) -> String {
        let index = self.seen.entry(tag.to_string()).or_insert(0);
        *index += 1;
        child_location(parent, tag, *index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn talker_element() -> Element {
        Element::new("profile")
            .with_attribute("name", "talker")
            .with_child(Element::new("attachment").with_text("/talker"))
            .with_child(
                Element::new("ros_topic")
                    .with_attribute("qualifier", "ALLOW")
                    .with_child(
                        Element::new("attachments")
                            .with_child(Element::new("attachment").with_text("/chatter")),
                    )
                    .with_child(
                        Element::new("permissions")
                            .with_child(Element::new("ros_publish"))
                            .with_child(Element::new("ros_subscribe")),
                    ),
            )
    }

    #[test]
    fn test_profile_from_element() {
        let profile = Profile::from_element(&talker_element(), "profile[1]").unwrap();
        assert_eq!(profile.name, "talker");
        assert_eq!(profile.attachments, vec![Attachment::new("/talker")]);
        assert_eq!(profile.rules().count(), 1);

        let rule = profile.rules().next().unwrap();
        assert_eq!(rule.kind, ObjectKind::RosTopic);
        assert_eq!(rule.qualifier, Qualifier::Allow);
        assert!(rule.grants(Permission::RosPublish));
        assert!(!rule.grants(Permission::RosCall));
    }

    #[test]
    fn test_element_round_trip() {
        let element = talker_element();
        let profile = Profile::from_element(&element, "profile[1]").unwrap();
        assert_eq!(profile.to_element(), element);
    }

    #[test]
    fn test_missing_name() {
        let element = Element::new("profile");
        assert_eq!(
            Profile::from_element(&element, "profiles/profile[2]").unwrap_err(),
            StructureError::MissingName {
                location: "profiles/profile[2]".to_string()
            }
        );
    }

    #[test]
    fn test_rule_without_attachments() {
        let element = Element::new("profile").with_attribute("name", "p").with_child(
            Element::new("ros_topic")
                .with_attribute("qualifier", "DENY")
                .with_child(Element::new("permissions").with_child(Element::new("ros_publish"))),
        );
        assert_eq!(
            Profile::from_element(&element, "profile[1]").unwrap_err(),
            StructureError::MissingAttachments {
                location: "profile[1]/ros_topic[1]".to_string()
            }
        );
    }

    #[test]
    fn test_unknown_permission_location() {
        let element = Element::new("topic")
            .with_attribute("qualifier", "ALLOW")
            .with_child(
                Element::new("attachments")
                    .with_child(Element::new("attachment").with_text("/a")),
            )
            .with_child(
                Element::new("permissions")
                    .with_child(Element::new("publish"))
                    .with_child(Element::new("relay")),
            );
        assert_eq!(
            Rule::from_element(&element, "p/topic[1]").unwrap_err(),
            StructureError::UnknownPermission {
                verb: "relay".to_string(),
                location: "p/topic[1]/permissions[1]/relay[1]".to_string()
            }
        );
    }

    #[test]
    fn test_unknown_kind_and_qualifier() {
        let bad_kind = Element::new("profile")
            .with_attribute("name", "p")
            .with_child(Element::new("socket").with_attribute("qualifier", "ALLOW"));
        assert!(matches!(
            Profile::from_element(&bad_kind, "profile[1]"),
            Err(StructureError::UnknownObjectKind { .. })
        ));

        let bad_qualifier = Element::new("topic").with_attribute("qualifier", "MAYBE");
        assert!(matches!(
            Rule::from_element(&bad_qualifier, "topic[1]"),
            Err(StructureError::UnknownQualifier { .. })
        ));
    }

    #[test]
    fn test_rule_applies_to() {
        let cache = PatternCache::default();
        let rule = Rule::allow(ObjectKind::Topic)
            .with_attachment("/sensors/*")
            .with_permission(Permission::Subscribe);

        assert!(rule.applies_to(&cache, "/sensors/imu", Permission::Subscribe).unwrap());
        assert!(!rule.applies_to(&cache, "/sensors/imu", Permission::Publish).unwrap());
        assert!(!rule.applies_to(&cache, "/actuators/arm", Permission::Subscribe).unwrap());
    }

    #[test]
    fn test_rules_of_walks_nested_profiles() {
        let profile = Profile::new("outer")
            .with_rule(Rule::allow(ObjectKind::Topic).with_attachment("/a"))
            .with_profile(
                Profile::new("inner")
                    .with_rule(Rule::deny(ObjectKind::Topic).with_attachment("/b"))
                    .with_rule(Rule::allow(ObjectKind::Service).with_attachment("/c")),
            )
            .with_rule(Rule::allow(ObjectKind::Topic).with_attachment("/d"));

        let topics: Vec<&str> = profile
            .rules_of(ObjectKind::Topic)
            .iter()
            .map(|r| r.attachments[0].as_str())
            .collect();
        assert_eq!(topics, vec!["/a", "/b", "/d"]);
        assert_eq!(profile.rule_count(), 4);
        assert_eq!(profile.rules().count(), 2);
        assert_eq!(profile.profiles().count(), 1);
    }

    #[test]
    fn test_interleaved_children_round_trip() {
        let rule = |object: &str| {
            Element::new("topic")
                .with_attribute("qualifier", "ALLOW")
                .with_child(
                    Element::new("attachments")
                        .with_child(Element::new("attachment").with_text(object)),
                )
                .with_child(Element::new("permissions").with_child(Element::new("publish")))
        };
        let element = Element::new("profile")
            .with_attribute("name", "outer")
            .with_child(Element::new("attachment").with_text("/outer"))
            .with_child(rule("/a"))
            .with_child(
                Element::new("profile")
                    .with_attribute("name", "inner")
                    .with_child(rule("/b")),
            )
            .with_child(rule("/c"));

        let profile = Profile::from_element(&element, "profile[1]").unwrap();
        assert!(matches!(profile.items[1], ProfileItem::Profile(_)));
        assert_eq!(profile.to_element(), element);
    }
}
