//! Rule compression and canonical ordering
//!
//! [`compress`] merges rules that only differ in the objects they name.
//! [`sort_element`] and the typed `sort_*` functions put a tree into a
//! canonical order so that equivalent profiles serialize identically.

use crate::profile::{Profile, ProfileItem, Rule, ATTACHMENTS_TAG, ATTACHMENT_TAG, PROFILE_TAG};
use crate::storage::{ProfileStorage, ProfileTree};
use crate::tree::Element;
use std::cmp::Ordering;

const NAME_ATTR: &str = "name";

/// Merge equivalent rules of a profile and its nested profiles
///
/// Two rules are equivalent when kind, qualifier, modifier and permission set
/// (ignoring order) are equal. The first rule of each class stays in place
/// and receives the attachments of later ones in source order; repeated
/// attachment text is dropped.
///
/// # Examples
///
/// ```
/// use comarmor_profile::{compress, ObjectKind, Permission, Profile, Rule};
///
/// let profile = Profile::new("p")
///     .with_rule(Rule::allow(ObjectKind::Topic).with_attachment("/a").with_permission(Permission::Publish))
///     .with_rule(Rule::allow(ObjectKind::Topic).with_attachment("/b").with_permission(Permission::Publish));
///
/// let compressed = compress(&profile);
/// assert_eq!(compressed.rules().count(), 1);
/// assert_eq!(compressed.rules().next().unwrap().attachments.len(), 2);
/// ```
pub fn compress(profile: &Profile) -> Profile {
    let mut items: Vec<ProfileItem> = Vec::with_capacity(profile.items.len());

    for item in &profile.items {
        let rule = match item {
            ProfileItem::Rule(rule) => rule,
            ProfileItem::Profile(nested) => {
                items.push(ProfileItem::Profile(compress(nested)));
                continue;
            }
        };

        let target = items.iter_mut().find_map(|merged| match merged {
            ProfileItem::Rule(merged) if equivalent(merged, rule) => Some(merged),
            _ => None,
        });
        match target {
            Some(target) => {
                for attachment in &rule.attachments {
                    if !target.attachments.contains(attachment) {
                        target.attachments.push(attachment.clone());
                    }
                }
            }
            None => items.push(ProfileItem::Rule(dedup_rule(rule))),
        }
    }

    Profile {
        name: profile.name.clone(),
        attachments: profile.attachments.clone(),
        modifier: profile.modifier.clone(),
        items,
    }
}

fn equivalent(a: &Rule, b: &Rule) -> bool {
    a.kind == b.kind
        && a.qualifier == b.qualifier
        && a.modifier == b.modifier
        && a.permission_set() == b.permission_set()
}

fn dedup_rule(rule: &Rule) -> Rule {
    let mut out = Rule {
        attachments: Vec::with_capacity(rule.attachments.len()),
        permissions: Vec::with_capacity(rule.permissions.len()),
        ..rule.clone()
    };
    for attachment in &rule.attachments {
        if !out.attachments.contains(attachment) {
            out.attachments.push(attachment.clone());
        }
    }
    for permission in &rule.permissions {
        if !out.permissions.contains(permission) {
            out.permissions.push(*permission);
        }
    }
    out
}

/// Compress every profile of a tree
pub fn compress_tree(tree: &ProfileTree) -> ProfileTree {
    ProfileTree {
        origin: tree.origin.clone(),
        profiles: tree.profiles.iter().map(compress).collect(),
    }
}

/// Compress every profile of a storage
pub fn compress_storage(storage: &ProfileStorage) -> ProfileStorage {
    storage.iter().map(compress_tree).collect()
}

/// Canonically order a generic tree
///
/// Children of every node are stably sorted by, in priority order: text,
/// tag, `name` attribute, then an attachment key that places `attachments`
/// containers first and orders rule-like nodes by their first
/// `attachments/attachment` text. A present value sorts ahead of an absent
/// one. Subtrees are ordered before their parent so keys are read from
/// already canonical children.
pub fn sort_element(element: &Element) -> Element {
    let mut children: Vec<Element> = element.children.iter().map(sort_element).collect();
    children.sort_by(compare_nodes);

    Element {
        tag: element.tag.clone(),
        attributes: element.attributes.clone(),
        text: element.text.clone(),
        children,
    }
}

fn compare_nodes(a: &Element, b: &Element) -> Ordering {
    present_first(a.text(), b.text())
        .then_with(|| a.tag.cmp(&b.tag))
        .then_with(|| present_first(a.attribute(NAME_ATTR), b.attribute(NAME_ATTR)))
        .then_with(|| (a.tag != ATTACHMENTS_TAG).cmp(&(b.tag != ATTACHMENTS_TAG)))
        .then_with(|| present_first(first_attachment(a), first_attachment(b)))
}

fn first_attachment(element: &Element) -> Option<&str> {
    element
        .child(ATTACHMENTS_TAG)
        .and_then(|a| a.child(ATTACHMENT_TAG))
        .and_then(Element::text)
}

fn present_first(a: Option<&str>, b: Option<&str>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Canonically order a profile
///
/// Subject attachments and each rule's attachments are ordered by text and
/// permissions by tag. Rules and nested profiles share one ordering, the
/// one [`sort_element`] gives their elements: tag, then profile name, then
/// first attachment. All sorts are stable.
pub fn sort_profile(profile: &Profile) -> Profile {
    let mut attachments = profile.attachments.clone();
    attachments.sort();

    let mut items: Vec<ProfileItem> = profile
        .items
        .iter()
        .map(|item| match item {
            ProfileItem::Rule(rule) => ProfileItem::Rule(sort_rule(rule)),
            ProfileItem::Profile(nested) => ProfileItem::Profile(sort_profile(nested)),
        })
        .collect();
    items.sort_by(compare_items);

    Profile {
        name: profile.name.clone(),
        attachments,
        modifier: profile.modifier.clone(),
        items,
    }
}

fn sort_rule(rule: &Rule) -> Rule {
    let mut sorted = rule.clone();
    sorted.attachments.sort();
    sorted.permissions.sort_by(|a, b| a.as_str().cmp(b.as_str()));
    sorted
}

fn compare_items(a: &ProfileItem, b: &ProfileItem) -> Ordering {
    item_tag(a)
        .cmp(item_tag(b))
        .then_with(|| present_first(item_name(a), item_name(b)))
        .then_with(|| present_first(item_attachment(a), item_attachment(b)))
}

fn item_tag(item: &ProfileItem) -> &str {
    match item {
        ProfileItem::Rule(rule) => rule.kind.as_str(),
        ProfileItem::Profile(_) => PROFILE_TAG,
    }
}

fn item_name(item: &ProfileItem) -> Option<&str> {
    item.as_profile().map(|p| p.name.as_str())
}

fn item_attachment(item: &ProfileItem) -> Option<&str> {
    item.as_rule()
        .and_then(|r| r.attachments.first())
        .map(|a| a.as_str())
}

/// Canonically order a tree: top-level profiles by name, each sorted
pub fn sort_tree(tree: &ProfileTree) -> ProfileTree {
    let mut profiles: Vec<Profile> = tree.profiles.iter().map(sort_profile).collect();
    profiles.sort_by(|a, b| a.name.cmp(&b.name));
    ProfileTree {
        origin: tree.origin.clone(),
        profiles,
    }
}

/// Canonically order every tree of a storage, keeping tree order
pub fn sort_storage(storage: &ProfileStorage) -> ProfileStorage {
    storage.iter().map(sort_tree).collect()
}
