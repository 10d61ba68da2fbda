//! Profile trees and storage
//!
//! A [`ProfileTree`] is the typed form of one `profiles` document as handed
//! over by the loader; a [`ProfileStorage`] is an ordered collection of them.
//! Filtering, rule extraction and structural queries are pure: each returns
//! new data and leaves its operand untouched.

use crate::error::{Result, StructureError};
use crate::pattern::PatternCache;
use crate::profile::{Profile, ProfileItem, Rule, SiblingCounter, PROFILE_TAG};
use crate::tree::{Element, RESULTS_TAG};
use crate::types::ObjectKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Root tag of a profile document
pub const PROFILES_TAG: &str = "profiles";

/// Typed form of one profile document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileTree {
    /// Where the loader found this document, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,

    /// Top-level profiles, in document order
    pub profiles: Vec<Profile>,
}

impl ProfileTree {
    /// Create a tree from top-level profiles
    pub fn new(profiles: Vec<Profile>) -> Self {
        Self {
            origin: None,
            profiles,
        }
    }

    /// Attach a source label
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    /// Build a tree from a `profiles` root or a single `profile` root
    pub fn from_element(root: &Element) -> Result<Self> {
        match root.tag.as_str() {
            PROFILES_TAG => {
                let mut counters = SiblingCounter::default();
                let profiles = root
                    .children
                    .iter()
                    .map(|child| {
                        let location = counters.location(PROFILES_TAG, &child.tag);
                        Profile::from_element(child, &location)
                    })
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(Self::new(profiles))
            }
            PROFILE_TAG => Ok(Self::new(vec![Profile::from_element(root, PROFILE_TAG)?])),
            other => Err(StructureError::UnexpectedElement {
                tag: other.to_string(),
                location: other.to_string(),
            }
            .into()),
        }
    }

    /// Render as a `profiles` root element
    pub fn to_element(&self) -> Element {
        Element::new(PROFILES_TAG).with_children(self.profiles.iter().map(Profile::to_element))
    }

    /// Whether the tree holds no profile
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Every profile, nested ones included, depth first
    pub fn walk(&self) -> Vec<&Profile> {
        self.profiles.iter().flat_map(Profile::walk).collect()
    }

    /// Keep only the profiles attached to `subject`
    ///
    /// A profile survives when one of its attachment patterns matches the
    /// subject; its nested profiles are filtered the same way. A profile that
    /// does not match is dropped together with everything below it.
    pub fn filter(&self, subject: &str) -> Result<Self> {
        self.filter_with(&PatternCache::default(), subject)
    }

    /// [`filter`](Self::filter) compiling patterns through `cache`
    pub fn filter_with(&self, cache: &PatternCache, subject: &str) -> Result<Self> {
        let mut profiles = Vec::new();
        for profile in &self.profiles {
            if let Some(kept) = filter_profile(cache, profile, subject)? {
                profiles.push(kept);
            }
        }
        Ok(Self {
            origin: self.origin.clone(),
            profiles,
        })
    }

    /// All rules of `kind`, in document order
    pub fn extract_rules(&self, kind: ObjectKind) -> Vec<Rule> {
        self.profiles
            .iter()
            .flat_map(|p| p.rules_of(kind))
            .cloned()
            .collect()
    }

    /// Structural lookup relative to the `profiles` root
    ///
    /// Matches are copied into a new `results` element.
    pub fn query(&self, path: &str) -> Result<Element> {
        self.to_element().query(path)
    }
}

fn filter_profile(cache: &PatternCache, profile: &Profile, subject: &str) -> Result<Option<Profile>> {
    if !profile.attaches_to(cache, subject)? {
        return Ok(None);
    }

    let mut items = Vec::with_capacity(profile.items.len());
    for item in &profile.items {
        match item {
            ProfileItem::Rule(rule) => items.push(ProfileItem::Rule(rule.clone())),
            ProfileItem::Profile(child) => {
                if let Some(kept) = filter_profile(cache, child, subject)? {
                    items.push(ProfileItem::Profile(kept));
                }
            }
        }
    }

    Ok(Some(Profile {
        name: profile.name.clone(),
        attachments: profile.attachments.clone(),
        modifier: profile.modifier.clone(),
        items,
    }))
}

/// Ordered collection of profile trees
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileStorage {
    trees: Vec<ProfileTree>,
}

impl ProfileStorage {
    /// Create an empty storage
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a tree
    pub fn push(&mut self, tree: ProfileTree) {
        self.trees.push(tree);
    }

    /// Number of trees
    pub fn len(&self) -> usize {
        self.trees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }

    /// Trees in order
    pub fn trees(&self) -> &[ProfileTree] {
        &self.trees
    }

    /// Iterate over trees
    pub fn iter(&self) -> std::slice::Iter<'_, ProfileTree> {
        self.trees.iter()
    }

    /// Top-level profiles of every tree, in order
    pub fn profiles(&self) -> impl Iterator<Item = &Profile> + '_ {
        self.trees.iter().flat_map(|t| t.profiles.iter())
    }

    /// Filter every tree by `subject`, dropping trees left empty
    pub fn filter(&self, subject: &str) -> Result<Self> {
        self.filter_with(&PatternCache::default(), subject)
    }

    /// [`filter`](Self::filter) compiling patterns through `cache`
    pub fn filter_with(&self, cache: &PatternCache, subject: &str) -> Result<Self> {
        let mut trees = Vec::with_capacity(self.trees.len());
        for tree in &self.trees {
            let filtered = tree.filter_with(cache, subject)?;
            if !filtered.is_empty() {
                trees.push(filtered);
            }
        }
        Ok(Self { trees })
    }

    /// All rules of `kind` across every tree, in order
    pub fn extract_rules(&self, kind: ObjectKind) -> Vec<Rule> {
        self.trees.iter().flat_map(|t| t.extract_rules(kind)).collect()
    }

    /// Structural lookup in every tree, collected into one `results` element
    pub fn query(&self, path: &str) -> Result<Element> {
        let mut results = Element::new(RESULTS_TAG);
        for tree in &self.trees {
            results.children.extend(tree.query(path)?.children);
        }
        Ok(results)
    }

    /// Names used by more than one profile, nested profiles included
    ///
    /// Returned in sorted order. The storage itself never rejects duplicates.
    pub fn duplicate_names(&self) -> Vec<String> {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for tree in &self.trees {
            for profile in tree.walk() {
                *counts.entry(profile.name.as_str()).or_insert(0) += 1;
            }
        }
        counts
            .into_iter()
            .filter(|(_, count)| *count > 1)
            .map(|(name, _)| name.to_string())
            .collect()
    }

    /// Fail on the first duplicated profile name
    pub fn ensure_unique_names(&self) -> Result<()> {
        match self.duplicate_names().into_iter().next() {
            Some(name) => {
                debug!(%name, "duplicate profile name");
                Err(StructureError::DuplicateProfile { name }.into())
            }
            None => Ok(()),
        }
    }
}

impl From<Vec<ProfileTree>> for ProfileStorage {
    fn from(trees: Vec<ProfileTree>) -> Self {
        Self { trees }
    }
}

impl FromIterator<ProfileTree> for ProfileStorage {
    fn from_iter<I: IntoIterator<Item = ProfileTree>>(iter: I) -> Self {
        Self {
            trees: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for ProfileStorage {
    type Item = ProfileTree;
    type IntoIter = std::vec::IntoIter<ProfileTree>;

    fn into_iter(self) -> Self::IntoIter {
        self.trees.into_iter()
    }
}

impl<'a> IntoIterator for &'a ProfileStorage {
    type Item = &'a ProfileTree;
    type IntoIter = std::slice::Iter<'a, ProfileTree>;

    fn into_iter(self) -> Self::IntoIter {
        self.trees.iter()
    }
}
