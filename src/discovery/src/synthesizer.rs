//! Profile synthesis from discovery snapshots
//!
//! Every participant becomes a subject profile holding one ALLOW rule per
//! object it was seen using, with the union of the observed verbs. The
//! result is compressed and sorted, so the same records in any order yield
//! the same serialized profiles.

use crate::error::{DiscoveryError, Result};
use crate::mapping::{remap, split_prefix, EndpointKind};
use crate::snapshot::{DiscoverySnapshot, EndpointDirection, EndpointRecord};
use comarmor_profile::{
    compress, sort_profile, sort_tree, ObjectKind, Permission, Profile, ProfileStorage,
    ProfileTree, Rule,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::debug;

type ObjectGrants = BTreeMap<(ObjectKind, String), BTreeSet<Permission>>;

/// Synthesizer configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesizerConfig {
    /// Prepended to participant names to form subject names
    pub subject_prefix: String,

    /// Fail on endpoints with an unknown namespace prefix instead of skipping them
    pub strict_prefixes: bool,

    /// Drop the `Request`/`Reply` suffix from service object names
    pub strip_service_suffixes: bool,
}

impl Default for SynthesizerConfig {
    fn default() -> Self {
        Self {
            subject_prefix: "/".to_string(),
            strict_prefixes: false,
            strip_service_suffixes: true,
        }
    }
}

/// Builds candidate profiles from discovery snapshots
#[derive(Debug, Clone, Default)]
pub struct Synthesizer {
    config: SynthesizerConfig,
}

impl Synthesizer {
    pub fn new(config: SynthesizerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SynthesizerConfig {
        &self.config
    }

    /// Synthesize one profile tree from `snapshot`
    ///
    /// Participants sharing a name are folded into one profile.
    ///
    /// # Errors
    ///
    /// [`DiscoveryError::UnknownPrefix`] in strict mode only.
    pub fn synthesize(&self, snapshot: &DiscoverySnapshot) -> Result<ProfileStorage> {
        let mut subjects: Vec<String> = Vec::new();
        let mut grants: HashMap<String, ObjectGrants> = HashMap::new();

        for participant in &snapshot.participants {
            let subject = format!("{}{}", self.config.subject_prefix, participant.name);
            let objects = grants.entry(subject.clone()).or_insert_with(|| {
                subjects.push(subject.clone());
                ObjectGrants::new()
            });

            for (direction, endpoint) in participant.endpoints() {
                if let Some((kind, name, permission)) = self.classify(direction, endpoint)? {
                    objects.entry((kind, name)).or_default().insert(permission);
                }
            }
        }

        let profiles = subjects
            .into_iter()
            .map(|subject| {
                let objects = grants.remove(&subject).unwrap_or_default();
                let profile = build_profile(subject, objects);
                sort_profile(&compress(&profile))
            })
            .collect();

        let tree = sort_tree(&ProfileTree::new(profiles));
        debug!(
            participants = snapshot.participants.len(),
            profiles = tree.profiles.len(),
            "synthesized profiles from discovery"
        );
        Ok(ProfileStorage::from(vec![tree]))
    }

    /// Object kind, object name and verb of one endpoint
    ///
    /// Returns `Ok(None)` for an endpoint that is skipped.
    pub fn classify(
        &self,
        direction: EndpointDirection,
        endpoint: &EndpointRecord,
    ) -> Result<Option<(ObjectKind, String, Permission)>> {
        let (prefix, name) = match &endpoint.partition {
            Some(partition) => (
                partition.get(..2).unwrap_or(partition.as_str()),
                remap(partition, &endpoint.topic_name),
            ),
            None => match split_prefix(&endpoint.topic_name) {
                Some((prefix, rest)) => (prefix, rest.to_string()),
                None => (endpoint.topic_name.as_str(), String::new()),
            },
        };

        let Some(kind) = EndpointKind::from_prefix(prefix) else {
            if self.config.strict_prefixes {
                return Err(DiscoveryError::UnknownPrefix {
                    prefix: prefix.to_string(),
                    topic: endpoint.topic_name.clone(),
                });
            }
            debug!(
                topic = %endpoint.topic_name,
                partition = ?endpoint.partition,
                "skipping endpoint with unknown namespace prefix"
            );
            return Ok(None);
        };

        let name = if self.config.strip_service_suffixes {
            kind.strip_suffix(&name).to_string()
        } else {
            name
        };
        Ok(Some((kind.object_kind(), name, kind.permission(direction))))
    }
}

fn build_profile(subject: String, objects: ObjectGrants) -> Profile {
    objects.into_iter().fold(
        Profile::new(subject.clone()).with_attachment(subject),
        |profile, ((kind, name), permissions)| {
            let rule = permissions
                .into_iter()
                .fold(Rule::allow(kind).with_attachment(name), Rule::with_permission);
            profile.with_rule(rule)
        },
    )
}

/// Synthesize with the default configuration
pub fn synthesize(snapshot: &DiscoverySnapshot) -> Result<ProfileStorage> {
    Synthesizer::default().synthesize(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::ParticipantRecord;
    use comarmor_profile::Qualifier;

    #[test]
    fn test_classify_partitioned_endpoints() {
        let synthesizer = Synthesizer::default();
        let classify = |direction, topic: &str, partition: &str| {
            synthesizer
                .classify(direction, &EndpointRecord::new(topic).with_partition(partition))
                .unwrap()
        };

        assert_eq!(
            classify(EndpointDirection::Publication, "chatter", "rt"),
            Some((ObjectKind::RosTopic, "/chatter".to_string(), Permission::RosPublish))
        );
        assert_eq!(
            classify(EndpointDirection::Subscription, "add_two_intsRequest", "rq/ns"),
            Some((ObjectKind::RosService, "/ns/add_two_ints".to_string(), Permission::RosExecute))
        );
        assert_eq!(
            classify(EndpointDirection::Subscription, "add_two_intsReply", "rr"),
            Some((ObjectKind::RosService, "/add_two_ints".to_string(), Permission::RosCall))
        );
    }

    #[test]
    fn test_classify_prefixed_topic_names() {
        let synthesizer = Synthesizer::default();
        assert_eq!(
            synthesizer
                .classify(EndpointDirection::Publication, &EndpointRecord::new("rtFoo"))
                .unwrap(),
            Some((ObjectKind::RosTopic, "Foo".to_string(), Permission::RosPublish))
        );
        assert_eq!(
            synthesizer
                .classify(EndpointDirection::Publication, &EndpointRecord::new("rt/chatter"))
                .unwrap(),
            Some((ObjectKind::RosTopic, "/chatter".to_string(), Permission::RosPublish))
        );
    }

    #[test]
    fn test_unknown_prefix() {
        let endpoint = EndpointRecord::new("DCPSParticipant");
        assert_eq!(
            Synthesizer::default()
                .classify(EndpointDirection::Publication, &endpoint)
                .unwrap(),
            None
        );

        let strict = Synthesizer::new(SynthesizerConfig {
            strict_prefixes: true,
            ..Default::default()
        });
        assert_eq!(
            strict
                .classify(EndpointDirection::Publication, &endpoint)
                .unwrap_err(),
            DiscoveryError::UnknownPrefix {
                prefix: "DC".to_string(),
                topic: "DCPSParticipant".to_string()
            }
        );
    }

    #[test]
    fn test_keep_service_suffix() {
        let synthesizer = Synthesizer::new(SynthesizerConfig {
            strip_service_suffixes: false,
            ..Default::default()
        });
        let (_, name, _) = synthesizer
            .classify(
                EndpointDirection::Publication,
                &EndpointRecord::new("srvRequest").with_partition("rq"),
            )
            .unwrap()
            .unwrap();
        assert_eq!(name, "/srvRequest");
    }

    #[test]
    fn test_union_of_verbs() {
        let snapshot = DiscoverySnapshot::new(vec![
            ParticipantRecord::new("relay")
                .with_publication(EndpointRecord::new("chatter").with_partition("rt"))
                .with_subscription(EndpointRecord::new("chatter").with_partition("rt")),
            ParticipantRecord::new("relay")
                .with_publication(EndpointRecord::new("chatter").with_partition("rt")),
        ]);

        let storage = synthesize(&snapshot).unwrap();
        let profiles: Vec<&Profile> = storage.profiles().collect();
        assert_eq!(profiles.len(), 1);
        assert_eq!(profiles[0].name, "/relay");
        assert_eq!(profiles[0].rules().count(), 1);

        let rule = profiles[0].rules().next().unwrap();
        assert_eq!(rule.qualifier, Qualifier::Allow);
        assert_eq!(
            rule.permissions,
            vec![Permission::RosPublish, Permission::RosSubscribe]
        );
    }

    #[test]
    fn test_rules_are_compressed() {
        let snapshot = DiscoverySnapshot::new(vec![ParticipantRecord::new("talker")
            .with_publication(EndpointRecord::new("rt/rosout"))
            .with_publication(EndpointRecord::new("rt/chatter"))]);

        let storage = synthesize(&snapshot).unwrap();
        let talker = storage.profiles().next().unwrap();
        assert_eq!(talker.rules().count(), 1);
        let objects: Vec<&str> = talker
            .rules()
            .next()
            .unwrap()
            .attachments
            .iter()
            .map(|a| a.as_str())
            .collect();
        assert_eq!(objects, vec!["/chatter", "/rosout"]);
    }

    #[test]
    fn test_participant_without_endpoints() {
        let snapshot = DiscoverySnapshot::new(vec![ParticipantRecord::new("idle")]);
        let storage = synthesize(&snapshot).unwrap();
        let idle = storage.profiles().next().unwrap();
        assert_eq!(idle.attachments[0].as_str(), "/idle");
        assert_eq!(idle.rules().count(), 0);
    }
}
