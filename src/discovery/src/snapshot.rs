//! Typed discovery records
//!
//! A snapshot arrives as a generic element tree:
//!
//! ```text
//! processes/value/element/domain_participants/value/element/
//! ├── participant_data/participant_name/name
//! ├── publications/value/element/publication_data/{topic_name, partition/name/element}
//! └── subscriptions/value/element/subscription_data/{topic_name, partition/name/element}
//! ```

use crate::error::Result;
use comarmor_profile::{tree::child_location, Element, StructureError};
use serde::{Deserialize, Serialize};

const PARTICIPANTS_PATH: &str = "processes/value/element/domain_participants/value/element";
const PARTICIPANT_NAME_PATH: &str = "participant_data/participant_name/name";
const PUBLICATIONS_PATH: &str = "publications/value/element/publication_data";
const SUBSCRIPTIONS_PATH: &str = "subscriptions/value/element/subscription_data";
const TOPIC_NAME_PATH: &str = "topic_name";
const PARTITION_PATH: &str = "partition/name/element";

/// Whether an endpoint writes or reads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndpointDirection {
    Publication,
    Subscription,
}

/// One publication or subscription
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EndpointRecord {
    pub topic_name: String,

    /// First partition name, when the endpoint has one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partition: Option<String>,
}

impl EndpointRecord {
    pub fn new(topic_name: impl Into<String>) -> Self {
        Self {
            topic_name: topic_name.into(),
            partition: None,
        }
    }

    pub fn with_partition(mut self, partition: impl Into<String>) -> Self {
        self.partition = Some(partition.into());
        self
    }

    fn from_element(element: &Element, location: &str) -> Result<Self> {
        let topic_name = element
            .find_text(TOPIC_NAME_PATH)?
            .ok_or_else(|| StructureError::MissingField {
                field: TOPIC_NAME_PATH.to_string(),
                location: location.to_string(),
            })?;
        Ok(Self {
            topic_name: topic_name.to_string(),
            partition: element.find_text(PARTITION_PATH)?.map(str::to_string),
        })
    }
}

/// One domain participant and its endpoints
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParticipantRecord {
    pub name: String,

    #[serde(default)]
    pub publications: Vec<EndpointRecord>,

    #[serde(default)]
    pub subscriptions: Vec<EndpointRecord>,
}

impl ParticipantRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            publications: Vec::new(),
            subscriptions: Vec::new(),
        }
    }

    pub fn with_publication(mut self, endpoint: EndpointRecord) -> Self {
        self.publications.push(endpoint);
        self
    }

    pub fn with_subscription(mut self, endpoint: EndpointRecord) -> Self {
        self.subscriptions.push(endpoint);
        self
    }

    /// Every endpoint with its direction, publications first
    pub fn endpoints(&self) -> impl Iterator<Item = (EndpointDirection, &EndpointRecord)> + '_ {
        self.publications
            .iter()
            .map(|e| (EndpointDirection::Publication, e))
            .chain(
                self.subscriptions
                    .iter()
                    .map(|e| (EndpointDirection::Subscription, e)),
            )
    }

    fn from_element(element: &Element, location: &str) -> Result<Self> {
        let name = element
            .find_text(PARTICIPANT_NAME_PATH)?
            .filter(|n| !n.is_empty())
            .ok_or_else(|| StructureError::MissingName {
                location: location.to_string(),
            })?;

        let mut participant = ParticipantRecord::new(name);
        for (index, data) in element.find_all(PUBLICATIONS_PATH)?.into_iter().enumerate() {
            let loc = child_location(location, PUBLICATIONS_PATH, index + 1);
            participant
                .publications
                .push(EndpointRecord::from_element(data, &loc)?);
        }
        for (index, data) in element.find_all(SUBSCRIPTIONS_PATH)?.into_iter().enumerate() {
            let loc = child_location(location, SUBSCRIPTIONS_PATH, index + 1);
            participant
                .subscriptions
                .push(EndpointRecord::from_element(data, &loc)?);
        }
        Ok(participant)
    }
}

/// Point-in-time dump of participants and endpoints
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoverySnapshot {
    pub participants: Vec<ParticipantRecord>,
}

impl DiscoverySnapshot {
    pub fn new(participants: Vec<ParticipantRecord>) -> Self {
        Self { participants }
    }

    /// Read a snapshot from its generic tree
    ///
    /// Participants are collected in document order across every process
    /// and domain.
    pub fn from_element(root: &Element) -> Result<Self> {
        let participants = root
            .find_all(PARTICIPANTS_PATH)?
            .into_iter()
            .enumerate()
            .map(|(index, element)| {
                let location = format!("{}[{}]", PARTICIPANTS_PATH, index + 1);
                ParticipantRecord::from_element(element, &location)
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { participants })
    }
}
