//! Common types used across credlens

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Coarse named-entity category assigned before knowledge-base linking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EntityType {
    Person,
    Organization,
    Athlete,
    Team,
    Event,
}

impl EntityType {
    pub const ALL: [EntityType; 5] = [
        EntityType::Person,
        EntityType::Organization,
        EntityType::Athlete,
        EntityType::Team,
        EntityType::Event,
    ];

    /// Upper-case wire tag, e.g. `ATHLETE`.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Person => "PERSON",
            EntityType::Organization => "ORGANIZATION",
            EntityType::Athlete => "ATHLETE",
            EntityType::Team => "TEAM",
            EntityType::Event => "EVENT",
        }
    }

    pub fn ontology_class(&self) -> OntologyClass {
        match self {
            EntityType::Person => OntologyClass::Person,
            EntityType::Organization => OntologyClass::Organization,
            EntityType::Athlete => OntologyClass::Athlete,
            EntityType::Team => OntologyClass::SportsTeam,
            EntityType::Event => OntologyClass::SportsEvent,
        }
    }

    /// Map a NER model label onto a coarse type.
    ///
    /// Locations are treated as events: sports coverage names venues and
    /// tournaments interchangeably ("Qatar", "Wimbledon").
    pub fn from_ner_label(label: &str) -> Option<EntityType> {
        match label.trim().to_ascii_uppercase().as_str() {
            "PERSON" | "PER" => Some(EntityType::Person),
            "ORG" | "ORGANIZATION" => Some(EntityType::Organization),
            "GPE" | "LOC" | "LOCATION" | "EVENT" => Some(EntityType::Event),
            _ => None,
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = s.trim();
        EntityType::ALL
            .into_iter()
            .find(|ty| ty.as_str().eq_ignore_ascii_case(tag))
            .ok_or_else(|| Error::UnsupportedType(tag.to_string()))
    }
}

/// Classes of the article ontology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum OntologyClass {
    Article,
    Person,
    Athlete,
    Organization,
    SportsTeam,
    SportsEvent,
}

impl OntologyClass {
    pub fn name(&self) -> &'static str {
        match self {
            OntologyClass::Article => "Article",
            OntologyClass::Person => "Person",
            OntologyClass::Athlete => "Athlete",
            OntologyClass::Organization => "Organization",
            OntologyClass::SportsTeam => "SportsTeam",
            OntologyClass::SportsEvent => "SportsEvent",
        }
    }

    /// Direct superclass within the ontology, if any.
    pub fn parent(&self) -> Option<OntologyClass> {
        match self {
            OntologyClass::Athlete => Some(OntologyClass::Person),
            OntologyClass::SportsTeam => Some(OntologyClass::Organization),
            _ => None,
        }
    }

    /// Root of the class's hierarchy; the node role.
    pub fn family(&self) -> OntologyClass {
        let mut current = *self;
        while let Some(parent) = current.parent() {
            current = parent;
        }
        current
    }

    pub fn is_compatible(&self, other: OntologyClass) -> bool {
        self.family() == other.family()
    }

    /// Depth below the family root; deeper is more specific.
    pub fn depth(&self) -> usize {
        let mut depth = 0;
        let mut current = *self;
        while let Some(parent) = current.parent() {
            depth += 1;
            current = parent;
        }
        depth
    }
}

impl fmt::Display for OntologyClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Edge labels of the ontology graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Predicate {
    HasAuthor,
    HasSource,
    MentionsEntity,
    ParticipatesIn,
    SameAs,
}

impl Predicate {
    pub fn name(&self) -> &'static str {
        match self {
            Predicate::HasAuthor => "hasAuthor",
            Predicate::HasSource => "hasSource",
            Predicate::MentionsEntity => "mentionsEntity",
            Predicate::ParticipatesIn => "participatesIn",
            Predicate::SameAs => "sameAs",
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A typed node in the ontology graph
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct GraphNode {
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(rename = "@type")]
    pub class: OntologyClass,
    pub label: String,
}

/// A directed, labeled edge.
///
/// For `sameAs` edges `to` is the external canonical identifier rather than a
/// node id.
#[derive(Debug, Serialize, Clone, PartialEq, Eq, Hash)]
pub struct GraphEdge {
    pub from: String,
    pub to: String,
    pub predicate: Predicate,
}

/// A class used by the graph and its direct superclass.
#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
pub struct ClassDeclaration {
    pub class: OntologyClass,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<OntologyClass>,
}

/// The complete ontology graph for one article
#[derive(Debug, Serialize, Clone)]
pub struct OntologyGraph {
    pub article_id: String,
    pub classes: Vec<ClassDeclaration>,
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

impl OntologyGraph {
    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|node| node.id == id)
    }

    pub fn article(&self) -> Option<&GraphNode> {
        self.node(&self.article_id)
    }

    pub fn edges_with(&self, predicate: Predicate) -> impl Iterator<Item = &GraphEdge> {
        self.edges.iter().filter(move |edge| edge.predicate == predicate)
    }

    /// Target of the article's single outgoing edge with `predicate`.
    fn article_target(&self, predicate: Predicate) -> Option<&GraphNode> {
        self.edges_with(predicate)
            .find(|edge| edge.from == self.article_id)
            .and_then(|edge| self.node(&edge.to))
    }

    pub fn author(&self) -> Option<&GraphNode> {
        self.article_target(Predicate::HasAuthor)
    }

    pub fn source(&self) -> Option<&GraphNode> {
        self.article_target(Predicate::HasSource)
    }

    /// External identity of a node, present only for resolved entities.
    pub fn canonical_id(&self, node_id: &str) -> Option<&str> {
        self.edges_with(Predicate::SameAs)
            .find(|edge| edge.from == node_id)
            .map(|edge| edge.to.as_str())
    }

    pub fn mentions(&self) -> impl Iterator<Item = &GraphNode> {
        self.edges_with(Predicate::MentionsEntity)
            .filter_map(|edge| self.node(&edge.to))
    }
}

/// An entity mention handed to the ontology builder.
///
/// `coarse_type` stays a raw tag so that one unsupported mention does not
/// invalidate a whole request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityMention {
    pub label: String,
    #[serde(rename = "type")]
    pub coarse_type: String,
}

impl EntityMention {
    pub fn new(label: impl Into<String>, coarse_type: EntityType) -> Self {
        Self {
            label: label.into(),
            coarse_type: coarse_type.as_str().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_entity_type_tags() {
        assert_eq!("ATHLETE".parse::<EntityType>().unwrap(), EntityType::Athlete);
        assert_eq!(" team ".parse::<EntityType>().unwrap(), EntityType::Team);
        assert!(matches!(
            "LOCATION".parse::<EntityType>(),
            Err(Error::UnsupportedType(tag)) if tag == "LOCATION"
        ));
    }

    #[test]
    fn maps_entity_types_to_classes() {
        assert_eq!(EntityType::Athlete.ontology_class(), OntologyClass::Athlete);
        assert_eq!(EntityType::Team.ontology_class(), OntologyClass::SportsTeam);
        assert_eq!(EntityType::Event.ontology_class(), OntologyClass::SportsEvent);
    }

    #[test]
    fn ner_labels_map_locations_to_events() {
        assert_eq!(EntityType::from_ner_label("GPE"), Some(EntityType::Event));
        assert_eq!(EntityType::from_ner_label("ORG"), Some(EntityType::Organization));
        assert_eq!(EntityType::from_ner_label("DATE"), None);
    }

    #[test]
    fn class_hierarchy() {
        assert_eq!(OntologyClass::Athlete.family(), OntologyClass::Person);
        assert_eq!(OntologyClass::SportsTeam.parent(), Some(OntologyClass::Organization));
        assert!(OntologyClass::Athlete.is_compatible(OntologyClass::Person));
        assert!(!OntologyClass::SportsTeam.is_compatible(OntologyClass::Person));
        assert!(OntologyClass::Athlete.depth() > OntologyClass::Person.depth());
    }

    #[test]
    fn mention_serializes_type_tag() {
        let mention = EntityMention::new("Lionel Messi", EntityType::Athlete);
        let json = serde_json::to_value(&mention).unwrap();
        assert_eq!(json["label"], "Lionel Messi");
        assert_eq!(json["type"], "ATHLETE");
    }
}
