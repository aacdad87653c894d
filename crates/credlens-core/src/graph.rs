//! Ontology graph construction
//!
//! [`OntologyBuilder`] turns an author, a source and a list of entity mentions
//! into an [`OntologyGraph`]: one article node, its provenance edges, one
//! node per distinct entity, identity links for verified entities and derived
//! event participation for athletes.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde::Serialize;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::kb::EventSource;
use crate::resolver::{EntityResolver, ResolvedEntity};
use crate::types::{
    ClassDeclaration, EntityMention, EntityType, GraphEdge, GraphNode, OntologyClass,
    OntologyGraph, Predicate,
};

/// A mention that could not be placed in the graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedMention {
    pub label: String,
    pub coarse_type: String,
    pub reason: String,
}

/// Graph plus the mentions that were left out of it.
#[derive(Debug, Clone)]
pub struct OntologyBuildReport {
    pub graph: OntologyGraph,
    pub skipped: Vec<SkippedMention>,
}

/// Builds the ontology graph for one article.
#[derive(Clone)]
pub struct OntologyBuilder {
    resolver: EntityResolver,
    events: Arc<dyn EventSource>,
    events_timeout: Duration,
}

impl OntologyBuilder {
    pub fn new(
        resolver: EntityResolver,
        events: Arc<dyn EventSource>,
        events_timeout: Duration,
    ) -> Self {
        Self {
            resolver,
            events,
            events_timeout,
        }
    }

    pub fn resolver(&self) -> &EntityResolver {
        &self.resolver
    }

    /// Build the graph, discarding the skipped-mention report.
    pub async fn build(
        &self,
        author: &str,
        source: &str,
        entities: &[EntityMention],
    ) -> Result<OntologyGraph> {
        self.build_report(author, source, entities)
            .await
            .map(|report| report.graph)
    }

    /// Build the graph and report mentions with unsupported types or empty labels.
    pub async fn build_report(
        &self,
        author: &str,
        source: &str,
        entities: &[EntityMention],
    ) -> Result<OntologyBuildReport> {
        let mut assembly = GraphAssembly::new();

        let (author, source) = futures::join!(
            self.resolver.resolve(author, EntityType::Person),
            self.resolver.resolve(source, EntityType::Organization)
        );
        let author = author?;
        let source = source?;

        let author_id = assembly.add_entity(&author);
        let source_id = assembly.add_entity(&source);
        assembly.link(assembly.article_id.clone(), author_id, Predicate::HasAuthor);
        assembly.link(assembly.article_id.clone(), source_id, Predicate::HasSource);

        let resolutions = join_all(
            entities
                .iter()
                .map(|mention| self.resolver.resolve_tagged(&mention.label, &mention.coarse_type)),
        )
        .await;

        let mut skipped = Vec::new();
        let mut athletes: Vec<(String, String)> = Vec::new();
        for (mention, resolution) in entities.iter().zip(resolutions) {
            match resolution {
                Ok(resolved) => {
                    let node_id = assembly.add_entity(&resolved);
                    assembly.link(assembly.article_id.clone(), node_id.clone(), Predicate::MentionsEntity);
                    if resolved.entity_type == EntityType::Athlete
                        && !athletes.iter().any(|(id, _)| *id == node_id)
                    {
                        athletes.push((node_id, resolved.label));
                    }
                }
                Err(err @ (Error::UnsupportedType(_) | Error::EmptyLabel)) => {
                    warn!(label = %mention.label, tag = %mention.coarse_type, error = %err, "skipping mention");
                    skipped.push(SkippedMention {
                        label: mention.label.clone(),
                        coarse_type: mention.coarse_type.clone(),
                        reason: err.to_string(),
                    });
                }
                Err(err) => return Err(err),
            }
        }

        let participations = join_all(
            athletes
                .iter()
                .map(|(_, label)| self.participations(label)),
        )
        .await;

        for ((athlete_id, _), events) in athletes.iter().zip(participations) {
            for event in events {
                let event_id = assembly.add_entity(&event);
                assembly.link(athlete_id.clone(), event_id, Predicate::ParticipatesIn);
            }
        }

        let graph = assembly.into_graph();
        debug!(
            nodes = graph.nodes.len(),
            edges = graph.edges.len(),
            skipped = skipped.len(),
            "ontology graph built"
        );

        Ok(OntologyBuildReport { graph, skipped })
    }

    /// Events an athlete took part in, each resolved as an event.
    ///
    /// A failing or slow events collaborator counts as zero events.
    async fn participations(&self, athlete_label: &str) -> Vec<ResolvedEntity> {
        let labels = match tokio::time::timeout(
            self.events_timeout,
            self.events.events_for(athlete_label),
        )
        .await
        {
            Ok(Ok(labels)) => labels,
            Ok(Err(err)) => {
                warn!(athlete = athlete_label, error = %err, "event lookup failed");
                Vec::new()
            }
            Err(_) => {
                warn!(athlete = athlete_label, timeout = ?self.events_timeout, "event lookup timed out");
                Vec::new()
            }
        };

        let resolutions = join_all(
            labels
                .iter()
                .map(|label| self.resolver.resolve(label, EntityType::Event)),
        )
        .await;

        resolutions.into_iter().filter_map(|resolution| resolution.ok()).collect()
    }
}

/// Mutable graph under construction.
struct GraphAssembly {
    article_id: String,
    nodes: HashMap<String, GraphNode>,
    edges: Vec<GraphEdge>,
    seen_edges: HashSet<GraphEdge>,
    identities: HashMap<String, String>,
}

impl GraphAssembly {
    fn new() -> Self {
        let article_id = format!("urn:uuid:{}", Uuid::new_v4());
        let mut nodes = HashMap::new();
        nodes.insert(
            article_id.clone(),
            GraphNode {
                id: article_id.clone(),
                class: OntologyClass::Article,
                label: "Article".to_string(),
            },
        );

        Self {
            article_id,
            nodes,
            edges: Vec::new(),
            seen_edges: HashSet::new(),
            identities: HashMap::new(),
        }
    }

    /// Insert or merge the node for a resolved entity; returns its id.
    fn add_entity(&mut self, entity: &ResolvedEntity) -> String {
        let class = entity.class();
        let node = self
            .nodes
            .entry(entity.node_id.clone())
            .or_insert_with(|| GraphNode {
                id: entity.node_id.clone(),
                class,
                label: entity.label.clone(),
            });

        if class.is_compatible(node.class) && class.depth() > node.class.depth() {
            node.class = class;
        }

        if let Some(canonical_id) = &entity.canonical_id {
            match self.identities.get(&entity.node_id) {
                Some(existing) if existing != canonical_id => {
                    debug!(node = %entity.node_id, kept = %existing, ignored = %canonical_id, "conflicting identity");
                }
                Some(_) => {}
                None => {
                    self.identities
                        .insert(entity.node_id.clone(), canonical_id.clone());
                    self.link(entity.node_id.clone(), canonical_id.clone(), Predicate::SameAs);
                }
            }
        }

        entity.node_id.clone()
    }

    fn link(&mut self, from: String, to: String, predicate: Predicate) {
        let edge = GraphEdge {
            from,
            to,
            predicate,
        };
        if self.seen_edges.insert(edge.clone()) {
            self.edges.push(edge);
        }
    }

    fn into_graph(self) -> OntologyGraph {
        let used: BTreeSet<OntologyClass> = self.nodes.values().map(|node| node.class).collect();
        let mut all = BTreeSet::new();
        for class in used {
            let mut current = Some(class);
            while let Some(class) = current {
                all.insert(class);
                current = class.parent();
            }
        }
        let classes = all
            .into_iter()
            .map(|class| ClassDeclaration {
                class,
                parent: class.parent(),
            })
            .collect();

        let mut nodes: Vec<GraphNode> = self.nodes.into_values().collect();
        nodes.sort_by(|a, b| a.id.cmp(&b.id));

        OntologyGraph {
            article_id: self.article_id,
            classes,
            nodes,
            edges: self.edges,
        }
    }
}
