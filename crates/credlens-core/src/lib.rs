//! # credlens-core
//!
//! Core library for scoring the credibility of news articles from a small
//! knowledge graph of their provenance and mentions.
//!
//! This library provides:
//! - Entity extraction from article text
//! - Entity linking against a SPARQL knowledge base (DBpedia by default)
//! - Ontology graph construction with derived event participation
//! - Credibility scoring over the finished graph
//! - N-Triples, JSON-LD and Mermaid exports
//!
//! ## Example
//!
//! ```no_run
//! use credlens_core::{Config, Pipeline};
//!
//! # async fn example() -> credlens_core::Result<()> {
//! let config = Config::load()?;
//! let pipeline = Pipeline::from_config(&config)?;
//!
//! let analysis = pipeline
//!     .analyze(
//!         "Argentina striker Lionel Messi lifted the World Cup.",
//!         "Jane Doe",
//!         "Reuters",
//!     )
//!     .await?;
//! println!("score: {}", analysis.credibility_score);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod export;
pub mod extract;
pub mod graph;
pub mod kb;
pub mod pipeline;
pub mod resolver;
pub mod score;
pub mod sparql;
pub mod types;

// Re-export commonly used types
pub use config::{Config, ConfigError};
pub use error::{Error, Result};
pub use extract::{EntityExtractor, ExtractedSpan, HeuristicExtractor};
pub use graph::{OntologyBuildReport, OntologyBuilder, SkippedMention};
pub use kb::{EventSource, KnowledgeBase};
pub use pipeline::{Analysis, ArticleRequest, Pipeline};
pub use resolver::{EntityResolver, ResolutionCache, ResolvedEntity};
pub use score::{CredibilityScorer, ScoreBreakdown};
pub use types::{
    EntityMention, EntityType, GraphEdge, GraphNode, OntologyClass, OntologyGraph, Predicate,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_creation() {
        let node = GraphNode {
            id: "urn:uuid:test-node".to_string(),
            class: OntologyClass::Person,
            label: "Jane Doe".to_string(),
        };

        assert_eq!(node.id, "urn:uuid:test-node");
        assert_eq!(node.class, OntologyClass::Person);
    }

    #[test]
    fn test_edge_serialization() {
        let edge = GraphEdge {
            from: "node1".to_string(),
            to: "node2".to_string(),
            predicate: Predicate::ParticipatesIn,
        };

        let json = serde_json::to_value(&edge).unwrap();
        assert_eq!(json["predicate"], "participatesIn");
    }

    #[test]
    fn test_node_serializes_json_ld_keys() {
        let node = GraphNode {
            id: "urn:uuid:a".to_string(),
            class: OntologyClass::Article,
            label: "Article".to_string(),
        };

        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["@id"], "urn:uuid:a");
        assert_eq!(json["@type"], "Article");
    }
}
