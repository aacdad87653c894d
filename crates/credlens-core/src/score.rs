//! Credibility scoring over a finished ontology graph

use std::collections::{BTreeSet, HashMap};

use serde::Serialize;

use crate::config::ScoringConfig;
use crate::types::{OntologyGraph, Predicate};

/// Source reputation bonuses keyed by canonical identifier.
#[derive(Debug, Clone, Default)]
pub struct ReputationTable {
    bonuses: HashMap<String, i64>,
}

impl ReputationTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(mut self, canonical_id: impl Into<String>, bonus: i64) -> Self {
        self.bonuses.insert(canonical_id.into(), bonus);
        self
    }

    /// Bonus for a linked source; unknown or unlinked sources get 0.
    pub fn bonus_for(&self, canonical_id: Option<&str>) -> i64 {
        canonical_id
            .and_then(|id| self.bonuses.get(id))
            .copied()
            .unwrap_or(0)
    }
}

/// Per-factor score weights.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreWeights {
    pub verified_entity: i64,
    pub relation: i64,
    pub author_verified: i64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            verified_entity: 3,
            relation: 5,
            author_verified: 2,
        }
    }
}

/// Score factors derived from one graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScoreBreakdown {
    pub verified_entity_count: usize,
    pub entity_points: i64,
    pub relation_count: usize,
    pub relation_points: i64,
    pub source_bonus: i64,
    pub author_bonus: i64,
    pub total: i64,
}

impl ScoreBreakdown {
    /// Sum of the listed parts; equals `total` for every breakdown the scorer builds.
    pub fn sum_of_parts(&self) -> i64 {
        self.entity_points + self.relation_points + self.source_bonus + self.author_bonus
    }
}

/// Pure function from graph to score.
#[derive(Debug, Clone, Default)]
pub struct CredibilityScorer {
    weights: ScoreWeights,
    reputation: ReputationTable,
}

impl CredibilityScorer {
    pub fn new(weights: ScoreWeights, reputation: ReputationTable) -> Self {
        Self {
            weights,
            reputation,
        }
    }

    pub fn from_config(config: &ScoringConfig) -> Self {
        let reputation = config
            .reputation
            .iter()
            .fold(ReputationTable::new(), |table, entry| {
                table.with_entry(entry.canonical_id.clone(), entry.bonus)
            });
        let weights = ScoreWeights {
            verified_entity: config.verified_entity,
            relation: config.relation,
            author_verified: config.author_verified,
        };
        Self::new(weights, reputation)
    }

    pub fn weights(&self) -> ScoreWeights {
        self.weights
    }

    pub fn score(&self, graph: &OntologyGraph) -> ScoreBreakdown {
        let verified: BTreeSet<&str> = graph
            .edges_with(Predicate::SameAs)
            .filter(|edge| graph.node(&edge.from).is_some())
            .map(|edge| edge.from.as_str())
            .collect();
        let verified_entity_count = verified.len();
        let relation_count = graph.edges_with(Predicate::ParticipatesIn).count();

        let source_bonus = self.reputation.bonus_for(
            graph
                .source()
                .and_then(|source| graph.canonical_id(&source.id)),
        );
        let author_bonus = match graph.author() {
            Some(author) if graph.canonical_id(&author.id).is_some() => {
                self.weights.author_verified
            }
            _ => 0,
        };

        let entity_points = verified_entity_count as i64 * self.weights.verified_entity;
        let relation_points = relation_count as i64 * self.weights.relation;

        ScoreBreakdown {
            verified_entity_count,
            entity_points,
            relation_count,
            relation_points,
            source_bonus,
            author_bonus,
            total: entity_points + relation_points + source_bonus + author_bonus,
        }
    }
}
