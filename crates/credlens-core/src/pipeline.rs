//! End-to-end article analysis
//!
//! A [`Pipeline`] is wired explicitly from its collaborators and carries no
//! process-wide state. Each analysis runs extraction, ontology construction
//! and scoring in sequence; resolutions within a stage run concurrently.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::{Config, KbClassMap};
use crate::error::{Error, Result};
use crate::extract::{EntityExtractor, HeuristicExtractor};
use crate::graph::{OntologyBuilder, SkippedMention};
use crate::kb::{DbpediaKnowledgeBase, EventSource, KnowledgeBase, NoEvents, WikidataEventSource};
use crate::resolver::{EntityResolver, ResolutionCache};
use crate::score::{CredibilityScorer, ScoreBreakdown};
use crate::types::{EntityMention, OntologyGraph};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Request body accepted by [`Pipeline::analyze_request`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleRequest {
    #[serde(default)]
    pub text: String,
    pub author: String,
    pub source: String,
    /// Pre-extracted mentions; extraction is skipped when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entities: Option<Vec<EntityMention>>,
}

/// Result of analyzing one article.
#[derive(Debug, Clone, Serialize)]
pub struct Analysis {
    pub credibility_score: i64,
    pub breakdown: ScoreBreakdown,
    pub graph: OntologyGraph,
    pub entities: Vec<EntityMention>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<SkippedMention>,
}

/// Extraction, linking, graph construction and scoring for articles.
#[derive(Clone)]
pub struct Pipeline {
    extractor: Arc<dyn EntityExtractor>,
    kb: Arc<dyn KnowledgeBase>,
    events: Arc<dyn EventSource>,
    classes: KbClassMap,
    lookup_timeout: Duration,
    events_timeout: Duration,
    scorer: CredibilityScorer,
    shared_cache: Option<Arc<ResolutionCache>>,
}

impl Pipeline {
    /// Pipeline over the given collaborators with the heuristic extractor,
    /// default class map, 5s timeouts and default scoring.
    pub fn new(kb: Arc<dyn KnowledgeBase>, events: Arc<dyn EventSource>) -> Self {
        Self {
            extractor: Arc::new(HeuristicExtractor::new()),
            kb,
            events,
            classes: KbClassMap::default(),
            lookup_timeout: DEFAULT_TIMEOUT,
            events_timeout: DEFAULT_TIMEOUT,
            scorer: CredibilityScorer::default(),
            shared_cache: None,
        }
    }

    /// SPARQL-backed pipeline as described by `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;

        let kb = Arc::new(DbpediaKnowledgeBase::new(&config.knowledge_base)?);
        let events: Arc<dyn EventSource> = if config.events.enabled {
            Arc::new(WikidataEventSource::new(
                &config.events,
                &config.knowledge_base.user_agent,
            )?)
        } else {
            Arc::new(NoEvents)
        };

        let pipeline = Self::new(kb, events).with_settings(config);
        Ok(pipeline)
    }

    /// Apply class map, timeouts, scoring and cache settings from `config`
    /// while keeping the current collaborators.
    pub fn with_settings(mut self, config: &Config) -> Self {
        self.classes = config.knowledge_base.classes.clone();
        self.lookup_timeout = config.knowledge_base.timeout();
        self.events_timeout = config.events.timeout();
        self.scorer = CredibilityScorer::from_config(&config.scoring);
        self.shared_cache = config
            .cache
            .shared
            .then(|| Arc::new(ResolutionCache::new()));
        self
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn EntityExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_classes(mut self, classes: KbClassMap) -> Self {
        self.classes = classes;
        self
    }

    pub fn with_timeouts(mut self, lookup: Duration, events: Duration) -> Self {
        self.lookup_timeout = lookup;
        self.events_timeout = events;
        self
    }

    pub fn with_scorer(mut self, scorer: CredibilityScorer) -> Self {
        self.scorer = scorer;
        self
    }

    /// Keep one resolution cache across analyses.
    pub fn with_shared_cache(mut self, cache: Arc<ResolutionCache>) -> Self {
        self.shared_cache = Some(cache);
        self
    }

    pub fn scorer(&self) -> &CredibilityScorer {
        &self.scorer
    }

    /// Analyze raw article text.
    pub async fn analyze(&self, text: &str, author: &str, source: &str) -> Result<Analysis> {
        if text.trim().is_empty() {
            return Err(Error::MalformedInput("article text is empty".to_string()));
        }

        let mentions: Vec<EntityMention> = self
            .extractor
            .extract(text)
            .into_iter()
            .map(EntityMention::from)
            .collect();
        debug!(count = mentions.len(), "entities extracted");

        self.analyze_mentions(author, source, mentions).await
    }

    /// Analyze an article whose mentions are already known.
    pub async fn analyze_mentions(
        &self,
        author: &str,
        source: &str,
        mentions: Vec<EntityMention>,
    ) -> Result<Analysis> {
        require("author", author)?;
        require("source", source)?;

        let report = self
            .builder()
            .build_report(author, source, &mentions)
            .await?;
        let breakdown = self.scorer.score(&report.graph);

        info!(
            score = breakdown.total,
            verified = breakdown.verified_entity_count,
            relations = breakdown.relation_count,
            skipped = report.skipped.len(),
            "article analyzed"
        );

        Ok(Analysis {
            credibility_score: breakdown.total,
            breakdown,
            graph: report.graph,
            entities: mentions,
            skipped: report.skipped,
        })
    }

    /// Analyze a JSON request body shaped like [`ArticleRequest`].
    pub async fn analyze_request(&self, body: &serde_json::Value) -> Result<Analysis> {
        let request = ArticleRequest::deserialize(body)
            .map_err(|err| Error::MalformedInput(err.to_string()))?;

        match request.entities {
            Some(entities) => {
                self.analyze_mentions(&request.author, &request.source, entities)
                    .await
            }
            None => {
                self.analyze(&request.text, &request.author, &request.source)
                    .await
            }
        }
    }

    fn builder(&self) -> OntologyBuilder {
        let mut resolver =
            EntityResolver::new(self.kb.clone(), self.classes.clone(), self.lookup_timeout);
        if let Some(cache) = &self.shared_cache {
            resolver = resolver.with_cache(cache.clone());
        }
        OntologyBuilder::new(resolver, self.events.clone(), self.events_timeout)
    }
}

fn require(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        Err(Error::MalformedInput(format!("{field} must not be empty")))
    } else {
        Ok(())
    }
}
