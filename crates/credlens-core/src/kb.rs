//! Knowledge-base and events collaborators
//!
//! The resolver and the ontology builder only see the [`KnowledgeBase`] and
//! [`EventSource`] traits. The SPARQL-backed implementations talk to DBpedia
//! (entity resolution) and Wikidata (event participation); the in-memory ones
//! in [`memory`] back offline runs and tests.

use async_trait::async_trait;
use tracing::debug;

use crate::config::{EventsConfig, KnowledgeBaseConfig};
use crate::error::Result;
use crate::sparql::{SparqlClient, SparqlQuery, Term};

/// Knowledge-base lookup of a label constrained to a class.
#[async_trait]
pub trait KnowledgeBase: Send + Sync {
    /// Canonical identifier of the first entity labeled `label` whose type is
    /// `class` or one of its subclasses.
    async fn lookup(&self, label: &str, class_iri: &str) -> Result<Option<String>>;
}

/// "Events participated in" lookup for athletes.
#[async_trait]
pub trait EventSource: Send + Sync {
    async fn events_for(&self, athlete_label: &str) -> Result<Vec<String>>;
}

const ENTITY_QUERY: &str = r#"PREFIX rdf: <http://www.w3.org/1999/02/22-rdf-syntax-ns#>
PREFIX rdfs: <http://www.w3.org/2000/01/rdf-schema#>
SELECT ?entity WHERE {
  ?entity rdfs:label $label ;
          rdf:type/rdfs:subClassOf* $class .
}
LIMIT 1"#;

/// Entity resolution against a DBpedia-style SPARQL endpoint.
#[derive(Debug, Clone)]
pub struct DbpediaKnowledgeBase {
    client: SparqlClient,
    language: String,
}

impl DbpediaKnowledgeBase {
    pub fn new(config: &KnowledgeBaseConfig) -> Result<Self> {
        Ok(Self {
            client: SparqlClient::new(&config.endpoint, config.timeout(), &config.user_agent)?,
            language: config.language.clone(),
        })
    }

    pub fn query(&self, label: &str, class_iri: &str) -> SparqlQuery {
        SparqlQuery::new(ENTITY_QUERY)
            .bind("label", Term::lang_literal(label, self.language.as_str()))
            .bind("class", Term::iri(class_iri))
    }
}

#[async_trait]
impl KnowledgeBase for DbpediaKnowledgeBase {
    async fn lookup(&self, label: &str, class_iri: &str) -> Result<Option<String>> {
        let bindings = self.client.select(&self.query(label, class_iri)).await?;
        let found = bindings
            .into_iter()
            .filter_map(|mut binding| binding.remove("entity"))
            .find(|value| value.kind == "uri")
            .map(|value| value.value);

        debug!(label, class = class_iri, found = found.is_some(), "knowledge base lookup");
        Ok(found)
    }
}

const EVENTS_QUERY: &str = r#"PREFIX rdfs: <http://www.w3.org/2000/01/rdf-schema#>
PREFIX wdt: <http://www.wikidata.org/prop/direct/>
SELECT DISTINCT ?eventLabel WHERE {
  ?athlete rdfs:label $label ;
           wdt:P1344 ?event .
  ?event rdfs:label ?eventLabel .
  FILTER(LANG(?eventLabel) = $language)
}
LIMIT $limit"#;

/// Event participation (`wdt:P1344`, "participant in") from Wikidata.
#[derive(Debug, Clone)]
pub struct WikidataEventSource {
    client: SparqlClient,
    language: String,
    limit: usize,
}

impl WikidataEventSource {
    pub fn new(config: &EventsConfig, user_agent: &str) -> Result<Self> {
        Ok(Self {
            client: SparqlClient::new(&config.endpoint, config.timeout(), user_agent)?,
            language: config.language.clone(),
            limit: config.limit,
        })
    }

    pub fn query(&self, athlete_label: &str) -> SparqlQuery {
        SparqlQuery::new(EVENTS_QUERY)
            .bind("label", Term::lang_literal(athlete_label, self.language.as_str()))
            .bind("language", Term::literal(self.language.as_str()))
            .bind("limit", Term::Integer(self.limit as i64))
    }
}

#[async_trait]
impl EventSource for WikidataEventSource {
    async fn events_for(&self, athlete_label: &str) -> Result<Vec<String>> {
        let bindings = self.client.select(&self.query(athlete_label)).await?;
        let mut events: Vec<String> = Vec::new();
        for mut binding in bindings {
            if let Some(value) = binding.remove("eventLabel") {
                if !events.contains(&value.value) {
                    events.push(value.value);
                }
            }
        }

        debug!(athlete = athlete_label, count = events.len(), "event lookup");
        Ok(events)
    }
}

/// Event source used when event enrichment is disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoEvents;

#[async_trait]
impl EventSource for NoEvents {
    async fn events_for(&self, _athlete_label: &str) -> Result<Vec<String>> {
        Ok(Vec::new())
    }
}

/// In-process collaborators.
pub mod memory {
    use std::collections::HashMap;
    use std::time::Duration;

    use async_trait::async_trait;

    use super::{EventSource, KnowledgeBase};
    use crate::error::{Error, Result};

    /// Fixed `(label, class) → canonical id` answers.
    #[derive(Debug, Clone, Default)]
    pub struct StaticKnowledgeBase {
        entries: HashMap<(String, String), String>,
        delay: Option<Duration>,
    }

    impl StaticKnowledgeBase {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_entry(
            mut self,
            label: impl Into<String>,
            class_iri: impl Into<String>,
            canonical_id: impl Into<String>,
        ) -> Self {
            self.entries
                .insert((label.into(), class_iri.into()), canonical_id.into());
            self
        }

        /// Sleep before answering, to exercise lookup timeouts.
        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }
    }

    #[async_trait]
    impl KnowledgeBase for StaticKnowledgeBase {
        async fn lookup(&self, label: &str, class_iri: &str) -> Result<Option<String>> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            Ok(self
                .entries
                .get(&(label.to_string(), class_iri.to_string()))
                .cloned())
        }
    }

    /// Knowledge base that is always unreachable.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct FailingKnowledgeBase;

    #[async_trait]
    impl KnowledgeBase for FailingKnowledgeBase {
        async fn lookup(&self, label: &str, _class_iri: &str) -> Result<Option<String>> {
            Err(Error::LookupFailure(format!("knowledge base unavailable for {label:?}")))
        }
    }

    /// Fixed athlete → events answers.
    #[derive(Debug, Clone, Default)]
    pub struct StaticEventSource {
        events: HashMap<String, Vec<String>>,
    }

    impl StaticEventSource {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_events<I, S>(mut self, athlete: impl Into<String>, events: I) -> Self
        where
            I: IntoIterator<Item = S>,
            S: Into<String>,
        {
            self.events
                .insert(athlete.into(), events.into_iter().map(Into::into).collect());
            self
        }
    }

    #[async_trait]
    impl EventSource for StaticEventSource {
        async fn events_for(&self, athlete_label: &str) -> Result<Vec<String>> {
            Ok(self.events.get(athlete_label).cloned().unwrap_or_default())
        }
    }

    /// Event source that is always unreachable.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct FailingEventSource;

    #[async_trait]
    impl EventSource for FailingEventSource {
        async fn events_for(&self, athlete_label: &str) -> Result<Vec<String>> {
            Err(Error::LookupFailure(format!("event source unavailable for {athlete_label:?}")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::memory::*;
    use super::*;
    use crate::config::Config;

    #[test]
    fn entity_query_escapes_label() {
        let kb = DbpediaKnowledgeBase::new(&Config::default().knowledge_base).unwrap();
        let rendered = kb
            .query(r#"Bobby "Tables" \ Jr"#, "http://dbpedia.org/ontology/Person")
            .render()
            .unwrap();

        assert!(rendered.contains(r#"rdfs:label "Bobby \"Tables\" \\ Jr"@en ;"#));
        assert!(rendered.contains("rdf:type/rdfs:subClassOf* <http://dbpedia.org/ontology/Person> ."));
        assert!(rendered.ends_with("LIMIT 1"));
    }

    #[test]
    fn events_query_binds_language_and_limit() {
        let config = Config::default();
        let source = WikidataEventSource::new(&config.events, "credlens-test").unwrap();
        let rendered = source.query("Lionel Messi").render().unwrap();

        assert!(rendered.contains(r#"?athlete rdfs:label "Lionel Messi"@en ;"#));
        assert!(rendered.contains(r#"FILTER(LANG(?eventLabel) = "en")"#));
        assert!(rendered.ends_with("LIMIT 25"));
    }

    #[tokio::test]
    async fn static_knowledge_base_matches_label_and_class() {
        let kb = StaticKnowledgeBase::new().with_entry(
            "Reuters",
            "http://dbpedia.org/ontology/Organisation",
            "http://dbpedia.org/resource/Reuters",
        );

        let hit = kb
            .lookup("Reuters", "http://dbpedia.org/ontology/Organisation")
            .await
            .unwrap();
        let wrong_class = kb
            .lookup("Reuters", "http://dbpedia.org/ontology/Person")
            .await
            .unwrap();

        assert_eq!(hit.as_deref(), Some("http://dbpedia.org/resource/Reuters"));
        assert!(wrong_class.is_none());
    }

    #[tokio::test]
    async fn failing_collaborators_report_lookup_errors() {
        let err = FailingKnowledgeBase.lookup("x", "http://example.org/C").await.unwrap_err();
        assert!(err.is_lookup_error());
        let err = FailingEventSource.events_for("x").await.unwrap_err();
        assert!(err.is_lookup_error());
        assert!(NoEvents.events_for("x").await.unwrap().is_empty());
    }
}
