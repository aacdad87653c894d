//! Entity resolution against the knowledge base
//!
//! Every label resolves to a [`ResolvedEntity`]. A lookup that finds nothing,
//! fails or times out yields an unresolved entity whose node id is still
//! minted deterministically from the label, so repeated mentions collapse onto
//! one graph node whether or not the knowledge base answered.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::KbClassMap;
use crate::error::{Error, Result};
use crate::kb::KnowledgeBase;
use crate::types::{EntityType, OntologyClass};

static RE_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Trim and collapse internal whitespace runs to a single space.
pub fn normalize_label(label: &str) -> String {
    RE_WHITESPACE.replace_all(label.trim(), " ").into_owned()
}

/// Deterministic node id for a label within a class family.
///
/// Case-folded so that "FIFA" and "Fifa" land on the same node.
pub fn mint_node_id(class: OntologyClass, normalized_label: &str) -> String {
    let name = format!(
        "credlens:{}:{}",
        class.family().name(),
        normalized_label.to_lowercase()
    );
    format!("urn:uuid:{}", Uuid::new_v5(&Uuid::NAMESPACE_URL, name.as_bytes()))
}

/// Outcome of resolving one label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedEntity {
    pub label: String,
    pub entity_type: EntityType,
    pub node_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub canonical_id: Option<String>,
}

impl ResolvedEntity {
    pub fn is_verified(&self) -> bool {
        self.canonical_id.is_some()
    }

    pub fn class(&self) -> OntologyClass {
        self.entity_type.ontology_class()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    label: String,
    entity_type: EntityType,
}

/// Definitive lookup answers keyed by `(normalized label, entity type)`.
///
/// Safe for concurrent use; the first answer stored for a key wins. Entries
/// are never evicted, so a cache shared across requests grows with every
/// distinct label it sees. Call [`ResolutionCache::clear`] to reset it.
#[derive(Debug, Default)]
pub struct ResolutionCache {
    entries: RwLock<HashMap<CacheKey, Option<String>>>,
}

impl ResolutionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// `Some(answer)` on a hit; the answer itself is `None` for "no match".
    pub fn get(&self, label: &str, entity_type: EntityType) -> Option<Option<String>> {
        let key = CacheKey {
            label: label.to_string(),
            entity_type,
        };
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .cloned()
    }

    /// Insert unless present; returns the value now stored for the key.
    pub fn insert_if_absent(
        &self,
        label: &str,
        entity_type: EntityType,
        canonical_id: Option<String>,
    ) -> Option<String> {
        let key = CacheKey {
            label: label.to_string(),
            entity_type,
        };
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(key)
            .or_insert(canonical_id)
            .clone()
    }

    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Resolves labels to knowledge-base identities, with caching and timeouts.
#[derive(Clone)]
pub struct EntityResolver {
    kb: Arc<dyn KnowledgeBase>,
    classes: KbClassMap,
    cache: Arc<ResolutionCache>,
    timeout: Duration,
}

impl EntityResolver {
    pub fn new(kb: Arc<dyn KnowledgeBase>, classes: KbClassMap, timeout: Duration) -> Self {
        Self {
            kb,
            classes,
            cache: Arc::new(ResolutionCache::new()),
            timeout,
        }
    }

    /// Share an existing cache, e.g. one kept across requests.
    pub fn with_cache(mut self, cache: Arc<ResolutionCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn cache(&self) -> &Arc<ResolutionCache> {
        &self.cache
    }

    /// Resolve a label given as a raw type tag such as `"ATHLETE"`.
    pub async fn resolve_tagged(&self, label: &str, tag: &str) -> Result<ResolvedEntity> {
        let entity_type: EntityType = tag.parse()?;
        self.resolve(label, entity_type).await
    }

    /// Resolve `label` as `entity_type`.
    ///
    /// Fails only on an empty label; lookup problems produce an unresolved
    /// entity instead.
    pub async fn resolve(&self, label: &str, entity_type: EntityType) -> Result<ResolvedEntity> {
        let label = normalize_label(label);
        if label.is_empty() {
            return Err(Error::EmptyLabel);
        }

        let canonical_id = match self.cache.get(&label, entity_type) {
            Some(cached) => {
                debug!(label = %label, %entity_type, "resolution cache hit");
                cached
            }
            None => match self.lookup(&label, entity_type).await {
                Ok(answer) => self.cache.insert_if_absent(&label, entity_type, answer),
                Err(err) => {
                    warn!(label = %label, %entity_type, error = %err, "lookup degraded to unresolved");
                    None
                }
            },
        };

        Ok(ResolvedEntity {
            node_id: mint_node_id(entity_type.ontology_class(), &label),
            label,
            entity_type,
            canonical_id,
        })
    }

    async fn lookup(&self, label: &str, entity_type: EntityType) -> Result<Option<String>> {
        let class_iri = self.classes.class_for(entity_type);
        tokio::time::timeout(self.timeout, self.kb.lookup(label, class_iri))
            .await
            .map_err(|_| Error::LookupTimeout(self.timeout))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kb::memory::{FailingKnowledgeBase, StaticKnowledgeBase};
    use futures::future::join_all;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const PERSON: &str = "http://dbpedia.org/ontology/Person";
    const ATHLETE: &str = "http://dbpedia.org/ontology/Athlete";

    fn resolver(kb: impl KnowledgeBase + 'static) -> EntityResolver {
        EntityResolver::new(Arc::new(kb), KbClassMap::default(), Duration::from_millis(200))
    }

    /// Answers every lookup, numbering each answer by call order.
    #[derive(Default)]
    struct CountingKnowledgeBase {
        calls: AtomicUsize,
        delay: Duration,
    }

    #[async_trait::async_trait]
    impl KnowledgeBase for CountingKnowledgeBase {
        async fn lookup(&self, label: &str, class_iri: &str) -> Result<Option<String>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            let class = class_iri.rsplit('/').next().unwrap_or(class_iri);
            Ok(Some(format!(
                "http://dbpedia.org/resource/{}?class={class}&call={call}",
                label.replace(' ', "_")
            )))
        }
    }

    #[test]
    fn normalizes_whitespace() {
        assert_eq!(normalize_label("  Lionel \t  Messi \n"), "Lionel Messi");
        assert_eq!(normalize_label("   "), "");
    }

    #[test]
    fn minted_ids_follow_label_and_family() {
        let a = mint_node_id(OntologyClass::Person, "Lionel Messi");
        let b = mint_node_id(OntologyClass::Athlete, "lionel messi");
        let c = mint_node_id(OntologyClass::Organization, "Lionel Messi");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.starts_with("urn:uuid:"));
    }

    #[tokio::test]
    async fn resolves_with_type_hierarchy_class() {
        let kb = StaticKnowledgeBase::new().with_entry(
            "Lionel Messi",
            ATHLETE,
            "http://dbpedia.org/resource/Lionel_Messi",
        );
        let resolved = resolver(kb)
            .resolve(" Lionel   Messi ", EntityType::Athlete)
            .await
            .unwrap();

        assert_eq!(resolved.label, "Lionel Messi");
        assert_eq!(
            resolved.canonical_id.as_deref(),
            Some("http://dbpedia.org/resource/Lionel_Messi")
        );
        assert_eq!(resolved.class(), OntologyClass::Athlete);
    }

    #[tokio::test]
    async fn repeated_resolution_is_idempotent_and_cached() {
        let kb = Arc::new(CountingKnowledgeBase::default());
        let resolver = EntityResolver::new(kb.clone(), KbClassMap::default(), Duration::from_secs(1));

        let first = resolver.resolve("Serena Williams", EntityType::Athlete).await.unwrap();
        let second = resolver.resolve("Serena  Williams", EntityType::Athlete).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(kb.calls.load(Ordering::SeqCst), 1);
        assert_eq!(resolver.cache().len(), 1);
    }

    #[tokio::test]
    async fn cache_keys_include_entity_type() {
        let kb = StaticKnowledgeBase::new().with_entry("Jordan", PERSON, "http://dbpedia.org/resource/Michael_Jordan");
        let resolver = resolver(kb);

        let person = resolver.resolve("Jordan", EntityType::Person).await.unwrap();
        let event = resolver.resolve("Jordan", EntityType::Event).await.unwrap();

        assert!(person.is_verified());
        assert!(!event.is_verified());
        assert_eq!(resolver.cache().get("Jordan", EntityType::Event), Some(None));
        assert_eq!(resolver.cache().get("jordan", EntityType::Person), None);
    }

    #[tokio::test]
    async fn lookup_failure_degrades_to_unresolved() {
        let resolver = resolver(FailingKnowledgeBase);
        let resolved = resolver.resolve("Reuters", EntityType::Organization).await.unwrap();

        assert!(!resolved.is_verified());
        assert_eq!(resolved.node_id, mint_node_id(OntologyClass::Organization, "Reuters"));
        // Transient failures are not cached.
        assert!(resolver.cache().is_empty());
    }

    #[tokio::test]
    async fn lookup_timeout_degrades_to_unresolved() {
        let kb = StaticKnowledgeBase::new()
            .with_entry("Reuters", "http://dbpedia.org/ontology/Organisation", "http://dbpedia.org/resource/Reuters")
            .with_delay(Duration::from_secs(5));
        let resolver = EntityResolver::new(Arc::new(kb), KbClassMap::default(), Duration::from_millis(20));

        let resolved = resolver.resolve("Reuters", EntityType::Organization).await.unwrap();
        assert!(!resolved.is_verified());
    }

    #[tokio::test]
    async fn rejects_empty_labels_and_unknown_tags() {
        let resolver = resolver(StaticKnowledgeBase::new());

        assert!(matches!(resolver.resolve("  ", EntityType::Person).await, Err(Error::EmptyLabel)));
        assert!(matches!(
            resolver.resolve_tagged("Paris", "LOCATION").await,
            Err(Error::UnsupportedType(_))
        ));
    }

    #[tokio::test]
    async fn quoted_labels_reach_the_knowledge_base_verbatim() {
        let label = r#"Dwayne "The Rock" Johnson"#;
        let kb = StaticKnowledgeBase::new().with_entry(label, PERSON, "http://dbpedia.org/resource/Dwayne_Johnson");
        let resolved = resolver(kb).resolve(label, EntityType::Person).await.unwrap();

        assert_eq!(resolved.label, label);
        assert!(resolved.is_verified());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_resolutions_share_one_answer_per_key() {
        let kb = Arc::new(CountingKnowledgeBase {
            calls: AtomicUsize::new(0),
            delay: Duration::from_millis(20),
        });
        let resolver = EntityResolver::new(kb.clone(), KbClassMap::default(), Duration::from_secs(1));

        let athletes = join_all((0..8).map(|_| {
            let resolver = resolver.clone();
            tokio::spawn(async move { resolver.resolve("Lionel Messi", EntityType::Athlete).await })
        }));
        let teams = join_all((0..8).map(|_| {
            let resolver = resolver.clone();
            tokio::spawn(async move { resolver.resolve("Lionel Messi", EntityType::Team).await })
        }));
        let (athletes, teams) = tokio::join!(athletes, teams);
        let athletes: Vec<ResolvedEntity> = athletes
            .into_iter()
            .map(|joined| joined.unwrap().unwrap())
            .collect();
        let teams: Vec<ResolvedEntity> = teams
            .into_iter()
            .map(|joined| joined.unwrap().unwrap())
            .collect();

        assert_eq!(resolver.cache().len(), 2);
        for group in [&athletes, &teams] {
            assert!(group.iter().all(|entity| entity == &group[0]));
        }

        let athlete_id = athletes[0].canonical_id.as_deref().unwrap();
        let team_id = teams[0].canonical_id.as_deref().unwrap();
        assert!(athlete_id.contains("class=Athlete"), "{athlete_id}");
        assert!(team_id.contains("class=SportsTeam"), "{team_id}");
        assert_ne!(athletes[0].node_id, teams[0].node_id);

        assert_eq!(
            resolver.cache().get("Lionel Messi", EntityType::Athlete),
            Some(athletes[0].canonical_id.clone())
        );
        assert_eq!(
            resolver.cache().get("Lionel Messi", EntityType::Team),
            Some(teams[0].canonical_id.clone())
        );
    }

    #[test]
    fn cache_keeps_first_answer() {
        let cache = ResolutionCache::new();
        let stored = cache.insert_if_absent("BBC", EntityType::Organization, Some("a".to_string()));
        let again = cache.insert_if_absent("BBC", EntityType::Organization, Some("b".to_string()));

        assert_eq!(stored.as_deref(), Some("a"));
        assert_eq!(again.as_deref(), Some("a"));
        assert_eq!(cache.len(), 1);

        cache.clear();
        assert!(cache.is_empty());
    }
}
