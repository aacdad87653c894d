//! Configuration with layered resolution using figment.
//!
//! Resolution order (highest priority last):
//! 1. Built-in defaults
//! 2. User config: `~/.config/credlens/config.toml` (XDG) or platform config dir
//! 3. Project config: `credlens.toml` (or an explicit file)
//! 4. Environment variables: `CREDLENS_*`, nested keys separated by `__`
//!
//! ```toml
//! [knowledge_base]
//! endpoint = "https://dbpedia.org/sparql"
//! language = "en"
//! timeout_ms = 5000
//!
//! [scoring]
//! verified_entity = 3
//! relation = 5
//! author_verified = 2
//!
//! [[scoring.reputation]]
//! canonical_id = "http://dbpedia.org/resource/Reuters"
//! name = "Reuters"
//! bonus = 10
//! ```

use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::sparql::is_valid_language_tag;
use crate::types::EntityType;

/// Boxed wrapper for figment::Error to reduce Result size on the stack.
#[derive(Debug)]
pub struct ConfigError(Box<figment::Error>);

impl ConfigError {
    fn invalid(message: impl Into<String>) -> Self {
        Self(Box::new(figment::Error::from(message.into())))
    }
}

impl Deref for ConfigError {
    type Target = figment::Error;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.source()
    }
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self(Box::new(err))
    }
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub knowledge_base: KnowledgeBaseConfig,
    pub events: EventsConfig,
    pub scoring: ScoringConfig,
    pub cache: CacheConfig,
    pub export: ExportConfig,
}

/// Knowledge-base (SPARQL) endpoint used for entity resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KnowledgeBaseConfig {
    pub endpoint: String,
    /// Language of the exact label match.
    pub language: String,
    pub timeout_ms: u64,
    pub user_agent: String,
    pub classes: KbClassMap,
}

impl Default for KnowledgeBaseConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://dbpedia.org/sparql".to_string(),
            language: "en".to_string(),
            timeout_ms: 5_000,
            user_agent: default_user_agent(),
            classes: KbClassMap::default(),
        }
    }
}

impl KnowledgeBaseConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Knowledge-base class IRI per coarse entity type.
///
/// One field per `EntityType`; unknown keys are rejected when the config is
/// extracted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KbClassMap {
    pub person: String,
    pub organization: String,
    pub athlete: String,
    pub team: String,
    pub event: String,
}

impl Default for KbClassMap {
    fn default() -> Self {
        Self {
            person: "http://dbpedia.org/ontology/Person".to_string(),
            organization: "http://dbpedia.org/ontology/Organisation".to_string(),
            athlete: "http://dbpedia.org/ontology/Athlete".to_string(),
            team: "http://dbpedia.org/ontology/SportsTeam".to_string(),
            event: "http://dbpedia.org/ontology/SportsEvent".to_string(),
        }
    }
}

impl KbClassMap {
    pub fn class_for(&self, entity_type: EntityType) -> &str {
        match entity_type {
            EntityType::Person => &self.person,
            EntityType::Organization => &self.organization,
            EntityType::Athlete => &self.athlete,
            EntityType::Team => &self.team,
            EntityType::Event => &self.event,
        }
    }
}

/// "Events participated in" collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EventsConfig {
    pub enabled: bool,
    pub endpoint: String,
    pub language: String,
    pub timeout_ms: u64,
    pub limit: usize,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: "https://query.wikidata.org/sparql".to_string(),
            language: "en".to_string(),
            timeout_ms: 5_000,
            limit: 25,
        }
    }
}

impl EventsConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Score weights and the source reputation table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Points per distinct node with a verified external identity.
    pub verified_entity: i64,
    /// Points per `participatesIn` relation.
    pub relation: i64,
    /// Bonus when the author has a verified identity.
    pub author_verified: i64,
    pub reputation: Vec<ReputationEntry>,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        let entry = |id: &str, name: &str, bonus: i64| ReputationEntry {
            canonical_id: format!("http://dbpedia.org/resource/{id}"),
            name: Some(name.to_string()),
            bonus,
        };

        Self {
            verified_entity: 3,
            relation: 5,
            author_verified: 2,
            reputation: vec![
                entry("Reuters", "Reuters", 10),
                entry("Associated_Press", "Associated Press", 10),
                entry("BBC", "BBC", 10),
                entry("The_New_York_Times", "The New York Times", 8),
                entry("The_Guardian", "The Guardian", 8),
                entry("The_Washington_Post", "The Washington Post", 8),
                entry("ESPN", "ESPN", 8),
            ],
        }
    }
}

/// A known outlet and the bonus its articles receive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReputationEntry {
    pub canonical_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub bonus: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Keep one resolution cache across `analyze` calls instead of one per call.
    pub shared: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Namespace for ontology classes and relations in RDF exports.
    pub namespace: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            namespace: "http://example.org/credlens#".to_string(),
        }
    }
}

fn default_user_agent() -> String {
    format!("credlens/{} (knowledge-graph credibility scoring)", env!("CARGO_PKG_VERSION"))
}

impl Config {
    /// Load config with layered resolution (defaults → user → project → env).
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with(Path::new("credlens.toml"))
    }

    /// Same as [`Config::load`] with an explicit project config file.
    pub fn load_with(project_config: &Path) -> Result<Self, ConfigError> {
        let config: Config = Self::figment(project_config).extract()?;
        config.validate()?;
        Ok(config)
    }

    fn figment(project_config: &Path) -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(Self::user_config_path()))
            .merge(Toml::file(project_config))
            .merge(Env::prefixed("CREDLENS_").split("__"))
    }

    /// User config path: ~/.config/credlens/config.toml (XDG) or platform config dir.
    fn user_config_path() -> PathBuf {
        if let Some(home) = dirs::home_dir() {
            let xdg_path = home.join(".config").join("credlens").join("config.toml");
            if xdg_path.exists() {
                return xdg_path;
            }
        }
        dirs::config_dir()
            .map(|p| p.join("credlens").join("config.toml"))
            .unwrap_or_default()
    }

    /// Reject values that would otherwise leak into outbound queries.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_url("knowledge_base.endpoint", &self.knowledge_base.endpoint)?;
        check_language("knowledge_base.language", &self.knowledge_base.language)?;
        for entity_type in EntityType::ALL {
            let iri = self.knowledge_base.classes.class_for(entity_type);
            check_url(&format!("knowledge_base.classes.{entity_type}"), iri)?;
        }

        if self.events.enabled {
            check_url("events.endpoint", &self.events.endpoint)?;
            check_language("events.language", &self.events.language)?;
        }

        check_url("export.namespace", &self.export.namespace)?;

        if self.knowledge_base.timeout_ms == 0 || self.events.timeout_ms == 0 {
            return Err(ConfigError::invalid("lookup timeouts must be greater than zero"));
        }

        Ok(())
    }
}

fn check_url(key: &str, value: &str) -> Result<(), ConfigError> {
    Url::parse(value)
        .map(|_| ())
        .map_err(|err| ConfigError::invalid(format!("{key}: invalid URL {value:?}: {err}")))
}

fn check_language(key: &str, value: &str) -> Result<(), ConfigError> {
    if is_valid_language_tag(value) {
        Ok(())
    } else {
        Err(ConfigError::invalid(format!("{key}: invalid language tag {value:?}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.scoring.verified_entity, 3);
        assert_eq!(config.scoring.relation, 5);
        assert_eq!(config.scoring.author_verified, 2);
        assert_eq!(config.knowledge_base.timeout(), Duration::from_secs(5));
    }

    #[test]
    fn project_file_and_env_override_defaults() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "credlens.toml",
                r#"
                [knowledge_base]
                language = "de"

                [scoring]
                relation = 7
                "#,
            )?;
            jail.set_env("CREDLENS_SCORING__AUTHOR_VERIFIED", "4");

            let config = Config::load().expect("config should load");
            assert_eq!(config.knowledge_base.language, "de");
            assert_eq!(config.scoring.relation, 7);
            assert_eq!(config.scoring.author_verified, 4);
            assert_eq!(config.scoring.verified_entity, 3);
            Ok(())
        });
    }

    #[test]
    fn rejects_unknown_class_keys() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "credlens.toml",
                r#"
                [knowledge_base.classes]
                location = "http://dbpedia.org/ontology/Place"
                "#,
            )?;

            assert!(Config::load().is_err());
            Ok(())
        });
    }

    #[test]
    fn rejects_invalid_language_tag() {
        let mut config = Config::default();
        config.knowledge_base.language = "en\" . ?x ?y ?z".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_zero_timeout() {
        let mut config = Config::default();
        config.events.timeout_ms = 0;
        assert!(config.validate().is_err());
    }
}
