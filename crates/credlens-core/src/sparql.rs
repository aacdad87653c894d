//! Parameterized SPARQL queries and a minimal SPARQL-over-HTTP client
//!
//! Values never enter a query by string interpolation. A query template names
//! its parameters (`$label`, `$class`, ...) and every bound value is rendered
//! through [`Term`], which escapes literals and validates IRIs.

use std::collections::HashMap;
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::error::{Error, Result};

static RE_PLACEHOLDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$([A-Za-z_][A-Za-z0-9_]*)").unwrap());

static RE_LANGUAGE_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z]{2,8}(-[A-Za-z0-9]{1,8})*$").unwrap());

/// True for a BCP-47 shaped language tag (`en`, `pt-BR`).
pub fn is_valid_language_tag(tag: &str) -> bool {
    RE_LANGUAGE_TAG.is_match(tag)
}

/// A value bound to a query parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Term {
    Literal {
        lexical: String,
        language: Option<String>,
    },
    Iri(String),
    Integer(i64),
}

impl Term {
    pub fn literal(lexical: impl Into<String>) -> Self {
        Term::Literal {
            lexical: lexical.into(),
            language: None,
        }
    }

    pub fn lang_literal(lexical: impl Into<String>, language: impl Into<String>) -> Self {
        Term::Literal {
            lexical: lexical.into(),
            language: Some(language.into()),
        }
    }

    pub fn iri(iri: impl Into<String>) -> Self {
        Term::Iri(iri.into())
    }

    /// Serialize the term as SPARQL syntax.
    pub fn render(&self) -> Result<String> {
        match self {
            Term::Literal { lexical, language } => {
                let mut out = format!("\"{}\"", escape_literal(lexical)?);
                if let Some(lang) = language {
                    if !is_valid_language_tag(lang) {
                        return Err(Error::InvalidQuery(format!("invalid language tag {lang:?}")));
                    }
                    out.push('@');
                    out.push_str(lang);
                }
                Ok(out)
            }
            Term::Iri(iri) => {
                validate_iri(iri)?;
                Ok(format!("<{iri}>"))
            }
            Term::Integer(n) => Ok(n.to_string()),
        }
    }
}

/// Escape a string for use inside a double-quoted SPARQL literal.
///
/// Control characters without a SPARQL escape sequence are rejected.
pub fn escape_literal(value: &str) -> Result<String> {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\'' => escaped.push_str("\\'"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            '\u{08}' => escaped.push_str("\\b"),
            '\u{0C}' => escaped.push_str("\\f"),
            c if c.is_control() => {
                return Err(Error::InvalidQuery(format!(
                    "control character U+{:04X} in literal",
                    c as u32
                )));
            }
            c => escaped.push(c),
        }
    }
    Ok(escaped)
}

/// Check an IRI against the SPARQL IRIREF production and URL syntax.
pub fn validate_iri(iri: &str) -> Result<()> {
    let illegal = iri
        .chars()
        .find(|c| matches!(*c, '<' | '>' | '"' | '{' | '}' | '|' | '^' | '`' | '\\') || *c <= ' ');
    if let Some(c) = illegal {
        return Err(Error::InvalidQuery(format!("illegal character {c:?} in IRI {iri:?}")));
    }
    Url::parse(iri).map_err(|err| Error::InvalidQuery(format!("invalid IRI {iri:?}: {err}")))?;
    Ok(())
}

/// A query template plus its parameter bindings.
#[derive(Debug, Clone)]
pub struct SparqlQuery {
    template: &'static str,
    bindings: HashMap<&'static str, Term>,
}

impl SparqlQuery {
    pub fn new(template: &'static str) -> Self {
        Self {
            template,
            bindings: HashMap::new(),
        }
    }

    pub fn bind(mut self, name: &'static str, term: Term) -> Self {
        self.bindings.insert(name, term);
        self
    }

    /// Substitute every `$name` placeholder in one pass.
    ///
    /// Unbound placeholders are an error; substituted text is never rescanned.
    pub fn render(&self) -> Result<String> {
        let mut rendered = HashMap::new();
        for (name, term) in &self.bindings {
            rendered.insert(*name, term.render()?);
        }

        let mut missing = None;
        let query = RE_PLACEHOLDER.replace_all(self.template, |caps: &Captures| {
            let name = &caps[1];
            match rendered.get(name) {
                Some(value) => value.clone(),
                None => {
                    missing.get_or_insert_with(|| name.to_string());
                    String::new()
                }
            }
        });

        if let Some(name) = missing {
            return Err(Error::InvalidQuery(format!("unbound query parameter ${name}")));
        }

        Ok(query.into_owned())
    }
}

/// One RDF term of a SPARQL JSON result binding.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct SparqlValue {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
    #[serde(rename = "xml:lang", default)]
    pub language: Option<String>,
}

pub type Binding = HashMap<String, SparqlValue>;

#[derive(Debug, Deserialize)]
struct SparqlResults {
    results: ResultSet,
}

#[derive(Debug, Deserialize)]
struct ResultSet {
    bindings: Vec<Binding>,
}

/// Parse a `application/sparql-results+json` document.
pub fn parse_results(body: &str) -> Result<Vec<Binding>> {
    serde_json::from_str::<SparqlResults>(body)
        .map(|parsed| parsed.results.bindings)
        .map_err(|err| Error::LookupFailure(format!("malformed SPARQL response: {err}")))
}

/// SPARQL-over-HTTP client with a mandatory request timeout.
#[derive(Debug, Clone)]
pub struct SparqlClient {
    client: reqwest::Client,
    endpoint: Url,
    timeout: Duration,
}

impl SparqlClient {
    pub fn new(endpoint: &str, timeout: Duration, user_agent: &str) -> Result<Self> {
        let endpoint = Url::parse(endpoint)
            .map_err(|err| Error::InvalidQuery(format!("invalid endpoint {endpoint:?}: {err}")))?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|err| Error::LookupFailure(format!("failed to create HTTP client: {err}")))?;

        Ok(Self {
            client,
            endpoint,
            timeout,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Request URL for a rendered query; parameters are percent-encoded by `url`.
    pub fn request_url(&self, query: &str) -> Result<Url> {
        Url::parse_with_params(self.endpoint.as_str(), &[("query", query), ("format", "json")])
            .map_err(|err| Error::InvalidQuery(err.to_string()))
    }

    /// Run a SELECT query and return its bindings.
    pub async fn select(&self, query: &SparqlQuery) -> Result<Vec<Binding>> {
        let rendered = query.render()?;
        let url = self.request_url(&rendered)?;
        debug!(endpoint = %self.endpoint, "sending SPARQL query");

        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/sparql-results+json")
            .send()
            .await
            .map_err(|err| self.transport_error(err))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::LookupFailure(format!(
                "{} answered HTTP {}",
                self.endpoint, status
            )));
        }

        let body = response.text().await.map_err(|err| self.transport_error(err))?;
        parse_results(&body)
    }

    fn transport_error(&self, err: reqwest::Error) -> Error {
        if err.is_timeout() {
            Error::LookupTimeout(self.timeout)
        } else {
            Error::LookupFailure(format!("request to {} failed: {}", self.endpoint, err))
        }
    }
}
