//! Serializations of an [`OntologyGraph`]: N-Triples, JSON-LD and Mermaid

use std::collections::HashMap;
use std::fmt::Write as _;

use serde_json::{Map, Value, json};

use crate::types::{OntologyClass, OntologyGraph, Predicate};

const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
const RDFS_LABEL: &str = "http://www.w3.org/2000/01/rdf-schema#label";
const RDFS_SUBCLASS_OF: &str = "http://www.w3.org/2000/01/rdf-schema#subClassOf";
const OWL_CLASS: &str = "http://www.w3.org/2002/07/owl#Class";
const OWL_SAME_AS: &str = "http://www.w3.org/2002/07/owl#sameAs";

fn class_iri(namespace: &str, class: OntologyClass) -> String {
    format!("{namespace}{}", class.name())
}

fn predicate_iri(namespace: &str, predicate: Predicate) -> String {
    match predicate {
        Predicate::SameAs => OWL_SAME_AS.to_string(),
        other => format!("{namespace}{}", other.name()),
    }
}

/// Render the graph as RDF N-Triples.
///
/// Class declarations come first, then each node's type and label, then the
/// edges in insertion order.
pub fn to_ntriples(graph: &OntologyGraph, namespace: &str) -> String {
    let mut out = String::new();

    for decl in &graph.classes {
        let class = class_iri(namespace, decl.class);
        push_triple(&mut out, &class, RDF_TYPE, Object::Iri(OWL_CLASS));
        if let Some(parent) = decl.parent {
            push_triple(&mut out, &class, RDFS_SUBCLASS_OF, Object::Iri(&class_iri(namespace, parent)));
        }
    }

    for node in &graph.nodes {
        push_triple(&mut out, &node.id, RDF_TYPE, Object::Iri(&class_iri(namespace, node.class)));
        push_triple(&mut out, &node.id, RDFS_LABEL, Object::Literal(&node.label));
    }

    for edge in &graph.edges {
        push_triple(
            &mut out,
            &edge.from,
            &predicate_iri(namespace, edge.predicate),
            Object::Iri(&edge.to),
        );
    }

    out
}

enum Object<'a> {
    Iri(&'a str),
    Literal(&'a str),
}

fn push_triple(out: &mut String, subject: &str, predicate: &str, object: Object<'_>) {
    let object = match object {
        Object::Iri(iri) => format!("<{}>", escape_iri(iri)),
        Object::Literal(text) => format!("\"{}\"", escape_literal(text)),
    };
    let _ = writeln!(
        out,
        "<{}> <{}> {} .",
        escape_iri(subject),
        escape_iri(predicate),
        object
    );
}

/// Escape a literal's lexical form for N-Triples (`STRING_LITERAL_QUOTE`).
fn escape_literal(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            c if c.is_control() => {
                let _ = write!(escaped, "\\u{:04X}", c as u32);
            }
            c => escaped.push(c),
        }
    }
    escaped
}

/// `UCHAR`-escape characters that may not appear inside an `IRIREF`.
fn escape_iri(iri: &str) -> String {
    let mut escaped = String::with_capacity(iri.len());
    for ch in iri.chars() {
        if matches!(ch, '<' | '>' | '"' | '{' | '}' | '|' | '^' | '`' | '\\') || ch <= ' ' {
            let _ = write!(escaped, "\\u{:04X}", ch as u32);
        } else {
            escaped.push(ch);
        }
    }
    escaped
}

/// Render the graph as a JSON-LD document with an `@context` and `@graph`.
pub fn to_json_ld(graph: &OntologyGraph, namespace: &str) -> Value {
    let mut context = Map::new();
    context.insert("@vocab".to_string(), json!(namespace));
    context.insert("rdfs".to_string(), json!("http://www.w3.org/2000/01/rdf-schema#"));
    context.insert("owl".to_string(), json!("http://www.w3.org/2002/07/owl#"));
    context.insert("label".to_string(), json!("rdfs:label"));
    for predicate in [
        Predicate::HasAuthor,
        Predicate::HasSource,
        Predicate::MentionsEntity,
        Predicate::ParticipatesIn,
    ] {
        context.insert(predicate.name().to_string(), json!({ "@type": "@id" }));
    }
    context.insert(
        "sameAs".to_string(),
        json!({ "@id": "owl:sameAs", "@type": "@id" }),
    );

    let mut entries: Vec<Value> = graph
        .classes
        .iter()
        .map(|decl| {
            let mut entry = json!({
                "@id": class_iri(namespace, decl.class),
                "@type": "owl:Class",
            });
            if let Some(parent) = decl.parent {
                entry["rdfs:subClassOf"] = json!({ "@id": class_iri(namespace, parent) });
            }
            entry
        })
        .collect();

    let mut outgoing: HashMap<&str, Map<String, Value>> = HashMap::new();
    for edge in &graph.edges {
        let properties = outgoing.entry(edge.from.as_str()).or_default();
        let targets = properties
            .entry(edge.predicate.name().to_string())
            .or_insert_with(|| Value::Array(Vec::new()));
        if let Value::Array(items) = targets {
            items.push(json!(edge.to));
        }
    }

    for node in &graph.nodes {
        let mut entry = Map::new();
        entry.insert("@id".to_string(), json!(node.id));
        entry.insert("@type".to_string(), json!(node.class.name()));
        entry.insert("label".to_string(), json!(node.label));
        if let Some(properties) = outgoing.remove(node.id.as_str()) {
            entry.extend(properties);
        }
        entries.push(Value::Object(entry));
    }

    json!({
        "@context": context,
        "@graph": entries,
    })
}

/// Render the graph as a Mermaid `graph TD` diagram.
///
/// Identity links point at external nodes rendered as hyperlinks.
pub fn to_mermaid(graph: &OntologyGraph) -> String {
    let mut lines = vec!["graph TD".to_string()];

    let mut id_map = HashMap::new();
    for (idx, node) in graph.nodes.iter().enumerate() {
        let mermaid_id = format!("N{idx}");
        id_map.insert(node.id.as_str(), mermaid_id.clone());
        lines.push(format!(
            "  {mermaid_id}[\"{label}<br/><i>{class}</i>\"]",
            label = escape_mermaid_label(&escape_html_text(&node.label)),
            class = node.class.name()
        ));
    }

    let mut external = 0usize;
    for edge in &graph.edges {
        let Some(from) = id_map.get(edge.from.as_str()) else {
            continue;
        };
        let to = match (edge.predicate, id_map.get(edge.to.as_str())) {
            (_, Some(to)) => to.clone(),
            (Predicate::SameAs, None) => {
                let mermaid_id = format!("X{external}");
                external += 1;
                lines.push(format!(
                    "  {mermaid_id}[<a href='{href}'>{text}</a>]",
                    href = escape_html_attr(&edge.to),
                    text = escape_html_text(shorten_iri(&edge.to))
                ));
                mermaid_id
            }
            (_, None) => continue,
        };
        lines.push(format!("  {from} -->|{}| {to}", edge.predicate.name()));
    }

    lines.join("\n")
}

fn shorten_iri(iri: &str) -> &str {
    iri.rsplit(['/', '#']).find(|part| !part.is_empty()).unwrap_or(iri)
}

fn escape_mermaid_label(label: &str) -> String {
    label.replace('"', "#quot;")
}

fn escape_html_attr(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

fn escape_html_text(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
