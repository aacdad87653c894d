//! Output rendering for the `credlens` binary

use std::fmt::Write as FmtWrite;

use clap::ValueEnum;
use credlens_core::export::{to_json_ld, to_mermaid, to_ntriples};
use credlens_core::{Analysis, Predicate};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable report with score breakdown and entities
    Summary,
    /// Full analysis as JSON
    Json,
    /// Ontology graph as RDF N-Triples
    Ntriples,
    /// Ontology graph as JSON-LD
    Jsonld,
    /// Ontology graph as a Mermaid diagram
    Mermaid,
}

pub fn render(
    analysis: &Analysis,
    format: OutputFormat,
    namespace: &str,
) -> serde_json::Result<String> {
    let output = match format {
        OutputFormat::Summary => render_summary(analysis),
        OutputFormat::Json => serde_json::to_string_pretty(analysis)? + "\n",
        OutputFormat::Ntriples => to_ntriples(&analysis.graph, namespace),
        OutputFormat::Jsonld => {
            serde_json::to_string_pretty(&to_json_ld(&analysis.graph, namespace))? + "\n"
        }
        OutputFormat::Mermaid => to_mermaid(&analysis.graph) + "\n",
    };
    Ok(output)
}

const DIVIDER: &str = "─────────────────────────────────────────────────────────────";
const LABEL_WIDTH: usize = 16;

fn push_section_header(buf: &mut String, icon: &str, title: &str) {
    let _ = writeln!(buf, "{DIVIDER}");
    let _ = writeln!(buf, "{icon} {title}");
    let _ = writeln!(buf, "{DIVIDER}");
}

fn push_key_value(buf: &mut String, label: &str, value: &str) {
    if value.is_empty() {
        return;
    }
    let _ = writeln!(buf, "• {:<width$} : {}", label, value, width = LABEL_WIDTH);
}

fn render_summary(analysis: &Analysis) -> String {
    let graph = &analysis.graph;
    let breakdown = &analysis.breakdown;
    let mut output = String::new();

    push_section_header(&mut output, "📰", "Article");
    let identity = |id: &str| {
        graph
            .canonical_id(id)
            .map(str::to_string)
            .unwrap_or_else(|| "unresolved".to_string())
    };
    if let Some(author) = graph.author() {
        push_key_value(&mut output, "Author", &author.label);
        push_key_value(&mut output, "Author Identity", &identity(&author.id));
    }
    if let Some(source) = graph.source() {
        push_key_value(&mut output, "Source", &source.label);
        push_key_value(&mut output, "Source Identity", &identity(&source.id));
    }
    push_key_value(&mut output, "Article ID", &graph.article_id);
    let _ = writeln!(&mut output);

    push_section_header(
        &mut output,
        "🧮",
        &format!("Credibility Score: {}", analysis.credibility_score),
    );
    push_key_value(
        &mut output,
        "Verified",
        &format!(
            "{} entities → {:+}",
            breakdown.verified_entity_count, breakdown.entity_points
        ),
    );
    push_key_value(
        &mut output,
        "Relations",
        &format!(
            "{} participations → {:+}",
            breakdown.relation_count, breakdown.relation_points
        ),
    );
    push_key_value(&mut output, "Source Bonus", &format!("{:+}", breakdown.source_bonus));
    push_key_value(&mut output, "Author Bonus", &format!("{:+}", breakdown.author_bonus));
    let _ = writeln!(&mut output);

    let mentions: Vec<_> = graph.mentions().collect();
    push_section_header(&mut output, "🔗", &format!("Entities ({})", mentions.len()));
    if mentions.is_empty() {
        let _ = writeln!(&mut output, "No entities mentioned.");
    }
    for node in mentions {
        let _ = writeln!(
            &mut output,
            "• {} [{}] → {}",
            node.label,
            node.class,
            identity(&node.id)
        );
        for edge in graph
            .edges_with(Predicate::ParticipatesIn)
            .filter(|edge| edge.from == node.id)
        {
            if let Some(event) = graph.node(&edge.to) {
                let _ = writeln!(&mut output, "    ↳ participates in {}", event.label);
            }
        }
    }

    if !analysis.skipped.is_empty() {
        let _ = writeln!(&mut output);
        push_section_header(&mut output, "⚠️", "Skipped Mentions");
        for skipped in &analysis.skipped {
            let _ = writeln!(
                &mut output,
                "• {:?} ({}): {}",
                skipped.label, skipped.coarse_type, skipped.reason
            );
        }
    }

    output
}
