//! Entity extraction from article text
//!
//! The pipeline only depends on [`EntityExtractor`]. [`HeuristicExtractor`]
//! is the built-in implementation: capitalized word runs classified by cue
//! words. Adapters around external NER models map their labels through
//! [`ExtractedSpan::from_ner_label`].

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::types::{EntityMention, EntityType};

/// A span of article text with its coarse type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ExtractedSpan {
    pub text: String,
    pub coarse_type: EntityType,
}

impl ExtractedSpan {
    pub fn new(text: impl Into<String>, coarse_type: EntityType) -> Self {
        Self {
            text: text.into(),
            coarse_type,
        }
    }

    /// Span from an NER model label such as `ORG` or `GPE`; `None` for labels
    /// with no coarse type.
    pub fn from_ner_label(text: impl Into<String>, label: &str) -> Option<Self> {
        EntityType::from_ner_label(label).map(|coarse_type| Self::new(text, coarse_type))
    }
}

impl From<ExtractedSpan> for EntityMention {
    fn from(span: ExtractedSpan) -> Self {
        EntityMention::new(span.text, span.coarse_type)
    }
}

/// Turns article text into typed entity spans.
pub trait EntityExtractor: Send + Sync {
    fn extract(&self, text: &str) -> Vec<ExtractedSpan>;
}

static RE_CAPITALIZED_RUN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\p{Lu}(?:[\p{L}\p{N}'&\-]|\.\p{L})*(?:[ \t]+(?:\p{Lu}(?:[\p{L}\p{N}'&\-]|\.\p{L})*|of|de|del|da|van|von|der))*",
    )
    .unwrap()
});

const FUNCTION_WORDS: &[&str] = &[
    "A", "After", "Also", "An", "And", "As", "At", "Before", "But", "By", "During", "For", "From",
    "He", "Her", "His", "However", "I", "If", "In", "It", "Its", "Later", "Meanwhile", "Mr", "Mrs", "Ms",
    "On", "Or", "She", "So", "That", "The", "Their", "These", "They", "This", "Those", "To",
    "Today", "We", "When", "While", "With", "Yesterday", "Monday", "Tuesday", "Wednesday",
    "Thursday", "Friday", "Saturday", "Sunday",
];

const EVENT_CUES: &[&str] = &[
    "Cup", "Olympics", "Olympic", "Championship", "Championships", "Open", "Games", "Prix",
    "Tournament", "Series", "Marathon", "Derby", "Final", "Finals", "Bowl", "Classic", "Slam",
];

const TEAM_CUES: &[&str] = &[
    "FC", "CF", "SC", "AFC", "United", "City", "Club", "Athletic", "Athletico", "Rovers",
    "Wanderers", "Rangers", "Hotspur", "Lakers", "Yankees",
];

const ORGANIZATION_CUES: &[&str] = &[
    "Inc", "Corp", "Corporation", "Ltd", "LLC", "Company", "Group", "News", "Times", "Post",
    "Press", "Agency", "University", "Association", "Federation", "Committee", "Council",
    "Ministry", "Institute", "Bank", "League", "Network", "Guardian",
];

const ATHLETE_CUES: &[&str] = &[
    "athlete", "player", "striker", "forward", "midfielder", "defender", "goalkeeper", "keeper",
    "captain", "star", "champion", "sprinter", "swimmer", "runner", "cyclist", "quarterback",
    "pitcher", "winger", "boxer", "golfer", "driver",
];

const PLACE_CUES: &[&str] = &[
    "Stadium", "Arena", "Park", "Square", "Island", "Islands", "Republic", "Kingdom", "States",
    "Street", "Avenue", "Valley", "Bay", "Beach", "Coast",
];

const LOCATIVE_PREPOSITIONS: &[&str] = &[
    "in", "at", "near", "across", "throughout", "inside", "outside", "around",
];

/// Verbs after which "to" introduces a destination rather than a recipient.
const MOTION_VERBS: &[&str] = &[
    "flew", "fly", "flown", "travelled", "traveled", "moved", "returned", "headed", "went",
    "came", "arrived", "relocated", "drove", "sailed",
];

/// Capitalization and cue-word extractor.
///
/// No recall or precision guarantees; it exists so the pipeline can run
/// without an external NER model.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicExtractor;

impl HeuristicExtractor {
    pub fn new() -> Self {
        Self
    }

    fn classify(span: &str, context: Context<'_>) -> EntityType {
        let words: Vec<&str> = span.split_whitespace().collect();
        let has_cue = |cues: &[&str]| words.iter().any(|word| cues.contains(word));

        if has_cue(EVENT_CUES) {
            EntityType::Event
        } else if has_cue(TEAM_CUES) {
            EntityType::Team
        } else if has_cue(ORGANIZATION_CUES) || is_acronym(&words) {
            EntityType::Organization
        } else if context.preceding.is_some_and(|word| ATHLETE_CUES.contains(&word)) {
            EntityType::Athlete
        } else if has_cue(PLACE_CUES) || context.is_locative() {
            // Places are looked up as events, the same as NER location labels.
            EntityType::Event
        } else {
            EntityType::Person
        }
    }
}

/// Lowercased words immediately before a span, nearest first.
#[derive(Debug, Clone, Copy, Default)]
struct Context<'a> {
    preceding: Option<&'a str>,
    before_preceding: Option<&'a str>,
}

impl Context<'_> {
    fn is_locative(&self) -> bool {
        match (self.preceding, self.before_preceding) {
            (Some(word), _) if LOCATIVE_PREPOSITIONS.contains(&word) => true,
            (Some("to"), Some(verb)) => MOTION_VERBS.contains(&verb),
            _ => false,
        }
    }
}

impl EntityExtractor for HeuristicExtractor {
    fn extract(&self, text: &str) -> Vec<ExtractedSpan> {
        let mut seen = HashSet::new();
        let mut spans = Vec::new();

        for found in RE_CAPITALIZED_RUN.find_iter(text) {
            let Some(stripped) = strip_function_words(found.as_str()) else {
                continue;
            };

            let mut before: Vec<String> = text[..found.start()]
                .split_whitespace()
                .rev()
                .take(2)
                .map(|word| word.trim_matches(|c: char| !c.is_alphabetic()).to_lowercase())
                .collect();
            // A leading function word dropped from the run is the nearest word.
            if let Some(word) = stripped.dropped {
                before.insert(0, word.to_lowercase());
            }
            let context = Context {
                preceding: before.first().map(String::as_str),
                before_preceding: before.get(1).map(String::as_str),
            };
            let coarse_type = Self::classify(&stripped.span, context);

            let extracted = ExtractedSpan::new(stripped.span, coarse_type);
            if seen.insert(extracted.clone()) {
                spans.push(extracted);
            }
        }

        spans
    }
}

struct Stripped<'a> {
    span: String,
    /// Last leading function word removed from the run.
    dropped: Option<&'a str>,
}

/// Drop leading function words and trailing connectors; `None` when nothing
/// meaningful is left.
fn strip_function_words(run: &str) -> Option<Stripped<'_>> {
    let words: Vec<&str> = run
        .split_whitespace()
        .map(|word| word.trim_end_matches(['\'', '-']))
        .collect();
    let start = words
        .iter()
        .position(|word| !FUNCTION_WORDS.contains(word) && !word.is_empty())?;
    let dropped = start.checked_sub(1).map(|idx| words[idx]);

    let mut kept = &words[start..];
    while let Some((last, rest)) = kept.split_last() {
        if last.chars().next().is_some_and(char::is_uppercase) {
            break;
        }
        kept = rest;
    }

    if kept.is_empty() {
        None
    } else {
        Some(Stripped {
            span: kept.join(" "),
            dropped,
        })
    }
}

fn is_acronym(words: &[&str]) -> bool {
    matches!(words, [word] if word.len() >= 2 && word.chars().all(|c| c.is_ascii_uppercase()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(text: &str) -> Vec<(String, EntityType)> {
        HeuristicExtractor::new()
            .extract(text)
            .into_iter()
            .map(|span| (span.text, span.coarse_type))
            .collect()
    }

    #[test]
    fn classifies_by_cue_words() {
        let spans = extract(
            "Argentina striker Lionel Messi lifted the World Cup with the help of Reuters News \
             coverage, while Inter Miami FC watched.",
        );

        assert!(spans.contains(&("Lionel Messi".to_string(), EntityType::Athlete)));
        assert!(spans.contains(&("World Cup".to_string(), EntityType::Event)));
        assert!(spans.contains(&("Reuters News".to_string(), EntityType::Organization)));
        assert!(spans.contains(&("Inter Miami FC".to_string(), EntityType::Team)));
    }

    #[test]
    fn strips_leading_function_words() {
        let spans = extract("The Olympics opened. In Paris crowds gathered.");
        assert_eq!(spans[0], ("Olympics".to_string(), EntityType::Event));
        assert_eq!(spans[1], ("Paris".to_string(), EntityType::Event));
    }

    #[test]
    fn places_are_tagged_as_events() {
        let spans = extract(
            "The final was played in Qatar and fans flew to Paris. Later they met at Wembley \
             Stadium and Messi passed to Rodrigo De Paul.",
        );

        assert!(spans.contains(&("Qatar".to_string(), EntityType::Event)));
        assert!(spans.contains(&("Paris".to_string(), EntityType::Event)));
        assert!(spans.contains(&("Wembley Stadium".to_string(), EntityType::Event)));
        assert!(spans.contains(&("Rodrigo De Paul".to_string(), EntityType::Person)));
    }

    #[test]
    fn drops_function_word_only_runs() {
        assert!(extract("The end. It was over. Yesterday.").is_empty());
    }

    #[test]
    fn runs_stop_at_sentence_ends() {
        let spans = extract("It was Lionel Messi. The Olympics follow.");
        assert_eq!(spans[0].0, "Lionel Messi");
        assert_eq!(spans[1].0, "Olympics");
    }

    #[test]
    fn acronyms_are_organizations() {
        let spans = extract("FIFA confirmed the schedule.");
        assert_eq!(spans, vec![("FIFA".to_string(), EntityType::Organization)]);
    }

    #[test]
    fn reports_duplicates_once_in_first_seen_order() {
        let spans = extract("Serena Williams won. Later Serena Williams spoke to BBC.");
        assert_eq!(
            spans,
            vec![
                ("Serena Williams".to_string(), EntityType::Person),
                ("BBC".to_string(), EntityType::Organization),
            ]
        );
    }

    #[test]
    fn ner_labels_map_through_coarse_types() {
        let span = ExtractedSpan::from_ner_label("Qatar", "GPE").unwrap();
        assert_eq!(span.coarse_type, EntityType::Event);
        assert!(ExtractedSpan::from_ner_label("Tuesday", "DATE").is_none());

        let mention: EntityMention = span.into();
        assert_eq!(mention.coarse_type, "EVENT");
    }
}
