//! Knowledge-base TSV parser.
//!
//! The downloaded knowledge base is a tab-separated document:
//! - Line 1: header (`Question\tAnswer\tSource`)
//! - Every other non-blank line: `question\tanswer\tsource`
//!
//! Each row becomes one [`Intent`]. Records end in `\r` or `\r\n`; a bare
//! `\n` belongs to the field it appears in, so answers may span lines.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use octochat_shared::{Intent, OctochatError, Result};
use regex::Regex;

/// Longest intent name kept; the platform caps the full `{bot}_{intent}` name.
pub const MAX_INTENT_NAME_LEN: usize = 65;

/// Byte-order mark some exports prepend to the document.
const BOM: char = '\u{feff}';

// ---------------------------------------------------------------------------
// Regex patterns (compiled once)
// ---------------------------------------------------------------------------

/// Anything that is not an ASCII letter.
static NON_LETTER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z]").expect("non-letter regex"));

/// ASCII punctuation the platform rejects in utterances (all but `-`, `_`, `'`).
static INVALID_PUNCT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[[:punct:]&&[^\-_']]").expect("utterance punctuation regex"));

static STOPWORDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    include_str!("stopwords.txt")
        .lines()
        .map(str::trim)
        .filter(|w| !w.is_empty())
        .collect()
});

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// Parse a downloaded knowledge base into intents.
pub fn parse_knowledge_base(content: &str) -> Result<Vec<Intent>> {
    let content = content.strip_prefix(BOM).unwrap_or(content);

    let mut records = content
        .split('\r')
        .map(|record| record.strip_prefix('\n').unwrap_or(record))
        .filter(|record| !record.trim().is_empty())
        .enumerate();

    // Header row
    if records.next().is_none() {
        return Err(OctochatError::parse("knowledge base is empty"));
    }

    let mut intents = Vec::new();
    for (index, record) in records {
        let fields: Vec<&str> = record.split('\t').collect();
        let [question, answer, _source] = fields.as_slice() else {
            return Err(OctochatError::parse(format!(
                "knowledge base record {}: expected 3 tab-separated fields, found {}",
                index + 1,
                fields.len()
            )));
        };

        intents.push(Intent {
            name: question_to_intent_name(question),
            sample_utterances: vec![remove_invalid_punctuation(question)],
            response: (*answer).to_string(),
        });
    }

    Ok(intents)
}

/// Condense a question into a letters-only intent name.
///
/// Stopwords are dropped first; when nothing but stopwords remains the full
/// question is used instead.
pub fn question_to_intent_name(question: &str) -> String {
    let filtered: String = question
        .split(' ')
        .filter(|token| !STOPWORDS.contains(token.to_lowercase().as_str()))
        .collect();

    let mut name = letters_only(&filtered);
    if name.is_empty() {
        name = letters_only(question);
    }
    name.chars().take(MAX_INTENT_NAME_LEN).collect()
}

/// Strip punctuation the platform rejects in sample utterances.
pub fn remove_invalid_punctuation(s: &str) -> String {
    INVALID_PUNCT_RE.replace_all(s, "").trim().to_string()
}

fn letters_only(s: &str) -> String {
    NON_LETTER_RE.replace_all(s, "").into_owned()
}

/// Intent names that occur more than once, in first-seen order.
///
/// Two questions can condense to the same name; the platform would keep only
/// the last registration.
pub fn duplicate_intent_names(intents: &[Intent]) -> Vec<String> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    let mut order = Vec::new();
    for intent in intents {
        let count = counts.entry(intent.name.as_str()).or_insert(0);
        *count += 1;
        if *count == 2 {
            order.push(intent.name.clone());
        }
    }
    order
}
