//! Advisory implicit-dependency detection.
//!
//! Scans pairs of task descriptions for textual evidence that one task
//! should precede another: shared file/resource tokens, CRUD-verb
//! ordering, and keyword overlap. Every match becomes a
//! confidence-scored [`ImplicitDependency`] candidate with
//! human-readable reasoning.
//!
//! Candidates are advisory only. They are never merged into the
//! declared [`crate::core::TaskGraph`], because doing so could silently
//! violate the batch-independence invariant the optimizer relies on.

use crate::core::task::{Task, TaskId};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::OnceLock;

/// Candidates scoring below this confidence are discarded.
pub const MIN_CONFIDENCE: u8 = 30;

/// Minimum Jaccard similarity for a keyword-overlap signal.
pub const KEYWORD_SIMILARITY_THRESHOLD: f64 = 0.3;

const RESOURCE_WEIGHT: f64 = 40.0;
const CRUD_WEIGHT: f64 = 35.0;
const KEYWORD_WEIGHT: f64 = 25.0;

/// CRUD verb classification of a task description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrudVerb {
    Create,
    Read,
    Update,
    Delete,
}

/// A single piece of evidence behind an implicit dependency candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ImplicitSignal {
    /// Both descriptions mention the same file or resource token.
    SharedResource {
        /// The token both tasks reference.
        token: String,
    },
    /// A create verb on a token precedes a read/update/delete of it.
    CrudOrdering {
        /// The token being created then consumed.
        token: String,
        /// Verb of the consuming task.
        consumer_verb: CrudVerb,
    },
    /// Description keyword sets overlap above the similarity threshold.
    KeywordOverlap {
        /// Jaccard similarity of the two keyword sets.
        similarity: f64,
    },
}

/// A heuristically inferred ordering constraint between two tasks.
///
/// Distinct from a declared edge: `from` should plausibly complete
/// before `to`, with `confidence` in 0..=100 and reasoning naming the
/// evidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImplicitDependency {
    /// Task that should plausibly run first.
    pub from: TaskId,
    /// Task that should plausibly wait.
    pub to: TaskId,
    /// Weighted combination of signal strengths, 0..=100.
    pub confidence: u8,
    /// Human-readable explanation of the evidence.
    pub reasoning: String,
    /// The individual signals that contributed.
    pub signals: Vec<ImplicitSignal>,
}

fn resource_regexes() -> &'static (Regex, Regex, Regex) {
    static RE: OnceLock<(Regex, Regex, Regex)> = OnceLock::new();
    RE.get_or_init(|| {
        (
            // File-like tokens: "src/user.rs", "users.db", "api/v1/schema.json"
            Regex::new(r"\b[\w./-]*\w\.\w{1,5}\b").expect("file token regex"),
            // Backtick-quoted identifiers
            Regex::new(r"`([^`]+)`").expect("backtick regex"),
            // "table users", "database orders", "endpoint /login" style mentions
            Regex::new(
                r"(?i)\b(?:table|database|db|schema|collection|queue|topic|endpoint|service|api)\s+([A-Za-z0-9_./-]+)",
            )
            .expect("resource keyword regex"),
        )
    })
}

fn crud_regexes() -> &'static [(Regex, CrudVerb); 4] {
    static RE: OnceLock<[(Regex, CrudVerb); 4]> = OnceLock::new();
    RE.get_or_init(|| {
        [
            (
                Regex::new(r"(?i)\b(create|add|build|implement|scaffold|generate)\b")
                    .expect("create regex"),
                CrudVerb::Create,
            ),
            (
                Regex::new(r"(?i)\b(read|fetch|get|query|list|load)\b").expect("read regex"),
                CrudVerb::Read,
            ),
            (
                Regex::new(r"(?i)\b(update|modify|edit|refactor|extend|migrate)\b")
                    .expect("update regex"),
                CrudVerb::Update,
            ),
            (
                Regex::new(r"(?i)\b(delete|remove|drop|deprecate)\b").expect("delete regex"),
                CrudVerb::Delete,
            ),
        ]
    })
}

const STOPWORDS: &[&str] = &[
    "the", "and", "for", "with", "that", "this", "from", "into", "all", "are", "was", "will",
    "then", "when", "each", "new", "add", "use", "can", "should",
];

/// Extract file and resource tokens from a description.
pub fn resource_tokens(description: &str) -> BTreeSet<String> {
    let (file_re, backtick_re, keyword_re) = resource_regexes();
    let mut tokens = BTreeSet::new();

    for m in file_re.find_iter(description) {
        tokens.insert(m.as_str().to_lowercase());
    }
    for c in backtick_re.captures_iter(description) {
        tokens.insert(c[1].trim().to_lowercase());
    }
    for c in keyword_re.captures_iter(description) {
        tokens.insert(c[1].to_lowercase());
    }

    tokens
}

/// Classify the dominant CRUD verb of a description, if any.
///
/// The earliest verb match in the text wins, so "create then test"
/// classifies as create.
pub fn crud_verb(description: &str) -> Option<CrudVerb> {
    crud_regexes()
        .iter()
        .filter_map(|(re, verb)| re.find(description).map(|m| (m.start(), *verb)))
        .min_by_key(|(start, _)| *start)
        .map(|(_, verb)| verb)
}

/// Normalized keyword set: lowercased words of 3+ characters with
/// stopwords removed.
pub fn keyword_set(description: &str) -> BTreeSet<String> {
    description
        .split(|c: char| !c.is_alphanumeric() && c != '_')
        .map(|w| w.to_lowercase())
        .filter(|w| w.len() >= 3 && !STOPWORDS.contains(&w.as_str()))
        .collect()
}

/// Jaccard similarity of two keyword sets.
pub fn jaccard(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count() as f64;
    let union = a.union(b).count() as f64;
    intersection / union
}

/// Scan every pair of tasks for implicit dependency candidates.
///
/// Pairs already connected by a declared edge (in either direction) in
/// `tasks` are skipped: the caller has ordered them explicitly.
/// Direction of a candidate: the creator for CRUD evidence, else list
/// order (the textually earlier task becomes `from`).
pub fn detect(tasks: &[Task]) -> Vec<ImplicitDependency> {
    let prepared: Vec<(BTreeSet<String>, Option<CrudVerb>, BTreeSet<String>)> = tasks
        .iter()
        .map(|t| {
            (
                resource_tokens(&t.description),
                crud_verb(&t.description),
                keyword_set(&t.description),
            )
        })
        .collect();

    let mut candidates = Vec::new();

    for i in 0..tasks.len() {
        for j in (i + 1)..tasks.len() {
            let (a, b) = (&tasks[i], &tasks[j]);
            if a.depends_on.contains(&b.id) || b.depends_on.contains(&a.id) {
                continue;
            }

            if let Some(candidate) = score_pair(a, b, &prepared[i], &prepared[j]) {
                candidates.push(candidate);
            }
        }
    }

    tracing::debug!(count = candidates.len(), "implicit dependency candidates");
    candidates
}

type Prepared = (BTreeSet<String>, Option<CrudVerb>, BTreeSet<String>);

fn score_pair(a: &Task, b: &Task, pa: &Prepared, pb: &Prepared) -> Option<ImplicitDependency> {
    let (tokens_a, verb_a, keywords_a) = pa;
    let (tokens_b, verb_b, keywords_b) = pb;

    let mut signals = Vec::new();
    let mut reasons = Vec::new();
    let mut score = 0.0;
    // Default direction: a textually precedes b.
    let mut from = a.id.clone();
    let mut to = b.id.clone();

    let shared: Vec<&String> = tokens_a.intersection(tokens_b).collect();
    if let Some(token) = shared.first() {
        score += RESOURCE_WEIGHT;
        signals.push(ImplicitSignal::SharedResource {
            token: (*token).clone(),
        });
        reasons.push(format!("both tasks mention `{}`", token));
    }

    if let (Some(va), Some(vb)) = (verb_a, verb_b) {
        let crud_token = shared
            .first()
            .map(|t| (*t).clone())
            .unwrap_or_else(|| "the shared subject".to_string());
        let ordering = match (va, vb) {
            (CrudVerb::Create, consumer) if *consumer != CrudVerb::Create && !shared.is_empty() => {
                Some((a.id.clone(), b.id.clone(), *consumer))
            }
            (consumer, CrudVerb::Create) if *consumer != CrudVerb::Create && !shared.is_empty() => {
                Some((b.id.clone(), a.id.clone(), *consumer))
            }
            _ => None,
        };
        if let Some((creator, consumer, consumer_verb)) = ordering {
            score += CRUD_WEIGHT;
            reasons.push(format!(
                "task {} creates {} which task {} then consumes",
                creator, crud_token, consumer
            ));
            signals.push(ImplicitSignal::CrudOrdering {
                token: crud_token,
                consumer_verb,
            });
            from = creator;
            to = consumer;
        }
    }

    let similarity = jaccard(keywords_a, keywords_b);
    if similarity >= KEYWORD_SIMILARITY_THRESHOLD {
        score += (similarity * 50.0).min(KEYWORD_WEIGHT);
        signals.push(ImplicitSignal::KeywordOverlap { similarity });
        reasons.push(format!(
            "descriptions share {:.0}% of their keywords",
            similarity * 100.0
        ));
    }

    let confidence = score.min(100.0).round() as u8;
    if confidence < MIN_CONFIDENCE || signals.is_empty() {
        return None;
    }

    Some(ImplicitDependency {
        from,
        to,
        confidence,
        reasoning: reasons.join("; "),
        signals,
    })
}
