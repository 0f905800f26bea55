//! Interface of an external page-pair classifier that can replace the
//! heuristic scorer. Given excerpts of two adjacent pages it answers whether
//! the second page starts a new letter.
//!
//! The contract is strict: a malformed answer is an error and is never
//! repaired or replaced by a heuristic guess.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::core::model::{Letter, PageAnalysis};

/// Characters of each page sent to the classifier.
pub const MAX_PAGE_TEXT_CHARS: usize = 1500;

#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("no JSON object found in response: {0}")]
    NoJsonObject(String),
    #[error("invalid JSON in response: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("missing '{0}' field in response")]
    MissingField(&'static str),
    #[error("'{field}' must be a {expected}")]
    WrongType {
        field: &'static str,
        expected: &'static str,
    },
    #[error("'confidence' must be between 0.0 and 1.0, got {0}")]
    ConfidenceOutOfRange(f64),
    #[error("classifier request failed: {0}")]
    Transport(String),
    #[error("{pages} pages but {texts} page texts")]
    PageCountMismatch { pages: usize, texts: usize },
}

/// Answer for one page pair: does the second page start a new letter?
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundaryDecision {
    pub boundary: bool,
    pub confidence: f64,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairDecision {
    pub from_page: usize,
    pub to_page: usize,
    pub decision: BoundaryDecision,
}

/// A text-completion backend. Implementations own transport, timeouts and
/// retries; failures are reported as [`ClassifierError::Transport`].
pub trait BoundaryClassifier {
    fn complete(&self, prompt: &str) -> Result<String, ClassifierError>;
}

fn excerpt(text: &str) -> &str {
    match text.char_indices().nth(MAX_PAGE_TEXT_CHARS) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

/// Builds the classification prompt for pages `prev_num` and `curr_num`.
pub fn build_prompt(prev_text: &str, curr_text: &str, prev_num: usize, curr_num: usize) -> String {
    format!(
        "Du bist ein Experte für die Analyse von gescannten Briefdokumenten.\n\n\
         Aufgabe: Entscheide, ob Seite {curr_num} den Beginn eines NEUEN Briefes darstellt \
         oder die Fortsetzung des Briefes von Seite {prev_num} ist.\n\n\
         SEITE {prev_num}:\n{prev}\n\n\
         SEITE {curr_num}:\n{curr}\n\n\
         Gib deine Entscheidung ausschließlich als JSON zurück:\n\n\
         {{\n  \"boundary\": true oder false,\
         \n  \"confidence\": 0.0 bis 1.0,\
         \n  \"reason\": \"kurze Begründung\"\n}}\n\n\
         Hinweise:\n\
         - Ein neuer Brief beginnt typischerweise mit Absender, Datum, Empfänger, Betreff\n\
         - Eine Fortsetzung hat fortlaufenden Text oder eine neue Seitennummer\n\
         - \"boundary\": true bedeutet, dass Seite {curr_num} ein NEUER Brief ist\n\
         - \"boundary\": false bedeutet, dass Seite {curr_num} die FORTSETZUNG \
         von Seite {prev_num} ist\n\n\
         Antwort (nur JSON):",
        prev = excerpt(prev_text),
        curr = excerpt(curr_text),
    )
}

/// Parses the outermost `{...}` object of a classifier response.
pub fn parse_decision(response: &str) -> Result<BoundaryDecision, ClassifierError> {
    let response = response.trim();
    let (Some(start), Some(end)) = (response.find('{'), response.rfind('}')) else {
        return Err(ClassifierError::NoJsonObject(response.to_string()));
    };
    if end < start {
        return Err(ClassifierError::NoJsonObject(response.to_string()));
    }

    let value: Value = serde_json::from_str(&response[start..=end])?;
    let field = |name: &'static str| value.get(name).ok_or(ClassifierError::MissingField(name));

    let boundary = field("boundary")?.as_bool().ok_or(ClassifierError::WrongType {
        field: "boundary",
        expected: "boolean",
    })?;
    let confidence = field("confidence")?.as_f64().ok_or(ClassifierError::WrongType {
        field: "confidence",
        expected: "number",
    })?;
    let reason = field("reason")?.as_str().ok_or(ClassifierError::WrongType {
        field: "reason",
        expected: "string",
    })?;
    if !(0.0..=1.0).contains(&confidence) {
        return Err(ClassifierError::ConfidenceOutOfRange(confidence));
    }

    Ok(BoundaryDecision {
        boundary,
        confidence,
        reason: reason.to_string(),
    })
}

/// Classifies every adjacent pair of `texts`, page numbers starting at 1.
/// The first failure aborts the run.
pub fn detect_boundaries<C: BoundaryClassifier>(
    classifier: &C,
    texts: &[String],
) -> Result<Vec<PairDecision>, ClassifierError> {
    if texts.len() < 2 {
        log::info!("fewer than two pages, no boundaries to detect");
        return Ok(Vec::new());
    }

    let mut decisions = Vec::with_capacity(texts.len() - 1);
    for (idx, pair) in texts.windows(2).enumerate() {
        let (from_page, to_page) = (idx + 1, idx + 2);
        let prompt = build_prompt(&pair[0], &pair[1], from_page, to_page);
        let decision = classifier
            .complete(&prompt)
            .and_then(|response| parse_decision(&response))
            .inspect_err(|err| {
                log::error!("no boundary decision for pages {from_page}-{to_page}: {err}")
            })?;
        log::info!(
            "page {}: boundary={}, confidence={:.2}, reason='{}'",
            to_page,
            decision.boundary,
            decision.confidence,
            decision.reason
        );
        decisions.push(PairDecision {
            from_page,
            to_page,
            decision,
        });
    }
    Ok(decisions)
}

/// Groups pages by classifier decisions: the first page always opens a
/// letter and a page opens a new one only when its decision says so.
pub fn group_by_decisions(pages: Vec<PageAnalysis>, decisions: &[PairDecision]) -> Vec<Letter> {
    let mut letters: Vec<Letter> = Vec::new();
    for page in pages {
        let boundary = decisions
            .iter()
            .any(|d| d.to_page == page.scan_page_num && d.decision.boundary);
        match letters.last_mut() {
            Some(letter) if !boundary => letter.push(page),
            _ => letters.push(Letter::new(page)),
        }
    }
    log::info!("grouped pages into {} letters by classifier decisions", letters.len());
    letters
}

/// Classifies and groups in one go. `texts[i]` must be the text of `pages[i]`.
pub fn split_with_classifier<C: BoundaryClassifier>(
    classifier: &C,
    pages: Vec<PageAnalysis>,
    texts: &[String],
) -> Result<Vec<Letter>, ClassifierError> {
    if pages.len() != texts.len() {
        return Err(ClassifierError::PageCountMismatch {
            pages: pages.len(),
            texts: texts.len(),
        });
    }
    let decisions = detect_boundaries(classifier, texts)?;
    Ok(group_by_decisions(pages, &decisions))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;

    /// Replays canned responses and records the prompts it saw.
    struct Scripted {
        responses: RefCell<Vec<Result<String, ClassifierError>>>,
        prompts: RefCell<Vec<String>>,
    }

    impl Scripted {
        fn new(responses: Vec<Result<String, ClassifierError>>) -> Self {
            Self {
                responses: RefCell::new(responses.into_iter().rev().collect()),
                prompts: RefCell::new(Vec::new()),
            }
        }
    }

    impl BoundaryClassifier for Scripted {
        fn complete(&self, prompt: &str) -> Result<String, ClassifierError> {
            self.prompts.borrow_mut().push(prompt.to_string());
            self.responses
                .borrow_mut()
                .pop()
                .unwrap_or_else(|| Err(ClassifierError::Transport("no response left".to_string())))
        }
    }

    fn answer(boundary: bool) -> Result<String, ClassifierError> {
        Ok(format!(r#"{{"boundary": {boundary}, "confidence": 0.9, "reason": "test"}}"#))
    }

    #[test]
    fn parses_json_surrounded_by_text() -> Result<(), ClassifierError> {
        let decision = parse_decision(
            "Hier ist die Antwort:\n{\"boundary\": true, \"confidence\": 0.85, \
             \"reason\": \"Neuer Absender\"}\nDanke",
        )?;
        assert_eq!(
            decision,
            BoundaryDecision {
                boundary: true,
                confidence: 0.85,
                reason: "Neuer Absender".to_string(),
            }
        );
        Ok(())
    }

    #[test]
    fn rejects_contract_violations() {
        assert!(matches!(parse_decision("no json here"), Err(ClassifierError::NoJsonObject(_))));
        assert!(matches!(parse_decision("{not json}"), Err(ClassifierError::InvalidJson(_))));
        assert!(matches!(
            parse_decision(r#"{"confidence": 0.5, "reason": "x"}"#),
            Err(ClassifierError::MissingField("boundary"))
        ));
        assert!(matches!(
            parse_decision(r#"{"boundary": "yes", "confidence": 0.5, "reason": "x"}"#),
            Err(ClassifierError::WrongType { field: "boundary", .. })
        ));
        assert!(matches!(
            parse_decision(r#"{"boundary": true, "confidence": "high", "reason": "x"}"#),
            Err(ClassifierError::WrongType { field: "confidence", .. })
        ));
        assert!(matches!(
            parse_decision(r#"{"boundary": true, "confidence": 1.5, "reason": "x"}"#),
            Err(ClassifierError::ConfidenceOutOfRange(_))
        ));
    }

    #[test]
    fn prompt_truncates_page_text() {
        let long = "ä".repeat(MAX_PAGE_TEXT_CHARS + 100);
        let prompt = build_prompt(&long, "kurz", 4, 5);
        assert!(prompt.contains(&"ä".repeat(MAX_PAGE_TEXT_CHARS)));
        assert!(!prompt.contains(&"ä".repeat(MAX_PAGE_TEXT_CHARS + 1)));
        assert!(prompt.contains("SEITE 5:\nkurz"));
    }

    #[test]
    fn groups_pages_by_decisions() -> Result<(), ClassifierError> {
        let texts: Vec<String> = ["a", "b", "c", "d"].iter().map(|s| s.to_string()).collect();
        let pages: Vec<PageAnalysis> = (1..=4).map(PageAnalysis::not_found).collect();
        let classifier = Scripted::new(vec![answer(false), answer(true), answer(false)]);

        let letters = split_with_classifier(&classifier, pages, &texts)?;
        let ranges: Vec<(usize, usize)> = letters.iter().map(Letter::page_range).collect();
        assert_eq!(ranges, vec![(1, 2), (3, 4)]);
        assert_eq!(classifier.prompts.borrow().len(), 3);
        Ok(())
    }

    #[test]
    fn first_failure_aborts() {
        let texts: Vec<String> = vec!["a".into(), "b".into(), "c".into()];
        let classifier = Scripted::new(vec![
            answer(true),
            Ok(r#"{"boundary": true, "confidence": 2.0, "reason": "x"}"#.to_string()),
            answer(true),
        ]);
        let result = detect_boundaries(&classifier, &texts);
        assert!(matches!(result, Err(ClassifierError::ConfidenceOutOfRange(_))));
        assert_eq!(classifier.prompts.borrow().len(), 2);
    }

    #[test]
    fn mismatched_inputs_are_rejected() {
        let classifier = Scripted::new(Vec::new());
        let result = split_with_classifier(&classifier, vec![PageAnalysis::not_found(1)], &[]);
        assert!(matches!(result, Err(ClassifierError::PageCountMismatch { pages: 1, texts: 0 })));
    }
}
