use serde::Serialize;

use crate::core::config::SplitterConfig;
use crate::core::model::{Marker, PageAnalysis};

/// Score of the transition between two adjacent pages, with the rules that
/// contributed to it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TransitionScore {
    pub score: i32,
    pub factors: Vec<String>,
}

impl TransitionScore {
    fn add(&mut self, points: i32, factor: &str) {
        self.score += points;
        self.factors.push(factor.to_string());
    }
}

/// Decides how strongly `curr` looks like the first page of a new letter.
pub trait BoundaryScorer {
    fn score(&self, prev: &PageAnalysis, curr: &PageAnalysis) -> TransitionScore;
}

/// Additive weighted rules over the page markers.
#[derive(Debug, Clone, Default)]
pub struct HeuristicScorer {
    config: SplitterConfig,
}

impl HeuristicScorer {
    pub fn new(config: SplitterConfig) -> Self {
        Self { config }
    }

    fn in_top_third(&self, marker: &impl Marker) -> Option<bool> {
        marker.y_rel().map(|y| y <= self.config.top_third)
    }

    fn in_top_half(&self, marker: &impl Marker) -> Option<bool> {
        marker.y_rel().map(|y| y <= self.config.top_half)
    }
}

/// True when both markers were found and `lower` sits below `upper`.
fn is_below(lower: &impl Marker, upper: &impl Marker) -> bool {
    matches!((lower.y_rel(), upper.y_rel()), (Some(low), Some(up)) if low > up)
}

impl BoundaryScorer for HeuristicScorer {
    fn score(&self, prev: &PageAnalysis, curr: &PageAnalysis) -> TransitionScore {
        let mut result = TransitionScore::default();

        let index = &curr.letter_page_index;
        if index.found && index.current == Some(1) {
            let (low, high) = self.config.middle_band;
            match index.y_rel {
                Some(y) if y > low && y < high => result.add(200, "New Index in middle (+200)"),
                _ => result.add(1000, "New Index (+1000)"),
            }
        }

        if prev.letter_page_index.is_last() {
            result.add(1000, "Last Index of Previous (+1000)");
        }

        match self.in_top_third(&curr.address_block) {
            Some(true) => result.add(450, "Address Block at top (+450)"),
            Some(false) => result.add(75, "Address Block lower (+75)"),
            None => {}
        }

        match self.in_top_half(&curr.subject) {
            Some(true) => result.add(300, "Subject at top (+300)"),
            Some(false) => result.add(50, "Subject lower (+50)"),
            None => {}
        }

        match self.in_top_half(&curr.greeting) {
            Some(true) => result.add(250, "Greeting at top (+250)"),
            Some(false) => result.add(50, "Greeting lower (+50)"),
            None => {}
        }

        if self.in_top_third(&curr.date) == Some(true) {
            result.add(50, "Date at top (+50)");
        }

        // Only the first applicable address penalty counts.
        if is_below(&curr.address_block, &curr.subject) {
            result.add(-150, "Address below Subject (-150)");
        } else if is_below(&curr.address_block, &curr.greeting) {
            result.add(-150, "Address below Greeting (-150)");
        }

        if is_below(&curr.subject, &curr.greeting) {
            result.add(-200, "Subject below Greeting (-200)");
        }

        if self.in_top_third(&curr.goodbye) == Some(true) {
            result.add(-100, "Goodbye at top (-100)");
        }

        if is_below(&prev.goodbye, &prev.greeting) {
            result.add(200, "Previous page complete letter (+200)");
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geometry::RelPos;
    use crate::core::model::{AddressBlock, DateMarker, LetterPageIndex, TextMarker};
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn at(y_rel: f32) -> RelPos {
        RelPos { x_rel: 0.1, y_rel }
    }

    fn text_at(raw: &str, y_rel: f32) -> TextMarker {
        TextMarker::found(raw, at(y_rel))
    }

    fn index(current: u32, total: Option<u32>, y_rel: f32) -> LetterPageIndex {
        LetterPageIndex {
            found: true,
            current: Some(current),
            total,
            raw: Some(format!("Seite {current}")),
            x_rel: Some(0.45),
            y_rel: Some(y_rel),
        }
    }

    fn address_at(y_rel: f32) -> AddressBlock {
        AddressBlock {
            found: true,
            raw: Some("Hauptstraße 42\n12345 Berlin".to_string()),
            x_rel: Some(0.1),
            y_rel: Some(y_rel),
            name: None,
            street: Some("Hauptstraße 42".to_string()),
            zip: Some("12345".to_string()),
            city: Some("Berlin".to_string()),
            line_count: Some(2),
        }
    }

    fn date_at(y_rel: f32) -> DateMarker {
        DateMarker {
            found: true,
            raw: Some("12.05.2023".to_string()),
            date_value: NaiveDate::from_ymd_opt(2023, 5, 12),
            indicator: None,
            x_rel: Some(0.7),
            y_rel: Some(y_rel),
        }
    }

    fn score(prev: &PageAnalysis, curr: &PageAnalysis) -> TransitionScore {
        HeuristicScorer::default().score(prev, curr)
    }

    #[test]
    fn empty_pages_score_zero() {
        let result = score(&PageAnalysis::not_found(1), &PageAnalysis::not_found(2));
        assert_eq!(result, TransitionScore::default());
    }

    #[test]
    fn first_page_index_near_edge_always_splits() {
        for y in [0.05, 0.3, 0.7, 0.95] {
            let mut curr = PageAnalysis::not_found(2);
            curr.letter_page_index = index(1, Some(3), y);
            let result = score(&PageAnalysis::not_found(1), &curr);
            assert_eq!(result.score, 1000, "y_rel {y}");
            assert_eq!(result.factors, vec!["New Index (+1000)"]);
        }
    }

    #[test]
    fn first_page_index_mid_page_is_weak() {
        let mut curr = PageAnalysis::not_found(2);
        curr.letter_page_index = index(1, None, 0.5);
        assert_eq!(score(&PageAnalysis::not_found(1), &curr).score, 200);
    }

    #[test]
    fn middle_band_is_configurable() {
        let scorer = HeuristicScorer::new(SplitterConfig {
            middle_band: (0.2, 0.8),
            ..SplitterConfig::default()
        });
        let mut curr = PageAnalysis::not_found(2);
        curr.letter_page_index = index(1, None, 0.25);
        assert_eq!(scorer.score(&PageAnalysis::not_found(1), &curr).score, 200);
    }

    #[test]
    fn last_index_of_previous_page() {
        let mut prev = PageAnalysis::not_found(1);
        prev.letter_page_index = index(2, Some(2), 0.95);
        let result = score(&prev, &PageAnalysis::not_found(2));
        assert_eq!(result.score, 1000);
        assert_eq!(result.factors, vec!["Last Index of Previous (+1000)"]);
    }

    #[test]
    fn fresh_letter_layout_adds_up() {
        let mut curr = PageAnalysis::not_found(2);
        curr.address_block = address_at(0.15);
        curr.subject = text_at("Rechnung", 0.3);
        curr.greeting = text_at("Sehr geehrte Damen und Herren,", 0.4);
        curr.date = date_at(0.2);

        let result = score(&PageAnalysis::not_found(1), &curr);
        assert_eq!(result.score, 450 + 300 + 250 + 50);
        assert_eq!(
            result.factors,
            vec![
                "Address Block at top (+450)",
                "Subject at top (+300)",
                "Greeting at top (+250)",
                "Date at top (+50)",
            ]
        );
    }

    #[test]
    fn thresholds_are_inclusive() {
        let mut curr = PageAnalysis::not_found(2);
        curr.address_block = address_at(0.33);
        curr.subject = text_at("Rechnung", 0.5);
        let result = score(&PageAnalysis::not_found(1), &curr);
        assert_eq!(result.score, 450 + 300);
    }

    #[test]
    fn address_penalties_are_exclusive() {
        let mut curr = PageAnalysis::not_found(2);
        curr.greeting = text_at("Dear Sir,", 0.2);
        curr.subject = text_at("Invoice", 0.1);
        curr.address_block = address_at(0.6);

        let result = score(&PageAnalysis::not_found(1), &curr);
        assert!(result.factors.contains(&"Address below Subject (-150)".to_string()));
        assert!(!result.factors.contains(&"Address below Greeting (-150)".to_string()));
        assert_eq!(result.score, 75 + 300 + 250 - 150);
    }

    #[test]
    fn address_below_greeting_without_subject() {
        let mut curr = PageAnalysis::not_found(2);
        curr.greeting = text_at("Hallo Anna,", 0.2);
        curr.address_block = address_at(0.4);

        let result = score(&PageAnalysis::not_found(1), &curr);
        assert_eq!(
            result.factors,
            vec![
                "Address Block lower (+75)",
                "Greeting at top (+250)",
                "Address below Greeting (-150)",
            ]
        );
        assert_eq!(result.score, 75 + 250 - 150);
    }

    #[test]
    fn lower_subject_and_greeting_score_little() {
        let mut curr = PageAnalysis::not_found(2);
        curr.subject = text_at("Kündigung", 0.6);
        curr.greeting = text_at("Sehr geehrte Frau Müller,", 0.7);

        let result = score(&PageAnalysis::not_found(1), &curr);
        assert_eq!(result.factors, vec!["Subject lower (+50)", "Greeting lower (+50)"]);
        assert_eq!(result.score, 100);
    }

    #[test]
    fn subject_below_greeting_and_top_goodbye_penalize() {
        let mut curr = PageAnalysis::not_found(2);
        curr.greeting = text_at("Dear Sir,", 0.2);
        curr.subject = text_at("Invoice", 0.45);
        curr.goodbye = text_at("Kind regards", 0.1);

        let result = score(&PageAnalysis::not_found(1), &curr);
        assert_eq!(result.score, 300 + 250 - 200 - 100);
        assert_eq!(
            &result.factors[2..],
            &["Subject below Greeting (-200)", "Goodbye at top (-100)"]
        );
    }

    #[test]
    fn complete_previous_page_adds_bonus() {
        let mut prev = PageAnalysis::not_found(1);
        prev.greeting = text_at("Hallo Anna,", 0.2);
        prev.goodbye = text_at("Viele Grüße", 0.8);
        assert_eq!(score(&prev, &PageAnalysis::not_found(2)).score, 200);

        prev.goodbye = text_at("Viele Grüße", 0.1);
        assert_eq!(score(&prev, &PageAnalysis::not_found(2)).score, 0);
    }
}
