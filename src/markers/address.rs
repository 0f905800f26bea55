use std::cmp::Ordering;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::core::config::DetectorConfig;
use crate::core::model::AddressBlock;
use crate::ocr::layout_builder::{PageLayout, TextGroup};

/// "12345 Berlin", "60311 Frankfurt am Main", "06108 Halle (Saale)".
static ZIP_CITY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{5})\s+(\p{L}[\p{L}.()]*(?:[\s\-]+[\p{L}(][\p{L}.()]*)*)$")
        .expect("invalid zip/city regex")
});

struct Candidate<'a> {
    /// Lines above the anchor, top to bottom.
    aligned: Vec<&'a TextGroup>,
    anchor: &'a TextGroup,
    zip: String,
    city: String,
    order: usize,
}

impl Candidate<'_> {
    fn top(&self) -> f32 {
        self.aligned.first().map_or(self.anchor.top(), |line| line.top())
    }

    /// Target zip first, then more aligned lines, then topmost.
    fn rank(&self, other: &Self, target_zip: Option<&str>) -> Ordering {
        let hits = |c: &Self| target_zip.is_some_and(|zip| zip == c.zip);
        hits(other)
            .cmp(&hits(self))
            .then(other.aligned.len().cmp(&self.aligned.len()))
            .then(self.top().total_cmp(&other.top()))
            .then(self.order.cmp(&other.order))
    }
}

/// Collects the lines stacked directly above `lines[anchor]`: each must sit
/// within the gap tolerance of the line below it and share the anchor's
/// left edge. Misaligned lines that overlap the line below vertically sit
/// beside the block (a customer number, a reference) and are skipped.
fn aligned_lines<'a>(
    lines: &'a [TextGroup],
    anchor: usize,
    config: &DetectorConfig,
) -> Vec<&'a TextGroup> {
    let anchor_line = &lines[anchor];
    let mut below = anchor_line;
    let mut aligned = Vec::new();
    for line in lines[..anchor].iter().rev() {
        if aligned.len() == config.address_max_lines_above {
            break;
        }
        let gap = line.bbox().vertical_gap_to(&below.bbox());
        let offset = (line.left() - anchor_line.left()).abs();
        if offset > config.address_alignment_px {
            if gap < 0.0 {
                continue;
            }
            break;
        }
        if gap > config.address_gap_px {
            break;
        }
        aligned.push(line);
        below = line;
    }
    aligned.reverse();
    aligned
}

/// Detects the recipient address block in the recipient zone (top left of
/// the page).
///
/// Anchors are lines reading "<zip> <city>"; an anchor needs at least one
/// aligned line above it. The accepted block's line above the anchor is the
/// street and any lines above that form the name.
pub fn detect_address_block(layout: &PageLayout, config: &DetectorConfig) -> AddressBlock {
    let zone_bottom = layout.height() * config.recipient_zone_height;
    let zone_right = layout.width() * config.recipient_zone_width;
    let lines =
        layout.lines_where(|token| token.top() <= zone_bottom && token.left() <= zone_right);

    let candidates = lines.iter().enumerate().filter_map(|(idx, line)| {
        let caps = ZIP_CITY.captures(line.text().trim())?;
        let aligned = aligned_lines(&lines, idx, config);
        if aligned.is_empty() {
            log::trace!("address anchor '{}' has no aligned lines", line.text());
            return None;
        }
        Some(Candidate {
            aligned,
            anchor: line,
            zip: caps.get(1)?.as_str().to_string(),
            city: caps.get(2)?.as_str().to_string(),
            order: idx,
        })
    });

    let target_zip = config.target_zip.as_deref();
    let Some(best) = candidates.min_by(|a, b| a.rank(b, target_zip)) else {
        return AddressBlock::not_found();
    };

    let Some((street, names)) = best.aligned.split_last() else {
        return AddressBlock::not_found();
    };
    let name = (!names.is_empty()).then(|| {
        names
            .iter()
            .map(|line| line.text())
            .collect::<Vec<_>>()
            .join(" ")
    });
    let raw = best
        .aligned
        .iter()
        .chain(std::iter::once(&best.anchor))
        .map(|line| line.text())
        .collect::<Vec<_>>()
        .join("\n");
    let pos = layout.rel_pos(best.aligned[0].first_token());

    AddressBlock {
        found: true,
        raw: Some(raw),
        x_rel: Some(pos.x_rel),
        y_rel: Some(pos.y_rel),
        name,
        street: Some(street.text().to_string()),
        zip: Some(best.zip),
        city: Some(best.city),
        line_count: Some(best.aligned.len() + 1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markers::test_support::{layout, layout_of};
    use crate::ocr::tokens::test_support::line;
    use pretty_assertions::assert_eq;

    fn detect(items: &[(&str, f32, f32)]) -> AddressBlock {
        detect_address_block(&layout_of(items), &DetectorConfig::default())
    }

    #[test]
    fn reads_three_line_block() {
        let address = detect(&[
            ("Max Mustermann", 100.0, 200.0),
            ("Hauptstraße 42", 100.0, 230.0),
            ("12345 Berlin", 100.0, 260.0),
        ]);
        assert!(address.found);
        assert_eq!(address.name.as_deref(), Some("Max Mustermann"));
        assert_eq!(address.street.as_deref(), Some("Hauptstraße 42"));
        assert_eq!(address.zip.as_deref(), Some("12345"));
        assert_eq!(address.city.as_deref(), Some("Berlin"));
        assert_eq!(address.line_count, Some(3));
        assert_eq!(address.raw.as_deref(), Some("Max Mustermann\nHauptstraße 42\n12345 Berlin"));
        assert_eq!(address.x_rel, Some(0.1));
        assert_eq!(address.y_rel, Some(200.0 / 1500.0));
    }

    #[test]
    fn bare_anchor_is_rejected() {
        assert_eq!(detect(&[("12345 Berlin", 100.0, 260.0)]), AddressBlock::not_found());
    }

    #[test]
    fn street_only_block_has_no_name() {
        let address = detect(&[
            ("Postfach 1234", 100.0, 230.0),
            ("60311 Frankfurt am Main", 100.0, 260.0),
        ]);
        assert_eq!(address.name, None);
        assert_eq!(address.street.as_deref(), Some("Postfach 1234"));
        assert_eq!(address.city.as_deref(), Some("Frankfurt am Main"));
        assert_eq!(address.line_count, Some(2));
    }

    #[test]
    fn stops_at_gap_and_misalignment() {
        let address = detect(&[
            ("Briefkopf Versicherung AG", 100.0, 60.0),
            ("Frau", 160.0, 170.0),
            ("Erika Musterfrau", 100.0, 200.0),
            ("Am Markt 1", 100.0, 230.0),
            ("06108 Halle (Saale)", 100.0, 260.0),
        ]);
        assert_eq!(address.name.as_deref(), Some("Erika Musterfrau"));
        assert_eq!(address.city.as_deref(), Some("Halle (Saale)"));
        assert_eq!(address.line_count, Some(3));
    }

    #[test]
    fn skips_side_notes_next_to_the_block() {
        let address = detect(&[
            ("Max Mustermann", 100.0, 200.0),
            ("Hauptstraße 42", 100.0, 230.0),
            ("Kd-Nr 4711", 350.0, 255.0),
            ("12345 Berlin", 100.0, 260.0),
        ]);
        assert!(address.found);
        assert_eq!(address.name.as_deref(), Some("Max Mustermann"));
        assert_eq!(address.street.as_deref(), Some("Hauptstraße 42"));
        assert_eq!(address.line_count, Some(3));
    }

    #[test]
    fn walk_is_capped_at_max_lines_above() {
        let config = DetectorConfig {
            address_max_lines_above: 2,
            ..DetectorConfig::default()
        };
        let page = layout_of(&[
            ("z. Hd. Frau Schmidt", 100.0, 170.0),
            ("Max Mustermann", 100.0, 200.0),
            ("Hauptstraße 42", 100.0, 230.0),
            ("12345 Berlin", 100.0, 260.0),
        ]);
        let address = detect_address_block(&page, &config);
        assert_eq!(address.name.as_deref(), Some("Max Mustermann"));
        assert_eq!(address.line_count, Some(3));
    }

    #[test]
    fn equal_blocks_prefer_the_topmost() {
        let address = detect(&[
            ("Postfach 10", 100.0, 60.0),
            ("11111 Altstadt", 100.0, 90.0),
            ("Weg 2", 100.0, 200.0),
            ("22222 Neustadt", 100.0, 230.0),
        ]);
        assert_eq!(address.zip.as_deref(), Some("11111"));
        assert_eq!(address.street.as_deref(), Some("Postfach 10"));
        assert_eq!(address.y_rel, Some(60.0 / 1500.0));
    }

    #[test]
    fn ignores_lines_outside_recipient_zone() {
        let address = detect(&[
            ("Absender GmbH", 600.0, 200.0),
            ("12345 Berlin", 600.0, 230.0),
            ("Max Mustermann", 100.0, 600.0),
            ("12345 Berlin", 100.0, 630.0),
        ]);
        assert!(!address.found);
    }

    #[test]
    fn ranks_target_zip_over_longer_block() {
        let mut rows = line("Firma Beispiel", 100.0, 60.0, 1, 1);
        rows.extend(line("Werkstraße 7", 100.0, 90.0, 1, 2));
        rows.extend(line("80331 München", 100.0, 120.0, 1, 3));
        rows.extend(line("Herrn Paul Meier", 100.0, 250.0, 2, 1));
        rows.extend(line("Lindenweg 3", 100.0, 280.0, 2, 2));
        rows.extend(line("Kunde Nr. 9", 100.0, 310.0, 2, 3));
        rows.extend(line("Lindenweg 3a", 100.0, 340.0, 3, 1));
        rows.extend(line("10115 Berlin", 100.0, 370.0, 3, 2));

        let page = layout(rows);
        let default = detect_address_block(&page, &DetectorConfig::default());
        assert_eq!(default.zip.as_deref(), Some("10115"));

        let targeted =
            detect_address_block(&page, &DetectorConfig::default().with_target_zip("80331"));
        assert_eq!(targeted.zip.as_deref(), Some("80331"));
        assert_eq!(targeted.name.as_deref(), Some("Firma Beispiel"));
    }
}
