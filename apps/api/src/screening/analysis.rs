//! Best-effort reading of the model's four-section analysis.
//!
//! The model is asked for a fixed layout but nothing enforces it, so every
//! field is optional and parsing never fails. Callers always keep the raw
//! text alongside these sections.

use serde::{Deserialize, Serialize};

const MATCH_SCORE: &str = "match score";
const PROFILE_SUMMARY: &str = "profile summary";
const STRENGTHS: &str = "strengths & alignment";
const GAPS: &str = "potential gaps";

/// Characters that decorate a label or trail a section in markdown output.
const DECORATION: &[char] = &['*', '#', ':', '-', '_'];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSections {
    /// 0 – 100, when the model reported a usable percentage.
    pub match_score: Option<u8>,
    pub profile_summary: Option<String>,
    pub strengths: Option<String>,
    pub gaps: Option<String>,
}

pub fn parse_analysis(text: &str) -> AnalysisSections {
    // ASCII lowercasing keeps byte offsets aligned with `text`.
    let lowered = text.to_ascii_lowercase();
    let labels: Vec<(&str, Option<usize>)> = [MATCH_SCORE, PROFILE_SUMMARY, STRENGTHS, GAPS]
        .into_iter()
        .map(|label| (label, find_label(&lowered, label)))
        .collect();

    let section = |label: &str| -> Option<String> {
        let (_, start) = labels.iter().find(|(l, _)| *l == label)?;
        let body_start = start.as_ref()? + label.len();
        let body_end = labels
            .iter()
            .filter_map(|(_, pos)| *pos)
            .filter(|pos| *pos > body_start)
            .min()
            .unwrap_or(text.len());
        clean_section(&text[body_start..body_end])
    };

    AnalysisSections {
        match_score: section(MATCH_SCORE).and_then(|s| parse_percentage(&s)),
        profile_summary: section(PROFILE_SUMMARY),
        strengths: section(STRENGTHS),
        gaps: section(GAPS),
    }
}

/// Finds `label` where it opens a line (after list numbering or markdown
/// markers) and is followed by a colon or a line break. Mentions of a label
/// inside prose do not count.
fn find_label(lowered: &str, label: &str) -> Option<usize> {
    lowered
        .match_indices(label)
        .map(|(pos, _)| pos)
        .find(|&pos| {
            let line_start = lowered[..pos].rfind('\n').map_or(0, |i| i + 1);
            let opens_line = lowered[line_start..pos].chars().all(|c| {
                c.is_whitespace() || c.is_ascii_digit() || c == '.' || DECORATION.contains(&c)
            });
            let rest = lowered[pos + label.len()..]
                .trim_start_matches(|c: char| c == '*' || c == '#' || c == ' ' || c == '\t');
            let closes_label = rest.is_empty()
                || rest.starts_with(':')
                || rest.starts_with('\n')
                || rest.starts_with('\r');
            opens_line && closes_label
        })
}

fn clean_section(raw: &str) -> Option<String> {
    let is_trailing = |c: char| c.is_whitespace() || DECORATION.contains(&c) || c == '.';
    let mut trimmed = raw
        .trim_start_matches(|c: char| c.is_whitespace() || DECORATION.contains(&c))
        .trim_end_matches(is_trailing);

    // Drop the list number of the following section ("...\n2.").
    if let Some((head, last)) = trimmed.rsplit_once('\n') {
        if !last.is_empty() && last.trim().chars().all(|c| c.is_ascii_digit()) {
            trimmed = head.trim_end_matches(is_trailing);
        }
    }

    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Reads the first number in `s` as a percentage in 0 – 100.
fn parse_percentage(s: &str) -> Option<u8> {
    let start = s.find(|c: char| c.is_ascii_digit())?;
    let digits: String = s[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    let value: f64 = digits.trim_end_matches('.').parse().ok()?;
    if (0.0..=100.0).contains(&value) {
        Some(value.round() as u8)
    } else {
        None
    }
}
