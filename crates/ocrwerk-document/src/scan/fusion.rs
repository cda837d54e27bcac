// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Result fusion: scores candidate transcriptions and picks one.

use std::collections::BTreeSet;

use ocrwerk_core::types::{RecognitionCandidate, TargetScript};
use tracing::debug;

/// Candidates shorter than this may lose to a longer, credible alternative.
const SHORT_RESULT_CHARS: usize = 50;
/// An alternative must be at least this many times the best's length...
const LONGER_FACTOR: f32 = 1.5;
/// ...with at least this fraction of the best's confidence.
const CREDIBLE_CONFIDENCE_FACTOR: f32 = 0.7;

/// Character count used by every length measure: Unicode scalars of the
/// trimmed text.
pub fn text_len(text: &str) -> usize {
    text.trim().chars().count()
}

/// Text-only plausibility score in `[0, 100]`.
///
/// Sums a length term (25), character diversity (25), non-space density (15),
/// non-blank line ratio (15), and a bonus of up to 20 when more than a tenth
/// of the non-space characters belong to `script`.
pub fn quality_score(text: &str, script: &TargetScript) -> f32 {
    let text = text.trim();
    let total = text.chars().count();
    if total == 0 {
        return 0.0;
    }

    let non_space: Vec<char> = text.chars().filter(|c| !c.is_whitespace()).collect();
    let distinct: BTreeSet<char> = non_space.iter().copied().collect();

    let length_term = (total as f32 / 100.0).min(1.0) * 25.0;
    let diversity_term = (distinct.len() as f32 / 50.0).min(1.0) * 25.0;
    let density_term = non_space.len() as f32 / total as f32 * 15.0;

    let (lines, non_blank) = text.lines().fold((0usize, 0usize), |(all, filled), line| {
        (all + 1, filled + usize::from(!line.trim().is_empty()))
    });
    let line_term = if lines == 0 {
        0.0
    } else {
        non_blank as f32 / lines as f32 * 15.0
    };

    let script_term = if non_space.is_empty() {
        0.0
    } else {
        let in_script = non_space.iter().filter(|c| script.contains(**c)).count();
        let fraction = in_script as f32 / non_space.len() as f32;
        if fraction > 0.1 {
            (fraction * 20.0).min(20.0)
        } else {
            0.0
        }
    };

    (length_term + diversity_term + density_term + line_term + script_term).clamp(0.0, 100.0)
}

/// Ranking score: half confidence, 0.3 of quality, and up to 20 for length.
pub fn combined_score(candidate: &RecognitionCandidate, script: &TargetScript) -> f32 {
    let len = text_len(&candidate.text);
    candidate.confidence * 0.5
        + quality_score(&candidate.text, script) * 0.3
        + (len as f32 / 500.0).min(1.0) * 20.0
}

/// Picks one candidate out of several.
#[derive(Debug, Clone, Default)]
pub struct ResultFusion {
    script: TargetScript,
}

impl ResultFusion {
    pub fn new(script: TargetScript) -> Self {
        Self { script }
    }

    /// Choose the best candidate, or `None` when there are none.
    ///
    /// The top combined score wins unless it is short (under 50 chars) and a
    /// candidate at least 1.5x as long has at least 0.7x its confidence, in
    /// which case the longest such candidate wins. Ties keep call order.
    pub fn select<'a>(
        &self,
        candidates: &'a [RecognitionCandidate],
    ) -> Option<&'a RecognitionCandidate> {
        let mut ranked: Vec<(&RecognitionCandidate, f32)> = candidates
            .iter()
            .map(|c| (c, combined_score(c, &self.script)))
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

        for (candidate, score) in &ranked {
            debug!(
                mode = %candidate.mode,
                confidence = candidate.confidence,
                chars = text_len(&candidate.text),
                score,
                "Ranked candidate"
            );
        }

        let (best, _) = *ranked.first()?;
        let best_len = text_len(&best.text);
        if best_len >= SHORT_RESULT_CHARS || ranked.len() < 2 {
            return Some(best);
        }

        let min_len = best_len as f32 * LONGER_FACTOR;
        let min_confidence = best.confidence * CREDIBLE_CONFIDENCE_FACTOR;
        let mut longest: Option<(&RecognitionCandidate, usize)> = None;
        for (candidate, _) in &ranked {
            let len = text_len(&candidate.text);
            if len as f32 >= min_len
                && candidate.confidence >= min_confidence
                && longest.is_none_or(|(_, best_so_far)| len > best_so_far)
            {
                longest = Some((candidate, len));
            }
        }

        match longest {
            Some((candidate, len)) => {
                debug!(mode = %candidate.mode, chars = len, "Preferring longer credible candidate");
                Some(candidate)
            }
            None => Some(best),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ocrwerk_core::types::SegmentationMode;

    const LONG: &str =
        "much longer text exceeding the short one by far more than one and a half times";

    fn candidate(text: &str, confidence: f32, mode: SegmentationMode) -> RecognitionCandidate {
        RecognitionCandidate::new(text, confidence, mode)
    }

    #[test]
    fn quality_of_short_latin_text() {
        let score = quality_score("short", &TargetScript::thai());
        assert!((score - 33.75).abs() < 1e-3, "got {score}");
    }

    #[test]
    fn quality_rewards_target_script() {
        let thai = TargetScript::thai();
        let latin = quality_score("abcdef", &thai);
        let mixed = quality_score("abcกขค", &thai);
        assert!(mixed > latin + 9.0, "latin {latin}, mixed {mixed}");
        assert!(quality_score("", &thai) == 0.0);
        assert!(quality_score(&"ก".repeat(500), &thai) <= 100.0);
    }

    #[test]
    fn blank_lines_lower_quality() {
        let thai = TargetScript::thai();
        let dense = quality_score("line one\nline two", &thai);
        let sparse = quality_score("line one\n\n\nline two", &thai);
        assert!(dense > sparse);
    }

    #[test]
    fn short_best_yields_to_longer_credible_candidate() {
        let thai = TargetScript::thai();
        let candidates = vec![
            candidate("short", 90.0, SegmentationMode::Auto),
            candidate(LONG, 70.0, SegmentationMode::SingleColumn),
        ];
        // The short one ranks first on its own...
        assert!(combined_score(&candidates[0], &thai) > combined_score(&candidates[1], &thai));
        // ...but the longer one is credible enough to win.
        let chosen = ResultFusion::default().select(&candidates).unwrap();
        assert_eq!(chosen.text, LONG);
    }

    #[test]
    fn longer_candidate_needs_enough_confidence() {
        let candidates = vec![
            candidate("short", 90.0, SegmentationMode::Auto),
            candidate(LONG, 50.0, SegmentationMode::SingleColumn),
        ];
        let chosen = ResultFusion::default().select(&candidates).unwrap();
        assert_eq!(chosen.text, "short");
    }

    #[test]
    fn long_best_is_kept() {
        let long_best = "x".repeat(60) + " plus some more words to be sure";
        let candidates = vec![
            candidate(&long_best, 95.0, SegmentationMode::Auto),
            candidate(&format!("{long_best} {long_best}"), 90.0, SegmentationMode::SingleBlock),
        ];
        let fusion = ResultFusion::default();
        let chosen = fusion.select(&candidates).unwrap();
        let best_by_score = candidates
            .iter()
            .max_by(|a, b| {
                combined_score(a, &TargetScript::thai())
                    .total_cmp(&combined_score(b, &TargetScript::thai()))
            })
            .unwrap();
        assert_eq!(chosen, best_by_score);
    }

    #[test]
    fn ties_keep_call_order() {
        let candidates = vec![
            candidate("same text", 80.0, SegmentationMode::Auto),
            candidate("same text", 80.0, SegmentationMode::SingleBlock),
        ];
        let chosen = ResultFusion::default().select(&candidates).unwrap();
        assert_eq!(chosen.mode, SegmentationMode::Auto);
    }

    #[test]
    fn empty_input_selects_nothing() {
        assert!(ResultFusion::default().select(&[]).is_none());
    }
}
