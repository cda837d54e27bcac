// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Text sanitizer. Cleans raw recognition output of control characters, noise
// symbols, whitespace, barcode and border-art lines, known misreads, and
// repeated punctuation.

use ocrwerk_core::config::{Correction, NoiseFilterConfig, SanitizerConfig};
use ocrwerk_core::error::{OcrwerkError, Result};
use ocrwerk_core::types::TargetScript;
use regex::Regex;
use tracing::{debug, instrument};

/// Upper bound on repeated passes while waiting for the text to settle.
const MAX_PASSES: usize = 6;

/// Symbols that rarely appear in real running text but often in misreads of
/// rules, stamps, and speckle.
const NOISE_SYMBOLS: [char; 8] = ['&', '[', ']', '|', '#', '»', '<', '>'];

/// Punctuation tolerated by the non-word rule.
const WORD_PUNCTUATION: [char; 7] = ['-', '.', ',', ':', '/', '(', ')'];

fn is_noise_symbol(c: char) -> bool {
    NOISE_SYMBOLS.contains(&c)
}

/// ASCII rule characters plus the box-drawing block up to `╬`.
fn is_rule_char(c: char) -> bool {
    matches!(c, '|' | '_' | '-' | '=') || ('\u{2500}'..='\u{256C}').contains(&c)
}

/// Compiled patterns used by every pass.
#[derive(Debug, Clone)]
struct Patterns {
    control: Regex,
    tabs: Regex,
    spaces: Regex,
    whitespace: Regex,
    dots: Regex,
    commas: Regex,
    barcode: Regex,
}

impl Patterns {
    fn compile(noise: &NoiseFilterConfig) -> Result<Self> {
        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|err| {
                OcrwerkError::InvalidConfig(format!("sanitizer pattern {pattern:?}: {err}"))
            })
        };
        Ok(Self {
            control: compile(r"[\x00-\x08\x0B\x0C\x0E-\x1F\x7F]")?,
            tabs: compile(r"[\t\r]+")?,
            spaces: compile(r" {2,}")?,
            whitespace: compile(r"\s+")?,
            dots: compile(r"\.{2,}")?,
            commas: compile(r",{2,}")?,
            barcode: compile(&format!("^[0-9]{{{},}}$", noise.barcode_min_digits.max(1)))?,
        })
    }
}

/// Per-line character tallies used by the ratio rules.
struct LineStats {
    len: usize,
    symbols: usize,
    normal: usize,
    rules: usize,
    non_word: usize,
    has_letter: bool,
}

/// Cleans recognition output. `sanitize` is idempotent.
#[derive(Debug, Clone)]
pub struct TextSanitizer {
    noise: NoiseFilterConfig,
    corrections: Vec<Correction>,
    script: TargetScript,
    patterns: Patterns,
}

impl TextSanitizer {
    pub fn new(config: &SanitizerConfig, script: TargetScript) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            noise: config.noise,
            corrections: config.corrections.clone(),
            patterns: Patterns::compile(&config.noise)?,
            script,
        })
    }

    /// Run passes until the text stops changing.
    ///
    /// Collapsing punctuation can tip a line over one of the ratio rules, so
    /// a single pass is not always a fixed point.
    #[instrument(skip_all, fields(raw_chars = raw.chars().count()))]
    pub fn sanitize(&self, raw: &str) -> String {
        let mut current = self.sanitize_pass(raw);
        for pass in 1..MAX_PASSES {
            let next = self.sanitize_pass(&current);
            if next == current {
                debug!(passes = pass, chars = current.chars().count(), "Text settled");
                break;
            }
            current = next;
        }
        current
    }

    /// One pass of the eight cleaning steps, in order.
    pub fn sanitize_pass(&self, raw: &str) -> String {
        let p = &self.patterns;

        // 1. control characters
        let text = p.control.replace_all(raw, "");
        // 2. noise symbols on symbol-heavy lines
        let text = self.scrub_noise_lines(&text);
        // 3. tabs, carriage returns, space runs
        let text = p.tabs.replace_all(&text, " ");
        let text = p.spaces.replace_all(&text, " ");
        // 4. blank-line runs
        let text = collapse_blank_runs(&text);
        // 5. per-line and whole-text trim
        let text = trim_lines(&text);
        // 6. abnormal lines
        let text = self.drop_abnormal_lines(&text);
        // 7. known misreads
        let text = self.apply_corrections(text);
        // 8. repeated punctuation, final tidy
        let text = p.dots.replace_all(&text, ".");
        let text = p.commas.replace_all(&text, ",");
        let text = p.spaces.replace_all(&text, " ");
        trim_lines(&collapse_blank_runs(&text))
    }

    fn is_normal(&self, c: char) -> bool {
        c.is_ascii_alphanumeric() || self.script.contains(c)
    }

    fn line_stats(&self, trimmed: &str) -> LineStats {
        let mut stats = LineStats {
            len: 0,
            symbols: 0,
            normal: 0,
            rules: 0,
            non_word: 0,
            has_letter: false,
        };
        for c in trimmed.chars() {
            stats.len += 1;
            if is_noise_symbol(c) {
                stats.symbols += 1;
            }
            if self.is_normal(c) {
                stats.normal += 1;
            }
            if is_rule_char(c) {
                stats.rules += 1;
            }
            if c.is_ascii_alphabetic() || self.script.contains(c) {
                stats.has_letter = true;
            }
            let word_like = c.is_ascii_alphanumeric()
                || c == '_'
                || c.is_whitespace()
                || self.script.contains(c)
                || WORD_PUNCTUATION.contains(&c);
            if !word_like {
                stats.non_word += 1;
            }
        }
        stats
    }

    fn scrub_noise_lines(&self, text: &str) -> String {
        let lines: Vec<String> = text
            .split('\n')
            .map(|line| {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    return line.to_string();
                }
                let stats = self.line_stats(trimmed);
                let len = stats.len as f32;
                if stats.symbols as f32 / len > self.noise.scrub_symbol_ratio
                    && (stats.normal as f32 / len) < self.noise.scrub_alnum_ratio
                {
                    let spaced: String = line
                        .chars()
                        .map(|c| if is_noise_symbol(c) { ' ' } else { c })
                        .collect();
                    self.patterns
                        .whitespace
                        .replace_all(&spaced, " ")
                        .trim()
                        .to_string()
                } else {
                    line.to_string()
                }
            })
            .collect();
        lines.join("\n")
    }

    /// Whether a non-blank line should be dropped, with the rule that fired.
    fn abnormal_reason(&self, trimmed: &str) -> Option<&'static str> {
        if self.patterns.barcode.is_match(trimmed) {
            return Some("barcode");
        }

        let stats = self.line_stats(trimmed);
        let len = stats.len as f32;
        let noise = &self.noise;

        if stats.rules as f32 / len > noise.rule_char_ratio && stats.normal == 0 {
            return Some("border art");
        }
        if stats.non_word as f32 / len > noise.non_word_ratio
            && stats.len < noise.non_word_max_len
            && !stats.has_letter
        {
            return Some("non-word fragment");
        }
        if trimmed.chars().all(|c| c.is_whitespace() || is_rule_char(c)) {
            return Some("rule line");
        }
        if stats.symbols as f32 / len > noise.drop_symbol_ratio && stats.normal < noise.drop_min_alnum
        {
            return Some("symbol noise");
        }
        None
    }

    fn drop_abnormal_lines(&self, text: &str) -> String {
        let kept: Vec<&str> = text
            .split('\n')
            .filter(|line| {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    return true;
                }
                match self.abnormal_reason(trimmed) {
                    Some(reason) => {
                        debug!(line = trimmed, reason, "Dropping abnormal line");
                        false
                    }
                    None => true,
                }
            })
            .collect();
        kept.join("\n")
    }

    fn apply_corrections(&self, text: String) -> String {
        self.corrections
            .iter()
            .filter(|fix| !fix.from.is_empty())
            .fold(text, |acc, fix| {
                if acc.contains(&fix.from) {
                    acc.replace(&fix.from, &fix.to)
                } else {
                    acc
                }
            })
    }
}

/// Reduce every run of blank (whitespace-only) lines to one empty line.
fn collapse_blank_runs(text: &str) -> String {
    let mut out: Vec<&str> = Vec::new();
    let mut previous_blank = false;
    for line in text.split('\n') {
        let blank = line.trim().is_empty();
        if blank && previous_blank {
            continue;
        }
        out.push(if blank { "" } else { line });
        previous_blank = blank;
    }
    out.join("\n")
}

/// Trim each line, then drop leading and trailing blank lines.
fn trim_lines(text: &str) -> String {
    let lines: Vec<&str> = text.split('\n').map(str::trim).collect();
    lines.join("\n").trim_matches('\n').to_string()
}
