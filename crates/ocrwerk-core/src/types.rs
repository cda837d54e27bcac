// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for OCR Werk.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for one pipeline run (one input image or page).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Page layout assumption passed to the recognition engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SegmentationMode {
    /// Fully automatic page segmentation.
    Auto,
    /// A single column of text of variable sizes.
    SingleColumn,
    /// A single uniform block of text.
    SingleBlock,
    /// As much text as possible, in no particular order.
    SparseText,
}

impl SegmentationMode {
    /// Tesseract `--psm` value for this mode.
    pub fn psm(&self) -> u8 {
        match self {
            Self::Auto => 3,
            Self::SingleColumn => 4,
            Self::SingleBlock => 6,
            Self::SparseText => 11,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::SingleColumn => "single-column",
            Self::SingleBlock => "single-block",
            Self::SparseText => "sparse-text",
        }
    }
}

impl std::fmt::Display for SegmentationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Recognition model variant, fixed when the engine is started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModelVariant {
    /// Legacy pattern-matching recogniser only.
    Legacy,
    /// Neural (LSTM) recogniser only. Most accurate for Thai.
    LstmOnly,
    /// Both recognisers combined.
    Combined,
    /// Whatever the engine build defaults to.
    Default,
}

impl ModelVariant {
    /// Tesseract `--oem` value.
    pub fn oem(&self) -> u8 {
        match self {
            Self::Legacy => 0,
            Self::LstmOnly => 1,
            Self::Combined => 2,
            Self::Default => 3,
        }
    }
}

/// Ordered set of recognition languages (e.g. `tha`, `eng`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageSet(pub Vec<String>);

impl LanguageSet {
    pub fn new<I, S>(languages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen: Vec<String> = Vec::new();
        for lang in languages {
            let lang = lang.into();
            if !lang.is_empty() && !seen.contains(&lang) {
                seen.push(lang);
            }
        }
        Self(seen)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Tesseract `-l` argument form: `tha+eng`.
    pub fn joined(&self) -> String {
        self.0.join("+")
    }
}

impl Default for LanguageSet {
    fn default() -> Self {
        Self::new(["tha", "eng"])
    }
}

impl std::fmt::Display for LanguageSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.joined())
    }
}

/// Where a raw input came from. Drives profile selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    /// An encoded raster image (PNG, JPEG, TIFF, ...).
    Image,
    /// A paginated document whose page is rendered to a raster first.
    RenderedPage,
}

/// Named preprocessing profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Profile {
    /// Contrast/brightness, optional grayscale, optional sharpen.
    Standard,
    /// Full stack: adds denoise, binarization, and dilation.
    Enhanced,
}

/// One recognition pass's output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognitionCandidate {
    pub text: String,
    /// Engine confidence in `[0, 100]`.
    pub confidence: f32,
    pub mode: SegmentationMode,
}

impl RecognitionCandidate {
    pub fn new(text: impl Into<String>, confidence: f32, mode: SegmentationMode) -> Self {
        Self {
            text: text.into(),
            confidence: if confidence.is_finite() {
                confidence.clamp(0.0, 100.0)
            } else {
                0.0
            },
            mode,
        }
    }
}

/// A progress/status event emitted while processing.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressUpdate {
    /// Overall completion, `0..=100`.
    pub percent: u8,
    pub label: String,
}

/// Inclusive range of characters belonging to a script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharRange {
    pub first: char,
    pub last: char,
}

/// The writing system(s) favoured by scoring and noise filtering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetScript {
    pub name: String,
    pub ranges: Vec<CharRange>,
}

impl TargetScript {
    /// Thai, `ก` (U+0E01) through `๙` (U+0E59).
    pub fn thai() -> Self {
        Self {
            name: "thai".into(),
            ranges: vec![CharRange {
                first: '\u{0E01}',
                last: '\u{0E59}',
            }],
        }
    }

    pub fn contains(&self, c: char) -> bool {
        self.ranges.iter().any(|r| (r.first..=r.last).contains(&c))
    }
}

impl Default for TargetScript {
    fn default() -> Self {
        Self::thai()
    }
}
