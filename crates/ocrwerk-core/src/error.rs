// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for OCR Werk.

use thiserror::Error;

use crate::types::SegmentationMode;

/// Top-level error type for all OCR Werk operations.
#[derive(Debug, Error)]
pub enum OcrwerkError {
    // -- Input errors --
    #[error("unsupported input: {0}")]
    UnsupportedInput(String),

    #[error("page rendering failed: {0}")]
    RenderFailure(String),

    #[error("image processing failed: {0}")]
    ImageError(String),

    // -- Recognition errors --
    #[error("recognition engine failed to start: {0}")]
    EngineInitFailure(String),

    /// A single segmentation pass failed. Recovered locally by the
    /// orchestrator; only surfaces when an engine is driven directly.
    #[error("recognition failed in {mode} mode: {detail}")]
    RecognitionFailure {
        mode: SegmentationMode,
        detail: String,
    },

    #[error("no text was recognised in any segmentation mode")]
    NoResult,

    #[error("processing was cancelled")]
    Cancelled,

    // -- Configuration / persistence --
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Stable, machine-readable label for an [`OcrwerkError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    UnsupportedInput,
    RenderFailure,
    ImageError,
    EngineInitFailure,
    RecognitionFailure,
    NoResult,
    Cancelled,
    InvalidConfig,
    Io,
    Serialization,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UnsupportedInput => "unsupported-input",
            Self::RenderFailure => "render-failure",
            Self::ImageError => "image-error",
            Self::EngineInitFailure => "engine-init-failure",
            Self::RecognitionFailure => "recognition-failure",
            Self::NoResult => "no-result",
            Self::Cancelled => "cancelled",
            Self::InvalidConfig => "invalid-config",
            Self::Io => "io",
            Self::Serialization => "serialization",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl OcrwerkError {
    /// The label under which this failure is reported to the shell.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnsupportedInput(_) => ErrorKind::UnsupportedInput,
            Self::RenderFailure(_) => ErrorKind::RenderFailure,
            Self::ImageError(_) => ErrorKind::ImageError,
            Self::EngineInitFailure(_) => ErrorKind::EngineInitFailure,
            Self::RecognitionFailure { .. } => ErrorKind::RecognitionFailure,
            Self::NoResult => ErrorKind::NoResult,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::InvalidConfig(_) => ErrorKind::InvalidConfig,
            Self::Io(_) => ErrorKind::Io,
            Self::Serialization(_) => ErrorKind::Serialization,
        }
    }

    /// Cancellation is an outcome, not a failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, OcrwerkError>;
