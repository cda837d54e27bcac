// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages for the shell.
//
// Every technical error is mapped to plain English with a clear suggestion.
// Cancellation is not an error from the user's perspective and is never
// rendered as one.

use crate::error::OcrwerkError;

/// Severity of an error from the user's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Trying again may well work.
    Transient,
    /// User must do something (pick another file, install a language pack).
    ActionRequired,
    /// Cannot be fixed by retrying: wrong format, unreadable content.
    Permanent,
}

/// A human-readable error with plain English message and actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Short machine label, e.g. `no-result`.
    pub label: &'static str,
    /// Plain English summary (shown as a heading).
    pub message: String,
    /// What the user should try (shown as body text).
    pub suggestion: String,
    pub retriable: bool,
    pub severity: Severity,
}

/// Convert an error into something to show the user, or `None` for a
/// cancelled run.
pub fn user_facing_error(err: &OcrwerkError) -> Option<HumanError> {
    if err.is_cancelled() {
        None
    } else {
        Some(humanize_error(err))
    }
}

/// Convert an `OcrwerkError` into a `HumanError`.
pub fn humanize_error(err: &OcrwerkError) -> HumanError {
    let label = err.kind().as_str();
    match err {
        OcrwerkError::UnsupportedInput(detail) => HumanError {
            label,
            message: "This file isn't an image or a document we can read.".into(),
            suggestion: format!(
                "Choose a PNG, JPEG, or TIFF image, or a scanned PDF. ({detail})"
            ),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        OcrwerkError::RenderFailure(_) => HumanError {
            label,
            message: "We couldn't turn this document page into a picture.".into(),
            suggestion: "The PDF may be damaged or contain no scanned page. Try exporting the page as an image first.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },

        OcrwerkError::ImageError(_) => HumanError {
            label,
            message: "There's a problem with this image.".into(),
            suggestion: "The image may be damaged or in an unusual format. Try saving it as a PNG or JPEG first.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },

        OcrwerkError::EngineInitFailure(detail) => {
            if detail.contains("not found") || detail.contains("language") {
                HumanError {
                    label,
                    message: "The text recognition engine isn't installed correctly.".into(),
                    suggestion: format!(
                        "Install Tesseract with the Thai and English language data, then try again. ({detail})"
                    ),
                    retriable: false,
                    severity: Severity::ActionRequired,
                }
            } else {
                HumanError {
                    label,
                    message: "The text recognition engine didn't start.".into(),
                    suggestion: "Close other heavy programs and try again.".into(),
                    retriable: true,
                    severity: Severity::Transient,
                }
            }
        }

        OcrwerkError::RecognitionFailure { mode, .. } => HumanError {
            label,
            message: "Text recognition stumbled on this page.".into(),
            suggestion: format!("Try again; if it keeps failing, try a clearer scan. (Mode: {mode})"),
            retriable: true,
            severity: Severity::Transient,
        },

        OcrwerkError::NoResult => HumanError {
            label,
            message: "We couldn't find any text in this image.".into(),
            suggestion: "Make sure the page is in focus and well lit, or try the enhanced profile for faint scans.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        OcrwerkError::Cancelled => HumanError {
            label,
            message: "Processing was stopped.".into(),
            suggestion: "Start again whenever you're ready.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        OcrwerkError::InvalidConfig(detail) => HumanError {
            label,
            message: "The settings file has a mistake in it.".into(),
            suggestion: format!("Fix the setting or delete the file to use the defaults. ({detail})"),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        OcrwerkError::Io(io_err) => match io_err.kind() {
            std::io::ErrorKind::NotFound => HumanError {
                label,
                message: "We couldn't find that file.".into(),
                suggestion: "Check the file name and location, then try again.".into(),
                retriable: false,
                severity: Severity::ActionRequired,
            },
            std::io::ErrorKind::PermissionDenied => HumanError {
                label,
                message: "We aren't allowed to open that file.".into(),
                suggestion: "Check the file's permissions, or copy it somewhere you own.".into(),
                retriable: false,
                severity: Severity::ActionRequired,
            },
            _ => HumanError {
                label,
                message: "Reading or writing a file failed.".into(),
                suggestion: "Try again. If the disk is full, free up some space.".into(),
                retriable: true,
                severity: Severity::Transient,
            },
        },

        OcrwerkError::Serialization(_) => HumanError {
            label,
            message: "The settings file couldn't be read.".into(),
            suggestion: "The file must be valid JSON. Delete it to go back to the defaults.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },
    }
}
