// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Tesseract recognition engine, driven through the `tesseract` command-line
// tool. The conditioned raster is piped in as PNG and word-level TSV is read
// back from stdout, which gives both the text and per-word confidences.

use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use ocrwerk_core::error::{OcrwerkError, Result};
use ocrwerk_core::types::{LanguageSet, ModelVariant, SegmentationMode};
use tracing::{debug, info, instrument, warn};

use super::engine::{EngineLauncher, EngineOptions, RecognitionEngine, RecognitionOutput};
use crate::image::processor::ImageProcessor;
use crate::image::raster::RasterImage;

const DEFAULT_BINARY: &str = "tesseract";

/// TSV row level for a single word.
const WORD_LEVEL: u32 = 5;

/// Starts [`TesseractEngine`]s after checking the binary and language packs.
#[derive(Debug, Clone)]
pub struct TesseractLauncher {
    binary: PathBuf,
}

impl TesseractLauncher {
    pub fn new() -> Self {
        Self {
            binary: PathBuf::from(DEFAULT_BINARY),
        }
    }

    pub fn with_binary(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Languages the installed tesseract reports via `--list-langs`.
    pub fn installed_languages(&self) -> Result<Vec<String>> {
        let output = Command::new(&self.binary).arg("--list-langs").output();
        match output {
            Ok(output) if output.status.success() => {
                // Older releases print the list on stderr.
                let mut listing = String::from_utf8_lossy(&output.stdout).into_owned();
                listing.push_str(&String::from_utf8_lossy(&output.stderr));
                Ok(parse_language_list(&listing))
            }
            Ok(output) => Err(OcrwerkError::EngineInitFailure(format!(
                "tesseract --list-langs failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            ))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(
                OcrwerkError::EngineInitFailure(format!(
                    "{} not found (install tesseract-ocr)",
                    self.binary.display()
                )),
            ),
            Err(e) => Err(OcrwerkError::EngineInitFailure(format!(
                "could not run {}: {e}",
                self.binary.display()
            ))),
        }
    }
}

impl Default for TesseractLauncher {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineLauncher for TesseractLauncher {
    #[instrument(skip_all, fields(binary = %self.binary.display(), languages = %options.languages))]
    fn launch(&self, options: &EngineOptions) -> Result<Box<dyn RecognitionEngine>> {
        let installed = self.installed_languages()?;
        if let Some(missing) = options
            .languages
            .iter()
            .find(|lang| !installed.iter().any(|have| have.as_str() == *lang))
        {
            return Err(OcrwerkError::EngineInitFailure(format!(
                "language pack '{missing}' is not installed"
            )));
        }

        info!(model = ?options.model, "Tesseract engine ready");
        Ok(Box::new(TesseractEngine {
            binary: self.binary.clone(),
            model: options.model,
            released: false,
        }))
    }
}

/// One tesseract "instance": a binary plus the model variant fixed at launch.
///
/// Each call is a separate process, so releasing only marks the engine
/// unusable.
#[derive(Debug)]
pub struct TesseractEngine {
    binary: PathBuf,
    model: ModelVariant,
    released: bool,
}

impl TesseractEngine {
    fn run(&self, png: &[u8], mode: SegmentationMode, languages: &LanguageSet) -> Result<String> {
        let failure = |detail: String| OcrwerkError::RecognitionFailure { mode, detail };

        let mut child = Command::new(&self.binary)
            .args(["stdin", "stdout"])
            .args(["--psm", &mode.psm().to_string()])
            .args(["--oem", &self.model.oem().to_string()])
            .args(["-l", &languages.joined()])
            .arg("tsv")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| failure(format!("could not spawn tesseract: {e}")))?;

        // Tesseract reads the whole image before writing anything, so writing
        // stdin to completion first cannot deadlock on a full stdout pipe.
        if let Some(mut stdin) = child.stdin.take() {
            if let Err(write_err) = stdin.write_all(png) {
                drop(stdin);
                // Usually a broken pipe: tesseract quit early. Reap it and
                // keep whatever it said on stderr.
                if let Err(kill_err) = child.kill() {
                    debug!(%kill_err, "tesseract already exited");
                }
                let stderr = child
                    .wait_with_output()
                    .map(|output| String::from_utf8_lossy(&output.stderr).trim().to_string())
                    .unwrap_or_default();
                return Err(failure(if stderr.is_empty() {
                    format!("could not send image to tesseract: {write_err}")
                } else {
                    format!("could not send image to tesseract: {write_err} ({stderr})")
                }));
            }
        }

        let output = child
            .wait_with_output()
            .map_err(|e| failure(format!("tesseract did not finish: {e}")))?;
        if !output.status.success() {
            return Err(failure(format!(
                "tesseract failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl RecognitionEngine for TesseractEngine {
    fn name(&self) -> &'static str {
        "tesseract"
    }

    #[instrument(skip_all, fields(mode = %mode, width = image.width(), height = image.height()))]
    fn recognize(
        &mut self,
        image: &RasterImage,
        mode: SegmentationMode,
        languages: &LanguageSet,
    ) -> Result<RecognitionOutput> {
        if self.released {
            return Err(OcrwerkError::RecognitionFailure {
                mode,
                detail: "engine already released".into(),
            });
        }

        let png = ImageProcessor::from_raster(image.clone())
            .to_png_bytes()
            .map_err(|e| OcrwerkError::RecognitionFailure {
                mode,
                detail: e.to_string(),
            })?;
        let tsv = self.run(&png, mode, languages)?;
        let output = parse_tsv(&tsv);
        debug!(
            chars = output.text.chars().count(),
            confidence = output.confidence,
            "Tesseract pass complete"
        );
        Ok(output)
    }

    fn release(&mut self) {
        self.released = true;
    }
}

/// Parse `tesseract --list-langs` output into language codes.
fn parse_language_list(listing: &str) -> Vec<String> {
    listing
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with("List of available languages"))
        .map(str::to_string)
        .collect()
}

/// Rebuild text and mean word confidence from tesseract's TSV output.
///
/// Words on the same (block, paragraph, line) are joined with spaces, lines
/// with `\n`, and blocks are separated by a blank line. Confidence is the
/// mean over words reporting a non-negative value; no words gives 0.
fn parse_tsv(tsv: &str) -> RecognitionOutput {
    let mut text = String::new();
    let mut last_line: Option<(u32, u32, u32, u32)> = None;
    let mut last_block: Option<(u32, u32)> = None;
    let mut conf_sum = 0.0f32;
    let mut conf_count = 0u32;

    for row in tsv.lines().skip(1) {
        let cols: Vec<&str> = row.splitn(12, '\t').collect();
        if cols.len() < 12 {
            continue;
        }
        let field = |i: usize| cols[i].trim().parse::<u32>().ok();
        let (Some(level), Some(page), Some(block), Some(par), Some(line)) =
            (field(0), field(1), field(2), field(3), field(4))
        else {
            warn!(row, "Skipping malformed TSV row");
            continue;
        };
        if level != WORD_LEVEL {
            continue;
        }
        let word = cols[11].trim();
        if word.is_empty() {
            continue;
        }

        let line_key = (page, block, par, line);
        if last_line != Some(line_key) {
            if last_line.is_some() {
                text.push('\n');
                if last_block != Some((page, block)) {
                    text.push('\n');
                }
            }
            last_line = Some(line_key);
            last_block = Some((page, block));
        } else {
            text.push(' ');
        }
        text.push_str(word);

        if let Ok(conf) = cols[10].trim().parse::<f32>() {
            if conf >= 0.0 {
                conf_sum += conf;
                conf_count += 1;
            }
        }
    }

    let confidence = if conf_count == 0 {
        0.0
    } else {
        conf_sum / conf_count as f32
    };
    RecognitionOutput::new(text, confidence)
}
