// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scanning pipeline: raster conditioning, recognition engines, multi-pass
// orchestration, and candidate fusion.

pub mod engine;
pub mod enhance;
pub mod fusion;
pub mod orchestrator;
pub mod tesseract;

#[cfg(feature = "ocr")]
pub mod ocr;

pub use engine::{EngineLauncher, EngineOptions, EngineSession, RecognitionEngine, RecognitionOutput};
pub use enhance::PreprocessPipeline;
pub use fusion::ResultFusion;
pub use orchestrator::RecognitionOrchestrator;
pub use tesseract::{TesseractEngine, TesseractLauncher};

#[cfg(feature = "ocr")]
pub use ocr::{OcrsEngine, OcrsLauncher};
