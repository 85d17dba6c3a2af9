// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Folio.

use thiserror::Error;

/// Top-level error type for all Folio operations.
#[derive(Debug, Error)]
pub enum FolioError {
    // -- Rectification errors --
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("document region too small: {width:.1}x{height:.1}")]
    DegenerateGeometry { width: f64, height: f64 },

    #[error("perspective transform could not be solved for the selected corners")]
    TransformSingular,

    #[error("perspective warp produced an empty image ({width}x{height})")]
    TransformFailed { width: u32, height: u32 },

    #[error("internal fault: {0}")]
    Internal(String),

    // -- Image / recognition errors --
    #[error("image processing failed: {0}")]
    ImageError(String),

    #[error("OCR failed: {0}")]
    OcrError(String),

    #[error("text detection engine unavailable: {0}")]
    EngineUnavailable(String),

    // -- Storage / persistence --
    #[error("database error: {0}")]
    Database(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Coarse classification of a [`FolioError`], mirroring the failure kinds a
/// rectification caller is expected to branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    DegenerateGeometry,
    TransformSingular,
    TransformFailed,
    InternalFault,
    Recognition,
    Storage,
}

impl FolioError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::DegenerateGeometry { .. } => ErrorKind::DegenerateGeometry,
            Self::TransformSingular => ErrorKind::TransformSingular,
            Self::TransformFailed { .. } => ErrorKind::TransformFailed,
            Self::Internal(_) | Self::ImageError(_) => ErrorKind::InternalFault,
            Self::OcrError(_) | Self::EngineUnavailable(_) => ErrorKind::Recognition,
            Self::Database(_) | Self::Config(_) | Self::Io(_) | Self::Serialization(_) => {
                ErrorKind::Storage
            }
        }
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, FolioError>;
