// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages.
//
// Every technical error is mapped to plain English with a clear suggestion.
// Nothing is retried internally; `retriable` tells the caller whether asking
// the user to try again (e.g. re-pick corners) makes sense.

use crate::error::FolioError;

/// Severity of an error from the user's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Temporary condition; trying again may succeed.
    Transient,
    /// User must do something (re-pick corners, retake the photo).
    ActionRequired,
    /// Cannot be fixed by retrying or user action.
    Permanent,
}

/// A human-readable error with plain English message and actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Plain English summary (shown as a heading).
    pub message: String,
    /// What the user should try (shown as body text).
    pub suggestion: String,
    /// Whether offering a retry makes sense.
    pub retriable: bool,
    /// Severity level (drives icon/colour in UI).
    pub severity: Severity,
}

/// Convert a `FolioError` into a `HumanError`.
pub fn humanize_error(err: &FolioError) -> HumanError {
    match err {
        // -- Rectification --
        FolioError::InvalidInput(_) => HumanError {
            message: "The document corners weren't picked correctly.".into(),
            suggestion: "Place all four corner markers on the corners of the page, then try again."
                .into(),
            retriable: true,
            severity: Severity::ActionRequired,
        },

        FolioError::DegenerateGeometry { .. } => HumanError {
            message: "The selected area is too small.".into(),
            suggestion: "Drag the corner markers out to the edges of the page and try again."
                .into(),
            retriable: true,
            severity: Severity::ActionRequired,
        },

        FolioError::TransformSingular => HumanError {
            message: "We couldn't straighten the page with those corners.".into(),
            suggestion: "Make sure no three corners lie on one line, then try again.".into(),
            retriable: true,
            severity: Severity::ActionRequired,
        },

        FolioError::TransformFailed { .. } => HumanError {
            message: "Straightening the page produced an empty image.".into(),
            suggestion: "Re-pick the corners, or retake the photo with the whole page visible."
                .into(),
            retriable: true,
            severity: Severity::ActionRequired,
        },

        FolioError::Internal(detail) => HumanError {
            message: "Something went wrong while processing the photo.".into(),
            suggestion: format!("Try again. If it keeps happening, retake the photo. ({detail})"),
            retriable: true,
            severity: Severity::Transient,
        },

        // -- Image / recognition --
        FolioError::ImageError(_) => HumanError {
            message: "We couldn't read this image.".into(),
            suggestion: "The file may be damaged or in an unusual format. Try a JPEG or PNG photo."
                .into(),
            retriable: false,
            severity: Severity::Permanent,
        },

        FolioError::OcrError(_) => HumanError {
            message: "Text recognition failed.".into(),
            suggestion: "Try again with a sharper, well-lit photo.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        FolioError::EngineUnavailable(detail) => {
            if detail.contains("not initialized") || detail.contains("not found") {
                HumanError {
                    message: "Text recognition isn't set up yet.".into(),
                    suggestion: "Install the recognition models, then try again.".into(),
                    retriable: false,
                    severity: Severity::ActionRequired,
                }
            } else {
                HumanError {
                    message: "Text recognition couldn't start.".into(),
                    suggestion: format!("Restart the app and try again. ({detail})"),
                    retriable: true,
                    severity: Severity::Transient,
                }
            }
        }

        // -- Storage --
        FolioError::Database(_) => HumanError {
            message: "Your scan history couldn't be saved.".into(),
            suggestion: "Check that the device has free storage space.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        FolioError::Config(detail) => HumanError {
            message: "The settings file has an invalid value.".into(),
            suggestion: format!("Fix or delete the settings file to restore defaults. ({detail})"),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        FolioError::Io(_) => HumanError {
            message: "A file couldn't be read or written.".into(),
            suggestion: "Check the file path and that the device has free storage space.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        FolioError::Serialization(_) => HumanError {
            message: "A data file is damaged.".into(),
            suggestion: "Delete the damaged file and try again.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },
    }
}
