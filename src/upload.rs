//! Upload orchestration: rulebook PDFs in, persisted summary id out.
//!
//! Steps, each of which aborts the whole upload on failure:
//!
//! 1. Reject an empty file list, non-PDF content types, oversized files and
//!    a link that is not an http(s) URL.
//! 2. Extract text from each file in order, one at a time. A file whose
//!    trimmed text is shorter than `upload.min_text_chars` is rejected as
//!    image-only or scanned.
//! 3. Join the texts with [`DOCUMENT_SEPARATOR`].
//! 4. Generate the summary with the fixed style prompt.
//! 5. Derive the game title from the first `## ` heading, falling back to
//!    the first filename.
//! 6. Persist a single record, bounded by `upload.persist_timeout_secs`.
//!
//! Nothing is written until step 6, so a failure never leaves a partial
//! record behind.

use std::sync::Arc;
use std::time::Duration;

use rulesheet_core::auth::Identity;
use rulesheet_core::models::{new_summary_id, NewSummary};
use rulesheet_core::store::SummaryStore;
use rulesheet_core::title::derive_title;

use crate::config::Config;
use crate::extract::{extract_blocking, is_pdf, ExtractError, TextExtractor};
use crate::generate::Generator;
use crate::prompt::{user_message, DOCUMENT_SEPARATOR, STYLE_PROMPT};
use crate::render::is_web_link;

pub const INVALID_LINK_MESSAGE: &str = "The BoardGameGeek link must be an http:// or https:// URL.";

/// One uploaded rulebook.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn pdf(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            content_type: crate::extract::MIME_PDF.to_string(),
            bytes,
        }
    }
}

/// Everything needed to create one summary.
#[derive(Debug, Clone, Default)]
pub struct UploadRequest {
    pub files: Vec<UploadFile>,
    pub bgg_link: Option<String>,
    pub identity: Option<Identity>,
}

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("no file uploaded")]
    EmptyUpload,
    #[error("{filename} is not a PDF")]
    NotPdf { filename: String },
    #[error("{filename} exceeds {limit_mb}MB")]
    TooLarge { filename: String, limit_mb: u64 },
    #[error("link is not an http(s) URL: {link}")]
    InvalidLink { link: String },
    #[error("insufficient text extracted from {filename}")]
    InsufficientText { filename: String },
    #[error("failed to extract text from {filename}: {source}")]
    Extraction {
        filename: String,
        #[source]
        source: ExtractError,
    },
    #[error("summary generation failed: {0:#}")]
    Generation(anyhow::Error),
    #[error("failed to save summary: {0:#}")]
    Persistence(anyhow::Error),
    #[error("saving the summary timed out after {0:?}")]
    PersistTimeout(Duration),
}

impl UploadError {
    /// Input errors are the caller's to fix; the rest are upstream failures.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            UploadError::EmptyUpload
                | UploadError::NotPdf { .. }
                | UploadError::TooLarge { .. }
                | UploadError::InvalidLink { .. }
                | UploadError::InsufficientText { .. }
                | UploadError::Extraction { .. }
        )
    }

    /// Message shown to the user.
    pub fn user_message(&self) -> String {
        match self {
            UploadError::EmptyUpload => "No file uploaded.".to_string(),
            UploadError::NotPdf { .. } => "Only PDF files are allowed.".to_string(),
            UploadError::TooLarge { limit_mb, .. } => {
                format!("File too large. Maximum size is {}MB.", limit_mb)
            }
            UploadError::InvalidLink { .. } => INVALID_LINK_MESSAGE.to_string(),
            UploadError::InsufficientText { filename } | UploadError::Extraction { filename, .. } => {
                format!(
                    "Could not extract enough text from {}. The file may be image-based or corrupted.",
                    filename
                )
            }
            UploadError::Generation(_)
            | UploadError::Persistence(_)
            | UploadError::PersistTimeout(_) => {
                "Something went wrong while generating the summary. Please try again.".to_string()
            }
        }
    }
}

/// Limits the orchestrator enforces, taken from [`Config`].
#[derive(Debug, Clone, Copy)]
pub struct UploadLimits {
    pub max_file_mb: u64,
    pub min_text_chars: usize,
    pub persist_timeout: Duration,
}

impl UploadLimits {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_file_mb: config.server.max_upload_mb,
            min_text_chars: config.upload.min_text_chars,
            persist_timeout: Duration::from_secs(config.upload.persist_timeout_secs),
        }
    }

    fn max_file_bytes(&self) -> usize {
        (self.max_file_mb as usize).saturating_mul(1024 * 1024)
    }
}

/// The collaborators an upload runs against.
#[derive(Clone)]
pub struct Summarizer {
    pub store: Arc<dyn SummaryStore>,
    pub extractor: Arc<dyn TextExtractor>,
    pub generator: Arc<dyn Generator>,
    pub limits: UploadLimits,
}

impl Summarizer {
    /// Run the full upload and return the new record's id.
    pub async fn create_summary(&self, request: UploadRequest) -> Result<String, UploadError> {
        let UploadRequest {
            files,
            bgg_link,
            identity,
        } = request;

        if files.is_empty() {
            return Err(UploadError::EmptyUpload);
        }
        for file in &files {
            if !is_pdf(&file.content_type) {
                return Err(UploadError::NotPdf {
                    filename: file.filename.clone(),
                });
            }
            if file.bytes.len() > self.limits.max_file_bytes() {
                return Err(UploadError::TooLarge {
                    filename: file.filename.clone(),
                    limit_mb: self.limits.max_file_mb,
                });
            }
        }

        let bgg_link = bgg_link
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty());
        if let Some(ref link) = bgg_link {
            if !is_web_link(link) {
                return Err(UploadError::InvalidLink { link: link.clone() });
            }
        }

        let mut texts = Vec::with_capacity(files.len());
        let mut filenames = Vec::with_capacity(files.len());
        for file in files {
            let text = extract_blocking(self.extractor.clone(), file.bytes, file.content_type)
                .await
                .map_err(|source| UploadError::Extraction {
                    filename: file.filename.clone(),
                    source,
                })?;

            let chars = text.trim().chars().count();
            if chars < self.limits.min_text_chars {
                tracing::warn!(filename = %file.filename, chars, "too little text extracted");
                return Err(UploadError::InsufficientText {
                    filename: file.filename,
                });
            }
            tracing::info!(filename = %file.filename, chars, "extracted rulebook text");

            texts.push(text);
            filenames.push(file.filename);
        }

        let document = texts.join(DOCUMENT_SEPARATOR);
        let markdown = self
            .generator
            .generate(STYLE_PROMPT, &user_message(&document))
            .await
            .map_err(UploadError::Generation)?;

        let game_title = derive_title(&markdown, &filenames[0]);
        let summary = NewSummary {
            id: new_summary_id(),
            game_title,
            source_filenames: filenames,
            markdown,
            bgg_link,
            created_by: identity.as_ref().map(Identity::snapshot),
        };

        let timeout = self.limits.persist_timeout;
        let record = tokio::time::timeout(timeout, self.store.insert(summary))
            .await
            .map_err(|_| UploadError::PersistTimeout(timeout))?
            .map_err(UploadError::Persistence)?;

        tracing::info!(id = %record.id, title = %record.game_title, "summary saved");
        Ok(record.id)
    }
}
