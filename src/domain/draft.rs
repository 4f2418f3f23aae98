use std::fs;
use std::path::PathBuf;

use crate::domain::reference::ReferenceData;
use crate::domain::ticket::{AttachmentUpload, NewTicket};
use crate::error::{AppError, AppResult, FieldErrors};

pub const MIN_SUBJECT_CHARS: usize = 3;
pub const MIN_DESCRIPTION_CHARS: usize = 10;

/// Submission lifecycle of a draft. One submission may be in flight per
/// draft instance; `Validating` only exists for the duration of a
/// `validate` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DraftState {
    #[default]
    Idle,
    Validating,
    Submitting,
}

/// A file staged on the draft. Image files carry a releasable preview URL;
/// other content types never do.
#[derive(Debug, Clone)]
pub struct AttachedFile {
    pub path: PathBuf,
    pub filename: String,
    pub content_type: String,
    preview_url: Option<String>,
}

impl AttachedFile {
    fn from_path(path: PathBuf) -> AppResult<Self> {
        fs::metadata(&path)?;
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| {
                AppError::Configuration(format!("'{}' is not a file path", path.display()))
            })?;
        let content_type = mime_guess::from_path(&path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        let preview_url = content_type
            .starts_with("image/")
            .then(|| format!("file://{}", path.display()));

        Ok(Self {
            path,
            filename,
            content_type,
            preview_url,
        })
    }

    pub fn is_image(&self) -> bool {
        self.preview_url.is_some()
    }

    pub fn preview_url(&self) -> Option<&str> {
        self.preview_url.as_deref()
    }

    fn release_preview(&mut self) {
        self.preview_url = None;
    }
}

/// Local, ephemeral form state: raw field input, staged attachments and the
/// submission state machine. Field-keyed validation errors are produced by
/// `validate`; the server remains the authority and may still reject.
#[derive(Debug, Default)]
pub struct TicketDraft {
    pub project: String,
    pub subject: String,
    pub description: String,
    pub module: String,
    pub transaction_number: String,
    pub operation_id: String,
    pub tracker_id: Option<u32>,
    pub priority_id: Option<u32>,
    attachments: Vec<AttachedFile>,
    state: DraftState,
}

impl TicketDraft {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> DraftState {
        self.state
    }

    pub fn attachments(&self) -> &[AttachedFile] {
        &self.attachments
    }

    /// Stages a local file. The file must exist; its content type is guessed
    /// from the extension.
    pub fn attach(&mut self, path: PathBuf) -> AppResult<()> {
        self.attachments.push(AttachedFile::from_path(path)?);
        Ok(())
    }

    /// Removes a staged file, releasing its preview.
    pub fn remove_attachment(&mut self, index: usize) -> Option<AttachedFile> {
        if index >= self.attachments.len() {
            return None;
        }
        let mut removed = self.attachments.remove(index);
        removed.release_preview();
        Some(removed)
    }

    /// Pre-flight validation. Returns the submission payload, or one error
    /// per failing field keyed by its wire name.
    pub fn validate(&mut self, reference: &ReferenceData) -> Result<NewTicket, FieldErrors> {
        self.state = DraftState::Validating;
        let mut errors = FieldErrors::new();

        let project_id = if self.project.trim().is_empty() {
            errors.insert("project_id", "a project must be selected");
            None
        } else {
            match reference.resolve_project(&self.project) {
                Some(project) => Some(project.id),
                None => {
                    errors.insert(
                        "project_id",
                        format!("'{}' does not match any known project", self.project.trim()),
                    );
                    None
                }
            }
        };

        if self.subject.chars().count() < MIN_SUBJECT_CHARS {
            errors.insert(
                "subject",
                format!("the subject must be at least {MIN_SUBJECT_CHARS} characters"),
            );
        }
        if self.description.chars().count() < MIN_DESCRIPTION_CHARS {
            errors.insert(
                "description",
                format!("the description must be at least {MIN_DESCRIPTION_CHARS} characters"),
            );
        }

        self.state = DraftState::Idle;
        match project_id {
            Some(project_id) if errors.is_empty() => Ok(NewTicket {
                project_id,
                subject: self.subject.clone(),
                description: self.description.clone(),
                module: none_if_empty(&self.module),
                transaction_number: none_if_empty(&self.transaction_number),
                operation_id: none_if_empty(&self.operation_id),
                tracker_id: self.tracker_id,
                priority_id: self.priority_id,
                attachments: self
                    .attachments
                    .iter()
                    .map(|file| AttachmentUpload {
                        path: file.path.clone(),
                        filename: file.filename.clone(),
                        content_type: file.content_type.clone(),
                    })
                    .collect(),
            }),
            _ => Err(errors),
        }
    }

    /// Marks a submission as in flight. Returns false when one already is.
    pub fn begin_submission(&mut self) -> bool {
        if self.state == DraftState::Submitting {
            return false;
        }
        self.state = DraftState::Submitting;
        true
    }

    /// Returns to idle after a failed submission; the input is kept so the
    /// user can correct and resubmit.
    pub fn finish_submission(&mut self) {
        self.state = DraftState::Idle;
    }

    /// Clears the draft after a successful submission. The classification
    /// fields (project, tracker, priority) keep their last values; staged
    /// files and their previews are released.
    pub fn reset_after_submit(&mut self) {
        self.subject.clear();
        self.description.clear();
        self.module.clear();
        self.transaction_number.clear();
        self.operation_id.clear();
        for file in &mut self.attachments {
            file.release_preview();
        }
        self.attachments.clear();
        self.state = DraftState::Idle;
    }
}

fn none_if_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
