use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Id/name pair used by the remote tracker for projects, statuses,
/// priorities, trackers and journal authors.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct NamedRef {
    pub id: u32,
    pub name: String,
}

/// A support ticket as returned by the remote tracker. List responses omit
/// most of the optional payload; the detail endpoint fills in description,
/// attachments and journals.
#[derive(Debug, Clone, Deserialize)]
pub struct Ticket {
    pub id: u64,
    pub subject: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub project: Option<NamedRef>,
    #[serde(default)]
    pub status: Option<NamedRef>,
    #[serde(default)]
    pub priority: Option<NamedRef>,
    #[serde(default)]
    pub tracker: Option<NamedRef>,
    #[serde(default)]
    pub created_on: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_on: Option<DateTime<Utc>>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default)]
    pub journals: Vec<Journal>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Attachment {
    pub id: u64,
    pub filename: String,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub content_url: Option<String>,
}

/// Append-only change/comment record attached to a ticket.
#[derive(Debug, Clone, Deserialize)]
pub struct Journal {
    pub id: u64,
    #[serde(default)]
    pub user: Option<NamedRef>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub created_on: Option<DateTime<Utc>>,
    #[serde(default)]
    pub details: Vec<JournalDetail>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JournalDetail {
    pub name: String,
    #[serde(default)]
    pub old_value: Option<String>,
    #[serde(default)]
    pub new_value: Option<String>,
}

/// A validated submission, ready to be posted. Field names are the client's;
/// the API layer maps them to the wire names the remote expects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTicket {
    pub project_id: u32,
    pub subject: String,
    pub description: String,
    pub module: Option<String>,
    pub transaction_number: Option<String>,
    pub operation_id: Option<String>,
    pub tracker_id: Option<u32>,
    pub priority_id: Option<u32>,
    pub attachments: Vec<AttachmentUpload>,
}

/// A local file staged for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentUpload {
    pub path: PathBuf,
    pub filename: String,
    pub content_type: String,
}
