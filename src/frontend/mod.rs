//! Presentation interface the controller renders through.
//!
//! One implementation per front-end; the controller never knows which one it drives.

pub mod tui;

use crate::cloudflare_api::{DnsRecord, Zone};
use crate::record_edit::RecordDraft;

/// Something the user asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserAction {
    ReloadDomains,
    SelectZone(usize),
    RefreshRecords,
    OpenRecordEditor,
    SubmitRecord(RecordDraft),
    CloseRecordEditor,
    /// Already confirmed by the user.
    DeleteRecord { record_id: String, name: String },
    OpenCredentialsEditor,
    SubmitCredentials { email: String, api_key: String },
    CloseCredentialsEditor,
    Quit,
}

/// What the record pane should show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordsView<'a> {
    Records(&'a [DnsRecord]),
    /// The zone has no records. Not an error.
    Empty,
    Loading,
    Failed(&'a str),
}

impl<'a> RecordsView<'a> {
    pub fn from_records(records: &'a [DnsRecord]) -> Self {
        if records.is_empty() {
            RecordsView::Empty
        } else {
            RecordsView::Records(records)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Info,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Progress,
    Failure,
}

pub trait Frontend {
    /// Raw input the front-end's input source produces.
    type Input: Send + 'static;

    /// Updates local widget state and maps the input to an action, if any.
    fn interpret(&mut self, input: Self::Input) -> Option<UserAction>;

    fn draw(&mut self) -> anyhow::Result<()>;

    /// Resets domains, records and record controls.
    fn clear(&mut self);

    fn set_status(&mut self, message: &str);

    fn show_domains(&mut self, zones: &[Zone], error: Option<&str>);

    fn show_records(&mut self, view: RecordsView<'_>);

    fn set_record_controls(&mut self, enabled: bool);

    fn open_credentials_editor(&mut self);

    /// Whether the credentials editor is still open.
    fn credentials_editor_active(&self) -> bool;

    fn credentials_editor_status(&mut self, message: &str, tone: Tone);

    fn close_credentials_editor(&mut self);

    fn open_record_editor(&mut self);

    /// Whether the record editor is still open.
    fn record_editor_active(&self) -> bool;

    fn record_editor_status(&mut self, message: &str, tone: Tone);

    fn close_record_editor(&mut self);

    fn show_message(&mut self, kind: MessageKind, title: &str, body: &str);
}
