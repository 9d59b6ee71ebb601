//! Widget state of the terminal UI and the key bindings that change it.

use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::cloudflare_api::{DnsRecord, RecordType, Zone};
use crate::frontend::{MessageKind, RecordsView, Tone, UserAction};
use crate::record_edit::RecordDraft;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pane {
    Domains,
    Records,
}

/// Owned copy of [`RecordsView`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordsPane {
    /// No domain selected yet.
    Idle,
    Loading,
    Empty,
    Failed(String),
    Records(Vec<DnsRecord>),
}

impl RecordsPane {
    fn from_view(view: RecordsView<'_>) -> Self {
        match view {
            RecordsView::Records(records) => RecordsPane::Records(records.to_vec()),
            RecordsView::Empty => RecordsPane::Empty,
            RecordsView::Loading => RecordsPane::Loading,
            RecordsView::Failed(message) => RecordsPane::Failed(message.to_string()),
        }
    }

    pub fn records(&self) -> &[DnsRecord] {
        match self {
            RecordsPane::Records(records) => records,
            _ => &[],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CredentialsForm {
    pub email: String,
    pub api_key: String,
    /// 0 = email, 1 = API key.
    pub focus: usize,
    pub status: Option<(String, Tone)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordField {
    Type,
    Name,
    Content,
    Proxied,
}

impl RecordField {
    const ORDER: [RecordField; 4] = [
        RecordField::Type,
        RecordField::Name,
        RecordField::Content,
        RecordField::Proxied,
    ];

    fn step(self, forward: bool) -> Self {
        let len = Self::ORDER.len();
        let index = Self::ORDER.iter().position(|f| *f == self).unwrap_or(0);
        let next = if forward { (index + 1) % len } else { (index + len - 1) % len };
        Self::ORDER[next]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordForm {
    pub type_index: usize,
    pub name: String,
    pub content: String,
    pub proxied: bool,
    pub focus: RecordField,
    pub status: Option<(String, Tone)>,
}

impl Default for RecordForm {
    fn default() -> Self {
        RecordForm {
            type_index: 0,
            name: String::new(),
            content: String::new(),
            proxied: false,
            focus: RecordField::Type,
            status: None,
        }
    }
}

impl RecordForm {
    pub fn record_type(&self) -> RecordType {
        RecordType::EDITABLE[self.type_index % RecordType::EDITABLE.len()].clone()
    }

    fn cycle_type(&mut self, forward: bool) {
        let len = RecordType::EDITABLE.len();
        self.type_index = if forward {
            (self.type_index + 1) % len
        } else {
            (self.type_index + len - 1) % len
        };
        if !self.record_type().is_proxiable() {
            self.proxied = false;
        }
    }

    fn draft(&self) -> RecordDraft {
        RecordDraft::new(self.record_type(), &self.name, &self.content, self.proxied)
    }
}

/// The modal editor, at most one at a time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Editor {
    Credentials(CredentialsForm),
    Record(RecordForm),
    ConfirmDelete { record_id: String, name: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub kind: MessageKind,
    pub title: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TuiState {
    pub status: String,
    pub zones: Vec<Zone>,
    pub domain_error: Option<String>,
    pub selected_zone: usize,
    pub records: RecordsPane,
    pub selected_record: usize,
    pub focus: Pane,
    pub record_controls: bool,
    pub editor: Option<Editor>,
    /// Shown above the editor until dismissed.
    pub message: Option<Message>,
}

impl Default for TuiState {
    fn default() -> Self {
        TuiState {
            status: String::new(),
            zones: Vec::new(),
            domain_error: None,
            selected_zone: 0,
            records: RecordsPane::Idle,
            selected_record: 0,
            focus: Pane::Domains,
            record_controls: false,
            editor: None,
            message: None,
        }
    }
}

impl TuiState {
    pub fn clear(&mut self) {
        self.zones.clear();
        self.domain_error = None;
        self.selected_zone = 0;
        self.records = RecordsPane::Idle;
        self.selected_record = 0;
        self.focus = Pane::Domains;
        self.record_controls = false;
    }

    pub fn show_domains(&mut self, zones: &[Zone], error: Option<&str>) {
        self.zones = zones.to_vec();
        self.domain_error = error.map(str::to_string);
        self.selected_zone = self.selected_zone.min(self.zones.len().saturating_sub(1));
    }

    pub fn show_records(&mut self, view: RecordsView<'_>) {
        self.records = RecordsPane::from_view(view);
        self.selected_record = self
            .selected_record
            .min(self.records.records().len().saturating_sub(1));
    }

    pub fn set_record_controls(&mut self, enabled: bool) {
        self.record_controls = enabled;
        if !enabled {
            self.records = RecordsPane::Idle;
            self.focus = Pane::Domains;
        }
    }

    pub fn open_credentials_editor(&mut self) {
        self.editor = Some(Editor::Credentials(CredentialsForm::default()));
    }

    pub fn credentials_editor_active(&self) -> bool {
        matches!(self.editor, Some(Editor::Credentials(_)))
    }

    pub fn credentials_editor_status(&mut self, message: &str, tone: Tone) {
        if let Some(Editor::Credentials(form)) = &mut self.editor {
            form.status = Some((message.to_string(), tone));
        }
    }

    pub fn close_credentials_editor(&mut self) {
        if self.credentials_editor_active() {
            self.editor = None;
        }
    }

    pub fn open_record_editor(&mut self) {
        self.editor = Some(Editor::Record(RecordForm::default()));
    }

    pub fn record_editor_active(&self) -> bool {
        matches!(self.editor, Some(Editor::Record(_)))
    }

    pub fn record_editor_status(&mut self, message: &str, tone: Tone) {
        if let Some(Editor::Record(form)) = &mut self.editor {
            form.status = Some((message.to_string(), tone));
        }
    }

    pub fn close_record_editor(&mut self) {
        if self.record_editor_active() {
            self.editor = None;
        }
    }

    pub fn show_message(&mut self, kind: MessageKind, title: &str, body: &str) {
        self.message = Some(Message {
            kind,
            title: title.to_string(),
            body: body.to_string(),
        });
    }

    pub fn selected_record(&self) -> Option<&DnsRecord> {
        self.records.records().get(self.selected_record)
    }

    /// Applies a terminal event to the widgets and returns the action it triggers.
    pub fn handle_event(&mut self, event: Event) -> Option<UserAction> {
        match event {
            Event::Key(key) => self.handle_key(key),
            _ => None,
        }
    }

    fn handle_key(&mut self, key: KeyEvent) -> Option<UserAction> {
        // Release and repeat events would double every keystroke on Windows.
        if key.kind != KeyEventKind::Press {
            return None;
        }

        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return Some(UserAction::Quit);
        }

        if self.message.is_some() {
            if matches!(key.code, KeyCode::Enter | KeyCode::Esc | KeyCode::Char(' ')) {
                self.message = None;
            }
            return None;
        }

        match self.editor.take() {
            Some(Editor::Credentials(mut form)) => {
                let action = credentials_key(&mut form, key);
                self.editor = Some(Editor::Credentials(form));
                action
            }
            Some(Editor::Record(mut form)) => {
                let action = record_key(&mut form, key);
                self.editor = Some(Editor::Record(form));
                action
            }
            Some(Editor::ConfirmDelete { record_id, name }) => match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') => Some(UserAction::DeleteRecord { record_id, name }),
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => None,
                _ => {
                    self.editor = Some(Editor::ConfirmDelete { record_id, name });
                    None
                }
            },
            None => self.main_key(key),
        }
    }

    fn main_key(&mut self, key: KeyEvent) -> Option<UserAction> {
        match key.code {
            KeyCode::Char('q') => Some(UserAction::Quit),
            KeyCode::Tab | KeyCode::BackTab => {
                self.focus = match self.focus {
                    Pane::Domains if self.record_controls => Pane::Records,
                    _ => Pane::Domains,
                };
                None
            }
            KeyCode::Left => {
                self.focus = Pane::Domains;
                None
            }
            KeyCode::Right if self.record_controls => {
                self.focus = Pane::Records;
                None
            }
            KeyCode::Up => {
                self.move_selection(false);
                None
            }
            KeyCode::Down => {
                self.move_selection(true);
                None
            }
            KeyCode::Enter if self.focus == Pane::Domains && !self.zones.is_empty() => {
                Some(UserAction::SelectZone(self.selected_zone))
            }
            KeyCode::Char('r') if self.record_controls => Some(UserAction::RefreshRecords),
            KeyCode::Char('R') => Some(UserAction::ReloadDomains),
            KeyCode::Char('a') if self.record_controls => Some(UserAction::OpenRecordEditor),
            KeyCode::Char('d') | KeyCode::Delete if self.record_controls && self.focus == Pane::Records => {
                if let Some(record) = self.selected_record() {
                    self.editor = Some(Editor::ConfirmDelete {
                        record_id: record.id.clone(),
                        name: record.name.clone(),
                    });
                }
                None
            }
            KeyCode::Char('c') => Some(UserAction::OpenCredentialsEditor),
            _ => None,
        }
    }

    fn move_selection(&mut self, down: bool) {
        let (selected, len) = match self.focus {
            Pane::Domains => (&mut self.selected_zone, self.zones.len()),
            Pane::Records => (&mut self.selected_record, self.records.records().len()),
        };
        if len == 0 {
            return;
        }
        *selected = if down {
            (*selected + 1).min(len - 1)
        } else {
            selected.saturating_sub(1)
        };
    }
}

fn credentials_key(form: &mut CredentialsForm, key: KeyEvent) -> Option<UserAction> {
    match key.code {
        KeyCode::Esc => Some(UserAction::CloseCredentialsEditor),
        KeyCode::Enter => Some(UserAction::SubmitCredentials {
            email: form.email.clone(),
            api_key: form.api_key.clone(),
        }),
        KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => {
            form.focus = 1 - form.focus.min(1);
            None
        }
        KeyCode::Backspace => {
            field_of(form).pop();
            None
        }
        KeyCode::Char(c) => {
            field_of(form).push(c);
            None
        }
        _ => None,
    }
}

fn field_of(form: &mut CredentialsForm) -> &mut String {
    if form.focus == 0 {
        &mut form.email
    } else {
        &mut form.api_key
    }
}

fn record_key(form: &mut RecordForm, key: KeyEvent) -> Option<UserAction> {
    match (form.focus, key.code) {
        (_, KeyCode::Esc) => Some(UserAction::CloseRecordEditor),
        (_, KeyCode::Enter) => Some(UserAction::SubmitRecord(form.draft())),
        (_, KeyCode::Tab) | (_, KeyCode::Down) => {
            form.focus = form.focus.step(true);
            None
        }
        (_, KeyCode::BackTab) | (_, KeyCode::Up) => {
            form.focus = form.focus.step(false);
            None
        }
        (RecordField::Type, KeyCode::Left) => {
            form.cycle_type(false);
            None
        }
        (RecordField::Type, KeyCode::Right) | (RecordField::Type, KeyCode::Char(' ')) => {
            form.cycle_type(true);
            None
        }
        (RecordField::Proxied, KeyCode::Left)
        | (RecordField::Proxied, KeyCode::Right)
        | (RecordField::Proxied, KeyCode::Char(' ')) => {
            form.proxied = !form.proxied && form.record_type().is_proxiable();
            None
        }
        (RecordField::Name, KeyCode::Backspace) => {
            form.name.pop();
            None
        }
        (RecordField::Content, KeyCode::Backspace) => {
            form.content.pop();
            None
        }
        (RecordField::Name, KeyCode::Char(c)) => {
            form.name.push(c);
            None
        }
        (RecordField::Content, KeyCode::Char(c)) => {
            form.content.push(c);
            None
        }
        _ => None,
    }
}
