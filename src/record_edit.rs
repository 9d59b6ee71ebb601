//! The add-record flow:
//!
//! `Idle → AwaitingInput → (ResolvingPublicIp) → Submitting → Succeeded`
//!
//! A failed IP lookup or a failed submission returns the flow to `AwaitingInput`
//! so the user can correct the input and try again.

use std::net::IpAddr;

use log::debug;

use crate::cloudflare_api::{CloudflareDnsRecord, DnsRecord, RecordType, Zone};
use crate::constants::AUTO_TTL;
use crate::error::AppError;
use crate::public_ip::IpVersion;

/// What the user typed into the record editor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordDraft {
    pub record_type: RecordType,
    pub name: String,
    pub content: String,
    pub proxied: bool,
    pub ttl: u32,
}

impl RecordDraft {
    pub fn new(record_type: RecordType, name: &str, content: &str, proxied: bool) -> Self {
        RecordDraft {
            proxied: proxied && record_type.is_proxiable(),
            record_type,
            name: name.trim().to_string(),
            content: content.trim().to_string(),
            ttl: AUTO_TTL,
        }
    }

    /// Blank content on an address record means "use my public IP".
    pub fn needs_public_ip(&self) -> bool {
        self.record_type.is_address() && self.content.is_empty()
    }

    pub fn ip_version(&self) -> IpVersion {
        match self.record_type {
            RecordType::Aaaa => IpVersion::V6,
            _ => IpVersion::V4,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.content.is_empty() && !self.record_type.is_address() {
            return Err("Content must not be empty.".to_string());
        }
        Ok(())
    }

    pub fn to_request(&self, zone_name: &str) -> CloudflareDnsRecord {
        CloudflareDnsRecord {
            dns_type: self.record_type.clone(),
            name: qualify_name(&self.name, zone_name),
            content: self.content.clone(),
            ttl: self.ttl,
            proxied: self.proxied,
        }
    }
}

/// Turns editor input into a fully qualified record name.
///
/// Blank and `@` mean the zone apex; names already inside the zone are kept.
pub fn qualify_name(name: &str, zone_name: &str) -> String {
    let name = name.trim().trim_end_matches('.');
    if name.is_empty() || name == "@" {
        return zone_name.to_string();
    }
    let suffix = format!(".{}", zone_name.to_ascii_lowercase());
    if name.eq_ignore_ascii_case(zone_name) || name.to_ascii_lowercase().ends_with(&suffix) {
        return name.to_string();
    }
    format!("{}.{}", name, zone_name)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditState {
    Idle,
    AwaitingInput { zone: Zone },
    ResolvingPublicIp { zone: Zone, draft: RecordDraft },
    Submitting { zone: Zone, draft: RecordDraft },
    Succeeded { zone: Zone },
}

/// What the caller has to do next.
#[derive(Debug, Clone, PartialEq)]
pub enum NextStep {
    ResolvePublicIp { version: IpVersion, attempt: u64 },
    Submit {
        zone_id: String,
        record: CloudflareDnsRecord,
        attempt: u64,
    },
    /// Back to `AwaitingInput`; the message is for the user.
    Rejected(String),
    /// The event does not belong to the current state (e.g. the editor was closed).
    Ignored,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Succeeded { zone_id: String },
    Failed(String),
    Ignored,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordEditFlow {
    state: EditState,
    /// Bumped on every begin, cancel and accepted submit. Results carrying an
    /// older number belong to a submission that no longer exists.
    attempt: u64,
}

impl Default for RecordEditFlow {
    fn default() -> Self {
        RecordEditFlow {
            state: EditState::Idle,
            attempt: 0,
        }
    }
}

impl RecordEditFlow {
    pub fn new() -> Self {
        RecordEditFlow::default()
    }

    pub fn state(&self) -> &EditState {
        &self.state
    }

    pub fn is_busy(&self) -> bool {
        matches!(
            self.state,
            EditState::ResolvingPublicIp { .. } | EditState::Submitting { .. }
        )
    }

    pub fn begin(&mut self, zone: Zone) {
        self.attempt += 1;
        self.state = EditState::AwaitingInput { zone };
    }

    pub fn cancel(&mut self) {
        self.attempt += 1;
        self.state = EditState::Idle;
    }

    /// Returns a lookup or submission that could not be started to `AwaitingInput`.
    pub fn interrupt(&mut self) {
        if let EditState::ResolvingPublicIp { zone, .. } | EditState::Submitting { zone, .. } = &self.state {
            self.state = EditState::AwaitingInput { zone: zone.clone() };
        }
    }

    pub fn submit(&mut self, draft: RecordDraft) -> NextStep {
        let zone = match &self.state {
            EditState::AwaitingInput { zone } => zone.clone(),
            EditState::ResolvingPublicIp { .. } | EditState::Submitting { .. } => {
                return NextStep::Rejected("The record is already being submitted.".to_string())
            }
            EditState::Idle | EditState::Succeeded { .. } => return NextStep::Ignored,
        };

        if let Err(message) = draft.validate() {
            return NextStep::Rejected(message);
        }

        self.attempt += 1;
        if draft.needs_public_ip() {
            let version = draft.ip_version();
            debug!("Record content left blank, resolving public IP{}.", version);
            self.state = EditState::ResolvingPublicIp { zone, draft };
            return NextStep::ResolvePublicIp {
                version,
                attempt: self.attempt,
            };
        }

        self.start_submitting(zone, draft)
    }

    pub fn public_ip_resolved(&mut self, attempt: u64, result: Result<IpAddr, AppError>) -> NextStep {
        if attempt != self.attempt {
            debug!("Dropping public IP result of edit attempt #{}.", attempt);
            return NextStep::Ignored;
        }
        let (zone, mut draft) = match std::mem::replace(&mut self.state, EditState::Idle) {
            EditState::ResolvingPublicIp { zone, draft } => (zone, draft),
            other => {
                self.state = other;
                return NextStep::Ignored;
            }
        };

        match result {
            Ok(ip) => {
                draft.content = ip.to_string();
                self.start_submitting(zone, draft)
            }
            Err(e) => {
                self.state = EditState::AwaitingInput { zone };
                NextStep::Rejected(e.to_string())
            }
        }
    }

    pub fn submitted(&mut self, attempt: u64, result: &Result<DnsRecord, AppError>) -> SubmitOutcome {
        if attempt != self.attempt {
            debug!("Dropping submission result of edit attempt #{}.", attempt);
            return SubmitOutcome::Ignored;
        }
        let zone = match &self.state {
            EditState::Submitting { zone, .. } => zone.clone(),
            _ => return SubmitOutcome::Ignored,
        };

        match result {
            Ok(_) => {
                let zone_id = zone.id.clone();
                self.state = EditState::Succeeded { zone };
                SubmitOutcome::Succeeded { zone_id }
            }
            Err(e) => {
                self.state = EditState::AwaitingInput { zone };
                SubmitOutcome::Failed(e.to_string())
            }
        }
    }

    fn start_submitting(&mut self, zone: Zone, draft: RecordDraft) -> NextStep {
        let step = NextStep::Submit {
            zone_id: zone.id.clone(),
            record: draft.to_request(&zone.name),
            attempt: self.attempt,
        };
        self.state = EditState::Submitting { zone, draft };
        step
    }
}
