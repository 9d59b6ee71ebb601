use std::collections::HashSet;
use std::net::IpAddr;
use std::sync::mpsc::Receiver;
use std::sync::Arc;

use log::{debug, info, warn};

use crate::cache::{FetchTicket, Lookup, RecordCache};
use crate::client::{ClientOptions, CloudflareClient};
use crate::cloudflare_api::{DeletedRecord, DnsRecord, Zone};
use crate::credentials::{CredentialStore, Credentials};
use crate::dispatcher::Dispatcher;
use crate::error::AppError;
use crate::frontend::{Frontend, MessageKind, RecordsView, Tone, UserAction};
use crate::public_ip::PublicIpResolver;
use crate::record_edit::{NextStep, RecordDraft, RecordEditFlow, SubmitOutcome};

/// Everything the presentation thread receives.
#[derive(Debug)]
pub enum AppEvent<I> {
    Input(I),
    Done(Completion),
}

/// Outcome of one background task, delivered exactly once.
#[derive(Debug)]
pub enum Completion {
    Zones {
        generation: u64,
        result: Result<Vec<Zone>, AppError>,
    },
    Records {
        zone_id: String,
        ticket: FetchTicket,
        result: Result<Vec<DnsRecord>, AppError>,
    },
    CredentialsChecked {
        attempt: u64,
        credentials: Credentials,
        result: Result<Vec<Zone>, AppError>,
    },
    PublicIp {
        attempt: u64,
        result: Result<IpAddr, AppError>,
    },
    RecordAdded {
        zone_id: String,
        generation: u64,
        attempt: u64,
        result: Result<DnsRecord, AppError>,
    },
    RecordDeleted {
        zone_id: String,
        generation: u64,
        record_id: String,
        result: Result<DeletedRecord, AppError>,
    },
}

/// Work that must not run twice at the same time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Scope {
    Zones,
    Credentials,
    PublicIp,
    /// Adds and deletes within one zone.
    ZoneMutation(String),
}

/// Owns the application state and reacts to user actions and task completions.
///
/// Lives on the presentation thread; background work only reaches it through
/// [`Completion`] events.
pub struct AppController<'a, F: Frontend> {
    frontend: F,
    store: &'a CredentialStore,
    options: ClientOptions,
    ip_resolver: Arc<PublicIpResolver>,
    dispatcher: Dispatcher<AppEvent<F::Input>>,
    client: Option<Arc<CloudflareClient>>,
    zones: Vec<Zone>,
    current_zone: Option<Zone>,
    cache: RecordCache,
    in_flight: HashSet<Scope>,
    edit: RecordEditFlow,
    credentials_attempt: u64,
    /// Bumped whenever the client is replaced; account-bound results from an
    /// older generation are dropped.
    account_generation: u64,
}

impl<'a, F: Frontend> AppController<'a, F> {
    pub fn new(
        frontend: F,
        store: &'a CredentialStore,
        options: ClientOptions,
        ip_resolver: PublicIpResolver,
        dispatcher: Dispatcher<AppEvent<F::Input>>,
    ) -> Self {
        AppController {
            frontend,
            store,
            options,
            ip_resolver: Arc::new(ip_resolver),
            dispatcher,
            client: None,
            zones: Vec::new(),
            current_zone: None,
            cache: RecordCache::new(),
            in_flight: HashSet::new(),
            edit: RecordEditFlow::new(),
            credentials_attempt: 0,
            account_generation: 0,
        }
    }

    pub fn frontend(&self) -> &F {
        &self.frontend
    }

    pub fn frontend_mut(&mut self) -> &mut F {
        &mut self.frontend
    }

    pub fn cache(&self) -> &RecordCache {
        &self.cache
    }

    pub fn zones(&self) -> &[Zone] {
        &self.zones
    }

    /// Runs until the user quits or every event producer is gone.
    pub fn run(&mut self, events: &Receiver<AppEvent<F::Input>>) -> anyhow::Result<()> {
        self.start();

        loop {
            self.frontend.draw()?;

            let Ok(event) = events.recv() else {
                debug!("Event channel closed.");
                break;
            };

            match event {
                AppEvent::Input(input) => match self.frontend.interpret(input) {
                    Some(UserAction::Quit) => break,
                    Some(action) => self.handle_action(action),
                    None => {}
                },
                AppEvent::Done(completion) => self.handle_completion(completion),
            }
        }

        Ok(())
    }

    /// Loads stored credentials and the domain list, or asks for credentials.
    pub fn start(&mut self) {
        self.frontend.clear();
        self.client = None;

        match self.store.load() {
            Some(credentials) => {
                match CloudflareClient::new(&credentials.email, &credentials.api_key, &self.options) {
                    Ok(client) => {
                        self.switch_client(client);
                        self.load_domains();
                    }
                    Err(e) => {
                        self.frontend.set_status(&format!("Error: {}", e));
                        self.prompt_for_credentials();
                    }
                }
            }
            None => self.prompt_for_credentials(),
        }
    }

    pub fn handle_action(&mut self, action: UserAction) {
        debug!("User action: {:?}", action);

        match action {
            UserAction::ReloadDomains => self.load_domains(),
            UserAction::SelectZone(index) => self.select_zone(index),
            UserAction::RefreshRecords => self.refresh_records(),
            UserAction::OpenRecordEditor => self.open_record_editor(),
            UserAction::SubmitRecord(draft) => self.submit_record(draft),
            UserAction::CloseRecordEditor => {
                self.edit.cancel();
                self.frontend.close_record_editor();
            }
            UserAction::DeleteRecord { record_id, name } => self.delete_record(record_id, name),
            UserAction::OpenCredentialsEditor => self.prompt_for_credentials(),
            UserAction::SubmitCredentials { email, api_key } => self.submit_credentials(email, api_key),
            UserAction::CloseCredentialsEditor => {
                self.credentials_attempt += 1;
                self.frontend.close_credentials_editor();
            }
            UserAction::Quit => {}
        }
    }

    pub fn handle_completion(&mut self, completion: Completion) {
        match completion {
            Completion::Zones { generation, result } => self.on_zones_loaded(generation, result),
            Completion::Records { zone_id, ticket, result } => self.on_records_loaded(zone_id, ticket, result),
            Completion::CredentialsChecked {
                attempt,
                credentials,
                result,
            } => self.on_credentials_checked(attempt, credentials, result),
            Completion::PublicIp { attempt, result } => self.on_public_ip(attempt, result),
            Completion::RecordAdded {
                zone_id,
                generation,
                attempt,
                result,
            } => self.on_record_added(zone_id, generation, attempt, result),
            Completion::RecordDeleted {
                zone_id,
                generation,
                record_id,
                result,
            } => self.on_record_deleted(zone_id, generation, record_id, result),
        }
    }

    pub fn load_domains(&mut self) {
        let Some(client) = self.client.clone() else {
            return;
        };
        if !self.begin(Scope::Zones) {
            return;
        }

        self.frontend.set_status("Loading domains...");
        self.cache.clear();
        let generation = self.account_generation;
        self.dispatcher.dispatch(
            async move { client.list_zones().await },
            move |result| AppEvent::Done(Completion::Zones { generation, result }),
        );
    }

    fn on_zones_loaded(&mut self, generation: u64, result: Result<Vec<Zone>, AppError>) {
        if generation != self.account_generation {
            debug!("Dropping domain list of a replaced account.");
            return;
        }
        self.finish(&Scope::Zones);

        match result {
            Ok(zones) => {
                info!("Loaded {} domains.", zones.len());
                self.replace_zones(zones);
            }
            Err(e) => {
                self.zones.clear();
                self.current_zone = None;
                self.frontend.set_record_controls(false);
                let message = e.to_string();
                self.frontend.show_domains(&[], Some(&message));
                self.frontend.set_status(&format!("Failed to load domains: {}", message));
            }
        }
    }

    fn replace_zones(&mut self, zones: Vec<Zone>) {
        self.zones = zones;

        let still_listed = self
            .current_zone
            .as_ref()
            .map_or(false, |current| self.zones.iter().any(|z| z.id == current.id));
        if !still_listed {
            self.current_zone = None;
            self.frontend.set_record_controls(false);
        }

        self.frontend.show_domains(&self.zones, None);
        if self.zones.is_empty() {
            self.frontend.set_status("No domains found for this account.");
        } else {
            self.frontend.set_status("Select a domain.");
        }
    }

    pub fn select_zone(&mut self, index: usize) {
        let Some(zone) = self.zones.get(index).cloned() else {
            return;
        };

        self.frontend.set_status(&format!("Current domain: {}", zone.name));
        self.frontend.set_record_controls(true);
        self.current_zone = Some(zone.clone());
        self.show_or_fetch_records(&zone.id);
    }

    pub fn refresh_records(&mut self) {
        let Some(zone) = self.current_zone.clone() else {
            return;
        };
        if self.cache.is_pending(&zone.id) {
            self.frontend.set_status("Records are already loading, please wait.");
            return;
        }

        self.cache.invalidate(&zone.id);
        self.show_or_fetch_records(&zone.id);
    }

    fn show_or_fetch_records(&mut self, zone_id: &str) {
        let Some(client) = self.client.clone() else {
            return;
        };
        let dispatcher = self.dispatcher.clone();
        let task_zone = zone_id.to_string();

        let lookup = self.cache.get_or_fetch(zone_id, move |ticket| {
            let zone_id = task_zone.clone();
            dispatcher.dispatch(
                async move { client.list_records(&task_zone).await },
                move |result| AppEvent::Done(Completion::Records { zone_id, ticket, result }),
            );
        });

        match lookup {
            Lookup::Cached(records) => self.frontend.show_records(RecordsView::from_records(records)),
            Lookup::Loading => self.frontend.show_records(RecordsView::Loading),
        }
    }

    fn on_records_loaded(&mut self, zone_id: String, ticket: FetchTicket, result: Result<Vec<DnsRecord>, AppError>) {
        if !self.cache.complete_fetch(&zone_id, ticket, &result) {
            return;
        }
        if self.current_zone.as_ref().map(|z| z.id.as_str()) != Some(zone_id.as_str()) {
            debug!("Records of zone {} arrived after it was deselected.", zone_id);
            return;
        }

        match &result {
            Ok(records) => self.frontend.show_records(RecordsView::from_records(records)),
            Err(e) => {
                let message = e.to_string();
                self.frontend.show_records(RecordsView::Failed(&message));
            }
        }
    }

    fn prompt_for_credentials(&mut self) {
        self.frontend.set_status("Enter your Cloudflare API credentials.");
        self.frontend.open_credentials_editor();
    }

    pub fn submit_credentials(&mut self, email: String, api_key: String) {
        if !self.frontend.credentials_editor_active() {
            return;
        }

        let credentials = Credentials {
            email: email.trim().to_string(),
            api_key: api_key.trim().to_string(),
        };
        let client = match CloudflareClient::new(&credentials.email, &credentials.api_key, &self.options) {
            Ok(client) => client,
            Err(e) => {
                self.frontend.credentials_editor_status(&e.to_string(), Tone::Failure);
                return;
            }
        };
        if !self.begin(Scope::Credentials) {
            return;
        }

        self.credentials_attempt += 1;
        let attempt = self.credentials_attempt;
        self.frontend
            .credentials_editor_status("Verifying credentials...", Tone::Progress);

        self.dispatcher.dispatch(
            async move { client.list_zones().await },
            move |result| {
                AppEvent::Done(Completion::CredentialsChecked {
                    attempt,
                    credentials,
                    result,
                })
            },
        );
    }

    fn on_credentials_checked(&mut self, attempt: u64, credentials: Credentials, result: Result<Vec<Zone>, AppError>) {
        self.finish(&Scope::Credentials);
        if attempt != self.credentials_attempt || !self.frontend.credentials_editor_active() {
            debug!("Credentials editor closed before verification finished.");
            return;
        }

        let zones = match result {
            Ok(zones) => zones,
            Err(e) => {
                self.frontend
                    .credentials_editor_status(&format!("Connection failed: {}", e), Tone::Failure);
                return;
            }
        };

        let outcome = self.store.save(&credentials);
        if !outcome.success {
            self.frontend
                .show_message(MessageKind::Error, "Saving credentials failed", &outcome.message);
        }

        info!("Switched account to {}.", credentials.email);
        let client = match CloudflareClient::new(&credentials.email, &credentials.api_key, &self.options) {
            Ok(client) => client,
            Err(e) => {
                self.frontend.credentials_editor_status(&e.to_string(), Tone::Failure);
                return;
            }
        };

        self.frontend.close_credentials_editor();
        self.frontend.clear();
        self.cache.clear();
        self.edit.cancel();
        self.frontend.close_record_editor();
        self.current_zone = None;
        self.switch_client(client);
        self.frontend.set_status("Credentials verified.");
        self.replace_zones(zones);
    }

    /// Installs a new client and forgets work started for the previous one.
    fn switch_client(&mut self, client: CloudflareClient) {
        self.account_generation += 1;
        self.in_flight
            .retain(|scope| matches!(scope, Scope::Credentials | Scope::PublicIp));
        self.client = Some(Arc::new(client));
    }

    pub fn open_record_editor(&mut self) {
        let Some(zone) = self.current_zone.clone() else {
            return;
        };
        self.edit.begin(zone);
        self.frontend.open_record_editor();
    }

    pub fn submit_record(&mut self, draft: RecordDraft) {
        if !self.frontend.record_editor_active() {
            return;
        }
        let step = self.edit.submit(draft);
        self.run_edit_step(step);
    }

    fn run_edit_step(&mut self, step: NextStep) {
        match step {
            NextStep::ResolvePublicIp { version, attempt } => {
                if !self.begin(Scope::PublicIp) {
                    self.edit.interrupt();
                    return;
                }
                self.frontend
                    .set_status(&format!("Resolving the public IP ({})...", version));
                self.frontend
                    .record_editor_status("Resolving the public IP...", Tone::Progress);

                let resolver = self.ip_resolver.clone();
                self.dispatcher.dispatch(
                    async move { resolver.resolve(version).await },
                    move |result| AppEvent::Done(Completion::PublicIp { attempt, result }),
                );
            }
            NextStep::Submit {
                zone_id,
                record,
                attempt,
            } => {
                let Some(client) = self.client.clone() else {
                    self.edit.interrupt();
                    return;
                };
                if !self.begin(Scope::ZoneMutation(zone_id.clone())) {
                    self.edit.interrupt();
                    return;
                }
                self.frontend
                    .record_editor_status(&format!("Adding {}...", record.name), Tone::Progress);

                let task_zone = zone_id.clone();
                let generation = self.account_generation;
                self.dispatcher.dispatch(
                    async move { client.add_record(&task_zone, &record).await },
                    move |result| {
                        AppEvent::Done(Completion::RecordAdded {
                            zone_id,
                            generation,
                            attempt,
                            result,
                        })
                    },
                );
            }
            NextStep::Rejected(message) => {
                self.frontend.record_editor_status(&message, Tone::Failure);
            }
            NextStep::Ignored => {}
        }
    }

    fn on_public_ip(&mut self, attempt: u64, result: Result<IpAddr, AppError>) {
        self.finish(&Scope::PublicIp);

        if let Ok(ip) = &result {
            self.frontend
                .set_status(&format!("Public IP is {}, adding record...", ip));
        }

        match self.edit.public_ip_resolved(attempt, result) {
            NextStep::Rejected(message) => {
                self.frontend.set_status("Failed to determine the public IP.");
                self.frontend.record_editor_status(&message, Tone::Failure);
                self.frontend
                    .show_message(MessageKind::Error, "Public IP lookup failed", &message);
            }
            step => self.run_edit_step(step),
        }
    }

    fn on_record_added(&mut self, zone_id: String, generation: u64, attempt: u64, result: Result<DnsRecord, AppError>) {
        if generation != self.account_generation {
            debug!("Dropping add result for zone {} of a replaced account.", zone_id);
            return;
        }
        self.finish(&Scope::ZoneMutation(zone_id.clone()));

        if let Ok(record) = &result {
            info!("Added {} record {} in zone {}.", record.dns_type, record.name, zone_id);
            self.cache.invalidate(&zone_id);
        }

        match self.edit.submitted(attempt, &result) {
            SubmitOutcome::Succeeded { .. } => {
                self.edit.cancel();
                self.frontend.close_record_editor();
                self.frontend
                    .show_message(MessageKind::Info, "Done", "The DNS record was added.");
            }
            SubmitOutcome::Failed(message) => {
                if self.frontend.record_editor_active() {
                    self.frontend.record_editor_status(&message, Tone::Failure);
                }
                self.frontend
                    .show_message(MessageKind::Error, "Operation failed", &message);
            }
            SubmitOutcome::Ignored => {
                if let Err(e) = &result {
                    let message = e.to_string();
                    self.frontend
                        .set_status(&format!("Adding the record failed: {}", message));
                    self.frontend
                        .show_message(MessageKind::Error, "Operation failed", &message);
                }
            }
        }

        if result.is_ok() {
            self.refresh_if_current(&zone_id);
        }
    }

    pub fn delete_record(&mut self, record_id: String, name: String) {
        let (Some(zone), Some(client)) = (self.current_zone.clone(), self.client.clone()) else {
            return;
        };
        if !self.begin(Scope::ZoneMutation(zone.id.clone())) {
            return;
        }

        self.frontend.set_status(&format!("Deleting {}...", name));
        let zone_id = zone.id;
        let task_zone = zone_id.clone();
        let task_record = record_id.clone();
        let generation = self.account_generation;
        self.dispatcher.dispatch(
            async move { client.delete_record(&task_zone, &task_record).await },
            move |result| {
                AppEvent::Done(Completion::RecordDeleted {
                    zone_id,
                    generation,
                    record_id,
                    result,
                })
            },
        );
    }

    fn on_record_deleted(
        &mut self,
        zone_id: String,
        generation: u64,
        record_id: String,
        result: Result<DeletedRecord, AppError>,
    ) {
        if generation != self.account_generation {
            debug!("Dropping delete result for zone {} of a replaced account.", zone_id);
            return;
        }
        self.finish(&Scope::ZoneMutation(zone_id.clone()));

        match result {
            Ok(_) => {
                info!("Deleted record {} in zone {}.", record_id, zone_id);
                self.cache.invalidate(&zone_id);
                self.frontend
                    .show_message(MessageKind::Info, "Done", "The DNS record was deleted.");
                self.refresh_if_current(&zone_id);
            }
            Err(e) => {
                warn!("Deleting record {} failed: {}", record_id, e);
                self.frontend.set_status("Deleting the record failed.");
                self.frontend
                    .show_message(MessageKind::Error, "Operation failed", &e.to_string());
            }
        }
    }

    fn refresh_if_current(&mut self, zone_id: &str) {
        if self.current_zone.as_ref().map(|z| z.id.as_str()) == Some(zone_id) {
            self.show_or_fetch_records(zone_id);
        }
    }

    fn begin(&mut self, scope: Scope) -> bool {
        if self.in_flight.contains(&scope) {
            debug!("{:?} is still running.", scope);
            self.frontend
                .set_status("That operation is still running, please wait.");
            return false;
        }
        self.in_flight.insert(scope);
        true
    }

    fn finish(&mut self, scope: &Scope) {
        self.in_flight.remove(scope);
    }
}
