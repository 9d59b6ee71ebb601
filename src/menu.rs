//! Line-oriented menu front-end for terminals without a full-screen UI.
//!
//! Every call runs to completion before the next prompt, so the menu drives the
//! runtime directly with `block_on` instead of going through the dispatcher.

use std::io::{BufRead, Write};

use anyhow::{anyhow, Result};
use colored::Colorize;
use log::{debug, info};
use tokio::runtime::Runtime;

use crate::client::{ClientOptions, CloudflareClient};
use crate::cloudflare_api::{DnsRecord, RecordType, Zone};
use crate::constants::{AUTO_TTL, BULK_DELETE_COMMAND, PUBLIC_IP_SHORTCUT};
use crate::credentials::{CredentialStore, Credentials};
use crate::public_ip::PublicIpResolver;
use crate::record_edit::{NextStep, RecordDraft, RecordEditFlow, SubmitOutcome};

enum Reply {
    Text(String),
    /// `q` or end of input.
    Quit,
}

pub struct Menu<'a, R, W> {
    input: R,
    output: W,
    runtime: &'a Runtime,
    store: &'a CredentialStore,
    options: ClientOptions,
    resolver: PublicIpResolver,
}

impl<'a, R: BufRead, W: Write> Menu<'a, R, W> {
    pub fn new(
        input: R,
        output: W,
        runtime: &'a Runtime,
        store: &'a CredentialStore,
        options: ClientOptions,
        resolver: PublicIpResolver,
    ) -> Self {
        Menu {
            input,
            output,
            runtime,
            store,
            options,
            resolver,
        }
    }

    pub fn into_output(self) -> W {
        self.output
    }

    pub fn run(&mut self) -> Result<()> {
        self.header("")?;

        let client = match self.store.load() {
            Some(credentials) => CloudflareClient::new(&credentials.email, &credentials.api_key, &self.options)?,
            None => match self.first_run()? {
                Some(client) => client,
                None => return Ok(()),
            },
        };

        writeln!(self.output, "Fetching domains, please wait...")?;
        let zones = match self.runtime.block_on(client.list_zones()) {
            Ok(zones) => zones,
            Err(e) => {
                self.error(&format!("Failed to load domains: {}", e))?;
                return Err(anyhow!("failed to load domains: {}", e));
            }
        };
        info!("Loaded {} domains.", zones.len());

        loop {
            self.header("Domains (q to quit):")?;
            if zones.is_empty() {
                writeln!(self.output, "{}", "No domains found for this account.".yellow())?;
            }
            for (i, zone) in zones.iter().enumerate() {
                writeln!(self.output, "{}. {}", (i + 1).to_string().green(), zone.name.blue())?;
            }

            let choice = match self.ask("\nSelect a domain: ")? {
                Reply::Quit => {
                    writeln!(self.output, "Bye.")?;
                    break;
                }
                Reply::Text(choice) => choice,
            };

            match pick(&choice, &zones) {
                Some(zone) => self.manage_zone(&client, zone)?,
                None => self.error("Invalid choice.")?,
            }
        }

        Ok(())
    }

    /// Asks until both values are non-blank, then saves them.
    fn first_run(&mut self) -> Result<Option<CloudflareClient>> {
        writeln!(self.output, "No Cloudflare credentials found, let's set them up.")?;

        let (credentials, client) = loop {
            let Reply::Text(email) = self.ask("Cloudflare account email: ")? else {
                return Ok(None);
            };
            let Reply::Text(api_key) = self.ask("Cloudflare Global API key: ")? else {
                return Ok(None);
            };

            match CloudflareClient::new(&email, &api_key, &self.options) {
                Ok(client) => break (Credentials { email, api_key }, client),
                Err(e) => self.error(&e.to_string())?,
            }
        };

        let outcome = self.store.save(&credentials);
        if !outcome.success {
            self.error(&outcome.message)?;
            return Err(anyhow!(outcome.message));
        }
        writeln!(self.output, "{}", outcome.message.green())?;

        Ok(Some(client))
    }

    fn manage_zone(&mut self, client: &CloudflareClient, zone: &Zone) -> Result<()> {
        let mut records = match self.runtime.block_on(client.list_records(&zone.id)) {
            Ok(records) => records,
            Err(e) => return self.error(&format!("Failed to load records: {}", e)),
        };

        loop {
            self.header(&format!("Managing {}", zone.name.green()))?;
            self.print_records(&records)?;
            writeln!(
                self.output,
                "-----------------------\n1. Add a record\n2. Delete records\nq. Back to domains\n-----------------------"
            )?;

            let changed = match self.ask("Choose an option: ")? {
                Reply::Quit => break,
                Reply::Text(choice) if choice == "1" => self.add_record(client, zone)?,
                Reply::Text(choice) if choice == "2" => {
                    if records.is_empty() {
                        self.error("There are no records to delete.")?;
                        false
                    } else {
                        self.delete_records(client, zone, &records)?
                    }
                }
                Reply::Text(_) => {
                    self.error("Invalid choice.")?;
                    false
                }
            };

            if changed {
                writeln!(self.output, "Refreshing records...")?;
                records = match self.runtime.block_on(client.list_records(&zone.id)) {
                    Ok(records) => records,
                    Err(e) => {
                        self.error(&format!("Failed to refresh records: {}", e))?;
                        break;
                    }
                };
            }
        }

        Ok(())
    }

    fn print_records(&mut self, records: &[DnsRecord]) -> Result<()> {
        writeln!(self.output, "-----------------------\nRecords:")?;
        if records.is_empty() {
            writeln!(self.output, "{}", "No records found for this domain.".yellow())?;
        }
        for (i, record) in records.iter().enumerate() {
            let proxied = if record.proxied {
                format!(" ({})", "proxied".cyan())
            } else {
                String::new()
            };
            let ttl = if record.ttl == AUTO_TTL {
                String::new()
            } else {
                format!(" ttl {}", record.ttl)
            };
            writeln!(
                self.output,
                "[{}] {} ({}) -> {}{}{}",
                i + 1,
                record.name.green(),
                record.dns_type.as_str().yellow(),
                record.content.blue(),
                ttl,
                proxied
            )?;
        }
        Ok(())
    }

    /// Returns whether a record was added.
    fn add_record(&mut self, client: &CloudflareClient, zone: &Zone) -> Result<bool> {
        writeln!(self.output, "\n--- Add a record (q cancels at any prompt) ---")?;

        let Reply::Text(choice) = self.ask("Record type (1: A, 2: AAAA, 3: CNAME, 4: NS, 5: TXT): ")? else {
            return Ok(false);
        };
        let Some(record_type) = pick(&choice, &RecordType::EDITABLE).cloned() else {
            self.error("Invalid record type.")?;
            return Ok(false);
        };

        let Reply::Text(name) = self.ask(&format!("Name prefix (blank for {}): ", zone.name))? else {
            return Ok(false);
        };

        let content_prompt = if record_type.is_address() {
            format!("Content (blank or '{}' for this machine's public IP): ", PUBLIC_IP_SHORTCUT)
        } else {
            "Content: ".to_string()
        };
        let Reply::Text(mut content) = self.ask(&content_prompt)? else {
            return Ok(false);
        };
        if content == PUBLIC_IP_SHORTCUT {
            content.clear();
        }

        let mut proxied = false;
        if record_type.is_proxiable() {
            let Reply::Text(choice) = self.ask("Enable the Cloudflare proxy? (1: yes, anything else: no): ")? else {
                return Ok(false);
            };
            proxied = choice == "1";
        }

        let mut flow = RecordEditFlow::new();
        flow.begin(zone.clone());
        let mut step = flow.submit(RecordDraft::new(record_type, &name, &content, proxied));

        loop {
            step = match step {
                NextStep::ResolvePublicIp { version, attempt } => {
                    writeln!(self.output, "Looking up the public IP ({})...", version)?;
                    let result = self.runtime.block_on(self.resolver.resolve(version));
                    if let Ok(ip) = &result {
                        writeln!(self.output, "Using public IP {}", ip.to_string().blue())?;
                    }
                    flow.public_ip_resolved(attempt, result)
                }
                NextStep::Submit { zone_id, record, attempt } => {
                    debug!("Adding {} record {}.", record.dns_type, record.name);
                    let result = self.runtime.block_on(client.add_record(&zone_id, &record));
                    return match flow.submitted(attempt, &result) {
                        SubmitOutcome::Succeeded { .. } => {
                            writeln!(self.output, "\n{}", "Record added.".green())?;
                            Ok(true)
                        }
                        SubmitOutcome::Failed(message) => {
                            self.error(&format!("Adding the record failed: {}", message))?;
                            Ok(false)
                        }
                        SubmitOutcome::Ignored => Ok(false),
                    };
                }
                NextStep::Rejected(message) => {
                    self.error(&message)?;
                    return Ok(false);
                }
                NextStep::Ignored => return Ok(false),
            };
        }
    }

    /// Returns whether at least one record was deleted.
    fn delete_records(&mut self, client: &CloudflareClient, zone: &Zone, records: &[DnsRecord]) -> Result<bool> {
        writeln!(self.output, "\n--- Delete records ---")?;
        let prompt = format!(
            "Record number to delete, '{}' to delete every record, or q to cancel: ",
            BULK_DELETE_COMMAND.green()
        );
        let Reply::Text(choice) = self.ask(&prompt)? else {
            return Ok(false);
        };

        if choice == BULK_DELETE_COMMAND {
            writeln!(self.output, "{}", format!("Deleting all {} records...", records.len()).yellow())?;
            let mut deleted = 0;
            for record in records {
                match self.runtime.block_on(client.delete_record(&zone.id, &record.id)) {
                    Ok(_) => deleted += 1,
                    Err(e) => self.error(&format!("{}: {}", record.name, e))?,
                }
            }
            info!("Bulk delete in {}: {} of {} records.", zone.name, deleted, records.len());
            writeln!(
                self.output,
                "{}",
                format!("Deleted {} of {} records.", deleted, records.len()).green()
            )?;
            return Ok(deleted > 0);
        }

        let Some(record) = pick(&choice, records) else {
            self.error("Invalid record number.")?;
            return Ok(false);
        };

        writeln!(self.output, "Deleting {} -> {}...", record.name, record.content)?;
        match self.runtime.block_on(client.delete_record(&zone.id, &record.id)) {
            Ok(_) => {
                writeln!(self.output, "{}", "Record deleted.".green())?;
                Ok(true)
            }
            Err(e) => {
                self.error(&format!("Deleting the record failed: {}", e))?;
                Ok(false)
            }
        }
    }

    fn header(&mut self, title: &str) -> Result<()> {
        writeln!(self.output, "\n{}", "--- Cloudflare DNS Manager ---".cyan())?;
        if !title.is_empty() {
            writeln!(self.output, "\n{}", title)?;
        }
        Ok(())
    }

    fn error(&mut self, message: &str) -> Result<()> {
        writeln!(self.output, "{}", message.red())?;
        Ok(())
    }

    fn ask(&mut self, prompt: &str) -> Result<Reply> {
        write!(self.output, "{}", prompt)?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            writeln!(self.output)?;
            return Ok(Reply::Quit);
        }

        let line = line.trim();
        if line.eq_ignore_ascii_case("q") {
            return Ok(Reply::Quit);
        }
        Ok(Reply::Text(line.to_string()))
    }
}

/// 1-based menu choice.
fn pick<'t, T>(choice: &str, items: &'t [T]) -> Option<&'t T> {
    let index = choice.trim().parse::<usize>().ok()?;
    items.get(index.checked_sub(1)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::public_ip::{IpMirror, MirrorFormat};
    use serde_json::json;
    use std::io::Cursor;
    use std::time::Duration;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct Harness {
        runtime: Runtime,
        server: MockServer,
        _dir: tempfile::TempDir,
        store: CredentialStore,
    }

    impl Harness {
        fn new() -> Self {
            let runtime = Runtime::new().unwrap();
            let server = runtime.block_on(MockServer::start());
            let dir = tempfile::tempdir().unwrap();
            let store = CredentialStore::new(dir.path().join("credentials.json"), "tester@test-host");
            Harness {
                runtime,
                server,
                _dir: dir,
                store,
            }
        }

        fn saved(self) -> Self {
            assert!(
                self.store
                    .save(&Credentials {
                        email: "user@example.com".to_string(),
                        api_key: "key".to_string(),
                    })
                    .success
            );
            self
        }

        fn mount(&self, mock: Mock) {
            self.runtime.block_on(mock.mount(&self.server));
        }

        fn requests(&self, verb: &str, url_path: &str) -> usize {
            self.runtime
                .block_on(self.server.received_requests())
                .unwrap_or_default()
                .iter()
                .filter(|r| r.method.as_str() == verb && r.url.path() == url_path)
                .count()
        }

        /// Runs the menu on `script` and returns everything it printed.
        fn run(&self, script: &str) -> (Result<()>, String) {
            let options = ClientOptions {
                base_url: self.server.uri(),
                timeout: Duration::from_secs(5),
            };
            let resolver = PublicIpResolver::new(
                vec![IpMirror {
                    name: "local".to_string(),
                    v4: Some(format!("{}/ip", self.server.uri())),
                    v6: None,
                    format: MirrorFormat::Text,
                }],
                Duration::from_secs(2),
            );
            let mut menu = Menu::new(
                Cursor::new(script.as_bytes().to_vec()),
                Vec::new(),
                &self.runtime,
                &self.store,
                options,
                resolver,
            );
            let result = menu.run();
            let output = String::from_utf8(menu.into_output()).unwrap();
            (result, output)
        }
    }

    fn envelope(result: serde_json::Value) -> serde_json::Value {
        json!({"result": result, "success": true, "errors": [], "messages": []})
    }

    fn record(id: &str, name: &str) -> serde_json::Value {
        json!({"id": id, "type": "A", "name": name, "content": "192.0.2.1", "proxied": false, "ttl": 1})
    }

    fn mount_zone(harness: &Harness, records: serde_json::Value) {
        harness.mount(
            Mock::given(method("GET"))
                .and(path("/zones"))
                .respond_with(
                    ResponseTemplate::new(200).set_body_json(envelope(json!([{"id": "z1", "name": "example.com"}]))),
                ),
        );
        harness.mount(
            Mock::given(method("GET"))
                .and(path("/zones/z1/dns_records"))
                .respond_with(ResponseTemplate::new(200).set_body_json(envelope(records))),
        );
    }

    #[test]
    fn first_run_saves_credentials_and_shows_empty_zone() {
        let harness = Harness::new();
        mount_zone(&harness, json!([]));

        let (result, output) = harness.run("user@example.com\nkey\n1\nq\nq\n");

        assert!(result.is_ok());
        assert!(output.contains("No records found for this domain."));
        assert_eq!(
            harness.store.load(),
            Some(Credentials {
                email: "user@example.com".to_string(),
                api_key: "key".to_string(),
            })
        );
    }

    #[test]
    fn blank_first_run_input_is_asked_again() {
        let harness = Harness::new();
        mount_zone(&harness, json!([]));

        let (result, output) = harness.run("\nkey\nuser@example.com\nkey\nq\n");

        assert!(result.is_ok());
        assert!(output.contains("API key and email must not be empty"));
        assert_eq!(
            harness.store.load(),
            Some(Credentials {
                email: "user@example.com".to_string(),
                api_key: "key".to_string(),
            })
        );
    }

    #[test]
    fn blank_first_run_is_never_saved() {
        let harness = Harness::new();

        let (result, _) = harness.run("\nkey\n");

        assert!(result.is_ok());
        assert_eq!(harness.store.load(), None);
        assert!(!harness.store.path().exists());
        assert_eq!(harness.requests("GET", "/zones"), 0);
    }

    #[test]
    fn shortcut_fills_in_the_public_ip() {
        let harness = Harness::new().saved();
        mount_zone(&harness, json!([]));
        harness.mount(
            Mock::given(method("GET"))
                .and(path("/ip"))
                .respond_with(ResponseTemplate::new(200).set_body_string("203.0.113.7\n")),
        );
        harness.mount(
            Mock::given(method("POST"))
                .and(path("/zones/z1/dns_records"))
                .and(body_partial_json(json!({
                    "type": "A",
                    "name": "home.example.com",
                    "content": "203.0.113.7",
                    "proxied": true
                })))
                .respond_with(ResponseTemplate::new(200).set_body_json(envelope(record("r9", "home.example.com")))),
        );

        let (result, output) = harness.run("1\n1\n1\nhome\n+++\n1\nq\nq\n");

        assert!(result.is_ok());
        assert!(output.contains("Record added."));
        assert_eq!(harness.requests("POST", "/zones/z1/dns_records"), 1);
        assert_eq!(harness.requests("GET", "/zones/z1/dns_records"), 2);
    }

    #[test]
    fn failed_ip_lookup_does_not_submit() {
        let harness = Harness::new().saved();
        mount_zone(&harness, json!([]));
        harness.mount(
            Mock::given(method("GET"))
                .and(path("/ip"))
                .respond_with(ResponseTemplate::new(500)),
        );

        let (result, output) = harness.run("1\n1\n1\n\n\n2\nq\nq\n");

        assert!(result.is_ok());
        assert!(output.contains("Could not determine the public IP"));
        assert_eq!(harness.requests("POST", "/zones/z1/dns_records"), 0);
    }

    #[test]
    fn txt_records_skip_the_proxy_prompt() {
        let harness = Harness::new().saved();
        mount_zone(&harness, json!([]));
        harness.mount(
            Mock::given(method("POST"))
                .and(path("/zones/z1/dns_records"))
                .and(body_partial_json(json!({"type": "TXT", "name": "example.com", "proxied": false})))
                .respond_with(ResponseTemplate::new(200).set_body_json(envelope(record("r9", "example.com")))),
        );

        let (_, output) = harness.run("1\n1\n5\n@\nv=spf1 -all\nq\nq\n");

        assert!(!output.contains("Enable the Cloudflare proxy?"));
        assert_eq!(harness.requests("POST", "/zones/z1/dns_records"), 1);
    }

    #[test]
    fn bulk_delete_reports_partial_success() {
        let harness = Harness::new().saved();
        mount_zone(&harness, json!([record("r1", "a.example.com"), record("r2", "b.example.com")]));
        harness.mount(
            Mock::given(method("DELETE"))
                .and(path("/zones/z1/dns_records/r1"))
                .respond_with(ResponseTemplate::new(200).set_body_json(envelope(json!({"id": "r1"})))),
        );
        harness.mount(
            Mock::given(method("DELETE"))
                .and(path("/zones/z1/dns_records/r2"))
                .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                    "result": null,
                    "success": false,
                    "errors": [{"code": 81044, "message": "Record does not exist."}],
                    "messages": []
                }))),
        );

        let (_, output) = harness.run("1\n2\nDelete all records\nq\nq\n");

        assert!(output.contains("Record does not exist."));
        assert!(output.contains("Deleted 1 of 2 records."));
        assert_eq!(harness.requests("GET", "/zones/z1/dns_records"), 2);
    }

    #[test]
    fn zone_list_failure_is_fatal() {
        let harness = Harness::new().saved();
        harness.mount(
            Mock::given(method("GET"))
                .and(path("/zones"))
                .respond_with(ResponseTemplate::new(502)),
        );

        let (result, output) = harness.run("");

        assert!(result.is_err());
        assert!(output.contains("Failed to load domains"));
    }

    #[test]
    fn menu_choices_are_one_based() {
        let items = ["a", "b"];
        assert_eq!(pick("1", &items), Some(&"a"));
        assert_eq!(pick(" 2 ", &items), Some(&"b"));
        assert_eq!(pick("0", &items), None);
        assert_eq!(pick("3", &items), None);
        assert_eq!(pick("x", &items), None);
    }
}
