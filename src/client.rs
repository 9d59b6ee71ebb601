use std::time::Duration;

use log::{debug, warn};
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;

use crate::cloudflare_api::{
    CloudflareDnsRecord, CloudflareErrorBody, CloudflareResponse, DeletedRecord, DnsRecord, Zone,
};
use crate::constants::*;
use crate::error::{AppError, Result};

/// Where and how long the client talks to the API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOptions {
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        ClientOptions {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_API_TIMEOUT_SECS),
        }
    }
}

/// Stateless wrapper around the four zone/record endpoints.
#[derive(Debug, Clone)]
pub struct CloudflareClient {
    http: reqwest::Client,
    base_url: String,
    email: String,
    api_key: String,
}

impl CloudflareClient {
    /// Fails with [`AppError::InvalidCredentials`] before touching the network
    /// if either credential is blank.
    pub fn new(email: &str, api_key: &str, options: &ClientOptions) -> Result<Self> {
        let email = email.trim();
        let api_key = api_key.trim();
        if email.is_empty() || api_key.is_empty() {
            return Err(AppError::InvalidCredentials);
        }

        let http = reqwest::Client::builder()
            .timeout(options.timeout)
            .build()?;

        Ok(CloudflareClient {
            http,
            base_url: options.base_url.trim_end_matches('/').to_string(),
            email: email.to_string(),
            api_key: api_key.to_string(),
        })
    }

    /// Lists every zone of the account, following pagination.
    pub async fn list_zones(&self) -> Result<Vec<Zone>> {
        self.get_all_pages("zones", ZONES_PER_PAGE).await
    }

    /// Lists every record of a zone, following pagination.
    pub async fn list_records(&self, zone_id: &str) -> Result<Vec<DnsRecord>> {
        self.get_all_pages(&format!("zones/{}/dns_records", zone_id), RECORDS_PER_PAGE)
            .await
    }

    pub async fn add_record(&self, zone_id: &str, record: &CloudflareDnsRecord) -> Result<DnsRecord> {
        let request = self
            .request(Method::POST, &format!("zones/{}/dns_records", zone_id))
            .json(record);
        let response = self.execute::<DnsRecord>(request).await?;
        require_result(response)
    }

    pub async fn delete_record(&self, zone_id: &str, record_id: &str) -> Result<DeletedRecord> {
        let request = self.request(
            Method::DELETE,
            &format!("zones/{}/dns_records/{}", zone_id, record_id),
        );
        let response = self.execute::<DeletedRecord>(request).await?;

        // Some API versions answer a delete with a null result.
        Ok(response.result.unwrap_or_else(|| DeletedRecord {
            id: record_id.to_string(),
        }))
    }

    async fn get_all_pages<T: DeserializeOwned>(&self, endpoint: &str, per_page: u32) -> Result<Vec<T>> {
        let mut items = Vec::new();
        let mut page = 1u32;

        loop {
            let request = self
                .request(Method::GET, endpoint)
                .query(&[("page", page), ("per_page", per_page)]);
            let response = self.execute::<Vec<T>>(request).await?;

            let total_pages = response
                .result_info
                .as_ref()
                .map_or(1, |info| info.total_pages.max(1));
            items.extend(response.result.unwrap_or_default());

            if page >= total_pages {
                break;
            }
            page += 1;
        }

        Ok(items)
    }

    fn request(&self, method: Method, endpoint: &str) -> RequestBuilder {
        let url = format!("{}/{}", self.base_url, endpoint);
        debug!("{} {}", method, url);

        self.http
            .request(method, url)
            .header("X-Auth-Email", &self.email)
            .header("X-Auth-Key", &self.api_key)
    }

    /// The one request path all operations share.
    async fn execute<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<CloudflareResponse<T>> {
        let response = request.send().await?;
        let status = response.status();
        debug!("Response status: {}", status);

        if !status.is_success() {
            let transport_error = response
                .error_for_status_ref()
                .err()
                .map(|e| e.to_string())
                .unwrap_or_else(|| format!("HTTP status {}", status));
            let body = response.text().await.unwrap_or_default();
            debug!("Response body: {}", body);

            return match provider_message(&body) {
                Some(message) => {
                    warn!("Cloudflare rejected the request ({}): {}", status, message);
                    Err(AppError::Api {
                        status: status.as_u16(),
                        message,
                    })
                }
                None => {
                    warn!("Cloudflare request failed: {}", transport_error);
                    Err(AppError::Transport(transport_error))
                }
            };
        }

        let envelope = response.json::<CloudflareResponse<T>>().await?;
        if !envelope.success {
            let message = envelope
                .first_error()
                .unwrap_or("unknown error")
                .to_string();
            warn!("Cloudflare reported failure: {}", message);
            return Err(AppError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(envelope)
    }
}

fn provider_message(body: &str) -> Option<String> {
    serde_json::from_str::<CloudflareErrorBody>(body)
        .ok()?
        .errors
        .into_iter()
        .next()
        .map(|e| e.message)
}

fn require_result<T>(response: CloudflareResponse<T>) -> Result<T> {
    response
        .result
        .ok_or_else(|| AppError::Transport("response is missing the result field".to_string()))
}
