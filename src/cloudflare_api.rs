use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Envelope every Cloudflare v4 endpoint answers with.
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloudflareResponse<T> {
    pub result: Option<T>,
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub errors: Vec<CloudflareError>,
    #[serde(default)]
    pub messages: Vec<serde_json::Value>,
    pub result_info: Option<ResultInfo>,
}

impl<T> CloudflareResponse<T> {
    /// The first provider error message, if the body carries one.
    pub fn first_error(&self) -> Option<&str> {
        self.errors.first().map(|e| e.message.as_str())
    }
}

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloudflareError {
    #[serde(default)]
    pub code: i64,
    pub message: String,
}

/// Only `errors[].message` is needed when the status is not 2xx.
#[derive(Default, Debug, Clone, Deserialize)]
pub(crate) struct CloudflareErrorBody {
    #[serde(default)]
    pub errors: Vec<CloudflareError>,
}

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultInfo {
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub per_page: u32,
    #[serde(default)]
    pub total_pages: u32,
    #[serde(default)]
    pub count: u32,
    #[serde(default)]
    pub total_count: u32,
}

/// A domain under management.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zone {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RecordType {
    A,
    Aaaa,
    Cname,
    Txt,
    Ns,
    Mx,
    Srv,
    Caa,
    Other(String),
}

impl RecordType {
    /// The types offered when creating a record.
    pub const EDITABLE: [RecordType; 5] = [
        RecordType::A,
        RecordType::Aaaa,
        RecordType::Cname,
        RecordType::Ns,
        RecordType::Txt,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            RecordType::A => "A",
            RecordType::Aaaa => "AAAA",
            RecordType::Cname => "CNAME",
            RecordType::Txt => "TXT",
            RecordType::Ns => "NS",
            RecordType::Mx => "MX",
            RecordType::Srv => "SRV",
            RecordType::Caa => "CAA",
            RecordType::Other(other) => other,
        }
    }

    /// Only address and alias records can sit behind the CDN.
    pub fn is_proxiable(&self) -> bool {
        matches!(self, RecordType::A | RecordType::Aaaa | RecordType::Cname)
    }

    pub fn is_address(&self) -> bool {
        matches!(self, RecordType::A | RecordType::Aaaa)
    }
}

impl From<String> for RecordType {
    fn from(value: String) -> Self {
        match value.to_ascii_uppercase().as_str() {
            "A" => RecordType::A,
            "AAAA" => RecordType::Aaaa,
            "CNAME" => RecordType::Cname,
            "TXT" => RecordType::Txt,
            "NS" => RecordType::Ns,
            "MX" => RecordType::Mx,
            "SRV" => RecordType::Srv,
            "CAA" => RecordType::Caa,
            _ => RecordType::Other(value),
        }
    }
}

impl From<RecordType> for String {
    fn from(value: RecordType) -> Self {
        value.as_str().to_string()
    }
}

impl FromStr for RecordType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(RecordType::from(s.trim().to_string()))
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub dns_type: RecordType,
    pub name: String,
    pub content: String,
    #[serde(default)]
    pub proxied: bool,
    #[serde(default)]
    pub ttl: u32,
}

/// Request body for creating a record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CloudflareDnsRecord {
    #[serde(rename = "type")]
    pub dns_type: RecordType,
    pub name: String,
    pub content: String,
    pub ttl: u32,
    pub proxied: bool,
}

/// Acknowledgement returned by a delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletedRecord {
    pub id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_type_parses_case_insensitively() {
        assert_eq!("aaaa".parse::<RecordType>().unwrap(), RecordType::Aaaa);
        assert_eq!(
            "HTTPS".parse::<RecordType>().unwrap(),
            RecordType::Other("HTTPS".to_string())
        );
    }

    #[test]
    fn deserializes_record_list_envelope() {
        let body = r#"{
            "result": [
                {"id": "r1", "zone_id": "z1", "type": "A", "name": "example.com",
                 "content": "192.0.2.1", "proxied": true, "ttl": 1, "locked": false}
            ],
            "success": true,
            "errors": [],
            "messages": [],
            "result_info": {"page": 1, "per_page": 100, "total_pages": 1, "count": 1, "total_count": 1}
        }"#;

        let parsed: CloudflareResponse<Vec<DnsRecord>> = serde_json::from_str(body).unwrap();
        let records = parsed.result.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].dns_type, RecordType::A);
        assert!(records[0].proxied);
        assert_eq!(parsed.result_info.unwrap().total_pages, 1);
    }

    #[test]
    fn new_record_serializes_type_field() {
        let body = CloudflareDnsRecord {
            dns_type: RecordType::Cname,
            name: "www.example.com".to_string(),
            content: "example.com".to_string(),
            ttl: 1,
            proxied: false,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["type"], "CNAME");
        assert_eq!(json["ttl"], 1);
    }

    #[test]
    fn only_address_and_alias_records_are_proxiable() {
        assert!(RecordType::Cname.is_proxiable());
        assert!(!RecordType::Txt.is_proxiable());
        assert!(!RecordType::Other("HTTPS".into()).is_proxiable());
    }
}
