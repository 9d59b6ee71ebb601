use std::net::IpAddr;
use std::time::Duration;

use log::{debug, warn};
use serde::Deserialize;

use crate::constants::DEFAULT_IP_LOOKUP_TIMEOUT_SECS;
use crate::error::{AppError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpVersion {
    V4,
    V6,
}

impl IpVersion {
    fn matches(self, ip: &IpAddr) -> bool {
        match self {
            IpVersion::V4 => ip.is_ipv4(),
            IpVersion::V6 => ip.is_ipv6(),
        }
    }
}

impl std::fmt::Display for IpVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IpVersion::V4 => f.write_str("v4"),
            IpVersion::V6 => f.write_str("v6"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MirrorFormat {
    Text,
    Json,
}

/// One IP discovery endpoint with its IPv4 and IPv6 URLs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IpMirror {
    pub name: String,
    pub v4: Option<String>,
    pub v6: Option<String>,
    pub format: MirrorFormat,
}

impl IpMirror {
    fn url(&self, version: IpVersion) -> Option<&str> {
        match version {
            IpVersion::V4 => self.v4.as_deref(),
            IpVersion::V6 => self.v6.as_deref(),
        }
    }
}

pub fn default_mirrors() -> Vec<IpMirror> {
    vec![
        IpMirror {
            name: "ping0.cc".to_string(),
            v4: Some("https://ipv4.ping0.cc".to_string()),
            v6: Some("https://ipv6.ping0.cc".to_string()),
            format: MirrorFormat::Text,
        },
        IpMirror {
            name: "ipinfo.io".to_string(),
            v4: Some("https://ipinfo.io/json".to_string()),
            v6: Some("https://v6.ipinfo.io/json".to_string()),
            format: MirrorFormat::Json,
        },
        IpMirror {
            name: "ipify.org".to_string(),
            v4: Some("https://api.ipify.org?format=json".to_string()),
            v6: Some("https://api64.ipify.org?format=json".to_string()),
            format: MirrorFormat::Json,
        },
    ]
}

#[derive(Debug, Deserialize)]
struct IpBody {
    ip: Option<String>,
    origin: Option<String>,
}

/// Asks the mirrors in order and returns the first usable answer.
#[derive(Debug, Clone)]
pub struct PublicIpResolver {
    http: reqwest::Client,
    mirrors: Vec<IpMirror>,
    timeout: Duration,
}

impl Default for PublicIpResolver {
    fn default() -> Self {
        PublicIpResolver::new(
            default_mirrors(),
            Duration::from_secs(DEFAULT_IP_LOOKUP_TIMEOUT_SECS),
        )
    }
}

impl PublicIpResolver {
    pub fn new(mirrors: Vec<IpMirror>, timeout: Duration) -> Self {
        PublicIpResolver {
            http: reqwest::Client::new(),
            mirrors,
            timeout,
        }
    }

    pub async fn resolve(&self, version: IpVersion) -> Result<IpAddr> {
        for mirror in &self.mirrors {
            let Some(url) = mirror.url(version) else {
                continue;
            };

            match self.ask(mirror, url).await {
                Ok(Some(ip)) if version.matches(&ip) => {
                    debug!("{} answered {}", mirror.name, ip);
                    return Ok(ip);
                }
                Ok(Some(ip)) => debug!("{} answered {} which is not IP{}", mirror.name, ip, version),
                Ok(None) => debug!("{} gave no usable address", mirror.name),
                Err(e) => warn!("Issue trying to get current IP from {}: {}", mirror.name, e),
            }
        }

        Err(AppError::PublicIp(format!(
            "Could not determine the public IP ({}): every lookup service failed or returned an error.",
            version
        )))
    }

    async fn ask(&self, mirror: &IpMirror, url: &str) -> std::result::Result<Option<IpAddr>, reqwest::Error> {
        let response = self
            .http
            .get(url)
            .timeout(self.timeout)
            .send()
            .await?
            .error_for_status()?;

        let raw = match mirror.format {
            MirrorFormat::Text => Some(response.text().await?),
            MirrorFormat::Json => {
                let body = response.json::<IpBody>().await?;
                body.ip.filter(|ip| !ip.trim().is_empty()).or(body.origin)
            }
        };

        Ok(raw.as_deref().and_then(parse_ip))
    }
}

/// Takes the first entry of a possibly comma-separated answer.
fn parse_ip(raw: &str) -> Option<IpAddr> {
    raw.split(',').next()?.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn mirror(server: &MockServer, route: &str, format: MirrorFormat) -> IpMirror {
        IpMirror {
            name: route.trim_start_matches('/').to_string(),
            v4: Some(format!("{}{}", server.uri(), route)),
            v6: Some(format!("{}{}", server.uri(), route)),
            format,
        }
    }

    #[test]
    fn parse_ip_takes_first_of_list() {
        assert_eq!(
            parse_ip(" 198.51.100.4, 10.0.0.1 "),
            Some("198.51.100.4".parse().unwrap())
        );
        assert_eq!(parse_ip("not an ip"), None);
    }

    #[tokio::test]
    async fn falls_through_to_next_mirror() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/broken"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"origin": "203.0.113.9"})))
            .mount(&server)
            .await;

        let resolver = PublicIpResolver::new(
            vec![
                mirror(&server, "/broken", MirrorFormat::Text),
                mirror(&server, "/json", MirrorFormat::Json),
            ],
            Duration::from_secs(2),
        );

        let ip = resolver.resolve(IpVersion::V4).await.unwrap();
        assert_eq!(ip, "203.0.113.9".parse::<IpAddr>().unwrap());
    }

    #[tokio::test]
    async fn empty_ip_field_uses_origin() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ip": "", "origin": "203.0.113.9"})))
            .mount(&server)
            .await;

        let resolver = PublicIpResolver::new(
            vec![mirror(&server, "/json", MirrorFormat::Json)],
            Duration::from_secs(2),
        );

        let ip = resolver.resolve(IpVersion::V4).await.unwrap();
        assert_eq!(ip, "203.0.113.9".parse::<IpAddr>().unwrap());
    }

    #[tokio::test]
    async fn wrong_family_is_skipped() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/text"))
            .respond_with(ResponseTemplate::new(200).set_body_string("203.0.113.9\n"))
            .mount(&server)
            .await;

        let resolver = PublicIpResolver::new(
            vec![mirror(&server, "/text", MirrorFormat::Text)],
            Duration::from_secs(2),
        );

        assert!(resolver.resolve(IpVersion::V4).await.is_ok());
        assert!(matches!(
            resolver.resolve(IpVersion::V6).await,
            Err(AppError::PublicIp(_))
        ));
    }

    #[tokio::test]
    async fn all_mirrors_failing_is_a_public_ip_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let resolver = PublicIpResolver::new(
            vec![
                mirror(&server, "/a", MirrorFormat::Text),
                mirror(&server, "/b", MirrorFormat::Json),
            ],
            Duration::from_secs(2),
        );

        let err = resolver.resolve(IpVersion::V4).await.unwrap_err();
        assert!(err.to_string().contains("public IP"));
    }
}
