//! Network probes built from configuration.

use crate::config::{CheckSettings, ProbeSettings};
use anyhow::Context;
use async_trait::async_trait;
use healthcheck::{Category, Probe, Registry, Report};
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tracing::debug;

/// Fields every configured probe carries
#[derive(Debug, Clone)]
struct ProbeMeta {
    name: String,
    category: Category,
    timeout: Option<Duration>,
}

/// UP when a TCP connection to `address` succeeds
pub struct TcpProbe {
    meta: ProbeMeta,
    address: String,
}

impl TcpProbe {
    pub fn new(name: impl Into<String>, category: Category, address: impl Into<String>) -> Self {
        Self {
            meta: ProbeMeta {
                name: name.into(),
                category,
                timeout: None,
            },
            address: address.into(),
        }
    }
}

#[async_trait]
impl Probe for TcpProbe {
    fn name(&self) -> &str {
        &self.meta.name
    }

    fn category(&self) -> Category {
        self.meta.category
    }

    fn timeout(&self) -> Option<Duration> {
        self.meta.timeout
    }

    async fn check(&self) -> anyhow::Result<Report> {
        let stream = TcpStream::connect(&self.address)
            .await
            .with_context(|| format!("connect to {} failed", self.address))?;
        let peer = stream.peer_addr().ok().map(|addr| addr.to_string());
        debug!(probe = %self.meta.name, address = %self.address, "TCP probe connected");

        let mut report = Report::up().with_data("address", self.address.clone());
        if let Some(peer) = peer {
            report = report.with_data("peer", peer);
        }
        Ok(report)
    }
}

/// UP when `url` answers with an expected status code
pub struct HttpProbe {
    meta: ProbeMeta,
    url: String,
    method: reqwest::Method,
    expected_codes: Vec<u16>,
    client: reqwest::Client,
}

impl HttpProbe {
    /// An empty `expected_codes` accepts any 2xx response.
    pub fn new(
        name: impl Into<String>,
        category: Category,
        url: impl Into<String>,
        method: &str,
        expected_codes: Vec<u16>,
    ) -> anyhow::Result<Self> {
        let method = reqwest::Method::from_bytes(method.to_uppercase().as_bytes())
            .with_context(|| format!("invalid HTTP method '{}'", method))?;
        let client = reqwest::Client::builder()
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            meta: ProbeMeta {
                name: name.into(),
                category,
                timeout: None,
            },
            url: url.into(),
            method,
            expected_codes,
            client,
        })
    }

    fn accepts(&self, code: u16) -> bool {
        if self.expected_codes.is_empty() {
            (200..300).contains(&code)
        } else {
            self.expected_codes.contains(&code)
        }
    }
}

#[async_trait]
impl Probe for HttpProbe {
    fn name(&self) -> &str {
        &self.meta.name
    }

    fn category(&self) -> Category {
        self.meta.category
    }

    fn timeout(&self) -> Option<Duration> {
        self.meta.timeout
    }

    async fn check(&self) -> anyhow::Result<Report> {
        let response = self
            .client
            .request(self.method.clone(), &self.url)
            .send()
            .await
            .with_context(|| format!("{} {} failed", self.method, self.url))?;

        let code = response.status().as_u16();
        debug!(probe = %self.meta.name, url = %self.url, status = code, "HTTP probe answered");

        Ok(Report::from_bool(self.accepts(code))
            .with_data("url", self.url.clone())
            .with_data("status_code", code))
    }
}

/// UP when `query` resolves, optionally to one of `expected_ips`
pub struct DnsProbe {
    meta: ProbeMeta,
    query: String,
    expected_ips: Vec<IpAddr>,
}

impl DnsProbe {
    pub fn new(
        name: impl Into<String>,
        category: Category,
        query: impl Into<String>,
        expected_ips: Vec<IpAddr>,
    ) -> Self {
        Self {
            meta: ProbeMeta {
                name: name.into(),
                category,
                timeout: None,
            },
            query: query.into(),
            expected_ips,
        }
    }
}

#[async_trait]
impl Probe for DnsProbe {
    fn name(&self) -> &str {
        &self.meta.name
    }

    fn category(&self) -> Category {
        self.meta.category
    }

    fn timeout(&self) -> Option<Duration> {
        self.meta.timeout
    }

    async fn check(&self) -> anyhow::Result<Report> {
        // System resolver; the port is required by lookup_host and ignored
        let resolved: Vec<IpAddr> = tokio::net::lookup_host(format!("{}:0", self.query))
            .await
            .with_context(|| format!("lookup of {} failed", self.query))?
            .map(|addr| addr.ip())
            .collect();

        let up = if self.expected_ips.is_empty() {
            !resolved.is_empty()
        } else {
            self.expected_ips.iter().any(|ip| resolved.contains(ip))
        };

        let addresses: Vec<String> = resolved.iter().map(IpAddr::to_string).collect();
        Ok(Report::from_bool(up)
            .with_data("query", self.query.clone())
            .with_data("resolved", addresses))
    }
}

/// Build the probe described by `settings`.
pub fn build_probe(settings: &ProbeSettings) -> common::Result<Arc<dyn Probe>> {
    let category: Category = settings.category.parse()?;
    let meta = ProbeMeta {
        name: settings.name.clone(),
        category,
        timeout: settings.timeout,
    };

    let probe: Arc<dyn Probe> = match &settings.check {
        CheckSettings::Tcp { address } => Arc::new(TcpProbe {
            meta,
            address: address.clone(),
        }),
        CheckSettings::Http {
            url,
            method,
            expected_codes,
        } => {
            let mut probe =
                HttpProbe::new(&settings.name, category, url, method, expected_codes.clone())?;
            probe.meta = meta;
            Arc::new(probe)
        }
        CheckSettings::Dns {
            query,
            expected_ips,
        } => Arc::new(DnsProbe {
            meta,
            query: query.clone(),
            expected_ips: expected_ips.clone(),
        }),
    };

    Ok(probe)
}

/// Build and register every configured probe.
///
/// Stops at the first failure; probes registered before it stay in place.
pub fn register_all(registry: &Registry, settings: &[ProbeSettings]) -> common::Result<()> {
    for probe in settings {
        registry.register(build_probe(probe)?)?;
    }
    Ok(())
}
