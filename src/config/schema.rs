//! Configuration schema definitions.
//!
//! Settings are built from the ordered key/value pairs of the properties
//! file. Interpretation never fails: malformed values are logged and the
//! affected setting falls back to its default or is skipped. The only
//! startup-fatal routing problem, a label defined twice, is left for the
//! registry to detect.

use std::time::Duration;

use url::Url;

use crate::config::loader::ConfigError;
use crate::routing::registry::ROOT_REDIRECT_LABEL;

pub const PROXY_PORT: &str = "proxy.port";
pub const POOL_MAX_CONNECTIONS: &str = "proxy.pool.maxconnections";
pub const CONNECT_TIMEOUT: &str = "proxy.timeout.connect";
pub const RESPONSE_TIMEOUT: &str = "proxy.timeout.response";

pub const SSL_REDIR_PORT_ORIGIN: &str = "sslredirector.port.origin";
pub const SSL_REDIR_PORT_DEST: &str = "sslredirector.port.destination";
pub const SSL_REDIR_EXTERNALHOST: &str = "sslredirector.externalhostname";

pub const DEFAULT_PROXY_PORT: u16 = 8080;

/// Root settings for the proxy process.
#[derive(Debug, Clone)]
pub struct ProxySettings {
    /// Port of the proxy listener.
    pub port: u16,

    /// Outbound connection tuning shared by every backend.
    pub relay: RelaySettings,

    /// Routes in configuration order.
    pub routes: Vec<RouteSpec>,

    /// SSL redirector parameters, present only when all three are valid.
    pub ssl_redirect: Option<RedirectConfig>,
}

impl Default for ProxySettings {
    fn default() -> Self {
        Self {
            port: DEFAULT_PROXY_PORT,
            relay: RelaySettings::default(),
            routes: Vec::new(),
            ssl_redirect: None,
        }
    }
}

/// Outbound connection settings applied to each backend's pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelaySettings {
    /// Maximum concurrent outbound exchanges per backend.
    pub max_connections: usize,

    /// Connection establishment timeout.
    pub connect_timeout: Duration,

    /// How long to wait for the backend's response head. `None` waits forever.
    pub response_timeout: Option<Duration>,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            max_connections: 10_000,
            connect_timeout: Duration::from_secs(60),
            response_timeout: None,
        }
    }
}

/// A single routing entry, as declared in configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteSpec {
    /// `<label> = <host>,<port>[,<pathPrefix>]`
    Backend {
        label: String,
        host: String,
        port: u16,
        path_prefix: Option<String>,
    },
    /// `rootredirect = <target>`
    RootRedirect(String),
}

impl RouteSpec {
    /// Interpret a `<label> = <value>` pair as a backend route.
    ///
    /// Returns `Ok(None)` when the value has neither two nor three fields.
    pub fn parse_backend(label: &str, value: &str) -> Result<Option<Self>, ConfigError> {
        let fields: Vec<&str> = value.split(',').map(str::trim).collect();
        if fields.len() != 2 && fields.len() != 3 {
            return Ok(None);
        }

        let invalid = |reason: &str| ConfigError::InvalidBackend {
            label: label.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        };

        let host = fields[0];
        if host.is_empty() {
            return Err(invalid("empty host"));
        }
        let port = parse_port(fields[1]).ok_or_else(|| invalid("malformed port number"))?;
        let path_prefix = fields
            .get(2)
            .filter(|prefix| !prefix.is_empty())
            .map(|prefix| prefix.to_string());

        Ok(Some(RouteSpec::Backend {
            label: label.to_string(),
            host: host.to_string(),
            port,
            path_prefix,
        }))
    }
}

/// Parameters of the SSL redirector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectConfig {
    pub origin_port: u16,
    pub destination_port: u16,
    /// Hostname extracted from the configured external URL.
    pub external_host: String,
}

impl RedirectConfig {
    /// Validate the three raw redirector values.
    pub fn from_values(
        origin_port: &str,
        destination_port: &str,
        external_url: &str,
    ) -> Result<Self, ConfigError> {
        let origin_port = parse_port(origin_port).ok_or_else(|| ConfigError::InvalidPort {
            key: SSL_REDIR_PORT_ORIGIN.to_string(),
            value: origin_port.to_string(),
        })?;
        let destination_port =
            parse_port(destination_port).ok_or_else(|| ConfigError::InvalidPort {
                key: SSL_REDIR_PORT_DEST.to_string(),
                value: destination_port.to_string(),
            })?;

        let url = Url::parse(external_url).map_err(|e| ConfigError::InvalidRedirectUrl {
            value: external_url.to_string(),
            reason: e.to_string(),
        })?;
        let external_host = url
            .host_str()
            .filter(|host| !host.is_empty())
            .ok_or_else(|| ConfigError::InvalidRedirectUrl {
                value: external_url.to_string(),
                reason: "url has no host".to_string(),
            })?
            .to_string();

        Ok(Self {
            origin_port,
            destination_port,
            external_host,
        })
    }
}

impl ProxySettings {
    /// Build settings from ordered configuration pairs.
    pub fn from_pairs(pairs: &[(String, String)]) -> Self {
        let mut settings = ProxySettings::default();
        let mut port_value = None;
        let mut origin = None;
        let mut destination = None;
        let mut external_host = None;

        for (key, value) in pairs {
            // Properties keep trailing whitespace in values.
            let value = value.trim();
            match key.as_str() {
                PROXY_PORT => port_value = Some(value),
                POOL_MAX_CONNECTIONS => {
                    match value.parse::<usize>().ok().filter(|max| *max > 0) {
                        Some(max) => settings.relay.max_connections = max,
                        None => tracing::error!(
                            key = %key,
                            value = %value,
                            default = settings.relay.max_connections,
                            "Malformed pool size, using default"
                        ),
                    }
                }
                CONNECT_TIMEOUT => match parse_secs(value) {
                    Some(timeout) => settings.relay.connect_timeout = timeout,
                    None => tracing::error!(
                        key = %key,
                        value = %value,
                        "Malformed connect timeout, using default"
                    ),
                },
                RESPONSE_TIMEOUT => match parse_secs(value) {
                    Some(timeout) => settings.relay.response_timeout = Some(timeout),
                    None => tracing::error!(
                        key = %key,
                        value = %value,
                        "Malformed response timeout, waiting without limit"
                    ),
                },
                SSL_REDIR_PORT_ORIGIN => origin = Some(value),
                SSL_REDIR_PORT_DEST => destination = Some(value),
                SSL_REDIR_EXTERNALHOST => external_host = Some(value),
                _ if value.is_empty() => {
                    tracing::warn!(key = %key, "Ignoring configuration key without a value");
                }
                ROOT_REDIRECT_LABEL => {
                    settings.routes.push(RouteSpec::RootRedirect(value.to_string()));
                }
                label => match RouteSpec::parse_backend(label, value) {
                    Ok(Some(route)) => settings.routes.push(route),
                    Ok(None) => tracing::warn!(
                        key = %label,
                        value = %value,
                        "Ignoring configuration entry that is not a backend definition"
                    ),
                    Err(e) => tracing::error!(error = %e, "Skipping backend"),
                },
            }
        }

        match port_value.and_then(parse_port) {
            Some(port) => settings.port = port,
            None => tracing::error!(
                value = port_value.unwrap_or_default(),
                default = DEFAULT_PROXY_PORT,
                "No, or malformed port number provided, starting with default port"
            ),
        }

        settings.ssl_redirect = match (origin, destination, external_host) {
            (Some(origin), Some(destination), Some(host)) => {
                match RedirectConfig::from_values(origin, destination, host) {
                    Ok(config) => Some(config),
                    Err(e) => {
                        tracing::error!(error = %e, "SSL redirector will not be started");
                        None
                    }
                }
            }
            (origin, destination, host) => {
                let missing = [
                    (SSL_REDIR_PORT_ORIGIN, origin.is_none()),
                    (SSL_REDIR_PORT_DEST, destination.is_none()),
                    (SSL_REDIR_EXTERNALHOST, host.is_none()),
                ]
                .into_iter()
                .find(|(_, absent)| *absent)
                .map(|(key, _)| ConfigError::MissingRedirectParameter(key));
                if let Some(e) = missing {
                    tracing::info!(reason = %e, "Insufficient parameters provided for SSL redirector");
                }
                None
            }
        };

        settings
    }
}

fn parse_port(value: &str) -> Option<u16> {
    value.trim().parse::<u16>().ok().filter(|port| *port > 0)
}

fn parse_secs(value: &str) -> Option<Duration> {
    value
        .trim()
        .parse::<u64>()
        .ok()
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
}
