use crate::RegistryError;
use std::fmt;
use std::str::FromStr;

/// Parsed registry address of the form `scheme://host:port`.
///
/// ```rust
/// use srpc_registry::RegistryConfig;
///
/// let config = RegistryConfig::parse("zookeeper://127.0.0.1:2181").unwrap();
/// assert_eq!(config.scheme, "zookeeper");
/// assert_eq!(config.host, "127.0.0.1");
/// assert_eq!(config.port, 2181);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryConfig {
    pub scheme: String,
    pub host: String,
    pub port: u16,
}

impl RegistryConfig {
    pub fn parse(address: &str) -> Result<Self, RegistryError> {
        let invalid = || RegistryError::InvalidConnectString(address.to_string());

        let (scheme, rest) = address.split_once("://").ok_or_else(invalid)?;
        if scheme.is_empty()
            || !scheme
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '-' || c == '.')
        {
            return Err(invalid());
        }

        let (host, port) = rest.rsplit_once(':').ok_or_else(invalid)?;
        if host.is_empty() || host.contains('/') {
            return Err(invalid());
        }
        let port = port.parse::<u16>().map_err(|_| invalid())?;

        Ok(Self {
            scheme: scheme.to_ascii_lowercase(),
            host: host.to_string(),
            port,
        })
    }

    /// `host:port` part, as handed to a driver.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl FromStr for RegistryConfig {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for RegistryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}:{}", self.scheme, self.host, self.port)
    }
}
