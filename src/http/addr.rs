//! Listen address parsing.

use super::ServerError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::net::Ipv6Addr;
use std::str::FromStr;

/// Port used when an address omits it or gives one that does not parse.
pub const DEFAULT_PORT: u16 = 9100;

const ANY_HOST: &str = "0.0.0.0";

/// A host and port to listen on.
///
/// Accepted forms are a bare port (`9100`), `:port`, `host`, `host:port`,
/// `[v6]:port` and a bare IPv6 address. An empty host means every IPv4
/// interface; a missing or non-numeric port means [`DEFAULT_PORT`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenAddr {
    pub host: String,
    pub port: u16,
}

impl Default for ListenAddr {
    fn default() -> Self {
        Self {
            host: ANY_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl ListenAddr {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        let host = host.into();
        Self {
            host: if host.is_empty() { ANY_HOST.to_string() } else { host },
            port,
        }
    }
}

impl FromStr for ListenAddr {
    type Err = ServerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = || ServerError::InvalidAddress(s.to_string());

        if s.chars().all(|c| c.is_ascii_digit()) {
            return Ok(Self::new("", parse_port(s)));
        }

        let (host, port) = if let Some(rest) = s.strip_prefix('[') {
            let (host, rest) = rest.split_once(']').ok_or_else(invalid)?;
            match rest {
                "" => (host, ""),
                _ => (host, rest.strip_prefix(':').ok_or_else(invalid)?),
            }
        } else if s.parse::<Ipv6Addr>().is_ok() {
            (s, "")
        } else {
            match s.rsplit_once(':') {
                Some((host, port)) => (host, port),
                None => (s, ""),
            }
        };

        if host
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '/' | '[' | ']' | '@'))
            || (host.contains(':') && host.parse::<Ipv6Addr>().is_err())
        {
            return Err(invalid());
        }

        Ok(Self::new(host, parse_port(port)))
    }
}

fn parse_port(port: &str) -> u16 {
    port.parse().unwrap_or(DEFAULT_PORT)
}

impl fmt::Display for ListenAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

impl Serialize for ListenAddr {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ListenAddr {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> ListenAddr {
        s.parse().unwrap()
    }

    #[test]
    fn test_port_only_forms() {
        assert_eq!(parse("9000"), ListenAddr::new("0.0.0.0", 9000));
        assert_eq!(parse(":9000"), ListenAddr::new("0.0.0.0", 9000));
        assert_eq!(parse(""), ListenAddr::default());
    }

    #[test]
    fn test_host_forms() {
        assert_eq!(parse("localhost"), ListenAddr::new("localhost", 9100));
        assert_eq!(parse("127.0.0.1:8080"), ListenAddr::new("127.0.0.1", 8080));
        assert_eq!(parse("[::1]:8080"), ListenAddr::new("::1", 8080));
        assert_eq!(parse("[::1]"), ListenAddr::new("::1", 9100));
        assert_eq!(parse("::1"), ListenAddr::new("::1", 9100));
    }

    #[test]
    fn test_bad_port_falls_back() {
        assert_eq!(parse("localhost:http"), ListenAddr::new("localhost", 9100));
        assert_eq!(parse("localhost:70000"), ListenAddr::new("localhost", 9100));
    }

    #[test]
    fn test_invalid_hosts_rejected() {
        assert!(matches!(
            "[::1".parse::<ListenAddr>(),
            Err(ServerError::InvalidAddress(_))
        ));
        assert!("exa mple:80".parse::<ListenAddr>().is_err());
        assert!("a:b:c".parse::<ListenAddr>().is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(ListenAddr::default().to_string(), "0.0.0.0:9100");
        assert_eq!(ListenAddr::new("::1", 80).to_string(), "[::1]:80");
    }
}
