// PoolBridge - Free and Open Source Software Statement
//
// This project, poolbridge, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/pool/endpoint.rs
// Version: 1.0.0
//
// This file parses and validates pool addresses of the form
// stratum+tcp://host:port.

use crate::error::PoolError;
use std::fmt;
use std::str::FromStr;
use url::Url;

/// The only pool URL scheme the bridge accepts
pub const POOL_SCHEME: &str = "stratum+tcp";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolEndpoint {
    pub host: String,
    pub port: u16,
}

impl PoolEndpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self { host: host.into(), port }
    }

    /// `host:port`, suitable for `lookup_host`
    pub fn authority(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

impl FromStr for PoolEndpoint {
    type Err = PoolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let url = Url::parse(s.trim()).map_err(|_| PoolError::InvalidUrl)?;
        if url.scheme() != POOL_SCHEME {
            return Err(PoolError::InvalidUrl);
        }
        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or(PoolError::InvalidUrl)?
            .trim_start_matches('[')
            .trim_end_matches(']')
            .to_string();
        let port = url.port().ok_or(PoolError::InvalidUrl)?;
        if port == 0 {
            return Err(PoolError::InvalidUrl);
        }
        Ok(Self { host, port })
    }
}

impl fmt::Display for PoolEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", POOL_SCHEME, self.authority())
    }
}
