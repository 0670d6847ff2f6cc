//! Type definitions for earliest-actor lookups
//!
//! Shared between the query builder, the execution backend, and the NATS
//! request/reply contracts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::LookupError;

/// SQL query string
pub type SqlQuery = String;

/// Blockchain account or contract address.
///
/// Exact-match token: the text is kept verbatim and compared byte for byte.
/// Only the shape is checked (`0x` followed by 40 hex digits).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
    /// Hex digits after the `0x` prefix
    pub const HEX_LEN: usize = 40;

    /// Parse and validate an address token
    pub fn parse(value: &str) -> Result<Self, LookupError> {
        let hex = value
            .strip_prefix("0x")
            .ok_or_else(|| LookupError::Construction(format!("Address must start with 0x: {}", value)))?;

        if hex.len() != Self::HEX_LEN || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(LookupError::Construction(format!(
                "Address must have {} hex digits after 0x: {}",
                Self::HEX_LEN,
                value
            )));
        }

        Ok(Self(value.to_string()))
    }

    /// Parse a batch of address tokens, failing on the first malformed one
    pub fn parse_all<S: AsRef<str>>(values: &[S]) -> Result<Vec<Self>, LookupError> {
        values.iter().map(|v| Self::parse(v.as_ref())).collect()
    }

    /// Address text as given
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Address {
    type Err = LookupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Address {
    type Error = LookupError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.0
    }
}

impl AsRef<str> for Address {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Query request handed to an execution backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    /// SQL query to execute
    pub query: SqlQuery,
    /// Positional parameters, bound as `$1`, `$2`, ...
    pub parameters: Vec<SqlParam>,
}

impl QueryRequest {
    /// Create a new query request
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            parameters: Vec::new(),
        }
    }

    /// Set parameters
    pub fn with_parameters(mut self, parameters: Vec<SqlParam>) -> Self {
        self.parameters = parameters;
        self
    }
}

/// SQL parameter types for parameterized queries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SqlParam {
    Null,
    Bool(bool),
    Int64(i64),
    Float64(f64),
    String(String),
}

/// Performance tier hint for the execution backend.
///
/// Opaque to the query logic; backends map it onto their own resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PerformanceTier {
    Medium,
    #[default]
    Large,
}

impl PerformanceTier {
    /// Resource multiplier applied to the configured thread/memory baseline
    pub fn multiplier(&self) -> usize {
        match self {
            PerformanceTier::Medium => 1,
            PerformanceTier::Large => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PerformanceTier::Medium => "medium",
            PerformanceTier::Large => "large",
        }
    }
}

impl fmt::Display for PerformanceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PerformanceTier {
    type Err = LookupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "medium" => Ok(PerformanceTier::Medium),
            "large" => Ok(PerformanceTier::Large),
            other => Err(LookupError::Config(format!(
                "Unknown performance tier: {}",
                other
            ))),
        }
    }
}

/// Hints passed through to the execution backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionHints {
    /// Resource tier for the query
    pub performance: PerformanceTier,
    /// How often to check on a running query
    pub poll_interval: Duration,
    /// Give up after this long
    pub timeout: Duration,
}

impl Default for ExecutionHints {
    fn default() -> Self {
        Self {
            performance: PerformanceTier::Large,
            poll_interval: Duration::from_secs(5),
            timeout: Duration::from_secs(300),
        }
    }
}

impl ExecutionHints {
    pub fn with_performance(mut self, performance: PerformanceTier) -> Self {
        self.performance = performance;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Event source a combined result row came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// Contract creation events
    Deployments,
    /// Native value transfers
    Funding,
}

impl Source {
    /// Discriminator value written by the query
    pub fn tag(&self) -> &'static str {
        match self {
            Source::Deployments => "deployments",
            Source::Funding => "funding",
        }
    }

    /// Parse a discriminator value
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "deployments" => Some(Source::Deployments),
            "funding" => Some(Source::Funding),
            _ => None,
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// One row of the combined, tagged result set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorRow {
    pub source: Source,
    /// Queried address (contract for deployments, recipient for funding)
    pub address: String,
    /// Counterparty (deployer or funder)
    pub actor: String,
    pub transaction_id: String,
    pub block_number: i64,
    pub block_time: DateTime<Utc>,
    /// Native-unit amount; always `None` for deployments
    pub amount: Option<f64>,
}

/// Earliest deployment of a queried contract address
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EarliestDeployment {
    pub contract_address: String,
    pub deployer: String,
    pub transaction_id: String,
    pub block_number: i64,
    pub block_time: DateTime<Utc>,
}

/// First native-currency funding of a queried address
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EarliestFunding {
    pub recipient: String,
    pub funder: String,
    pub transaction_id: String,
    pub block_number: i64,
    pub block_time: DateTime<Utc>,
    /// Amount in native units (raw value / 10^decimals)
    pub amount: f64,
}

/// Lookup request received over NATS
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LookupRequest {
    /// Addresses to resolve
    pub addresses: Vec<String>,
    /// Performance tier override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub performance: Option<PerformanceTier>,
    /// Poll interval override in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poll_interval_seconds: Option<u64>,
}

impl LookupRequest {
    pub fn new(addresses: Vec<String>) -> Self {
        Self {
            addresses,
            performance: None,
            poll_interval_seconds: None,
        }
    }

    /// Apply per-request overrides on top of default hints
    pub fn hints(&self, defaults: ExecutionHints) -> ExecutionHints {
        let mut hints = defaults;
        if let Some(performance) = self.performance {
            hints.performance = performance;
        }
        if let Some(secs) = self.poll_interval_seconds.filter(|s| *s > 0) {
            hints.poll_interval = Duration::from_secs(secs);
        }
        hints
    }
}

/// Lookup reply sent over NATS
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LookupResponse {
    Ok {
        deployments: Vec<EarliestDeployment>,
        funding: Vec<EarliestFunding>,
    },
    Error {
        kind: String,
        message: String,
    },
}

impl From<&LookupError> for LookupResponse {
    fn from(err: &LookupError) -> Self {
        LookupResponse::Error {
            kind: err.kind().to_string(),
            message: err.to_string(),
        }
    }
}
