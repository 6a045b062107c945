//! Health check types and structures.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::RegistryError;

/// Diagnostic attributes attached to an outcome.
pub type Data = BTreeMap<String, Value>;

/// Lifecycle group a probe belongs to.
///
/// Orchestrators query each category independently: startup gates the
/// other two, liveness decides restarts, readiness decides routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Startup,
    Liveness,
    Readiness,
}

impl Category {
    /// Every category, in the order combined reports list them.
    pub const ALL: [Category; 3] = [Category::Startup, Category::Liveness, Category::Readiness];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Startup => "startup",
            Category::Liveness => "liveness",
            Category::Readiness => "readiness",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "startup" | "started" => Ok(Category::Startup),
            "liveness" | "live" => Ok(Category::Liveness),
            "readiness" | "ready" => Ok(Category::Readiness),
            _ => Err(RegistryError::UnknownCategory(s.to_string())),
        }
    }
}

/// Binary probe status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    Up,
    Down,
}

impl Status {
    pub fn is_up(&self) -> bool {
        *self == Status::Up
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Up => write!(f, "UP"),
            Status::Down => write!(f, "DOWN"),
        }
    }
}

impl From<bool> for Status {
    fn from(up: bool) -> Self {
        if up { Status::Up } else { Status::Down }
    }
}

/// What a probe hands back from a successful invocation.
///
/// The engine attaches the registered probe name to turn this into an
/// [`Outcome`].
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub status: Status,
    pub data: Data,
}

impl Report {
    pub fn up() -> Self {
        Self::from_status(Status::Up)
    }

    pub fn down() -> Self {
        Self::from_status(Status::Down)
    }

    pub fn from_bool(up: bool) -> Self {
        Self::from_status(up.into())
    }

    pub fn from_status(status: Status) -> Self {
        Self {
            status,
            data: Data::new(),
        }
    }

    /// Attach a diagnostic attribute.
    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }
}

/// Why the executor turned an invocation into a DOWN outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultKind {
    Timeout,
    Error,
}

impl FaultKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FaultKind::Timeout => "timeout",
            FaultKind::Error => "error",
        }
    }
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one probe invocation. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    pub name: String,
    pub status: Status,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub data: Data,
    /// Wall-clock time spent waiting on the probe
    #[serde(skip)]
    pub duration: Duration,
    /// Set only by the executor; probe data never sets it
    #[serde(skip)]
    pub fault: Option<FaultKind>,
}

impl Outcome {
    pub fn new(name: impl Into<String>, report: Report, duration: Duration) -> Self {
        Self {
            name: name.into(),
            status: report.status,
            data: report.data,
            duration,
            fault: None,
        }
    }

    /// DOWN outcome for a probe that did not answer in time
    pub fn timeout(name: impl Into<String>, limit: Duration, duration: Duration) -> Self {
        let report = Report::down()
            .with_data(REASON_KEY, "timeout")
            .with_data("timeout_ms", limit.as_millis() as u64);
        Self::new(name, report, duration).with_fault(FaultKind::Timeout)
    }

    /// DOWN outcome for a probe that returned an error or panicked
    pub fn error(name: impl Into<String>, message: impl fmt::Display, duration: Duration) -> Self {
        let report = Report::down().with_data(REASON_KEY, format!("error: {}", message));
        Self::new(name, report, duration).with_fault(FaultKind::Error)
    }

    fn with_fault(mut self, kind: FaultKind) -> Self {
        self.fault = Some(kind);
        self
    }

    pub fn is_up(&self) -> bool {
        self.status.is_up()
    }

    /// Failure reason recorded by the executor, if any.
    ///
    /// A `reason` key a probe put in its own data is not a fault reason.
    pub fn reason(&self) -> Option<&str> {
        self.fault?;
        self.data.get(REASON_KEY).and_then(Value::as_str)
    }
}

/// Data key under which the executor records fault reasons.
pub const REASON_KEY: &str = "reason";

/// Combined status and itemized outcomes for a category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateResult {
    pub status: Status,
    pub checks: Vec<Outcome>,
}

impl AggregateResult {
    pub fn is_up(&self) -> bool {
        self.status.is_up()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_category_parse() {
        assert_eq!("readiness".parse::<Category>().unwrap(), Category::Readiness);
        assert_eq!("Ready".parse::<Category>().unwrap(), Category::Readiness);
        assert_eq!("live".parse::<Category>().unwrap(), Category::Liveness);
        assert_eq!("started".parse::<Category>().unwrap(), Category::Startup);
        assert!(matches!(
            "warmup".parse::<Category>(),
            Err(RegistryError::UnknownCategory(c)) if c == "warmup"
        ));
    }

    #[test]
    fn test_status_display() {
        assert_eq!(Status::Up.to_string(), "UP");
        assert_eq!(Status::Down.to_string(), "DOWN");
        assert_eq!(Status::from(false), Status::Down);
    }

    #[test]
    fn test_aggregate_result_serialization() {
        let result = AggregateResult {
            status: Status::Down,
            checks: vec![
                Outcome::new("db", Report::up(), Duration::from_millis(3)),
                Outcome::error("cache", "connection refused", Duration::from_millis(1)),
            ],
        };

        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(
            value,
            json!({
                "status": "DOWN",
                "checks": [
                    { "name": "db", "status": "UP" },
                    {
                        "name": "cache",
                        "status": "DOWN",
                        "data": { "reason": "error: connection refused" }
                    }
                ]
            })
        );
    }

    #[test]
    fn test_timeout_outcome() {
        let outcome = Outcome::timeout("slow", Duration::from_secs(5), Duration::from_secs(5));
        assert!(!outcome.is_up());
        assert_eq!(outcome.reason(), Some("timeout"));
        assert_eq!(outcome.data["timeout_ms"], json!(5000));
        assert_eq!(outcome.fault, Some(FaultKind::Timeout));
    }

    #[test]
    fn test_reported_reason_is_not_a_fault() {
        let report = Report::up().with_data(REASON_KEY, "timeout");
        let outcome = Outcome::new("cache", report, Duration::from_millis(2));

        assert!(outcome.is_up());
        assert_eq!(outcome.fault, None);
        assert_eq!(outcome.reason(), None);
        assert_eq!(outcome.data[REASON_KEY], json!("timeout"));

        let failed = Outcome::error("cache", "refused", Duration::ZERO);
        assert_eq!(failed.fault, Some(FaultKind::Error));
        assert_eq!(failed.reason(), Some("error: refused"));
    }
}
