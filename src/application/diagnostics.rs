//! Central diagnostic sink with per-code policies and an in-run journal.

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
    str::FromStr,
};

use metrics::counter;
use thiserror::Error;
use tracing::{error, warn};

/// Stable identifier of a diagnostic category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DiagnosticCode {
    pub domain: &'static str,
    pub name: &'static str,
}

impl DiagnosticCode {
    pub const BAD_LOCAL_LINK: Self = Self::new("html-formatter", "bad-local-link");
    pub const NO_IMAGE_SRC: Self = Self::new("html-formatter", "no-image-src");
    pub const BAD_IMAGE_SRC: Self = Self::new("html-formatter", "bad-image-src");
    pub const DOCSTRING_FAILED: Self = Self::new("formatter", "docstring-failed");
    pub const MISSING_TEMPLATE: Self = Self::new("formatter", "missing-template");
    pub const UNKNOWN_SYMBOL: Self = Self::new("page", "unknown-symbol");
    pub const STORE_UNAVAILABLE: Self = Self::new("store", "store-unavailable");
    pub const KIND_COLLISION: Self = Self::new("store", "kind-collision");

    pub const ALL: [Self; 8] = [
        Self::BAD_LOCAL_LINK,
        Self::NO_IMAGE_SRC,
        Self::BAD_IMAGE_SRC,
        Self::DOCSTRING_FAILED,
        Self::MISSING_TEMPLATE,
        Self::UNKNOWN_SYMBOL,
        Self::STORE_UNAVAILABLE,
        Self::KIND_COLLISION,
    ];

    pub const fn new(domain: &'static str, name: &'static str) -> Self {
        Self { domain, name }
    }

    /// Codes that abort the run no matter how policies are configured.
    pub fn is_always_fatal(self) -> bool {
        matches!(
            self,
            Self::MISSING_TEMPLATE | Self::STORE_UNAVAILABLE | Self::KIND_COLLISION
        )
    }

    pub fn default_policy(self) -> Policy {
        if self.is_always_fatal() {
            Policy::Fatal
        } else {
            Policy::Warn
        }
    }

    /// Look up a known code by its short name or `domain.name` key.
    pub fn lookup(key: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|code| code.name == key || code.to_string() == key)
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.domain, self.name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    Ignore,
    Warn,
    Fatal,
}

impl FromStr for Policy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "ignore" => Ok(Policy::Ignore),
            "warn" | "warning" => Ok(Policy::Warn),
            "fatal" | "error" => Ok(Policy::Fatal),
            other => Err(format!("unknown diagnostic policy `{other}`")),
        }
    }
}

/// Resolved policy table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiagnosticPolicy {
    pub fatal_warnings: bool,
    pub ignored_codes: BTreeSet<String>,
    pub ignored_domains: BTreeSet<String>,
    pub overrides: BTreeMap<String, Policy>,
}

impl DiagnosticPolicy {
    pub fn resolve(&self, code: DiagnosticCode) -> Policy {
        if code.is_always_fatal() {
            return Policy::Fatal;
        }

        let key = code.to_string();
        let base = if let Some(policy) = self
            .overrides
            .get(&key)
            .or_else(|| self.overrides.get(code.name))
        {
            *policy
        } else if self.ignored_domains.contains(code.domain)
            || self.ignored_codes.contains(code.name)
            || self.ignored_codes.contains(&key)
        {
            Policy::Ignore
        } else {
            code.default_policy()
        };

        match base {
            Policy::Warn if self.fatal_warnings => Policy::Fatal,
            other => other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub code: DiagnosticCode,
    pub message: String,
    pub filename: Option<String>,
    pub lineno: Option<u32>,
    pub severity: Severity,
}

impl Diagnostic {
    pub fn new(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            filename: None,
            lineno: None,
            severity: Severity::Warning,
        }
    }

    pub fn in_file(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    pub fn at_line(mut self, lineno: Option<u32>) -> Self {
        self.lineno = lineno;
        self
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("{code}: {message}")]
pub struct DiagnosticError {
    pub code: DiagnosticCode,
    pub message: String,
}

/// Receives every diagnostic emitted during a build.
#[derive(Debug, Default)]
pub struct DiagnosticSink {
    policy: DiagnosticPolicy,
    journal: Vec<Diagnostic>,
    checkpoint: usize,
}

impl DiagnosticSink {
    pub fn new(policy: DiagnosticPolicy) -> Self {
        Self {
            policy,
            journal: Vec::new(),
            checkpoint: 0,
        }
    }

    /// Route a diagnostic through its policy. Fatal diagnostics are journaled
    /// and returned as errors.
    pub fn report(&mut self, mut diagnostic: Diagnostic) -> Result<(), DiagnosticError> {
        let policy = self.policy.resolve(diagnostic.code);
        let code = diagnostic.code.to_string();
        let filename = diagnostic.filename.as_deref().unwrap_or("");
        let lineno = diagnostic.lineno.unwrap_or_default();

        match policy {
            Policy::Ignore => return Ok(()),
            Policy::Warn => {
                warn!(
                    target: "docweave::diagnostics",
                    domain = diagnostic.code.domain,
                    code = diagnostic.code.name,
                    filename,
                    lineno,
                    "{}",
                    diagnostic.message
                );
                diagnostic.severity = Severity::Warning;
            }
            Policy::Fatal => {
                error!(
                    target: "docweave::diagnostics",
                    domain = diagnostic.code.domain,
                    code = diagnostic.code.name,
                    filename,
                    lineno,
                    "{}",
                    diagnostic.message
                );
                diagnostic.severity = Severity::Error;
            }
        }

        counter!("docweave_diagnostics_total", "code" => code).increment(1);

        let fatal = matches!(policy, Policy::Fatal).then(|| DiagnosticError {
            code: diagnostic.code,
            message: diagnostic.message.clone(),
        });
        self.journal.push(diagnostic);

        match fatal {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    pub fn journal(&self) -> &[Diagnostic] {
        &self.journal
    }

    /// Mark the current end of the journal.
    pub fn checkpoint(&mut self) {
        self.checkpoint = self.journal.len();
    }

    /// Diagnostics emitted after the last [`checkpoint`](Self::checkpoint).
    pub fn since_checkpoint(&self) -> &[Diagnostic] {
        &self.journal[self.checkpoint..]
    }

    pub fn count(&self, code: DiagnosticCode) -> usize {
        self.journal.iter().filter(|d| d.code == code).count()
    }

    pub fn has_errors(&self) -> bool {
        self.journal
            .iter()
            .any(|d| matches!(d.severity, Severity::Error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warnings_are_journaled_and_recoverable() {
        let mut sink = DiagnosticSink::default();

        sink.report(Diagnostic::new(DiagnosticCode::BAD_LOCAL_LINK, "dangling").in_file("a.md"))
            .expect("recoverable");

        assert_eq!(sink.count(DiagnosticCode::BAD_LOCAL_LINK), 1);
        assert_eq!(sink.journal()[0].severity, Severity::Warning);
        assert!(!sink.has_errors());
    }

    #[test]
    fn fatal_warnings_escalate() {
        let mut sink = DiagnosticSink::new(DiagnosticPolicy {
            fatal_warnings: true,
            ..DiagnosticPolicy::default()
        });

        let err = sink
            .report(Diagnostic::new(DiagnosticCode::NO_IMAGE_SRC, "empty src"))
            .expect_err("escalated");
        assert_eq!(err.code, DiagnosticCode::NO_IMAGE_SRC);
        assert!(sink.has_errors());
    }

    #[test]
    fn ignored_domains_drop_diagnostics() {
        let mut policy = DiagnosticPolicy::default();
        policy.ignored_domains.insert("html-formatter".to_string());
        let mut sink = DiagnosticSink::new(policy);

        sink.report(Diagnostic::new(DiagnosticCode::BAD_IMAGE_SRC, "missing"))
            .expect("ignored");

        assert!(sink.journal().is_empty());
    }

    #[test]
    fn explicit_override_beats_ignore_list() {
        let mut policy = DiagnosticPolicy::default();
        policy.ignored_codes.insert("bad-local-link".to_string());
        policy
            .overrides
            .insert("html-formatter.bad-local-link".to_string(), Policy::Fatal);

        assert_eq!(policy.resolve(DiagnosticCode::BAD_LOCAL_LINK), Policy::Fatal);
    }

    #[test]
    fn always_fatal_codes_cannot_be_downgraded() {
        let mut policy = DiagnosticPolicy::default();
        policy
            .overrides
            .insert("missing-template".to_string(), Policy::Ignore);

        assert_eq!(policy.resolve(DiagnosticCode::MISSING_TEMPLATE), Policy::Fatal);
    }

    #[test]
    fn checkpoint_scopes_recent_diagnostics() {
        let mut sink = DiagnosticSink::default();
        sink.report(Diagnostic::new(DiagnosticCode::NO_IMAGE_SRC, "first"))
            .expect("warn");
        sink.checkpoint();
        sink.report(Diagnostic::new(DiagnosticCode::BAD_IMAGE_SRC, "second"))
            .expect("warn");

        let recent = sink.since_checkpoint();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].message, "second");
    }

    #[test]
    fn lookup_accepts_short_and_qualified_keys() {
        assert_eq!(
            DiagnosticCode::lookup("bad-image-src"),
            Some(DiagnosticCode::BAD_IMAGE_SRC)
        );
        assert_eq!(
            DiagnosticCode::lookup("html-formatter.no-image-src"),
            Some(DiagnosticCode::NO_IMAGE_SRC)
        );
        assert_eq!(DiagnosticCode::lookup("nope"), None);
    }
}
