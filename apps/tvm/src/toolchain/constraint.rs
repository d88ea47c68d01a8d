//! Version values and version constraints.
//!
//! Versions are strict semantic versions ([`semver::Version`]). Constraints
//! use the comparator syntax Terraform projects declare in `required_version`:
//!
//! ```text
//! >= 0.13.0, < 1.0.0
//! ~> 1.2
//! = 1.5.7
//! 1.5.7
//! != 1.4.0, >= 1.3
//! ```
//!
//! Clauses are comma-separated and all of them must hold. Versions inside a
//! constraint may omit minor and patch components.

use std::cmp::Ordering;
use std::fmt;

pub use semver::Version;

use crate::errors::{Result, TvmError};

/// Parses a version string strictly; malformed input is rejected.
///
/// # Errors
///
/// Returns [`TvmError::Parse`] if `input` is not a valid semantic version.
pub fn parse_version(input: &str) -> Result<Version> {
    Version::parse(input.trim())
        .map_err(|e| TvmError::parse(format!("invalid version '{input}': {e}")))
}

/// Comparison operator of a single clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operator {
    Equal,
    NotEqual,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,
    Pessimistic,
}

impl Operator {
    // Longest prefixes first so ">=" is not read as ">".
    const PREFIXES: [(&'static str, Self); 7] = [
        ("~>", Self::Pessimistic),
        (">=", Self::GreaterEqual),
        ("<=", Self::LessEqual),
        ("!=", Self::NotEqual),
        (">", Self::Greater),
        ("<", Self::Less),
        ("=", Self::Equal),
    ];

    fn split(clause: &str) -> (Self, &str) {
        for (prefix, op) in Self::PREFIXES {
            if let Some(rest) = clause.strip_prefix(prefix) {
                return (op, rest);
            }
        }
        (Self::Equal, clause)
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Equal => "=",
            Self::NotEqual => "!=",
            Self::Greater => ">",
            Self::GreaterEqual => ">=",
            Self::Less => "<",
            Self::LessEqual => "<=",
            Self::Pessimistic => "~>",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Clause {
    op: Operator,
    version: Version,
    /// Number of numeric components written in the clause (1 to 3).
    precision: usize,
}

impl Clause {
    fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(TvmError::parse("empty constraint clause"));
        }

        let (op, rest) = Operator::split(trimmed);
        let raw = rest.trim();
        let raw = raw.strip_prefix('v').unwrap_or(raw);

        let core_end = raw.find(['-', '+']).unwrap_or(raw.len());
        let (core, suffix) = raw.split_at(core_end);
        let components: Vec<&str> = core.split('.').collect();

        if components.is_empty()
            || components.len() > 3
            || components
                .iter()
                .any(|c| c.is_empty() || !c.bytes().all(|b| b.is_ascii_digit()))
        {
            return Err(TvmError::parse(format!(
                "invalid version '{raw}' in constraint clause '{trimmed}'"
            )));
        }

        let precision = components.len();
        let mut padded = components.join(".");
        for _ in precision..3 {
            padded.push_str(".0");
        }
        padded.push_str(suffix);

        let version = Version::parse(&padded).map_err(|e| {
            TvmError::parse(format!("invalid version '{raw}' in constraint '{trimmed}': {e}"))
        })?;

        Ok(Self {
            op,
            version,
            precision,
        })
    }

    fn matches(&self, v: &Version) -> bool {
        if !prerelease_compatible(v, &self.version) {
            return false;
        }

        let ord = precedence(v, &self.version);
        match self.op {
            Operator::Equal => ord == Ordering::Equal,
            Operator::NotEqual => ord != Ordering::Equal,
            Operator::Greater => ord == Ordering::Greater,
            Operator::GreaterEqual => ord != Ordering::Less,
            Operator::Less => ord == Ordering::Less,
            Operator::LessEqual => ord != Ordering::Greater,
            Operator::Pessimistic => self.matches_pessimistic(v, ord),
        }
    }

    fn matches_pessimistic(&self, v: &Version, ord: Ordering) -> bool {
        if self.version.pre.is_empty() != v.pre.is_empty() || ord == Ordering::Less {
            return false;
        }

        let fixed = [self.version.major, self.version.minor, self.version.patch];
        let actual = [v.major, v.minor, v.patch];
        fixed[..self.precision - 1] == actual[..self.precision - 1]
    }
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.op.as_str(), self.version)
    }
}

/// Compares versions by precedence, ignoring build metadata.
fn precedence(a: &Version, b: &Version) -> Ordering {
    (a.major, a.minor, a.patch)
        .cmp(&(b.major, b.minor, b.patch))
        .then_with(|| a.pre.cmp(&b.pre))
}

/// A pre-release version only satisfies clauses that name a pre-release of
/// the same release line.
fn prerelease_compatible(v: &Version, clause: &Version) -> bool {
    match (v.pre.is_empty(), clause.pre.is_empty()) {
        (false, false) => {
            (v.major, v.minor, v.patch) == (clause.major, clause.minor, clause.patch)
        }
        (false, true) => false,
        (true, _) => true,
    }
}

/// A parsed version-acceptance predicate.
///
/// The empty constraint ([`Constraint::any`]) accepts every version,
/// including pre-releases.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Constraint {
    clauses: Vec<Clause>,
}

impl Constraint {
    /// The constraint that accepts any version.
    #[must_use]
    pub fn any() -> Self {
        Self::default()
    }

    /// Parses a comma-separated list of clauses.
    ///
    /// A blank string yields [`Constraint::any`].
    ///
    /// # Errors
    ///
    /// Returns [`TvmError::Parse`] if any clause is malformed.
    pub fn parse(input: &str) -> Result<Self> {
        if input.trim().is_empty() {
            return Ok(Self::any());
        }

        let clauses = input
            .split(',')
            .map(Clause::parse)
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { clauses })
    }

    /// Whether this constraint places no restriction on versions.
    #[must_use]
    pub fn is_any(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Checks a version against every clause.
    #[must_use]
    pub fn matches(&self, version: &Version) -> bool {
        self.clauses.iter().all(|c| c.matches(version))
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.clauses.is_empty() {
            return f.write_str("*");
        }
        for (i, clause) in self.clauses.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{clause}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        parse_version(s).expect("Should parse version")
    }

    fn c(s: &str) -> Constraint {
        Constraint::parse(s).expect("Should parse constraint")
    }

    #[test]
    fn parse_version_accepts_prerelease() {
        let version = v("2.0.0-rc1");
        assert_eq!(version.major, 2);
        assert_eq!(version.pre.as_str(), "rc1");
    }

    #[test]
    fn parse_version_rejects_garbage() {
        let err = parse_version("not-a-version").unwrap_err();
        assert!(matches!(err, TvmError::Parse { .. }));
        assert!(err.to_string().contains("not-a-version"));
    }

    #[test]
    fn blank_constraint_accepts_everything() {
        let any = c("   ");
        assert!(any.is_any());
        assert!(any.matches(&v("0.1.0")));
        assert!(any.matches(&v("1.0.0-beta1")));
    }

    #[test]
    fn range_constraint_with_spaces() {
        let range = c(">= 0.13.0, < 1.0.0");
        assert!(!range.matches(&v("0.12.31")));
        assert!(range.matches(&v("0.13.0")));
        assert!(range.matches(&v("0.15.5")));
        assert!(!range.matches(&v("1.0.0")));
    }

    #[test]
    fn bare_version_means_exact() {
        let exact = c("1.5.7");
        assert!(exact.matches(&v("1.5.7")));
        assert!(!exact.matches(&v("1.5.8")));
    }

    #[test]
    fn partial_versions_are_padded() {
        let ge = c(">= 1.2");
        assert!(ge.matches(&v("1.2.0")));
        assert!(!ge.matches(&v("1.1.9")));
    }

    #[test]
    fn not_equal_excludes_one_version() {
        let ne = c(">= 1.3, != 1.4.0");
        assert!(ne.matches(&v("1.3.5")));
        assert!(!ne.matches(&v("1.4.0")));
        assert!(ne.matches(&v("1.4.1")));
    }

    #[test]
    fn pessimistic_two_components_locks_major() {
        let pess = c("~> 1.2");
        assert!(pess.matches(&v("1.2.0")));
        assert!(pess.matches(&v("1.9.3")));
        assert!(!pess.matches(&v("2.0.0")));
        assert!(!pess.matches(&v("1.1.9")));
    }

    #[test]
    fn pessimistic_three_components_locks_minor() {
        let pess = c("~> 1.2.3");
        assert!(pess.matches(&v("1.2.3")));
        assert!(pess.matches(&v("1.2.10")));
        assert!(!pess.matches(&v("1.3.0")));
        assert!(!pess.matches(&v("1.2.2")));
    }

    #[test]
    fn prerelease_needs_matching_prerelease_clause() {
        assert!(!c(">= 1.0.0").matches(&v("2.0.0-rc1")));
        assert!(c(">= 2.0.0-beta1").matches(&v("2.0.0-rc1")));
        assert!(!c(">= 2.0.0-beta1").matches(&v("2.1.0-rc1")));
        assert!(c(">= 2.0.0-beta1").matches(&v("2.1.0")));
    }

    #[test]
    fn build_metadata_is_ignored_for_equality() {
        assert!(c("= 1.0.0").matches(&v("1.0.0+build.5")));
    }

    #[test]
    fn leading_v_is_accepted_in_clauses() {
        assert!(c(">= v1.0").matches(&v("1.0.0")));
    }

    #[test]
    fn malformed_clauses_are_rejected() {
        for bad in [">= ", "1.2.3.4", ">= abc", "1.0,", "~> 1..2", "=> 1.0"] {
            let err = Constraint::parse(bad).unwrap_err();
            assert!(matches!(err, TvmError::Parse { .. }), "{bad} should fail");
        }
    }

    #[test]
    fn display_normalizes_clauses() {
        assert_eq!(c(">=0.13, <1").to_string(), ">= 0.13.0, < 1.0.0");
        assert_eq!(Constraint::any().to_string(), "*");
    }
}
