//! Deployment environment and subject decoration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Deployment environment a mailer runs in.
///
/// Every environment except [`Production`](Self::Production) tags outgoing
/// subjects so test mail is recognisable in an inbox.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Environment {
    /// Developer machine. Also the fallback for unknown values.
    #[default]
    LocalDev,
    /// Shared development deployment.
    Development,
    /// Test or QA deployment.
    Test,
    /// Production: subjects are sent unchanged.
    Production,
}

impl Environment {
    /// Resolves a raw configuration value, falling back to
    /// [`LocalDev`](Self::LocalDev) when it is missing or unrecognised.
    #[must_use]
    pub fn resolve(raw: Option<&str>) -> Self {
        raw.and_then(|value| value.parse().ok()).unwrap_or_default()
    }

    /// Returns the display label, identical to the variant name.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::LocalDev => "LocalDev",
            Self::Development => "Development",
            Self::Test => "Test",
            Self::Production => "Production",
        }
    }

    /// Applies the environment marker to a subject line.
    #[must_use]
    pub fn decorate_subject(self, subject: &str) -> String {
        match self {
            Self::LocalDev | Self::Development | Self::Test => {
                format!("{subject} on {}", self.label())
            }
            Self::Production => subject.to_string(),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Error returned when parsing an unknown environment name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown environment: {0}")]
pub struct UnknownEnvironment(pub String);

impl FromStr for Environment {
    type Err = UnknownEnvironment;

    /// Parses an environment name, ignoring case and surrounding whitespace.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        [Self::LocalDev, Self::Development, Self::Test, Self::Production]
            .into_iter()
            .find(|env| env.label().eq_ignore_ascii_case(name))
            .ok_or_else(|| UnknownEnvironment(name.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_decorate_subject() {
        assert_eq!(
            Environment::LocalDev.decorate_subject("Email Test"),
            "Email Test on LocalDev"
        );
        assert_eq!(
            Environment::Development.decorate_subject("Email Test"),
            "Email Test on Development"
        );
        assert_eq!(
            Environment::Test.decorate_subject("Email Test"),
            "Email Test on Test"
        );
        assert_eq!(
            Environment::Production.decorate_subject("Email Test"),
            "Email Test"
        );
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("production".parse::<Environment>().unwrap(), Environment::Production);
        assert_eq!(" DEVELOPMENT ".parse::<Environment>().unwrap(), Environment::Development);
        assert_eq!("localdev".parse::<Environment>().unwrap(), Environment::LocalDev);
    }

    #[test]
    fn test_unknown_values_resolve_to_local_dev() {
        assert_eq!(Environment::resolve(Some("Staging")), Environment::LocalDev);
        assert_eq!(Environment::resolve(Some("")), Environment::LocalDev);
        assert_eq!(Environment::resolve(None), Environment::LocalDev);
        assert_eq!(Environment::resolve(Some("Test")), Environment::Test);
    }

    #[test]
    fn test_unknown_environment_error() {
        let err = "Staging".parse::<Environment>().unwrap_err();
        assert_eq!(err.to_string(), "Unknown environment: Staging");
    }

    #[test]
    fn test_display_matches_label() {
        assert_eq!(Environment::Production.to_string(), "Production");
    }
}
