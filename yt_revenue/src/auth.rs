use std::{fs, io, path::Path};

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use thiserror::Error;

/// Scope required to read estimated revenue and ad metrics.
pub const MONETARY_SCOPE: &str = "https://www.googleapis.com/auth/yt-analytics-monetary.readonly";

/// Startup credential failures. Every variant aborts the run.
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("credential file not found: {0} (regenerate it with the OAuth consent flow)")]
    Missing(String),
    #[error("failed to read credential file {path}")]
    Unreadable {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("credential file {path} is not valid JSON")]
    Malformed {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("credential file has no access token")]
    NoAccessToken,
    #[error("access token expired at {0}")]
    Expired(DateTime<Utc>),
    #[error("credential is missing the monetary analytics scope")]
    MissingMonetaryScope,
}

/// Authorized-user document as written by the OAuth helper.
#[derive(Debug, Deserialize)]
struct TokenFile {
    #[serde(default, alias = "access_token")]
    token: Option<String>,
    #[serde(default)]
    expiry: Option<String>,
    #[serde(default)]
    scopes: Option<Vec<String>>,
}

/// A validated bearer credential. Read-only: nothing here writes back to disk.
#[derive(Clone)]
pub struct Credentials {
    access_token: String,
    pub expires_at: Option<DateTime<Utc>>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

impl Credentials {
    pub fn access_token(&self) -> &str {
        &self.access_token
    }
}

/// Load and validate the credential file. Runs before any query is issued.
pub fn load_credentials(path: &Path, now: DateTime<Utc>) -> Result<Credentials, CredentialError> {
    let display = path.display().to_string();

    let raw = fs::read_to_string(path).map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            CredentialError::Missing(display.clone())
        } else {
            CredentialError::Unreadable {
                path: display.clone(),
                source,
            }
        }
    })?;

    parse_credentials(&raw, now).map_err(|err| match err {
        ParseFailure::Json(source) => CredentialError::Malformed {
            path: display,
            source,
        },
        ParseFailure::Invalid(err) => err,
    })
}

enum ParseFailure {
    Json(serde_json::Error),
    Invalid(CredentialError),
}

fn parse_credentials(raw: &str, now: DateTime<Utc>) -> Result<Credentials, ParseFailure> {
    let file: TokenFile = serde_json::from_str(raw).map_err(ParseFailure::Json)?;

    let access_token = file
        .token
        .filter(|t| !t.trim().is_empty())
        .ok_or(ParseFailure::Invalid(CredentialError::NoAccessToken))?;

    // An unparseable expiry is treated as already expired.
    let expires_at = match file.expiry.as_deref() {
        Some(raw) => Some(parse_expiry(raw).unwrap_or(DateTime::<Utc>::MIN_UTC)),
        None => None,
    };

    if let Some(expiry) = expires_at {
        if expiry <= now {
            return Err(ParseFailure::Invalid(CredentialError::Expired(expiry)));
        }
    }

    if let Some(scopes) = &file.scopes {
        if !scopes.iter().any(|s| s == MONETARY_SCOPE) {
            return Err(ParseFailure::Invalid(CredentialError::MissingMonetaryScope));
        }
    }

    Ok(Credentials {
        access_token,
        expires_at,
    })
}

fn parse_expiry(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    // Naive timestamps are UTC.
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::io::Write;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 10, 1, 12, 0, 0).unwrap()
    }

    fn parse(raw: &str) -> Result<Credentials, CredentialError> {
        parse_credentials(raw, now()).map_err(|e| match e {
            ParseFailure::Json(_) => panic!("unexpected json failure"),
            ParseFailure::Invalid(err) => err,
        })
    }

    #[test]
    fn test_valid_token() {
        let creds = parse(&format!(
            r#"{{"token": "ya29.abc", "expiry": "2024-10-01T13:00:00Z", "scopes": ["{MONETARY_SCOPE}"]}}"#
        ))
        .unwrap();

        assert_eq!(creds.access_token(), "ya29.abc");
        assert_eq!(
            creds.expires_at,
            Some(Utc.with_ymd_and_hms(2024, 10, 1, 13, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_access_token_alias_and_naive_expiry() {
        let creds =
            parse(r#"{"access_token": "abc", "expiry": "2024-10-02T00:00:00.123456"}"#).unwrap();
        assert_eq!(creds.access_token(), "abc");
        assert!(creds.expires_at.is_some());
    }

    #[test]
    fn test_no_expiry_is_accepted() {
        let creds = parse(r#"{"token": "abc"}"#).unwrap();
        assert!(creds.expires_at.is_none());
    }

    #[test]
    fn test_missing_token() {
        assert!(matches!(
            parse(r#"{"refresh_token": "r"}"#),
            Err(CredentialError::NoAccessToken)
        ));
        assert!(matches!(
            parse(r#"{"token": "  "}"#),
            Err(CredentialError::NoAccessToken)
        ));
    }

    #[test]
    fn test_expired_token() {
        assert!(matches!(
            parse(r#"{"token": "abc", "expiry": "2024-10-01T11:59:59Z"}"#),
            Err(CredentialError::Expired(_))
        ));
        assert!(matches!(
            parse(r#"{"token": "abc", "expiry": "not a date"}"#),
            Err(CredentialError::Expired(_))
        ));
    }

    #[test]
    fn test_missing_monetary_scope() {
        let result = parse(
            r#"{"token": "abc", "scopes": ["https://www.googleapis.com/auth/youtube.readonly"]}"#,
        );
        assert!(matches!(result, Err(CredentialError::MissingMonetaryScope)));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_credentials(&dir.path().join("token.json"), now());
        assert!(matches!(result, Err(CredentialError::Missing(_))));
    }

    #[test]
    fn test_load_malformed_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();

        let result = load_credentials(file.path(), now());
        assert!(matches!(result, Err(CredentialError::Malformed { .. })));
    }

    #[test]
    fn test_debug_redacts_token() {
        let creds = parse(r#"{"token": "secret-token"}"#).unwrap();
        assert!(!format!("{creds:?}").contains("secret-token"));
    }
}
