//! Authentication and authorization.
//!
//! Authentication extracts a subject from the peer's verified client
//! certificate; authorization is a separate flat ACL keyed on
//! `(subject, object, action)`. Both run before any `LogError` is possible,
//! so an `AuthError` always wins a race against a storage error.

use std::collections::HashSet;
use std::path::Path;

use thiserror::Error;
use tonic::Request;

pub const OBJECT_WILDCARD: &str = "*";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("no transport security being used")]
    Unauthenticated,
    #[error("couldn't find peer info")]
    Unknown,
    #[error("{subject} not permitted to {action} to {object}")]
    PermissionDenied {
        subject: String,
        object: String,
        action: String,
    },
}

impl From<AuthError> for tonic::Status {
    fn from(err: AuthError) -> Self {
        use crate::error::localized_status;
        match err {
            AuthError::Unauthenticated => localized_status(tonic::Code::Unauthenticated, err.to_string()),
            AuthError::Unknown => localized_status(tonic::Code::Unknown, err.to_string()),
            AuthError::PermissionDenied { .. } => {
                localized_status(tonic::Code::PermissionDenied, err.to_string())
            }
        }
    }
}

/// Extracts the subject (client certificate CommonName) from a request's
/// peer certificates. A request with no peer info at all is `Unknown`; one
/// with peer info but no certificates (no TLS, or TLS without client auth)
/// is `Unauthenticated`.
pub fn subject<T>(request: &Request<T>) -> Result<String, AuthError> {
    let certs = request
        .peer_certs()
        .ok_or(AuthError::Unknown)?;
    let cert = certs.first().ok_or(AuthError::Unauthenticated)?;
    common_name(cert.as_ref()).ok_or(AuthError::Unauthenticated)
}

fn common_name(der: &[u8]) -> Option<String> {
    let (_, cert) = x509_parser::parse_x509_certificate(der).ok()?;
    cert.subject()
        .iter_common_name()
        .next()
        .and_then(|cn| cn.as_str().ok())
        .map(str::to_string)
}

pub trait Authorizer: Send + Sync {
    fn authorize(&self, subject: &str, object: &str, action: &str) -> Result<(), AuthError>;
}

/// A flat ACL loaded from a policy file: one `subject,action` row per
/// line, `#`-prefixed lines ignored. `*` matches any subject or action.
/// Every action in this service is performed against the single wildcard
/// object, so the object component isn't part of the policy file.
pub struct FileAuthorizer {
    rows: HashSet<(String, String)>,
}

impl FileAuthorizer {
    pub fn load(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let rows = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .filter_map(|line| {
                let mut fields = line.splitn(2, ',').map(str::trim);
                Some((fields.next()?.to_string(), fields.next()?.to_string()))
            })
            .collect();
        Ok(Self { rows })
    }
}

impl Authorizer for FileAuthorizer {
    fn authorize(&self, subject: &str, _object: &str, action: &str) -> Result<(), AuthError> {
        let allowed = self
            .rows
            .iter()
            .any(|(s, a)| (s == subject || s == OBJECT_WILDCARD) && (a == action || a == OBJECT_WILDCARD));
        if allowed {
            Ok(())
        } else {
            Err(AuthError::PermissionDenied {
                subject: subject.to_string(),
                object: _object.to_string(),
                action: action.to_string(),
            })
        }
    }
}
