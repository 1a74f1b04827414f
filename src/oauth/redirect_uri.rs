//! Redirect URI transport-security policy.
//!
//! Applied both when a client is registered (seed file) and when an
//! authorization request supplies an explicit `redirect_uri`.

use thiserror::Error;
use url::Url;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RedirectUriError {
    #[error("The redirect URL must not contain a fragment component.")]
    FragmentPresent,

    #[error("The redirect URL may only use `http` when the host is `localhost`.")]
    InsecureTransport,

    #[error(
        "The redirect URL scheme `{0}` is not a valid private-use scheme; \
         it must be in reverse domain name notation (e.g. `com.example.app`)."
    )]
    MalformedPrivateUseScheme(String),
}

/// Validate a redirect URI against the transport-security policy.
///
/// Allowed forms:
/// - `https` on any host
/// - `http` only when the host is `localhost` (loopback development clients)
/// - private-use schemes in reverse domain name notation (RFC 8252 §7.1),
///   at least two non-empty dot-separated labels
///
/// Fragments are rejected on every form.
pub fn validate_redirect_uri(uri: &Url) -> Result<(), RedirectUriError> {
    if uri.fragment().is_some() {
        return Err(RedirectUriError::FragmentPresent);
    }

    match uri.scheme() {
        "https" => Ok(()),
        "http" => {
            if uri.host_str() == Some("localhost") {
                Ok(())
            } else {
                Err(RedirectUriError::InsecureTransport)
            }
        }
        scheme => {
            let labels: Vec<&str> = scheme.split('.').collect();
            if labels.len() >= 2 && labels.iter().all(|l| !l.is_empty()) {
                Ok(())
            } else {
                Err(RedirectUriError::MalformedPrivateUseScheme(
                    scheme.to_string(),
                ))
            }
        }
    }
}
