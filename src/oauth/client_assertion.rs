//! Private-key JWT client authentication (RFC 7523).
//!
//! Confidential clients authenticate to the token endpoint with a signed JWT
//! assertion instead of a shared secret. The assertion's subject selects the
//! client record; the signature is then verified against that client's
//! registered public key. Every verification failure collapses into the same
//! `invalid_grant` rejection so the endpoint does not leak which check failed.

use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::ApiError;
use crate::oauth::types::Client;

/// Required value of `client_assertion_type` for JWT bearer assertions.
pub const JWT_BEARER_ASSERTION_TYPE: &str =
    "urn:ietf:params:oauth:client-assertion-type:jwt-bearer";

/// Claims carried by a client assertion JWT.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientAssertionClaims {
    /// Issuer, must equal the subject
    pub iss: String,
    /// Subject, must equal the authenticating client's identifier
    pub sub: String,
    /// Audience, must equal the server identity (external base URL)
    pub aud: String,
    /// Expiration as a Unix timestamp, must be in the future
    pub exp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nbf: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
}

/// The single rejection returned for any assertion failure.
pub fn assertion_rejected() -> ApiError {
    ApiError::invalid_grant("The provided JWT is not a valid form of client authentication.")
}

/// Extract the `sub` claim without verifying the signature.
///
/// Used only to look up the client record whose registered key will verify
/// the assertion; never trusted on its own.
pub fn extract_subject_unverified(assertion: &str) -> Result<Uuid, ApiError> {
    use base64::prelude::*;

    let parts: Vec<&str> = assertion.split('.').collect();
    if parts.len() != 3 {
        return Err(assertion_rejected());
    }

    let payload = BASE64_URL_SAFE_NO_PAD
        .decode(parts[1])
        .map_err(|_| assertion_rejected())?;

    #[derive(Deserialize)]
    struct MinimalClaims {
        #[serde(default)]
        sub: Option<String>,
    }

    let claims: MinimalClaims =
        serde_json::from_slice(&payload).map_err(|_| assertion_rejected())?;

    claims
        .sub
        .as_deref()
        .and_then(|sub| Uuid::parse_str(sub).ok())
        .ok_or_else(assertion_rejected)
}

/// Verify a client assertion against a client's registered public key.
///
/// Checks, in order: the client has a registered key, the JWT header names a
/// supported asymmetric algorithm, the signature verifies, `aud` matches the
/// server identity, `exp` is in the future (enforced by the decoder),
/// `iss == sub`, and `sub` is the client's identifier.
pub fn verify_client_assertion(
    assertion: &str,
    client: &Client,
    audience: &str,
) -> Result<ClientAssertionClaims, ApiError> {
    let public_key_pem = client
        .client_public_key
        .as_deref()
        .ok_or_else(assertion_rejected)?;

    let header = jsonwebtoken::decode_header(assertion).map_err(|err| {
        tracing::debug!(error = %err, "client assertion header rejected");
        assertion_rejected()
    })?;

    let decoding_key = decoding_key_for(header.alg, public_key_pem)?;

    // `exp` presence and freshness are enforced by the decoder; `iss`, `sub`,
    // and `aud` presence by the claims type itself.
    let mut validation = Validation::new(header.alg);
    validation.set_audience(&[audience]);

    let token_data =
        jsonwebtoken::decode::<ClientAssertionClaims>(assertion, &decoding_key, &validation)
            .map_err(|err| {
                tracing::debug!(error = %err, "client assertion verification failed");
                assertion_rejected()
            })?;

    let claims = token_data.claims;

    if claims.iss != claims.sub {
        return Err(assertion_rejected());
    }
    if claims.sub != client.client_id.to_string() {
        return Err(assertion_rejected());
    }

    Ok(claims)
}

/// Build a decoding key for the algorithm family named in the JWT header.
/// Symmetric algorithms are never acceptable for client assertions.
fn decoding_key_for(algorithm: Algorithm, public_key_pem: &str) -> Result<DecodingKey, ApiError> {
    let key = match algorithm {
        Algorithm::RS256
        | Algorithm::RS384
        | Algorithm::RS512
        | Algorithm::PS256
        | Algorithm::PS384
        | Algorithm::PS512 => DecodingKey::from_rsa_pem(public_key_pem.as_bytes()),
        Algorithm::ES256 | Algorithm::ES384 => DecodingKey::from_ec_pem(public_key_pem.as_bytes()),
        Algorithm::EdDSA => DecodingKey::from_ed_pem(public_key_pem.as_bytes()),
        Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => {
            return Err(assertion_rejected());
        }
    };
    key.map_err(|err| {
        tracing::debug!(error = %err, "registered client public key rejected");
        assertion_rejected()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oauth::types::ClientType;
    use chrono::Utc;
    use jsonwebtoken::{EncodingKey, Header};
    use rsa::RsaPrivateKey;
    use rsa::pkcs8::{EncodePrivateKey, EncodePublicKey, LineEnding};

    const AUDIENCE: &str = "https://auth.example";

    fn generate_keypair() -> (String, String) {
        let mut rng = rand::thread_rng();
        let private_key = RsaPrivateKey::new(&mut rng, 2048).unwrap();
        let public_key = private_key.to_public_key();
        (
            private_key.to_pkcs8_pem(LineEnding::LF).unwrap().to_string(),
            public_key.to_public_key_pem(LineEnding::LF).unwrap(),
        )
    }

    fn confidential_client(public_key_pem: &str) -> Client {
        Client {
            client_id: Uuid::new_v4(),
            client_type: ClientType::Confidential,
            client_public_key: Some(public_key_pem.to_string()),
            redirect_uris: vec![url::Url::parse("https://app.example/cb").unwrap()],
        }
    }

    fn sign_assertion(claims: &ClientAssertionClaims, private_key_pem: &str) -> String {
        let key = EncodingKey::from_rsa_pem(private_key_pem.as_bytes()).unwrap();
        jsonwebtoken::encode(&Header::new(Algorithm::RS256), claims, &key).unwrap()
    }

    fn claims_for(client: &Client) -> ClientAssertionClaims {
        let id = client.client_id.to_string();
        ClientAssertionClaims {
            iss: id.clone(),
            sub: id,
            aud: AUDIENCE.to_string(),
            exp: Utc::now().timestamp() + 300,
            iat: Some(Utc::now().timestamp()),
            nbf: None,
            jti: Some(Uuid::new_v4().to_string()),
        }
    }

    #[test]
    fn test_valid_assertion_accepted() {
        let (private_pem, public_pem) = generate_keypair();
        let client = confidential_client(&public_pem);
        let assertion = sign_assertion(&claims_for(&client), &private_pem);

        let claims = verify_client_assertion(&assertion, &client, AUDIENCE).unwrap();
        assert_eq!(claims.sub, client.client_id.to_string());
    }

    #[test]
    fn test_wrong_audience_rejected() {
        let (private_pem, public_pem) = generate_keypair();
        let client = confidential_client(&public_pem);
        let mut claims = claims_for(&client);
        claims.aud = "https://other.example".to_string();
        let assertion = sign_assertion(&claims, &private_pem);

        assert!(verify_client_assertion(&assertion, &client, AUDIENCE).is_err());
    }

    #[test]
    fn test_issuer_subject_mismatch_rejected() {
        let (private_pem, public_pem) = generate_keypair();
        let client = confidential_client(&public_pem);
        let mut claims = claims_for(&client);
        claims.iss = Uuid::new_v4().to_string();
        let assertion = sign_assertion(&claims, &private_pem);

        assert!(verify_client_assertion(&assertion, &client, AUDIENCE).is_err());
    }

    #[test]
    fn test_wrong_key_rejected() {
        let (private_pem, _) = generate_keypair();
        let (_, other_public_pem) = generate_keypair();
        let client = confidential_client(&other_public_pem);
        let assertion = sign_assertion(&claims_for(&client), &private_pem);

        assert!(verify_client_assertion(&assertion, &client, AUDIENCE).is_err());
    }

    #[test]
    fn test_expired_assertion_rejected() {
        let (private_pem, public_pem) = generate_keypair();
        let client = confidential_client(&public_pem);
        let mut claims = claims_for(&client);
        claims.exp = Utc::now().timestamp() - 300;
        let assertion = sign_assertion(&claims, &private_pem);

        assert!(verify_client_assertion(&assertion, &client, AUDIENCE).is_err());
    }

    #[test]
    fn test_symmetric_algorithm_rejected() {
        let (_, public_pem) = generate_keypair();
        let client = confidential_client(&public_pem);
        let id = client.client_id.to_string();
        let claims = claims_for(&client);
        let assertion = jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(id.as_bytes()),
        )
        .unwrap();

        assert!(verify_client_assertion(&assertion, &client, AUDIENCE).is_err());
    }

    #[test]
    fn test_extract_subject_unverified() {
        let (private_pem, public_pem) = generate_keypair();
        let client = confidential_client(&public_pem);
        let assertion = sign_assertion(&claims_for(&client), &private_pem);

        assert_eq!(
            extract_subject_unverified(&assertion).unwrap(),
            client.client_id
        );
    }

    #[test]
    fn test_extract_subject_rejects_garbage() {
        assert!(extract_subject_unverified("not-a-jwt").is_err());
        assert!(extract_subject_unverified("a.b.c").is_err());
    }
}
