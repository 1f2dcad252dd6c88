use super::AccessScope;
use crate::errors::{BackendError, BackendErrorKind};
use base64::Engine;
use base64::prelude::BASE64_URL_SAFE_NO_PAD;
use chrono::{Duration, Utc};
use ring::signature::RsaKeyPair;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

/// Where the service account key comes from. Read again on every request.
#[derive(Clone, PartialEq, Eq)]
pub enum CredentialSource {
    File(PathBuf),
    Inline(String),
}

impl fmt::Debug for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => f.debug_tuple("File").field(path).finish(),
            Self::Inline(_) => f.write_str("Inline(<redacted>)"),
        }
    }
}

impl CredentialSource {
    pub async fn load(&self) -> Result<ServiceAccount, BackendError> {
        match self {
            Self::File(path) => {
                let text = tokio::fs::read_to_string(path).await.map_err(|e| {
                    BackendError::new(
                        BackendErrorKind::Auth,
                        format!(
                            "failed to read service account file {}: {e}",
                            path.display()
                        ),
                    )
                })?;
                ServiceAccount::try_from_str(&text)
            }
            Self::Inline(text) => ServiceAccount::try_from_str(text),
        }
    }
}

#[derive(Clone, Deserialize)]
pub struct ServiceAccount {
    pub client_email: String,
    private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub private_key_id: Option<String>,
}

#[derive(Serialize)]
struct JwtHeader<'a> {
    alg: &'static str,
    typ: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    kid: Option<&'a str>,
}

#[derive(Serialize)]
struct JwtClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    exp: i64,
    iat: i64,
}

#[derive(Debug, Deserialize)]
pub struct AccessToken {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: u64,
}

impl fmt::Debug for ServiceAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccount")
            .field("client_email", &self.client_email)
            .field("token_uri", &self.token_uri)
            .field("project_id", &self.project_id)
            .finish_non_exhaustive()
    }
}

impl ServiceAccount {
    pub fn try_from_str(input: &str) -> Result<Self, BackendError> {
        serde_json::from_str(input).map_err(|e| {
            BackendError::new(
                BackendErrorKind::Auth,
                format!("failed to parse service account key: {e}"),
            )
        })
    }

    /// Build and sign the RS256 assertion for `scope`.
    pub fn signed_assertion(&self, scope: AccessScope) -> Result<String, BackendError> {
        let now = Utc::now();
        let claims = JwtClaims {
            iss: &self.client_email,
            scope: scope.oauth_scope(),
            aud: &self.token_uri,
            iat: now.timestamp(),
            exp: (now + Duration::hours(1)).timestamp(),
        };
        let header = JwtHeader {
            alg: "RS256",
            typ: "JWT",
            kid: self.private_key_id.as_deref(),
        };

        let header_b64 = BASE64_URL_SAFE_NO_PAD.encode(encode_json(&header)?);
        let claims_b64 = BASE64_URL_SAFE_NO_PAD.encode(encode_json(&claims)?);
        let signing_input = format!("{header_b64}.{claims_b64}");

        let key_pair = self.key_pair()?;
        let mut signature = vec![0; key_pair.public().modulus_len()];
        key_pair
            .sign(
                &ring::signature::RSA_PKCS1_SHA256,
                &ring::rand::SystemRandom::new(),
                signing_input.as_bytes(),
                &mut signature,
            )
            .map_err(|_| auth_error("failed to sign service account assertion"))?;

        Ok(format!(
            "{signing_input}.{}",
            BASE64_URL_SAFE_NO_PAD.encode(&signature)
        ))
    }

    fn key_pair(&self) -> Result<RsaKeyPair, BackendError> {
        let mut reader = std::io::Cursor::new(self.private_key.as_bytes());
        let item = rustls_pemfile::read_one(&mut reader)
            .map_err(|_| auth_error("invalid PEM private key"))?;
        match item {
            Some(rustls_pemfile::Item::Pkcs8Key(der)) => {
                RsaKeyPair::from_pkcs8(der.secret_pkcs8_der())
                    .map_err(|_| auth_error("invalid PKCS#8 RSA private key"))
            }
            Some(rustls_pemfile::Item::Pkcs1Key(der)) => {
                RsaKeyPair::from_der(der.secret_pkcs1_der())
                    .map_err(|_| auth_error("invalid PKCS#1 RSA private key"))
            }
            _ => Err(auth_error("service account key has no RSA private key")),
        }
    }

    /// Exchange a fresh assertion for a short-lived access token.
    pub async fn fetch_access_token(
        &self,
        client: &reqwest::Client,
        scope: AccessScope,
    ) -> Result<AccessToken, BackendError> {
        let assertion = self.signed_assertion(scope)?;
        let params = [("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())];

        tracing::debug!(token_uri = %self.token_uri, "requesting access token");
        let response = client
            .post(&self.token_uri)
            .form(&params)
            .send()
            .await
            .map_err(|e| BackendError::new(BackendErrorKind::Network, e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| BackendError::new(BackendErrorKind::Network, e.to_string()))?;
        if !status.is_success() {
            return Err(BackendError::new(
                BackendErrorKind::Auth,
                format!("token exchange failed ({status}): {body}"),
            ));
        }
        serde_json::from_str(&body)
            .map_err(|e| auth_error(&format!("unexpected token response: {e}")))
    }
}

fn encode_json<T: Serialize>(value: &T) -> Result<String, BackendError> {
    serde_json::to_string(value).map_err(|e| auth_error(&format!("failed to encode jwt: {e}")))
}

fn auth_error(message: &str) -> BackendError {
    BackendError::new(BackendErrorKind::Auth, message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_key_with_default_token_uri() {
        let account = ServiceAccount::try_from_str(
            r#"{"client_email":"bot@example.iam.gserviceaccount.com","private_key":"x"}"#,
        )
        .unwrap();
        assert_eq!(account.client_email, "bot@example.iam.gserviceaccount.com");
        assert_eq!(account.token_uri, DEFAULT_TOKEN_URI);
        assert_eq!(account.project_id, None);
    }

    #[test]
    fn malformed_key_is_an_auth_error() {
        let err = ServiceAccount::try_from_str("{not json").unwrap_err();
        assert_eq!(err.kind(), BackendErrorKind::Auth);
        let err = ServiceAccount::try_from_str(r#"{"private_key":"x"}"#).unwrap_err();
        assert!(err.message().contains("client_email"));
    }

    #[test]
    fn non_pem_private_key_fails_before_any_request() {
        let account = ServiceAccount::try_from_str(
            r#"{"client_email":"a@b","private_key":"not a pem block"}"#,
        )
        .unwrap();
        let err = account.signed_assertion(AccessScope::ReadOnly).unwrap_err();
        assert_eq!(err.kind(), BackendErrorKind::Auth);
    }

    #[tokio::test]
    async fn missing_file_reports_path() {
        let source = CredentialSource::File(PathBuf::from("/nonexistent/key.json"));
        let err = source.load().await.unwrap_err();
        assert_eq!(err.kind(), BackendErrorKind::Auth);
        assert!(err.message().contains("/nonexistent/key.json"));
    }
}
