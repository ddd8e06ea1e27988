//! Mock identity provider for development and testing.
//!
//! Generates authorization URLs pointing at a fake IdP and decodes mock
//! authorization codes that carry the identity embedded as base64 JSON.

use async_trait::async_trait;
use base64::Engine;
use url::Url;

use questline_core::auth::{
    AuthError, IdentityProviderClient, OidcClaims, OidcProvider, Result,
};

/// Mock provider decoding base64-JSON authorization codes.
pub struct MockProvider {
    provider: OidcProvider,
    idp_url: Url,
    redirect_uri: Url,
}

impl MockProvider {
    pub fn new(provider: OidcProvider, idp_url: Url, redirect_uri: Url) -> Self {
        Self {
            provider,
            idp_url,
            redirect_uri,
        }
    }

    /// Builds a mock authorization code the way the fake IdP would.
    pub fn encode_code(claims: &OidcClaims) -> String {
        let json = serde_json::json!({
            "sub": claims.subject,
            "email": claims.email,
            "name": claims.name,
            "picture": claims.picture,
            "provider": claims.provider,
        });
        base64::engine::general_purpose::STANDARD.encode(json.to_string())
    }
}

#[async_trait]
impl IdentityProviderClient for MockProvider {
    async fn authorization_url(&self, state: &str, _pkce_challenge: &str) -> Result<Url> {
        let path = format!("/{}/authorize", self.provider);

        let mut url = self
            .idp_url
            .join(&path)
            .map_err(|e| AuthError::Provider(e.to_string()))?;

        url.query_pairs_mut()
            .append_pair("state", state)
            .append_pair("redirect_uri", self.redirect_uri.as_str());

        Ok(url)
    }

    async fn exchange_code(&self, code: &str, _pkce_verifier: &str) -> Result<OidcClaims> {
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(code)
            .map_err(|e| AuthError::IdentityExchange(e.to_string()))?;

        let json: serde_json::Value = serde_json::from_slice(&decoded)
            .map_err(|e| AuthError::IdentityExchange(e.to_string()))?;

        let provider: OidcProvider = json["provider"]
            .as_str()
            .unwrap_or("")
            .parse()
            .map_err(|_| {
                AuthError::IdentityExchange("invalid provider in mock code".to_string())
            })?;

        Ok(OidcClaims {
            subject: json["sub"].as_str().unwrap_or("mock-user").to_string(),
            email: json["email"].as_str().map(String::from),
            name: json["name"].as_str().map(String::from),
            picture: json["picture"].as_str().map(String::from),
            provider,
        })
    }

    fn provider(&self) -> OidcProvider {
        self.provider
    }
}
