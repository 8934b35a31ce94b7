//! Common test utilities for integration tests
//!
//! A wiremock identity provider serving the trusted fixture key set from
//! `casting_auth::test_utils`.

#![allow(dead_code)]

use casting_auth::test_utils::{test_config, trusted_jwks_document};
use casting_auth::{AuthorizationGate, JwksClient, TokenVerifier};
use std::sync::Arc;
use std::time::Duration;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path},
};

pub const JWKS_PATH: &str = "/.well-known/jwks.json";

/// Mock identity provider serving the key set
pub struct MockIdentityProvider {
    pub server: MockServer,
}

impl MockIdentityProvider {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    pub fn jwks_uri(&self) -> String {
        format!("{}{JWKS_PATH}", self.server.uri())
    }

    /// Serve the trusted key set, expecting exactly `times` fetches
    pub async fn serve_jwks(&self, times: u64) {
        Mock::given(method("GET"))
            .and(path(JWKS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(trusted_jwks_document()))
            .expect(times)
            .mount(&self.server)
            .await;
    }

    /// Answer key set requests with `response`
    pub async fn respond_with(&self, response: ResponseTemplate) {
        Mock::given(method("GET"))
            .and(path(JWKS_PATH))
            .respond_with(response)
            .mount(&self.server)
            .await;
    }

    /// Gate whose key set client points at this server
    pub fn gate(&self, cache_ttl: Option<Duration>) -> AuthorizationGate {
        let client =
            JwksClient::with_jwks_uri(self.jwks_uri(), Duration::from_secs(5), cache_ttl).unwrap();
        AuthorizationGate::new(TokenVerifier::new(test_config(), Arc::new(client)))
    }
}
