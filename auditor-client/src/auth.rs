//! Authentication endpoints
//!
//! These calls only talk to the API. Storing the issued token is the job of
//! the session owner.

use crate::AuditorClient;
use crate::error::Result;
use auditor_core::domain::user::User;
use auditor_core::dto::auth::{AccessToken, Credentials};
use reqwest::Method;

impl AuditorClient {
    /// Exchange credentials for a bearer token
    pub async fn login(&self, credentials: &Credentials) -> Result<AccessToken> {
        let response = self
            .request(Method::POST, "/auth/login")
            .json(credentials)
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Create a new account
    pub async fn register(&self, credentials: &Credentials) -> Result<User> {
        let response = self
            .request(Method::POST, "/auth/register")
            .json(credentials)
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Get the account the current token belongs to
    pub async fn me(&self) -> Result<User> {
        let response = self.request(Method::GET, "/auth/me").send().await?;

        self.handle_response(response).await
    }
}
