use rocket::http::CookieJar;
use rocket::State;
use serde::Deserialize;

use crate::db::{self, DbPool};
use crate::error::ApiError;
use crate::models::AuthUser;

pub const SESSION_COOKIE: &str = "session";

/// Profile handed back by the identity service after a code exchange. The id
/// is opaque; it is the only thing the rest of the system keys on.
#[derive(Debug, Deserialize)]
pub struct IdentityUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Deserialize)]
struct RedirectUrlResponse {
    #[serde(rename = "redirectUrl")]
    redirect_url: String,
}

/// Client for the external identity service. All sign-in happens there; this
/// side only exchanges the callback code for a user identity.
pub struct IdentityClient {
    http: reqwest::Client,
    api_url: String,
    api_key: String,
}

impl IdentityClient {
    pub fn new(api_url: String, api_key: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url,
            api_key,
        }
    }

    pub async fn redirect_url(&self, provider: &str) -> reqwest::Result<String> {
        let response: RedirectUrlResponse = self
            .http
            .get(format!("{}/oauth/{provider}/redirect_url", self.api_url))
            .header("x-api-key", &self.api_key)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(response.redirect_url)
    }

    pub async fn exchange_code(&self, code: &str) -> reqwest::Result<IdentityUser> {
        self.http
            .post(format!("{}/sessions", self.api_url))
            .header("x-api-key", &self.api_key)
            .json(&serde_json::json!({ "code": code }))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }
}

/// Resolves the session cookie to a user, rejecting the request before any
/// business logic runs when there is no valid session.
pub fn require_user(pool: &State<DbPool>, cookies: &CookieJar<'_>) -> Result<AuthUser, ApiError> {
    let Some(cookie) = cookies.get(SESSION_COOKIE) else {
        return Err(ApiError::Unauthorized);
    };
    let conn = pool
        .get()
        .map_err(ApiError::internal("Failed to connect to database"))?;
    db::user_by_session(&conn, cookie.value())
        .ok()
        .flatten()
        .ok_or(ApiError::Unauthorized)
}
