use rocket::http::Status;
use rocket::response::{self, Responder};
use rocket::serde::json::{json, Json};
use rocket::Request;
use thiserror::Error;
use tracing::error;

/// Everything a handler can surface. Wire bodies are always
/// `{"error": <message>}` with a human-readable message.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("{0}")]
    BadRequest(&'static str),

    #[error("{msg}")]
    Internal {
        msg: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

impl ApiError {
    /// Wraps a storage or upstream fault behind a fixed wire message, for use
    /// with `map_err`. The cause is logged when the response is rendered.
    pub fn internal<E>(msg: &'static str) -> impl FnOnce(E) -> Self
    where
        E: Into<anyhow::Error>,
    {
        move |source| Self::Internal {
            msg,
            source: source.into(),
        }
    }
}

impl<'r> Responder<'r, 'static> for ApiError {
    fn respond_to(self, request: &'r Request<'_>) -> response::Result<'static> {
        let status = match &self {
            Self::Unauthorized => Status::Unauthorized,
            Self::BadRequest(_) => Status::BadRequest,
            Self::Internal { msg, source } => {
                error!(cause = %source, "{msg}");
                Status::InternalServerError
            }
        };
        let mut response = Json(json!({ "error": self.to_string() })).respond_to(request)?;
        response.set_status(status);
        Ok(response)
    }
}
