use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Service-wide error taxonomy. Undefined metrics (zero hours worked) are
/// not represented here; they are `None` rates, not failures.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("{0}")]
    NotFound(&'static str),
    #[error("UNAUTHORIZED")]
    Unauthorized,
    #[error("CONFLICT")]
    Conflict,
    #[error("{0}")]
    InvalidInput(&'static str),
    #[error("{0}")]
    Database(&'static str),
}

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        match self {
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Unauthorized => StatusCode::UNAUTHORIZED,
            Error::Conflict => StatusCode::CONFLICT,
            Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Error::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).body(self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_distinguish_the_taxonomy() {
        assert_eq!(
            Error::NotFound("REQUEST_NOT_FOUND").status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(Error::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(Error::Conflict.status_code(), StatusCode::CONFLICT);
        assert_eq!(
            Error::InvalidInput("PERIOD_END_BEFORE_START").status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn bodies_carry_the_code() {
        assert_eq!(
            Error::NotFound("REQUEST_NOT_FOUND").to_string(),
            "REQUEST_NOT_FOUND"
        );
        assert_eq!(Error::Unauthorized.to_string(), "UNAUTHORIZED");
    }
}
