//! Terminal stage of the request pipeline.
//!
//! Every request ends in one [`Outcome`]: a handler response, an unmatched
//! route, or an error. Panics inside handlers are caught by the
//! `CatchPanicLayer` installed in `routes` and become an internal error here.

use std::any::Any;

use axum::response::{IntoResponse, Response};

use crate::error::AppError;
use crate::logging::panic_message;

/// How a request left the pipeline.
#[derive(Debug)]
pub enum Outcome {
    Handled(Response),
    NotFound,
    Error(AppError),
}

impl IntoResponse for Outcome {
    fn into_response(self) -> Response {
        match self {
            Outcome::Handled(response) => response,
            Outcome::NotFound => AppError::RouteNotFound.into_response(),
            Outcome::Error(err) => err.into_response(),
        }
    }
}

/// Fallback for paths (and methods) no route matches.
pub async fn route_not_found() -> Outcome {
    Outcome::NotFound
}

/// Convert a caught panic into a 500. The payload is logged, never returned.
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic_message(panic.as_ref());
    Outcome::Error(AppError::Internal(format!("handler panicked: {}", detail))).into_response()
}
