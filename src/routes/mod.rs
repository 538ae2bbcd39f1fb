use std::convert::Infallible;

use serde::Serialize;
use warp::{
    filters::body::BodyDeserializeError,
    http::StatusCode,
    reject::{
        InvalidHeader, InvalidQuery, LengthRequired, MethodNotAllowed, MissingHeader,
        PayloadTooLarge, UnsupportedMediaType,
    },
    reply::Response,
    Filter, Rejection, Reply,
};

use crate::{
    error::{ApiError, ErrorBody},
    form::Form,
    state::State,
    MAX_JSON_SIZE,
};

pub mod admin;
pub mod attributes;
pub mod recipes;
pub mod users;

pub fn with_state(state: State) -> impl Filter<Extract = (State,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

pub fn json_body() -> impl Filter<Extract = (Form,), Error = Rejection> + Clone {
    warp::body::content_length_limit(MAX_JSON_SIZE)
        .and(warp::body::json())
        .map(Form::from_data)
}

pub fn json_reply<T: Serialize>(body: &T, status: StatusCode) -> Response {
    warp::reply::with_status(warp::reply::json(body), status).into_response()
}

pub fn empty_reply(status: StatusCode) -> Response {
    warp::reply::with_status(warp::reply(), status).into_response()
}

/// Every endpoint, with errors rendered as JSON and requests logged.
pub fn routes(state: State) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    users::routes(state.clone())
        .or(recipes::routes(state.clone()))
        .unify()
        .or(attributes::routes(state.clone()))
        .unify()
        .or(admin::routes(state))
        .unify()
        .recover(handle_rejection)
        .unify()
        .with(warp::log("recipe_api"))
}

fn detail(status: StatusCode, detail: &str) -> (StatusCode, ErrorBody) {
    (
        status,
        ErrorBody::Detail {
            detail: detail.to_string(),
        },
    )
}

pub async fn handle_rejection(err: Rejection) -> Result<Response, Infallible> {
    let (status, body) = if let Some(e) = err.find::<ApiError>() {
        if e.status().is_server_error() {
            log::error!("{e}");
        }
        (e.status(), e.body())
    } else if err.is_not_found() {
        detail(StatusCode::NOT_FOUND, "Not found.")
    } else if let Some(e) = err.find::<BodyDeserializeError>() {
        detail(StatusCode::BAD_REQUEST, &format!("JSON parse error - {e}"))
    } else if err.find::<InvalidQuery>().is_some() {
        detail(StatusCode::BAD_REQUEST, "Invalid query string.")
    } else if let Some(e) = err.find::<MissingHeader>() {
        detail(StatusCode::BAD_REQUEST, &e.to_string())
    } else if let Some(e) = err.find::<InvalidHeader>() {
        detail(StatusCode::BAD_REQUEST, &e.to_string())
    } else if err.find::<UnsupportedMediaType>().is_some() {
        detail(StatusCode::UNSUPPORTED_MEDIA_TYPE, "Unsupported media type in request.")
    } else if err.find::<PayloadTooLarge>().is_some() {
        detail(StatusCode::PAYLOAD_TOO_LARGE, "Request body is too large.")
    } else if err.find::<LengthRequired>().is_some() {
        detail(StatusCode::LENGTH_REQUIRED, "Content-Length header is required.")
    } else if err.find::<MethodNotAllowed>().is_some() {
        detail(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed.")
    } else {
        log::error!("Unhandled rejection: {err:?}");
        detail(StatusCode::INTERNAL_SERVER_ERROR, "A server error occurred.")
    };

    Ok(json_reply(&body, status))
}
