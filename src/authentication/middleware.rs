use warp::{reject::Rejection, Filter};

use crate::{
    actions::users::get_user_by_id, config::Config, error::ApiError, state::State, AUTH_SCHEMES,
};

use super::jwt::{verify_jwt_session, SessionData};

/// Pulls the token out of an `Authorization: <scheme> <token>` header.
pub fn parse_authorization(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    let token = token.trim();

    if token.is_empty() || !AUTH_SCHEMES.iter().any(|s| s.eq_ignore_ascii_case(scheme)) {
        return None;
    }
    Some(token)
}

/// Checks the token alone. The account behind it is looked up by [`load_session`].
pub fn authenticate(header: Option<&str>, config: &Config) -> Result<SessionData, ApiError> {
    let header = header.ok_or_else(|| {
        ApiError::Unauthorized(String::from(
            "Authentication credentials were not provided.",
        ))
    })?;
    let token = parse_authorization(header)
        .ok_or_else(|| ApiError::InvalidSession(String::from("Invalid token header.")))?;

    verify_jwt_session(token, config).map(SessionData::from)
}

/// Session of a still active account, with the role taken from its current row.
pub async fn load_session(header: Option<&str>, state: &State) -> Result<SessionData, ApiError> {
    let claims = authenticate(header, &state.config)?;

    match get_user_by_id(&state.pool, claims.user_id).await? {
        Some(user) if user.is_active => Ok(SessionData::from(&user)),
        _ => Err(ApiError::Unauthorized(String::from(
            "User inactive or deleted.",
        ))),
    }
}

pub fn with_session(state: State) -> impl Filter<Extract = (SessionData,), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization").and_then(move |header: Option<String>| {
        let state = state.clone();
        async move {
            load_session(header.as_deref(), &state).await.map_err(|e| {
                log::debug!("Rejected session: {e}");
                Rejection::from(e)
            })
        }
    })
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("Token abc", Some("abc"))]
    #[case("bearer abc", Some("abc"))]
    #[case("Basic abc", None)]
    #[case("Token ", None)]
    #[case("abc", None)]
    fn authorization_header(#[case] header: &str, #[case] token: Option<&str>) {
        assert_eq!(parse_authorization(header), token);
    }

    #[test]
    fn missing_header_is_unauthorized() {
        assert!(matches!(
            authenticate(None, &Config::default()),
            Err(ApiError::Unauthorized(_))
        ));
    }

    #[test]
    fn garbage_token_is_an_invalid_session() {
        assert!(matches!(
            authenticate(Some("Token nope"), &Config::default()),
            Err(ApiError::InvalidSession(_))
        ));
    }
}
