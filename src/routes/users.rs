use warp::{filters::BoxedFilter, http::StatusCode, reply::Response, Filter, Rejection};

use crate::{
    actions::users::{create_user, get_user_by_id, login_user, update_user},
    error::ApiError,
    form::Form,
    jwt::SessionData,
    middleware::with_session,
    permissions::ActionType,
    schema::User,
    serializers::{TokenRequest, TokenResponse, UserCreate, UserResponse, UserUpdate},
    state::State,
};

use super::{json_body, json_reply, with_state};

pub fn routes(state: State) -> BoxedFilter<(Response,)> {
    let register_route = warp::path!("user" / "create")
        .and(warp::post())
        .and(with_state(state.clone()))
        .and(json_body())
        .and_then(register);

    let token_route = warp::path!("user" / "token")
        .and(warp::post())
        .and(with_state(state.clone()))
        .and(json_body())
        .and_then(token);

    let profile_route = warp::path!("user" / "me")
        .and(warp::get())
        .and(with_session(state.clone()))
        .and(with_state(state.clone()))
        .and_then(profile);

    let replace_profile_route = warp::path!("user" / "me")
        .and(warp::put())
        .and(with_session(state.clone()))
        .and(with_state(state.clone()))
        .and(json_body())
        .and_then(replace_profile);

    let update_profile_route = warp::path!("user" / "me")
        .and(warp::patch())
        .and(with_session(state.clone()))
        .and(with_state(state))
        .and(json_body())
        .and_then(update_profile);

    register_route
        .or(token_route)
        .unify()
        .or(profile_route)
        .unify()
        .or(replace_profile_route)
        .unify()
        .or(update_profile_route)
        .unify()
        .boxed()
}

async fn register(state: State, form: Form) -> Result<Response, Rejection> {
    let payload: UserCreate = form.parse()?;
    let user = create_user(&payload.email, &payload.password, &payload.name, &state.pool).await?;

    Ok(json_reply(&UserResponse::from(&user), StatusCode::CREATED))
}

async fn token(state: State, form: Form) -> Result<Response, Rejection> {
    let payload: TokenRequest = form.parse()?;
    let token = login_user(&payload.email, &payload.password, &state.config, &state.pool).await?;

    Ok(json_reply(&TokenResponse { token }, StatusCode::OK))
}

async fn session_user(session: &SessionData, state: &State) -> Result<User, ApiError> {
    session.authenticate(ActionType::ManageOwnProfile)?;

    match get_user_by_id(&state.pool, session.user_id).await? {
        Some(user) if user.is_active => Ok(user),
        _ => Err(ApiError::Unauthorized(String::from(
            "User inactive or deleted.",
        ))),
    }
}

async fn profile(session: SessionData, state: State) -> Result<Response, Rejection> {
    let user = session_user(&session, &state).await?;

    Ok(json_reply(&UserResponse::from(&user), StatusCode::OK))
}

async fn replace_profile(
    session: SessionData,
    state: State,
    form: Form,
) -> Result<Response, Rejection> {
    let payload: UserCreate = form.parse()?;
    save_profile(session, state, payload.into()).await
}

async fn update_profile(
    session: SessionData,
    state: State,
    form: Form,
) -> Result<Response, Rejection> {
    let payload: UserUpdate = form.parse()?;
    save_profile(session, state, payload).await
}

async fn save_profile(
    session: SessionData,
    state: State,
    update: UserUpdate,
) -> Result<Response, Rejection> {
    let user = session_user(&session, &state).await?;
    let user = update_user(user.id, update, &state.pool)
        .await?
        .ok_or(ApiError::NotFound)?;

    Ok(json_reply(&UserResponse::from(&user), StatusCode::OK))
}
