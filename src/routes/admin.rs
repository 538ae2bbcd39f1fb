use std::collections::HashMap;

use warp::{filters::BoxedFilter, http::StatusCode, reply::Response, Filter, Rejection};

use crate::{
    actions::{
        attributes::list_all_attributes,
        recipes::list_all_recipes,
        users::{create_staff_user, create_user, list_users},
    },
    form::Form,
    jwt::SessionData,
    middleware::with_session,
    permissions::ActionType,
    schema::AttributeKind,
    serializers::AdminUserCreate,
    state::State,
};

use super::{json_body, json_reply, with_state};

/// Staff console over every user's data.
pub fn routes(state: State) -> BoxedFilter<(Response,)> {
    let session = with_session(state.clone());

    let users_route = warp::path!("admin" / "users")
        .and(warp::get())
        .and(session.clone())
        .and(with_state(state.clone()))
        .and(warp::query::<HashMap<String, String>>())
        .and_then(users);

    let create_user_route = warp::path!("admin" / "users")
        .and(warp::post())
        .and(session.clone())
        .and(with_state(state.clone()))
        .and(json_body())
        .and_then(add_user);

    let recipes_route = warp::path!("admin" / "recipes")
        .and(warp::get())
        .and(session.clone())
        .and(with_state(state.clone()))
        .and_then(recipes);

    let tags_route = warp::path!("admin" / "tags")
        .and(warp::get())
        .and(session.clone())
        .and(with_state(state.clone()))
        .and_then(|session: SessionData, state: State| {
            attributes(AttributeKind::Tag, session, state)
        });

    let ingredients_route = warp::path!("admin" / "ingredients")
        .and(warp::get())
        .and(session)
        .and(with_state(state))
        .and_then(|session: SessionData, state: State| {
            attributes(AttributeKind::Ingredient, session, state)
        });

    users_route
        .or(create_user_route)
        .unify()
        .or(recipes_route)
        .unify()
        .or(tags_route)
        .unify()
        .or(ingredients_route)
        .unify()
        .boxed()
}

async fn users(
    session: SessionData,
    state: State,
    query: HashMap<String, String>,
) -> Result<Response, Rejection> {
    session.authenticate(ActionType::ViewAllContent)?;

    let rows = list_users(query.get("search").map(String::as_str), &state.pool).await?;

    Ok(json_reply(&rows, StatusCode::OK))
}

async fn add_user(session: SessionData, state: State, form: Form) -> Result<Response, Rejection> {
    session.authenticate(ActionType::ManageUsers)?;
    let payload: AdminUserCreate = form.parse()?;

    let user = if payload.is_staff {
        create_staff_user(&payload.email, &payload.password, &payload.name, &state.pool).await?
    } else {
        create_user(&payload.email, &payload.password, &payload.name, &state.pool).await?
    };
    log::info!("User {} created account {} from the console", session.user_id, user.id);

    Ok(json_reply(&user, StatusCode::CREATED))
}

async fn recipes(session: SessionData, state: State) -> Result<Response, Rejection> {
    session.authenticate(ActionType::ViewAllContent)?;

    Ok(json_reply(&list_all_recipes(&state.pool).await?, StatusCode::OK))
}

async fn attributes(
    kind: AttributeKind,
    session: SessionData,
    state: State,
) -> Result<Response, Rejection> {
    session.authenticate(ActionType::ViewAllContent)?;

    Ok(json_reply(
        &list_all_attributes(kind, &state.pool).await?,
        StatusCode::OK,
    ))
}
