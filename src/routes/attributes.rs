use std::collections::HashMap;

use warp::{filters::BoxedFilter, http::StatusCode, reply::Response, Filter, Rejection};

use crate::{
    actions::attributes::{delete_attribute, list_attributes, rename_attribute},
    error::ApiError,
    form::Form,
    jwt::SessionData,
    middleware::with_session,
    permissions::ActionType,
    schema::{AttributeKind, Id},
    serializers::{AttributeResponse, NameInput},
    state::State,
};

use super::{empty_reply, json_body, json_reply, with_state};

/// `/recipe/tags` and `/recipe/ingredients`.
pub fn routes(state: State) -> BoxedFilter<(Response,)> {
    resource(AttributeKind::Tag, state.clone())
        .or(resource(AttributeKind::Ingredient, state))
        .unify()
        .boxed()
}

fn resource(kind: AttributeKind, state: State) -> BoxedFilter<(Response,)> {
    let session = with_session(state.clone());
    let base = warp::path("recipe").and(warp::path(kind.field()));
    let item = base
        .clone()
        .and(warp::path::param::<Id>())
        .and(warp::path::end());

    let list_route = base
        .and(warp::path::end())
        .and(warp::get())
        .and(session.clone())
        .and(with_state(state.clone()))
        .and(warp::query::<HashMap<String, String>>())
        .and_then(
            move |session: SessionData, state: State, query: HashMap<String, String>| {
                list(kind, session, state, query)
            },
        );

    let rename_route = item
        .clone()
        .and(warp::put().or(warp::patch()).unify())
        .and(session.clone())
        .and(with_state(state.clone()))
        .and(json_body())
        .and_then(move |id: Id, session: SessionData, state: State, form: Form| {
            rename(kind, id, session, state, form)
        });

    let delete_route = item
        .and(warp::delete())
        .and(session)
        .and(with_state(state))
        .and_then(move |id: Id, session: SessionData, state: State| {
            delete(kind, id, session, state)
        });

    list_route
        .or(rename_route)
        .unify()
        .or(delete_route)
        .unify()
        .boxed()
}

fn is_truthy(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes")
}

async fn list(
    kind: AttributeKind,
    session: SessionData,
    state: State,
    query: HashMap<String, String>,
) -> Result<Response, Rejection> {
    session.authenticate(ActionType::ManageOwnRecipes)?;
    let assigned_only = query.get("assigned_only").is_some_and(|v| is_truthy(v));

    let rows = list_attributes(kind, session.user_id, assigned_only, &state.pool).await?;
    let body: Vec<AttributeResponse> = rows.iter().map(AttributeResponse::from).collect();

    Ok(json_reply(&body, StatusCode::OK))
}

async fn rename(
    kind: AttributeKind,
    id: Id,
    session: SessionData,
    state: State,
    form: Form,
) -> Result<Response, Rejection> {
    session.authenticate(ActionType::ManageOwnRecipes)?;
    let payload: NameInput = form.parse()?;
    if payload.name.trim().is_empty() {
        return Err(ApiError::field("name", "This field may not be blank.").into());
    }

    let row = rename_attribute(kind, id, session.user_id, &payload.name, &state.pool)
        .await?
        .ok_or(ApiError::NotFound)?;

    Ok(json_reply(&AttributeResponse::from(&row), StatusCode::OK))
}

async fn delete(
    kind: AttributeKind,
    id: Id,
    session: SessionData,
    state: State,
) -> Result<Response, Rejection> {
    session.authenticate(ActionType::ManageOwnRecipes)?;

    if !delete_attribute(kind, id, session.user_id, &state.pool).await? {
        return Err(ApiError::NotFound.into());
    }

    Ok(empty_reply(StatusCode::NO_CONTENT))
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("1", true)]
    #[case("True", true)]
    #[case("0", false)]
    #[case("", false)]
    fn assigned_only_flag(#[case] value: &str, #[case] expected: bool) {
        assert_eq!(is_truthy(value), expected);
    }
}
