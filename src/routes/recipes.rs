use std::collections::HashMap;

use warp::{
    filters::BoxedFilter, http::StatusCode, multipart::FormData, reply::Response, Filter,
    Rejection,
};

use crate::{
    actions::recipes::{
        create_recipe, delete_recipe, get_recipe, list_recipes, set_recipe_image, update_recipe,
        with_attributes, RecipeFilter,
    },
    error::ApiError,
    form::Form,
    jwt::SessionData,
    middleware::with_session,
    permissions::ActionType,
    schema::{Id, Recipe, RecipeWithAttributes},
    serializers::{
        RecipeCreate, RecipeDetailResponse, RecipeImageResponse, RecipePatch, RecipeResponse,
    },
    state::State,
    uploads::{read_image_part, remove_media, store_recipe_image},
    MAX_UPLOAD_SIZE,
};

use super::{empty_reply, json_body, json_reply, with_state};

pub fn routes(state: State) -> BoxedFilter<(Response,)> {
    let session = with_session(state.clone());

    let list_route = warp::path!("recipe" / "recipes")
        .and(warp::get())
        .and(session.clone())
        .and(with_state(state.clone()))
        .and(warp::query::<HashMap<String, String>>())
        .and_then(list);

    let create_route = warp::path!("recipe" / "recipes")
        .and(warp::post())
        .and(session.clone())
        .and(with_state(state.clone()))
        .and(json_body())
        .and_then(create);

    let detail_route = warp::path!("recipe" / "recipes" / Id)
        .and(warp::get())
        .and(session.clone())
        .and(with_state(state.clone()))
        .and_then(detail);

    let replace_route = warp::path!("recipe" / "recipes" / Id)
        .and(warp::put())
        .and(session.clone())
        .and(with_state(state.clone()))
        .and(json_body())
        .and_then(replace);

    let update_route = warp::path!("recipe" / "recipes" / Id)
        .and(warp::patch())
        .and(session.clone())
        .and(with_state(state.clone()))
        .and(json_body())
        .and_then(update);

    let delete_route = warp::path!("recipe" / "recipes" / Id)
        .and(warp::delete())
        .and(session.clone())
        .and(with_state(state.clone()))
        .and_then(delete);

    let upload_route = warp::path!("recipe" / "recipes" / Id / "upload-image")
        .and(warp::post())
        .and(session)
        .and(with_state(state))
        .and(warp::multipart::form().max_length(MAX_UPLOAD_SIZE))
        .and_then(upload_image);

    list_route
        .or(create_route)
        .unify()
        .or(detail_route)
        .unify()
        .or(replace_route)
        .unify()
        .or(update_route)
        .unify()
        .or(delete_route)
        .unify()
        .or(upload_route)
        .unify()
        .boxed()
}

async fn load(recipe: Recipe, state: &State) -> Result<RecipeWithAttributes, ApiError> {
    with_attributes(vec![recipe], &state.pool)
        .await?
        .pop()
        .ok_or(ApiError::NotFound)
}

async fn list(
    session: SessionData,
    state: State,
    query: HashMap<String, String>,
) -> Result<Response, Rejection> {
    session.authenticate(ActionType::ManageOwnRecipes)?;
    let filter = RecipeFilter::from_query(&query)?;

    let recipes = list_recipes(session.user_id, &filter, &state.pool).await?;
    let recipes = with_attributes(recipes, &state.pool).await?;
    let body: Vec<RecipeResponse> = recipes.iter().map(RecipeResponse::from).collect();

    Ok(json_reply(&body, StatusCode::OK))
}

async fn create(session: SessionData, state: State, form: Form) -> Result<Response, Rejection> {
    session.authenticate(ActionType::ManageOwnRecipes)?;
    let payload: RecipeCreate = form.parse()?;

    let recipe = create_recipe(session.user_id, payload, &state.pool).await?;
    let recipe = load(recipe, &state).await?;

    Ok(json_reply(
        &RecipeDetailResponse::from(&recipe),
        StatusCode::CREATED,
    ))
}

async fn detail(id: Id, session: SessionData, state: State) -> Result<Response, Rejection> {
    session.authenticate(ActionType::ManageOwnRecipes)?;

    let recipe = get_recipe(id, session.user_id, &state.pool)
        .await?
        .ok_or(ApiError::NotFound)?;
    let recipe = load(recipe, &state).await?;

    Ok(json_reply(&RecipeDetailResponse::from(&recipe), StatusCode::OK))
}

async fn replace(
    id: Id,
    session: SessionData,
    state: State,
    form: Form,
) -> Result<Response, Rejection> {
    let payload: RecipeCreate = form.parse()?;
    save(id, session, state, payload.into()).await
}

async fn update(
    id: Id,
    session: SessionData,
    state: State,
    form: Form,
) -> Result<Response, Rejection> {
    let payload: RecipePatch = form.parse()?;
    save(id, session, state, payload).await
}

async fn save(
    id: Id,
    session: SessionData,
    state: State,
    patch: RecipePatch,
) -> Result<Response, Rejection> {
    session.authenticate(ActionType::ManageOwnRecipes)?;

    let recipe = update_recipe(id, session.user_id, patch, &state.pool)
        .await?
        .ok_or(ApiError::NotFound)?;
    let recipe = load(recipe, &state).await?;

    Ok(json_reply(&RecipeDetailResponse::from(&recipe), StatusCode::OK))
}

async fn delete(id: Id, session: SessionData, state: State) -> Result<Response, Rejection> {
    session.authenticate(ActionType::ManageOwnRecipes)?;

    let recipe = delete_recipe(id, session.user_id, &state.pool)
        .await?
        .ok_or(ApiError::NotFound)?;
    if let Some(image) = &recipe.image {
        remove_media(&state.config.media_root, image).await;
    }
    log::info!("User {} deleted recipe {}", session.user_id, recipe.id);

    Ok(empty_reply(StatusCode::NO_CONTENT))
}

async fn upload_image(
    id: Id,
    session: SessionData,
    state: State,
    form: FormData,
) -> Result<Response, Rejection> {
    session.authenticate(ActionType::ManageOwnRecipes)?;
    let media_root = &state.config.media_root;

    let file = read_image_part(form).await?;
    let image = store_recipe_image(media_root, &file).await?;

    let previous = match set_recipe_image(id, session.user_id, &image, &state.pool).await {
        Ok(Some(previous)) => previous,
        Ok(None) => {
            remove_media(media_root, &image).await;
            return Err(ApiError::NotFound.into());
        }
        Err(e) => {
            remove_media(media_root, &image).await;
            return Err(e.into());
        }
    };
    if let Some(previous) = previous {
        remove_media(media_root, &previous).await;
    }

    Ok(json_reply(
        &RecipeImageResponse {
            id,
            image: Some(image),
        },
        StatusCode::OK,
    ))
}
