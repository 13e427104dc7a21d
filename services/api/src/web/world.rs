//! services/api/src/web/world.rs
//!
//! REST handlers for a book's world-building entities: characters, locations
//! and world rules. Each follows the same list/create/get/update/delete shape.

use crate::error::ApiResult;
use crate::web::{
    middleware::UserId,
    protocol::{
        require_key_segment, require_text, CharacterResponse, CreateCharacterRequest,
        CreateLocationRequest, CreateWorldRuleRequest, LocationResponse, UpdateCharacterRequest,
        UpdateLocationRequest, UpdateWorldRuleRequest, WorldRuleResponse,
    },
    state::AppState,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use saga_core::domain::{Character, Location, WorldRule};
use std::sync::Arc;
use uuid::Uuid;

//=========================================================================================
// Characters
//=========================================================================================

#[utoipa::path(
    get,
    path = "/books/{book_id}/characters",
    params(
        ("x-user-id" = String, Header, description = "The calling user."),
        ("book_id" = String, Path, description = "The book id.")
    ),
    responses((status = 200, description = "The book's characters.", body = [CharacterResponse])),
    tag = "characters"
)]
pub async fn list_characters_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(UserId(user_id)): Extension<UserId>,
    Path(book_id): Path<String>,
) -> ApiResult<Json<Vec<CharacterResponse>>> {
    let characters = app_state.repo.list_characters(&user_id, &book_id).await?;
    Ok(Json(characters.into_iter().map(CharacterResponse::from).collect()))
}

/// Create a character. New characters are active unless `isActive` says otherwise.
#[utoipa::path(
    post,
    path = "/books/{book_id}/characters",
    params(
        ("x-user-id" = String, Header, description = "The calling user."),
        ("book_id" = String, Path, description = "The book id.")
    ),
    request_body = CreateCharacterRequest,
    responses(
        (status = 201, description = "The created character.", body = CharacterResponse),
        (status = 400, description = "Blank required field or malformed book id.")
    ),
    tag = "characters"
)]
pub async fn create_character_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(UserId(user_id)): Extension<UserId>,
    Path(book_id): Path<String>,
    Json(payload): Json<CreateCharacterRequest>,
) -> ApiResult<(StatusCode, Json<CharacterResponse>)> {
    require_key_segment("book_id", &book_id)?;
    require_text("name", &payload.name)?;
    let character = Character {
        id: Uuid::new_v4().to_string(),
        book_id,
        name: payload.name,
        description: payload.description,
        traits: payload.traits,
        motivation: payload.motivation,
        is_active: payload.is_active.unwrap_or(true),
    };
    app_state.repo.create_character(&user_id, &character).await?;
    Ok((StatusCode::CREATED, Json(character.into())))
}

#[utoipa::path(
    get,
    path = "/books/{book_id}/characters/{char_id}",
    params(
        ("x-user-id" = String, Header, description = "The calling user."),
        ("book_id" = String, Path, description = "The book id."),
        ("char_id" = String, Path, description = "The character id.")
    ),
    responses(
        (status = 200, description = "The character.", body = CharacterResponse),
        (status = 404, description = "Character not found.")
    ),
    tag = "characters"
)]
pub async fn get_character_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(UserId(user_id)): Extension<UserId>,
    Path((book_id, char_id)): Path<(String, String)>,
) -> ApiResult<Json<CharacterResponse>> {
    let character = app_state
        .repo
        .get_character(&user_id, &book_id, &char_id)
        .await?;
    Ok(Json(character.into()))
}

#[utoipa::path(
    patch,
    path = "/books/{book_id}/characters/{char_id}",
    params(
        ("x-user-id" = String, Header, description = "The calling user."),
        ("book_id" = String, Path, description = "The book id."),
        ("char_id" = String, Path, description = "The character id.")
    ),
    request_body = UpdateCharacterRequest,
    responses(
        (status = 200, description = "The updated character.", body = CharacterResponse),
        (status = 404, description = "Character not found.")
    ),
    tag = "characters"
)]
pub async fn update_character_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(UserId(user_id)): Extension<UserId>,
    Path((book_id, char_id)): Path<(String, String)>,
    Json(payload): Json<UpdateCharacterRequest>,
) -> ApiResult<Json<CharacterResponse>> {
    let mut character = app_state
        .repo
        .get_character(&user_id, &book_id, &char_id)
        .await?;
    if let Some(name) = payload.name {
        require_text("name", &name)?;
        character.name = name;
    }
    if let Some(description) = payload.description {
        character.description = description;
    }
    if let Some(traits) = payload.traits {
        character.traits = traits;
    }
    if let Some(motivation) = payload.motivation {
        character.motivation = motivation;
    }
    if let Some(is_active) = payload.is_active {
        character.is_active = is_active;
    }

    app_state.repo.replace_character(&user_id, &character).await?;
    Ok(Json(character.into()))
}

#[utoipa::path(
    delete,
    path = "/books/{book_id}/characters/{char_id}",
    params(
        ("x-user-id" = String, Header, description = "The calling user."),
        ("book_id" = String, Path, description = "The book id."),
        ("char_id" = String, Path, description = "The character id.")
    ),
    responses(
        (status = 204, description = "Character deleted."),
        (status = 404, description = "Character not found.")
    ),
    tag = "characters"
)]
pub async fn delete_character_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(UserId(user_id)): Extension<UserId>,
    Path((book_id, char_id)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    app_state
        .repo
        .delete_character(&user_id, &book_id, &char_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

//=========================================================================================
// Locations
//=========================================================================================

#[utoipa::path(
    get,
    path = "/books/{book_id}/locations",
    params(
        ("x-user-id" = String, Header, description = "The calling user."),
        ("book_id" = String, Path, description = "The book id.")
    ),
    responses((status = 200, description = "The book's locations.", body = [LocationResponse])),
    tag = "locations"
)]
pub async fn list_locations_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(UserId(user_id)): Extension<UserId>,
    Path(book_id): Path<String>,
) -> ApiResult<Json<Vec<LocationResponse>>> {
    let locations = app_state.repo.list_locations(&user_id, &book_id).await?;
    Ok(Json(locations.into_iter().map(LocationResponse::from).collect()))
}

#[utoipa::path(
    post,
    path = "/books/{book_id}/locations",
    params(
        ("x-user-id" = String, Header, description = "The calling user."),
        ("book_id" = String, Path, description = "The book id.")
    ),
    request_body = CreateLocationRequest,
    responses(
        (status = 201, description = "The created location.", body = LocationResponse),
        (status = 400, description = "Blank required field or malformed book id.")
    ),
    tag = "locations"
)]
pub async fn create_location_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(UserId(user_id)): Extension<UserId>,
    Path(book_id): Path<String>,
    Json(payload): Json<CreateLocationRequest>,
) -> ApiResult<(StatusCode, Json<LocationResponse>)> {
    require_key_segment("book_id", &book_id)?;
    require_text("name", &payload.name)?;
    let location = Location {
        id: Uuid::new_v4().to_string(),
        book_id,
        name: payload.name,
        description: payload.description,
        atmosphere: payload.atmosphere,
    };
    app_state.repo.create_location(&user_id, &location).await?;
    Ok((StatusCode::CREATED, Json(location.into())))
}

#[utoipa::path(
    get,
    path = "/books/{book_id}/locations/{loc_id}",
    params(
        ("x-user-id" = String, Header, description = "The calling user."),
        ("book_id" = String, Path, description = "The book id."),
        ("loc_id" = String, Path, description = "The location id.")
    ),
    responses(
        (status = 200, description = "The location.", body = LocationResponse),
        (status = 404, description = "Location not found.")
    ),
    tag = "locations"
)]
pub async fn get_location_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(UserId(user_id)): Extension<UserId>,
    Path((book_id, loc_id)): Path<(String, String)>,
) -> ApiResult<Json<LocationResponse>> {
    let location = app_state
        .repo
        .get_location(&user_id, &book_id, &loc_id)
        .await?;
    Ok(Json(location.into()))
}

#[utoipa::path(
    patch,
    path = "/books/{book_id}/locations/{loc_id}",
    params(
        ("x-user-id" = String, Header, description = "The calling user."),
        ("book_id" = String, Path, description = "The book id."),
        ("loc_id" = String, Path, description = "The location id.")
    ),
    request_body = UpdateLocationRequest,
    responses(
        (status = 200, description = "The updated location.", body = LocationResponse),
        (status = 404, description = "Location not found.")
    ),
    tag = "locations"
)]
pub async fn update_location_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(UserId(user_id)): Extension<UserId>,
    Path((book_id, loc_id)): Path<(String, String)>,
    Json(payload): Json<UpdateLocationRequest>,
) -> ApiResult<Json<LocationResponse>> {
    let mut location = app_state
        .repo
        .get_location(&user_id, &book_id, &loc_id)
        .await?;
    if let Some(name) = payload.name {
        require_text("name", &name)?;
        location.name = name;
    }
    if let Some(description) = payload.description {
        location.description = description;
    }
    if let Some(atmosphere) = payload.atmosphere {
        location.atmosphere = atmosphere;
    }

    app_state.repo.replace_location(&user_id, &location).await?;
    Ok(Json(location.into()))
}

#[utoipa::path(
    delete,
    path = "/books/{book_id}/locations/{loc_id}",
    params(
        ("x-user-id" = String, Header, description = "The calling user."),
        ("book_id" = String, Path, description = "The book id."),
        ("loc_id" = String, Path, description = "The location id.")
    ),
    responses(
        (status = 204, description = "Location deleted."),
        (status = 404, description = "Location not found.")
    ),
    tag = "locations"
)]
pub async fn delete_location_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(UserId(user_id)): Extension<UserId>,
    Path((book_id, loc_id)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    app_state
        .repo
        .delete_location(&user_id, &book_id, &loc_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

//=========================================================================================
// World rules
//=========================================================================================

#[utoipa::path(
    get,
    path = "/books/{book_id}/rules",
    params(
        ("x-user-id" = String, Header, description = "The calling user."),
        ("book_id" = String, Path, description = "The book id.")
    ),
    responses((status = 200, description = "The book's world rules.", body = [WorldRuleResponse])),
    tag = "world-rules"
)]
pub async fn list_world_rules_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(UserId(user_id)): Extension<UserId>,
    Path(book_id): Path<String>,
) -> ApiResult<Json<Vec<WorldRuleResponse>>> {
    let rules = app_state.repo.list_world_rules(&user_id, &book_id).await?;
    Ok(Json(rules.into_iter().map(WorldRuleResponse::from).collect()))
}

#[utoipa::path(
    post,
    path = "/books/{book_id}/rules",
    params(
        ("x-user-id" = String, Header, description = "The calling user."),
        ("book_id" = String, Path, description = "The book id.")
    ),
    request_body = CreateWorldRuleRequest,
    responses(
        (status = 201, description = "The created world rule.", body = WorldRuleResponse),
        (status = 400, description = "Blank required field or malformed book id.")
    ),
    tag = "world-rules"
)]
pub async fn create_world_rule_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(UserId(user_id)): Extension<UserId>,
    Path(book_id): Path<String>,
    Json(payload): Json<CreateWorldRuleRequest>,
) -> ApiResult<(StatusCode, Json<WorldRuleResponse>)> {
    require_key_segment("book_id", &book_id)?;
    require_text("title", &payload.title)?;
    let rule = WorldRule {
        id: Uuid::new_v4().to_string(),
        book_id,
        title: payload.title,
        description: payload.description,
    };
    app_state.repo.create_world_rule(&user_id, &rule).await?;
    Ok((StatusCode::CREATED, Json(rule.into())))
}

#[utoipa::path(
    get,
    path = "/books/{book_id}/rules/{rule_id}",
    params(
        ("x-user-id" = String, Header, description = "The calling user."),
        ("book_id" = String, Path, description = "The book id."),
        ("rule_id" = String, Path, description = "The world rule id.")
    ),
    responses(
        (status = 200, description = "The world rule.", body = WorldRuleResponse),
        (status = 404, description = "World rule not found.")
    ),
    tag = "world-rules"
)]
pub async fn get_world_rule_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(UserId(user_id)): Extension<UserId>,
    Path((book_id, rule_id)): Path<(String, String)>,
) -> ApiResult<Json<WorldRuleResponse>> {
    let rule = app_state
        .repo
        .get_world_rule(&user_id, &book_id, &rule_id)
        .await?;
    Ok(Json(rule.into()))
}

#[utoipa::path(
    patch,
    path = "/books/{book_id}/rules/{rule_id}",
    params(
        ("x-user-id" = String, Header, description = "The calling user."),
        ("book_id" = String, Path, description = "The book id."),
        ("rule_id" = String, Path, description = "The world rule id.")
    ),
    request_body = UpdateWorldRuleRequest,
    responses(
        (status = 200, description = "The updated world rule.", body = WorldRuleResponse),
        (status = 404, description = "World rule not found.")
    ),
    tag = "world-rules"
)]
pub async fn update_world_rule_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(UserId(user_id)): Extension<UserId>,
    Path((book_id, rule_id)): Path<(String, String)>,
    Json(payload): Json<UpdateWorldRuleRequest>,
) -> ApiResult<Json<WorldRuleResponse>> {
    let mut rule = app_state
        .repo
        .get_world_rule(&user_id, &book_id, &rule_id)
        .await?;
    if let Some(title) = payload.title {
        require_text("title", &title)?;
        rule.title = title;
    }
    if let Some(description) = payload.description {
        rule.description = description;
    }

    app_state.repo.replace_world_rule(&user_id, &rule).await?;
    Ok(Json(rule.into()))
}

#[utoipa::path(
    delete,
    path = "/books/{book_id}/rules/{rule_id}",
    params(
        ("x-user-id" = String, Header, description = "The calling user."),
        ("book_id" = String, Path, description = "The book id."),
        ("rule_id" = String, Path, description = "The world rule id.")
    ),
    responses(
        (status = 204, description = "World rule deleted."),
        (status = 404, description = "World rule not found.")
    ),
    tag = "world-rules"
)]
pub async fn delete_world_rule_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(UserId(user_id)): Extension<UserId>,
    Path((book_id, rule_id)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    app_state
        .repo
        .delete_world_rule(&user_id, &book_id, &rule_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
