//! services/api/src/web/rest.rs
//!
//! The health endpoint and the master definition for the OpenAPI specification.

use crate::web::{books, pages, protocol::*, state::AppState, world};
use axum::{extract::State, Json};
use std::sync::Arc;
use utoipa::OpenApi;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        health_handler,
        books::list_books_handler,
        books::create_book_handler,
        books::get_book_handler,
        books::update_book_handler,
        books::delete_book_handler,
        world::list_characters_handler,
        world::create_character_handler,
        world::get_character_handler,
        world::update_character_handler,
        world::delete_character_handler,
        world::list_locations_handler,
        world::create_location_handler,
        world::get_location_handler,
        world::update_location_handler,
        world::delete_location_handler,
        world::list_world_rules_handler,
        world::create_world_rule_handler,
        world::get_world_rule_handler,
        world::update_world_rule_handler,
        world::delete_world_rule_handler,
        pages::list_pages_handler,
        pages::generate_page_handler,
        pages::edit_page_handler,
        pages::get_page_handler,
        pages::update_page_handler,
        pages::delete_page_handler,
        pages::get_summary_handler,
    ),
    components(
        schemas(
            HealthResponse,
            BookResponse, CreateBookRequest, UpdateBookRequest,
            CharacterResponse, CreateCharacterRequest, UpdateCharacterRequest,
            LocationResponse, CreateLocationRequest, UpdateLocationRequest,
            WorldRuleResponse, CreateWorldRuleRequest, UpdateWorldRuleRequest,
            PageResponse, BeatRequest, UpdatePageRequest, SummaryResponse,
        )
    ),
    tags(
        (name = "Saga API", description = "Collaborative story writing: books, world-building and AI-generated pages.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// Health
//=========================================================================================

/// Liveness check. Also reports how many background summary updates have failed.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "The service is up.", body = HealthResponse)),
    tag = "health"
)]
pub async fn health_handler(State(app_state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        summary_failures: app_state.summary_failures(),
    })
}
