use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use crate::api::error::ApiError;
use crate::config::PaginationConfig;
use crate::logic::{ListPets, PetError, PetOperations};
use crate::model::{Id, Paginated, Pet};
use crate::store::traits::Store;

/// Shared handler state: the store plus listing defaults
#[derive(Debug)]
pub struct AppState<S> {
    pub store: S,
    pub pagination: PaginationConfig,
}

pub type SharedState<S> = Arc<AppState<S>>;

impl<S> AppState<S> {
    pub fn shared(store: S, pagination: PaginationConfig) -> SharedState<S> {
        Arc::new(Self { store, pagination })
    }
}

/// Simple health check endpoint
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

#[derive(Debug, Default, Deserialize)]
pub struct ListPetsQuery {
    #[serde(rename = "trait")]
    pub trait_name: Option<String>,
    pub page: Option<String>,
    pub page_size: Option<String>,
}

impl ListPetsQuery {
    /// Relative link to another page of the same listing
    fn page_link(&self, number: u64) -> String {
        let mut params = Vec::new();
        if number > 1 {
            params.push(format!("page={}", number));
        }
        if let Some(size) = &self.page_size {
            params.push(format!("page_size={}", urlencoding::encode(size)));
        }
        if let Some(name) = &self.trait_name {
            params.push(format!("trait={}", urlencoding::encode(name)));
        }

        if params.is_empty() {
            "/pets".to_string()
        } else {
            format!("/pets?{}", params.join("&"))
        }
    }
}

// Non-numeric ids can never match a pet.
fn pet_id(path: Result<Path<Id>, PathRejection>) -> Result<Id, ApiError> {
    path.map(|Path(id)| id)
        .map_err(|_| PetError::NotFound("Not found.".to_string()).into())
}

pub async fn create_pet<S: Store>(
    State(state): State<SharedState<S>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<Pet>), ApiError> {
    let Json(body) = payload?;
    let pet = PetOperations::create(&state.store, &body).await?;
    Ok((StatusCode::CREATED, Json(pet)))
}

pub async fn list_pets<S: Store>(
    State(state): State<SharedState<S>>,
    query: Result<Query<ListPetsQuery>, QueryRejection>,
) -> Result<Json<Paginated<Pet>>, ApiError> {
    let Query(query) = query?;
    let params = ListPets {
        trait_name: query.trait_name.as_deref(),
        page: query.page.as_deref(),
        page_size: query.page_size.as_deref(),
    };
    let page = PetOperations::list(&state.store, &params, &state.pagination).await?;

    let next = page
        .has_next()
        .then(|| query.page_link(page.request.number + 1));
    let previous = page
        .has_previous()
        .then(|| query.page_link(page.request.number - 1));

    Ok(Json(Paginated {
        count: page.count,
        next,
        previous,
        results: page.items,
    }))
}

pub async fn get_pet<S: Store>(
    State(state): State<SharedState<S>>,
    path: Result<Path<Id>, PathRejection>,
) -> Result<Json<Pet>, ApiError> {
    let id = pet_id(path)?;
    let pet = PetOperations::retrieve(&state.store, id).await?;
    Ok(Json(pet))
}

pub async fn update_pet<S: Store>(
    State(state): State<SharedState<S>>,
    path: Result<Path<Id>, PathRejection>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Pet>, ApiError> {
    let id = pet_id(path)?;
    let Json(body) = payload?;
    let pet = PetOperations::update(&state.store, id, &body).await?;
    Ok(Json(pet))
}

pub async fn delete_pet<S: Store>(
    State(state): State<SharedState<S>>,
    path: Result<Path<Id>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let id = pet_id(path)?;
    PetOperations::delete(&state.store, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_openapi_spec() -> Json<Value> {
    let pet_payload = serde_json::json!({
        "type": "object",
        "properties": {
            "name": {"type": "string", "maxLength": 50},
            "age": {"type": "integer", "minimum": 0},
            "weight": {"type": "number", "minimum": 0},
            "sex": {"type": "string", "enum": ["Male", "Female", "Not Informed"]},
            "group": {
                "type": "object",
                "properties": {"scientific_name": {"type": "string", "maxLength": 50}},
                "required": ["scientific_name"]
            },
            "traits": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {"name": {"type": "string", "maxLength": 20}},
                    "required": ["name"]
                }
            }
        }
    });
    let pet_id_param = serde_json::json!({
        "name": "pet_id",
        "in": "path",
        "required": true,
        "schema": {"type": "integer"}
    });

    Json(serde_json::json!({
        "openapi": "3.0.3",
        "info": {
            "title": "Pet Registry API",
            "version": "0.1.0",
            "description": "Pets with their taxonomic group and descriptive traits. Groups and traits are matched case-insensitively by name and created on first use."
        },
        "servers": [{"url": "/", "description": "Current server"}],
        "components": {
            "schemas": {
                "PetPayload": pet_payload
            }
        },
        "paths": {
            "/health": {
                "get": {
                    "summary": "Health check",
                    "responses": {"200": {"description": "Service is up"}}
                }
            },
            "/pets": {
                "get": {
                    "summary": "List pets ordered by id",
                    "parameters": [
                        {"name": "trait", "in": "query", "schema": {"type": "string"}, "description": "Only pets carrying the trait with exactly this name"},
                        {"name": "page", "in": "query", "schema": {"type": "integer", "minimum": 1}},
                        {"name": "page_size", "in": "query", "schema": {"type": "integer", "minimum": 1}}
                    ],
                    "responses": {
                        "200": {"description": "Paginated envelope with count, next, previous and results"},
                        "400": {"description": "Malformed query string"},
                        "404": {"description": "Unknown trait or invalid page"}
                    }
                },
                "post": {
                    "summary": "Create a pet",
                    "requestBody": {
                        "required": true,
                        "content": {"application/json": {"schema": {"$ref": "#/components/schemas/PetPayload"}}}
                    },
                    "responses": {
                        "201": {"description": "Created pet"},
                        "400": {"description": "Validation failed"},
                        "415": {"description": "Body is not sent as application/json"}
                    }
                }
            },
            "/pets/{pet_id}": {
                "get": {
                    "summary": "Retrieve a pet",
                    "parameters": [pet_id_param.clone()],
                    "responses": {"200": {"description": "Pet"}, "404": {"description": "Not found"}}
                },
                "patch": {
                    "summary": "Partially update a pet",
                    "description": "A traits list replaces the whole trait set; omit the key to keep the current traits.",
                    "parameters": [pet_id_param.clone()],
                    "requestBody": {
                        "required": true,
                        "content": {"application/json": {"schema": {"$ref": "#/components/schemas/PetPayload"}}}
                    },
                    "responses": {
                        "200": {"description": "Updated pet"},
                        "400": {"description": "Validation failed"},
                        "404": {"description": "Not found"},
                        "415": {"description": "Body is not sent as application/json"}
                    }
                },
                "delete": {
                    "summary": "Delete a pet",
                    "parameters": [pet_id_param],
                    "responses": {"204": {"description": "Deleted"}, "404": {"description": "Not found"}}
                }
            }
        }
    }))
}
