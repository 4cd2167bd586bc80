use axum::{routing::get, Router};

use crate::api::handlers::{self, SharedState};
use crate::store::traits::Store;

pub fn create_router<S: Store>() -> Router<SharedState<S>> {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // API Documentation
        .route("/docs/openapi.json", get(handlers::get_openapi_spec))
        // Pets
        .route(
            "/pets",
            get(handlers::list_pets::<S>).post(handlers::create_pet::<S>),
        )
        .route(
            "/pets/:pet_id",
            get(handlers::get_pet::<S>)
                .patch(handlers::update_pet::<S>)
                .delete(handlers::delete_pet::<S>),
        )
}
