// src/lib.rs

use axum::{routing::get, Router};
use sea_orm::DatabaseConnection;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
}

pub mod config;

pub mod entities {
    pub mod prelude;
    pub mod authorized_part;
}

pub mod services {
    pub mod authorized_parts;
    pub mod sku_report;
}

pub mod models {
    pub mod authorized_part;
}

pub mod handlers {
    pub mod authorized_part;
}

pub fn build_router(state: AppState) -> Router {
    use handlers::authorized_part;

    Router::new()
        .route("/", get(hello_serials))
        .route(
            "/api/parts",
            get(authorized_part::get_authorized_parts).post(authorized_part::create_authorized_part),
        )
        .route("/api/parts/sku-suggestion", get(authorized_part::suggest_sku))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn hello_serials() -> &'static str {
    "Hello from Serials Backend!"
}
