use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use migration::SKU_MAX_LEN;

use crate::models::authorized_part::{
    AuthorizedPartResponse, AuthorizedPartsListResponse, CreateAuthorizedPartRequest,
    ErrorResponse, PartSearchQuery, SkuSuggestionQuery, SkuSuggestionResponse,
};
use crate::services::authorized_parts::{self, NewAuthorizedPart, PartError};
use crate::AppState;

type ApiError = (StatusCode, Json<ErrorResponse>);

fn error_response(err: PartError) -> ApiError {
    let (status, code) = match &err {
        PartError::Validation(_) => (StatusCode::BAD_REQUEST, "INVALID_PART"),
        PartError::Duplicate(_) => (StatusCode::CONFLICT, "DUPLICATE_PART"),
        PartError::Database(e) => {
            tracing::error!("Database error: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "DATABASE_ERROR")
        }
    };

    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
            code: Some(code.to_string()),
        }),
    )
}

/// GET /api/parts?q= - autocomplete over active parts
pub async fn get_authorized_parts(
    State(state): State<AppState>,
    Query(params): Query<PartSearchQuery>,
) -> Result<Json<AuthorizedPartsListResponse>, ApiError> {
    let parts = authorized_parts::search_active(&state.db, &params.q)
        .await
        .map_err(|e| error_response(e.into()))?;

    Ok(Json(AuthorizedPartsListResponse {
        parts: parts.into_iter().map(AuthorizedPartResponse::from).collect(),
    }))
}

/// POST /api/parts - create a part; `sku` must be supplied
pub async fn create_authorized_part(
    State(state): State<AppState>,
    Json(req): Json<CreateAuthorizedPartRequest>,
) -> Result<(StatusCode, Json<AuthorizedPartResponse>), ApiError> {
    let new = NewAuthorizedPart {
        part_number: req.part_number,
        sku: req.sku,
        description: req.description,
        revision: req.revision,
        is_active: req.is_active,
    };

    let part = authorized_parts::create(&state.db, new)
        .await
        .map_err(error_response)?;

    Ok((StatusCode::CREATED, Json(part.into())))
}

/// GET /api/parts/sku-suggestion?part_number=
pub async fn suggest_sku(Query(params): Query<SkuSuggestionQuery>) -> Json<SkuSuggestionResponse> {
    let suggestion = authorized_parts::suggest_sku(&params.part_number);

    Json(SkuSuggestionResponse {
        part_number: params.part_number.trim().to_string(),
        sku: suggestion.sku,
        fits: suggestion.fits,
        max_len: SKU_MAX_LEN,
    })
}
