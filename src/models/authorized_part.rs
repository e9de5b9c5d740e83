use serde::{Deserialize, Serialize};

use crate::entities::authorized_part;

#[derive(Debug, Default, Deserialize)]
pub struct PartSearchQuery {
    #[serde(default)]
    pub q: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorizedPartResponse {
    pub id: i32,
    pub part_number: String,
    pub sku: String,
    pub description: String,
    pub revision: String,
}

impl From<authorized_part::Model> for AuthorizedPartResponse {
    fn from(part: authorized_part::Model) -> Self {
        Self {
            id: part.id,
            part_number: part.part_number,
            sku: part.sku,
            description: part.description,
            revision: part.revision,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthorizedPartsListResponse {
    pub parts: Vec<AuthorizedPartResponse>,
}

/// Body of `POST /api/parts`. `sku` is optional here only so that a missing
/// value is reported as a validation error rather than a decode failure.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateAuthorizedPartRequest {
    pub part_number: String,
    pub sku: Option<String>,
    pub description: String,
    pub revision: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct SkuSuggestionQuery {
    pub part_number: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkuSuggestionResponse {
    pub part_number: String,
    pub sku: String,
    /// False when the derived SKU is longer than the column allows.
    pub fits: bool,
    pub max_len: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}
