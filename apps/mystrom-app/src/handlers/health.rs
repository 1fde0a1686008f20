use api_contract::{ApiResponse, HealthDto};
use axum::Json;

pub async fn health() -> Json<ApiResponse<HealthDto>> {
    Json(ApiResponse::success(HealthDto {
        status: "ok".to_string(),
    }))
}
