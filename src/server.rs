use crate::data::{AssignmentInput, AssignmentOutput, Group, Profile};
use crate::matching::{MatchPreview, preview_matches};
use crate::{solver, validate};
use axum::{Json, Router, routing::post};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationRequest {
    pub profiles: Vec<Profile>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResponse {
    pub groups: Vec<Group>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewRequest {
    pub target_id: String,
    pub profiles: Vec<Profile>,
}

async fn assign_handler(Json(input): Json<AssignmentInput>) -> Json<AssignmentOutput> {
    Json(solver::assign(&input))
}

async fn validate_handler(Json(request): Json<ValidationRequest>) -> Json<ValidationResponse> {
    Json(ValidationResponse {
        groups: validate::validate(&request.profiles),
    })
}

async fn preview_handler(
    Json(request): Json<PreviewRequest>,
) -> Result<Json<MatchPreview>, (axum::http::StatusCode, String)> {
    match request.profiles.iter().find(|p| p.id == request.target_id) {
        Some(target) => Ok(Json(preview_matches(target, &request.profiles))),
        None => Err((
            axum::http::StatusCode::BAD_REQUEST,
            format!("unknown target profile: {}", request.target_id),
        )),
    }
}

pub async fn run_server() {
    let app = Router::new()
        .route("/v1/rooms/assign", post(assign_handler))
        .route("/v1/rooms/validate", post(validate_handler))
        .route("/v1/matches/preview", post(preview_handler));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:8080")
        .await
        .unwrap();

    println!("Server running at http://{}", listener.local_addr().unwrap());

    axum::serve(listener, app).await.unwrap();
}
