use axum::{response::IntoResponse, Json};
use utoipa::OpenApi;
use utoipauto::utoipauto;

#[utoipauto(paths = "./partyjam-server/src")]
#[derive(OpenApi)]
#[openapi(info(
    description = "partyjam-server exposes endpoints to run a shared party queue with crowd voting"
))]
pub struct ApiDoc;

pub async fn docs() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}
