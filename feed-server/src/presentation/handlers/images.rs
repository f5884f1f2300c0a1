use axum::{Json, extract::Multipart, extract::State, http::StatusCode};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::error::DomainError;
use crate::infrastructure::assets::ImageUpload;
use crate::presentation::AppState;
use crate::presentation::app_error::{AppError, AppResult};
use crate::presentation::middleware::auth::AuthenticatedUser;

#[derive(Debug, Serialize, ToSchema)]
pub(crate) struct UploadResponseDto {
    pub(crate) file_path: String,
}

#[utoipa::path(
    post,
    path = "/api/images",
    tag = "images",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 201, description = "Image stored", body = UploadResponseDto),
        (status = 401, description = "Unauthorized"),
        (status = 422, description = "Missing or unsupported file"),
        (status = 500, description = "Internal error")
    )
)]
pub(crate) async fn upload_image(
    State(state): State<AppState>,
    _auth: AuthenticatedUser,
    mut multipart: Multipart,
) -> AppResult<(StatusCode, Json<UploadResponseDto>)> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| AppError::BadRequest(err.to_string()))?
    {
        if field.name() != Some("image") {
            continue;
        }

        let file_name = field.file_name().unwrap_or("upload").to_string();
        let content_type = field.content_type().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|err| AppError::BadRequest(err.to_string()))?;

        let file_path = state
            .images
            .store(ImageUpload {
                file_name,
                content_type,
                bytes,
            })
            .await?;

        return Ok((StatusCode::CREATED, Json(UploadResponseDto { file_path })));
    }

    Err(AppError::Domain(DomainError::violation(
        "image",
        "file is required",
    )))
}
