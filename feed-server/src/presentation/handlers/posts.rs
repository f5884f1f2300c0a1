use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::application::feed_service::ListPostsResult;
use crate::domain::event::CreatedPost;
use crate::domain::post::{CreatePostRequest, Post, UpdatePostRequest};
use crate::domain::user::CreatorRef;
use crate::presentation::AppState;
use crate::presentation::app_error::AppResult;
use crate::presentation::middleware::auth::AuthenticatedUser;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub(crate) struct CreatePostDto {
    #[validate(length(min = 5, max = 255))]
    pub(crate) title: String,
    #[validate(length(min = 5))]
    pub(crate) content: String,
    #[validate(length(min = 1))]
    pub(crate) image_url: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub(crate) struct UpdatePostDto {
    #[validate(length(min = 5, max = 255))]
    pub(crate) title: String,
    #[validate(length(min = 5))]
    pub(crate) content: String,
    #[validate(length(min = 1))]
    pub(crate) image_url: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub(crate) struct PaginationQuery {
    #[validate(range(min = 1))]
    pub(crate) page: Option<u32>,
    #[validate(range(min = 1, max = 100))]
    pub(crate) per_page: Option<u32>,
}

#[derive(Debug, Serialize, ToSchema)]
pub(crate) struct PostDto {
    pub(crate) id: i64,
    pub(crate) title: String,
    pub(crate) content: String,
    pub(crate) image_url: String,
    pub(crate) creator_id: i64,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub(crate) struct CreatorDto {
    pub(crate) id: i64,
    pub(crate) name: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub(crate) struct CreatePostResponseDto {
    pub(crate) post: PostDto,
    pub(crate) creator: CreatorDto,
}

#[derive(Debug, Serialize, ToSchema)]
pub(crate) struct ListPostsResponseDto {
    pub(crate) posts: Vec<PostDto>,
    pub(crate) page: u32,
    pub(crate) per_page: u32,
    pub(crate) total: i64,
}

impl From<Post> for PostDto {
    fn from(post: Post) -> Self {
        Self {
            id: post.id,
            title: post.title,
            content: post.content,
            image_url: post.image_url,
            creator_id: post.creator_id,
            created_at: post.created_at,
            updated_at: post.updated_at,
        }
    }
}

impl From<CreatorRef> for CreatorDto {
    fn from(creator: CreatorRef) -> Self {
        Self {
            id: creator.id,
            name: creator.name,
        }
    }
}

impl From<CreatedPost> for CreatePostResponseDto {
    fn from(created: CreatedPost) -> Self {
        Self {
            post: created.post.into(),
            creator: created.creator.into(),
        }
    }
}

impl From<ListPostsResult> for ListPostsResponseDto {
    fn from(result: ListPostsResult) -> Self {
        Self {
            posts: result.posts.into_iter().map(PostDto::from).collect(),
            page: result.page,
            per_page: result.page_size,
            total: result.total,
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/posts",
    tag = "posts",
    params(
        ("page" = Option<u32>, Query, description = "1-indexed page (>= 1)"),
        ("per_page" = Option<u32>, Query, description = "Items per page (1..=100)")
    ),
    responses(
        (status = 200, description = "Posts listed", body = ListPostsResponseDto),
        (status = 422, description = "Validation error"),
        (status = 500, description = "Internal error")
    )
)]
pub(crate) async fn list_posts(
    State(state): State<AppState>,
    Query(query): Query<PaginationQuery>,
) -> AppResult<(StatusCode, Json<ListPostsResponseDto>)> {
    query.validate()?;
    let page = query.page.unwrap_or(1);
    let page_size = query.per_page.unwrap_or(state.feed_page_size);

    let result = state.feed_service.list_posts(page, page_size).await?;

    Ok((StatusCode::OK, Json(ListPostsResponseDto::from(result))))
}

#[utoipa::path(
    get,
    path = "/api/posts/{id}",
    tag = "posts",
    params(
        ("id" = i64, Path, description = "Post id")
    ),
    responses(
        (status = 200, description = "Post found", body = PostDto),
        (status = 404, description = "Post not found"),
        (status = 500, description = "Internal error")
    )
)]
pub(crate) async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<(StatusCode, Json<PostDto>)> {
    let result = state.feed_service.get_post(id).await?;

    Ok((StatusCode::OK, Json(PostDto::from(result))))
}

#[utoipa::path(
    post,
    path = "/api/posts",
    tag = "posts",
    security(
        ("bearer_auth" = [])
    ),
    request_body = CreatePostDto,
    responses(
        (status = 201, description = "Post created", body = CreatePostResponseDto),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Owner not found"),
        (status = 422, description = "Validation error"),
        (status = 500, description = "Internal error")
    )
)]
pub(crate) async fn create_post(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    Json(dto): Json<CreatePostDto>,
) -> AppResult<(StatusCode, Json<CreatePostResponseDto>)> {
    dto.validate()?;
    let req = CreatePostRequest {
        title: dto.title,
        content: dto.content,
        image_url: dto.image_url,
    };

    let created = state.feed_service.create_post(auth.user_id, req).await?;
    Ok((
        StatusCode::CREATED,
        Json(CreatePostResponseDto::from(created)),
    ))
}

#[utoipa::path(
    put,
    path = "/api/posts/{id}",
    tag = "posts",
    security(
        ("bearer_auth" = [])
    ),
    params(
        ("id" = i64, Path, description = "Post id")
    ),
    request_body = UpdatePostDto,
    responses(
        (status = 200, description = "Post updated", body = PostDto),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Post not found"),
        (status = 422, description = "Validation error"),
        (status = 500, description = "Internal error")
    )
)]
pub(crate) async fn update_post(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    Path(id): Path<i64>,
    Json(dto): Json<UpdatePostDto>,
) -> AppResult<(StatusCode, Json<PostDto>)> {
    dto.validate()?;
    let req = UpdatePostRequest {
        title: dto.title,
        content: dto.content,
        image_url: dto.image_url,
    };

    let result = state
        .feed_service
        .update_post(auth.user_id, id, req)
        .await?;
    Ok((StatusCode::OK, Json(PostDto::from(result))))
}

#[utoipa::path(
    delete,
    path = "/api/posts/{id}",
    tag = "posts",
    security(
        ("bearer_auth" = [])
    ),
    params(
        ("id" = i64, Path, description = "Post id")
    ),
    responses(
        (status = 204, description = "Post deleted"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Post not found"),
        (status = 500, description = "Internal error")
    )
)]
pub(crate) async fn delete_post(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    state.feed_service.delete_post(auth.user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
