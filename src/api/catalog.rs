//! Section and author catalog endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::{
        author::{Author, CreateAuthor, UpdateAuthor},
        section::{CreateSection, Section, UpdateSection},
    },
};

use super::AuthenticatedUser;

/// List all sections
#[utoipa::path(
    get,
    path = "/sections",
    tag = "catalog",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "All sections", body = Vec<Section>)
    )
)]
pub async fn list_sections(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
) -> AppResult<Json<Vec<Section>>> {
    let sections = state.services.catalog.list_sections().await?;
    Ok(Json(sections))
}

/// Get section by ID
#[utoipa::path(
    get,
    path = "/sections/{id}",
    tag = "catalog",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Section ID")),
    responses(
        (status = 200, description = "Section details", body = Section),
        (status = 404, description = "Section not found")
    )
)]
pub async fn get_section(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Section>> {
    let section = state.services.catalog.get_section(id).await?;
    Ok(Json(section))
}

/// Create a new section
#[utoipa::path(
    post,
    path = "/sections",
    tag = "catalog",
    security(("bearer_auth" = [])),
    request_body = CreateSection,
    responses(
        (status = 201, description = "Section created", body = Section),
        (status = 409, description = "Section already exists")
    )
)]
pub async fn create_section(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(section): Json<CreateSection>,
) -> AppResult<(StatusCode, Json<Section>)> {
    let created = state.services.catalog.create_section(&claims, section).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Update a section (librarian only)
#[utoipa::path(
    put,
    path = "/sections/{id}",
    tag = "catalog",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Section ID")),
    request_body = UpdateSection,
    responses(
        (status = 200, description = "Section updated", body = Section),
        (status = 403, description = "Librarian role required"),
        (status = 404, description = "Section not found")
    )
)]
pub async fn update_section(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(section): Json<UpdateSection>,
) -> AppResult<Json<Section>> {
    let updated = state.services.catalog.update_section(&claims, id, section).await?;
    Ok(Json(updated))
}

/// Delete a section (librarian only)
#[utoipa::path(
    delete,
    path = "/sections/{id}",
    tag = "catalog",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Section ID")),
    responses(
        (status = 204, description = "Section deleted"),
        (status = 403, description = "Librarian role required"),
        (status = 404, description = "Section not found")
    )
)]
pub async fn delete_section(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    state.services.catalog.delete_section(&claims, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// List all authors
#[utoipa::path(
    get,
    path = "/authors",
    tag = "catalog",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "All authors", body = Vec<Author>)
    )
)]
pub async fn list_authors(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
) -> AppResult<Json<Vec<Author>>> {
    let authors = state.services.catalog.list_authors().await?;
    Ok(Json(authors))
}

/// Get author by ID
#[utoipa::path(
    get,
    path = "/authors/{id}",
    tag = "catalog",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Author ID")),
    responses(
        (status = 200, description = "Author details", body = Author),
        (status = 404, description = "Author not found")
    )
)]
pub async fn get_author(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Author>> {
    let author = state.services.catalog.get_author(id).await?;
    Ok(Json(author))
}

/// Create a new author
#[utoipa::path(
    post,
    path = "/authors",
    tag = "catalog",
    security(("bearer_auth" = [])),
    request_body = CreateAuthor,
    responses(
        (status = 201, description = "Author created", body = Author),
        (status = 409, description = "Author already exists")
    )
)]
pub async fn create_author(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(author): Json<CreateAuthor>,
) -> AppResult<(StatusCode, Json<Author>)> {
    let created = state.services.catalog.create_author(&claims, author).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Update an author (librarian only)
#[utoipa::path(
    put,
    path = "/authors/{id}",
    tag = "catalog",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Author ID")),
    request_body = UpdateAuthor,
    responses(
        (status = 200, description = "Author updated", body = Author),
        (status = 403, description = "Librarian role required"),
        (status = 404, description = "Author not found")
    )
)]
pub async fn update_author(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(author): Json<UpdateAuthor>,
) -> AppResult<Json<Author>> {
    let updated = state.services.catalog.update_author(&claims, id, author).await?;
    Ok(Json(updated))
}

/// Delete an author (librarian only)
#[utoipa::path(
    delete,
    path = "/authors/{id}",
    tag = "catalog",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Author ID")),
    responses(
        (status = 204, description = "Author deleted"),
        (status = 403, description = "Librarian role required"),
        (status = 404, description = "Author not found")
    )
)]
pub async fn delete_author(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    state.services.catalog.delete_author(&claims, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
