//! Barometer, dagens smiley and sengetider share one set of handlers; the
//! `:kind` path segment selects the tool table.

use axum::extract::Extension;
use serde_json::Value;
use uuid::Uuid;

use crate::database::models::ToolKind;
use crate::handlers::{ApiJson, ApiPath, ApiQuery};
use crate::middleware::{ApiResponse, ApiResult, CurrentUser};
use crate::services::tools::{CreateTool, EntryRange, SetAccess, ToolEntry, ToolView, UpdateTool};
use crate::services::ToolService;
use crate::state::AppState;

fn service(state: &AppState) -> ToolService {
    ToolService::new(state.pool.clone(), state.notifier.clone())
}

/// GET /api/children/:child_id/tools/:kind - tools the caller can see
pub async fn list(
    Extension(state): Extension<AppState>,
    user: CurrentUser,
    ApiPath((child_id, kind)): ApiPath<(Uuid, ToolKind)>,
) -> ApiResult<Vec<ToolView>> {
    let tools = service(&state).list(user.id, child_id, kind).await?;
    Ok(ApiResponse::success(tools))
}

/// POST /api/children/:child_id/tools/:kind
pub async fn create(
    Extension(state): Extension<AppState>,
    user: CurrentUser,
    ApiPath((child_id, kind)): ApiPath<(Uuid, ToolKind)>,
    ApiJson(input): ApiJson<CreateTool>,
) -> ApiResult<ToolView> {
    let tool = service(&state).create(user.id, child_id, kind, &input).await?;
    Ok(ApiResponse::created(tool))
}

/// GET /api/tools/:kind/:tool_id
pub async fn get(
    Extension(state): Extension<AppState>,
    user: CurrentUser,
    ApiPath((kind, tool_id)): ApiPath<(ToolKind, Uuid)>,
) -> ApiResult<ToolView> {
    let tool = service(&state).get(user.id, kind, tool_id).await?;
    Ok(ApiResponse::success(tool))
}

/// PUT /api/tools/:kind/:tool_id
pub async fn update(
    Extension(state): Extension<AppState>,
    user: CurrentUser,
    ApiPath((kind, tool_id)): ApiPath<(ToolKind, Uuid)>,
    ApiJson(input): ApiJson<UpdateTool>,
) -> ApiResult<ToolView> {
    let tool = service(&state).update(user.id, kind, tool_id, &input).await?;
    Ok(ApiResponse::success(tool))
}

/// DELETE /api/tools/:kind/:tool_id
pub async fn delete(
    Extension(state): Extension<AppState>,
    user: CurrentUser,
    ApiPath((kind, tool_id)): ApiPath<(ToolKind, Uuid)>,
) -> ApiResult<()> {
    service(&state).delete(user.id, kind, tool_id).await?;
    Ok(ApiResponse::no_content())
}

/// PUT /api/tools/:kind/:tool_id/access - replaces visibility and the access list
pub async fn access_put(
    Extension(state): Extension<AppState>,
    user: CurrentUser,
    ApiPath((kind, tool_id)): ApiPath<(ToolKind, Uuid)>,
    ApiJson(input): ApiJson<SetAccess>,
) -> ApiResult<ToolView> {
    let tool = service(&state).set_access(user.id, kind, tool_id, &input).await?;
    Ok(ApiResponse::success(tool))
}

/// GET /api/tools/:kind/:tool_id/entries?from=&to=
pub async fn entries_get(
    Extension(state): Extension<AppState>,
    user: CurrentUser,
    ApiPath((kind, tool_id)): ApiPath<(ToolKind, Uuid)>,
    ApiQuery(range): ApiQuery<EntryRange>,
) -> ApiResult<Vec<ToolEntry>> {
    let entries = service(&state).entries(user.id, kind, tool_id, range).await?;
    Ok(ApiResponse::success(entries))
}

/// POST /api/tools/:kind/:tool_id/entries - body shape depends on the kind
pub async fn entries_post(
    Extension(state): Extension<AppState>,
    user: CurrentUser,
    ApiPath((kind, tool_id)): ApiPath<(ToolKind, Uuid)>,
    ApiJson(body): ApiJson<Value>,
) -> ApiResult<ToolEntry> {
    let entry = service(&state).record_entry(&user, kind, tool_id, body).await?;
    Ok(ApiResponse::created(entry))
}

/// DELETE /api/tools/:kind/:tool_id/entries/:entry_id
pub async fn entry_delete(
    Extension(state): Extension<AppState>,
    user: CurrentUser,
    ApiPath((kind, tool_id, entry_id)): ApiPath<(ToolKind, Uuid, Uuid)>,
) -> ApiResult<()> {
    service(&state).delete_entry(user.id, kind, tool_id, entry_id).await?;
    Ok(ApiResponse::no_content())
}
