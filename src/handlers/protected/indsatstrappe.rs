use axum::extract::Extension;
use uuid::Uuid;

use crate::database::models::{IndsatstrappeStep, StepPeriod};
use crate::handlers::{ApiJson, ApiPath};
use crate::middleware::{ApiResponse, ApiResult, CurrentUser};
use crate::services::indsatstrappe::{CreatePlan, NewStep, PlanView, ReorderSteps, StepView, UpdatePlan, UpdateStep};
use crate::services::IndsatstrappeService;
use crate::state::AppState;

fn service(state: &AppState) -> IndsatstrappeService {
    IndsatstrappeService::new(state.pool.clone(), state.notifier.clone())
}

/// GET /api/children/:child_id/indsatstrappe
pub async fn list(
    Extension(state): Extension<AppState>,
    user: CurrentUser,
    ApiPath(child_id): ApiPath<Uuid>,
) -> ApiResult<Vec<PlanView>> {
    Ok(ApiResponse::success(service(&state).list(user.id, child_id).await?))
}

/// POST /api/children/:child_id/indsatstrappe
pub async fn create(
    Extension(state): Extension<AppState>,
    user: CurrentUser,
    ApiPath(child_id): ApiPath<Uuid>,
    ApiJson(input): ApiJson<CreatePlan>,
) -> ApiResult<PlanView> {
    Ok(ApiResponse::created(service(&state).create(user.id, child_id, &input).await?))
}

/// GET /api/indsatstrappe/:plan_id
pub async fn get(
    Extension(state): Extension<AppState>,
    user: CurrentUser,
    ApiPath(plan_id): ApiPath<Uuid>,
) -> ApiResult<PlanView> {
    Ok(ApiResponse::success(service(&state).get(user.id, plan_id).await?))
}

/// PUT /api/indsatstrappe/:plan_id
pub async fn update(
    Extension(state): Extension<AppState>,
    user: CurrentUser,
    ApiPath(plan_id): ApiPath<Uuid>,
    ApiJson(input): ApiJson<UpdatePlan>,
) -> ApiResult<PlanView> {
    Ok(ApiResponse::success(service(&state).update(user.id, plan_id, &input).await?))
}

/// DELETE /api/indsatstrappe/:plan_id
pub async fn delete(
    Extension(state): Extension<AppState>,
    user: CurrentUser,
    ApiPath(plan_id): ApiPath<Uuid>,
) -> ApiResult<()> {
    service(&state).delete(user.id, plan_id).await?;
    Ok(ApiResponse::no_content())
}

/// POST /api/indsatstrappe/:plan_id/complete
pub async fn complete(
    Extension(state): Extension<AppState>,
    user: CurrentUser,
    ApiPath(plan_id): ApiPath<Uuid>,
) -> ApiResult<PlanView> {
    Ok(ApiResponse::success(service(&state).complete(user.id, plan_id).await?))
}

/// POST /api/indsatstrappe/:plan_id/steps
pub async fn step_create(
    Extension(state): Extension<AppState>,
    user: CurrentUser,
    ApiPath(plan_id): ApiPath<Uuid>,
    ApiJson(input): ApiJson<NewStep>,
) -> ApiResult<IndsatstrappeStep> {
    Ok(ApiResponse::created(service(&state).add_step(user.id, plan_id, &input).await?))
}

/// PUT /api/indsatstrappe/:plan_id/steps/:step_id
pub async fn step_update(
    Extension(state): Extension<AppState>,
    user: CurrentUser,
    ApiPath((plan_id, step_id)): ApiPath<(Uuid, Uuid)>,
    ApiJson(input): ApiJson<UpdateStep>,
) -> ApiResult<IndsatstrappeStep> {
    let step = service(&state).update_step(user.id, plan_id, step_id, &input).await?;
    Ok(ApiResponse::success(step))
}

/// DELETE /api/indsatstrappe/:plan_id/steps/:step_id
pub async fn step_delete(
    Extension(state): Extension<AppState>,
    user: CurrentUser,
    ApiPath((plan_id, step_id)): ApiPath<(Uuid, Uuid)>,
) -> ApiResult<()> {
    service(&state).delete_step(user.id, plan_id, step_id).await?;
    Ok(ApiResponse::no_content())
}

/// PUT /api/indsatstrappe/:plan_id/step-order
pub async fn step_order(
    Extension(state): Extension<AppState>,
    user: CurrentUser,
    ApiPath(plan_id): ApiPath<Uuid>,
    ApiJson(input): ApiJson<ReorderSteps>,
) -> ApiResult<Vec<IndsatstrappeStep>> {
    Ok(ApiResponse::success(service(&state).reorder(user.id, plan_id, &input).await?))
}

/// POST /api/indsatstrappe/:plan_id/steps/:step_id/activate
pub async fn step_activate(
    Extension(state): Extension<AppState>,
    user: CurrentUser,
    ApiPath((plan_id, step_id)): ApiPath<(Uuid, Uuid)>,
) -> ApiResult<StepView> {
    let step = service(&state).activate_step(&user, plan_id, step_id).await?;
    Ok(ApiResponse::success(step))
}

/// POST /api/indsatstrappe/:plan_id/steps/:step_id/deactivate
pub async fn step_deactivate(
    Extension(state): Extension<AppState>,
    user: CurrentUser,
    ApiPath((plan_id, step_id)): ApiPath<(Uuid, Uuid)>,
) -> ApiResult<StepView> {
    let step = service(&state).deactivate_step(user.id, plan_id, step_id).await?;
    Ok(ApiResponse::success(step))
}

/// POST /api/indsatstrappe/:plan_id/steps/:step_id/complete
pub async fn step_complete(
    Extension(state): Extension<AppState>,
    user: CurrentUser,
    ApiPath((plan_id, step_id)): ApiPath<(Uuid, Uuid)>,
) -> ApiResult<StepView> {
    let step = service(&state).complete_step(user.id, plan_id, step_id).await?;
    Ok(ApiResponse::success(step))
}

/// POST /api/indsatstrappe/:plan_id/steps/:step_id/reopen
pub async fn step_reopen(
    Extension(state): Extension<AppState>,
    user: CurrentUser,
    ApiPath((plan_id, step_id)): ApiPath<(Uuid, Uuid)>,
) -> ApiResult<StepView> {
    let step = service(&state).reopen_step(user.id, plan_id, step_id).await?;
    Ok(ApiResponse::success(step))
}

/// GET /api/indsatstrappe/:plan_id/periods
pub async fn periods(
    Extension(state): Extension<AppState>,
    user: CurrentUser,
    ApiPath(plan_id): ApiPath<Uuid>,
) -> ApiResult<Vec<StepPeriod>> {
    Ok(ApiResponse::success(service(&state).periods(user.id, plan_id).await?))
}
