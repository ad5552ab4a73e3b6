//! Database-backed; set TEST_DATABASE_URL to run against a disposable Postgres.
mod common;

use anyhow::Result;
use axum::http::StatusCode;
use serde_json::{json, Value};
use uuid::Uuid;

use common::TestUser;

async fn plan_with_steps(app: &axum::Router, admin: &TestUser) -> Result<(String, Value)> {
    let (_, child) = common::post(
        app,
        "/api/children",
        &admin.token,
        json!({ "name": "Viggo", "relation_type": "parent" }),
    )
    .await?;
    let child_id = child["data"]["id"].as_str().unwrap_or_default().to_string();

    let (status, plan) = common::post(
        app,
        &format!("/api/children/{}/indsatstrappe", child_id),
        &admin.token,
        json!({
            "title": "Tilbage i klassen",
            "start_date": "2024-08-12",
            "target_date": "2024-12-20",
            "steps": [
                { "title": "Morgensamling", "maalsaetning": "Deltager 10 minutter" },
                { "title": "Første lektion" },
                { "title": "Hele skoledagen" }
            ]
        }),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED, "{}", plan);
    Ok((child_id, plan["data"].clone()))
}

fn step_id(plan: &Value, index: usize) -> String {
    plan["steps"][index]["id"].as_str().unwrap_or_default().to_string()
}

#[tokio::test]
async fn new_plan_is_active_with_numbered_steps() -> Result<()> {
    let Some(app) = common::database_app().await? else { return Ok(()) };
    let admin = TestUser::new("mor");
    let (child_id, plan) = plan_with_steps(&app, &admin).await?;

    assert_eq!(plan["is_active"], true);
    let numbers: Vec<i64> = plan["steps"]
        .as_array()
        .map(|s| s.iter().filter_map(|s| s["step_number"].as_i64()).collect())
        .unwrap_or_default();
    assert_eq!(numbers, vec![1, 2, 3]);

    // A second plan takes over as the active one
    let (_, second) = common::post(
        &app,
        &format!("/api/children/{}/indsatstrappe", child_id),
        &admin.token,
        json!({ "title": "Plan B" }),
    )
    .await?;
    assert_eq!(second["data"]["is_active"], true);

    let (_, first) = common::get(&app, &format!("/api/indsatstrappe/{}", plan["id"].as_str().unwrap_or_default()), Some(&admin.token)).await?;
    assert_eq!(first["data"]["is_active"], false);
    Ok(())
}

#[tokio::test]
async fn activating_a_step_closes_the_previous_period() -> Result<()> {
    let Some(app) = common::database_app().await? else { return Ok(()) };
    let admin = TestUser::new("mor");
    let (_, plan) = plan_with_steps(&app, &admin).await?;
    let plan_id = plan["id"].as_str().unwrap_or_default().to_string();
    let base = format!("/api/indsatstrappe/{}", plan_id);

    let (status, first) = common::post(&app, &format!("{}/steps/{}/activate", base, step_id(&plan, 0)), &admin.token, json!({})).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["data"]["is_active"], true);

    // Activating again is a no-op
    let (status, _) = common::post(&app, &format!("{}/steps/{}/activate", base, step_id(&plan, 0)), &admin.token, json!({})).await?;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = common::post(&app, &format!("{}/steps/{}/activate", base, step_id(&plan, 1)), &admin.token, json!({})).await?;
    assert_eq!(status, StatusCode::OK);

    let (_, periods) = common::get(&app, &format!("{}/periods", base), Some(&admin.token)).await?;
    let periods = periods["data"].as_array().cloned().unwrap_or_default();
    assert_eq!(periods.len(), 2);
    assert!(!periods[0]["deactivated_at"].is_null());
    assert!(periods[1]["deactivated_at"].is_null());
    Ok(())
}

#[tokio::test]
async fn completed_steps_cannot_be_activated() -> Result<()> {
    let Some(app) = common::database_app().await? else { return Ok(()) };
    let admin = TestUser::new("mor");
    let (_, plan) = plan_with_steps(&app, &admin).await?;
    let base = format!("/api/indsatstrappe/{}/steps/{}", plan["id"].as_str().unwrap_or_default(), step_id(&plan, 2));

    let (status, step) = common::post(&app, &format!("{}/complete", base), &admin.token, json!({})).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(step["data"]["is_completed"], true);

    let (status, _) = common::post(&app, &format!("{}/activate", base), &admin.token, json!({})).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = common::post(&app, &format!("{}/reopen", base), &admin.token, json!({})).await?;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = common::post(&app, &format!("{}/activate", base), &admin.token, json!({})).await?;
    assert_eq!(status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn steps_are_renumbered_and_reordered() -> Result<()> {
    let Some(app) = common::database_app().await? else { return Ok(()) };
    let admin = TestUser::new("mor");
    let (_, plan) = plan_with_steps(&app, &admin).await?;
    let base = format!("/api/indsatstrappe/{}", plan["id"].as_str().unwrap_or_default());
    let (a, b, c) = (step_id(&plan, 0), step_id(&plan, 1), step_id(&plan, 2));

    let (status, _) = common::put(&app, &format!("{}/step-order", base), &admin.token, json!({ "step_ids": [a, b] })).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, reordered) = common::put(&app, &format!("{}/step-order", base), &admin.token, json!({ "step_ids": [c, a, b] })).await?;
    assert_eq!(status, StatusCode::OK, "{}", reordered);
    assert_eq!(reordered["data"][0]["id"], c.as_str());

    let (status, _) = common::delete(&app, &format!("{}/steps/{}", base, a), &admin.token).await?;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, after) = common::get(&app, &base, Some(&admin.token)).await?;
    let steps = after["data"]["steps"].as_array().cloned().unwrap_or_default();
    assert_eq!(steps.len(), 2);
    assert_eq!(steps[0]["id"], c.as_str());
    assert_eq!(steps[1]["id"], b.as_str());
    assert_eq!(steps[1]["step_number"], 2);
    Ok(())
}

#[tokio::test]
async fn deactivating_or_completing_a_plan_closes_its_period() -> Result<()> {
    let Some(app) = common::database_app().await? else { return Ok(()) };
    let admin = TestUser::new("mor");
    let (_, plan) = plan_with_steps(&app, &admin).await?;
    let base = format!("/api/indsatstrappe/{}", plan["id"].as_str().unwrap_or_default());
    let open_periods = |periods: &Value| {
        periods["data"]
            .as_array()
            .map(|p| p.iter().filter(|p| p["deactivated_at"].is_null()).count())
            .unwrap_or_default()
    };

    common::post(&app, &format!("{}/steps/{}/activate", base, step_id(&plan, 0)), &admin.token, json!({})).await?;
    let (status, updated) = common::put(&app, &base, &admin.token, json!({ "is_active": false })).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["data"]["is_active"], false);
    let (_, periods) = common::get(&app, &format!("{}/periods", base), Some(&admin.token)).await?;
    assert_eq!(open_periods(&periods), 0);

    // Inactive plans refuse activation until switched back on
    let (status, _) = common::post(&app, &format!("{}/steps/{}/activate", base, step_id(&plan, 1)), &admin.token, json!({})).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = common::put(&app, &base, &admin.token, json!({ "is_active": true })).await?;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = common::post(&app, &format!("{}/steps/{}/activate", base, step_id(&plan, 1)), &admin.token, json!({})).await?;
    assert_eq!(status, StatusCode::OK);

    let (status, completed) = common::post(&app, &format!("{}/complete", base), &admin.token, json!({})).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(completed["data"]["is_completed"], true);
    assert_eq!(completed["data"]["is_active"], false);
    let (_, periods) = common::get(&app, &format!("{}/periods", base), Some(&admin.token)).await?;
    assert_eq!(periods["data"].as_array().map(Vec::len), Some(2));
    assert_eq!(open_periods(&periods), 0);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_activations_leave_one_open_period() -> Result<()> {
    let Some(db) = common::database().await? else { return Ok(()) };
    let admin = TestUser::new("mor");

    for _ in 0..10 {
        let (_, plan) = plan_with_steps(&db.app, &admin).await?;
        let plan_id: Uuid = plan["id"].as_str().unwrap_or_default().parse()?;
        let base = format!("/api/indsatstrappe/{}", plan_id);
        let first = format!("{}/steps/{}/activate", base, step_id(&plan, 0));
        let second = format!("{}/steps/{}/activate", base, step_id(&plan, 1));

        let (a, b) = tokio::join!(
            common::post(&db.app, &first, &admin.token, json!({})),
            common::post(&db.app, &second, &admin.token, json!({})),
        );
        assert_eq!(a?.0, StatusCode::OK);
        assert_eq!(b?.0, StatusCode::OK);

        let open: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM step_periods p
            JOIN indsatstrappe_steps s ON s.id = p.step_id
            WHERE s.indsatstrappe_id = $1 AND p.deactivated_at IS NULL
            "#,
        )
        .bind(plan_id)
        .fetch_one(&db.pool)
        .await?;
        assert_eq!(open, 1, "plan {} has {} open periods", plan_id, open);
    }
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_appends_get_distinct_numbers() -> Result<()> {
    let Some(db) = common::database().await? else { return Ok(()) };
    let admin = TestUser::new("mor");
    let (_, plan) = plan_with_steps(&db.app, &admin).await?;
    let steps = format!("/api/indsatstrappe/{}/steps", plan["id"].as_str().unwrap_or_default());

    let (a, b) = tokio::join!(
        common::post(&db.app, &steps, &admin.token, json!({ "title": "Frikvarter" })),
        common::post(&db.app, &steps, &admin.token, json!({ "title": "Idræt" })),
    );
    let (a, b) = (a?, b?);
    assert_eq!(a.0, StatusCode::CREATED, "{}", a.1);
    assert_eq!(b.0, StatusCode::CREATED, "{}", b.1);

    let mut numbers = vec![a.1["data"]["step_number"].as_i64(), b.1["data"]["step_number"].as_i64()];
    numbers.sort();
    assert_eq!(numbers, vec![Some(4), Some(5)]);
    Ok(())
}
