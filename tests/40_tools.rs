//! Database-backed; set TEST_DATABASE_URL to run against a disposable Postgres.
mod common;

use anyhow::Result;
use axum::http::StatusCode;
use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use common::TestUser;

struct Family {
    admin: TestUser,
    member: TestUser,
    child_id: String,
}

/// A child with an administrator and a non-administrator teacher
async fn family(app: &axum::Router) -> Result<Family> {
    let admin = TestUser::new("mor");
    let member = TestUser::new("laerer");

    let (_, child) = common::post(
        app,
        "/api/children",
        &admin.token,
        json!({ "name": "Oscar", "relation_type": "parent" }),
    )
    .await?;
    let child_id = child["data"]["id"].as_str().unwrap_or_default().to_string();

    let (_, invitation) = common::post(
        app,
        &format!("/api/children/{}/invitations", child_id),
        &admin.token,
        json!({ "email": member.email, "relation_type": "teacher" }),
    )
    .await?;
    let token = invitation["data"]["token"].as_str().unwrap_or_default().to_string();
    let (status, _) = common::post(app, "/api/invitations/accept", &member.token, json!({ "token": token })).await?;
    assert_eq!(status, StatusCode::OK);

    Ok(Family { admin, member, child_id })
}

#[tokio::test]
async fn barometer_ratings_respect_the_scale() -> Result<()> {
    let Some(app) = common::database_app().await? else { return Ok(()) };
    let f = family(&app).await?;

    let (status, tool) = common::post(
        &app,
        &format!("/api/children/{}/tools/barometer", f.child_id),
        &f.member.token,
        json!({ "topic": "Humør i frikvarteret", "scale_type": "1-5" }),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED, "{}", tool);
    assert_eq!(tool["data"]["kind"], "barometer");
    assert_eq!(tool["data"]["display_type"], "numbers");
    let tool_id = tool["data"]["id"].as_str().unwrap_or_default().to_string();
    let today = Utc::now().date_naive().to_string();

    let entries = format!("/api/tools/barometer/{}/entries", tool_id);
    let (status, _) = common::post(&app, &entries, &f.member.token, json!({ "entry_date": today, "rating": 6 })).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = common::post(&app, &entries, &f.member.token, json!({ "entry_date": today, "rating": 4 })).await?;
    assert_eq!(status, StatusCode::CREATED);

    // Same author and date overwrites
    let (status, _) = common::post(&app, &entries, &f.member.token, json!({ "entry_date": today, "rating": 2 })).await?;
    assert_eq!(status, StatusCode::CREATED);

    let (_, list) = common::get(&app, &entries, Some(&f.admin.token)).await?;
    let list = list["data"].as_array().cloned().unwrap_or_default();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["rating"], 2);

    // The administrator hears about the entry
    let (_, notes) = common::get(&app, "/api/notifications?unread_only=true", Some(&f.admin.token)).await?;
    assert!(notes["data"]["notifications"]
        .as_array()
        .map(|n| n.iter().any(|n| n["kind"] == "tool_entry"))
        .unwrap_or(false));
    Ok(())
}

#[tokio::test]
async fn private_tools_are_hidden_from_unlisted_members() -> Result<()> {
    let Some(app) = common::database_app().await? else { return Ok(()) };
    let f = family(&app).await?;

    let (_, tool) = common::post(
        &app,
        &format!("/api/children/{}/tools/dagens-smiley", f.child_id),
        &f.admin.token,
        json!({ "topic": "Dagens smiley", "is_public": false }),
    )
    .await?;
    let tool_id = tool["data"]["id"].as_str().unwrap_or_default().to_string();

    let (status, _) = common::get(&app, &format!("/api/tools/dagens-smiley/{}", tool_id), Some(&f.member.token)).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, listed) = common::get(
        &app,
        &format!("/api/children/{}/tools/dagens-smiley", f.child_id),
        Some(&f.member.token),
    )
    .await?;
    assert_eq!(listed["data"].as_array().map(Vec::len), Some(0));

    let (_, me) = common::get(&app, "/api/users/me", Some(&f.member.token)).await?;
    let (status, _) = common::put(
        &app,
        &format!("/api/tools/dagens-smiley/{}/access", tool_id),
        &f.admin.token,
        json!({ "is_public": false, "user_ids": [me["data"]["id"]] }),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = common::get(&app, &format!("/api/tools/dagens-smiley/{}", tool_id), Some(&f.member.token)).await?;
    assert_eq!(status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn sengetider_validates_times() -> Result<()> {
    let Some(app) = common::database_app().await? else { return Ok(()) };
    let f = family(&app).await?;

    let (_, tool) = common::post(
        &app,
        &format!("/api/children/{}/tools/sengetider", f.child_id),
        &f.admin.token,
        json!({ "topic": "Sengetider" }),
    )
    .await?;
    let entries = format!("/api/tools/sengetider/{}/entries", tool["data"]["id"].as_str().unwrap_or_default());
    let today = Utc::now().date_naive().to_string();

    let (status, _) = common::post(&app, &entries, &f.admin.token, json!({ "entry_date": today })).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = common::post(
        &app,
        &entries,
        &f.admin.token,
        json!({ "entry_date": today, "puttetid": "20:00", "sov_kl": "19:00" }),
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, entry) = common::post(
        &app,
        &entries,
        &f.admin.token,
        json!({ "entry_date": today, "puttetid": "19:45", "sov_kl": "20:15", "vaagnede": "06:30" }),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED, "{}", entry);
    assert_eq!(entry["data"]["sov_kl"], "20:15:00");

    let future = (Utc::now().date_naive() + chrono::Duration::days(5)).to_string();
    let (status, _) = common::post(&app, &entries, &f.admin.token, json!({ "entry_date": future, "puttetid": "19:00" })).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn members_cannot_delete_other_peoples_entries() -> Result<()> {
    let Some(app) = common::database_app().await? else { return Ok(()) };
    let f = family(&app).await?;

    let (_, tool) = common::post(
        &app,
        &format!("/api/children/{}/tools/barometer", f.child_id),
        &f.admin.token,
        json!({ "topic": "Koncentration", "scale_type": "1-10" }),
    )
    .await?;
    let entries = format!("/api/tools/barometer/{}/entries", tool["data"]["id"].as_str().unwrap_or_default());
    let (_, entry) = common::post(
        &app,
        &entries,
        &f.admin.token,
        json!({ "entry_date": Utc::now().date_naive().to_string(), "rating": 9 }),
    )
    .await?;
    let entry_url = format!("{}/{}", entries, entry["data"]["id"].as_str().unwrap_or_default());

    let (status, _) = common::delete(&app, &entry_url, &f.member.token).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = common::delete(&app, &entry_url, &f.admin.token).await?;
    assert_eq!(status, StatusCode::NO_CONTENT);
    Ok(())
}

#[tokio::test]
async fn entries_dated_tomorrow_are_rejected() -> Result<()> {
    let Some(app) = common::database_app().await? else { return Ok(()) };
    let f = family(&app).await?;

    let (_, tool) = common::post(
        &app,
        &format!("/api/children/{}/tools/barometer", f.child_id),
        &f.admin.token,
        json!({ "topic": "Søvnkvalitet" }),
    )
    .await?;
    let entries = format!("/api/tools/barometer/{}/entries", common::data_id(&tool));
    let tomorrow = (Utc::now().date_naive() + chrono::Duration::days(1)).to_string();

    let (status, body) = common::post(&app, &entries, &f.admin.token, json!({ "entry_date": tomorrow, "rating": 3 })).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);

    let yesterday = (Utc::now().date_naive() - chrono::Duration::days(1)).to_string();
    let (status, _) = common::post(&app, &entries, &f.admin.token, json!({ "entry_date": yesterday, "rating": 3 })).await?;
    assert_eq!(status, StatusCode::CREATED);
    Ok(())
}

#[tokio::test]
async fn access_lists_only_take_related_users() -> Result<()> {
    let Some(app) = common::database_app().await? else { return Ok(()) };
    let f = family(&app).await?;
    let outsider = TestUser::new("nabo");
    let outsider_id = common::user_id(&app, &outsider).await?;
    let member_id = common::user_id(&app, &f.member).await?;

    let (_, tool) = common::post(
        &app,
        &format!("/api/children/{}/tools/sengetider", f.child_id),
        &f.admin.token,
        json!({ "topic": "Sengetider", "is_public": false }),
    )
    .await?;
    let access = format!("/api/tools/sengetider/{}/access", common::data_id(&tool));

    let (status, _) = common::put(&app, &access, &f.admin.token, json!({ "is_public": false, "user_ids": [outsider_id] })).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Only the creator or an administrator manages the list
    let (status, _) = common::put(&app, &access, &f.member.token, json!({ "is_public": true, "user_ids": [] })).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, updated) = common::put(
        &app,
        &access,
        &f.admin.token,
        json!({ "is_public": false, "user_ids": [member_id, member_id] }),
    )
    .await?;
    assert_eq!(status, StatusCode::OK, "{}", updated);
    assert_eq!(updated["data"]["is_public"], false);
    assert_eq!(updated["data"]["access_user_ids"], json!([member_id]));

    let (status, updated) = common::put(&app, &access, &f.admin.token, json!({ "is_public": true, "user_ids": [] })).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["data"]["is_public"], true);
    assert_eq!(updated["data"]["access_user_ids"], json!([]));
    Ok(())
}

#[tokio::test]
async fn removed_caregivers_leave_access_lists() -> Result<()> {
    let Some(app) = common::database_app().await? else { return Ok(()) };
    let f = family(&app).await?;
    let member_id = common::user_id(&app, &f.member).await?;

    let (_, tool) = common::post(
        &app,
        &format!("/api/children/{}/tools/dagens-smiley", f.child_id),
        &f.admin.token,
        json!({ "topic": "Dagens smiley", "is_public": false, "access_user_ids": [member_id] }),
    )
    .await?;
    let tool_url = format!("/api/tools/dagens-smiley/{}", common::data_id(&tool));
    assert_eq!(tool["data"]["access_user_ids"], json!([member_id]));

    let (status, _) = common::delete(
        &app,
        &format!("/api/children/{}/users/{}", f.child_id, member_id),
        &f.admin.token,
    )
    .await?;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, after) = common::get(&app, &tool_url, Some(&f.admin.token)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(after["data"]["access_user_ids"], json!([]));
    Ok(())
}

#[tokio::test]
async fn deleting_a_child_clears_tool_access_rows() -> Result<()> {
    let Some(db) = common::database().await? else { return Ok(()) };
    let f = family(&db.app).await?;
    let member_id = common::user_id(&db.app, &f.member).await?;

    let (_, tool) = common::post(
        &db.app,
        &format!("/api/children/{}/tools/barometer", f.child_id),
        &f.admin.token,
        json!({ "topic": "Humør", "is_public": false, "access_user_ids": [member_id] }),
    )
    .await?;
    let tool_id: Uuid = common::data_id(&tool).parse()?;

    let count = |pool: sqlx::PgPool| async move {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM tool_user_access WHERE tool_id = $1")
            .bind(tool_id)
            .fetch_one(&pool)
            .await
    };
    assert_eq!(count(db.pool.clone()).await?, 1);

    let (status, _) = common::delete(&db.app, &format!("/api/children/{}", f.child_id), &f.admin.token).await?;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(count(db.pool.clone()).await?, 0);

    let (status, _) = common::get(&db.app, &format!("/api/tools/barometer/{}", tool_id), Some(&f.admin.token)).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}
