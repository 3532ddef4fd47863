mod support;

use axum::http::StatusCode;
use hakkutsu::{accounts, db::Role};
use serde_json::json;
use support::{Member, TestApp};

/// A recruiter with a listing (that someone applied to), an application of
/// their own and an article.
async fn busy_recruiter(app: &TestApp) -> (Member, Member) {
    let recruiter = app.sign_up("recruiter@example.com", "採用担当者").await;
    app.set_role(&recruiter, Role::Recruiter).await;
    let other = app.sign_up("other@example.com", "他社").await;

    let mine = app.create_listing(&recruiter, "重機オペレーター").await;
    let theirs = app.create_listing(&other, "測量補助").await;
    app.post(&format!("/jobs/{mine}/apply"), &[], Some(&other)).await;
    app.post(&format!("/jobs/{theirs}/apply"), &[], Some(&recruiter)).await;
    app.post("/learning", &[("title", "安全帯の話"), ("content", "必ず着用")], Some(&recruiter))
        .await;

    (recruiter, other)
}

async fn assert_owned_data_gone(app: &TestApp, id: uuid::Uuid) {
    assert_eq!(app.count("SELECT COUNT(*) FROM applications WHERE applicant_id = ?", id).await, 0);
    assert_eq!(app.count("SELECT COUNT(*) FROM jobs WHERE created_by = ?", id).await, 0);
    assert_eq!(app.count("SELECT COUNT(*) FROM articles WHERE author_id = ?", id).await, 0);
    assert_eq!(app.count("SELECT COUNT(*) FROM profiles WHERE id = ?", id).await, 0);
}

#[tokio::test]
async fn deleting_an_account_removes_everything_it_owns() {
    let app = support::spawn().await;
    let (recruiter, other) = busy_recruiter(&app).await;

    let reply = app.post("/settings/delete-account", &[], Some(&recruiter)).await;
    assert_eq!(reply.json(), json!({ "success": true, "redirect": "/auth" }));

    assert_owned_data_gone(&app, recruiter.id).await;
    assert_eq!(app.count("SELECT COUNT(*) FROM identities WHERE id = ?", recruiter.id).await, 0);
    // the application to the deleted listing went with it
    assert_eq!(app.count("SELECT COUNT(*) FROM applications WHERE applicant_id = ?", other.id).await, 0);
    assert_eq!(app.count("SELECT COUNT(*) FROM account_deletions WHERE identity_id = ?", recruiter.id).await, 0);

    let after = app.get("/mypage", Some(&recruiter)).await;
    assert_eq!(after.status, StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn stepwise_fallback_records_progress_and_resumes() {
    let app = support::spawn().await;
    let (recruiter, _) = busy_recruiter(&app).await;

    sqlx::query(
        "CREATE TRIGGER block_identity_delete BEFORE DELETE ON identities
         BEGIN SELECT RAISE(ABORT, 'identity store unavailable'); END",
    )
    .execute(&app.db_pool)
    .await
    .expect("trigger");

    let reply = app.post("/settings/delete-account", &[], Some(&recruiter)).await;
    assert_eq!(reply.json()["redirect"], json!("/auth"));

    assert_owned_data_gone(&app, recruiter.id).await;
    assert_eq!(app.count("SELECT COUNT(*) FROM identities WHERE id = ?", recruiter.id).await, 1);

    let (next_step, attempts): (String, i64) =
        sqlx::query_as("SELECT next_step, attempts FROM account_deletions WHERE identity_id = ?")
            .bind(recruiter.id)
            .fetch_one(&app.db_pool)
            .await
            .expect("job recorded");
    assert_eq!(next_step, "identity");
    assert_eq!(attempts, 1);

    // the session is gone even though the identity is not
    let after = app.get("/mypage", Some(&recruiter)).await;
    assert_eq!(after.status, StatusCode::SEE_OTHER);

    let still_blocked = accounts::resume_pending(&app.db_pool).await.expect("resume runs");
    assert_eq!(still_blocked, accounts::ResumeReport { completed: 0, failed: 1 });

    sqlx::query("DROP TRIGGER block_identity_delete")
        .execute(&app.db_pool)
        .await
        .expect("drop trigger");

    let report = accounts::resume_pending(&app.db_pool).await.expect("resume runs");
    assert_eq!(report, accounts::ResumeReport { completed: 1, failed: 0 });
    assert_eq!(app.count("SELECT COUNT(*) FROM identities WHERE id = ?", recruiter.id).await, 0);
    assert_eq!(app.count("SELECT COUNT(*) FROM account_deletions WHERE identity_id = ?", recruiter.id).await, 0);
}
