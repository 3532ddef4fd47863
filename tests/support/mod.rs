#![allow(dead_code)]

use axum::{
    body::{self, Body},
    http::{header, Request, StatusCode},
    Router,
};
use hakkutsu::{
    app,
    config::SessionConfig,
    db::{self, Role},
    identity::Identities,
    storage::ObjectStore,
    AppState,
};
use serde_json::Value;
use sqlx::SqlitePool;
use tower::ServiceExt;
use uuid::Uuid;

pub struct TestApp {
    pub router: Router,
    pub db_pool: SqlitePool,
}

/// A signed-in browser: the session cookie plus the identity behind it.
#[derive(Debug, Clone)]
pub struct Member {
    pub id: Uuid,
    pub cookie: String,
}

pub struct Reply {
    pub status: StatusCode,
    pub location: Option<String>,
    pub cookie: Option<String>,
    pub text: String,
}

impl Reply {
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.text).expect("json body")
    }
}

fn encode(value: &str) -> String {
    value
        .bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' => (b as char).to_string(),
            _ => format!("%{b:02X}"),
        })
        .collect()
}

pub fn form(fields: &[(&str, &str)]) -> String {
    fields
        .iter()
        .map(|(k, v)| format!("{}={}", encode(k), encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

pub async fn spawn() -> TestApp {
    let db_pool = db::connect_in_memory().await.expect("in-memory db");
    let identities = Identities::new(db_pool.clone(), time::Duration::minutes(10));
    let uploads = std::env::temp_dir().join(format!("hakkutsu-test-{}", Uuid::now_v7()));
    let objects = ObjectStore::new(uploads, 1024 * 1024);

    let router = app(AppState::new(db_pool.clone(), identities, objects), &SessionConfig::default());
    TestApp { router, db_pool }
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> Reply {
        let response = self.router.clone().oneshot(request).await.expect("router answers");

        let status = response.status();
        let header_str = |name| {
            response
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_owned)
        };
        let location = header_str(header::LOCATION);
        let cookie = header_str(header::SET_COOKIE)
            .and_then(|c| c.split(';').next().map(str::to_owned));

        let bytes = body::to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let text = String::from_utf8(bytes.to_vec()).expect("utf-8 body");
        Reply { status, location, cookie, text }
    }

    pub async fn get(&self, path: &str, member: Option<&Member>) -> Reply {
        let mut request = Request::get(path);
        if let Some(member) = member {
            request = request.header(header::COOKIE, &member.cookie);
        }
        self.send(request.body(Body::empty()).expect("request")).await
    }

    pub async fn post(&self, path: &str, fields: &[(&str, &str)], member: Option<&Member>) -> Reply {
        let mut request = Request::post(path).header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(member) = member {
            request = request.header(header::COOKIE, &member.cookie);
        }
        self.send(request.body(Body::from(form(fields))).expect("request")).await
    }

    /// Posts one file as the `file` field of a multipart form.
    pub async fn upload(&self, bucket: &str, content_type: &str, bytes: &[u8], member: Option<&Member>) -> Reply {
        const BOUNDARY: &str = "hakkutsu-test-boundary";

        let mut body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"upload\"\r\nContent-Type: {content_type}\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(bytes);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        let mut request = Request::post(format!("/upload/{bucket}"))
            .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"));
        if let Some(member) = member {
            request = request.header(header::COOKIE, &member.cookie);
        }
        self.send(request.body(Body::from(body)).expect("request")).await
    }

    pub async fn sign_up(&self, email: &str, display_name: &str) -> Member {
        let reply = self
            .post(
                "/auth/signup",
                &[
                    ("email", email),
                    ("password", "hunter22"),
                    ("confirm_password", "hunter22"),
                    ("display_name", display_name),
                ],
                None,
            )
            .await;
        assert_eq!(reply.status, StatusCode::OK, "sign-up failed: {}", reply.text);

        let id: Uuid = sqlx::query_scalar("SELECT id FROM identities WHERE email = ?")
            .bind(email)
            .fetch_one(&self.db_pool)
            .await
            .expect("identity exists");
        Member { id, cookie: reply.cookie.expect("session cookie") }
    }

    pub async fn set_role(&self, member: &Member, role: Role) {
        sqlx::query("UPDATE profiles SET role = ? WHERE id = ?")
            .bind(role)
            .bind(member.id)
            .execute(&self.db_pool)
            .await
            .expect("role set");
    }

    pub async fn create_listing(&self, owner: &Member, title: &str) -> Uuid {
        let reply = self
            .post(
                "/jobs",
                &[("title", title), ("location", "札幌"), ("salary", "月給30万円")],
                Some(owner),
            )
            .await;
        assert_eq!(reply.status, StatusCode::OK, "listing not created: {}", reply.text);

        sqlx::query_scalar("SELECT id FROM jobs WHERE title = ? AND created_by = ?")
            .bind(title)
            .bind(owner.id)
            .fetch_one(&self.db_pool)
            .await
            .expect("listing stored")
    }

    pub async fn count(&self, sql: &str, id: Uuid) -> i64 {
        sqlx::query_scalar(sql).bind(id).fetch_one(&self.db_pool).await.expect("count")
    }
}
