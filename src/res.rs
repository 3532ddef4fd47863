use axum::{
    debug_handler,
    http::{header, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
};
use pulldown_cmark::{Event, Options, Parser, Tag};
use time::OffsetDateTime;

use crate::{
    outcome::SIGN_IN_PATH,
    policy::{self, Action, Denial, Target},
    session::Viewer,
    AppResult,
};

#[macro_export]
macro_rules! include_res {
    (bytes, $p:expr) => {
        include_bytes!(concat!(env!("CARGO_MANIFEST_DIR"), "/res", $p))
    };
    (str, $p:expr) => {
        include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/res", $p))
    };
}

#[debug_handler]
pub async fn forms_js() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/javascript; charset=utf-8")],
        include_res!(str, "/static/forms.js"),
    )
}

/// Single-pass `{key}` substitution. Substituted values are never rescanned,
/// so user text containing `{...}` stays literal. Unknown keys are left as is.
pub fn fill(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];

        let hit = tail.find('}').and_then(|end| {
            let key = &tail[1..end];
            values.iter().find(|(k, _)| *k == key).map(|(_, v)| (*v, end))
        });

        match hit {
            Some((value, end)) => {
                out.push_str(value);
                rest = &tail[end + 1..];
            }
            None => {
                out.push('{');
                rest = &tail[1..];
            }
        }
    }

    out.push_str(rest);
    out
}

pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// Renders article bodies. Raw HTML in the source is shown as text and
/// links or images with a non-http scheme point nowhere.
pub fn markdown(source: &str) -> String {
    let parser = Parser::new_ext(source, Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH)
        .map(|event| match event {
            Event::Html(html) | Event::InlineHtml(html) => Event::Text(html),
            Event::Start(Tag::Link { link_type, dest_url, title, id }) if !safe_link(&dest_url) => {
                Event::Start(Tag::Link { link_type, dest_url: "#".into(), title, id })
            }
            Event::Start(Tag::Image { link_type, dest_url, title, id }) if !safe_link(&dest_url) => {
                Event::Start(Tag::Image { link_type, dest_url: "#".into(), title, id })
            }
            _ => event,
        });

    let mut html_output = String::new();
    pulldown_cmark::html::push_html(&mut html_output, parser);
    html_output
}

fn safe_link(url: &str) -> bool {
    match url.split_once(':') {
        Some((scheme, _)) if !scheme.contains('/') => {
            matches!(scheme.to_ascii_lowercase().as_str(), "http" | "https" | "mailto")
        }
        _ => true,
    }
}

pub fn format_date(at: OffsetDateTime) -> String {
    format!("{}年{}月{}日", at.year(), u8::from(at.month()), at.day())
}

pub fn image_tag(url: Option<&str>, alt: &str) -> String {
    match url {
        Some(url) => format!(r#"<img class="cover" src="{}" alt="{}">"#, escape(url), escape(alt)),
        None => String::new(),
    }
}

fn nav(viewer: &Viewer) -> String {
    let mut links = String::from(r#"<a href="/jobs">求人一覧</a><a href="/learning">ナレッジ</a>"#);

    match viewer.profile() {
        Some(profile) => {
            links += r#"<a href="/mypage">マイページ</a><a href="/settings">設定</a>"#;
            if policy::can(viewer.actor(), Action::ManageUsers, Target::Directory) {
                links += r#"<a href="/admin">管理</a>"#;
            }
            links += &format!(
                r#"<span class="who">{}</span><form method="post" action="/auth/signout" data-action><button>ログアウト</button></form>"#,
                escape(&profile.display_name)
            );
        }
        None => links += r#"<a href="/auth">ログイン</a>"#,
    }

    links
}

pub fn page(viewer: &Viewer, title: &str, content: &str) -> Response {
    Html(fill(
        include_res!(str, "/pages/layout.html"),
        &[
            ("title", escape(title).as_str()),
            ("font_size", viewer.font_size().as_str()),
            ("nav", nav(viewer).as_str()),
            ("content", content),
        ],
    ))
    .into_response()
}

/// Page-level guard: `None` when the viewer may go on, otherwise the response
/// to send instead (sign-in redirect or the "nothing here" page).
pub fn deny_page(viewer: &Viewer, action: Action, target: Target, here: &str, what: &str) -> Option<AppResult<Response>> {
    match policy::authorize(viewer.actor(), action, target) {
        Ok(()) => None,
        Err(Denial::Unauthenticated) => {
            Some(Ok(Redirect::to(&format!("{SIGN_IN_PATH}?return_url={here}")).into_response()))
        }
        Err(denial) => {
            tracing::debug!(?denial, ?action, "page guarded");
            Some(sorry(viewer, what))
        }
    }
}

/// The "nothing here" page, for missing resources and guarded pages alike.
pub fn sorry(viewer: &Viewer, what: &str) -> AppResult<Response> {
    let content = fill(
        include_res!(str, "/pages/sorry.html"),
        &[("what", escape(what).as_str())],
    );
    Ok((StatusCode::NOT_FOUND, page(viewer, what, &content)).into_response())
}
