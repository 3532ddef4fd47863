use axum::http::Uri;

use crate::outcome::ActionError;

pub const MIN_PASSWORD_LEN: usize = 6;
const MAX_URL_LEN: usize = 2048;

/// Trimmed value, or the given validation message when blank.
pub fn required(value: &str, message: &str) -> Result<String, ActionError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ActionError::invalid(message));
    }
    Ok(value.to_owned())
}

pub fn optional(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_owned)
}

/// Image references are either our own `/uploads/...` paths or absolute
/// http(s) URLs with a host. Anything else (`javascript:`, `data:`, relative
/// paths elsewhere on the site) is rejected.
pub fn image_url(value: Option<&str>) -> Result<Option<String>, ActionError> {
    let Some(value) = optional(value) else {
        return Ok(None);
    };

    let invalid = || ActionError::invalid("画像URLが不正です");
    if value.len() > MAX_URL_LEN || value.chars().any(char::is_whitespace) {
        return Err(invalid());
    }

    if value.starts_with("/uploads/") && !value.contains("..") {
        return Ok(Some(value));
    }

    let uri: Uri = value.parse().map_err(|_| invalid())?;
    match (uri.scheme_str(), uri.host()) {
        (Some("http" | "https"), Some(host)) if !host.is_empty() => Ok(Some(value)),
        _ => Err(invalid()),
    }
}

pub fn email(value: &str) -> Result<String, ActionError> {
    let value = value.trim().to_lowercase();
    let valid = match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !domain.contains('@')
                && !value.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if !valid {
        return Err(ActionError::invalid("有効なメールアドレスを入力してください"));
    }
    Ok(value)
}

/// A new password together with its confirmation.
pub fn new_password(password: &str, confirm: &str) -> Result<String, ActionError> {
    if password.is_empty() || password != confirm {
        return Err(ActionError::invalid("パスワードが一致しません"));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ActionError::invalid("パスワードは6文字以上である必要があります"));
    }
    Ok(password.to_owned())
}

/// Only same-site paths are followed after sign-in. Browsers strip tabs and
/// newlines from URLs, so `/\t/host` would still leave the site.
pub fn local_path(value: &str) -> Option<String> {
    let plain = value.starts_with('/')
        && !value.starts_with("//")
        && !value.contains('\\')
        && !value.chars().any(|c| c.is_control() || c.is_whitespace());
    if !plain {
        return None;
    }

    let uri: Uri = value.parse().ok()?;
    (uri.scheme().is_none() && uri.authority().is_none()).then(|| value.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_urls_must_be_http_or_local_uploads() {
        assert_eq!(image_url(None).ok(), Some(None));
        assert_eq!(image_url(Some("  ")).ok(), Some(None));
        assert!(image_url(Some("https://cdn.example.com/a.png")).is_ok());
        assert!(image_url(Some("/uploads/images/0192.png")).is_ok());

        assert!(image_url(Some("javascript:alert(1)")).is_err());
        assert!(image_url(Some("data:image/png;base64,AAAA")).is_err());
        assert!(image_url(Some("/uploads/../secrets")).is_err());
        assert!(image_url(Some("ftp://example.com/a.png")).is_err());
        assert!(image_url(Some("/admin")).is_err());
    }

    #[test]
    fn password_rules() {
        assert!(new_password("secret", "secret").is_ok());
        assert_eq!(
            new_password("secret", "secreT").unwrap_err().to_string(),
            "パスワードが一致しません"
        );
        assert_eq!(
            new_password("abc", "abc").unwrap_err().to_string(),
            "パスワードは6文字以上である必要があります"
        );
    }

    #[test]
    fn emails_are_normalized() {
        assert_eq!(email(" Digger@Example.COM ").ok().as_deref(), Some("digger@example.com"));
        assert!(email("not-an-email").is_err());
        assert!(email("a@b").is_err());
        assert!(email("a b@example.com").is_err());
    }

    #[test]
    fn return_paths_stay_on_site() {
        assert_eq!(local_path("/jobs/1").as_deref(), Some("/jobs/1"));
        assert_eq!(local_path("//evil.example"), None);
        assert_eq!(local_path("https://evil.example"), None);
        assert_eq!(local_path("/\t/evil.example"), None);
        assert_eq!(local_path("/\n/evil.example"), None);
        assert_eq!(local_path("/ /evil.example"), None);
        assert_eq!(local_path("/jobs?page=2").as_deref(), Some("/jobs?page=2"));
    }
}
