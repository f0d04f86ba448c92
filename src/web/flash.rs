use std::convert::Infallible;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts},
    response::{AppendHeaders, Html, IntoResponse, Redirect, Response},
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};

use super::{clear_cookie, cookie_value, set_cookie};

pub const FLASH_COOKIE: &str = "flash";
const FLASH_MAX_AGE_SECS: u64 = 60;

/// One-shot notice carried across a redirect in a cookie.
#[derive(Debug, Clone, Default)]
pub struct Flash(pub Option<String>);

#[async_trait]
impl<S> FromRequestParts<S> for Flash
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let message = cookie_value(&parts.headers, FLASH_COOKIE).and_then(decode);
        Ok(Flash(message))
    }
}

impl Flash {
    pub fn message(&self) -> Option<&str> {
        self.0.as_deref()
    }

    /// Sends `html`, expiring the flash cookie if this page displayed it.
    pub fn respond(&self, html: String) -> Response {
        if self.0.is_some() {
            (
                AppendHeaders([(header::SET_COOKIE, clear_cookie(FLASH_COOKIE))]),
                Html(html),
            )
                .into_response()
        } else {
            Html(html).into_response()
        }
    }
}

pub fn redirect_with_flash(to: &str, message: &str) -> Response {
    (
        AppendHeaders([(
            header::SET_COOKIE,
            set_cookie(FLASH_COOKIE, &encode(message), Some(FLASH_MAX_AGE_SECS)),
        )]),
        Redirect::to(to),
    )
        .into_response()
}

fn encode(message: &str) -> String {
    URL_SAFE_NO_PAD.encode(message.as_bytes())
}

fn decode(raw: &str) -> Option<String> {
    let bytes = URL_SAFE_NO_PAD.decode(raw).ok()?;
    String::from_utf8(bytes).ok().filter(|m| !m.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn redirect_sets_cookie_that_decodes_back() {
        let resp = redirect_with_flash("/login", "Registration successful! Please log in.");
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        let cookie = resp
            .headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap();
        let value = cookie
            .strip_prefix("flash=")
            .and_then(|rest| rest.split(';').next())
            .unwrap();
        assert_eq!(
            decode(value).as_deref(),
            Some("Registration successful! Please log in.")
        );
    }

    #[test]
    fn garbage_cookie_is_ignored() {
        assert_eq!(decode("%%%"), None);
        assert_eq!(decode(""), None);
    }

    #[test]
    fn respond_clears_only_when_shown() {
        let shown = Flash(Some("hi".into())).respond("<p></p>".into());
        assert!(shown.headers().contains_key(header::SET_COOKIE));
        let quiet = Flash(None).respond("<p></p>".into());
        assert!(!quiet.headers().contains_key(header::SET_COOKIE));
    }
}
