pub mod flash;
pub mod views;

use axum::http::{header, HeaderMap};

/// Value of cookie `name` across all `Cookie` headers.
pub fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v)
}

pub fn set_cookie(name: &str, value: &str, max_age_secs: Option<u64>) -> String {
    match max_age_secs {
        Some(age) => format!("{name}={value}; Path=/; Max-Age={age}; HttpOnly; SameSite=Lax"),
        None => format!("{name}={value}; Path=/; HttpOnly; SameSite=Lax"),
    }
}

pub fn clear_cookie(name: &str) -> String {
    format!("{name}=; Path=/; Max-Age=0; HttpOnly; SameSite=Lax")
}
