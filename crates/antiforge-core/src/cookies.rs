//! Cookie helpers over raw headers

use crate::response::Response;
use cookie::Cookie;
use http::header::{self, InvalidHeaderValue};
use http::{HeaderMap, HeaderValue};

/// Find the value of the cookie `name` in the request's `Cookie` headers
///
/// Malformed pairs are skipped rather than failing the whole header.
pub fn find(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(|c| c.ok())
        .find(|c| c.name() == name)
        .map(|c| c.value().to_string())
}

/// Append a `Set-Cookie` header for `cookie` to the response
pub fn set(response: &mut Response, cookie: &Cookie<'_>) -> Result<(), InvalidHeaderValue> {
    let value = HeaderValue::from_str(&cookie.to_string())?;
    response.headers_mut().append(header::SET_COOKIE, value);
    Ok(())
}

/// The `name=value` pairs of every `Set-Cookie` header on a response
pub fn set_cookies(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .filter_map(|s| Cookie::parse(s.to_owned()).ok())
        .map(|c| (c.name().to_string(), c.value().to_string()))
        .collect()
}
