//! Common API utilities and shared types
//!
//! Extractors and helpers shared by the endpoint modules: request body
//! decoding, absolute URL building and pagination links.

use axum::{
    body::Bytes,
    extract::{FromRequest, FromRequestParts, Request},
    http::{header, request::Parts, Uri},
    Form,
};
use serde_json::{Map, Value};
use std::convert::Infallible;

use crate::api::middleware::ApiError;
use crate::services::FieldErrors;

/// Body fields that always decode to a list in form submissions
const FORM_LIST_FIELDS: [&str; 1] = ["tags"];

/// Request body decoded from JSON or an urlencoded form.
///
/// Decoding never rejects the request. The outcome is kept until the handler
/// asks for it, so lookups and permission checks run before a malformed body
/// is reported.
#[derive(Debug)]
pub struct RequestBody(Result<Value, ApiError>);

impl RequestBody {
    /// The decoded body. An empty body is `Value::Null`.
    pub fn into_value(self) -> Result<Value, ApiError> {
        self.0
    }
}

impl<S> FromRequest<S> for RequestBody
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.split(';').next().unwrap_or_default().trim().to_ascii_lowercase());

        if content_type.as_deref() == Some("application/x-www-form-urlencoded") {
            let decoded = match Form::<Vec<(String, String)>>::from_request(req, state).await {
                Ok(Form(pairs)) => Ok(form_to_json(pairs)),
                Err(rejection) => Err(ApiError::bad_request(rejection.body_text())),
            };
            return Ok(Self(decoded));
        }

        let bytes = match Bytes::from_request(req, state).await {
            Ok(bytes) => bytes,
            Err(rejection) => return Ok(Self(Err(ApiError::bad_request(rejection.body_text())))),
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self(Ok(Value::Null)));
        }

        let decoded = match content_type.as_deref() {
            None | Some("application/json") => serde_json::from_slice(&bytes)
                .map_err(|e| ApiError::bad_request(format!("JSON parse error - {}", e))),
            Some(other) => Err(ApiError::unsupported_media_type(other)),
        };
        Ok(Self(decoded))
    }
}

/// Form pairs as a JSON object. Repeated keys keep the last value, except
/// list fields, which collect every value.
fn form_to_json(pairs: Vec<(String, String)>) -> Value {
    let mut map = Map::new();
    for (key, value) in pairs {
        if FORM_LIST_FIELDS.contains(&key.as_str()) {
            match map.entry(key).or_insert_with(|| Value::Array(Vec::new())) {
                Value::Array(items) => items.push(Value::String(value)),
                other => *other = Value::Array(vec![Value::String(value)]),
            }
        } else {
            map.insert(key, Value::String(value));
        }
    }
    Value::Object(map)
}

/// Scheme and host the client used to reach us
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseUrl(String);

impl BaseUrl {
    pub fn new(scheme: &str, host: &str) -> Self {
        Self(format!("{}://{}", scheme, host))
    }

    /// Absolute URL for a path starting with `/`
    pub fn absolute(&self, path: &str) -> String {
        format!("{}{}", self.0, path)
    }
}

impl<S> FromRequestParts<S> for BaseUrl
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header_str = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(|value| value.split(',').next().unwrap_or_default().trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let scheme = header_str("x-forwarded-proto")
            .or_else(|| parts.uri.scheme_str().map(str::to_string))
            .unwrap_or_else(|| "http".to_string());
        let host = header_str("x-forwarded-host")
            .or_else(|| header_str(header::HOST.as_str()))
            .or_else(|| parts.uri.authority().map(|a| a.to_string()))
            .unwrap_or_else(|| "localhost".to_string());

        Ok(Self::new(&scheme, &host))
    }
}

/// Absolute URL of the current request with its `page` parameter replaced.
/// `None` drops the parameter, which is how the link to page 1 is written.
pub fn page_link(base: &BaseUrl, uri: &Uri, page: Option<u32>) -> String {
    let mut params: Vec<String> = uri
        .query()
        .unwrap_or_default()
        .split('&')
        .filter(|pair| !pair.is_empty())
        .filter(|pair| pair.split('=').next() != Some("page"))
        .map(str::to_string)
        .collect();
    if let Some(page) = page {
        params.push(format!("page={}", page));
    }

    let path = base.absolute(uri.path());
    if params.is_empty() {
        path
    } else {
        format!("{}?{}", path, params.join("&"))
    }
}

/// Parse a path id. Anything that is not an integer is simply not found.
pub fn parse_id(raw: &str) -> Result<i64, ApiError> {
    raw.parse::<i64>()
        .map_err(|_| ApiError::not_found("No object matches the given query."))
}

/// A non-blank string field, or a field error
pub fn required_string(body: &Value, field: &str, errors: &mut FieldErrors) -> Option<String> {
    match body.get(field) {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::String(_)) => {
            errors.add(field, "This field may not be blank.");
            None
        }
        Some(Value::Null) | None => {
            errors.add(field, "This field is required.");
            None
        }
        Some(_) => {
            errors.add(field, "Not a valid string.");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_form_to_json_collects_list_fields() {
        let value = form_to_json(vec![
            ("title".to_string(), "First".to_string()),
            ("title".to_string(), "Second".to_string()),
            ("tags".to_string(), "1".to_string()),
            ("tags".to_string(), "2".to_string()),
        ]);

        assert_eq!(value, serde_json::json!({"title": "Second", "tags": ["1", "2"]}));
    }

    #[test]
    fn test_page_link_replaces_page() {
        let base = BaseUrl::new("https", "food.example.com");
        let uri: Uri = "/recipes-api/?category_id=3&page=2".parse().unwrap();

        assert_eq!(
            page_link(&base, &uri, Some(3)),
            "https://food.example.com/recipes-api/?category_id=3&page=3"
        );
        assert_eq!(
            page_link(&base, &uri, None),
            "https://food.example.com/recipes-api/?category_id=3"
        );

        let bare: Uri = "/recipes-api/".parse().unwrap();
        assert_eq!(page_link(&base, &bare, None), "https://food.example.com/recipes-api/");
        assert_eq!(
            page_link(&base, &bare, Some(2)),
            "https://food.example.com/recipes-api/?page=2"
        );
    }

    #[test]
    fn test_parse_id() {
        assert_eq!(parse_id("42").unwrap(), 42);
        assert_eq!(parse_id("abc").unwrap_err().status(), axum::http::StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_required_string() {
        let body = serde_json::json!({"name": "Soups", "blank": "", "number": 3});
        let mut errors = FieldErrors::new();

        assert_eq!(required_string(&body, "name", &mut errors).as_deref(), Some("Soups"));
        assert!(required_string(&body, "blank", &mut errors).is_none());
        assert!(required_string(&body, "number", &mut errors).is_none());
        assert!(required_string(&body, "missing", &mut errors).is_none());

        assert_eq!(errors.len(), 3);
        assert_eq!(errors.get("missing"), Some(&vec!["This field is required.".to_string()]));
    }
}
