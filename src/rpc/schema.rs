//! Declarative procedure input schemas.
//!
//! Shape and types come from `serde` decoding; `Schema` adds the value-level
//! rules serde cannot express. Decoding runs `normalize` before `validate`, so
//! rules see canonical values (empty optional URLs are already unset).

use serde::de::{DeserializeOwned, Deserializer, IgnoredAny};
use serde::Deserialize;
use serde_json::Value;

use crate::error::{FieldErrors, RpcError};

pub trait Schema: DeserializeOwned + Send + 'static {
    fn normalize(self) -> Self {
        self
    }

    fn validate(&self, _errors: &mut FieldErrors) {}
}

/// Decode, normalize and validate a procedure input
pub fn parse_input<I: Schema>(raw: Value) -> Result<I, RpcError> {
    let input: I = serde_json::from_value(raw).map_err(|e| RpcError::bad_input(format!("Invalid input: {}", e)))?;
    let input = input.normalize();

    let mut errors = FieldErrors::new();
    input.validate(&mut errors);
    if errors.is_empty() {
        Ok(input)
    } else {
        Err(RpcError::validation(errors))
    }
}

/// Input of procedures that take none. Accepts and ignores anything sent.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoInput;

impl<'de> Deserialize<'de> for NoInput {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        IgnoredAny::deserialize(deserializer)?;
        Ok(NoInput)
    }
}

impl Schema for NoInput {}

/// Field rules shared by resource schemas
pub mod rules {
    use crate::error::FieldErrors;

    pub fn url(errors: &mut FieldErrors, field: &str, value: &str) {
        match url::Url::parse(value) {
            Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {}
            Ok(_) => {
                errors.insert(field.to_string(), "Url must use http or https".to_string());
            }
            Err(_) => {
                errors.insert(field.to_string(), "Invalid url".to_string());
            }
        }
    }

    pub fn optional_url(errors: &mut FieldErrors, field: &str, value: Option<&str>) {
        if let Some(value) = value {
            url(errors, field, value);
        }
    }

    pub fn non_empty(errors: &mut FieldErrors, field: &str, value: &str) {
        if value.trim().is_empty() {
            errors.insert(field.to_string(), "Required".to_string());
        }
    }

    pub fn max_len(errors: &mut FieldErrors, field: &str, value: &str, max: usize) {
        if value.chars().count() > max {
            errors.insert(field.to_string(), format!("Must be at most {} characters", max));
        }
    }
}

/// Empty or whitespace-only string means unset
pub fn blank_to_none(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Patch form of [`blank_to_none`]: `Some("")` clears the field
pub fn blank_to_cleared(value: Option<Option<String>>) -> Option<Option<String>> {
    value.map(blank_to_none)
}

/// Deserialize a patch field so that "absent" and "null" stay distinguishable:
/// absent -> `None`, `null` -> `Some(None)`, value -> `Some(Some(v))`.
/// Use together with `#[serde(default)]`.
pub fn patch_field<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Link {
        href: String,
        #[serde(default)]
        title: Option<String>,
        #[serde(default, deserialize_with = "patch_field")]
        note: Option<Option<String>>,
    }

    impl Schema for Link {
        fn normalize(mut self) -> Self {
            self.title = blank_to_none(self.title);
            self
        }

        fn validate(&self, errors: &mut FieldErrors) {
            rules::url(errors, "href", &self.href);
        }
    }

    #[test]
    fn normalizes_before_validating() {
        let link: Link = parse_input(json!({ "href": "https://example.com", "title": "" })).unwrap();
        assert_eq!(link.title, None);
        assert_eq!(link.note, None);
    }

    #[test]
    fn reports_field_errors() {
        let err = parse_input::<Link>(json!({ "href": "not a url" })).unwrap_err();
        let fields = err.field_errors.unwrap();
        assert_eq!(fields.get("href").map(String::as_str), Some("Invalid url"));
    }

    #[test]
    fn rejects_wrong_shape_as_bad_input() {
        let err = parse_input::<Link>(json!({ "title": "x" })).unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::BadInput);
        assert!(err.message.contains("href"));
    }

    #[test]
    fn patch_field_distinguishes_null_from_absent() {
        let link: Link = parse_input(json!({ "href": "https://a.io", "note": null })).unwrap();
        assert_eq!(link.note, Some(None));
    }

    #[test]
    fn non_http_schemes_are_rejected() {
        let mut errors = FieldErrors::new();
        rules::url(&mut errors, "logo", "javascript:alert(1)");
        assert!(errors.contains_key("logo"));
    }

    #[test]
    fn no_input_accepts_anything() {
        assert!(parse_input::<NoInput>(Value::Null).is_ok());
        assert!(parse_input::<NoInput>(json!({ "extra": 1 })).is_ok());
    }
}
