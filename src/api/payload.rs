//! Request bodies for every write endpoint.
//!
//! Clients send JSON objects, urlencoded forms or multipart forms carrying
//! uploads. `Payload` normalizes all three into one field map so handlers
//! read fields the same way regardless of encoding.

use std::collections::HashMap;

use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, Multipart, Request},
    http::header::CONTENT_TYPE,
    Form,
};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde_json::{Map, Value};

use crate::error::ApiError;

const INVALID_JSON: &str = "Invalid JSON payload.";

const NAIVE_DATETIME_FORMATS: [&str; 4] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M"];

/// A file received in a multipart field
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

#[derive(Debug, Clone, Default)]
pub struct Payload {
    fields: Map<String, Value>,
    files: HashMap<String, Upload>,
    /// Form bodies turn repeated keys into arrays of strings
    form: bool,
}

#[async_trait]
impl<S> FromRequest<S> for Payload
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("")
            .to_ascii_lowercase();

        if content_type.starts_with("multipart/form-data") {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| ApiError::invalid_payload(format!("Invalid multipart payload: {e}")))?;
            return Self::from_multipart(multipart).await;
        }

        if content_type.starts_with("application/x-www-form-urlencoded") {
            let Form(pairs) = Form::<Vec<(String, String)>>::from_request(req, state)
                .await
                .map_err(|e| ApiError::invalid_payload(format!("Invalid form payload: {e}")))?;
            return Ok(Self::from_pairs(pairs));
        }

        let body = Bytes::from_request(req, state)
            .await
            .map_err(|_| ApiError::invalid_payload(INVALID_JSON))?;
        Self::from_json_bytes(&body)
    }
}

impl Payload {
    /// Empty body is an empty object; anything but an object is rejected
    pub fn from_json_bytes(body: &[u8]) -> Result<Self, ApiError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        match serde_json::from_slice::<Value>(body) {
            Ok(Value::Object(fields)) => Ok(Self {
                fields,
                ..Self::default()
            }),
            _ => Err(ApiError::invalid_payload(INVALID_JSON)),
        }
    }

    /// Form pairs; a key repeated in the body becomes an array
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let mut fields = Map::new();
        for (key, value) in pairs {
            push_field(&mut fields, key, Value::String(value));
        }
        Self {
            fields,
            files: HashMap::new(),
            form: true,
        }
    }

    async fn from_multipart(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut payload = Self {
            form: true,
            ..Self::default()
        };
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::invalid_payload(format!("Invalid multipart payload: {e}")))?
        {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            if let Some(file_name) = field.file_name().map(str::to_string) {
                let content_type = field.content_type().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::invalid_payload(format!("Invalid upload: {e}")))?;
                payload.files.insert(
                    name,
                    Upload {
                        file_name,
                        content_type,
                        bytes,
                    },
                );
            } else {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::invalid_payload(format!("Invalid form field: {e}")))?;
                push_field(&mut payload.fields, name, Value::String(text));
            }
        }
        Ok(payload)
    }

    /// True when the client sent the field at all, even blank
    pub fn has(&self, name: &str) -> bool {
        self.fields.contains_key(name) || self.files.contains_key(name)
    }

    /// All listed fields must be present and non-blank; missing ones are reported together
    pub fn require(&self, names: &[&str]) -> Result<(), ApiError> {
        let missing: Vec<String> = names
            .iter()
            .filter(|name| self.is_blank(name))
            .map(|name| name.to_string())
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ApiError::validation_error("Missing required fields.", missing))
        }
    }

    fn is_blank(&self, name: &str) -> bool {
        if self.files.contains_key(name) {
            return false;
        }
        match self.scalar(name) {
            None | Some(Value::Null) => true,
            Some(Value::String(s)) => s.trim().is_empty(),
            Some(Value::Array(items)) => items.is_empty(),
            Some(_) => false,
        }
    }

    /// Single value of a field; a key repeated in a form yields its last value
    fn scalar(&self, name: &str) -> Option<&Value> {
        match self.fields.get(name)? {
            Value::Array(items) if self.form => items.last(),
            other => Some(other),
        }
    }

    /// Trimmed text; blank counts as absent
    pub fn string(&self, name: &str) -> Result<Option<String>, ApiError> {
        Ok(self.text(name)?.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()))
    }

    /// Raw text, which may be empty
    pub fn text(&self, name: &str) -> Result<Option<String>, ApiError> {
        match self.scalar(name) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(Value::Number(n)) => Ok(Some(n.to_string())),
            Some(Value::Bool(b)) => Ok(Some(b.to_string())),
            Some(_) => Err(ApiError::invalid_field(name, format!("'{name}' must be text."))),
        }
    }

    pub fn int(&self, name: &str) -> Result<Option<i64>, ApiError> {
        let invalid = || ApiError::invalid_field(name, format!("'{name}' must be an integer."));
        match self.scalar(name) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Number(n)) => n.as_i64().map(Some).ok_or_else(invalid),
            Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
            Some(Value::String(s)) => s.trim().parse().map(Some).map_err(|_| invalid()),
            Some(_) => Err(invalid()),
        }
    }

    pub fn bool(&self, name: &str) -> Result<Option<bool>, ApiError> {
        let invalid = || ApiError::invalid_field(name, format!("'{name}' must be a boolean."));
        match self.scalar(name) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(*b)),
            Some(Value::Number(n)) => match n.as_i64() {
                Some(0) => Ok(Some(false)),
                Some(1) => Ok(Some(true)),
                _ => Err(invalid()),
            },
            Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "" => Ok(None),
                "true" | "1" | "on" | "yes" => Ok(Some(true)),
                "false" | "0" | "off" | "no" => Ok(Some(false)),
                _ => Err(invalid()),
            },
            Some(_) => Err(invalid()),
        }
    }

    /// RFC 3339, or a naive `YYYY-MM-DDTHH:MM[:SS]` read as UTC
    pub fn datetime(&self, name: &str) -> Result<Option<DateTime<Utc>>, ApiError> {
        let Some(raw) = self.string(name)? else {
            return Ok(None);
        };
        parse_datetime(&raw)
            .map(Some)
            .ok_or_else(|| ApiError::invalid_field(name, format!("'{name}' must be a valid datetime.")))
    }

    pub fn date(&self, name: &str) -> Result<Option<NaiveDate>, ApiError> {
        let Some(raw) = self.string(name)? else {
            return Ok(None);
        };
        NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| ApiError::invalid_field(name, format!("'{name}' must be a date (YYYY-MM-DD).")))
    }

    pub fn time(&self, name: &str) -> Result<Option<NaiveTime>, ApiError> {
        let Some(raw) = self.string(name)? else {
            return Ok(None);
        };
        NaiveTime::parse_from_str(&raw, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(&raw, "%H:%M:%S"))
            .map(Some)
            .map_err(|_| ApiError::invalid_field(name, format!("'{name}' must be a time (HH:MM).")))
    }

    /// Array of ids, comma-separated string or a single id
    pub fn id_list(&self, name: &str) -> Result<Option<Vec<i64>>, ApiError> {
        let invalid = || ApiError::invalid_field(name, format!("'{name}' must be a list of ids."));
        let parse_one = |value: &Value| -> Result<Vec<i64>, ApiError> {
            match value {
                Value::Number(n) => n.as_i64().map(|id| vec![id]).ok_or_else(invalid),
                Value::String(s) => s
                    .split(',')
                    .map(str::trim)
                    .filter(|part| !part.is_empty())
                    .map(|part| part.parse::<i64>().map_err(|_| invalid()))
                    .collect(),
                _ => Err(invalid()),
            }
        };

        match self.fields.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Array(items)) => {
                let mut ids = Vec::new();
                for item in items {
                    ids.extend(parse_one(item)?);
                }
                Ok(Some(ids))
            }
            Some(other) => parse_one(other).map(Some),
        }
    }

    /// JSON object or array, or a string holding one
    pub fn json(&self, name: &str) -> Result<Option<Value>, ApiError> {
        let invalid = || ApiError::invalid_field(name, format!("'{name}' must be valid JSON."));
        match self.scalar(name) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
            Some(Value::String(s)) => serde_json::from_str(s).map(Some).map_err(|_| invalid()),
            Some(value @ (Value::Object(_) | Value::Array(_))) => Ok(Some(value.clone())),
            Some(_) => Err(invalid()),
        }
    }

    pub fn file(&self, name: &str) -> Option<&Upload> {
        self.files.get(name)
    }
}

fn push_field(fields: &mut Map<String, Value>, key: String, value: Value) {
    match fields.get_mut(&key) {
        Some(Value::Array(items)) => items.push(value),
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, value]);
        }
        None => {
            fields.insert(key, value);
        }
    }
}

pub fn parse_datetime(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    NAIVE_DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;
    use serde_json::json;

    fn json_payload(value: Value) -> Payload {
        Payload::from_json_bytes(value.to_string().as_bytes()).unwrap()
    }

    #[test]
    fn empty_body_is_an_empty_object() {
        let payload = Payload::from_json_bytes(b"  ").unwrap();
        assert!(!payload.has("anything"));
    }

    #[test]
    fn malformed_or_non_object_json_is_rejected() {
        for body in [&b"{not json"[..], b"[1, 2]", b"\"text\""] {
            let err = Payload::from_json_bytes(body).unwrap_err();
            assert_eq!(err.message(), INVALID_JSON);
        }
    }

    #[test]
    fn require_lists_every_missing_field() {
        let payload = json_payload(json!({"title": "Culto", "location": "  "}));
        match payload.require(&["title", "location", "starts_at"]).unwrap_err() {
            ApiError::ValidationError { fields, .. } => assert_eq!(fields, vec!["location", "starts_at"]),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn typed_getters_accept_strings_from_forms() {
        let payload = Payload::from_pairs(vec![
            ("capacity".into(), "40".into()),
            ("is_published".into(), "false".into()),
            ("starts_at".into(), "2025-03-01T19:30".into()),
            ("opens_at".into(), "08:15".into()),
        ]);
        assert_eq!(payload.int("capacity").unwrap(), Some(40));
        assert_eq!(payload.bool("is_published").unwrap(), Some(false));
        let starts = payload.datetime("starts_at").unwrap().unwrap();
        assert_eq!((starts.hour(), starts.minute()), (19, 30));
        assert_eq!(payload.time("opens_at").unwrap(), NaiveTime::from_hms_opt(8, 15, 0));
    }

    #[test]
    fn bad_values_name_the_field() {
        let payload = json_payload(json!({"capacity": "many", "starts_at": "tomorrow"}));
        match payload.int("capacity").unwrap_err() {
            ApiError::ValidationError { fields, .. } => assert_eq!(fields, vec!["capacity"]),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(payload.datetime("starts_at").is_err());
    }

    #[test]
    fn id_lists_come_in_several_shapes() {
        let payload = json_payload(json!({"a": [1, "2"], "b": "3, 4", "c": 5}));
        assert_eq!(payload.id_list("a").unwrap(), Some(vec![1, 2]));
        assert_eq!(payload.id_list("b").unwrap(), Some(vec![3, 4]));
        assert_eq!(payload.id_list("c").unwrap(), Some(vec![5]));
        assert_eq!(payload.id_list("d").unwrap(), None);

        let form = Payload::from_pairs(vec![("churches".into(), "1".into()), ("churches".into(), "7".into())]);
        assert_eq!(form.id_list("churches").unwrap(), Some(vec![1, 7]));
    }

    #[test]
    fn json_field_accepts_embedded_strings() {
        let payload = json_payload(json!({"poll": "{\"options\": [\"a\", \"b\"]}", "other": {"x": 1}}));
        assert_eq!(payload.json("poll").unwrap().unwrap()["options"][1], "b");
        assert_eq!(payload.json("other").unwrap().unwrap()["x"], 1);
    }

    #[test]
    fn rfc3339_offsets_are_normalized_to_utc() {
        let parsed = parse_datetime("2025-03-01T19:30:00-03:00").unwrap();
        assert_eq!(parsed.hour(), 22);
    }
}
