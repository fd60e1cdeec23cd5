//! Declarative record schemas and the rule evaluator that checks them.
//!
//! A [`Schema`] is a static list of [`Field`]s. Each field declares a kind
//! (text, enumeration, list, nested object), whether it is required, and
//! optional length bounds. [`Schema::validate`] walks a `serde_json::Value`
//! in declaration order and stops at the first violation:
//!
//! ```text
//! Schema
//!   symptoms              text, trimmed, min 10
//!   availableSpecialties  list<text>
//! ```
//!
//! The same schema renders to a JSON Schema document so the generation
//! service can be asked for output of exactly this shape.

use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value, json};

use crate::error::ValidationError;
use crate::media::DataUri;

/// Extra shape checks applied to text fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextFormat {
    /// `local@domain.tld`
    Email,
    /// `data:<mime>;base64,<payload>`
    DataUri,
    /// `YYYY-MM-DD`
    Date,
    /// ASCII digits only.
    Digits,
}

/// The value type a field holds.
#[derive(Debug, Clone)]
pub enum FieldKind {
    Text(Option<TextFormat>),
    /// A string that must equal one of the listed values.
    Enum(Vec<String>),
    /// An array whose elements all have the inner kind.
    List(Box<FieldKind>),
    Object(Schema),
}

/// One named field of a record schema.
#[derive(Debug, Clone)]
pub struct Field {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    /// Measure text length after trimming surrounding whitespace.
    pub trim: bool,
    /// Minimum characters (text) or items (list).
    pub min: Option<usize>,
    /// Maximum characters (text) or items (list).
    pub max: Option<usize>,
    pub description: &'static str,
    /// Replaces the generated message for emptiness, length, enum and digit failures.
    pub message: Option<&'static str>,
}

impl Field {
    fn new(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            required: true,
            trim: false,
            min: None,
            max: None,
            description: "",
            message: None,
        }
    }

    pub fn text(name: &'static str) -> Self {
        Self::new(name, FieldKind::Text(None))
    }

    pub fn formatted(name: &'static str, format: TextFormat) -> Self {
        Self::new(name, FieldKind::Text(Some(format)))
    }

    pub fn one_of<I, S>(name: &'static str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(name, FieldKind::Enum(values.into_iter().map(Into::into).collect()))
    }

    pub fn list(name: &'static str, item: FieldKind) -> Self {
        Self::new(name, FieldKind::List(Box::new(item)))
    }

    pub fn object(name: &'static str, schema: Schema) -> Self {
        Self::new(name, FieldKind::Object(schema))
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn trimmed(mut self) -> Self {
        self.trim = true;
        self
    }

    pub fn min(mut self, min: usize) -> Self {
        self.min = Some(min);
        self
    }

    pub fn max(mut self, max: usize) -> Self {
        self.max = Some(max);
        self
    }

    pub fn describe(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    pub fn message(mut self, message: &'static str) -> Self {
        self.message = Some(message);
        self
    }

    fn fail(&self, path: &str, generated: String) -> ValidationError {
        ValidationError::new(path, self.message.map(str::to_string).unwrap_or(generated))
    }
}

/// An object schema: an ordered list of fields.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    pub fields: Vec<Field>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a field.
    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    /// Look up a field by name.
    pub fn get(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Check `value` against this schema, returning the first failing field.
    pub fn validate(&self, value: &Value) -> Result<(), ValidationError> {
        check_object(self, value, "")
    }

    /// Render this schema as a JSON Schema document.
    pub fn to_json_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();

        for field in &self.fields {
            let mut prop = kind_schema(&field.kind);
            if let Value::Object(map) = &mut prop {
                if !field.description.is_empty() {
                    map.insert("description".into(), json!(field.description));
                }
                let (min_key, max_key) = match field.kind {
                    FieldKind::List(_) => ("minItems", "maxItems"),
                    _ => ("minLength", "maxLength"),
                };
                if let Some(min) = field.min {
                    map.insert(min_key.into(), json!(min));
                }
                if let Some(max) = field.max {
                    map.insert(max_key.into(), json!(max));
                }
            }
            properties.insert(field.name.to_string(), prop);
            if field.required {
                required.push(field.name);
            }
        }

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}

fn kind_schema(kind: &FieldKind) -> Value {
    match kind {
        FieldKind::Text(Some(TextFormat::Digits)) => json!({ "type": "string", "pattern": "^[0-9]+$" }),
        FieldKind::Text(_) => json!({ "type": "string" }),
        FieldKind::Enum(values) => json!({ "type": "string", "enum": values }),
        FieldKind::List(item) => json!({ "type": "array", "items": kind_schema(item) }),
        FieldKind::Object(schema) => schema.to_json_schema(),
    }
}

fn join(path: &str, name: &str) -> String {
    if path.is_empty() {
        name.to_string()
    } else {
        format!("{path}.{name}")
    }
}

fn check_object(schema: &Schema, value: &Value, path: &str) -> Result<(), ValidationError> {
    let Value::Object(map) = value else {
        let at = if path.is_empty() { "(root)" } else { path };
        return Err(ValidationError::new(at, "must be an object"));
    };
    for field in &schema.fields {
        check_field(field, map.get(field.name), &join(path, field.name))?;
    }
    Ok(())
}

fn check_field(field: &Field, value: Option<&Value>, path: &str) -> Result<(), ValidationError> {
    let value = match value {
        None | Some(Value::Null) if field.required => {
            return Err(field.fail(path, "is required".into()));
        }
        None | Some(Value::Null) => return Ok(()),
        Some(v) => v,
    };

    match &field.kind {
        FieldKind::Text(format) => {
            let raw = value
                .as_str()
                .ok_or_else(|| ValidationError::new(path, "must be a string"))?;
            let text = if field.trim { raw.trim() } else { raw };
            let len = text.chars().count();

            if len == 0 {
                if field.required {
                    return Err(field.fail(path, "must not be empty".into()));
                }
                return Ok(());
            }
            if let Some(min) = field.min.filter(|m| len < *m) {
                return Err(field.fail(path, format!("must be at least {min} characters")));
            }
            if let Some(max) = field.max.filter(|m| len > *m) {
                return Err(field.fail(path, format!("must be at most {max} characters")));
            }
            match format {
                Some(TextFormat::Digits) => check_format(TextFormat::Digits, text, path)
                    .map_err(|e| field.fail(path, e.message)),
                Some(format) => check_format(*format, text, path),
                None => Ok(()),
            }
        }
        FieldKind::List(item) => {
            let items = value
                .as_array()
                .ok_or_else(|| ValidationError::new(path, "must be a list"))?;
            if let Some(min) = field.min.filter(|m| items.len() < *m) {
                return Err(field.fail(path, format!("must contain at least {min} items")));
            }
            if let Some(max) = field.max.filter(|m| items.len() > *m) {
                return Err(field.fail(path, format!("must contain at most {max} items")));
            }
            for (i, element) in items.iter().enumerate() {
                check_value(item, element, &format!("{path}[{i}]"))?;
            }
            Ok(())
        }
        FieldKind::Enum(values) => check_value(&field.kind, value, path).map_err(|e| {
            field.fail(&e.field, format!("must be one of: {}", values.join(", ")))
        }),
        FieldKind::Object(_) => check_value(&field.kind, value, path),
    }
}

/// Check a value against a bare kind (no presence or length rules).
fn check_value(kind: &FieldKind, value: &Value, path: &str) -> Result<(), ValidationError> {
    match kind {
        FieldKind::Text(format) => {
            let text = value
                .as_str()
                .ok_or_else(|| ValidationError::new(path, "must be a string"))?;
            match format {
                Some(format) => check_format(*format, text, path),
                None => Ok(()),
            }
        }
        FieldKind::Enum(values) => {
            let text = value.as_str().unwrap_or_default();
            if values.iter().any(|v| v == text) {
                Ok(())
            } else {
                Err(ValidationError::new(
                    path,
                    format!("must be one of: {}", values.join(", ")),
                ))
            }
        }
        FieldKind::List(item) => {
            let items = value
                .as_array()
                .ok_or_else(|| ValidationError::new(path, "must be a list"))?;
            for (i, element) in items.iter().enumerate() {
                check_value(item, element, &format!("{path}[{i}]"))?;
            }
            Ok(())
        }
        FieldKind::Object(schema) => check_object(schema, value, path),
    }
}

fn check_format(format: TextFormat, text: &str, path: &str) -> Result<(), ValidationError> {
    match format {
        TextFormat::Email if !is_email(text) => {
            Err(ValidationError::new(path, "Invalid email address."))
        }
        TextFormat::DataUri => DataUri::parse(text)
            .map(|_| ())
            .map_err(|reason| ValidationError::new(path, format!("must be a data URI: {reason}"))),
        TextFormat::Date if chrono::NaiveDate::parse_from_str(text, "%Y-%m-%d").is_err() => {
            Err(ValidationError::new(path, "must be a date in YYYY-MM-DD format"))
        }
        TextFormat::Digits if !text.chars().all(|c| c.is_ascii_digit()) => {
            Err(ValidationError::new(path, "must contain only digits"))
        }
        _ => Ok(()),
    }
}

/// Serde helper for optional fields: `null` and a missing key both become
/// `T::default()`, the same absence rule [`Schema::validate`] applies.
///
/// Pair it with `#[serde(default)]` so the missing-key case reaches it.
pub fn absent_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn is_email(text: &str) -> bool {
    let Some((local, domain)) = text.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !text.contains(char::is_whitespace)
        && domain.split('.').count() >= 2
        && domain.split('.').all(|part| !part.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turn_schema() -> Schema {
        Schema::new()
            .field(Field::one_of("sender", ["patient", "doctor"]))
            .field(Field::text("text"))
    }

    fn chat_schema() -> Schema {
        Schema::new()
            .field(Field::text("patientMessage").trimmed())
            .field(Field::list("chatHistory", FieldKind::Object(turn_schema())).optional())
    }

    #[test]
    fn accepts_valid_record() {
        let value = json!({
            "patientMessage": "I have a headache",
            "chatHistory": [{ "sender": "doctor", "text": "Hello" }]
        });
        assert!(chat_schema().validate(&value).is_ok());
    }

    #[test]
    fn missing_required_field() {
        let err = chat_schema().validate(&json!({})).unwrap_err();
        assert_eq!(err.field, "patientMessage");
        assert_eq!(err.message, "is required");
    }

    #[test]
    fn whitespace_only_text_is_empty_when_trimmed() {
        let err = chat_schema()
            .validate(&json!({ "patientMessage": "   \n\t" }))
            .unwrap_err();
        assert_eq!(err.field, "patientMessage");
        assert_eq!(err.message, "must not be empty");
    }

    #[test]
    fn optional_field_may_be_null_or_absent() {
        let schema = chat_schema();
        assert!(schema.validate(&json!({ "patientMessage": "hi" })).is_ok());
        assert!(
            schema
                .validate(&json!({ "patientMessage": "hi", "chatHistory": null }))
                .is_ok()
        );
    }

    #[test]
    fn nested_enum_failure_reports_indexed_path() {
        let value = json!({
            "patientMessage": "hi",
            "chatHistory": [
                { "sender": "doctor", "text": "Hello" },
                { "sender": "nurse", "text": "Hi" }
            ]
        });
        let err = chat_schema().validate(&value).unwrap_err();
        assert_eq!(err.field, "chatHistory[1].sender");
        assert_eq!(err.message, "must be one of: patient, doctor");
    }

    #[test]
    fn min_length_uses_custom_message() {
        let schema = Schema::new().field(
            Field::text("symptoms")
                .trimmed()
                .min(10)
                .message("Please describe your symptoms in at least 10 characters."),
        );
        let err = schema.validate(&json!({ "symptoms": "cough" })).unwrap_err();
        assert_eq!(err.field, "symptoms");
        assert!(err.message.contains("at least 10 characters"));
        assert!(schema.validate(&json!({ "symptoms": "dry cough for days" })).is_ok());
    }

    #[test]
    fn max_length_counts_characters_not_bytes() {
        let schema = Schema::new().field(Field::text("name").max(3));
        assert!(schema.validate(&json!({ "name": "éèê" })).is_ok());
        let err = schema.validate(&json!({ "name": "éèêë" })).unwrap_err();
        assert_eq!(err.message, "must be at most 3 characters");
    }

    #[test]
    fn first_failing_field_wins() {
        let schema = Schema::new()
            .field(Field::text("a"))
            .field(Field::text("b"));
        let err = schema.validate(&json!({ "a": "", "b": "" })).unwrap_err();
        assert_eq!(err.field, "a");
    }

    #[test]
    fn list_bounds_are_checked() {
        let schema = Schema::new().field(Field::list("items", FieldKind::Text(None)).min(1).max(2));
        assert!(schema.validate(&json!({ "items": [] })).is_err());
        assert!(schema.validate(&json!({ "items": ["a"] })).is_ok());
        let err = schema.validate(&json!({ "items": ["a", "b", "c"] })).unwrap_err();
        assert_eq!(err.message, "must contain at most 2 items");
    }

    #[test]
    fn wrong_types_are_rejected() {
        let schema = chat_schema();
        let err = schema.validate(&json!({ "patientMessage": 42 })).unwrap_err();
        assert_eq!(err.message, "must be a string");
        let err = schema.validate(&json!("not an object")).unwrap_err();
        assert_eq!(err.field, "(root)");
    }

    #[test]
    fn email_format() {
        let schema = Schema::new().field(Field::formatted("email", TextFormat::Email));
        assert!(schema.validate(&json!({ "email": "asha@clinic.org" })).is_ok());
        for bad in ["asha", "asha@", "@clinic.org", "asha@clinic", "a b@clinic.org"] {
            assert!(schema.validate(&json!({ "email": bad })).is_err(), "{bad}");
        }
    }

    #[test]
    fn data_uri_and_date_formats() {
        let schema = Schema::new()
            .field(Field::formatted("audio", TextFormat::DataUri))
            .field(Field::formatted("day", TextFormat::Date).optional());
        assert!(
            schema
                .validate(&json!({ "audio": "data:audio/webm;base64,SGVsbG8=", "day": "2024-02-29" }))
                .is_ok()
        );
        let err = schema
            .validate(&json!({ "audio": "data:audio/webm;base64,SGVsbG8=", "day": "2023-02-29" }))
            .unwrap_err();
        assert_eq!(err.field, "day");
        let err = schema.validate(&json!({ "audio": "hello" })).unwrap_err();
        assert!(err.message.starts_with("must be a data URI"));
    }

    #[test]
    fn digit_fields_use_the_field_message() {
        let schema = Schema::new().field(
            Field::formatted("pin", TextFormat::Digits)
                .trimmed()
                .min(3)
                .max(4)
                .message("Bad PIN."),
        );
        assert!(schema.validate(&json!({ "pin": " 0123 " })).is_ok());
        for pin in ["12a", "12", "12345", ""] {
            let err = schema.validate(&json!({ "pin": pin })).unwrap_err();
            assert_eq!((err.field.as_str(), err.message.as_str()), ("pin", "Bad PIN."), "{pin}");
        }
        assert_eq!(schema.to_json_schema()["properties"]["pin"]["pattern"], "^[0-9]+$");
    }

    #[test]
    fn json_schema_export() {
        let doc = chat_schema().to_json_schema();
        assert_eq!(doc["type"], "object");
        assert_eq!(doc["required"], json!(["patientMessage"]));
        let history = &doc["properties"]["chatHistory"];
        assert_eq!(history["type"], "array");
        assert_eq!(
            history["items"]["properties"]["sender"]["enum"],
            json!(["patient", "doctor"])
        );
    }

    #[derive(Debug, serde::Deserialize)]
    struct Reply {
        #[serde(default, deserialize_with = "absent_as_default")]
        reasoning: String,
    }

    #[test]
    fn absent_and_null_deserialize_as_default() {
        let missing: Reply = serde_json::from_value(json!({})).unwrap();
        assert_eq!(missing.reasoning, "");
        let null: Reply = serde_json::from_value(json!({ "reasoning": null })).unwrap();
        assert_eq!(null.reasoning, "");
        let given: Reply = serde_json::from_value(json!({ "reasoning": "ok" })).unwrap();
        assert_eq!(given.reasoning, "ok");
    }
}
