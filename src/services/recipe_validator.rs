//! Recipe payload validation
//!
//! Turns a raw JSON request body into typed recipe fields. Validation runs in
//! three stages, each only when the previous one produced no errors:
//!
//! 1. field parsing: types, required fields, blank strings, length limits
//! 2. references: category and tag ids must exist (checked by the caller,
//!    which owns the repositories, via [`reference_errors`])
//! 3. author rules: cross-field checks in [`author_rule_errors`], using the
//!    stored recipe's values for fields a partial update leaves out

use serde_json::{Map, Value};

use crate::models::{CreateRecipeInput, Recipe, UpdateRecipeInput};
use crate::services::FieldErrors;

pub const TITLE_MAX_LENGTH: usize = 65;
pub const DESCRIPTION_MAX_LENGTH: usize = 165;
pub const UNIT_MAX_LENGTH: usize = 65;
pub const TITLE_MIN_LENGTH: usize = 5;

const REQUIRED: &str = "This field is required.";
const BLANK: &str = "This field may not be blank.";
const NULL: &str = "This field may not be null.";
const INVALID_INTEGER: &str = "A valid integer is required.";
const INVALID_STRING: &str = "Not a valid string.";
const INVALID_BOOLEAN: &str = "Must be a valid boolean.";
const POSITIVE: &str = "Must be a positive number.";

/// Fields a PATCH may carry, in the order they are listed back to the client
pub const UPDATABLE_FIELDS: [&str; 9] = [
    "title",
    "description",
    "tags",
    "preparation_time",
    "preparation_time_unit",
    "servings",
    "servings_unit",
    "preparation_steps",
    "cover",
];

/// Whether a body is being validated for creation or for a partial update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Create,
    Partial,
}

/// Parsed recipe fields. `None` means the field was not sent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecipePayload {
    pub title: Option<String>,
    pub description: Option<String>,
    pub preparation_time: Option<i64>,
    pub preparation_time_unit: Option<String>,
    pub servings: Option<i64>,
    pub servings_unit: Option<String>,
    pub preparation_steps: Option<String>,
    pub preparation_steps_is_html: Option<bool>,
    pub cover: Option<String>,
    /// `Some(None)` is an explicit `null`
    pub category: Option<Option<i64>>,
    pub tags: Option<Vec<i64>>,
}

/// True for a missing body or `{}`
pub fn is_empty_body(body: &Value) -> bool {
    match body {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

impl RecipePayload {
    /// Parse and check every known field. Unknown keys (`author`, `id`, ...)
    /// are ignored.
    pub fn parse(body: &Value, mode: Mode) -> Result<Self, FieldErrors> {
        let empty = Map::new();
        let map = match body {
            Value::Object(map) => map,
            Value::Null => &empty,
            other => {
                let mut errors = FieldErrors::new();
                errors.add(
                    "non_field_errors",
                    format!("Invalid data. Expected an object, but got {}.", type_name(other)),
                );
                return Err(errors);
            }
        };

        let mut fields = FieldParser {
            map,
            mode,
            errors: FieldErrors::new(),
        };

        let payload = Self {
            title: fields.text("title", true, Some(TITLE_MAX_LENGTH)),
            description: fields.text("description", true, Some(DESCRIPTION_MAX_LENGTH)),
            preparation_time: fields.integer("preparation_time", true),
            preparation_time_unit: fields.text("preparation_time_unit", true, Some(UNIT_MAX_LENGTH)),
            servings: fields.integer("servings", true),
            servings_unit: fields.text("servings_unit", true, Some(UNIT_MAX_LENGTH)),
            preparation_steps: fields.text("preparation_steps", true, None),
            preparation_steps_is_html: fields.boolean("preparation_steps_is_html"),
            cover: fields.text("cover", false, None),
            category: fields.primary_key("category"),
            tags: fields.primary_keys("tags"),
        };

        fields.errors.into_result().map(|_| payload)
    }

    /// Category id referenced by the payload, if any
    pub fn category_id(&self) -> Option<i64> {
        self.category.flatten()
    }

    /// Tag ids referenced by the payload
    pub fn tag_ids(&self) -> &[i64] {
        self.tags.as_deref().unwrap_or_default()
    }

    /// Build the create input. Only meaningful for a payload parsed in
    /// `Mode::Create`, where the required fields are guaranteed present.
    pub fn into_create_input(self, author_id: i64) -> CreateRecipeInput {
        CreateRecipeInput {
            title: self.title.unwrap_or_default(),
            description: self.description.unwrap_or_default(),
            preparation_time: self.preparation_time.unwrap_or_default(),
            preparation_time_unit: self.preparation_time_unit.unwrap_or_default(),
            servings: self.servings.unwrap_or_default(),
            servings_unit: self.servings_unit.unwrap_or_default(),
            preparation_steps: self.preparation_steps.unwrap_or_default(),
            preparation_steps_is_html: self.preparation_steps_is_html.unwrap_or(false),
            cover: self.cover.unwrap_or_default(),
            category_id: self.category.flatten(),
            tag_ids: self.tags.unwrap_or_default(),
            author_id,
            is_published: false,
        }
    }

    pub fn into_update_input(self) -> UpdateRecipeInput {
        UpdateRecipeInput {
            title: self.title,
            description: self.description,
            preparation_time: self.preparation_time,
            preparation_time_unit: self.preparation_time_unit,
            servings: self.servings,
            servings_unit: self.servings_unit,
            preparation_steps: self.preparation_steps,
            preparation_steps_is_html: self.preparation_steps_is_html,
            cover: self.cover,
            category_id: self.category,
            tag_ids: self.tags,
            is_published: None,
        }
    }
}

/// Errors for category/tag ids that do not exist.
///
/// `category_exists` is ignored when the payload names no category;
/// `existing_tags` holds the subset of the payload's tag ids found in storage.
pub fn reference_errors(payload: &RecipePayload, category_exists: bool, existing_tags: &[i64]) -> FieldErrors {
    let mut errors = FieldErrors::new();

    if let Some(id) = payload.category_id() {
        if !category_exists {
            errors.add("category", does_not_exist(id));
        }
    }
    for id in payload.tag_ids() {
        if !existing_tags.contains(id) {
            errors.add("tags", does_not_exist(*id));
        }
    }

    errors
}

/// Cross-field rules for author-submitted recipes.
///
/// Fields missing from a partial payload fall back to `instance`.
pub fn author_rule_errors(payload: &RecipePayload, instance: Option<&Recipe>) -> FieldErrors {
    let mut errors = FieldErrors::new();

    let title = payload
        .title
        .as_deref()
        .or(instance.map(|r| r.title.as_str()))
        .unwrap_or_default();
    let description = payload
        .description
        .as_deref()
        .or(instance.map(|r| r.description.as_str()))
        .unwrap_or_default();
    let preparation_time = payload
        .preparation_time
        .or(instance.map(|r| r.preparation_time));
    let servings = payload.servings.or(instance.map(|r| r.servings));

    if title.chars().count() < TITLE_MIN_LENGTH {
        errors.add("title", format!("Must have at least {} chars.", TITLE_MIN_LENGTH));
    }
    if title == description {
        errors.add("title", "Cannot be equal to description");
        errors.add("description", "Cannot be equal to title");
    }
    if preparation_time.is_some_and(|time| time <= 0) {
        errors.add("preparation_time", POSITIVE);
    }
    if servings.is_some_and(|servings| servings <= 0) {
        errors.add("servings", POSITIVE);
    }

    errors
}

fn does_not_exist(id: i64) -> String {
    format!("Invalid pk \"{}\" - object does not exist.", id)
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Integer from a JSON number or a numeric string
fn as_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64).map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

struct FieldParser<'a> {
    map: &'a Map<String, Value>,
    mode: Mode,
    errors: FieldErrors,
}

impl FieldParser<'_> {
    /// Look up a field, recording "required" when a create body lacks it
    fn lookup(&mut self, field: &str, required: bool) -> Option<&Value> {
        let value = self.map.get(field);
        if value.is_none() && required && self.mode == Mode::Create {
            self.errors.add(field, REQUIRED);
        }
        value
    }

    fn text(&mut self, field: &str, required: bool, max_length: Option<usize>) -> Option<String> {
        let value = self.lookup(field, required)?.clone();
        let text = match value {
            Value::String(s) => s.trim().to_string(),
            Value::Number(n) => n.to_string(),
            Value::Null if !required => String::new(),
            Value::Null => {
                self.errors.add(field, NULL);
                return None;
            }
            _ => {
                self.errors.add(field, INVALID_STRING);
                return None;
            }
        };

        if required && text.is_empty() {
            self.errors.add(field, BLANK);
            return None;
        }
        if let Some(max) = max_length {
            if text.chars().count() > max {
                self.errors
                    .add(field, format!("Ensure this field has no more than {} characters.", max));
                return None;
            }
        }
        Some(text)
    }

    fn integer(&mut self, field: &str, required: bool) -> Option<i64> {
        let value = self.lookup(field, required)?.clone();
        if value.is_null() {
            self.errors.add(field, NULL);
            return None;
        }
        match as_integer(&value) {
            Some(n) => Some(n),
            None => {
                self.errors.add(field, INVALID_INTEGER);
                None
            }
        }
    }

    fn boolean(&mut self, field: &str) -> Option<bool> {
        let value = self.lookup(field, false)?.clone();
        let parsed = match &value {
            Value::Bool(b) => Some(*b),
            Value::Number(n) => match n.as_i64() {
                Some(1) => Some(true),
                Some(0) => Some(false),
                _ => None,
            },
            Value::String(s) => match s.trim().to_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => Some(true),
                "false" | "0" | "no" | "off" => Some(false),
                _ => None,
            },
            _ => None,
        };
        if parsed.is_none() {
            self.errors.add(field, INVALID_BOOLEAN);
        }
        parsed
    }

    fn primary_key(&mut self, field: &str) -> Option<Option<i64>> {
        let value = self.lookup(field, false)?.clone();
        match &value {
            Value::Null => Some(None),
            Value::String(s) if s.trim().is_empty() => Some(None),
            other => match as_integer(other) {
                Some(id) => Some(Some(id)),
                None => {
                    self.errors.add(
                        field,
                        format!("Incorrect type. Expected pk value, received {}.", type_name(other)),
                    );
                    None
                }
            },
        }
    }

    fn primary_keys(&mut self, field: &str) -> Option<Vec<i64>> {
        let value = self.lookup(field, false)?.clone();
        let Value::Array(items) = &value else {
            self.errors.add(
                field,
                format!("Expected a list of items but got type \"{}\".", type_name(&value)),
            );
            return None;
        };

        let mut ids = Vec::with_capacity(items.len());
        for item in items {
            match as_integer(item) {
                Some(id) => ids.push(id),
                None => self.errors.add(
                    field,
                    format!("Incorrect type. Expected pk value, received {}.", type_name(item)),
                ),
            }
        }
        if ids.len() == items.len() {
            Some(ids)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn valid_body() -> Value {
        json!({
            "title": "This is the title",
            "description": "This is the description",
            "preparation_time": "10",
            "preparation_time_unit": "minutes",
            "servings": "2",
            "servings_unit": "Persons",
            "preparation_steps": "This are the steps for the recipe",
        })
    }

    fn stored_recipe() -> Recipe {
        let now = Utc::now();
        Recipe {
            id: 1,
            title: "Stored title".to_string(),
            description: "Stored description".to_string(),
            slug: "stored-title".to_string(),
            preparation_time: 10,
            preparation_time_unit: "Minutes".to_string(),
            servings: 4,
            servings_unit: "Portions".to_string(),
            preparation_steps: "Steps".to_string(),
            preparation_steps_is_html: false,
            cover: String::new(),
            is_published: true,
            category_id: None,
            author_id: 1,
            created_at: now,
            updated_at: now,
        }
    }

    fn messages(errors: &FieldErrors, field: &str) -> Vec<String> {
        errors.get(field).cloned().unwrap_or_default()
    }

    #[test]
    fn test_parse_accepts_numeric_strings() {
        let payload = RecipePayload::parse(&valid_body(), Mode::Create).unwrap();
        assert_eq!(payload.preparation_time, Some(10));
        assert_eq!(payload.servings, Some(2));
        assert_eq!(payload.category, None);

        let input = payload.into_create_input(9);
        assert_eq!(input.author_id, 9);
        assert_eq!(input.title, "This is the title");
        assert!(!input.is_published);
    }

    #[test]
    fn test_parse_create_requires_fields() {
        let errors = RecipePayload::parse(&json!({}), Mode::Create).unwrap_err();

        for field in [
            "title",
            "description",
            "preparation_time",
            "preparation_time_unit",
            "servings",
            "servings_unit",
            "preparation_steps",
        ] {
            assert_eq!(messages(&errors, field), vec![REQUIRED.to_string()], "{}", field);
        }
        assert!(!errors.contains("tags"));
        assert!(!errors.contains("cover"));
    }

    #[test]
    fn test_parse_partial_requires_nothing() {
        let payload = RecipePayload::parse(&json!({"title": "Only the title"}), Mode::Partial).unwrap();
        assert_eq!(payload.title.as_deref(), Some("Only the title"));

        let update = payload.into_update_input();
        assert!(update.has_changes());
        assert!(update.description.is_none());
        assert!(update.is_published.is_none());
    }

    #[test]
    fn test_parse_blank_and_length() {
        let mut body = valid_body();
        body["title"] = json!("   ");
        body["description"] = json!("d".repeat(DESCRIPTION_MAX_LENGTH + 1));
        body["servings_unit"] = json!("u".repeat(UNIT_MAX_LENGTH));

        let errors = RecipePayload::parse(&body, Mode::Create).unwrap_err();
        assert_eq!(messages(&errors, "title"), vec![BLANK.to_string()]);
        assert_eq!(
            messages(&errors, "description"),
            vec!["Ensure this field has no more than 165 characters.".to_string()]
        );
        assert!(!errors.contains("servings_unit"));
    }

    #[test]
    fn test_parse_type_errors() {
        let mut body = valid_body();
        body["preparation_time"] = json!("ten");
        body["servings"] = json!(null);
        body["tags"] = json!("1,2");
        body["category"] = json!({"id": 1});
        body["preparation_steps_is_html"] = json!("maybe");

        let errors = RecipePayload::parse(&body, Mode::Create).unwrap_err();
        assert_eq!(messages(&errors, "preparation_time"), vec![INVALID_INTEGER.to_string()]);
        assert_eq!(messages(&errors, "servings"), vec![NULL.to_string()]);
        assert_eq!(
            messages(&errors, "tags"),
            vec!["Expected a list of items but got type \"string\".".to_string()]
        );
        assert!(errors.contains("category"));
        assert_eq!(messages(&errors, "preparation_steps_is_html"), vec![INVALID_BOOLEAN.to_string()]);
    }

    #[test]
    fn test_parse_relations() {
        let mut body = valid_body();
        body["category"] = json!("3");
        body["tags"] = json!([1, "2"]);
        body["author"] = json!(42);

        let payload = RecipePayload::parse(&body, Mode::Create).unwrap();
        assert_eq!(payload.category_id(), Some(3));
        assert_eq!(payload.tag_ids(), &[1, 2]);

        let cleared = RecipePayload::parse(&json!({"category": null}), Mode::Partial).unwrap();
        assert_eq!(cleared.category, Some(None));
        assert_eq!(cleared.into_update_input().category_id, Some(None));
    }

    #[test]
    fn test_parse_rejects_non_object() {
        let errors = RecipePayload::parse(&json!([1, 2]), Mode::Create).unwrap_err();
        assert!(errors.contains("non_field_errors"));
    }

    #[test]
    fn test_reference_errors() {
        let mut body = valid_body();
        body["category"] = json!(7);
        body["tags"] = json!([1, 2, 3]);
        let payload = RecipePayload::parse(&body, Mode::Create).unwrap();

        let errors = reference_errors(&payload, false, &[1, 3]);
        assert_eq!(
            messages(&errors, "category"),
            vec!["Invalid pk \"7\" - object does not exist.".to_string()]
        );
        assert_eq!(
            messages(&errors, "tags"),
            vec!["Invalid pk \"2\" - object does not exist.".to_string()]
        );

        assert!(reference_errors(&payload, true, &[1, 2, 3]).is_empty());
    }

    #[test]
    fn test_author_rules_on_create() {
        let mut body = valid_body();
        body["title"] = json!("Soup");
        body["preparation_time"] = json!(0);
        body["servings"] = json!(-1);
        let payload = RecipePayload::parse(&body, Mode::Create).unwrap();

        let errors = author_rule_errors(&payload, None);
        assert_eq!(messages(&errors, "title"), vec!["Must have at least 5 chars.".to_string()]);
        assert_eq!(messages(&errors, "preparation_time"), vec![POSITIVE.to_string()]);
        assert_eq!(messages(&errors, "servings"), vec![POSITIVE.to_string()]);

        assert!(author_rule_errors(&RecipePayload::parse(&valid_body(), Mode::Create).unwrap(), None).is_empty());
    }

    #[test]
    fn test_author_rules_title_equals_description() {
        let mut body = valid_body();
        body["description"] = body["title"].clone();
        let payload = RecipePayload::parse(&body, Mode::Create).unwrap();

        let errors = author_rule_errors(&payload, None);
        assert_eq!(messages(&errors, "title"), vec!["Cannot be equal to description".to_string()]);
        assert_eq!(messages(&errors, "description"), vec!["Cannot be equal to title".to_string()]);
    }

    #[test]
    fn test_author_rules_fall_back_to_instance() {
        let recipe = stored_recipe();

        let same_as_stored_description =
            RecipePayload::parse(&json!({"title": "Stored description"}), Mode::Partial).unwrap();
        let errors = author_rule_errors(&same_as_stored_description, Some(&recipe));
        assert!(errors.contains("title"));
        assert!(errors.contains("description"));

        let servings_only = RecipePayload::parse(&json!({"servings": 3}), Mode::Partial).unwrap();
        assert!(author_rule_errors(&servings_only, Some(&recipe)).is_empty());
    }

    #[test]
    fn test_is_empty_body() {
        assert!(is_empty_body(&json!({})));
        assert!(is_empty_body(&Value::Null));
        assert!(!is_empty_body(&json!({"title": "x"})));
        assert!(!is_empty_body(&json!([])));
    }
}
