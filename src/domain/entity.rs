use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::AppError;

/// An entity as returned by the tracking tool. Fields beyond `id` and `type`
/// vary per entity kind and are kept as raw JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<String>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Entity {
    pub fn reference(&self) -> EntityReference {
        EntityReference {
            id: self.id.clone(),
            entity_type: self.entity_type.clone(),
        }
    }

    pub fn field_str(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityReference {
    pub id: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<String>,
}

/// Payload for create and update calls. Serialized as a flat JSON object.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct NewEntity(pub Map<String, Value>);

impl NewEntity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.0.insert(field.to_string(), value.into());
        self
    }

    pub fn with_reference(self, field: &str, reference: &EntityReference) -> Self {
        let value = serde_json::to_value(reference).unwrap_or(Value::Null);
        self.with(field, value)
    }

    pub fn with_references(self, field: &str, references: &[EntityReference]) -> Self {
        let data = serde_json::to_value(references).unwrap_or(Value::Null);
        self.with(field, serde_json::json!({ "data": data }))
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EntityCollection {
    pub total_count: u64,
    #[serde(default)]
    pub data: Vec<Entity>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EntityError {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub error_code: Option<String>,
}

/// Result of a batch create or update. A 409 from the tracking tool still
/// yields one of these, with `errors` describing the rejected items.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BatchResponse {
    #[serde(default)]
    pub total_count: u64,
    #[serde(default)]
    pub data: Vec<Entity>,
    #[serde(default)]
    pub errors: Option<Vec<EntityError>>,
}

impl BatchResponse {
    pub fn has_errors(&self) -> bool {
        self.errors.as_ref().is_some_and(|errors| !errors.is_empty())
    }

    pub fn error_descriptions(&self) -> Vec<String> {
        self.errors
            .iter()
            .flatten()
            .map(|error| match &error.error_code {
                Some(code) => format!("{code}: {}", error.description),
                None => error.description.clone(),
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessLevel {
    Public,
    PublicInternal,
    PublicTechPreview,
    Private,
}

impl AccessLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessLevel::Public => "PUBLIC",
            AccessLevel::PublicInternal => "PUBLIC_INTERNAL",
            AccessLevel::PublicTechPreview => "PUBLIC_TECH_PREVIEW",
            AccessLevel::Private => "PRIVATE",
        }
    }
}

impl FromStr for AccessLevel {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "PUBLIC" => Ok(AccessLevel::Public),
            "PUBLIC_INTERNAL" => Ok(AccessLevel::PublicInternal),
            "PUBLIC_TECH_PREVIEW" => Ok(AccessLevel::PublicTechPreview),
            "PRIVATE" => Ok(AccessLevel::Private),
            other => Err(AppError::Configuration(format!("unknown access level '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FieldMetadataFilter {
    pub visible_in_ui: Option<bool>,
    pub editable: Option<bool>,
    pub access_level: Option<AccessLevel>,
}

impl FieldMetadataFilter {
    pub fn query(&self, entity_types: &[&str]) -> String {
        let names = entity_types
            .iter()
            .map(|name| format!("'{name}'"))
            .collect::<Vec<_>>()
            .join(",");
        let mut parts = vec![format!("(entity_name IN {names})")];
        if let Some(visible) = self.visible_in_ui {
            parts.push(format!("visible_in_ui={visible}"));
        }
        if let Some(editable) = self.editable {
            parts.push(format!("editable={editable}"));
        }
        if let Some(level) = self.access_level {
            parts.push(format!("access_level={}", level.as_str()));
        }
        format!("\"{}\"", parts.join(";"))
    }
}

/// Query parameters for a collection fetch. Unset values fall back to
/// `order_by=id`, `offset=0`, `limit=1000`.
#[derive(Debug, Clone, Default)]
pub struct FetchParameters {
    pub order_by: Option<String>,
    pub offset: Option<u64>,
    pub limit: Option<u64>,
    pub query: Option<String>,
    pub fields: Vec<String>,
    pub extra: Vec<(String, String)>,
}

impl FetchParameters {
    pub const DEFAULT_ORDER_BY: &'static str = "id";
    pub const DEFAULT_OFFSET: u64 = 0;
    pub const DEFAULT_LIMIT: u64 = 1000;

    pub fn with_query(query: impl Into<String>) -> Self {
        Self {
            query: Some(query.into()),
            ..Self::default()
        }
    }

    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![
            (
                "order_by".to_string(),
                self.order_by
                    .clone()
                    .unwrap_or_else(|| Self::DEFAULT_ORDER_BY.to_string()),
            ),
            (
                "offset".to_string(),
                self.offset.unwrap_or(Self::DEFAULT_OFFSET).to_string(),
            ),
            (
                "limit".to_string(),
                self.limit.unwrap_or(Self::DEFAULT_LIMIT).to_string(),
            ),
        ];
        if let Some(query) = &self.query {
            pairs.push(("query".to_string(), query.clone()));
        }
        if !self.fields.is_empty() {
            pairs.push(("fields".to_string(), self.fields.join(",")));
        }
        for (key, value) in &self.extra {
            match pairs.iter_mut().find(|(existing, _)| existing == key) {
                Some(pair) => pair.1 = value.clone(),
                None => pairs.push((key.clone(), value.clone())),
            }
        }
        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_access_levels() {
        assert_eq!("public".parse::<AccessLevel>().unwrap(), AccessLevel::Public);
        assert_eq!(
            "PUBLIC_TECH_PREVIEW".parse::<AccessLevel>().unwrap(),
            AccessLevel::PublicTechPreview
        );
        assert!("hidden".parse::<AccessLevel>().is_err());
    }

    #[test]
    fn fetch_parameters_fill_defaults() {
        let pairs = FetchParameters::default().to_query_pairs();
        assert_eq!(
            pairs,
            vec![
                ("order_by".to_string(), "id".to_string()),
                ("offset".to_string(), "0".to_string()),
                ("limit".to_string(), "1000".to_string()),
            ]
        );
    }

    #[test]
    fn fetch_parameters_override_defaults() {
        let params = FetchParameters {
            limit: Some(5),
            fields: vec!["name".into(), "url".into()],
            extra: vec![("order_by".into(), "-id".into()), ("show_hidden".into(), "true".into())],
            ..FetchParameters::default()
        };
        let pairs = params.to_query_pairs();
        assert!(pairs.contains(&("order_by".to_string(), "-id".to_string())));
        assert!(pairs.contains(&("limit".to_string(), "5".to_string())));
        assert!(pairs.contains(&("fields".to_string(), "name,url".to_string())));
        assert!(pairs.contains(&("show_hidden".to_string(), "true".to_string())));
        assert_eq!(pairs.iter().filter(|(k, _)| k == "order_by").count(), 1);
    }

    #[test]
    fn field_metadata_query_joins_parts() {
        let filter = FieldMetadataFilter {
            visible_in_ui: Some(true),
            editable: None,
            access_level: Some(AccessLevel::Public),
        };
        assert_eq!(
            filter.query(&["story", "defect"]),
            "\"(entity_name IN 'story','defect');visible_in_ui=true;access_level=PUBLIC\""
        );
    }

    #[test]
    fn entity_keeps_unknown_fields() {
        let entity: Entity = serde_json::from_value(serde_json::json!({
            "id": "1001",
            "type": "scm_repository_root",
            "url": "https://github.com/octo/hello.git"
        }))
        .unwrap();
        assert_eq!(entity.field_str("url"), Some("https://github.com/octo/hello.git"));
        assert_eq!(
            entity.reference(),
            EntityReference {
                id: "1001".into(),
                entity_type: Some("scm_repository_root".into())
            }
        );
    }

    #[test]
    fn new_entity_serializes_references() {
        let reference = EntityReference {
            id: "7".into(),
            entity_type: Some("scm_repository".into()),
        };
        let entity = NewEntity::new()
            .with("id", "42")
            .with_references("scm_branches", std::slice::from_ref(&reference));
        assert_eq!(
            serde_json::to_value(&entity).unwrap(),
            serde_json::json!({
                "id": "42",
                "scm_branches": { "data": [{ "id": "7", "type": "scm_repository" }] }
            })
        );
    }

    #[test]
    fn batch_response_reports_errors() {
        let response: BatchResponse = serde_json::from_value(serde_json::json!({
            "total_count": 0,
            "data": [],
            "errors": [{ "error_code": "platform.duplicate_entity_error", "description": "exists" }]
        }))
        .unwrap();
        assert!(response.has_errors());
        assert_eq!(
            response.error_descriptions(),
            vec!["platform.duplicate_entity_error: exists".to_string()]
        );
    }
}
