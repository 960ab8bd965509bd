//! Search request types.

use crate::error::{Error, ErrorBag, Result};
use crate::query::{is_plain_identifier, Direction, Operator};
use crate::value::Value;
use serde::Deserialize;

/// A search request: one or more items, compiled in order.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct SearchRequest {
    /// Search items.
    pub items: Vec<SearchItem>,
}

impl SearchRequest {
    /// Create a request from items.
    pub fn new(items: Vec<SearchItem>) -> Self {
        Self { items }
    }

    /// Check if the request has no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.items.len()
    }
}

/// One entity to search and the criteria applied to it.
///
/// Fields are optional so that missing values surface as validation
/// messages rather than deserialization failures.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SearchItem {
    /// Registry key of the entity.
    #[serde(default)]
    pub entity: Option<String>,
    /// Criteria, applied in order.
    #[serde(default)]
    pub criteria: Option<Vec<Criterion>>,
}

impl SearchItem {
    /// Create an item for an entity key.
    pub fn new(entity: impl Into<String>) -> Self {
        Self {
            entity: Some(entity.into()),
            criteria: None,
        }
    }

    /// Add a criterion.
    pub fn with(mut self, criterion: Criterion) -> Self {
        self.criteria.get_or_insert_with(Vec::new).push(criterion);
        self
    }

    /// Criteria, or an empty slice when none were given.
    pub fn criteria(&self) -> &[Criterion] {
        self.criteria.as_deref().unwrap_or(&[])
    }
}

/// A single filter criterion.
///
/// Accepted either as an object
/// (`{"field": "name", "where": "=", "value": "Ann", "or": true}`) or as a
/// positional array (`["name", "=", "Ann", true]`). In the positional form
/// the presence of a fourth element means `or`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(from = "CriterionRepr")]
pub struct Criterion {
    /// Column name or dotted relation path.
    pub field: Option<String>,
    /// Raw operator token.
    pub operator: Option<String>,
    /// Right-hand value.
    pub value: Option<Value>,
    /// Combine with the previous criterion using `or`.
    pub or: bool,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CriterionRepr {
    Positional(Vec<Value>),
    Named {
        #[serde(default)]
        field: Option<String>,
        #[serde(default, rename = "where")]
        operator: Option<String>,
        #[serde(default)]
        value: Option<Value>,
        #[serde(default)]
        or: bool,
    },
}

impl From<CriterionRepr> for Criterion {
    fn from(repr: CriterionRepr) -> Self {
        match repr {
            CriterionRepr::Positional(parts) => {
                let text = |i: usize| parts.get(i).and_then(Value::as_str).map(str::to_string);
                Criterion {
                    field: text(0),
                    operator: text(1),
                    value: parts.get(2).filter(|v| !v.is_null()).cloned(),
                    or: parts.len() > 3,
                }
            }
            CriterionRepr::Named {
                field,
                operator,
                value,
                or,
            } => Criterion {
                field,
                operator,
                value: value.filter(|v| !v.is_null()),
                or,
            },
        }
    }
}

impl Criterion {
    /// Create a criterion.
    pub fn new(field: impl Into<String>, operator: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: Some(field.into()),
            operator: Some(operator.into()),
            value: Some(value.into()),
            or: false,
        }
    }

    /// Combine with the previous criterion using `or`.
    pub fn or(mut self) -> Self {
        self.or = true;
        self
    }

    /// Parsed operator, if present and known.
    pub fn parsed_operator(&self) -> Option<Operator> {
        self.operator.as_deref().and_then(Operator::parse)
    }

    /// Split the field into its relation segments and leaf column.
    pub fn path(&self) -> Option<(Vec<&str>, &str)> {
        let field = self.field.as_deref()?;
        let mut segments: Vec<&str> = field.split('.').collect();
        let leaf = segments.pop()?;
        Some((segments, leaf))
    }
}

/// Order specification: an optional relation chain, a leaf field and a direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderSpec {
    /// Relations walked before reaching the field.
    pub relations: Vec<String>,
    /// Field ordered by.
    pub field: String,
    /// Sort direction.
    pub direction: Direction,
}

impl OrderSpec {
    /// Create an order spec from a dotted path.
    pub fn new(path: &str, direction: Direction) -> Self {
        let mut relations: Vec<String> = path.split('.').map(str::to_string).collect();
        let field = relations.pop().unwrap_or_default();
        Self {
            relations,
            field,
            direction,
        }
    }

    /// Build an order spec from raw `order_by` / `order_as` parameters.
    ///
    /// Ordering is disabled (`Ok(None)`) unless both are present and
    /// non-empty. An unknown direction, or a path segment that is not a plain
    /// identifier, is a validation error.
    pub fn from_params(path: Option<&str>, direction: Option<&str>) -> Result<Option<Self>> {
        let (path, direction) = match (path.map(str::trim), direction.map(str::trim)) {
            (Some(p), Some(d)) if !p.is_empty() && !d.is_empty() => (p, d),
            _ => return Ok(None),
        };

        let mut errors = ErrorBag::new();
        if !path.split('.').all(is_plain_identifier) {
            errors.add("order.path", format!("Order path `{}` is not a valid path", path));
        }
        let parsed = Direction::parse(direction);
        if parsed.is_none() {
            errors.add(
                "order.direction",
                format!("Order direction `{}` must be one of: asc, desc", direction),
            );
        }

        match parsed {
            Some(direction) if errors.is_empty() => Ok(Some(Self::new(path, direction))),
            _ => Err(Error::Validation(errors)),
        }
    }

    /// Check if the order walks at least one relation.
    pub fn is_relational(&self) -> bool {
        !self.relations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_criterion() {
        let c: Criterion =
            serde_json::from_str(r#"{"field": "name", "where": "=", "value": "Ann", "or": true}"#)
                .unwrap();
        assert_eq!(c.field.as_deref(), Some("name"));
        assert_eq!(c.parsed_operator(), Some(Operator::Eq));
        assert_eq!(c.value, Some(Value::from("Ann")));
        assert!(c.or);
    }

    #[test]
    fn test_positional_criterion() {
        let c: Criterion = serde_json::from_str(r#"["age", ">", 30]"#).unwrap();
        assert_eq!(c.field.as_deref(), Some("age"));
        assert_eq!(c.parsed_operator(), Some(Operator::Gt));
        assert_eq!(c.value, Some(Value::Int(30)));
        assert!(!c.or);

        let c: Criterion = serde_json::from_str(r#"["age", ">", 30, false]"#).unwrap();
        assert!(c.or);
    }

    #[test]
    fn test_missing_parts_are_none() {
        let c: Criterion = serde_json::from_str(r#"{"field": "name", "value": null}"#).unwrap();
        assert!(c.operator.is_none());
        assert!(c.value.is_none());

        let c: Criterion = serde_json::from_str(r#"["name"]"#).unwrap();
        assert!(c.operator.is_none());
    }

    #[test]
    fn test_criterion_path() {
        let c = Criterion::new("author.profile.country", "=", "NZ");
        let (relations, leaf) = c.path().unwrap();
        assert_eq!(relations, vec!["author", "profile"]);
        assert_eq!(leaf, "country");

        let c = Criterion::new("name", "=", "x");
        let (relations, leaf) = c.path().unwrap();
        assert!(relations.is_empty());
        assert_eq!(leaf, "name");
    }

    #[test]
    fn test_request_deserialize() {
        let request: SearchRequest = serde_json::from_str(
            r#"[{"entity": "user", "criteria": [["name", "=", "Ann"]]}, {"entity": "post"}]"#,
        )
        .unwrap();
        assert_eq!(request.len(), 2);
        assert_eq!(request.items[0].criteria().len(), 1);
        assert!(request.items[1].criteria().is_empty());
    }

    #[test]
    fn test_order_from_params() {
        let order = OrderSpec::from_params(Some("author.name"), Some("DESC"))
            .unwrap()
            .unwrap();
        assert_eq!(order.relations, vec!["author".to_string()]);
        assert_eq!(order.field, "name");
        assert_eq!(order.direction, Direction::Desc);
        assert!(order.is_relational());

        let order = OrderSpec::from_params(Some("name"), Some("asc")).unwrap().unwrap();
        assert!(!order.is_relational());
    }

    #[test]
    fn test_order_disabled_without_both_parts() {
        assert!(OrderSpec::from_params(Some("name"), None).unwrap().is_none());
        assert!(OrderSpec::from_params(None, Some("asc")).unwrap().is_none());
        assert!(OrderSpec::from_params(Some(""), Some("asc")).unwrap().is_none());
        assert!(OrderSpec::from_params(Some("name"), Some(" ")).unwrap().is_none());
    }

    #[test]
    fn test_order_bad_direction() {
        match OrderSpec::from_params(Some("name"), Some("sideways")) {
            Err(Error::Validation(bag)) => assert!(bag.has("order.direction")),
            other => panic!("expected validation error, got {:?}", other),
        }
        match OrderSpec::from_params(Some("author..name"), Some("asc")) {
            Err(Error::Validation(bag)) => assert!(bag.has("order.path")),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_order_path_must_be_identifiers() {
        for path in [
            "name, (select password from users limit 1)",
            "author.name desc",
            "author.\"name\"",
            "1name",
        ] {
            match OrderSpec::from_params(Some(path), Some("asc")) {
                Err(Error::Validation(bag)) => {
                    assert!(bag.has("order.path"), "{}", path);
                    assert!(!bag.has("order.direction"));
                }
                other => panic!("expected validation error for {}, got {:?}", path, other),
            }
        }
        assert!(OrderSpec::from_params(Some("author.manager_id"), Some("asc")).unwrap().is_some());
    }
}
