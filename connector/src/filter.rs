//! Translation of `where` clauses into scan filters.
//!
//! Only equality is supported. A clause set is a flat object of field to
//! scalar; `and` combines clause sets. Anything else is rejected before the
//! store is touched.

use common::{EqualityFilter, Statement};

use crate::codec::{SENTINEL_BIN, encode, is_sentinel_only};
use crate::error::{Error, Result};
use crate::model::{Document, Value, Where};
use crate::registry::ModelDefinition;

/// Equality predicates and scan options for one scan.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterSet {
    /// All predicates must match.
    pub filters: Vec<EqualityFilter>,
    pub concurrent: bool,
    pub nobins: bool,
}

impl Default for FilterSet {
    fn default() -> Self {
        Self {
            filters: Vec::new(),
            concurrent: true,
            nobins: false,
        }
    }
}

impl FilterSet {
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Requests keys and metadata only.
    pub fn with_nobins(mut self) -> Self {
        self.nobins = true;
        self
    }

    pub fn into_statement(self) -> Statement {
        Statement {
            filters: self.filters,
            concurrent: self.concurrent,
            nobins: self.nobins,
        }
    }
}

/// Translates a `where` clause into a [`FilterSet`].
pub fn translate(model: &ModelDefinition, where_clause: Option<&Where>) -> Result<FilterSet> {
    let mut set = FilterSet::default();
    let Some(where_clause) = where_clause else {
        return Ok(set);
    };

    for clauses in clause_sets(where_clause)? {
        let doc = clause_document(model, &clauses)?;
        let bins = encode(model, &doc, true);
        if is_sentinel_only(&bins) {
            continue;
        }
        set.filters.extend(
            bins.into_iter()
                .map(|(bin, value)| EqualityFilter::new(bin, value)),
        );
    }
    Ok(set)
}

/// Splits a `where` into its clause sets: each `and` element, then the keys
/// next to `and`.
fn clause_sets(where_clause: &Where) -> Result<Vec<Vec<(&String, &serde_json::Value)>>> {
    let Some(and) = where_clause.get("and") else {
        return Ok(vec![where_clause.iter().collect()]);
    };

    let elements = and
        .as_array()
        .ok_or_else(|| Error::UnsupportedQuery("'and' must be an array of objects".to_string()))?;
    let mut sets = Vec::with_capacity(elements.len() + 1);
    for element in elements {
        let object = element.as_object().ok_or_else(|| {
            Error::UnsupportedQuery("'and' must be an array of objects".to_string())
        })?;
        sets.push(object.iter().collect());
    }
    let siblings: Vec<_> = where_clause.iter().filter(|(k, _)| *k != "and").collect();
    if !siblings.is_empty() {
        sets.push(siblings);
    }
    Ok(sets)
}

fn clause_document(
    model: &ModelDefinition,
    clauses: &[(&String, &serde_json::Value)],
) -> Result<Document> {
    let mut doc = Document::new();
    for (field, value) in clauses {
        if field.as_str() == SENTINEL_BIN {
            return Err(Error::UnsupportedQuery(format!(
                "'{}' is reserved and cannot be filtered on",
                field
            )));
        }
        if matches!(field.as_str(), "or" | "nor" | "and") {
            return Err(Error::UnsupportedQuery(format!(
                "'{}' is not supported in a where clause",
                field
            )));
        }
        let value = Value::from_json(value).ok_or_else(|| {
            Error::UnsupportedQuery(format!(
                "only equality is supported, field '{}' has {}",
                field, value
            ))
        })?;
        if model.is_identity(field) {
            return Err(Error::UnsupportedQuery(format!(
                "'{}' is the record key and cannot be combined with other constraints",
                field
            )));
        }
        doc.insert(field.as_str(), value);
    }
    Ok(doc)
}

#[cfg(test)]
mod tests {
    use common::BinValue;
    use serde_json::json;

    use super::*;

    fn where_of(value: serde_json::Value) -> Where {
        Where::from_json(value).unwrap()
    }

    fn model() -> ModelDefinition {
        ModelDefinition::new("Post")
    }

    #[test]
    fn should_return_empty_set_for_absent_where() {
        // when
        let set = translate(&model(), None).unwrap();

        // then
        assert!(set.is_empty());
        assert!(set.concurrent);
    }

    #[test]
    fn should_translate_flat_clause_set() {
        // given
        let where_clause = where_of(json!({"title": "My Post", "views": 3}));

        // when
        let set = translate(&model(), Some(&where_clause)).unwrap();

        // then
        assert_eq!(
            set.filters,
            vec![
                EqualityFilter::new("title", BinValue::String("My Post".to_string())),
                EqualityFilter::new("views", BinValue::Int(3)),
            ]
        );
    }

    #[test]
    fn should_translate_and_clause_sets_with_siblings() {
        // given
        let where_clause = where_of(json!({
            "and": [{"title": "My Post"}, {"content": "Hello"}],
            "published": true
        }));

        // when
        let set = translate(&model(), Some(&where_clause)).unwrap();

        // then
        assert_eq!(
            set.filters,
            vec![
                EqualityFilter::new("title", BinValue::String("My Post".to_string())),
                EqualityFilter::new("content", BinValue::String("Hello".to_string())),
                EqualityFilter::new("published", BinValue::Int(1)),
            ]
        );
    }

    #[test]
    fn should_reject_operator_objects() {
        // given
        let where_clause = where_of(json!({"views": {"gt": 1}}));

        // when
        let result = translate(&model(), Some(&where_clause));

        // then
        match result {
            Err(Error::UnsupportedQuery(msg)) => assert!(msg.contains("views")),
            other => panic!("expected unsupported query, got {:?}", other),
        }
    }

    #[test]
    fn should_reject_or() {
        // given
        let where_clause = where_of(json!({"or": [{"title": "a"}, {"title": "b"}]}));

        // when
        let result = translate(&model(), Some(&where_clause));

        // then
        assert!(matches!(result, Err(Error::UnsupportedQuery(_))));
    }

    #[test]
    fn should_reject_null_value() {
        // given
        let where_clause = where_of(json!({"title": null}));

        // when / then
        assert!(matches!(
            translate(&model(), Some(&where_clause)),
            Err(Error::UnsupportedQuery(_))
        ));
    }

    #[test]
    fn should_reject_non_array_and() {
        // given
        let where_clause = where_of(json!({"and": {"title": "a"}}));

        // when / then
        assert!(translate(&model(), Some(&where_clause)).is_err());
    }

    #[test]
    fn should_reject_identity_in_scan() {
        // given
        let where_clause = where_of(json!({"and": [{"id": "a"}, {"title": "b"}]}));

        // when / then
        assert!(matches!(
            translate(&model(), Some(&where_clause)),
            Err(Error::UnsupportedQuery(_))
        ));
    }

    #[test]
    fn should_skip_empty_clause_sets() {
        // given
        let where_clause = where_of(json!({"and": [{}, {"title": "a"}]}));

        // when
        let set = translate(&model(), Some(&where_clause)).unwrap();

        // then
        assert_eq!(set.filters.len(), 1);
        assert!(set.filters.iter().all(|f| f.bin != SENTINEL_BIN));
    }

    #[test]
    fn should_reject_sentinel_field() {
        // given
        let where_clause = where_of(json!({"__empty": 1}));

        // when / then
        assert!(matches!(
            translate(&model(), Some(&where_clause)),
            Err(Error::UnsupportedQuery(_))
        ));
    }

    #[test]
    fn should_lower_into_nobins_statement() {
        // given
        let where_clause = where_of(json!({"title": "a"}));

        // when
        let statement = translate(&model(), Some(&where_clause))
            .unwrap()
            .with_nobins()
            .into_statement();

        // then
        assert!(statement.nobins);
        assert_eq!(statement.filters.len(), 1);
    }
}
