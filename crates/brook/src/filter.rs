//! Query-shaping filters for GET-style invocations.

use std::collections::BTreeMap;

use brook_common::error::EncodeError;
use serde_json::Value;
use url::Url;

/// Filter applied to GET/DELETE invocations.
///
/// `where`, `aggregation` and `groupBy` are predicate/spec trees that the
/// backend expects JSON-stringified inside the query string; every other
/// field passes through as a plain key/value query parameter. POST/PUT
/// invocations never see a filter; their argument is the request body
/// verbatim.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    where_: Option<Value>,
    aggregation: Option<Value>,
    group_by: Option<Value>,
    params: BTreeMap<String, String>,
}

impl Filter {
    /// Create an empty filter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the `where` predicate tree.
    pub fn where_clause(mut self, predicate: Value) -> Self {
        self.where_ = Some(predicate);
        self
    }

    /// Set the `aggregation` spec.
    pub fn aggregation(mut self, spec: Value) -> Self {
        self.aggregation = Some(spec);
        self
    }

    /// Set the `groupBy` spec.
    pub fn group_by(mut self, spec: Value) -> Self {
        self.group_by = Some(spec);
        self
    }

    /// Add a passthrough query parameter.
    pub fn param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    fn is_empty(&self) -> bool {
        self.where_.is_none()
            && self.aggregation.is_none()
            && self.group_by.is_none()
            && self.params.is_empty()
    }

    /// Merge this filter into the query string of `url`.
    pub(crate) fn apply(&self, url: &mut Url) -> Result<(), EncodeError> {
        if self.is_empty() {
            return Ok(());
        }

        let mut pairs = url.query_pairs_mut();
        if let Some(predicate) = &self.where_ {
            pairs.append_pair("where", &serde_json::to_string(predicate)?);
        }
        if let Some(spec) = &self.aggregation {
            pairs.append_pair("aggregation", &serde_json::to_string(spec)?);
        }
        if let Some(spec) = &self.group_by {
            pairs.append_pair("groupBy", &serde_json::to_string(spec)?);
        }
        for (name, value) in &self.params {
            pairs.append_pair(name, value);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn where_clause_is_json_stringified() {
        let mut url = Url::parse("http://api.example.com/api/v1/users").unwrap();
        let filter = Filter::new().where_clause(json!({"a": 1}));
        filter.apply(&mut url).unwrap();

        assert_eq!(url.query(), Some("where=%7B%22a%22%3A1%7D"));
    }

    #[test]
    fn plain_params_pass_through() {
        let mut url = Url::parse("http://api.example.com/api/v1/users").unwrap();
        let filter = Filter::new().param("limit", "10").param("skip", "5");
        filter.apply(&mut url).unwrap();

        assert_eq!(url.query(), Some("limit=10&skip=5"));
    }

    #[test]
    fn empty_filter_leaves_url_untouched() {
        let mut url = Url::parse("http://api.example.com/api/v1/users").unwrap();
        Filter::new().apply(&mut url).unwrap();

        assert_eq!(url.query(), None);
    }

    #[test]
    fn all_three_trees_serialize_independently() {
        let mut url = Url::parse("http://api.example.com/api/v1/apps/kit/collections/c/data").unwrap();
        let filter = Filter::new()
            .where_clause(json!({"age": {"$gt": 21}}))
            .aggregation(json!({"$sum": "amount"}))
            .group_by(json!("country"));
        filter.apply(&mut url).unwrap();

        let query = url.query().unwrap();
        assert!(query.contains("where="));
        assert!(query.contains("aggregation="));
        assert!(query.contains("groupBy="));
    }
}
