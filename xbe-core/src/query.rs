//! JSON:API query parameters.
//!
//! [`Query`] builds the parameter vocabulary the backend understands:
//!
//! | Helper | Parameter |
//! |---|---|
//! | [`Query::fields`] | `fields[material-types]=name,is-archived` |
//! | [`Query::include`] | `include=parent-material-type` |
//! | [`Query::filter`] | `filter[broker]=123` |
//! | [`Query::page_limit`] / [`Query::page_offset`] | `page[limit]=50`, `page[offset]=100` |
//! | [`Query::sort`] | `sort=name,-created-at` |
//!
//! Parameters are kept sorted by key so encoded URLs are stable.

use std::collections::BTreeMap;
use std::fmt;

/// One sort key; descending keys are sent with a leading `-`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    field: String,
    descending: bool,
}

impl SortKey {
    /// Ascending sort on `field`.
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: false,
        }
    }

    /// Descending sort on `field`.
    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: true,
        }
    }

    /// Parse the wire form: `-name` is descending, `name` ascending.
    pub fn parse(value: &str) -> Self {
        let value = value.trim();
        match value.strip_prefix('-') {
            Some(field) => Self::desc(field),
            None => Self::asc(value),
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.descending {
            write!(f, "-{}", self.field)
        } else {
            f.write_str(&self.field)
        }
    }
}

/// Extra fields and includes a caller needs on top of a command's defaults.
///
/// `fields_set` / `include_set` record whether an override was requested at
/// all, so an explicit empty override can be told apart from no override.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SparseFieldOverrides {
    /// Attributes to add to the primary resource type's fieldset.
    pub primary: Vec<String>,
    /// Whether `primary` should be applied.
    pub fields_set: bool,
    /// Relationship paths to add to `include`.
    pub include: Vec<String>,
    /// Whether `include` should be applied.
    pub include_set: bool,
}

impl SparseFieldOverrides {
    /// Request additional primary fields.
    pub fn with_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.primary.extend(fields.into_iter().map(Into::into));
        self.fields_set = true;
        self
    }

    /// Request additional includes.
    pub fn with_include<I, S>(mut self, include: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.include.extend(include.into_iter().map(Into::into));
        self.include_set = true;
        self
    }
}

/// Query parameters for a request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    params: BTreeMap<String, String>,
}

impl Query {
    /// Create an empty query.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a raw parameter, replacing any existing value.
    pub fn set(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Set a raw parameter only when `value` is not blank.
    pub fn set_if_present(self, key: impl Into<String>, value: &str) -> Self {
        let value = value.trim();
        if value.is_empty() {
            self
        } else {
            self.set(key, value)
        }
    }

    /// Restrict `resource_type` to the listed attributes and relationships.
    pub fn fields<S: AsRef<str>>(self, resource_type: &str, fields: &[S]) -> Self {
        self.set(format!("fields[{}]", resource_type), join(fields))
    }

    /// Include related resources by relationship path.
    pub fn include<S: AsRef<str>>(self, paths: &[S]) -> Self {
        if paths.is_empty() {
            return self;
        }
        self.set("include", join(paths))
    }

    /// Add `filter[name]=value`.
    pub fn filter(self, name: &str, value: impl Into<String>) -> Self {
        self.set(format!("filter[{}]", name), value)
    }

    /// Add `filter[name]=value` only when `value` is not blank.
    pub fn filter_if_present(self, name: &str, value: &str) -> Self {
        self.set_if_present(format!("filter[{}]", name), value)
    }

    /// Page size.
    pub fn page_limit(self, limit: u32) -> Self {
        self.set("page[limit]", limit.to_string())
    }

    /// Page offset; zero is the default and is omitted.
    pub fn page_offset(self, offset: u32) -> Self {
        if offset == 0 {
            return self;
        }
        self.set("page[offset]", offset.to_string())
    }

    /// Sort order, most significant key first.
    pub fn sort(self, keys: &[SortKey]) -> Self {
        if keys.is_empty() {
            return self;
        }
        let value = keys
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");
        self.set("sort", value)
    }

    /// Merge caller overrides into the fieldset of `primary_type` and into `include`.
    pub fn apply_overrides(mut self, primary_type: &str, overrides: &SparseFieldOverrides) -> Self {
        if overrides.fields_set && !overrides.primary.is_empty() {
            let key = format!("fields[{}]", primary_type);
            let merged = merge_list(self.params.get(&key).map(String::as_str), &overrides.primary);
            self.params.insert(key, merged);
        }
        if overrides.include_set && !overrides.include.is_empty() {
            let merged = merge_list(self.params.get("include").map(String::as_str), &overrides.include);
            self.params.insert("include".to_string(), merged);
        }
        self
    }

    /// Get a parameter value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Iterate parameters in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of parameters.
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Check whether no parameters are set.
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

fn join<S: AsRef<str>>(items: &[S]) -> String {
    items
        .iter()
        .map(|s| s.as_ref().trim())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(",")
}

/// Order-preserving, de-duplicated union of a comma list and extra items.
fn merge_list(existing: Option<&str>, extra: &[String]) -> String {
    let mut merged: Vec<&str> = Vec::new();
    let existing = existing.unwrap_or_default().split(',');
    for item in existing.chain(extra.iter().map(String::as_str)) {
        let item = item.trim();
        if !item.is_empty() && !merged.contains(&item) {
            merged.push(item);
        }
    }
    merged.join(",")
}
