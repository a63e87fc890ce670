//! # Query Builder
//!
//! Builds the query-string filters the REST backend understands.
//!
//! ```text
//! Query::new().eq("uid", "u1").order("created_at", Direction::Desc).limit(20)
//!      │
//!      ▼
//! ?uid=eq.u1&order=created_at.desc&limit=20
//! ```

use std::fmt::Display;

/// Sort direction for `order=`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    fn as_str(&self) -> &'static str {
        match self {
            Direction::Asc => "asc",
            Direction::Desc => "desc",
        }
    }
}

/// An ordered list of query-string pairs.
///
/// Values are kept raw; percent-encoding happens when the URL is built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    pairs: Vec<(String, String)>,
}

impl Query {
    pub fn new() -> Self {
        Query::default()
    }

    fn push(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.pairs.push((key.into(), value.into()));
        self
    }

    /// `select=<columns>`
    pub fn select(self, columns: &str) -> Self {
        self.push("select", columns)
    }

    /// `field=eq.value`
    pub fn eq(self, field: &str, value: impl Display) -> Self {
        self.push(field, format!("eq.{}", value))
    }

    /// `field=neq.value`
    pub fn neq(self, field: &str, value: impl Display) -> Self {
        self.push(field, format!("neq.{}", value))
    }

    /// `field=lt.value`
    pub fn lt(self, field: &str, value: impl Display) -> Self {
        self.push(field, format!("lt.{}", value))
    }

    /// `field=gte.value`
    pub fn gte(self, field: &str, value: impl Display) -> Self {
        self.push(field, format!("gte.{}", value))
    }

    /// `field=is.null`
    pub fn is_null(self, field: &str) -> Self {
        self.push(field, "is.null")
    }

    /// `field=ilike.%pattern%` (case-insensitive contains).
    pub fn ilike(self, field: &str, pattern: &str) -> Self {
        self.push(field, format!("ilike.%{}%", pattern))
    }

    /// `field=in.(a,b,c)`
    pub fn in_list<I, V>(self, field: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Display,
    {
        let joined = values
            .into_iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(",");
        self.push(field, format!("in.({})", joined))
    }

    /// `order=field.dir`
    pub fn order(self, field: &str, direction: Direction) -> Self {
        self.push("order", format!("{}.{}", field, direction.as_str()))
    }

    /// `limit=N`
    pub fn limit(self, n: u32) -> Self {
        self.push("limit", n.to_string())
    }

    /// `on_conflict=col1,col2` for upserts.
    pub fn on_conflict(self, columns: &[&str]) -> Self {
        self.push("on_conflict", columns.join(","))
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Returns the value of the first pair with this key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Percent-encoded form, without the leading `?`.
    pub fn to_query_string(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.pairs.iter())
            .finish()
    }
}
