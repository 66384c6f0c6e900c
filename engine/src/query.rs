use crate::Paging;
use crate::error::{QueryError, QueryResult};
use error_stack::Report;

pub const FILTER: &str = "$filter";
pub const TOP: &str = "$top";
pub const SKIP: &str = "$skip";
pub const EXPAND: &str = "$expand";

/// Raw query-string parameters, as received. Keys may repeat.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct QueryParams {
    params: Vec<(String, String)>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    /// First value for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn get_all<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.params
            .iter()
            .filter(move |(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// The `$filter` expression, if one was given and isn't blank.
    pub fn filter(&self) -> Option<&str> {
        self.get(FILTER).filter(|f| !f.trim().is_empty())
    }

    /// `$top` and `$skip`. Absent or negative means no limit.
    pub fn paging(&self) -> QueryResult<Paging> {
        Ok(Paging::from_signed(
            self.signed(TOP)?.unwrap_or(-1),
            self.signed(SKIP)?.unwrap_or(-1),
        ))
    }

    pub fn expand(&self) -> Expand {
        let names: Vec<String> = self
            .get_all(EXPAND)
            .flat_map(|v| v.split(','))
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_owned)
            .collect();

        if names.is_empty() {
            Expand::None
        } else if names.iter().any(|n| n == "*") {
            Expand::All
        } else {
            Expand::Only(names)
        }
    }

    fn signed(&self, key: &str) -> QueryResult<Option<i64>> {
        self.get(key)
            .map(|raw| {
                raw.trim().parse::<i64>().map_err(|_| {
                    Report::new(QueryError {
                        key: key.to_owned(),
                        value: raw.to_owned(),
                    })
                })
            })
            .transpose()
    }
}

impl<K, V> FromIterator<(K, V)> for QueryParams
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            params: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Which related-entity collections to attach.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub enum Expand {
    #[default]
    None,
    All,
    Only(Vec<String>),
}

impl Expand {
    pub fn includes(&self, relation: &str) -> bool {
        match self {
            Expand::None => false,
            Expand::All => true,
            Expand::Only(names) => names.iter().any(|n| n.eq_ignore_ascii_case(relation)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_paging_is_unlimited() {
        assert_eq!(Paging::ALL, QueryParams::new().paging().unwrap());
    }

    #[test]
    fn top_and_skip_are_read() {
        let params = QueryParams::new().with(TOP, "5").with(SKIP, "10");
        assert_eq!(Paging::new(Some(5), Some(10)), params.paging().unwrap());
    }

    #[test]
    fn malformed_top_is_an_error() {
        let err = QueryParams::new().with(TOP, "lots").paging().unwrap_err();
        assert_eq!(TOP, err.current_context().key);
        assert_eq!("lots", err.current_context().value);
    }

    #[test]
    fn blank_filter_is_ignored() {
        assert_eq!(None, QueryParams::new().with(FILTER, "  ").filter());
        assert_eq!(
            Some("Id eq 1"),
            QueryParams::new().with(FILTER, "Id eq 1").filter()
        );
    }

    #[test]
    fn expand_forms() {
        assert_eq!(Expand::None, QueryParams::new().expand());
        assert_eq!(Expand::All, QueryParams::new().with(EXPAND, "*").expand());
        assert_eq!(
            Expand::Only(vec!["Addendum".into(), "UserGroup".into()]),
            QueryParams::new()
                .with(EXPAND, "Addendum, UserGroup")
                .expand()
        );
    }

    #[test]
    fn collects_from_pairs() {
        let params: QueryParams = vec![("$top", "1"), ("other", "x")].into_iter().collect();
        assert_eq!(Some("x"), params.get("other"));
    }
}
