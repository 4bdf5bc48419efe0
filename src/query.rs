//! Query-string encoding for data fetch requests
//!
//! Nested parameters use bracket notation: `parent[child]=value`. Scalars
//! inside a list repeat the enclosing key (`key=a&key=b`), the convention
//! the trending REST endpoint reads repeated channel keys with. Values are
//! written verbatim; no percent-encoding is applied.

use indexmap::IndexMap;
use serde::Serialize;

use crate::core::{ErrorBars, TimeRange};

/// A parameter value: scalar, list or nested map
#[derive(Clone, Debug, PartialEq)]
pub enum Param {
    Scalar(String),
    List(Vec<Param>),
    Map(IndexMap<String, Param>),
}

pub type Params = IndexMap<String, Param>;

impl Param {
    pub fn scalar(value: impl ToString) -> Self {
        Param::Scalar(value.to_string())
    }

    pub fn list<I, T>(values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Param>,
    {
        Param::List(values.into_iter().map(Into::into).collect())
    }
}

macro_rules! scalar_from {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Param {
                fn from(value: $t) -> Self {
                    Param::Scalar(value.to_string())
                }
            }
        )*
    };
}

scalar_from!(&str, String, bool, i32, i64, u32, u64, usize, f64);

impl<T: Into<Param>> From<Vec<T>> for Param {
    fn from(values: Vec<T>) -> Self {
        Param::list(values)
    }
}

impl From<Params> for Param {
    fn from(map: Params) -> Self {
        Param::Map(map)
    }
}

impl From<serde_json::Value> for Param {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;

        match value {
            Value::Null => Param::Scalar("null".into()),
            Value::String(s) => Param::Scalar(s),
            Value::Bool(b) => Param::scalar(b),
            Value::Number(n) => Param::scalar(n),
            Value::Array(items) => Param::List(items.into_iter().map(Param::from).collect()),
            Value::Object(map) => {
                Param::Map(map.into_iter().map(|(k, v)| (k, Param::from(v))).collect())
            }
        }
    }
}

/// Encode a parameter map into a query string (without the leading `?`).
pub fn encode_params(params: &Params) -> String {
    let mut keys = Vec::new();
    let mut fragments = Vec::new();
    // The top level is encoded like a list: plain scalars keep their own key
    for (key, value) in params {
        encode_value(key, value, true, false, &mut keys, &mut fragments);
    }
    fragments.join("&")
}

fn encode_value(
    key: &str,
    value: &Param,
    in_list: bool,
    container_is_list: bool,
    keys: &mut Vec<String>,
    out: &mut Vec<String>,
) {
    match value {
        Param::Scalar(scalar) => {
            let full_key = if keys.is_empty() {
                key.to_string()
            } else if in_list {
                fold_keys(keys.iter().map(String::as_str))
            } else {
                fold_keys(keys.iter().map(String::as_str).chain(std::iter::once(key)))
            };
            out.push(format!("{full_key}={scalar}"));
        }
        Param::List(items) => {
            keys.push(if container_is_list { String::new() } else { key.to_string() });
            for item in items {
                encode_value("", item, true, true, keys, out);
            }
            keys.pop();
        }
        Param::Map(map) => {
            keys.push(if container_is_list { String::new() } else { key.to_string() });
            for (k, v) in map {
                encode_value(k, v, false, false, keys, out);
            }
            keys.pop();
        }
    }
}

/// `["a", "b", "c"]` → `a[b][c]`; an empty leading key is absorbed
fn fold_keys<'a>(keys: impl Iterator<Item = &'a str>) -> String {
    keys.fold(String::new(), |acc, k| {
        if acc.is_empty() {
            k.to_string()
        } else {
            format!("{acc}[{k}]")
        }
    })
}

/// A data fetch request for one plot
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DataRequest {
    pub rest_url: String,
    pub window: TimeRange,
    pub query: String,
}

impl DataRequest {
    pub fn new(
        rest_url: impl Into<String>,
        keys: &[String],
        window: TimeRange,
        n_bins: u32,
        error_bars: ErrorBars,
        source: &str,
    ) -> Self {
        let mut params = Params::new();
        params.insert("key".into(), Param::list(keys.iter().map(String::as_str)));
        params.insert("t1".into(), window.start.into());
        params.insert("t2".into(), window.end.into());
        params.insert("n".into(), n_bins.into());
        params.insert("errorBars".into(), error_bars.as_str().into());
        if !source.is_empty() {
            params.insert("source".into(), source.into());
        }

        Self {
            rest_url: rest_url.into(),
            window,
            query: encode_params(&params),
        }
    }

    pub fn url(&self) -> String {
        format!("{}?{}", self.rest_url, self.query)
    }
}
