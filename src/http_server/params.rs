//! File name lists from query strings and bodies
//!
//! Names may arrive comma-delimited (`?filenames=a,b`), as a repeated
//! parameter (`?filenames=a&filenames=b`) or both.

use serde::Deserialize;

/// Every value of `key` in a raw query string, percent-decoded.
///
/// Pairs that do not decode to UTF-8 are skipped.
pub fn query_values(raw_query: Option<&str>, key: &str) -> Vec<String> {
    let Some(query) = raw_query else {
        return Vec::new();
    };

    query
        .split('&')
        .filter_map(|pair| {
            let (k, v) = pair.split_once('=').unwrap_or((pair, ""));
            let k = decode_component(k)?;
            (k == key).then(|| decode_component(v)).flatten()
        })
        .collect()
}

fn decode_component(component: &str) -> Option<String> {
    let spaced = component.replace('+', " ");
    urlencoding::decode(&spaced).ok().map(|decoded| decoded.into_owned())
}

/// Split comma-delimited values into trimmed, non-empty names
pub fn split_names<I, S>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    values
        .into_iter()
        .flat_map(|value| {
            value
                .as_ref()
                .split(',')
                .map(|name| name.trim().to_string())
                .filter(|name| !name.is_empty())
                .collect::<Vec<_>>()
        })
        .collect()
}

/// A list of names sent either as an array or as one delimited string
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum NameList {
    Many(Vec<String>),
    Joined(String),
}

impl NameList {
    pub fn into_names(self) -> Vec<String> {
        match self {
            // Array items are taken whole, commas included
            NameList::Many(names) => names
                .into_iter()
                .map(|name| name.trim().to_string())
                .filter(|name| !name.is_empty())
                .collect(),
            NameList::Joined(joined) => split_names([joined]),
        }
    }
}
