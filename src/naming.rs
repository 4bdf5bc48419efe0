//! Titles and series names derived from channel paths
//!
//! Channels live in a slash-delimited tree (`site/subsystem/device/channel`).
//! When several channels are shown on one plot the shared tokens become the
//! title and only the differing tokens are kept as series names.

use serde::{Deserialize, Serialize};

use crate::core::{Axis, SeriesSpec};

pub const NO_DATA: &str = "No data";
pub const WILDCARD: &str = "*";

/// Title and per-path names computed from a path set
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedNaming {
    pub title: String,
    pub names: Vec<String>,
}

/// Derive the collective title and per-path short names.
///
/// Comparison is index-aligned against the first path: token `i` becomes a
/// wildcard when any other path has a different token at `i`. Tokens past
/// the shorter of two paths are never compared, and a path longer than the
/// first does not extend the template with trailing `*` tokens.
pub fn derive_names<P: AsRef<[String]>>(paths: &[P]) -> DerivedNaming {
    match paths {
        [] => DerivedNaming {
            title: NO_DATA.to_string(),
            names: vec![NO_DATA.to_string()],
        },
        [only] => {
            let only = only.as_ref();
            match only.split_last() {
                Some((last, parents)) => DerivedNaming {
                    title: parents.join("/"),
                    names: vec![last.clone()],
                },
                None => DerivedNaming {
                    title: String::new(),
                    names: vec![String::new()],
                },
            }
        }
        [first, rest @ ..] => {
            let first = first.as_ref();
            let wild: Vec<bool> = first
                .iter()
                .enumerate()
                .map(|(i, token)| {
                    rest.iter()
                        .any(|path| path.as_ref().get(i).is_some_and(|other| other != token))
                })
                .collect();

            let title = first
                .iter()
                .zip(&wild)
                .map(|(token, &w)| if w { WILDCARD } else { token.as_str() })
                .collect::<Vec<_>>()
                .join("/");

            let names = paths
                .iter()
                .map(|path| {
                    path.as_ref()
                        .iter()
                        .zip(&wild)
                        .filter(|&(_, &w)| w)
                        .map(|(token, _)| token.as_str())
                        .collect::<Vec<_>>()
                        .join("/")
                })
                .collect();

            DerivedNaming { title, names }
        }
    }
}

/// Split a tree node into its full channel path.
///
/// `ancestors` are ordered from the root down to the node's parent; each
/// node's text may itself contain `/`.
pub fn channel_path<S: AsRef<str>>(node_text: &str, ancestors: &[S]) -> Vec<String> {
    ancestors
        .iter()
        .map(|ancestor| ancestor.as_ref())
        .chain(std::iter::once(node_text))
        .flat_map(|text| text.split('/'))
        .map(str::to_string)
        .collect()
}

/// Accumulated path set for one plot, with its derived naming kept current
#[derive(Clone, Debug)]
pub struct SeriesNames {
    paths: Vec<Vec<String>>,
    keys: Vec<String>,
    axes: Vec<Axis>,
    naming: DerivedNaming,
}

impl Default for SeriesNames {
    fn default() -> Self {
        Self::new()
    }
}

impl SeriesNames {
    pub fn new() -> Self {
        let paths: Vec<Vec<String>> = vec![];
        Self {
            naming: derive_names(&paths),
            paths,
            keys: vec![],
            axes: vec![],
        }
    }

    pub fn clear(&mut self) {
        self.paths.clear();
        self.keys.clear();
        self.axes.clear();
        self.recompute();
    }

    pub fn add_data(&mut self, path: Vec<String>, key: impl Into<String>, axis: Axis) {
        self.paths.push(path);
        self.keys.push(key.into());
        self.axes.push(axis);
        self.recompute();
    }

    fn recompute(&mut self) {
        self.naming = derive_names(&self.paths);
    }

    pub fn title(&self) -> &str {
        &self.naming.title
    }

    pub fn names(&self) -> &[String] {
        &self.naming.names
    }

    pub fn naming(&self) -> &DerivedNaming {
        &self.naming
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn series(&self) -> Vec<SeriesSpec> {
        self.keys
            .iter()
            .zip(&self.axes)
            .zip(&self.naming.names)
            .map(|((key, axis), name)| SeriesSpec::new(key.clone(), *axis, name.clone()))
            .collect()
    }

    /// `<trending-data>` elements for a saved static page
    pub fn trending_data_markup(&self) -> String {
        self.series()
            .iter()
            .map(|s| {
                format!(
                    r#"<trending-data key="{}" axis="{}">{}</trending-data>"#,
                    s.key, s.axis, s.name
                )
            })
            .collect()
    }
}
