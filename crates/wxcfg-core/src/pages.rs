//! Page list handling: path canonicalization, entry ordering and subpackage
//! partitioning.
//!
//! Page paths are kept in one canonical form throughout the crate: forward
//! slashes, no leading slash, no file extension.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, trace};

/// A lazily-loadable partition of the page set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subpackage {
    /// Path prefix shared by every page of the subpackage
    pub root: String,
    /// Root-relative page paths; `None` until partitioned unless declared
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pages: Option<Vec<String>>,
    /// Any other declared fields (`name`, `independent`, `plugins`, ...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Subpackage {
    /// Creates a subpackage selecting its pages by prefix
    pub fn new(root: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            pages: None,
            extra: Map::new(),
        }
    }

    /// Creates a subpackage with an explicit page list
    pub fn with_pages<I, S>(root: impl Into<String>, pages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            root: root.into(),
            pages: Some(pages.into_iter().map(Into::into).collect()),
            extra: Map::new(),
        }
    }
}

/// Converts backslashes to forward slashes
pub fn to_unix(path: &str) -> String {
    path.replace('\\', "/")
}

/// Strips the extension of the last path segment, if any.
///
/// Dot-files (`.eslintrc`) keep their name.
pub fn strip_extension(path: &str) -> &str {
    let name_start = path.rfind('/').map_or(0, |i| i + 1);
    match path[name_start..].rfind('.') {
        Some(dot) if dot > 0 => &path[..name_start + dot],
        _ => path,
    }
}

/// Returns the extension of the last path segment, without the dot
pub fn extension(path: &str) -> Option<&str> {
    let stripped = strip_extension(path);
    if stripped.len() == path.len() {
        None
    } else {
        Some(&path[stripped.len() + 1..])
    }
}

/// Brings a raw page reference into canonical page-list form
pub fn normalize_page_path(raw: &str) -> String {
    let unix = to_unix(raw);
    strip_extension(unix.trim_start_matches('/')).to_string()
}

/// Directory part of a canonical path (empty for top-level entries)
pub fn parent_dir(path: &str) -> &str {
    path.rfind('/').map_or("", |i| &path[..i])
}

/// Resolves `relative` against `base_dir`, folding `.` and `..` segments.
///
/// `..` above the package root is clamped at the root.
pub fn join_relative(base_dir: &str, relative: &str) -> String {
    let mut segments: Vec<&str> = base_dir.split('/').filter(|s| !s.is_empty()).collect();
    for segment in relative.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

/// Moves the entry page to the front of `pages`.
///
/// Returns false, leaving `pages` untouched, when the entry is not listed.
pub fn reorder_entry(pages: &mut Vec<String>, entry: &str) -> bool {
    let entry = normalize_page_path(entry);
    let Some(index) = pages.iter().position(|p| *p == entry) else {
        debug!("Entry page '{}' not found in page list", entry);
        return false;
    };

    let page = pages.remove(index);
    pages.insert(0, page);
    trace!("Entry page '{}' moved from index {}", entry, index);
    true
}

/// Splits `pages` between the root list and the declared subpackages.
///
/// Subpackages are handled in declaration order. Each takes its explicit page
/// list when one is declared, otherwise every remaining root page starting with
/// its prefix. Selected pages leave the root list (except the entry page at
/// index 0) and are stored with the prefix stripped.
pub fn partition_subpackages(pages: &mut Vec<String>, subpackages: &mut [Subpackage]) {
    for subpackage in subpackages.iter_mut() {
        let root = subpackage.root.as_str();
        let selected = match subpackage.pages.take() {
            Some(explicit) => explicit,
            None => pages
                .iter()
                .filter(|p| p.starts_with(root))
                .cloned()
                .collect(),
        };

        let stripped = selected
            .into_iter()
            .map(|page| {
                if let Some(index) = pages.iter().position(|p| *p == page) {
                    if index > 0 {
                        pages.remove(index);
                    }
                }
                page.strip_prefix(root).map(str::to_string).unwrap_or(page)
            })
            .collect::<Vec<_>>();

        debug!(
            "Subpackage '{}' holds {} page(s)",
            subpackage.root,
            stripped.len()
        );
        subpackage.pages = Some(stripped);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeSet;

    fn list(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_normalize_page_path() {
        assert_eq!(normalize_page_path("/pages/index/index.html"), "pages/index/index");
        assert_eq!(normalize_page_path("pages\\a\\b.html"), "pages/a/b");
        assert_eq!(normalize_page_path("pages/index"), "pages/index");
        assert_eq!(normalize_page_path("pages.v2/index"), "pages.v2/index");
    }

    #[test]
    fn test_extension() {
        assert_eq!(extension("assets/icon.png"), Some("png"));
        assert_eq!(extension("assets/.hidden"), None);
        assert_eq!(extension("LICENSE"), None);
    }

    #[test]
    fn test_join_relative() {
        assert_eq!(join_relative("pages/index", "../../comp/card"), "comp/card");
        assert_eq!(join_relative("pages/index", "./item"), "pages/index/item");
        assert_eq!(join_relative("", "widget"), "widget");
        assert_eq!(join_relative("a", "../../../b"), "b");
    }

    #[test]
    fn test_reorder_entry() {
        let mut pages = list(&["a", "b", "c"]);
        assert!(reorder_entry(&mut pages, "b.html"));
        assert_eq!(pages, list(&["b", "a", "c"]));
    }

    #[test]
    fn test_reorder_entry_with_leading_slash() {
        let mut pages = list(&["pages/a", "pages/b"]);
        assert!(reorder_entry(&mut pages, "/pages/b.html"));
        assert_eq!(pages, list(&["pages/b", "pages/a"]));
    }

    #[test]
    fn test_reorder_missing_entry_is_noop() {
        let mut pages = list(&["a", "b", "c"]);
        assert!(!reorder_entry(&mut pages, "z.html"));
        assert_eq!(pages, list(&["a", "b", "c"]));
    }

    #[test]
    fn test_reorder_preserves_page_set() {
        let original = list(&["x/1", "x/2", "y/3", "z"]);
        for entry in &original {
            let mut pages = original.clone();
            reorder_entry(&mut pages, &format!("{}.html", entry));
            assert_eq!(&pages[0], entry);
            assert_eq!(
                pages.iter().collect::<BTreeSet<_>>(),
                original.iter().collect::<BTreeSet<_>>()
            );
        }
    }

    #[test]
    fn test_partition_by_prefix() {
        let mut pages = list(&["pkgA/x", "y"]);
        reorder_entry(&mut pages, "y");
        let mut subs = vec![Subpackage::new("pkgA/")];
        partition_subpackages(&mut pages, &mut subs);

        assert_eq!(pages, list(&["y"]));
        assert_eq!(subs[0].pages, Some(list(&["x"])));
    }

    #[test]
    fn test_partition_explicit_pages() {
        let mut pages = list(&["index", "pkgB/one", "pkgB/two", "pkgB/three"]);
        let mut subs = vec![Subpackage::with_pages("pkgB/", ["pkgB/one", "pkgB/two"])];
        partition_subpackages(&mut pages, &mut subs);

        assert_eq!(pages, list(&["index", "pkgB/three"]));
        assert_eq!(subs[0].pages, Some(list(&["one", "two"])));
    }

    #[test]
    fn test_partition_protects_entry_page() {
        let mut pages = list(&["pkgA/home", "pkgA/detail", "other"]);
        let mut subs = vec![Subpackage::new("pkgA/")];
        partition_subpackages(&mut pages, &mut subs);

        assert_eq!(pages, list(&["pkgA/home", "other"]));
        assert_eq!(subs[0].pages, Some(list(&["home", "detail"])));
    }

    #[test]
    fn test_partition_is_disjoint_and_complete() {
        let original = list(&["index", "a/1", "a/2", "b/1", "c", "b/2"]);
        let mut pages = original.clone();
        let mut subs = vec![Subpackage::new("a/"), Subpackage::new("b/")];
        partition_subpackages(&mut pages, &mut subs);

        let mut rebuilt: BTreeSet<String> = pages.iter().cloned().collect();
        for sub in &subs {
            for page in sub.pages.as_deref().unwrap_or_default() {
                let full = format!("{}{}", sub.root, page);
                assert!(!pages.contains(&full), "{} is in both lists", full);
                rebuilt.insert(full);
            }
        }
        assert_eq!(rebuilt, original.into_iter().collect::<BTreeSet<_>>());
    }

    #[test]
    fn test_subpackage_extra_fields_roundtrip() {
        let sub: Subpackage =
            serde_json::from_str(r#"{"root":"pkg/","name":"pkg","independent":true}"#).unwrap();
        assert_eq!(sub.pages, None);
        assert_eq!(sub.extra.get("independent"), Some(&Value::Bool(true)));
    }
}
