//! Per-page configuration and custom-component resolution.

use crate::config::ParserConfig;
use crate::pages::{join_relative, normalize_page_path, parent_dir};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::debug;

/// Key inside a page's window holding its custom components
pub const USING_COMPONENTS: &str = "usingComponents";

/// Key inside a page's window marking it as a component
pub const COMPONENT_FLAG: &str = "component";

/// Declarative configuration of one page or component
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PageConfig {
    /// The page's configuration fields
    #[serde(default)]
    pub window: Map<String, Value>,
}

impl PageConfig {
    /// Creates a config holding `window`
    pub fn new(window: Map<String, Value>) -> Self {
        Self { window }
    }

    /// Returns true if this entry describes a custom component
    pub fn is_component(&self) -> bool {
        self.window
            .get(COMPONENT_FLAG)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Flags this entry as a custom component
    pub fn mark_component(&mut self) {
        self.window.insert(COMPONENT_FLAG.to_string(), Value::Bool(true));
    }

    /// `tag -> reference` pairs declared by this page, in declaration order
    pub fn component_references(&self) -> Vec<(&str, &str)> {
        self.window
            .get(USING_COMPONENTS)
            .and_then(Value::as_object)
            .map(|using| {
                using
                    .iter()
                    .filter_map(|(tag, reference)| Some((tag.as_str(), reference.as_str()?)))
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Page key to configuration, keyed by canonical page path
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PageConfigMap {
    entries: BTreeMap<String, PageConfig>,
}

impl PageConfigMap {
    /// Creates an empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the map from the raw page table (`{"<page>.html": {"window": ...}}`)
    pub fn from_page_table(table: BTreeMap<String, PageConfig>) -> Self {
        let mut map = Self::new();
        for (key, config) in table {
            map.insert(&key, config);
        }
        map
    }

    /// Canonical form of a page or config-file key
    pub fn canonical_key(key: &str) -> String {
        normalize_page_path(key)
    }

    /// Inserts or replaces the entry for `key`
    pub fn insert(&mut self, key: &str, config: PageConfig) {
        self.entries.insert(Self::canonical_key(key), config);
    }

    /// Entry for `key`, if any
    pub fn get(&self, key: &str) -> Option<&PageConfig> {
        self.entries.get(&Self::canonical_key(key))
    }

    /// Entry for `key`, created empty when missing
    pub fn entry(&mut self, key: &str) -> &mut PageConfig {
        self.entries.entry(Self::canonical_key(key)).or_default()
    }

    /// Replaces the whole window of `key`
    pub fn set_window(&mut self, key: &str, window: Map<String, Value>) {
        self.entry(key).window = window;
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the map has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in key order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &PageConfig)> {
        self.entries.iter()
    }
}

impl IntoIterator for PageConfigMap {
    type Item = (String, PageConfig);
    type IntoIter = std::collections::btree_map::IntoIter<String, PageConfig>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Resolves a component reference declared by `page` to a package path
pub fn resolve_reference(page: &str, reference: &str, config: &ParserConfig) -> String {
    let reference = match reference.strip_prefix(config.plugin_scheme.as_str()) {
        Some(rest) => format!("{}{}", config.plugin_prefix, rest),
        None => reference.to_string(),
    };
    match reference.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => join_relative(parent_dir(page), &reference),
    }
}

/// Component Usage Resolver stage.
///
/// Every component referenced from a page gets an entry flagged as a
/// component. Re-running on its own output changes nothing. Returns the number
/// of references resolved.
pub fn resolve_components(pages: &mut PageConfigMap, config: &ParserConfig) -> usize {
    let targets: Vec<String> = pages
        .iter()
        .flat_map(|(key, page)| {
            page.component_references()
                .into_iter()
                .map(move |(_, reference)| resolve_reference(key, reference, config))
        })
        .collect();

    for target in &targets {
        pages.entry(target).mark_component();
    }
    debug!("Resolved {} component reference(s)", targets.len());
    targets.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn table(value: Value) -> PageConfigMap {
        PageConfigMap::from_page_table(serde_json::from_value(value).unwrap())
    }

    #[test]
    fn test_page_table_keys_are_canonical() {
        let map = table(json!({
            "pages/index/index.html": {"window": {"navigationBarTitleText": "Home"}}
        }));
        assert!(map.get("pages/index/index").is_some());
        assert!(map.get("/pages/index/index.json").is_some());
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_resolve_reference_kinds() {
        let config = ParserConfig::default();
        assert_eq!(
            resolve_reference("pages/index/index", "../../components/card/card", &config),
            "components/card/card"
        );
        assert_eq!(
            resolve_reference("pages/index/index", "/components/list", &config),
            "components/list"
        );
        assert_eq!(
            resolve_reference("pages/index/index", "plugin://myPlugin/chart", &config),
            "__plugin__/myPlugin/chart"
        );
        assert_eq!(
            resolve_reference("index", "./widgets/tag", &config),
            "widgets/tag"
        );
    }

    #[test]
    fn test_resolve_components_creates_entries() {
        let mut map = table(json!({
            "pages/index/index.html": {"window": {"usingComponents": {
                "card": "../../components/card/card",
                "chart": "plugin://charts/line"
            }}},
            "pages/about.html": {"window": {"usingComponents": {}}}
        }));

        assert_eq!(resolve_components(&mut map, &ParserConfig::default()), 2);
        assert_eq!(map.len(), 4);
        assert!(map.get("components/card/card").unwrap().is_component());
        assert!(map.get("__plugin__/charts/line").unwrap().is_component());
        assert!(!map.get("pages/index/index").unwrap().is_component());
    }

    #[test]
    fn test_existing_component_entry_keeps_fields() {
        let mut map = table(json!({
            "pages/a.html": {"window": {"usingComponents": {"x": "/comp/x"}}},
            "comp/x.html": {"window": {"usingComponents": {"y": "./y"}}}
        }));
        resolve_components(&mut map, &ParserConfig::default());

        let x = map.get("comp/x").unwrap();
        assert!(x.is_component());
        assert!(x.window.contains_key(USING_COMPONENTS));
        assert!(map.get("comp/y").unwrap().is_component());
    }

    #[test]
    fn test_resolve_components_is_idempotent() {
        let mut map = table(json!({
            "pages/index/index.html": {"window": {"usingComponents": {"card": "../../c/card"}}},
            "c/card.html": {"window": {"usingComponents": {"icon": "../icon/icon"}}}
        }));
        let config = ParserConfig::default();

        resolve_components(&mut map, &config);
        let once = map.clone();
        resolve_components(&mut map, &config);
        assert_eq!(map, once);
    }

    #[test]
    fn test_page_without_window_deserializes() {
        let map = table(json!({"pages/empty.html": {}}));
        assert_eq!(map.get("pages/empty").unwrap(), &PageConfig::default());
    }
}
