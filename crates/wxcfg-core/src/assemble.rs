//! Output assembly: the application manifest, one manifest per page or
//! component, and the optional extension descriptor.

use crate::components::PageConfigMap;
use crate::config::ParserConfig;
use crate::error::Result;
use crate::pages::Subpackage;
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

/// A document queued for persistence
#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    /// Forward-slash path relative to the output root
    pub path: String,
    /// JSON content
    pub document: Value,
}

impl Artifact {
    /// Creates an artifact
    pub fn new(path: impl Into<String>, document: Value) -> Self {
        Self {
            path: path.into(),
            document,
        }
    }
}

/// `extAppid` / `ext` pair of third-party platform bundles
#[derive(Debug, Clone, PartialEq)]
pub struct ExtDescriptor {
    /// Extension app id
    pub ext_appid: Value,
    /// Extension configuration
    pub ext: Value,
}

impl ExtDescriptor {
    /// Builds a descriptor only when both halves are present
    pub fn from_pair(ext_appid: Option<Value>, ext: Option<Value>) -> Option<Self> {
        Some(Self {
            ext_appid: ext_appid?,
            ext: ext?,
        })
    }

    fn to_document(&self) -> Value {
        json!({
            "extEnable": true,
            "extAppid": self.ext_appid,
            "ext": self.ext,
        })
    }
}

/// Everything the application manifest is made from
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ManifestParts {
    /// Root page list, entry page first
    pub pages: Vec<String>,
    /// Resolved tab bar
    pub tab_bar: Option<Value>,
    /// Partitioned subpackages
    pub subpackages: Option<Vec<Subpackage>>,
    /// Fields of the `global` object, spread over the manifest last
    pub global: Option<Map<String, Value>>,
    /// Fields never extracted from the root config
    pub residual: Map<String, Value>,
}

impl ManifestParts {
    /// Builds the application manifest document
    pub fn into_document(self) -> Result<Value> {
        let mut manifest = Map::new();
        manifest.insert("pages".to_string(), Value::from(self.pages));
        for (key, value) in self.residual {
            manifest.insert(key, value);
        }
        if let Some(tab_bar) = self.tab_bar {
            manifest.insert("tabBar".to_string(), tab_bar);
        }
        if let Some(subpackages) = self.subpackages {
            manifest.insert("subPackages".to_string(), serde_json::to_value(subpackages)?);
        }
        for (key, value) in self.global.unwrap_or_default() {
            manifest.insert(key, value);
        }
        Ok(Value::Object(manifest))
    }
}

/// Target path of the manifest for page or config key `key`
pub fn manifest_path(key: &str, suffix: &str) -> String {
    if key.ends_with(suffix) {
        key.to_string()
    } else {
        format!("{}{}", key, suffix)
    }
}

/// Output Assembler stage
pub fn assemble(
    parts: ManifestParts,
    pages: PageConfigMap,
    ext: Option<ExtDescriptor>,
    config: &ParserConfig,
) -> Result<Vec<Artifact>> {
    let mut artifacts = Vec::with_capacity(pages.len() + 2);
    artifacts.push(Artifact::new(&config.manifest_file, parts.into_document()?));

    if let Some(ext) = ext {
        artifacts.push(Artifact::new(&config.ext_file, ext.to_document()));
    }

    let reserved = artifacts.len();
    for (key, page) in pages {
        let path = manifest_path(&key, &config.config_suffix);
        if artifacts[..reserved].iter().any(|a| a.path == path) {
            warn!("Skipping page config {}: the path is taken by {}", key, path);
            continue;
        }
        artifacts.push(Artifact::new(path, serde_json::to_value(page)?));
    }
    debug!("Assembled {} artifact(s)", artifacts.len());
    Ok(artifacts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::PageConfig;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_manifest_path() {
        assert_eq!(manifest_path("pages/index/index", ".json"), "pages/index/index.json");
        assert_eq!(manifest_path("pages/index/index.json", ".json"), "pages/index/index.json");
    }

    #[test]
    fn test_ext_descriptor_needs_both_halves() {
        assert!(ExtDescriptor::from_pair(Some(json!("wx1")), None).is_none());
        assert!(ExtDescriptor::from_pair(None, Some(json!({}))).is_none());
        assert!(ExtDescriptor::from_pair(Some(json!("wx1")), Some(json!({}))).is_some());
    }

    #[test]
    fn test_manifest_document() {
        let mut residual = Map::new();
        residual.insert("debug".into(), json!(true));
        let mut global = Map::new();
        global.insert("window".into(), json!({"navigationBarTitleText": "Demo"}));

        let parts = ManifestParts {
            pages: vec!["index".into(), "logs".into()],
            tab_bar: Some(json!({"list": []})),
            subpackages: Some(vec![Subpackage::with_pages("pkg/", ["a"])]),
            global: Some(global),
            residual,
        };

        assert_eq!(
            parts.into_document().unwrap(),
            json!({
                "pages": ["index", "logs"],
                "debug": true,
                "tabBar": {"list": []},
                "subPackages": [{"root": "pkg/", "pages": ["a"]}],
                "window": {"navigationBarTitleText": "Demo"}
            })
        );
    }

    #[test]
    fn test_absent_structures_are_omitted() {
        let document = ManifestParts::default().into_document().unwrap();
        assert_eq!(document, json!({"pages": []}));
    }

    #[test]
    fn test_assemble_artifacts() {
        let mut pages = PageConfigMap::new();
        pages.insert("pages/index/index.html", PageConfig::default());
        let mut component = PageConfig::default();
        component.mark_component();
        pages.insert("components/card", component);

        let ext = ExtDescriptor::from_pair(Some(json!("wxext")), Some(json!({"k": 1})));
        let artifacts =
            assemble(ManifestParts::default(), pages, ext, &ParserConfig::default()).unwrap();

        let paths: Vec<_> = artifacts.iter().map(|a| a.path.as_str()).collect();
        assert_eq!(
            paths,
            vec!["app.json", "ext.json", "components/card.json", "pages/index/index.json"]
        );
        assert_eq!(
            artifacts[1].document,
            json!({"extEnable": true, "extAppid": "wxext", "ext": {"k": 1}})
        );
        assert_eq!(artifacts[2].document, json!({"window": {"component": true}}));
        assert_eq!(artifacts[3].document, json!({"window": {}}));
    }

    #[test]
    fn test_page_never_replaces_manifest_or_ext() {
        let mut pages = PageConfigMap::new();
        let mut component = PageConfig::default();
        component.mark_component();
        pages.insert("/app", component.clone());
        pages.insert("ext.html", component);
        pages.insert("index", PageConfig::default());
        let parts = ManifestParts {
            pages: vec!["index".into()],
            ..ManifestParts::default()
        };

        let ext = ExtDescriptor::from_pair(Some(json!("wxext")), Some(json!({})));
        let artifacts = assemble(parts, pages, ext, &ParserConfig::default()).unwrap();

        let paths: Vec<_> = artifacts.iter().map(|a| a.path.as_str()).collect();
        assert_eq!(paths, vec!["app.json", "ext.json", "index.json"]);
        assert_eq!(artifacts[0].document["pages"], json!(["index"]));
        assert_eq!(artifacts[1].document["extAppid"], json!("wxext"));
    }
}
