//! Inline page configurations embedded in the runtime script.
//!
//! The compiled runtime script registers each page's config as
//! `__wxAppCode__["pages/x.json"] = { ... }`. Those literals are the most
//! authoritative source for page configuration, so they replace whatever the
//! page table said.

use crate::components::PageConfigMap;
use crate::config::ParserConfig;
use crate::error::{Error, Result};
use crate::script::{walk, Flow, Node, NodeKind, Role, Script, Visitor};
use crate::tree::FileTree;
use serde_json::{Map, Value};
use tracing::{debug, info};

/// Config literals found in the script, by registry key, in script order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmbeddedConfigs {
    entries: Vec<(String, Map<String, Value>)>,
}

impl EmbeddedConfigs {
    /// Records `window` under `key`, replacing an earlier record
    pub fn insert(&mut self, key: impl Into<String>, window: Map<String, Value>) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = window,
            None => self.entries.push((key, window)),
        }
    }

    /// Recorded config for `key`
    pub fn get(&self, key: &str) -> Option<&Map<String, Value>> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, window)| window)
    }

    /// Number of recorded keys
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing was recorded
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Recorded keys and configs
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Map<String, Value>)> {
        self.entries.iter().map(|(k, w)| (k.as_str(), w))
    }
}

/// Collects registry assignments while walking a script
struct RegistryVisitor<'s> {
    script: &'s Script,
    registry: &'s str,
    suffix: &'s str,
    found: EmbeddedConfigs,
    error: Option<Error>,
}

impl RegistryVisitor<'_> {
    /// Registry key assigned by `left`, if it is `<registry>["<key><suffix>"]`
    fn registry_key<'n>(&self, left: &'n Node) -> Option<&'n str> {
        let NodeKind::Member {
            object, property, ..
        } = &left.kind
        else {
            return None;
        };
        if object.as_identifier()? != self.registry {
            return None;
        }
        property.as_string().filter(|key| key.ends_with(self.suffix))
    }

    fn record(&mut self, key: &str, literal: &Node) -> Result<()> {
        let text = self.script.source_of(literal);
        let window = serde_json::from_str::<Map<String, Value>>(text)
            .map_err(|e| Error::invalid_field(key, format!("embedded config is not JSON: {}", e)))?;
        debug!("Found embedded config for '{}'", key);
        self.found.insert(key, window);
        Ok(())
    }
}

impl<'n> Visitor<'n> for RegistryVisitor<'_> {
    fn enter(&mut self, node: &'n Node, _role: Role) -> Flow {
        if self.error.is_some() {
            return Flow::SkipChildren;
        }
        let NodeKind::Assignment { left, right, .. } = &node.kind else {
            return Flow::Continue;
        };
        let Some(key) = self.registry_key(left) else {
            return Flow::Continue;
        };

        let mut literals = RightObjects::default();
        walk(right, Role::Right, &mut literals);
        for literal in literals.found {
            if let Err(e) = self.record(key, literal) {
                self.error = Some(e);
                return Flow::SkipChildren;
            }
        }
        Flow::Continue
    }
}

/// Object literals sitting on the right-hand side of their parent
#[derive(Default)]
struct RightObjects<'n> {
    found: Vec<&'n Node>,
}

impl<'n> Visitor<'n> for RightObjects<'n> {
    fn enter(&mut self, node: &'n Node, role: Role) -> Flow {
        if role == Role::Right && matches!(node.kind, NodeKind::Object(_)) {
            self.found.push(node);
            return Flow::SkipChildren;
        }
        Flow::Continue
    }
}

/// Collects every config literal assigned into the registry by `script`.
///
/// When one assignment yields several literals, or a key is assigned more than
/// once, the last literal in source order wins.
pub fn scan_script(script: &Script, config: &ParserConfig) -> Result<EmbeddedConfigs> {
    let mut visitor = RegistryVisitor {
        script,
        registry: &config.code_registry,
        suffix: &config.config_suffix,
        found: EmbeddedConfigs::default(),
        error: None,
    };
    walk(script.root(), Role::Root, &mut visitor);
    match visitor.error {
        Some(e) => Err(e),
        None => Ok(visitor.found),
    }
}

/// Embedded Config Scanner stage.
///
/// Returns `None` when the bundle has no runtime script.
pub fn scan_service_script(
    tree: &dyn FileTree,
    config: &ParserConfig,
) -> Result<Option<EmbeddedConfigs>> {
    if !tree.exists(&config.service_script) {
        info!(
            "No {} in bundle, page configs come from the page table only",
            config.service_script
        );
        return Ok(None);
    }

    let script = Script::parse(tree.read_to_string(&config.service_script)?)?;
    let found = scan_script(&script, config)?;
    info!(
        "Found {} embedded page config(s) in {}",
        found.len(),
        config.service_script
    );
    Ok(Some(found))
}

/// Replaces the window of every scanned page with its embedded config.
///
/// The application manifest's own key is skipped. Returns the number of
/// entries written.
pub fn merge_embedded(
    pages: &mut PageConfigMap,
    found: &EmbeddedConfigs,
    config: &ParserConfig,
) -> usize {
    let manifest_key = PageConfigMap::canonical_key(&config.manifest_file);
    let mut merged = 0;
    for (key, window) in found.iter() {
        if PageConfigMap::canonical_key(key) == manifest_key {
            debug!("Ignoring embedded config for the application manifest");
            continue;
        }
        pages.set_window(key, window.clone());
        merged += 1;
    }
    merged
}
