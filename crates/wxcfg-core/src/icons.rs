//! Tab-bar icon recovery.
//!
//! The bundle compiler inlines tab-bar icons into the root config as base64
//! payloads (`iconData`, `selectedIconData`). The original image files usually
//! still sit somewhere in the unpacked tree, so a content-hash index over that
//! tree maps each payload back to a path.

use crate::config::ParserConfig;
use crate::error::Result;
use crate::pages::{extension, normalize_page_path};
use crate::tree::FileTree;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use tracing::{debug, info, trace};

/// Digest function shared by the index and the payload lookup
pub trait ContentHasher {
    /// Hex digest of `data`
    fn digest(&self, data: &[u8]) -> String;

    /// Digest of an inline payload in binary mode.
    ///
    /// Payloads are base64 text; the decoded bytes are hashed so they match
    /// the file they were inlined from. Text that is not valid base64 is
    /// hashed as-is.
    fn digest_payload(&self, payload: &str) -> String {
        match STANDARD.decode(payload.trim()) {
            Ok(bytes) => self.digest(&bytes),
            Err(_) => self.digest(payload.as_bytes()),
        }
    }
}

/// blake3-backed [`ContentHasher`]
#[derive(Debug, Clone, Copy, Default)]
pub struct Blake3Hasher;

impl ContentHasher for Blake3Hasher {
    fn digest(&self, data: &[u8]) -> String {
        blake3::hash(data).to_hex().to_string()
    }
}

/// Content hash to relative file path; the last file written to a hash wins
#[derive(Debug, Clone, Default)]
pub struct ContentHashIndex {
    entries: HashMap<String, String>,
}

impl ContentHashIndex {
    /// Hashes every candidate file of `tree`.
    ///
    /// Files whose extension is excluded by `config` are not candidates.
    pub fn build(
        tree: &dyn FileTree,
        hasher: &dyn ContentHasher,
        config: &ParserConfig,
    ) -> Result<Self> {
        let mut index = Self::default();
        for path in tree.list()? {
            if extension(&path).is_some_and(|ext| config.is_excluded(ext)) {
                continue;
            }
            let digest = hasher.digest(&tree.read(&path)?);
            trace!("Indexed {} ({})", path, &digest[..digest.len().min(8)]);
            index.insert(digest, path);
        }
        debug!("Content hash index holds {} entries", index.len());
        Ok(index)
    }

    /// Records `path` under `digest`, replacing any previous path
    pub fn insert(&mut self, digest: impl Into<String>, path: impl Into<String>) {
        self.entries.insert(digest.into(), path.into());
    }

    /// Path of the file with this digest
    pub fn lookup(&self, digest: &str) -> Option<&str> {
        self.entries.get(digest).map(String::as_str)
    }

    /// Number of indexed digests
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing was indexed
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One tab of the tab bar
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabItem {
    /// Page bound to the tab
    pub page_path: String,
    /// Resolved icon file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_path: Option<String>,
    /// Resolved selected-state icon file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_icon_path: Option<String>,
    /// Inline icon payload, removed once resolved
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_data: Option<String>,
    /// Inline selected-state icon payload, removed once resolved
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_icon_data: Option<String>,
    /// `text` and any other passthrough fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Tab-bar descriptor
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TabBar {
    /// Tabs in display order
    pub list: Vec<TabItem>,
    /// Colors, position and other passthrough fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TabBar {
    /// Number of inline payloads still awaiting resolution
    pub fn unresolved(&self) -> usize {
        self.list
            .iter()
            .map(|item| {
                usize::from(item.icon_data.is_some())
                    + usize::from(item.selected_icon_data.is_some())
            })
            .sum()
    }
}

/// Resolves every inline icon of `tab_bar` through `index`.
///
/// Misses leave the payload in place. Returns the number of icons resolved.
pub fn resolve_icons(
    tab_bar: &mut TabBar,
    index: &ContentHashIndex,
    hasher: &dyn ContentHasher,
) -> usize {
    let mut resolved = 0;
    for item in &mut tab_bar.list {
        item.page_path = normalize_page_path(&item.page_path);
        if resolve_slot(&mut item.icon_data, &mut item.icon_path, index, hasher) {
            resolved += 1;
        }
        if resolve_slot(
            &mut item.selected_icon_data,
            &mut item.selected_icon_path,
            index,
            hasher,
        ) {
            resolved += 1;
        }
    }
    resolved
}

fn resolve_slot(
    data: &mut Option<String>,
    path: &mut Option<String>,
    index: &ContentHashIndex,
    hasher: &dyn ContentHasher,
) -> bool {
    let Some(payload) = data.as_deref() else {
        return false;
    };
    match index.lookup(&hasher.digest_payload(payload)) {
        Some(found) => {
            *path = Some(found.to_string());
            *data = None;
            true
        }
        None => false,
    }
}

/// Icon Resolver stage over the raw `tabBar` value.
///
/// Without a tab bar, or with one lacking a `list` array, the value is
/// returned unchanged and the file tree is never touched.
pub fn resolve_tab_bar(
    tab_bar: Option<Value>,
    tree: &dyn FileTree,
    hasher: &dyn ContentHasher,
    config: &ParserConfig,
) -> Result<Option<Value>> {
    let Some(value) = tab_bar else {
        return Ok(None);
    };
    if !value.get("list").is_some_and(Value::is_array) {
        debug!("Tab bar has no item list, skipping icon resolution");
        return Ok(Some(value));
    }

    let mut tab_bar: TabBar = serde_json::from_value(value)?;
    let index = ContentHashIndex::build(tree, hasher, config)?;
    let resolved = resolve_icons(&mut tab_bar, &index, hasher);
    info!(
        "Resolved {} tab-bar icon(s), {} left inline",
        resolved,
        tab_bar.unresolved()
    );
    Ok(Some(serde_json::to_value(tab_bar)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::DirTree;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    const PNG: &[u8] = b"\x89PNG\r\n\x1a\nfake-icon-bytes";

    fn tree_with_icon() -> (TempDir, DirTree) {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("assets")).unwrap();
        fs::write(dir.path().join("assets/icon.png"), PNG).unwrap();
        fs::write(dir.path().join("app-config.json"), PNG).unwrap();
        let tree = DirTree::new(dir.path());
        (dir, tree)
    }

    #[test]
    fn test_index_skips_excluded_suffixes() {
        let (_dir, tree) = tree_with_icon();
        let index =
            ContentHashIndex::build(&tree, &Blake3Hasher, &ParserConfig::default()).unwrap();
        assert_eq!(index.len(), 1);
        assert_eq!(index.lookup(&Blake3Hasher.digest(PNG)), Some("assets/icon.png"));
    }

    #[test]
    fn test_index_last_write_wins() {
        let mut index = ContentHashIndex::default();
        index.insert("abc", "first.png");
        index.insert("abc", "second.png");
        assert_eq!(index.lookup("abc"), Some("second.png"));
    }

    #[test]
    fn test_payload_digest_decodes_base64() {
        let payload = STANDARD.encode(PNG);
        assert_eq!(Blake3Hasher.digest_payload(&payload), Blake3Hasher.digest(PNG));
        assert_eq!(
            Blake3Hasher.digest_payload("not base64!"),
            Blake3Hasher.digest(b"not base64!")
        );
    }

    #[test]
    fn test_resolve_tab_bar() {
        let (_dir, tree) = tree_with_icon();
        let tab_bar = json!({
            "color": "#000",
            "list": [
                {"pagePath": "index.html", "text": "Home", "iconData": STANDARD.encode(PNG)},
                {"pagePath": "me.html", "selectedIconData": STANDARD.encode(b"unknown")}
            ]
        });

        let config = ParserConfig::default();
        let resolved = resolve_tab_bar(Some(tab_bar), &tree, &Blake3Hasher, &config)
            .unwrap()
            .unwrap();

        assert_eq!(
            resolved,
            json!({
                "list": [
                    {"pagePath": "index", "iconPath": "assets/icon.png", "text": "Home"},
                    {"pagePath": "me", "selectedIconData": STANDARD.encode(b"unknown")}
                ],
                "color": "#000"
            })
        );
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let (_dir, tree) = tree_with_icon();
        let item = json!({"list": [{"pagePath": "index", "iconData": STANDARD.encode(PNG)}]});
        let config = ParserConfig::default();

        let first = resolve_tab_bar(Some(item.clone()), &tree, &Blake3Hasher, &config).unwrap();
        let second = resolve_tab_bar(Some(item), &tree, &Blake3Hasher, &config).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_absent_or_listless_tab_bar() {
        let tree = DirTree::new("/nonexistent/tree");
        let config = ParserConfig::default();
        assert_eq!(resolve_tab_bar(None, &tree, &Blake3Hasher, &config).unwrap(), None);

        let listless = json!({"color": "#fff"});
        assert_eq!(
            resolve_tab_bar(Some(listless.clone()), &tree, &Blake3Hasher, &config).unwrap(),
            Some(listless)
        );
    }
}
