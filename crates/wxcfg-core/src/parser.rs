//! The configuration parser pipeline.
//!
//! One [`AppConfigParser::parse`] call runs every stage in order over a single
//! bundle and yields the artifacts to persist. Nothing is written until
//! [`ParseOutput::save`] is called, so a failing bundle leaves no output.

use crate::assemble::{assemble, Artifact, ExtDescriptor, ManifestParts};
use crate::components::{resolve_components, PageConfig, PageConfigMap};
use crate::config::ParserConfig;
use crate::document::ConfigDocument;
use crate::embedded::{merge_embedded, scan_service_script};
use crate::error::{Error, Result};
use crate::icons::{resolve_tab_bar, Blake3Hasher, ContentHasher};
use crate::pages::{normalize_page_path, partition_subpackages, reorder_entry, Subpackage};
use crate::persist::ArtifactSink;
use crate::tree::{DirTree, FileTree};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Result of a successful parse
#[derive(Debug, Clone, PartialEq)]
pub struct ParseOutput {
    /// Artifacts in write order, application manifest first
    pub artifacts: Vec<Artifact>,
}

impl ParseOutput {
    /// The application manifest document
    pub fn manifest(&self) -> Option<&Value> {
        self.artifacts.first().map(|a| &a.document)
    }

    /// Artifact written to `path`, if any
    pub fn artifact(&self, path: &str) -> Option<&Artifact> {
        self.artifacts.iter().find(|a| a.path == path)
    }

    /// Hands every artifact to `sink`, returning the written paths
    pub fn save(&self, sink: &mut dyn ArtifactSink) -> Result<Vec<PathBuf>> {
        let mut written = Vec::with_capacity(self.artifacts.len());
        for artifact in &self.artifacts {
            let path = sink.write(artifact)?;
            info!("Wrote {}", path.display());
            written.push(path);
        }
        Ok(written)
    }
}

/// Reconstructs source configuration from one compiled bundle
pub struct AppConfigParser<T = DirTree, H = Blake3Hasher> {
    tree: T,
    hasher: H,
    config: ParserConfig,
}

impl AppConfigParser {
    /// Creates a parser for the bundle containing `config_path`.
    ///
    /// The bundle root is the directory holding the root config file, and
    /// the file's own name overrides the configured default.
    pub fn new(config_path: impl AsRef<Path>) -> Self {
        let config_path = config_path.as_ref();
        let root = config_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let mut config = ParserConfig::default();
        if let Some(name) = config_path.file_name() {
            config = config.config_file(name.to_string_lossy());
        }
        Self {
            tree: DirTree::new(root),
            hasher: Blake3Hasher,
            config,
        }
    }
}

impl<T: FileTree> AppConfigParser<T> {
    /// Creates a parser over an arbitrary file tree
    pub fn from_tree(tree: T) -> Self {
        Self {
            tree,
            hasher: Blake3Hasher,
            config: ParserConfig::default(),
        }
    }
}

impl<T: FileTree, H: ContentHasher> AppConfigParser<T, H> {
    /// Replaces the parser configuration
    pub fn with_config(mut self, config: ParserConfig) -> Self {
        self.config = config;
        self
    }

    /// Replaces the content hasher used for icon matching
    pub fn with_hasher<H2: ContentHasher>(self, hasher: H2) -> AppConfigParser<T, H2> {
        AppConfigParser {
            tree: self.tree,
            hasher,
            config: self.config,
        }
    }

    /// The active configuration
    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// The bundle's file tree
    pub fn tree(&self) -> &T {
        &self.tree
    }

    /// Runs the whole pipeline.
    ///
    /// Any stage failure aborts the run with [`Error::ParseFailed`].
    pub fn parse(&self) -> Result<ParseOutput> {
        self.run().map_err(Error::parse_failed)
    }

    fn run(&self) -> Result<ParseOutput> {
        let text = self.tree.read_to_string(&self.config.config_file)?;
        let doc = ConfigDocument::from_json(&text)?;
        debug!("Loaded {} with {} field(s)", self.config.config_file, doc.len());

        let (entry, doc) = doc.extract_as::<String>("entryPagePath")?;
        let (pages, doc) = doc.extract_as::<Vec<String>>("pages")?;
        let (global, doc) = doc.extract_as::<Map<String, Value>>("global")?;
        let (subpackages, doc) = doc.extract_as::<Vec<Subpackage>>("subPackages")?;
        let (ext_appid, doc) = doc.extract("extAppid");
        let (ext, doc) = doc.extract("ext");
        let (tab_bar, doc) = doc.extract("tabBar");
        let (page_table, doc) = doc.extract_as::<BTreeMap<String, PageConfig>>("page")?;
        let residual = doc.residual();

        let mut pages: Vec<String> = pages
            .ok_or_else(|| Error::missing_field("pages"))?
            .iter()
            .map(|p| normalize_page_path(p))
            .collect();

        match entry {
            Some(entry) => {
                reorder_entry(&mut pages, &entry);
            }
            None => debug!("No entryPagePath, keeping declared page order"),
        }

        let subpackages = subpackages.map(|mut list| {
            partition_subpackages(&mut pages, &mut list);
            info!("Partitioned {} subpackage(s)", list.len());
            list
        });

        let tab_bar = resolve_tab_bar(tab_bar, &self.tree, &self.hasher, &self.config)?;

        let mut page_configs = PageConfigMap::from_page_table(page_table.unwrap_or_default());
        let components = resolve_components(&mut page_configs, &self.config);
        debug!("Flagged {} component(s)", components);

        if let Some(found) = scan_service_script(&self.tree, &self.config)? {
            let merged = merge_embedded(&mut page_configs, &found, &self.config);
            debug!("Merged {} embedded config(s)", merged);
        }

        let parts = ManifestParts {
            pages,
            tab_bar,
            subpackages,
            global,
            residual,
        };
        let artifacts = assemble(
            parts,
            page_configs,
            ExtDescriptor::from_pair(ext_appid, ext),
            &self.config,
        )?;
        Ok(ParseOutput { artifacts })
    }
}
