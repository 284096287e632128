//! # wxcfg-core
//!
//! A library for reconstructing the source configuration of a compiled
//! mini-program bundle.
//!
//! A compiled bundle carries a single merged `app-config.json` plus a runtime
//! script. This crate splits them back into the application manifest
//! (`app.json`), one manifest per page or component, and the optional
//! extension descriptor (`ext.json`).
//!
//! ## Architecture
//!
//! The pipeline runs these stages in order:
//!
//! - [`document`]: extraction of named fields from the root blob
//! - [`pages`]: entry-page reordering and subpackage partitioning
//! - [`icons`]: resolution of inline tab-bar icons to bundle files
//! - [`components`]: custom-component references and their flags
//! - [`embedded`]: page configs embedded in the runtime script, read through
//!   the [`script`] parser
//! - [`assemble`]: the documents to write
//!
//! [`parser`] drives the stages and [`persist`] writes the result.
//!
//! ## Example
//!
//! ```no_run
//! use wxcfg_core::{AppConfigParser, JsonDirSink};
//!
//! let output = AppConfigParser::new("./bundle/app-config.json").parse()?;
//! for path in output.save(&mut JsonDirSink::new("./bundle"))? {
//!     println!("{}", path.display());
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Extensibility
//!
//! - [`FileTree`]: read bundles from somewhere other than a directory
//! - [`ContentHasher`]: change how icon payloads are matched to files
//! - [`ArtifactSink`]: send artifacts somewhere other than disk
//!

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unreachable_pub)]

pub mod assemble;
pub mod components;
pub mod config;
pub mod document;
pub mod embedded;
pub mod error;
pub mod icons;
pub mod pages;
pub mod parser;
pub mod persist;
pub mod script;
pub mod tree;

// Re-export primary types for convenience
pub use assemble::{Artifact, ExtDescriptor, ManifestParts};
pub use components::{PageConfig, PageConfigMap};
pub use config::ParserConfig;
pub use document::ConfigDocument;
pub use embedded::EmbeddedConfigs;
pub use error::{Error, Result};
pub use icons::{Blake3Hasher, ContentHashIndex, ContentHasher, TabBar, TabItem};
pub use pages::Subpackage;
pub use parser::{AppConfigParser, ParseOutput};
pub use persist::{ArtifactSink, DryRunSink, JsonDirSink};
pub use script::{Script, Visitor};
pub use tree::{DirTree, FileTree};

/// Crate version for programmatic access
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
