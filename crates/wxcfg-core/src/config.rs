//! Well-known names used while reconstructing a bundle's configuration.

/// Configuration for the reconstruction pipeline
#[derive(Debug, Clone)]
pub struct ParserConfig {
    /// Root configuration blob produced by the bundle compiler
    pub config_file: String,
    /// Consolidated runtime script holding inline page configs
    pub service_script: String,
    /// Application manifest written next to the pages
    pub manifest_file: String,
    /// Extension descriptor written when `extAppid` and `ext` are present
    pub ext_file: String,
    /// Global identifier whose properties carry inline page configs
    pub code_registry: String,
    /// Suffix of per-page manifest files
    pub config_suffix: String,
    /// Scheme of plugin component references
    pub plugin_scheme: String,
    /// Absolute prefix plugin references are rewritten to
    pub plugin_prefix: String,
    /// File extensions never considered as tab-bar icon sources
    pub excluded_suffixes: Vec<String>,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            config_file: "app-config.json".to_string(),
            service_script: "app-service.js".to_string(),
            manifest_file: "app.json".to_string(),
            ext_file: "ext.json".to_string(),
            code_registry: "__wxAppCode__".to_string(),
            config_suffix: ".json".to_string(),
            plugin_scheme: "plugin://".to_string(),
            plugin_prefix: "/__plugin__/".to_string(),
            excluded_suffixes: vec!["html".into(), "wxss".into(), "json".into()],
        }
    }
}

impl ParserConfig {
    /// Creates a new parser config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the root configuration file name
    pub fn config_file(mut self, name: impl Into<String>) -> Self {
        self.config_file = name.into();
        self
    }

    /// Sets the consolidated runtime script name
    pub fn service_script(mut self, name: impl Into<String>) -> Self {
        self.service_script = name.into();
        self
    }

    /// Sets the application manifest name
    pub fn manifest_file(mut self, name: impl Into<String>) -> Self {
        self.manifest_file = name.into();
        self
    }

    /// Sets the global registry identifier scanned in the runtime script
    pub fn code_registry(mut self, ident: impl Into<String>) -> Self {
        self.code_registry = ident.into();
        self
    }

    /// Replaces the list of extensions excluded from the icon index
    pub fn excluded_suffixes<I, S>(mut self, suffixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded_suffixes = suffixes.into_iter().map(Into::into).collect();
        self
    }

    /// Returns true if files with this extension are skipped by the icon index
    pub fn is_excluded(&self, extension: &str) -> bool {
        self.excluded_suffixes
            .iter()
            .any(|s| s.eq_ignore_ascii_case(extension))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parser_config_builder() {
        let config = ParserConfig::new()
            .service_script("game.js")
            .code_registry("__code__")
            .excluded_suffixes(["md"]);

        assert_eq!(config.service_script, "game.js");
        assert_eq!(config.code_registry, "__code__");
        assert!(config.is_excluded("MD"));
        assert!(!config.is_excluded("json"));
    }

    #[test]
    fn test_default_exclusions() {
        let config = ParserConfig::default();
        assert!(config.is_excluded("wxss"));
        assert!(config.is_excluded("html"));
        assert!(!config.is_excluded("png"));
    }
}
