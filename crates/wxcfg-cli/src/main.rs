//! wxcfg - Reconstruct mini-program source configuration from compiled bundles
//!
//! This tool reads the merged `app-config.json` of an unpacked bundle and
//! writes back `app.json`, one manifest per page or component, and `ext.json`.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser};
use std::path::{Path, PathBuf};
use tracing::{debug, info, trace, warn, Level};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;
use wxcfg_core::{
    AppConfigParser, ArtifactSink, DryRunSink, JsonDirSink, ParseOutput, ParserConfig,
};

/// Reconstruct mini-program source configuration from compiled bundles
#[derive(Parser, Debug)]
#[command(name = "wxcfg")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(flatten)]
    input: InputMode,

    /// Output directory (defaults to the bundle directory)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Dry run - don't write files, just show what would be written
    #[arg(long)]
    dry_run: bool,

    /// Overwrite existing files
    #[arg(long)]
    force: bool,

    /// Name of the runtime script inside the bundle
    #[arg(long, default_value = "app-service.js")]
    service: String,

    /// Identifier of the page-config registry in the runtime script
    #[arg(long, default_value = "__wxAppCode__")]
    registry: String,
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct InputMode {
    /// Path to the root config file of a single bundle
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Directory searched recursively for bundles
    #[arg(short, long)]
    directory: Option<PathBuf>,
}

#[derive(Debug, Default)]
struct RunStats {
    bundles: usize,
    failed: usize,
    written: usize,
}

impl RunStats {
    fn print_summary(&self, dry_run: bool) {
        let verb = if dry_run { "planned" } else { "written" };
        info!(
            "Summary: {} bundle(s), {} failed, {} file(s) {}",
            self.bundles, self.failed, self.written, verb
        );
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_target(false)
        .init();

    if let Some(ref file) = cli.input.file {
        process_single_bundle(&cli, file)
    } else if let Some(ref directory) = cli.input.directory {
        process_directory(&cli, directory)
    } else {
        bail!("Either --file or --directory must be specified")
    }
}

impl Cli {
    fn parser_config(&self, config_file: &str) -> ParserConfig {
        ParserConfig::new()
            .config_file(config_file)
            .service_script(&self.service)
            .code_registry(&self.registry)
    }
}

/// Process one bundle given its root config file
fn process_single_bundle(cli: &Cli, file: &Path) -> Result<()> {
    if !file.is_file() {
        bail!("Input file does not exist: {}", file.display());
    }

    let bundle = bundle_root(file);
    let output = cli.output.clone().unwrap_or_else(|| bundle.clone());
    let mut stats = RunStats::default();
    process_bundle(cli, file, &output, &mut stats)?;
    stats.print_summary(cli.dry_run);
    Ok(())
}

/// Process every bundle found below `directory`
fn process_directory(cli: &Cli, directory: &Path) -> Result<()> {
    if !directory.is_dir() {
        bail!("Path is not a directory: {}", directory.display());
    }

    info!("Scanning directory: {}", directory.display());
    let config_name = ParserConfig::default().config_file;
    let mut stats = RunStats::default();

    for file in find_bundles(directory, &config_name) {
        let bundle = bundle_root(&file);
        let output = match &cli.output {
            Some(root) => root.join(bundle.strip_prefix(directory).unwrap_or(Path::new(""))),
            None => bundle.clone(),
        };

        if let Err(e) = process_bundle(cli, &file, &output, &mut stats) {
            warn!("Error processing {}: {:#}", file.display(), e);
            stats.failed += 1;
        }
    }

    if stats.bundles == 0 {
        warn!("No {} found under {}", config_name, directory.display());
    }
    stats.print_summary(cli.dry_run);
    Ok(())
}

/// Root config files below `directory`, in walk order
fn find_bundles(directory: &Path, config_name: &str) -> Vec<PathBuf> {
    WalkDir::new(directory)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && e.file_name().to_str() == Some(config_name))
        .map(|e| e.into_path())
        .collect()
}

fn bundle_root(file: &Path) -> PathBuf {
    file.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Parse one bundle and persist its artifacts below `output`
fn process_bundle(cli: &Cli, file: &Path, output: &Path, stats: &mut RunStats) -> Result<()> {
    debug!("Processing bundle: {}", file.display());
    stats.bundles += 1;

    let config_name = file
        .file_name()
        .and_then(|n| n.to_str())
        .context("Config file name is not valid UTF-8")?;
    let parsed = AppConfigParser::new(file)
        .with_config(cli.parser_config(config_name))
        .parse()
        .with_context(|| format!("Failed to parse bundle: {}", file.display()))?;

    trace!("{} artifact(s) for {}", parsed.artifacts.len(), file.display());

    if cli.dry_run {
        let mut sink = DryRunSink::new(output);
        save(&parsed, &mut sink)?;
        for path in &sink.planned {
            println!("Would write: {}", path.display());
        }
        stats.written += sink.planned.len();
    } else {
        let mut sink = JsonDirSink::new(output).force(cli.force);
        let written = save(&parsed, &mut sink)?;
        for path in &written {
            println!("Wrote {}", path.display());
        }
        stats.written += written.len();
    }
    Ok(())
}

fn save(parsed: &ParseOutput, sink: &mut dyn ArtifactSink) -> Result<Vec<PathBuf>> {
    parsed
        .save(sink)
        .context("Failed to write output (use --force to overwrite)")
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use std::fs;
    use tempfile::TempDir;

    fn cli(args: &[&str]) -> Cli {
        Cli::parse_from(std::iter::once("wxcfg").chain(args.iter().copied()))
    }

    fn write_bundle(dir: &Path) {
        fs::create_dir_all(dir).unwrap();
        fs::write(
            dir.join("app-config.json"),
            r#"{"pages": ["pages/index.html"], "page": {"pages/index.html": {"window": {}}}}"#,
        )
        .unwrap();
    }

    #[test]
    fn test_find_bundles() {
        let root = TempDir::new().unwrap();
        write_bundle(&root.path().join("a"));
        write_bundle(&root.path().join("b/nested"));
        fs::write(root.path().join("app-config.txt"), "").unwrap();

        let found = find_bundles(root.path(), "app-config.json");
        assert_eq!(
            found,
            vec![
                root.path().join("a/app-config.json"),
                root.path().join("b/nested/app-config.json"),
            ]
        );
    }

    #[test]
    fn test_bundle_root() {
        assert_eq!(bundle_root(Path::new("app-config.json")), PathBuf::from("."));
        assert_eq!(bundle_root(Path::new("x/app-config.json")), PathBuf::from("x"));
    }

    #[test]
    fn test_process_bundle_writes_output() {
        let bundle = TempDir::new().unwrap();
        write_bundle(bundle.path());
        let file = bundle.path().join("app-config.json");
        let out = TempDir::new().unwrap();
        let cli = cli(&["--file", file.to_str().unwrap()]);

        let mut stats = RunStats::default();
        process_bundle(&cli, &file, out.path(), &mut stats).unwrap();
        assert_eq!(stats.written, 2);
        assert!(out.path().join("app.json").is_file());
        assert!(out.path().join("pages/index.json").is_file());

        // A second run without --force refuses to overwrite
        assert!(process_bundle(&cli, &file, out.path(), &mut stats).is_err());
    }

    #[test]
    fn test_dry_run_writes_nothing() {
        let bundle = TempDir::new().unwrap();
        write_bundle(bundle.path());
        let file = bundle.path().join("app-config.json");
        let out = TempDir::new().unwrap();
        let cli = cli(&["--file", file.to_str().unwrap(), "--dry-run"]);

        let mut stats = RunStats::default();
        process_bundle(&cli, &file, out.path(), &mut stats).unwrap();
        assert_eq!(stats.written, 2);
        assert!(!out.path().join("app.json").exists());
    }

    #[test]
    fn test_directory_mode_continues_after_failure() {
        let root = TempDir::new().unwrap();
        write_bundle(&root.path().join("good"));
        fs::create_dir_all(root.path().join("bad")).unwrap();
        fs::write(root.path().join("bad/app-config.json"), "[1, 2]").unwrap();
        let out = TempDir::new().unwrap();
        let cli = cli(&[
            "--directory",
            root.path().to_str().unwrap(),
            "--output",
            out.path().to_str().unwrap(),
        ]);

        process_directory(&cli, root.path()).unwrap();
        assert!(out.path().join("good/app.json").is_file());
        assert!(!out.path().join("bad").exists());
    }

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }
}
