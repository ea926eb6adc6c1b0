use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::mpsc::channel;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use log::{debug, error};
use notify::{RecursiveMode, Watcher};
use walkdir::{DirEntry, WalkDir};

use amalgam::analyzer::{Analyzer, AnalyzerOptions};
use amalgam::loader::FsUrlLoader;
use amalgam::logging::set_up_logging;
use amalgam::printer::{Printer, SerializationFormat};
use amalgam::settings::ProjectConfig;
use amalgam::warning::Severity;

#[derive(Debug, Parser)]
#[command(name = "amalgam", about = "A static analyzer for web-component corpora", version)]
struct Cli {
    /// Entry files or directories, relative to the package root. Defaults
    /// to the project manifest's entry set, or every markup/script file
    /// under the root.
    paths: Vec<PathBuf>,
    /// The package root directory.
    #[arg(long, default_value = ".")]
    root: PathBuf,
    #[arg(long, value_enum, default_value_t = SerializationFormat::Text)]
    format: SerializationFormat,
    /// Re-analyze when files under the root change.
    #[arg(short, long)]
    watch: bool,
    #[arg(short, long)]
    verbose: bool,
}

fn is_not_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|name| entry.depth() == 0 || !name.starts_with('.'))
        .unwrap_or(false)
}

fn is_dependency_dir(entry: &DirEntry) -> bool {
    entry.file_type().is_dir()
        && matches!(
            entry.file_name().to_str(),
            Some("bower_components" | "node_modules")
        )
}

/// Collects analyzable documents under `dir` as package-relative URLs.
fn iter_component_files(root: &Path, dir: &Path) -> Vec<String> {
    WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_entry(|entry| is_not_hidden(entry) && !is_dependency_dir(entry))
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            matches!(
                entry.path().extension().and_then(|ext| ext.to_str()),
                Some("html" | "htm" | "js" | "mjs")
            )
        })
        .filter_map(|entry| url_for_path(root, entry.path()))
        .collect()
}

fn url_for_path(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok().unwrap_or(path);
    let url = relative
        .components()
        .filter_map(|component| component.as_os_str().to_str())
        .collect::<Vec<_>>()
        .join("/");
    (!url.is_empty()).then_some(url)
}

fn collect_entries(cli: &Cli) -> Result<Vec<String>> {
    if !cli.paths.is_empty() {
        let mut entries = Vec::new();
        for path in &cli.paths {
            let absolute = if path.is_absolute() {
                path.clone()
            } else {
                cli.root.join(path)
            };
            if absolute.is_dir() {
                entries.extend(iter_component_files(&cli.root, &absolute));
            } else if let Some(url) = url_for_path(&cli.root, &absolute) {
                entries.push(url);
            }
        }
        return Ok(entries);
    }

    if let Some(manifest) = ProjectConfig::find(&cli.root) {
        let config = ProjectConfig::load(&manifest)?;
        let entries = config.entry_urls();
        if !entries.is_empty() {
            debug!("using {} entry document(s) from the project manifest", entries.len());
            return Ok(entries);
        }
    }

    Ok(iter_component_files(&cli.root, &cli.root))
}

fn run(cli: &Cli) -> Result<ExitCode> {
    let entries = collect_entries(cli)?;
    if entries.is_empty() {
        anyhow::bail!("no documents to analyze under {:?}", cli.root);
    }
    debug!("analyzing {} entry document(s)", entries.len());

    let loader = Arc::new(FsUrlLoader::new(&cli.root));
    let analyzer = Analyzer::new(AnalyzerOptions::new(loader));
    let printer = Printer::new(cli.format);

    let analysis = analyzer.analyze(&entries, None)?;
    printer.write_once(&analysis)?;

    if cli.watch {
        let (tx, rx) = channel();
        let mut watcher =
            notify::recommended_watcher(tx).context("failed to set up the file watcher")?;
        watcher
            .watch(&cli.root, RecursiveMode::Recursive)
            .with_context(|| format!("failed to watch {:?}", cli.root))?;
        eprintln!("Watching for file changes in {:?}...", cli.root);

        loop {
            let event = rx.recv().context("file watcher disconnected")?;
            match event {
                Ok(event) => {
                    let changed: Vec<String> = event
                        .paths
                        .iter()
                        .filter_map(|path| url_for_path(&cli.root, path))
                        .collect();
                    if changed.is_empty() {
                        continue;
                    }
                    debug!("files changed: {changed:?}");
                    analyzer.files_changed(&changed);
                    let analysis = analyzer.analyze(&entries, None)?;
                    printer.write_once(&analysis)?;
                }
                Err(err) => error!("watch error: {err}"),
            }
        }
    }

    let has_errors = analysis
        .warnings()
        .iter()
        .any(|warning| warning.severity == Severity::Error);
    Ok(if has_errors {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(err) = set_up_logging(cli.verbose) {
        eprintln!("{} {err}", "error:".red().bold());
        return ExitCode::FAILURE;
    }
    match run(&cli) {
        Ok(code) => code,
        Err(err) => {
            error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}
