use crate::adapters::fs::FileSourceReader;
use crate::app::dto::{DiagramConfig, load_data_access_tags};
use crate::app::engine::{DiagramEngine, RunOutput};
use crate::domain::config::{
    ArrowStyle, EdgeStyle, EmitterKind, LayoutMode, RankOrigin, SizeMode,
};
use anyhow::{Context as _, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Lane-grouped call flow diagrams for Python sources.
#[derive(Parser, Debug)]
#[command(name = "flowlanes", version, about, long_about = None)]
pub struct Cli {
    /// Python source files to analyze (no directory walking)
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// JSON configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// JSON array of {callable, operation, resource} data-access records
    #[arg(long)]
    pub data_access: Option<PathBuf>,

    /// Output directory
    #[arg(long, default_value = "docs")]
    pub out_dir: PathBuf,

    /// draw.io file name inside the output directory
    #[arg(long, default_value = "flow.drawio")]
    pub drawio_file: String,

    /// Mermaid file name inside the output directory
    #[arg(long, default_value = "flow.mmd")]
    pub mermaid_file: String,

    /// Emitters to run (repeatable); overrides the config file
    #[arg(long = "emitter", value_enum)]
    pub emitters: Vec<EmitterKind>,

    #[arg(long, value_enum)]
    pub layout_mode: Option<LayoutMode>,

    #[arg(long, value_enum)]
    pub rank_origin: Option<RankOrigin>,

    /// Entry point qualified names (repeatable); used with explicit-entries
    #[arg(long = "entry")]
    pub entry_points: Vec<String>,

    #[arg(long, value_enum)]
    pub edge_style: Option<EdgeStyle>,

    #[arg(long, value_enum)]
    pub arrow_style: Option<ArrowStyle>,

    /// true or false
    #[arg(long)]
    pub line_jumps: Option<bool>,

    #[arg(long, value_enum)]
    pub size_mode: Option<SizeMode>,

    /// Add a legend to both diagrams
    #[arg(long)]
    pub legend: bool,

    /// Nodes per row inside a lane (0 = unbounded)
    #[arg(long)]
    pub max_columns: Option<usize>,

    #[arg(long)]
    pub theme: Option<String>,

    /// Print the run report as JSON
    #[arg(long)]
    pub report_json: bool,
}

impl Cli {
    /// Config file contents with command-line overrides applied.
    pub fn resolve_config(&self) -> Result<DiagramConfig> {
        let mut config = match &self.config {
            Some(path) => DiagramConfig::load(path)?,
            None => DiagramConfig::default(),
        };
        if !self.emitters.is_empty() {
            config.emitters = self.emitters.clone();
        }
        if let Some(mode) = self.layout_mode {
            config.layout_mode = mode;
        }
        if let Some(origin) = self.rank_origin {
            config.rank_origin = origin;
        }
        if !self.entry_points.is_empty() {
            config.entry_points = self.entry_points.clone();
        }
        if let Some(style) = self.edge_style {
            config.edge_style = style;
        }
        if let Some(style) = self.arrow_style {
            config.arrow_style = style;
        }
        if let Some(jumps) = self.line_jumps {
            config.line_jumps = jumps;
        }
        if let Some(size) = self.size_mode {
            config.size_mode = size;
        }
        if self.legend {
            config.legend = true;
        }
        if let Some(max) = self.max_columns {
            config.max_columns_per_lane = max;
        }
        if let Some(theme) = &self.theme {
            config.theme = theme.clone();
        }
        Ok(config)
    }

    fn output_path(&self, kind: EmitterKind) -> PathBuf {
        match kind {
            EmitterKind::StructuralDiagram => self.out_dir.join(&self.drawio_file),
            EmitterKind::FlowText => self.out_dir.join(&self.mermaid_file),
        }
    }
}

/// Runs one analysis. `Ok(false)` means every selected emitter failed.
pub fn run(cli: Cli) -> Result<bool> {
    let config = cli.resolve_config()?;
    let tags = match &cli.data_access {
        Some(path) => load_data_access_tags(path)?,
        None => Vec::new(),
    };

    let engine = DiagramEngine::new(config, Arc::new(FileSourceReader::new()));
    let output = engine.run(&cli.files, tags)?;

    write_documents(&cli, &output)?;

    println!("{}", output.report.summary());
    for failure in &output.report.failed {
        println!("  failed: {failure}");
    }
    for tag in &output.report.unmatched_tags {
        println!(
            "  unmatched tag: {} ({} {})",
            tag.callable, tag.operation, tag.resource
        );
    }
    if !output.report.unresolved.is_empty() {
        println!(
            "  {} unresolved reference(s) drawn as external calls",
            output.report.unresolved.len()
        );
    }
    if cli.report_json {
        println!("{}", serde_json::to_string_pretty(&output.report)?);
    }

    Ok(!output.report.all_emitters_failed())
}

fn write_documents(cli: &Cli, output: &RunOutput) -> Result<()> {
    if output.documents.values().all(Result::is_err) {
        return Ok(());
    }
    create_dir(&cli.out_dir)?;
    for (kind, document) in &output.documents {
        match document {
            Ok(text) => {
                let path = cli.output_path(*kind);
                std::fs::write(&path, text)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                println!("wrote {}", path.display());
            }
            Err(e) => eprintln!("{} skipped: {e}", kind.as_str()),
        }
    }
    Ok(())
}

fn create_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory: {}", dir.display()))
}
