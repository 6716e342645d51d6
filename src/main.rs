//! layerbake CLI
//!
//! Command-line interface for baking scene materials and inspecting baked
//! bitmaps.

use std::fs::{self, File};
use std::io::BufReader;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use serde_json::json;
use tracing::{info, warn};

use layerbake_core::logging::{self, TracingConfig};
use layerbake_core::Scene;
use layerbake_export::textures::dds::{self, DdsHeader};
use layerbake_export::{ExportOptions, ExportReport, Exporter};
use layerbake_render::{GpuStats, SoftwareGpu};

/// layerbake - bake scene materials into runtime layers and bitmaps
#[derive(Parser)]
#[command(name = "layerbake")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output (-v -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Output format for structured data
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown format: {}", s)),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Export the materials of a scene description
    Export(ExportArgs),

    /// Show information about a baked DDS bitmap
    Info(InfoArgs),
}

#[derive(Args)]
struct ExportArgs {
    /// Scene description (JSON)
    #[arg(short, long)]
    scene: PathBuf,

    /// Output directory
    #[arg(short, long)]
    output: PathBuf,

    /// Record failed materials and keep going
    #[arg(long)]
    continue_on_error: bool,

    /// Do not write bitmap files
    #[arg(long)]
    no_textures: bool,

    /// Do not write manifest.json
    #[arg(long)]
    no_manifest: bool,

    /// Largest texture edge the GPU accepts
    #[arg(long)]
    max_texture_size: Option<u32>,

    /// Page bitmaps are registered in
    #[arg(long, default_value = "Textures")]
    textures_page: String,
}

#[derive(Args)]
struct InfoArgs {
    /// Path to a DDS file
    path: PathBuf,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_with_config(TracingConfig::from_verbosity(cli.verbose));

    match cli.command {
        Commands::Export(args) => cmd_export(args, cli.format),
        Commands::Info(args) => cmd_info(args, cli.format),
    }
}

fn cmd_export(args: ExportArgs, format: OutputFormat) -> Result<()> {
    info!("Loading scene: {:?}", args.scene);
    let mut scene = Scene::load(&args.scene)
        .with_context(|| format!("Failed to load scene {:?}", args.scene))?;

    let gpu = match args.max_texture_size {
        Some(max) => SoftwareGpu::with_max_texture_size(max),
        None => SoftwareGpu::new(),
    };

    let options = ExportOptions {
        output_dir: Some(args.output.clone()),
        write_textures: !args.no_textures,
        write_manifest: !args.no_manifest,
        continue_on_error: args.continue_on_error,
        textures_page: args.textures_page,
        ..Default::default()
    };

    let mut exporter = Exporter::with_options(gpu, options);
    let report = exporter
        .export_scene(&mut scene)
        .with_context(|| format!("Failed to export {:?}", args.scene))?;

    for failure in &report.failures {
        warn!(object = %failure.object, material = %failure.material, "Material skipped: {}", failure.error);
    }

    print_report(&report, &exporter.gpu().stats(), format)
}

fn print_report(report: &ExportReport, stats: &GpuStats, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let output = json!({
                "report": report,
                "gpu": {
                    "uploads": stats.uploads,
                    "frees": stats.frees,
                    "binds": stats.binds,
                    "level_reads": stats.level_reads,
                    "mipmap_generations": stats.mipmap_generations,
                    "respecifications": stats.respecifications,
                },
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Text => {
            println!(
                "Exported {} materials ({} layers, {} bitmaps)",
                report.materials, report.layers, report.bitmaps
            );
            println!("  Baked:    {}", report.baked);
            println!("  Reused:   {}", report.reused);
            println!("  Uploads:  {}", stats.uploads);
            println!("  Levels:   {}", stats.level_reads);

            if !report.files_written.is_empty() {
                println!("\nFiles:");
                for path in &report.files_written {
                    let size = fs::metadata(path).map(|m| m.len()).unwrap_or(0);
                    println!("  {:>10}  {}", format_size(size), path.display());
                }
            }

            if !report.failures.is_empty() {
                println!("\nFailed:");
                for failure in &report.failures {
                    println!("  {} / {}: {}", failure.object, failure.material, failure.error);
                }
            }
        }
    }

    Ok(())
}

fn cmd_info(args: InfoArgs, format: OutputFormat) -> Result<()> {
    let path = &args.path;

    if !path.exists() {
        bail!("File not found: {:?}", path);
    }

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();
    if ext != "dds" {
        bail!("Not a DDS file: {:?}", path);
    }

    let file = File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    let file_size = file.metadata()?.len();
    let header = dds::read_dds_header(&mut BufReader::new(file))
        .with_context(|| format!("Failed to read DDS header from {:?}", path))?;

    show_dds_info(&header, file_size, format)
}

fn show_dds_info(header: &DdsHeader, file_size: u64, format: OutputFormat) -> Result<()> {
    let pixel_format = match header.dxt_level() {
        Some(dxt) => format!("{:?}", dxt).to_uppercase(),
        None => format!("RGBA{}", header.pixel_format.rgb_bit_count),
    };

    match format {
        OutputFormat::Json => {
            let output = json!({
                "width": header.width,
                "height": header.height,
                "mipmap_count": header.mipmap_count,
                "has_mipmaps": header.has_mipmaps(),
                "format": pixel_format,
                "file_size": file_size,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Text => {
            println!("DDS Bitmap");
            println!("  Size:      {}x{}", header.width, header.height);
            println!("  Levels:    {}", header.mipmap_count.max(1));
            println!("  Format:    {}", pixel_format);
            println!("  File size: {}", format_size(file_size));
        }
    }

    Ok(())
}

fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
