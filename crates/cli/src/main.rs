//! Carto CLI - border lines for thematic maps

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use carto_algorithms::borders::{
    all_borders, inner_borders, outer_borders, partition_polygons, BorderParams, IdField,
    LegacyBorderArgs,
};
use carto_algorithms::vector::collection_bounds;
use carto_core::io::{read_geojson, write_geojson};
use carto_core::{AttributeValue, FeatureCollection};
use geo_types::Geometry;

/// Identifiers printed by `carto info` before truncating
const MAX_LISTED_IDS: usize = 50;

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "carto")]
#[command(author, version, about = "Border lines between map regions", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show information about a GeoJSON layer
    Info {
        /// Input GeoJSON file
        input: PathBuf,
    },
    /// Border extraction
    Borders {
        #[command(subcommand)]
        kind: BorderCommands,
    },
}

#[derive(Subcommand)]
enum BorderCommands {
    /// Borders between non-contiguous regions
    Outer(BorderArgs),
    /// Borders shared by touching regions
    Inner(BorderArgs),
    /// Inner and outer borders in one file
    All(BorderArgs),
}

#[derive(Args)]
struct BorderArgs {
    /// Input polygon layer (GeoJSON, projected CRS)
    input: PathBuf,
    /// Output GeoJSON file
    output: PathBuf,
    /// Identifier attribute (default: first attribute)
    #[arg(long, conflicts_with = "id_index")]
    id: Option<String>,
    /// Identifier attribute by position (0-based)
    #[arg(long)]
    id_index: Option<usize>,
    /// Deprecated alias of --id
    #[arg(long, hide = true)]
    spdfid: Option<String>,
    /// Cell size in map units (default: extent / 150)
    #[arg(short, long)]
    resolution: Option<f64>,
    /// Search distance in map units (default: extent / 20)
    #[arg(short, long)]
    width: Option<f64>,
    /// Also write the nearest-region partition polygons to this file
    #[arg(long)]
    dump_partition: Option<PathBuf>,
}

impl BorderArgs {
    fn params(&self) -> BorderParams {
        let mut params = LegacyBorderArgs {
            id: self.id.clone(),
            spdfid: self.spdfid.clone(),
            res: self.resolution,
            width: self.width,
        }
        .normalize();

        if let Some(index) = self.id_index {
            if self.spdfid.is_some() {
                warn!("--spdfid is ignored when --id-index is set");
            }
            params.id_field = IdField::Index(index);
        }
        params
    }
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to set up logging")
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn read_layer(path: &PathBuf) -> Result<FeatureCollection> {
    let pb = spinner("Reading layer...");
    let layer = read_geojson(path)
        .with_context(|| format!("Failed to read layer {}", path.display()))?;
    pb.finish_and_clear();
    info!("Input: {} feature(s), {} attribute(s)", layer.len(), layer.fields.len());
    Ok(layer)
}

fn write_layer(layer: &FeatureCollection, path: &PathBuf) -> Result<()> {
    let pb = spinner("Writing output...");
    write_geojson(layer, path).with_context(|| format!("Failed to write {}", path.display()))?;
    pb.finish_and_clear();
    Ok(())
}

fn done(name: &str, count: usize, path: &PathBuf, elapsed: std::time::Duration) {
    println!("{} ({} segment(s)) saved to: {}", name, count, path.display());
    println!("  Processing time: {:.2?}", elapsed);
}

fn geometry_kind(geom: &Geometry<f64>) -> &'static str {
    match geom {
        Geometry::Point(_) => "Point",
        Geometry::Line(_) => "Line",
        Geometry::LineString(_) => "LineString",
        Geometry::Polygon(_) => "Polygon",
        Geometry::MultiPoint(_) => "MultiPoint",
        Geometry::MultiLineString(_) => "MultiLineString",
        Geometry::MultiPolygon(_) => "MultiPolygon",
        Geometry::GeometryCollection(_) => "GeometryCollection",
        Geometry::Rect(_) => "Rect",
        Geometry::Triangle(_) => "Triangle",
    }
}

/// Non-null values of `field` in first-seen order
fn distinct_values(layer: &FeatureCollection, field: &str) -> Vec<AttributeValue> {
    let mut distinct: Vec<AttributeValue> = Vec::new();
    for value in layer.column(field) {
        if !value.is_null() && !distinct.contains(&value) {
            distinct.push(value);
        }
    }
    distinct
}

fn run_borders(kind: BorderCommands) -> Result<()> {
    let (name, args) = match &kind {
        BorderCommands::Outer(args) => ("Outer borders", args),
        BorderCommands::Inner(args) => ("Inner borders", args),
        BorderCommands::All(args) => ("Borders", args),
    };

    let params = args.params();
    let layer = read_layer(&args.input)?;

    let start = Instant::now();
    let borders = match &kind {
        BorderCommands::Outer(_) => outer_borders(&layer, &params),
        BorderCommands::Inner(_) => inner_borders(&layer, &params),
        BorderCommands::All(_) => all_borders(&layer, &params),
    }
    .context("Failed to extract borders")?;
    let elapsed = start.elapsed();

    write_layer(&borders, &args.output)?;
    done(name, borders.len(), &args.output, elapsed);

    if let Some(path) = &args.dump_partition {
        let partition =
            partition_polygons(&layer, &params).context("Failed to build region partition")?;
        write_layer(&partition, path)?;
        println!("Partition ({} region(s)) saved to: {}", partition.len(), path.display());
    }
    Ok(())
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    match cli.command {
        // ── Info ─────────────────────────────────────────────────────
        Commands::Info { input } => {
            let layer = read_layer(&input)?;

            println!("File: {}", input.display());
            println!("Features: {}", layer.len());
            println!("Attributes: {}", layer.fields.join(", "));
            match &layer.crs {
                Some(crs) => {
                    let kind = if crs.is_geographic() { "geographic" } else { "projected" };
                    println!("CRS: {} ({})", crs, kind);
                }
                None => println!("CRS: unknown"),
            }
            if let Some(bb) = collection_bounds(&layer) {
                println!(
                    "Bounds: ({:.6}, {:.6}) - ({:.6}, {:.6})",
                    bb.min_x, bb.min_y, bb.max_x, bb.max_y
                );
            }

            match IdField::FirstField.resolve(&layer) {
                Ok(field) => {
                    let ids = distinct_values(&layer, &field);
                    println!("\nIdentifiers ({}): {} distinct", field, ids.len());
                    for id in ids.iter().take(MAX_LISTED_IDS) {
                        println!("  {}", id);
                    }
                    if ids.len() > MAX_LISTED_IDS {
                        println!("  ... and {} more", ids.len() - MAX_LISTED_IDS);
                    }
                }
                Err(e) => warn!("No identifier field: {}", e),
            }

            let mut kinds: BTreeMap<&str, usize> = BTreeMap::new();
            for feature in layer.iter() {
                let kind = feature.geometry.as_ref().map_or("None", geometry_kind);
                *kinds.entry(kind).or_default() += 1;
            }
            println!("\nGeometries:");
            for (kind, count) in kinds {
                println!("  {}: {}", kind, count);
            }
        }

        // ── Borders ──────────────────────────────────────────────────
        Commands::Borders { kind } => run_borders(kind)?,
    }

    Ok(())
}
