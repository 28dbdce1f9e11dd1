// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::error::Error;
use std::fs::File;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand, ValueEnum};
use overroute::{osm, overpass, snapshot, Coordinate, Graph, KDTree};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("{0}: {1}")]
    Osm(PathBuf, #[source] osm::Error),

    #[error("{0}: {1}")]
    Snapshot(PathBuf, #[source] snapshot::Error),

    #[error("bounding box needs exactly 4 values, got {0}")]
    InvalidBbox(usize),
}

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Increase logging verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Find the shortest route between two positions and print it as GeoJSON
    Route(RouteArgs),

    /// Build a graph and save it as a snapshot
    Snapshot(SnapshotArgs),

    /// Print an Overpass QL query requesting the road network of an area
    Query(QueryArgs),
}

#[derive(Args)]
struct InputArgs {
    /// Path to the input file (Overpass JSON, OSM XML or a snapshot)
    input: PathBuf,

    /// Format of the input file
    #[arg(long, value_enum, default_value_t = InputFormat::Auto)]
    format: InputFormat,

    /// Only load data within "min_lon,min_lat,max_lon,max_lat"
    #[arg(long, value_delimiter = ',', allow_negative_numbers = true)]
    bbox: Option<Vec<f64>>,
}

#[derive(Args)]
struct RouteArgs {
    #[command(flatten)]
    input: InputArgs,

    /// Latitude of the start point
    #[arg(allow_negative_numbers = true)]
    start_lat: f64,

    /// Longitude of the start point
    #[arg(allow_negative_numbers = true)]
    start_lon: f64,

    /// Latitude of the end point
    #[arg(allow_negative_numbers = true)]
    end_lat: f64,

    /// Longitude of the end point
    #[arg(allow_negative_numbers = true)]
    end_lon: f64,

    /// Snap positions with a k-d tree instead of a linear scan
    #[arg(long)]
    kd_tree: bool,

    /// Maximum number of nodes to expand before giving up
    #[arg(long, default_value_t = overroute::DEFAULT_STEP_LIMIT)]
    step_limit: usize,
}

#[derive(Args)]
struct SnapshotArgs {
    #[command(flatten)]
    input: InputArgs,

    /// Path to the output snapshot
    output: PathBuf,

    /// Compress the snapshot with gzip, regardless of the output extension
    #[arg(long)]
    gzip: bool,
}

#[derive(Args)]
struct QueryArgs {
    /// Area to query, as "min_lon,min_lat,max_lon,max_lat"
    #[arg(long, value_delimiter = ',', allow_negative_numbers = true)]
    bbox: Option<Vec<f64>>,

    /// Tag key which returned ways must have
    #[arg(long, default_value = "highway")]
    filter: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum InputFormat {
    Auto,
    Json,
    JsonGz,
    JsonBz2,
    Xml,
    XmlGz,
    XmlBz2,
    Snapshot,
    SnapshotGz,
}

pub fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    colog::default_builder()
        .filter_level(match cli.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        })
        .init();

    match cli.command {
        Command::Route(args) => route(args),
        Command::Snapshot(args) => write_snapshot(args),
        Command::Query(args) => query(args),
    }
}

fn route(args: RouteArgs) -> Result<(), Box<dyn Error>> {
    let g = load_graph(&args.input)?;
    let start = Coordinate::new(args.start_lat, args.start_lon);
    let end = Coordinate::new(args.end_lat, args.end_lon);

    let route = if args.kd_tree {
        let tree = KDTree::from_graph(&g)?;
        overroute::plan_route(&g, &tree, start, end, args.step_limit)?
    } else {
        overroute::plan_route(&g, &g, start, end, args.step_limit)?
    };

    println!("{}", serde_json::to_string_pretty(&route.to_geojson())?);
    Ok(())
}

fn write_snapshot(args: SnapshotArgs) -> Result<(), Box<dyn Error>> {
    let g = load_graph(&args.input)?;
    let format = if args.gzip {
        snapshot::SnapshotFormat::JsonGz
    } else {
        snapshot::SnapshotFormat::from_path(&args.output)
    };

    log::info!(
        "writing {} nodes and {} edges to {}",
        g.len(),
        g.edge_count(),
        args.output.display()
    );
    let f = File::create(&args.output)?;
    snapshot::dump(&g, format, f).map_err(|e| CliError::Snapshot(args.output.clone(), e))?;
    Ok(())
}

fn query(args: QueryArgs) -> Result<(), Box<dyn Error>> {
    let bbox = match args.bbox {
        Some(values) => parse_bbox(&values)?,
        None => overpass::DEFAULT_BBOX,
    };
    let q = overpass::Query {
        bbox,
        way_filter: args.filter,
    };
    println!("{}", q);
    Ok(())
}

fn load_graph(args: &InputArgs) -> Result<Graph, Box<dyn Error>> {
    let bbox = match &args.bbox {
        Some(values) => parse_bbox(values)?,
        None => [0.0; 4],
    };

    let file_format = match args.format {
        InputFormat::Snapshot => {
            return Ok(load_snapshot(&args.input, snapshot::SnapshotFormat::Json)?);
        }
        InputFormat::SnapshotGz => {
            return Ok(load_snapshot(&args.input, snapshot::SnapshotFormat::JsonGz)?);
        }
        InputFormat::Auto => osm::FileFormat::Unknown,
        InputFormat::Json => osm::FileFormat::Json,
        InputFormat::JsonGz => osm::FileFormat::JsonGz,
        InputFormat::JsonBz2 => osm::FileFormat::JsonBz2,
        InputFormat::Xml => osm::FileFormat::Xml,
        InputFormat::XmlGz => osm::FileFormat::XmlGz,
        InputFormat::XmlBz2 => osm::FileFormat::XmlBz2,
    };

    let options = osm::Options { file_format, bbox };
    let g = osm::graph_from_file(&options, &args.input)
        .map_err(|e| CliError::Osm(args.input.clone(), e))?;
    log::info!("loaded {} nodes and {} edges", g.len(), g.edge_count());
    Ok(g)
}

fn load_snapshot(path: &Path, format: snapshot::SnapshotFormat) -> Result<Graph, CliError> {
    log::info!("loading snapshot {}", path.display());
    let f = File::open(path).map_err(|e| CliError::Snapshot(path.to_path_buf(), e.into()))?;
    snapshot::load(format, f).map_err(|e| CliError::Snapshot(path.to_path_buf(), e))
}

fn parse_bbox(values: &[f64]) -> Result<[f64; 4], CliError> {
    values
        .try_into()
        .map_err(|_| CliError::InvalidBbox(values.len()))
}
