use clap::{Parser, Subcommand};
use survey_gis::geodesy::{DatumShift, DisplacementGrid, HelmertParams};
use survey_gis::io::gpx::{
    read_gpx, shift_waypoints_to_itrf, shift_waypoints_to_nad83, write_gpx,
};
use survey_gis::io::pnezd::{read_pnezd, write_pnezd};
use survey_gis::io::{read_to_string, write_string};
use survey_gis::query::{build_query_plan, parse_search};
use survey_gis::traverse::process_line_data;
use survey_gis::{Crs, LinearUnit, TransformError};

use std::path::{Path, PathBuf};

/// Collection epoch assumed when none is given, matching current NGS
/// CORS processing.
const DEFAULT_EPOCH: f64 = 2019.50;

#[derive(Parser)]
#[command(about = "Survey map archive tools: datum shifts, point formats, \
                   search queries and traverse listings")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert GPX waypoints to a projected PNEZD point file.
    GpxToPnezd {
        input: String,
        output: String,
        /// EPSG code of the target projected coordinate system.
        #[arg(long)]
        epsg: u32,
        /// Linear unit of the target system: m, us-ft or ift.
        #[arg(long, default_value = "us-ft", value_parser = parse_unit)]
        unit: LinearUnit,
        /// Shift positions from ITRF2008/WGS84 to NAD83 using the
        /// displacement grid.
        #[arg(long, requires = "dims")]
        grid: Option<PathBuf>,
        #[arg(long, requires = "grid")]
        dims: Option<PathBuf>,
        /// GPS collection epoch in decimal years.
        #[arg(long, default_value_t = DEFAULT_EPOCH)]
        epoch: f64,
    },
    /// Convert a projected PNEZD point file to GPX waypoints.
    PnezdToGpx {
        input: String,
        output: String,
        /// EPSG code of the source projected coordinate system.
        #[arg(long)]
        epsg: u32,
        /// Linear unit of the source system: m, us-ft or ift.
        #[arg(long, default_value = "us-ft", value_parser = parse_unit)]
        unit: LinearUnit,
        /// Shift positions from NAD83 back to ITRF2008/WGS84 using the
        /// displacement grid.
        #[arg(long, requires = "dims")]
        grid: Option<PathBuf>,
        #[arg(long, requires = "grid")]
        dims: Option<PathBuf>,
        /// GPS collection epoch in decimal years.
        #[arg(long, default_value_t = DEFAULT_EPOCH)]
        epoch: f64,
    },
    /// Build a binary displacement grid from an NGS HTDP listing.
    MakeGrid {
        listing: String,
        grid: PathBuf,
        dims: PathBuf,
        /// Site-name prefix on the listing's data rows.
        #[arg(long, default_value = "2019.50")]
        site: String,
    },
    /// Parse an archive search query and print its plan as JSON.
    Query { query: String },
    /// Run a line-traverse program and print the listing.
    Traverse {
        input: String,
        /// Write the listing here instead of stdout.
        output: Option<String>,
    },
}

fn parse_unit(text: &str) -> Result<LinearUnit, String> {
    match text {
        "m" | "meter" => Ok(LinearUnit::Meter),
        "us-ft" | "usft" => Ok(LinearUnit::UsSurveyFoot),
        "ift" | "ft" => Ok(LinearUnit::InternationalFoot),
        _ => Err(format!("unknown unit: {text} (expected m, us-ft or ift)")),
    }
}

fn load_shift(grid: &Path, dims: &Path) -> Result<DatumShift, TransformError> {
    let grid = DisplacementGrid::load(grid, dims)?;
    Ok(DatumShift::new(HelmertParams::itrf2008_nad83_2010(), grid))
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    match cli.command {
        Commands::GpxToPnezd {
            input,
            output,
            epsg,
            unit,
            grid,
            dims,
            epoch,
        } => {
            let text = match read_to_string(&input) {
                Ok(t) => t,
                Err(e) => return eprintln!("Error reading {}: {}", input, e),
            };
            let mut pts = match read_gpx(&text) {
                Ok(pts) => pts,
                Err(e) => return eprintln!("Error reading {}: {}", input, e),
            };
            if let (Some(grid), Some(dims)) = (grid, dims) {
                let shift = match load_shift(&grid, &dims) {
                    Ok(s) => s,
                    Err(e) => return eprintln!("Error loading grid: {}", e),
                };
                if let Err(e) = shift_waypoints_to_nad83(&mut pts, &shift, epoch) {
                    return eprintln!("Error shifting to NAD83: {}", e);
                }
            }
            let crs = Crs::from_epsg(epsg).with_unit(unit);
            if let Err(e) = survey_gis::crs::geographic_to_projected(&mut pts, &crs) {
                return eprintln!("Error projecting points: {}", e);
            }
            match write_string(&output, &write_pnezd(&pts)) {
                Ok(()) => println!("Wrote {} points to {}", pts.len(), output),
                Err(e) => eprintln!("Error writing {}: {}", output, e),
            }
        }

        Commands::PnezdToGpx {
            input,
            output,
            epsg,
            unit,
            grid,
            dims,
            epoch,
        } => {
            let text = match read_to_string(&input) {
                Ok(t) => t,
                Err(e) => return eprintln!("Error reading {}: {}", input, e),
            };
            let mut pts = match read_pnezd(&text) {
                Ok(pts) => pts,
                Err(e) => return eprintln!("Error reading {}: {}", input, e),
            };
            let crs = Crs::from_epsg(epsg).with_unit(unit);
            if let Err(e) = survey_gis::crs::projected_to_geographic(&mut pts, &crs) {
                return eprintln!("Error unprojecting points: {}", e);
            }
            if let (Some(grid), Some(dims)) = (grid, dims) {
                let shift = match load_shift(&grid, &dims) {
                    Ok(s) => s,
                    Err(e) => return eprintln!("Error loading grid: {}", e),
                };
                if let Err(e) = shift_waypoints_to_itrf(&mut pts, &shift, epoch) {
                    return eprintln!("Error shifting to ITRF: {}", e);
                }
            }
            match write_string(&output, &write_gpx(&pts)) {
                Ok(()) => println!("Wrote {} points to {}", pts.len(), output),
                Err(e) => eprintln!("Error writing {}: {}", output, e),
            }
        }

        Commands::MakeGrid {
            listing,
            grid,
            dims,
            site,
        } => match DisplacementGrid::from_htdp_listing(Path::new(&listing), &site) {
            Ok(g) => match g.save(&grid, &dims) {
                Ok(()) => {
                    let (lon, lat) = g.shape();
                    println!("Wrote {}x{} grid to {}", lon, lat, grid.display());
                }
                Err(e) => eprintln!("Error writing grid: {}", e),
            },
            Err(e) => eprintln!("Error reading {}: {}", listing, e),
        },

        Commands::Query { query } => match parse_search(&query) {
            Ok(search) => {
                let plan = build_query_plan(&search);
                match serde_json::to_string_pretty(&plan) {
                    Ok(json) => println!("{}", json),
                    Err(e) => eprintln!("Error encoding plan: {}", e),
                }
            }
            Err(e) => eprintln!("{}", e),
        },

        Commands::Traverse { input, output } => {
            let text = match read_to_string(&input) {
                Ok(t) => t,
                Err(e) => return eprintln!("Error reading {}: {}", input, e),
            };
            match process_line_data(&text) {
                Ok(result) => {
                    let listing = result.listing_text();
                    match output {
                        Some(path) => match write_string(&path, &listing) {
                            Ok(()) => println!("Wrote listing to {}", path),
                            Err(e) => eprintln!("Error writing {}: {}", path, e),
                        },
                        None => print!("{}", listing),
                    }
                }
                Err(e) => eprintln!("{}", e),
            }
        }
    }
}
