//! Command implementations for the ADO CLI.
//!
//! Each subcommand plays the part of one dashboard page: it loads the
//! static artifacts for an index through an [`view::IndexView`], runs the
//! core pipeline and prints or writes what the page would render.

use ado_cache::timeseries::TimeseriesCache;
use ado_cache::ttl::DEFAULT_TTL;
use ado_core::fetch::{DataFetcher, DEFAULT_BASE_URL};
use ado_core::index::DroughtIndex;
use ado_timeline::speed::PlaybackSpeed;
use ado_utils::dates::to_day_index;
use anyhow::Context;
use clap::{Args, Subcommand};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::time::Duration;

use crate::view::IndexView;

pub mod map;
pub mod panel;
pub mod play;
pub mod raster;
pub mod tiles;
pub mod view;

/// Where the static artifacts live and how long responses are cached.
#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    /// Root URL of the published NUTS artifacts
    #[arg(long, default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Lifetime of cached region/station responses, in seconds
    #[arg(long, default_value_t = DEFAULT_TTL.as_secs())]
    pub ttl_secs: u64,
}

impl SourceArgs {
    pub fn fetcher(&self) -> anyhow::Result<DataFetcher> {
        Ok(DataFetcher::new(&self.base_url)?)
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

/// Load an index view from the data repository, failing when the index
/// data is unavailable.
pub async fn open_view(
    source: &SourceArgs,
    index: &str,
    day: Option<&str>,
) -> anyhow::Result<IndexView<DataFetcher>> {
    let index: DroughtIndex = index.parse()?;
    let requested = day.map(to_day_index).transpose()?;
    let mut view =
        IndexView::new(source.fetcher()?, TimeseriesCache::new(), index).with_ttl(source.ttl());
    view.load(requested).await;
    if let Some(message) = view.state().error() {
        anyhow::bail!("Data unavailable for {}: {}", view.index(), message);
    }
    Ok(view)
}

/// A file when a path is given, stdout otherwise.
pub fn output_writer(path: Option<&str>) -> anyhow::Result<Box<dyn Write>> {
    Ok(match path {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("Failed to create {}", path))?,
        )),
        None => Box::new(io::stdout().lock()),
    })
}

#[derive(Subcommand)]
pub enum Command {
    /// Join the values of one day onto the index's features and write GeoJSON
    Snapshot {
        #[command(flatten)]
        source: SourceArgs,

        /// Drought index id, e.g. spei-1 or vhi
        #[arg(short, long)]
        index: String,

        /// Day to show (YYYY-MM-DD); out-of-range days are corrected. Defaults to the last day
        #[arg(short, long)]
        day: Option<String>,

        /// Output path for the joined FeatureCollection (stdout when omitted)
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Fetch a NUTS3 region's timeseries and write it as chart rows CSV
    Timeseries {
        #[command(flatten)]
        source: SourceArgs,

        #[arg(short, long)]
        index: String,

        /// NUTS3 region id, e.g. ITC11
        #[arg(short, long)]
        region: String,

        /// Only keep the most recent N days of the index's range
        #[arg(long)]
        last_days: Option<i64>,

        /// Output path for the CSV (stdout when omitted)
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Fetch a gauging station's timeseries and HTML report
    Station {
        #[command(flatten)]
        source: SourceArgs,

        #[arg(short, long)]
        index: String,

        /// Station id
        #[arg(short, long)]
        station: String,

        /// Output path for the chart rows CSV (stdout when omitted)
        #[arg(short, long)]
        output: Option<String>,

        /// Output path for the HTML report
        #[arg(long)]
        report: Option<String>,
    },

    /// Print the legend band for a value
    Legend {
        #[command(flatten)]
        source: SourceArgs,

        #[arg(short, long)]
        index: String,

        #[arg(allow_negative_numbers = true)]
        value: f64,
    },

    /// Auto-play the timeline, printing every day shown
    Play {
        #[command(flatten)]
        source: SourceArgs,

        #[arg(short, long)]
        index: String,

        /// Day to start from (YYYY-MM-DD). Defaults to the last day
        #[arg(short, long)]
        day: Option<String>,

        /// Playback speed: 0.5x, 1x, 2x or 4x
        #[arg(long, default_value_t = PlaybackSpeed::Normal)]
        speed: PlaybackSpeed,

        /// Number of auto-play steps before stopping
        #[arg(long, default_value_t = 10)]
        ticks: usize,

        /// Restrict playback to the most recent N days
        #[arg(long)]
        last_days: Option<i64>,
    },

    /// Load the weekly high-resolution tile for a day and prefetch its neighbours
    Tiles {
        /// Root URL of the weekly rasters
        #[arg(long, default_value = raster::DEFAULT_RASTER_URL)]
        raster_url: String,

        #[arg(short, long)]
        index: String,

        /// Any day of the wanted ISO week (YYYY-MM-DD)
        #[arg(short, long)]
        day: String,
    },
}

pub async fn run(command: Command) -> anyhow::Result<()> {
    match command {
        Command::Snapshot {
            source,
            index,
            day,
            output,
        } => map::run_snapshot(&source, &index, day.as_deref(), output.as_deref()).await,
        Command::Timeseries {
            source,
            index,
            region,
            last_days,
            output,
        } => {
            panel::run_timeseries(&source, &index, &region, last_days, output.as_deref()).await
        }
        Command::Station {
            source,
            index,
            station,
            output,
            report,
        } => {
            panel::run_station(&source, &index, &station, output.as_deref(), report.as_deref())
                .await
        }
        Command::Legend {
            source,
            index,
            value,
        } => map::run_legend(&source, &index, value).await,
        Command::Play {
            source,
            index,
            day,
            speed,
            ticks,
            last_days,
        } => play::run_play(&source, &index, day.as_deref(), speed, ticks, last_days).await,
        Command::Tiles {
            raster_url,
            index,
            day,
        } => tiles::run_tiles(&raster_url, &index, &day).await,
    }
}
