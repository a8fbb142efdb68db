//! Map-level commands: the joined snapshot and legend lookups.

use ado_core::index::DroughtIndex;
use ado_core::source::DataSource;
use ado_data::legend::{format_tooltip, lookup_legend_stop, sort_stops};
use anyhow::anyhow;
use log::info;
use std::io::Write;

use crate::{open_view, output_writer, SourceArgs};

/// Write the FeatureCollection the map would render for one day.
pub async fn run_snapshot(
    source: &SourceArgs,
    index: &str,
    day: Option<&str>,
    output: Option<&str>,
) -> anyhow::Result<()> {
    let view = open_view(source, index, day).await?;
    let joined = view
        .joined()
        .ok_or_else(|| anyhow!("Nothing to show for {}", view.index()))?;

    let with_value = joined
        .features
        .iter()
        .filter(|feature| feature.joined_value().is_some())
        .count();
    info!(
        "{} on {}: {} of {} features have a value",
        view.index(),
        view.date().unwrap_or_default(),
        with_value,
        joined.features.len()
    );

    let mut writer = output_writer(output)?;
    serde_json::to_writer_pretty(&mut writer, joined)?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

/// Print `tooltip<TAB>label<TAB>color` for a value of an index.
pub async fn run_legend(source: &SourceArgs, index: &str, value: f64) -> anyhow::Result<()> {
    let index: DroughtIndex = index.parse()?;
    let metadata = source.fetcher()?.metadata(&index).await?;
    let stops = sort_stops(&metadata.colormap.legend.stops);
    let stop = lookup_legend_stop(value, &stops)
        .ok_or_else(|| anyhow!("{} has no legend stops", index))?;
    println!(
        "{}\t{}\t{}",
        format_tooltip(Some(value), &stops),
        stop.label,
        stop.color
    );
    Ok(())
}
