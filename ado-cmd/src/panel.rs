//! Region and station panels written as CSV.

use ado_core::timeseries::ChartRow;
use anyhow::anyhow;
use log::{info, warn};
use std::collections::BTreeSet;
use std::io::Write;

use crate::view::{EntityPanel, LoadState};
use crate::{open_view, output_writer, SourceArgs};

/// `date,<dimension>...` with one row per date. Missing values are empty.
pub fn write_chart_csv<W: Write>(writer: W, rows: &[ChartRow]) -> anyhow::Result<()> {
    let dimensions: BTreeSet<&str> = rows
        .iter()
        .flat_map(|row| row.values.keys().map(String::as_str))
        .collect();

    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(std::iter::once("date").chain(dimensions.iter().copied()))?;
    for row in rows {
        let mut record = vec![row.date.clone()];
        record.extend(dimensions.iter().map(|dimension| {
            row.values
                .get(*dimension)
                .map(|value| value.to_string())
                .unwrap_or_default()
        }));
        csv.write_record(&record)?;
    }
    csv.flush()?;
    Ok(())
}

fn panel_rows<'a>(panel: &'a EntityPanel, what: &str) -> anyhow::Result<&'a [ChartRow]> {
    match &panel.rows {
        LoadState::Ready(rows) => Ok(rows),
        LoadState::Error(message) => Err(anyhow!(
            "Timeseries unavailable for {} {}: {}",
            what,
            panel.entity_id,
            message
        )),
        LoadState::Loading => Err(anyhow!(
            "Timeseries for {} {} still loading",
            what,
            panel.entity_id
        )),
    }
}

pub async fn run_timeseries(
    source: &SourceArgs,
    index: &str,
    region: &str,
    last_days: Option<i64>,
    output: Option<&str>,
) -> anyhow::Result<()> {
    let mut view = open_view(source, index, None).await?;
    if let Some(days) = last_days {
        view.set_window(days);
    }
    let panel = view.select_feature(region).await;
    let rows = panel_rows(panel, "region")?;
    info!("{} rows for region {}", rows.len(), region);
    write_chart_csv(output_writer(output)?, rows)
}

pub async fn run_station(
    source: &SourceArgs,
    index: &str,
    station: &str,
    output: Option<&str>,
    report: Option<&str>,
) -> anyhow::Result<()> {
    let mut view = open_view(source, index, None).await?;
    let panel = view.select_station(station).await;

    match (&panel.report, report) {
        (Some(LoadState::Ready(html)), Some(path)) => {
            std::fs::write(path, html)?;
            info!("Wrote report for station {} to {}", station, path);
        }
        (Some(LoadState::Ready(html)), None) => {
            info!("Report for station {} has {} bytes", station, html.len());
        }
        (Some(LoadState::Error(message)), _) => {
            warn!("Report unavailable for station {}: {}", station, message);
        }
        _ => {}
    }

    let rows = panel_rows(panel, "station")?;
    info!("{} rows for station {}", rows.len(), station);
    write_chart_csv(output_writer(output)?, rows)
}
