//! Map colour expressions and legend lookups.
//!
//! Expressions are Mapbox style-spec arrays built as `serde_json::Value`;
//! the map surface treats them as opaque paint data.

use ado_core::feature::{NUTS_ID, VALUE_PROPERTY};
use ado_core::metadata::LegendStop;
use serde_json::{json, Value};
use std::cmp::Ordering;

/// Fill for features with no data.
pub const DEFAULT_COLOR: &str = "#ffffff";

const LOW_COLOR: Rgb = Rgb(247, 251, 255);
const HIGH_COLOR: Rgb = Rgb(8, 48, 107);

/// One `(region id, metric)` row of a vulnerability/impact table.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricRow {
    pub id: String,
    pub metric: Option<f64>,
}

impl MetricRow {
    pub fn new(id: &str, metric: Option<f64>) -> Self {
        MetricRow {
            id: id.to_string(),
            metric,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Rgb(u8, u8, u8);

impl Rgb {
    /// `#rgb` or `#rrggbb`.
    fn parse(css: &str) -> Option<Rgb> {
        let hex = css.trim().strip_prefix('#')?;
        let channel = |s: &str| u8::from_str_radix(s, 16).ok();
        match hex.len() {
            3 => {
                let mut digits = hex.chars().map(|c| c.to_digit(16).map(|d| (d * 17) as u8));
                Some(Rgb(digits.next()??, digits.next()??, digits.next()??))
            }
            6 => Some(Rgb(
                channel(hex.get(0..2)?)?,
                channel(hex.get(2..4)?)?,
                channel(hex.get(4..6)?)?,
            )),
            _ => None,
        }
    }

    fn lerp(self, other: Rgb, t: f64) -> Rgb {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
        Rgb(mix(self.0, other.0), mix(self.1, other.1), mix(self.2, other.2))
    }

    fn to_css(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }
}

/// Stops ascending by numeric threshold. Input order is not trusted.
pub fn sort_stops(stops: &[LegendStop]) -> Vec<LegendStop> {
    let mut sorted = stops.to_vec();
    sorted.sort_by(|a, b| a.threshold.partial_cmp(&b.threshold).unwrap_or(Ordering::Equal));
    sorted
}

fn is_colored(metric: Option<f64>) -> Option<f64> {
    metric.filter(|m| m.is_finite() && *m != 0.0)
}

/// Build `["match", ["get", "NUTS_ID"], id, color, ..., default]`.
///
/// Each row's metric is placed linearly between the first and last legend
/// colours over the metric domain of the table. Rows with a missing or zero
/// metric are left out and fall through to `default_color`. With no
/// colourable rows the expression is just `default_color`.
pub fn build_color_expression(
    rows: &[MetricRow],
    stops: &[LegendStop],
    default_color: &str,
) -> Value {
    let colored: Vec<(&str, f64)> = rows
        .iter()
        .filter_map(|row| is_colored(row.metric).map(|m| (row.id.as_str(), m)))
        .collect();
    if colored.is_empty() {
        return Value::String(default_color.to_string());
    }

    let sorted = sort_stops(stops);
    let low = sorted.first().and_then(|s| Rgb::parse(&s.color)).unwrap_or(LOW_COLOR);
    let high = sorted.last().and_then(|s| Rgb::parse(&s.color)).unwrap_or(HIGH_COLOR);

    let min = colored.iter().map(|(_, m)| *m).fold(f64::INFINITY, f64::min);
    let max = colored.iter().map(|(_, m)| *m).fold(f64::NEG_INFINITY, f64::max);
    let span = max - min;

    let mut expression = vec![json!("match"), json!(["get", NUTS_ID])];
    let mut seen = std::collections::HashSet::new();
    for (id, metric) in colored {
        // match labels must be unique
        if !seen.insert(id) {
            continue;
        }
        let t = if span > 0.0 { (metric - min) / span } else { 0.0 };
        expression.push(json!(id));
        expression.push(json!(low.lerp(high, t).to_css()));
    }
    expression.push(json!(default_color));
    Value::Array(expression)
}

/// Build `["step", ["get", property], c0, t1, c1, ...]` guarded so that
/// non-numeric values render with `default_color`.
pub fn build_step_expression(property: &str, stops: &[LegendStop], default_color: &str) -> Value {
    let sorted = sort_stops(stops);
    let Some((first, rest)) = sorted.split_first() else {
        return Value::String(default_color.to_string());
    };
    let mut step = vec![json!("step"), json!(["get", property]), json!(first.color)];
    for stop in rest {
        step.push(json!(stop.threshold));
        step.push(json!(stop.color));
    }
    json!([
        "case",
        ["==", ["typeof", ["get", property]], "number"],
        Value::Array(step),
        default_color
    ])
}

/// The step expression for the joined `value` property.
pub fn build_value_expression(stops: &[LegendStop]) -> Value {
    build_step_expression(VALUE_PROPERTY, stops, DEFAULT_COLOR)
}

/// The band a value falls in: the highest stop whose threshold is
/// `<= value`; below the first stop the first band is used.
pub fn lookup_legend_stop(value: f64, stops: &[LegendStop]) -> Option<LegendStop> {
    let sorted = sort_stops(stops);
    let first = sorted.first()?.clone();
    Some(
        sorted
            .into_iter()
            .take_while(|stop| stop.threshold <= value)
            .last()
            .unwrap_or(first),
    )
}

pub fn lookup_legend_label(value: f64, stops: &[LegendStop]) -> Option<String> {
    lookup_legend_stop(value, stops).map(|stop| stop.label)
}

/// Tooltip text for a joined value.
pub fn format_tooltip_value(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() => format!("{:.2}", v),
        _ => "No data".to_string(),
    }
}

/// Tooltip text with the legend category appended, e.g. `-1.20 (dry)`.
pub fn format_tooltip(value: Option<f64>, stops: &[LegendStop]) -> String {
    let text = format_tooltip_value(value);
    match value.and_then(|v| lookup_legend_label(v, stops)) {
        Some(label) => format!("{} ({})", text, label),
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stops() -> Vec<LegendStop> {
        vec![
            LegendStop::new(2.0, "wet", "#0000ff"),
            LegendStop::new(-2.0, "dry", "#ff0000"),
            LegendStop::new(0.0, "normal", "#ffffff"),
        ]
    }

    #[test]
    fn test_lookup_boundaries() {
        let stops = stops();
        assert_eq!(lookup_legend_label(-5.0, &stops).as_deref(), Some("dry"));
        assert_eq!(lookup_legend_label(-1.0, &stops).as_deref(), Some("dry"));
        assert_eq!(lookup_legend_label(0.0, &stops).as_deref(), Some("normal"));
        assert_eq!(lookup_legend_label(1.9, &stops).as_deref(), Some("normal"));
        assert_eq!(lookup_legend_label(2.0, &stops).as_deref(), Some("wet"));
        assert_eq!(lookup_legend_label(5.0, &stops).as_deref(), Some("wet"));
    }

    #[test]
    fn test_lookup_without_stops() {
        assert_eq!(lookup_legend_label(1.0, &[]), None);
    }

    #[test]
    fn test_color_expression_interpolates_and_skips_missing() {
        let rows = vec![
            MetricRow::new("ITC1", Some(10.0)),
            MetricRow::new("ITC2", Some(20.0)),
            MetricRow::new("ITC3", None),
            MetricRow::new("ITC4", Some(0.0)),
            MetricRow::new("ITC5", Some(15.0)),
        ];
        let expression = build_color_expression(&rows, &stops(), DEFAULT_COLOR);
        assert_eq!(
            expression,
            json!([
                "match", ["get", "NUTS_ID"],
                "ITC1", "#ff0000",
                "ITC2", "#0000ff",
                "ITC5", "#800080",
                "#ffffff"
            ])
        );
    }

    #[test]
    fn test_color_expression_single_value_domain() {
        let rows = vec![MetricRow::new("AT33", Some(3.0)), MetricRow::new("AT33", Some(4.0))];
        let expression = build_color_expression(&rows, &[], "#cccccc");
        assert_eq!(expression, json!(["match", ["get", "NUTS_ID"], "AT33", "#f7fbff", "#cccccc"]));
    }

    #[test]
    fn test_color_expression_empty_is_default() {
        let rows = vec![MetricRow::new("ITC1", None)];
        assert_eq!(build_color_expression(&rows, &stops(), "#eee"), json!("#eee"));
    }

    #[test]
    fn test_step_expression_sorted() {
        let expression = build_value_expression(&stops());
        assert_eq!(
            expression,
            json!([
                "case",
                ["==", ["typeof", ["get", "value"]], "number"],
                ["step", ["get", "value"], "#ff0000", 0.0, "#ffffff", 2.0, "#0000ff"],
                "#ffffff"
            ])
        );
    }

    #[test]
    fn test_rgb_parse() {
        assert_eq!(Rgb::parse("#fff"), Some(Rgb(255, 255, 255)));
        assert_eq!(Rgb::parse("#2166ac"), Some(Rgb(0x21, 0x66, 0xac)));
        assert_eq!(Rgb::parse("red"), None);
    }

    #[test]
    fn test_tooltip_text() {
        assert_eq!(format_tooltip_value(None), "No data");
        assert_eq!(format_tooltip_value(Some(f64::NAN)), "No data");
        assert_eq!(format_tooltip(Some(-1.2), &stops()), "-1.20 (dry)");
        assert_eq!(format_tooltip(None, &stops()), "No data");
    }
}
