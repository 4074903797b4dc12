//! Inline SVG chart of closes normalized to 100.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;

use sectorlab_core::schema::{TableRow, DATE_FORMAT};

use super::report::escape_html;

const WIDTH: f64 = 800.0;
const HEIGHT: f64 = 360.0;
const MARGIN: f64 = 40.0;

const PALETTE: [&str; 10] = [
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
    "#bcbd22", "#17becf",
];

/// One instrument's normalized line.
#[derive(Debug)]
struct Series<'a> {
    label: &'a str,
    /// (index into the date axis, normalized close)
    points: Vec<(usize, f64)>,
}

/// Normalize each instrument's closes over the last `days` dates.
///
/// The base of each line is its close on the first date of the window, or
/// on its first date inside the window when it has no row for that day.
fn normalized_series(rows: &[TableRow], days: usize) -> (Vec<NaiveDate>, Vec<Series<'_>>) {
    let all_dates: BTreeSet<NaiveDate> = rows.iter().map(|r| r.date).collect();
    let skip = all_dates.len().saturating_sub(days);
    let dates: Vec<NaiveDate> = all_dates.into_iter().skip(skip).collect();
    let Some(&first) = dates.first() else {
        return (dates, Vec::new());
    };

    let mut by_instrument: BTreeMap<&str, (&str, BTreeMap<NaiveDate, f64>)> = BTreeMap::new();
    for row in rows.iter().filter(|r| r.date >= first) {
        by_instrument
            .entry(row.instrument_id.as_str())
            .or_insert_with(|| (row.sector_label.as_str(), BTreeMap::new()))
            .1
            .entry(row.date)
            .or_insert(row.close);
    }

    let series = by_instrument
        .into_values()
        .filter_map(|(label, closes)| {
            let base = *closes.values().next()?;
            let points = dates
                .iter()
                .enumerate()
                .filter_map(|(i, d)| closes.get(d).map(|c| (i, c / base * 100.0)))
                .collect();
            Some(Series { label, points })
        })
        .collect();
    (dates, series)
}

/// Render the chart, or `None` when fewer than two dates are available.
pub(crate) fn render_chart(rows: &[TableRow], days: usize) -> Option<String> {
    let (dates, series) = normalized_series(rows, days);
    if dates.len() < 2 || series.is_empty() {
        return None;
    }

    let values = series.iter().flat_map(|s| s.points.iter().map(|(_, v)| *v));
    let (mut lo, mut hi) = values.fold((100.0f64, 100.0f64), |(lo, hi), v| (lo.min(v), hi.max(v)));
    let pad = ((hi - lo) * 0.05).max(0.5);
    lo -= pad;
    hi += pad;

    let plot_w = WIDTH - 2.0 * MARGIN;
    let plot_h = HEIGHT - 2.0 * MARGIN;
    let x = |i: usize| MARGIN + plot_w * i as f64 / (dates.len() - 1) as f64;
    let y = |v: f64| MARGIN + plot_h * (hi - v) / (hi - lo);

    let mut svg = format!(
        "<figure class=\"sector-chart\">\n<svg xmlns=\"http://www.w3.org/2000/svg\" \
         viewBox=\"0 0 {WIDTH} {HEIGHT}\" width=\"100%\" role=\"img\">\n"
    );
    svg.push_str(&format!(
        "<line x1=\"{MARGIN}\" y1=\"{0:.1}\" x2=\"{1}\" y2=\"{0:.1}\" stroke=\"#999\" \
         stroke-dasharray=\"4 4\"/>\n",
        y(100.0),
        WIDTH - MARGIN,
    ));
    svg.push_str(&format!(
        "<text x=\"4\" y=\"{:.1}\" font-size=\"11\">{hi:.1}</text>\n\
         <text x=\"4\" y=\"{:.1}\" font-size=\"11\">{lo:.1}</text>\n",
        MARGIN + 4.0,
        HEIGHT - MARGIN,
    ));
    if let (Some(start), Some(end)) = (dates.first(), dates.last()) {
        svg.push_str(&format!(
            "<text x=\"{MARGIN}\" y=\"{0:.1}\" font-size=\"11\">{1}</text>\n\
             <text x=\"{2:.1}\" y=\"{0:.1}\" font-size=\"11\" text-anchor=\"end\">{3}</text>\n",
            HEIGHT - 12.0,
            start.format(DATE_FORMAT),
            WIDTH - MARGIN,
            end.format(DATE_FORMAT),
        ));
    }

    let mut legend = String::from("<ul class=\"sector-chart-legend\">\n");
    for (n, s) in series.iter().enumerate() {
        let color = PALETTE[n % PALETTE.len()];
        let label = escape_html(s.label);
        let points: Vec<String> = s
            .points
            .iter()
            .map(|&(i, v)| format!("{:.1},{:.1}", x(i), y(v)))
            .collect();
        svg.push_str(&format!(
            "<polyline fill=\"none\" stroke=\"{color}\" stroke-width=\"1.5\" points=\"{}\">\
             <title>{label}</title></polyline>\n",
            points.join(" ")
        ));
        legend.push_str(&format!(
            "<li><span style=\"color: {color};\">&#9632;</span> {label}</li>\n"
        ));
    }
    svg.push_str("</svg>\n");
    legend.push_str("</ul>\n");
    svg.push_str(&legend);
    svg.push_str("</figure>\n");
    Some(svg)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(code: &str, day: u32, close: f64) -> TableRow {
        TableRow {
            instrument_id: code.to_string(),
            sector_label: format!("Sector {code}"),
            date: NaiveDate::from_ymd_opt(2024, 5, day).unwrap(),
            close,
            change_pct: 0.0,
            deviation_short: 0.0,
            deviation_mid: 0.0,
            deviation_long: 0.0,
            rsi: 50.0,
            bollinger_pct_b: 0.5,
            volume_ratio: 1.0,
            computed_at: NaiveDate::from_ymd_opt(2024, 5, 31)
                .unwrap()
                .and_hms_opt(18, 0, 0)
                .unwrap(),
        }
    }

    #[test]
    fn normalizes_to_first_date() {
        let rows = vec![
            row("1617", 1, 200.0),
            row("1617", 2, 250.0),
            row("1618", 1, 64.0),
            row("1618", 2, 48.0),
        ];
        let (dates, series) = normalized_series(&rows, 60);
        assert_eq!(dates.len(), 2);
        assert_eq!(series[0].points, vec![(0, 100.0), (1, 125.0)]);
        assert_eq!(series[1].points, vec![(0, 100.0), (1, 75.0)]);
    }

    #[test]
    fn window_keeps_most_recent_dates() {
        let rows: Vec<TableRow> = (1..=10).map(|d| row("1617", d, 100.0 + d as f64)).collect();
        let (dates, series) = normalized_series(&rows, 3);
        assert_eq!(dates.len(), 3);
        assert_eq!(dates[0], NaiveDate::from_ymd_opt(2024, 5, 8).unwrap());
        assert_eq!(series[0].points[0], (0, 100.0));
    }

    #[test]
    fn late_instrument_uses_own_first_close() {
        let rows = vec![
            row("1617", 1, 100.0),
            row("1617", 2, 100.0),
            row("1618", 2, 80.0),
        ];
        let (_, series) = normalized_series(&rows, 60);
        assert_eq!(series[1].points, vec![(1, 100.0)]);
    }

    #[test]
    fn single_date_has_no_chart() {
        assert!(render_chart(&[row("1617", 1, 100.0)], 60).is_none());
    }

    #[test]
    fn one_polyline_and_legend_entry_per_instrument() {
        let rows = vec![
            row("1617", 1, 100.0),
            row("1617", 2, 101.0),
            row("1618", 1, 100.0),
            row("1618", 2, 99.0),
        ];
        let svg = render_chart(&rows, 60).unwrap();
        assert_eq!(svg.matches("<polyline").count(), 2);
        assert_eq!(svg.matches("<li>").count(), 2);
        assert!(svg.contains("Sector 1618"));
        assert!(svg.contains("2024-05-01"));
        assert!(svg.contains("2024-05-02"));
    }
}
