//! HTML report generator.

use std::collections::BTreeMap;

use sectorlab_core::schema::{TableRow, TIMESTAMP_FORMAT};

use super::chart::render_chart;
use crate::config::ReportConfig;
use crate::merge::sort_rows;

const EMPTY_REPORT: &str = "<p>No data available.</p>";

/// Escape text for use in HTML content and attribute values.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Short BLAKE3 digest of the table content, independent of row order.
pub fn snapshot_id(rows: &[TableRow]) -> String {
    let mut hasher = blake3::Hasher::new();
    for row in sort_rows(rows.to_vec()) {
        for cell in row.to_cells() {
            hasher.update(cell.as_bytes());
            hasher.update(&[0x1f]);
        }
        hasher.update(b"\n");
    }
    hasher.finalize().to_hex().as_str()[..16].to_string()
}

/// Latest row per instrument, ordered by instrument code.
fn latest_per_instrument(rows: &[TableRow]) -> Vec<&TableRow> {
    let mut latest: BTreeMap<&str, &TableRow> = BTreeMap::new();
    for row in rows {
        latest
            .entry(row.instrument_id.as_str())
            .and_modify(|current| {
                if row.date > current.date {
                    *current = row;
                }
            })
            .or_insert(row);
    }
    latest.into_values().collect()
}

fn summary_row(row: &TableRow) -> String {
    let change_color = if row.change_pct > 0.0 { "red" } else { "blue" };
    let pct_b = if row.bollinger_pct_b > 1.0 {
        format!("<strong style=\"color: red;\">{:.2}</strong>", row.bollinger_pct_b)
    } else if row.bollinger_pct_b < 0.0 {
        format!("<strong style=\"color: blue;\">{:.2}</strong>", row.bollinger_pct_b)
    } else {
        format!("{:.2}", row.bollinger_pct_b)
    };
    format!(
        "<tr><td>{}</td><td>{:.1}</td><td style=\"color: {change_color};\">{:.2}%</td>\
         <td>{:.2}%</td><td>{:.1}</td><td>{pct_b}</td></tr>\n",
        escape_html(&row.sector_label),
        row.close,
        row.change_pct,
        row.deviation_short,
        row.rsi,
    )
}

/// Render the dashboard page body for the stored rows.
pub fn render_report(rows: &[TableRow], config: &ReportConfig) -> String {
    let Some(newest) = rows.iter().map(|r| r.computed_at).max() else {
        return EMPTY_REPORT.to_string();
    };

    let mut html = format!("<h2>{}</h2>\n", escape_html(&config.title));
    html.push_str(&format!(
        "<p>Last updated: {}</p>\n",
        newest.format(TIMESTAMP_FORMAT)
    ));

    html.push_str("<figure class=\"wp-block-table\"><table>\n");
    html.push_str(
        "<thead><tr><th>Sector</th><th>Close</th><th>Change</th>\
         <th>Short deviation</th><th>RSI</th><th>%B</th></tr></thead>\n<tbody>\n",
    );
    for row in latest_per_instrument(rows) {
        html.push_str(&summary_row(row));
    }
    html.push_str("</tbody></table></figure>\n");

    if let Some(chart) = render_chart(rows, config.chart_days) {
        html.push_str(&chart);
    }

    html.push_str(&format!(
        "<p><small>{}</small></p>\n",
        escape_html(&config.footer)
    ));
    html.push_str(&format!("<!-- snapshot {} -->\n", snapshot_id(rows)));
    html
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};

    fn stamp(hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 3)
            .unwrap()
            .and_hms_opt(hour, 30, 0)
            .unwrap()
    }

    fn row(code: &str, label: &str, day: u32, close: f64) -> TableRow {
        TableRow {
            instrument_id: code.to_string(),
            sector_label: label.to_string(),
            date: NaiveDate::from_ymd_opt(2024, 6, day).unwrap(),
            close,
            change_pct: -0.25,
            deviation_short: 1.5,
            deviation_mid: 2.0,
            deviation_long: 3.0,
            rsi: 48.2,
            bollinger_pct_b: 0.5,
            volume_ratio: 1.0,
            computed_at: stamp(18),
        }
    }

    #[test]
    fn empty_table_placeholder() {
        assert_eq!(render_report(&[], &ReportConfig::default()), EMPTY_REPORT);
    }

    #[test]
    fn escapes_markup() {
        assert_eq!(
            escape_html(r#"<b>"R&D" 'x'</b>"#),
            "&lt;b&gt;&quot;R&amp;D&quot; &#39;x&#39;&lt;/b&gt;"
        );
    }

    #[test]
    fn last_updated_is_newest_run() {
        let mut older = row("1617", "Foods", 3, 100.0);
        older.computed_at = stamp(9);
        let rows = vec![older, row("1618", "Energy", 3, 200.0)];
        let html = render_report(&rows, &ReportConfig::default());
        assert!(html.contains("<p>Last updated: 2024-06-03 18:30</p>"));
    }

    #[test]
    fn summary_uses_latest_row_per_instrument_in_code_order() {
        let rows = vec![
            row("1618", "Energy", 4, 210.0),
            row("1617", "Foods", 3, 100.0),
            row("1617", "Foods", 4, 101.0),
            row("1618", "Energy", 3, 200.0),
        ];
        let latest = latest_per_instrument(&rows);
        assert_eq!(latest.len(), 2);
        assert_eq!((latest[0].instrument_id.as_str(), latest[0].close), ("1617", 101.0));
        assert_eq!((latest[1].instrument_id.as_str(), latest[1].close), ("1618", 210.0));

        let html = render_report(&rows, &ReportConfig::default());
        let foods = html.find("<td>Foods</td>").unwrap();
        let energy = html.find("<td>Energy</td>").unwrap();
        assert!(foods < energy);
        assert_eq!(html.matches("<td>Foods</td>").count(), 1);
    }

    #[test]
    fn change_and_pct_b_highlighting() {
        let mut up = row("1617", "Foods", 3, 100.0);
        up.change_pct = 1.25;
        up.bollinger_pct_b = 1.08;
        let html = summary_row(&up);
        assert!(html.contains("<td style=\"color: red;\">1.25%</td>"));
        assert!(html.contains("<strong style=\"color: red;\">1.08</strong>"));

        let mut down = row("1617", "Foods", 3, 100.0);
        down.change_pct = 0.0;
        down.bollinger_pct_b = -0.12;
        let html = summary_row(&down);
        assert!(html.contains("<td style=\"color: blue;\">0.00%</td>"));
        assert!(html.contains("<strong style=\"color: blue;\">-0.12</strong>"));

        let plain = summary_row(&row("1617", "Foods", 3, 100.0));
        assert!(plain.contains("<td>0.50</td>"));
    }

    #[test]
    fn labels_are_escaped() {
        let rows = vec![row("1617", "Foods & <Beverages>", 3, 100.0)];
        let html = render_report(&rows, &ReportConfig::default());
        assert!(html.contains("Foods &amp; &lt;Beverages&gt;"));
        assert!(!html.contains("<Beverages>"));
    }

    #[test]
    fn footer_and_snapshot() {
        let rows = vec![row("1617", "Foods", 3, 100.0)];
        let config = ReportConfig {
            footer: "Source: test feed".into(),
            ..ReportConfig::default()
        };
        let html = render_report(&rows, &config);
        assert!(html.contains("<p><small>Source: test feed</small></p>"));
        assert!(html.contains(&format!("<!-- snapshot {} -->", snapshot_id(&rows))));
    }

    #[test]
    fn snapshot_ignores_row_order() {
        let a = row("1617", "Foods", 3, 100.0);
        let b = row("1618", "Energy", 3, 200.0);
        let id = snapshot_id(&[a.clone(), b.clone()]);
        assert_eq!(id, snapshot_id(&[b.clone(), a.clone()]));
        assert_eq!(id.len(), 16);

        let mut changed = b;
        changed.close = 201.0;
        assert_ne!(id, snapshot_id(&[a, changed]));
    }
}
