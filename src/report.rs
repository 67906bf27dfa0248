use crate::experiment::Row;
use crate::hierarchy::Level;
use itertools::Itertools;
use std::io::Write;

pub const HEADER: &str =
    "# Experimental Results | Cache Hit Rates | Configuration | L1 I-Cache | L1 D-Cache | L2 Cache";

fn format_rate(rate: Option<f64>) -> String {
    match rate {
        Some(rate) => format!("{rate:.1}%"),
        None => "n/a".to_string(),
    }
}

/// Formats the result line of one configuration.
#[must_use]
pub fn format_row(row: &Row) -> String {
    let rates = [Level::L1I, Level::L1D, Level::L2]
        .into_iter()
        .map(|level| format_rate(row.hit_rate_percent(level)))
        .join(" | ");
    format!("{} | {rates}", row.name)
}

/// Writes the hit rate report, one line per configuration.
pub fn write_report(mut writer: impl Write, rows: &[Row]) -> std::io::Result<()> {
    writeln!(writer, "{HEADER}")?;
    for row in rows {
        writeln!(writer, "{}", format_row(row))?;
    }
    writer.flush()
}

#[derive(serde::Serialize)]
struct StatsEntry<'a> {
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    stats: Option<&'a stats::Stats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Writes the full statistics of every configuration as JSON.
pub fn write_stats_json(writer: impl Write, rows: &[Row]) -> serde_json::Result<()> {
    let entries: Vec<StatsEntry> = rows
        .iter()
        .map(|row| StatsEntry {
            name: &row.name,
            stats: row.result.as_ref().ok(),
            error: row.result.as_ref().err().map(ToString::to_string),
        })
        .collect();
    serde_json::to_writer_pretty(writer, &entries)
}

#[cfg(test)]
mod tests {
    use super::{format_row, write_report, write_stats_json, HEADER};
    use crate::config;
    use crate::experiment::Row;
    use color_eyre::eyre;
    use pretty_assertions_sorted as diff;

    fn row(name: &str, rates: [f64; 3]) -> Row {
        let mut stats = stats::Stats::default();
        for (level, hit_rate) in ["L1I", "L1D", "L2"].into_iter().zip(rates) {
            stats.caches.0.insert(
                level.to_string(),
                stats::Summary {
                    hit_rate,
                    ..stats::Summary::default()
                },
            );
        }
        Row {
            name: name.to_string(),
            result: Ok(stats),
        }
    }

    fn failed(name: &str) -> Row {
        Row {
            name: name.to_string(),
            result: Err(config::Error::InvalidConfig {
                level: "L2".to_string(),
                source: config::Invalid::Zero("associativity"),
            }),
        }
    }

    #[test]
    fn test_format_row() {
        assert_eq!(
            format_row(&row("Baseline", [0.9876, 0.5, 0.0])),
            "Baseline | 98.8% | 50.0% | 0.0%"
        );
        assert_eq!(format_row(&failed("Broken")), "Broken | n/a | n/a | n/a");
    }

    #[test]
    fn test_write_report() -> eyre::Result<()> {
        let mut out = Vec::new();
        write_report(
            &mut out,
            &[row("Baseline", [1.0, 0.25, 0.125]), failed("Broken")],
        )?;
        diff::assert_eq!(
            String::from_utf8(out)?,
            format!("{HEADER}\nBaseline | 100.0% | 25.0% | 12.5%\nBroken | n/a | n/a | n/a\n")
        );
        Ok(())
    }

    #[test]
    fn test_write_stats_json() -> eyre::Result<()> {
        let mut out = Vec::new();
        write_stats_json(&mut out, &[row("Baseline", [1.0, 0.5, 0.0]), failed("Broken")])?;
        let json: serde_json::Value = serde_json::from_slice(&out)?;
        assert_eq!(json[0]["name"], "Baseline");
        assert_eq!(json[0]["stats"]["caches"]["L1D"]["hit_rate"], 0.5);
        assert_eq!(json[1]["name"], "Broken");
        assert_eq!(
            json[1]["error"],
            "invalid L2 cache config: associativity must be non-zero"
        );
        Ok(())
    }
}
