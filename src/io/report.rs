use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::models::{ReportFilter, Score};

/// Gauge zone of a mean score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SentimentBand {
    /// Below -0.3
    Dissatisfied,
    /// From -0.3 to 0.3 inclusive
    Neutral,
    /// Above 0.3
    Satisfied,
}

impl SentimentBand {
    pub fn from_mean(mean: f64) -> Self {
        if mean < -0.3 {
            SentimentBand::Dissatisfied
        } else if mean <= 0.3 {
            SentimentBand::Neutral
        } else {
            SentimentBand::Satisfied
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SentimentBand::Dissatisfied => Score::Dissatisfied.label(),
            SentimentBand::Neutral => Score::Neutral.label(),
            SentimentBand::Satisfied => Score::Satisfied.label(),
        }
    }
}

/// Overall satisfaction (gauge view)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Gauge {
    pub mean: Option<f64>,
    pub band: Option<SentimentBand>,
    pub responses: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OriginMean {
    pub origin: String,
    pub mean: Option<f64>,
    pub responses: usize,
}

/// One cell of the sector × category heatmap
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeatmapCell {
    pub sector: String,
    pub category: String,
    pub mean: Option<f64>,
}

/// One leaf of the origin → sector → unit hierarchy
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HierarchyNode {
    pub origin: String,
    pub sector: String,
    pub unit: String,
    pub mean: Option<f64>,
    pub responses: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SentimentCount {
    pub label: &'static str,
    pub score: i8,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnitRanking {
    pub unit: String,
    pub mean: Option<f64>,
}

/// All aggregate views over one filtered subset
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardViews {
    pub gauge: Gauge,
    /// Sorted by mean, highest first
    pub by_origin: Vec<OriginMean>,
    pub heatmap: Vec<HeatmapCell>,
    pub hierarchy: Vec<HierarchyNode>,
    /// Satisfeito, Neutro, Insatisfeito
    pub sentiment_distribution: Vec<SentimentCount>,
    pub top_units: Vec<UnitRanking>,
}

/// The report as rendered or exported
#[derive(Debug, Clone, Serialize)]
pub struct DashboardReport {
    pub generated_at: chrono::DateTime<chrono::Utc>,
    pub dataset: String,
    pub filter: ReportFilter,
    /// Rows in the consolidated dataset
    pub total_rows: usize,
    /// Rows without a score, excluded from every view
    pub unscored_rows: usize,
    /// Scored rows passing the filter
    pub filtered_rows: usize,
    pub views: DashboardViews,
}

impl DashboardReport {
    /// Format the report as plain-text tables
    pub fn format(&self) -> String {
        let mut out = String::new();

        section(&mut out, "Satisfaction report", '=');
        out.push_str(&format!("Dataset: {}\n", self.dataset));
        out.push_str(&format!(
            "Generated: {}\n",
            self.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
        ));
        out.push_str(&format!(
            "Responses: {} analysed of {} ({} unscored)\n",
            format_count(self.filtered_rows),
            format_count(self.total_rows),
            format_count(self.unscored_rows)
        ));
        if !self.filter.is_empty() {
            out.push_str(&format!("Filters: {}\n", describe_filter(&self.filter)));
        }
        out.push('\n');

        if self.filtered_rows == 0 {
            out.push_str("No data matches the selected filters.\n");
            return out;
        }

        let views = &self.views;

        section(&mut out, "Overall satisfaction", '-');
        let band = views.gauge.band.map(|b| b.label()).unwrap_or("-");
        out.push_str(&format!(
            "Mean score: {} ({}) over {} responses\n\n",
            format_mean(views.gauge.mean),
            band,
            format_count(views.gauge.responses)
        ));

        section(&mut out, "Mean score by origin", '-');
        for o in &views.by_origin {
            out.push_str(&format!(
                "  {:<32} {:>6}  ({})\n",
                o.origin,
                format_mean(o.mean),
                format_count(o.responses)
            ));
        }
        out.push('\n');

        section(&mut out, "Sentiment distribution", '-');
        for c in &views.sentiment_distribution {
            out.push_str(&format!("  {:<14} {:>8}\n", c.label, format_count(c.count)));
        }
        out.push('\n');

        section(&mut out, "Mean score by sector and category", '-');
        for cell in &views.heatmap {
            out.push_str(&format!(
                "  {:<28} {:<32} {:>6}\n",
                cell.sector,
                cell.category,
                format_mean(cell.mean)
            ));
        }
        out.push('\n');

        section(&mut out, "Origin / sector / unit", '-');
        for node in &views.hierarchy {
            out.push_str(&format!(
                "  {} / {} / {}: {} ({})\n",
                node.origin,
                node.sector,
                node.unit,
                format_mean(node.mean),
                format_count(node.responses)
            ));
        }
        out.push('\n');

        section(&mut out, "Top units by satisfaction", '-');
        for (rank, unit) in views.top_units.iter().enumerate() {
            out.push_str(&format!(
                "  {}. {:<40} {:>6}\n",
                rank + 1,
                unit.unit,
                format_mean(unit.mean)
            ));
        }

        out
    }

    /// Write the report as pretty JSON
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let file = std::fs::File::create(path)
            .with_context(|| format!("Failed to create file: {:?}", path))?;
        serde_json::to_writer_pretty(file, self).context("Failed to write JSON")?;
        Ok(())
    }
}

fn section(out: &mut String, title: &str, underline: char) {
    out.push_str(title);
    out.push('\n');
    out.extend(std::iter::repeat_n(underline, title.chars().count()));
    out.push('\n');
}

fn describe_filter(filter: &ReportFilter) -> String {
    let mut parts = Vec::new();
    for (name, values) in [
        ("origin", &filter.origins),
        ("sector", &filter.sectors),
        ("category", &filter.categories),
    ] {
        if !values.is_empty() {
            parts.push(format!("{} in [{}]", name, values.join(", ")));
        }
    }
    parts.join("; ")
}

/// Two decimals, or `-` when the group has no score
fn format_mean(mean: Option<f64>) -> String {
    mean.map(|m| format!("{:.2}", m)).unwrap_or_else(|| "-".to_string())
}

/// Thousands grouped with dots, as in `12.345`
fn format_count(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push('.');
        }
        out.push(c);
    }
    out
}
