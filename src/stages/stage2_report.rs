use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Result;
use tracing::{debug, info};

use crate::io::{
    read_consolidated, DashboardReport, DashboardViews, Gauge, HeatmapCell, HierarchyNode,
    OriginMean, SentimentBand, SentimentCount, UnitRanking,
};
use crate::models::{CanonicalField, CanonicalRecord, ReportFilter, Score};

/// Number of entries in the unit ranking view
pub const TOP_UNITS: usize = 5;

#[derive(Debug, Clone, Copy, Default)]
struct MeanAccumulator {
    sum: f64,
    scored: usize,
    rows: usize,
}

impl MeanAccumulator {
    fn add(&mut self, score: Option<Score>) {
        self.rows += 1;
        if let Some(score) = score {
            self.sum += f64::from(score.value());
            self.scored += 1;
        }
    }

    /// Mean over non-null scores
    fn mean(&self) -> Option<f64> {
        (self.scored > 0).then(|| self.sum / self.scored as f64)
    }
}

/// Accumulate over rows whose group key has no null component, keys sorted
fn group_by<const N: usize>(
    records: &[&CanonicalRecord],
    fields: [CanonicalField; N],
) -> BTreeMap<[String; N], MeanAccumulator> {
    let mut groups: BTreeMap<[String; N], MeanAccumulator> = BTreeMap::new();

    for record in records {
        let mut key: [String; N] = std::array::from_fn(|_| String::new());
        let mut complete = true;
        for (slot, field) in key.iter_mut().zip(fields) {
            match record.get(field) {
                Some(value) => *slot = value.to_string(),
                None => complete = false,
            }
        }
        if complete {
            groups.entry(key).or_default().add(record.pontuacao);
        }
    }

    groups
}

/// Descending by mean; groups without a mean go last, ties keep key order
fn sort_by_mean_desc<T>(items: &mut [T], mean: impl Fn(&T) -> Option<f64>) {
    items.sort_by(|a, b| match (mean(a), mean(b)) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });
}

/// Compute every view over the records passing the filter
pub fn build_views(records: &[&CanonicalRecord]) -> DashboardViews {
    let mut overall = MeanAccumulator::default();
    for record in records {
        overall.add(record.pontuacao);
    }
    let overall_mean = overall.mean();
    let gauge = Gauge {
        mean: overall_mean,
        band: overall_mean.map(SentimentBand::from_mean),
        responses: overall.rows,
    };

    let mut by_origin: Vec<OriginMean> = group_by(records, [CanonicalField::Origem])
        .into_iter()
        .map(|([origin], acc)| OriginMean {
            origin,
            mean: acc.mean(),
            responses: acc.rows,
        })
        .collect();
    sort_by_mean_desc(&mut by_origin, |o| o.mean);

    let heatmap = group_by(records, [CanonicalField::SetorCurso, CanonicalField::Categoria])
        .into_iter()
        .map(|([sector, category], acc)| HeatmapCell {
            sector,
            category,
            mean: acc.mean(),
        })
        .collect();

    let hierarchy = group_by(
        records,
        [
            CanonicalField::Origem,
            CanonicalField::SetorCurso,
            CanonicalField::UnidadeAnalise,
        ],
    )
    .into_iter()
    .map(|([origin, sector, unit], acc)| HierarchyNode {
        origin,
        sector,
        unit,
        mean: acc.mean(),
        responses: acc.rows,
    })
    .collect();

    let sentiment_distribution = Score::DISPLAY_ORDER
        .iter()
        .map(|score| SentimentCount {
            label: score.label(),
            score: score.value(),
            count: records
                .iter()
                .filter(|r| r.pontuacao == Some(*score))
                .count(),
        })
        .collect();

    let mut top_units: Vec<UnitRanking> = group_by(records, [CanonicalField::UnidadeAnalise])
        .into_iter()
        .map(|([unit], acc)| UnitRanking {
            unit,
            mean: acc.mean(),
        })
        .collect();
    sort_by_mean_desc(&mut top_units, |u| u.mean);
    top_units.truncate(TOP_UNITS);

    DashboardViews {
        gauge,
        by_origin,
        heatmap,
        hierarchy,
        sentiment_distribution,
        top_units,
    }
}

/// Build the report from already loaded records
///
/// Unscored rows are set aside first, then the filter is applied.
pub fn build_report(
    records: &[CanonicalRecord],
    filter: &ReportFilter,
    dataset: &str,
) -> DashboardReport {
    let scored: Vec<&CanonicalRecord> = records.iter().filter(|r| r.pontuacao.is_some()).collect();
    let unscored_rows = records.len() - scored.len();

    let filtered: Vec<&CanonicalRecord> = scored.into_iter().filter(|r| filter.matches(r)).collect();
    debug!(
        "{} of {} rows pass the filter ({} unscored set aside)",
        filtered.len(),
        records.len(),
        unscored_rows
    );

    DashboardReport {
        generated_at: chrono::Utc::now(),
        dataset: dataset.to_string(),
        filter: filter.clone(),
        total_rows: records.len(),
        unscored_rows,
        filtered_rows: filtered.len(),
        views: build_views(&filtered),
    }
}

/// Load the consolidated dataset and build the report
///
/// A missing dataset is a `ConsolidaError::DatasetNotFound`; nothing is
/// rendered in that case.
pub fn execute_report(dataset: &Path, filter: &ReportFilter) -> Result<DashboardReport> {
    info!("Loading consolidated dataset from {:?}", dataset);
    let records = read_consolidated(dataset)?;
    info!("Loaded {} rows", records.len());

    Ok(build_report(
        &records,
        filter,
        &dataset.display().to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(
        origem: &str,
        setor: &str,
        categoria: &str,
        unidade: &str,
        score: Option<i64>,
    ) -> CanonicalRecord {
        CanonicalRecord {
            origem: origem.to_string(),
            setor_curso: Some(setor.to_string()),
            unidade_analise: Some(unidade.to_string()),
            contexto: Some(unidade.to_string()),
            categoria: Some(categoria.to_string()),
            pergunta: None,
            resposta: Some("resposta".to_string()),
            pontuacao: score.and_then(Score::from_value),
        }
    }

    fn sample() -> Vec<CanonicalRecord> {
        vec![
            record("X", "Humanas", "Ensino", "Direito", Some(1)),
            record("X", "Humanas", "Ensino", "Direito", Some(-1)),
            record("X", "Exatas", "Infra", "Fisica", Some(1)),
            record("Y", "Institucional", "Geral", "Reitoria", Some(0)),
            record("Y", "Institucional", "Geral", "Reitoria", Some(-1)),
            record("Y", "Institucional", "Geral", "Reitoria", None),
        ]
    }

    #[test]
    fn test_mean_by_origin() {
        let report = build_report(&sample(), &ReportFilter::default(), "base.csv");
        let by_origin = &report.views.by_origin;

        assert_eq!(by_origin.len(), 2);
        assert_eq!(by_origin[0].origin, "X");
        assert!((by_origin[0].mean.unwrap() - 1.0 / 3.0).abs() < 1e-9);
        assert_eq!(by_origin[0].responses, 3);
        assert_eq!(by_origin[1].origin, "Y");
        assert_eq!(by_origin[1].mean, Some(-0.5));
        assert_eq!(by_origin[1].responses, 2);
    }

    #[test]
    fn test_gauge_and_counts() {
        let report = build_report(&sample(), &ReportFilter::default(), "base.csv");

        assert_eq!(report.total_rows, 6);
        assert_eq!(report.unscored_rows, 1);
        assert_eq!(report.filtered_rows, 5);
        assert_eq!(report.views.gauge.mean, Some(0.0));
        assert_eq!(report.views.gauge.band, Some(SentimentBand::Neutral));
        assert_eq!(report.views.gauge.responses, 5);

        let counts: Vec<(&str, usize)> = report
            .views
            .sentiment_distribution
            .iter()
            .map(|c| (c.label, c.count))
            .collect();
        assert_eq!(
            counts,
            vec![("Satisfeito", 2), ("Neutro", 1), ("Insatisfeito", 2)]
        );
    }

    #[test]
    fn test_heatmap_and_hierarchy() {
        let report = build_report(&sample(), &ReportFilter::default(), "base.csv");

        let cell = report
            .views
            .heatmap
            .iter()
            .find(|c| c.sector == "Humanas" && c.category == "Ensino")
            .unwrap();
        assert_eq!(cell.mean, Some(0.0));
        assert_eq!(report.views.heatmap.len(), 3);

        let node = report
            .views
            .hierarchy
            .iter()
            .find(|n| n.origin == "Y" && n.unit == "Reitoria")
            .unwrap();
        assert_eq!(node.sector, "Institucional");
        assert_eq!(node.responses, 2);
        assert_eq!(node.mean, Some(-0.5));
    }

    #[test]
    fn test_top_units_ranking() {
        let report = build_report(&sample(), &ReportFilter::default(), "base.csv");
        let units: Vec<&str> = report.views.top_units.iter().map(|u| u.unit.as_str()).collect();

        assert_eq!(units, vec!["Fisica", "Direito", "Reitoria"]);
    }

    #[test]
    fn test_filters() {
        let filter = ReportFilter {
            origins: vec!["X".to_string()],
            sectors: vec!["Humanas".to_string()],
            categories: vec![],
        };

        let report = build_report(&sample(), &filter, "base.csv");

        assert_eq!(report.filtered_rows, 2);
        assert_eq!(report.views.by_origin.len(), 1);
        assert_eq!(report.views.gauge.mean, Some(0.0));
    }

    #[test]
    fn test_filter_without_matches() {
        let filter = ReportFilter {
            categories: vec!["Inexistente".to_string()],
            ..Default::default()
        };

        let report = build_report(&sample(), &filter, "base.csv");

        assert_eq!(report.filtered_rows, 0);
        assert_eq!(report.views.gauge.mean, None);
        assert_eq!(report.views.gauge.band, None);
        assert!(report.views.by_origin.is_empty());
        assert!(report.views.sentiment_distribution.iter().all(|c| c.count == 0));
    }

    #[test]
    fn test_null_group_keys_are_left_out() {
        let mut records = sample();
        records[0].setor_curso = None;

        let report = build_report(&records, &ReportFilter::default(), "base.csv");

        let humanas = report
            .views
            .heatmap
            .iter()
            .find(|c| c.sector == "Humanas")
            .unwrap();
        assert_eq!(humanas.mean, Some(-1.0));
        assert_eq!(report.views.gauge.responses, 5);
    }

    #[test]
    fn test_execute_report_missing_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let err = execute_report(&dir.path().join("absent.csv"), &ReportFilter::default())
            .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<crate::error::ConsolidaError>(),
            Some(crate::error::ConsolidaError::DatasetNotFound(_))
        ));
    }
}
