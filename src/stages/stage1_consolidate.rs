use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::ConsolidaError;
use crate::heuristics::{score_records, ScoringSummary, SentimentConfig};
use crate::io::{read_table_robust, write_consolidated, Delimiter, ReaderConfig, TextEncoding};
use crate::models::{default_sources, CanonicalRecord, SourceSpec};

use super::stage0_normalize::{normalize_columns, ColumnResolution};

/// Configuration for a consolidation run
#[derive(Debug, Clone)]
pub struct ConsolidateConfig {
    /// Directory the source file names are resolved against
    pub input_dir: PathBuf,
    /// Consolidated dataset path, overwritten on every run
    pub output_path: PathBuf,
    /// Sources in processing order
    pub sources: Vec<SourceSpec>,
    pub reader: ReaderConfig,
    pub sentiment: SentimentConfig,
}

impl Default for ConsolidateConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("."),
            output_path: PathBuf::from("base_consolidada_v2.csv"),
            sources: default_sources(),
            reader: ReaderConfig::default(),
            sentiment: SentimentConfig::default(),
        }
    }
}

/// What happened to one source during a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SourceOutcome {
    Loaded {
        rows: usize,
        encoding: TextEncoding,
        delimiter: Delimiter,
    },
    /// The file does not exist
    Missing,
    /// The file exists but yielded no usable table
    Unreadable { reason: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceReport {
    pub spec: SourceSpec,
    pub path: PathBuf,
    pub outcome: SourceOutcome,
}

/// A source that was read and normalized
#[derive(Debug, Clone)]
pub struct LoadedSource {
    /// Raw headers as declared in the file
    pub raw_columns: Vec<String>,
    pub resolution: ColumnResolution,
    pub records: Vec<CanonicalRecord>,
}

/// Result of a consolidation run
#[derive(Debug)]
pub struct ConsolidationResult {
    pub sources: Vec<SourceReport>,
    /// Retained records in output order
    pub records: Vec<CanonicalRecord>,
    /// Rows dropped for lacking a RESPOSTA
    pub rows_dropped: usize,
    pub scoring: ScoringSummary,
    pub output_path: PathBuf,
}

impl ConsolidationResult {
    pub fn loaded_sources(&self) -> usize {
        self.sources
            .iter()
            .filter(|s| matches!(s.outcome, SourceOutcome::Loaded { .. }))
            .count()
    }

    /// Run metadata for the JSON summary
    pub fn summary(&self) -> ConsolidationSummary {
        ConsolidationSummary {
            generated_at: chrono::Utc::now(),
            output_path: self.output_path.clone(),
            sources: self.sources.clone(),
            rows_written: self.records.len(),
            rows_dropped: self.rows_dropped,
            scoring: self.scoring.clone(),
        }
    }
}

/// Machine-readable account of a consolidation run
#[derive(Debug, Clone, Serialize)]
pub struct ConsolidationSummary {
    pub generated_at: chrono::DateTime<chrono::Utc>,
    pub output_path: PathBuf,
    pub sources: Vec<SourceReport>,
    pub rows_written: usize,
    pub rows_dropped: usize,
    pub scoring: ScoringSummary,
}

impl ConsolidationSummary {
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let file = std::fs::File::create(path)
            .with_context(|| format!("Failed to create file: {:?}", path))?;
        serde_json::to_writer_pretty(file, self).context("Failed to write JSON")?;
        Ok(())
    }
}

/// Read one source and normalize it onto the canonical schema
///
/// Failures are folded into the returned `SourceOutcome`; this never errors.
pub fn load_source(
    input_dir: &Path,
    spec: &SourceSpec,
    reader: &ReaderConfig,
) -> (SourceReport, Option<LoadedSource>) {
    let path = input_dir.join(&spec.file);
    let report = |outcome| SourceReport {
        spec: spec.clone(),
        path: path.clone(),
        outcome,
    };

    if !path.is_file() {
        warn!("File not found, skipping {}: {:?}", spec.origin, path);
        return (report(SourceOutcome::Missing), None);
    }

    info!("Processing {} from {:?}", spec.origin, path);
    let detected = match read_table_robust(&path, reader) {
        Ok(Some(detected)) if !detected.table.is_empty() => detected,
        Ok(_) => {
            warn!("Empty or unreadable file, skipping {}: {:?}", spec.origin, path);
            return (
                report(SourceOutcome::Unreadable {
                    reason: "no encoding/delimiter combination produced rows".to_string(),
                }),
                None,
            );
        }
        Err(e) => {
            warn!("Failed to read {:?}, skipping {}: {:#}", path, spec.origin, e);
            return (
                report(SourceOutcome::Unreadable {
                    reason: format!("{:#}", e),
                }),
                None,
            );
        }
    };

    info!(
        "Read {} rows, {} columns with {} and delimiter '{}'",
        detected.table.row_count(),
        detected.table.column_count(),
        detected.encoding,
        detected.delimiter
    );

    let normalized = normalize_columns(&detected.table, &spec.origin);
    let outcome = SourceOutcome::Loaded {
        rows: normalized.records.len(),
        encoding: detected.encoding,
        delimiter: detected.delimiter,
    };

    (
        report(outcome),
        Some(LoadedSource {
            raw_columns: detected.table.headers,
            resolution: normalized.resolution,
            records: normalized.records,
        }),
    )
}

/// Run the ingestion stage end to end
///
/// 1. Reads and normalizes every configured source, skipping unavailable ones
/// 2. Concatenates the records in source order
/// 3. Drops rows without a RESPOSTA and scores the rest
/// 4. Overwrites the consolidated dataset
///
/// Fails only when no source yielded any rows, in which case nothing is written.
pub fn consolidate(config: &ConsolidateConfig) -> Result<ConsolidationResult> {
    let mut sources = Vec::with_capacity(config.sources.len());
    let mut records: Vec<CanonicalRecord> = Vec::new();

    for spec in &config.sources {
        let (report, loaded) = load_source(&config.input_dir, spec, &config.reader);
        if let Some(mut loaded) = loaded {
            records.append(&mut loaded.records);
        }
        sources.push(report);
    }

    if records.is_empty() {
        return Err(ConsolidaError::NoDataProcessed {
            sources: config.sources.len(),
        }
        .into());
    }

    info!("Unifying {} rows from {} sources", records.len(), sources.len());
    let before = records.len();
    records.retain(|r| r.resposta.is_some());
    let rows_dropped = before - records.len();
    if rows_dropped > 0 {
        debug!("Dropped {} rows without RESPOSTA", rows_dropped);
    }

    info!("Computing sentiment scores...");
    let scoring = score_records(&mut records, &config.sentiment);
    if scoring.unscored > 0 {
        warn!(
            "{} responses match no sentiment marker and are left unscored",
            scoring.unscored
        );
    }

    write_consolidated(&config.output_path, &records)?;
    info!(
        "Consolidated dataset written to {:?} ({} rows)",
        config.output_path,
        records.len()
    );

    Ok(ConsolidationResult {
        sources,
        records,
        rows_dropped,
        scoring,
        output_path: config.output_path.clone(),
    })
}

/// Per-source detection and column mapping, without writing anything
pub fn inspect_sources(config: &ConsolidateConfig) -> Vec<(SourceReport, Option<LoadedSource>)> {
    config
        .sources
        .iter()
        .map(|spec| load_source(&config.input_dir, spec, &config.reader))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::read_consolidated;
    use crate::models::{CanonicalField, Score};
    use crate::stages::stage0_normalize::ColumnSource;

    fn config_for(dir: &Path, sources: Vec<SourceSpec>) -> ConsolidateConfig {
        ConsolidateConfig {
            input_dir: dir.to_path_buf(),
            output_path: dir.join("base.csv"),
            sources,
            ..Default::default()
        }
    }

    #[test]
    fn test_multi_source_consolidation() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("a.csv"),
            "TITULO,CURSO,RESPOSTA\nEnsino,Direito,Concordo\nEnsino,Direito,Discordo\nEnsino,Letras,Talvez\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("b.csv"),
            b"LOTACAO;RESPOSTA;SETOR_CURSO\nReitoria;Indiferente;Adm\nReitoria;Concordo totalmente;Adm\nReitoria;;Adm\n",
        )
        .unwrap();
        let config = config_for(
            dir.path(),
            vec![SourceSpec::new("a.csv", "X"), SourceSpec::new("b.csv", "Y")],
        );

        let result = consolidate(&config).unwrap();

        assert_eq!(result.records.len(), 5);
        assert_eq!(result.rows_dropped, 1);
        assert_eq!(result.loaded_sources(), 2);
        let origins: Vec<&str> = result.records.iter().map(|r| r.origem.as_str()).collect();
        assert_eq!(origins, vec!["X", "X", "X", "Y", "Y"]);
        assert_eq!(result.scoring.unscored, 1);
        assert_eq!(result.records[2].pontuacao, None);
        assert_eq!(result.records[3].pontuacao, Some(Score::Neutral));
        assert_eq!(result.records[0].setor_curso.as_deref(), Some("Institucional"));
        assert_eq!(result.records[3].setor_curso.as_deref(), Some("Adm"));
        assert_eq!(result.records[3].categoria.as_deref(), Some("Geral"));

        let written = read_consolidated(&config.output_path).unwrap();
        assert_eq!(written, result.records);
    }

    #[test]
    fn test_missing_and_unreadable_sources_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("single.csv"), "RESPOSTA\nConcordo\n").unwrap();
        std::fs::write(dir.path().join("ok.csv"), "CURSO,RESPOSTA\nDireito,Concordo\n").unwrap();
        let config = config_for(
            dir.path(),
            vec![
                SourceSpec::new("absent.csv", "A"),
                SourceSpec::new("single.csv", "B"),
                SourceSpec::new("ok.csv", "C"),
            ],
        );

        let result = consolidate(&config).unwrap();

        assert_eq!(result.sources[0].outcome, SourceOutcome::Missing);
        assert!(matches!(result.sources[1].outcome, SourceOutcome::Unreadable { .. }));
        assert_eq!(
            result.sources[2].outcome,
            SourceOutcome::Loaded {
                rows: 1,
                encoding: TextEncoding::Utf8,
                delimiter: Delimiter::Comma,
            }
        );
        assert_eq!(result.records.len(), 1);
    }

    #[test]
    fn test_no_sources_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("header_only.csv"), "CURSO,RESPOSTA\n").unwrap();
        let config = config_for(
            dir.path(),
            vec![
                SourceSpec::new("absent.csv", "A"),
                SourceSpec::new("header_only.csv", "B"),
            ],
        );

        let err = consolidate(&config).unwrap_err();

        assert!(matches!(
            err.downcast_ref::<ConsolidaError>(),
            Some(ConsolidaError::NoDataProcessed { sources: 2 })
        ));
        assert!(!config.output_path.exists());
    }

    #[test]
    fn test_rows_without_resposta_write_header_only_dataset() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("a.csv"),
            "CURSO,PERGUNTA\nDireito,O curso atende?\nLetras,O curso atende?\n",
        )
        .unwrap();
        let config = config_for(dir.path(), vec![SourceSpec::new("a.csv", "Cursos")]);

        let result = consolidate(&config).unwrap();

        assert_eq!(result.records.len(), 0);
        assert_eq!(result.rows_dropped, 2);
        assert_eq!(result.loaded_sources(), 1);
        let written = std::fs::read_to_string(&config.output_path).unwrap();
        assert_eq!(
            written,
            "\u{feff}ORIGEM,SETOR_CURSO,UNIDADE_ANALISE,CONTEXTO,CATEGORIA,PERGUNTA,RESPOSTA,PONTUACAO\n"
        );
        assert!(read_consolidated(&config.output_path).unwrap().is_empty());
    }

    #[test]
    fn test_rerun_is_byte_identical_and_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("a.csv"),
            "QUESTIONARIO\tLOTACAO\tPERGUNTA\tRESPOSTA\nInfra\tBiblioteca\tAcervo?\tDiscordo\n",
        )
        .unwrap();
        let config = config_for(dir.path(), vec![SourceSpec::new("a.csv", "Institucional")]);
        std::fs::write(&config.output_path, "stale content from an earlier run").unwrap();

        consolidate(&config).unwrap();
        let first = std::fs::read(&config.output_path).unwrap();
        consolidate(&config).unwrap();
        let second = std::fs::read(&config.output_path).unwrap();

        assert_eq!(first, second);
        assert!(!String::from_utf8_lossy(&first).contains("stale"));
    }

    #[test]
    fn test_inspect_reports_resolution() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("a.csv"),
            "titulo;nome_disciplina;RESPOSTA\nDocente;Penal;Concordo\n",
        )
        .unwrap();
        let config = config_for(dir.path(), vec![SourceSpec::new("a.csv", "Disciplina EAD")]);

        let inspected = inspect_sources(&config);
        let (report, loaded) = &inspected[0];
        let loaded = loaded.as_ref().unwrap();

        assert!(matches!(
            report.outcome,
            SourceOutcome::Loaded { delimiter: Delimiter::Semicolon, .. }
        ));
        assert_eq!(loaded.raw_columns, vec!["titulo", "nome_disciplina", "RESPOSTA"]);
        assert_eq!(
            loaded.resolution.source_of(CanonicalField::UnidadeAnalise),
            Some(&ColumnSource::Constant {
                value: "Desconhecido"
            })
        );
        assert!(!config.output_path.exists());
    }

    #[test]
    fn test_summary_json() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.csv"), "CURSO,RESPOSTA\nDireito,Concordo\nLetras,Talvez\n")
            .unwrap();
        let config = config_for(
            dir.path(),
            vec![SourceSpec::new("a.csv", "Cursos"), SourceSpec::new("b.csv", "Institucional")],
        );
        let summary_path = dir.path().join("summary.json");

        let result = consolidate(&config).unwrap();
        result.summary().write_json(&summary_path).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&summary_path).unwrap()).unwrap();
        assert_eq!(value["rows_written"], 2);
        assert_eq!(value["scoring"]["unscored"], 1);
        assert_eq!(value["sources"][0]["outcome"]["status"], "loaded");
        assert_eq!(value["sources"][0]["outcome"]["encoding"], "utf8");
        assert_eq!(value["sources"][1]["outcome"]["status"], "missing");
    }
}
