use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

use crate::error::ConsolidaError;
use crate::models::{CanonicalField, CanonicalRecord, Score};

use super::input::UTF8_BOM;

/// Write the consolidated dataset, replacing any previous file
///
/// Comma-separated UTF-8 with a byte-order mark and a header of the eight
/// canonical columns. Nulls are empty fields and PONTUACAO is `-1`, `0` or `1`.
pub fn write_consolidated(path: &Path, records: &[CanonicalRecord]) -> Result<()> {
    let mut file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create file: {:?}", path))?;
    file.write_all(UTF8_BOM)
        .with_context(|| format!("Failed to write file: {:?}", path))?;

    let mut writer = csv::Writer::from_writer(file);
    writer
        .write_record(CanonicalField::ALL.iter().map(|f| f.column_name()))
        .context("Failed to write CSV header")?;
    for record in records {
        writer
            .write_record(record.to_fields())
            .context("Failed to write CSV record")?;
    }
    writer.flush().context("Failed to flush consolidated dataset")?;

    Ok(())
}

/// Read a consolidated dataset back into canonical records
pub fn read_consolidated(path: &Path) -> Result<Vec<CanonicalRecord>> {
    if !path.is_file() {
        return Err(ConsolidaError::DatasetNotFound(path.to_path_buf()).into());
    }

    let bytes = std::fs::read(path).with_context(|| format!("Failed to read file: {:?}", path))?;
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(&bytes);

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(bytes);
    let headers = reader
        .headers()
        .with_context(|| format!("Failed to read header of {:?}", path))?
        .clone();

    let mut positions = [0usize; 8];
    for field in CanonicalField::ALL {
        positions[field.index()] = headers
            .iter()
            .position(|h| h.trim() == field.column_name())
            .ok_or(ConsolidaError::MalformedDataset {
                path: path.to_path_buf(),
                column: field.column_name(),
            })?;
    }

    let mut records = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        let line = idx + 2;
        let row = result.with_context(|| format!("Failed to parse {:?} line {}", path, line))?;
        let cell = |field: CanonicalField| -> Option<String> {
            row.get(positions[field.index()])
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        let pontuacao = cell(CanonicalField::Pontuacao).and_then(|raw| {
            let score = parse_score(&raw);
            if score.is_none() {
                debug!("Line {}: PONTUACAO {:?} is not a score, reading as null", line, raw);
            }
            score
        });

        records.push(CanonicalRecord {
            origem: cell(CanonicalField::Origem).unwrap_or_default(),
            setor_curso: cell(CanonicalField::SetorCurso),
            unidade_analise: cell(CanonicalField::UnidadeAnalise),
            contexto: cell(CanonicalField::Contexto),
            categoria: cell(CanonicalField::Categoria),
            pergunta: cell(CanonicalField::Pergunta),
            resposta: cell(CanonicalField::Resposta),
            pontuacao,
        });
    }

    Ok(records)
}

/// Accepts `1` as well as float renderings such as `1.0` or `-1.0`
fn parse_score(raw: &str) -> Option<Score> {
    let value: f64 = raw.trim().parse().ok()?;
    if value.fract() != 0.0 {
        return None;
    }
    Score::from_value(value as i64)
}
