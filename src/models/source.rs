use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::ConsolidaError;

/// A known input file and the ORIGEM label its rows receive
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSpec {
    /// File name, resolved relative to the input directory
    pub file: String,
    /// Provenance label written to ORIGEM
    pub origin: String,
}

impl SourceSpec {
    pub fn new(file: impl Into<String>, origin: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            origin: origin.into(),
        }
    }
}

/// The four survey exports of the institutional evaluation, in processing order
pub fn default_sources() -> Vec<SourceSpec> {
    vec![
        SourceSpec::new(
            "DadosAvDisciplinasEAD_1S2025.xlsx - PESQ423_DISCIP.csv",
            "Disciplina EAD",
        ),
        SourceSpec::new(
            "DadosAvDisciplinasPresenciais_1S2025.xlsx - DadosAvDisciplinas.csv",
            "Disciplina Presencial",
        ),
        SourceSpec::new("DadosAv_Cursos_2024.xlsx - DadosAvCursos.csv", "Cursos"),
        SourceSpec::new(
            "DadosAvInstitucional_2025.xlsx - PESQUISA 442.csv",
            "Institucional",
        ),
    ]
}

/// Load a source manifest: a JSON array of `{"file": ..., "origin": ...}` objects
pub fn load_manifest(path: &Path) -> Result<Vec<SourceSpec>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read source manifest: {:?}", path))?;
    parse_manifest(&content)
}

pub fn parse_manifest(json: &str) -> Result<Vec<SourceSpec>> {
    let sources: Vec<SourceSpec> =
        serde_json::from_str(json).context("Failed to parse source manifest JSON")?;

    if sources.is_empty() {
        return Err(ConsolidaError::InvalidManifest("no sources listed".to_string()).into());
    }
    if let Some(blank) = sources
        .iter()
        .find(|s| s.file.trim().is_empty() || s.origin.trim().is_empty())
    {
        return Err(ConsolidaError::InvalidManifest(format!(
            "entry {:?} has an empty file or origin",
            blank
        ))
        .into());
    }

    Ok(sources)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_sources_order() {
        let sources = default_sources();
        let origins: Vec<&str> = sources.iter().map(|s| s.origin.as_str()).collect();
        assert_eq!(
            origins,
            vec!["Disciplina EAD", "Disciplina Presencial", "Cursos", "Institucional"]
        );
    }

    #[test]
    fn test_parse_manifest() {
        let json = r#"[
            {"file": "a.csv", "origin": "X"},
            {"file": "b.csv", "origin": "Y"}
        ]"#;

        let sources = parse_manifest(json).unwrap();
        assert_eq!(sources, vec![SourceSpec::new("a.csv", "X"), SourceSpec::new("b.csv", "Y")]);
    }

    #[test]
    fn test_parse_manifest_rejects_empty_and_blank() {
        assert!(parse_manifest("[]").is_err());

        let err = parse_manifest(r#"[{"file": "a.csv", "origin": " "}]"#).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConsolidaError>(),
            Some(ConsolidaError::InvalidManifest(_))
        ));
    }
}
