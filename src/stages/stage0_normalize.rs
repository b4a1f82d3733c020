use tracing::debug;

use crate::models::{CanonicalField, CanonicalRecord, RawTable};

/// What a canonical field falls back to when none of its raw columns exist
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fallback {
    /// Same constant for every row
    Constant(&'static str),
    /// Copy of another canonical field, already resolved for the same row
    Field(CanonicalField),
    /// Entirely null column
    Null,
}

/// One row of the declarative column mapping
#[derive(Debug, Clone, Copy)]
pub struct ColumnRule {
    pub target: CanonicalField,
    /// Raw column names (upper-cased) in priority order
    pub candidates: &'static [&'static str],
    pub fallback: Fallback,
}

/// Column mapping for every canonical field except ORIGEM and PONTUACAO.
///
/// Rules are applied in this order; a `Fallback::Field` must point at a
/// field resolved by an earlier rule. Supporting a new export layout means
/// adding its column names to the candidate lists.
pub const COLUMN_RULES: &[ColumnRule] = &[
    ColumnRule {
        target: CanonicalField::Categoria,
        candidates: &["TITULO", "QUESTIONARIO"],
        fallback: Fallback::Constant("Geral"),
    },
    ColumnRule {
        target: CanonicalField::UnidadeAnalise,
        candidates: &["LOTACAO", "CURSO"],
        fallback: Fallback::Constant("Desconhecido"),
    },
    ColumnRule {
        target: CanonicalField::Contexto,
        candidates: &["NOME_DISCIPLINA"],
        fallback: Fallback::Field(CanonicalField::UnidadeAnalise),
    },
    ColumnRule {
        target: CanonicalField::SetorCurso,
        candidates: &["SETOR_CURSO"],
        fallback: Fallback::Constant("Institucional"),
    },
    ColumnRule {
        target: CanonicalField::Pergunta,
        candidates: &["PERGUNTA"],
        fallback: Fallback::Null,
    },
    ColumnRule {
        target: CanonicalField::Resposta,
        candidates: &["RESPOSTA"],
        fallback: Fallback::Null,
    },
];

/// Where a canonical field's values came from for one source
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnSource {
    /// Passed through from a raw column
    Raw { column: String, index: usize },
    Constant { value: &'static str },
    Copied { from: CanonicalField },
    Null,
    /// The ORIGEM label handed to the normalizer
    Label { value: String },
}

impl ColumnSource {
    pub fn describe(&self) -> String {
        match self {
            ColumnSource::Raw { column, .. } => format!("column {}", column),
            ColumnSource::Constant { value } => format!("constant \"{}\"", value),
            ColumnSource::Copied { from } => format!("copy of {}", from.column_name()),
            ColumnSource::Null => "null".to_string(),
            ColumnSource::Label { value } => format!("label \"{}\"", value),
        }
    }
}

/// Resolved source of each canonical field, in rule order with ORIGEM last
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnResolution {
    pub fields: Vec<(CanonicalField, ColumnSource)>,
}

impl ColumnResolution {
    pub fn source_of(&self, field: CanonicalField) -> Option<&ColumnSource> {
        self.fields
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, source)| source)
    }
}

/// Output of the column normalizer for one source
#[derive(Debug, Clone)]
pub struct NormalizedSource {
    /// Records in source row order, PONTUACAO not yet computed
    pub records: Vec<CanonicalRecord>,
    pub resolution: ColumnResolution,
}

/// Upper-case and trim a raw column name
pub fn normalize_header(name: &str) -> String {
    name.trim().to_uppercase()
}

/// Decide where each canonical field comes from given a source's headers
pub fn resolve_columns(headers: &[String], origin: &str) -> ColumnResolution {
    let normalized: Vec<String> = headers.iter().map(|h| normalize_header(h)).collect();
    // First occurrence wins when two raw headers fold to the same name
    let find = |name: &str| normalized.iter().position(|h| h == name);

    let mut fields: Vec<(CanonicalField, ColumnSource)> = COLUMN_RULES
        .iter()
        .map(|rule| {
            let source = rule
                .candidates
                .iter()
                .find_map(|&candidate| {
                    find(candidate).map(|index| ColumnSource::Raw {
                        column: candidate.to_string(),
                        index,
                    })
                })
                .unwrap_or(match rule.fallback {
                    Fallback::Constant(value) => ColumnSource::Constant { value },
                    Fallback::Field(from) => ColumnSource::Copied { from },
                    Fallback::Null => ColumnSource::Null,
                });
            (rule.target, source)
        })
        .collect();

    fields.push((
        CanonicalField::Origem,
        ColumnSource::Label {
            value: origin.to_string(),
        },
    ));

    ColumnResolution { fields }
}

/// Map a raw table of any layout onto the canonical schema.
///
/// Raw columns that feed no canonical field are dropped. Missing columns
/// degrade to the fallbacks of `COLUMN_RULES`, never to an error.
pub fn normalize_columns(table: &RawTable, origin: &str) -> NormalizedSource {
    let resolution = resolve_columns(&table.headers, origin);

    for (field, source) in &resolution.fields {
        debug!("{} <- {}", field.column_name(), source.describe());
    }

    let records = table
        .rows
        .iter()
        .map(|row| build_record(row, &resolution, origin))
        .collect();

    NormalizedSource {
        records,
        resolution,
    }
}

fn build_record(
    row: &[Option<String>],
    resolution: &ColumnResolution,
    origin: &str,
) -> CanonicalRecord {
    let mut values: [Option<String>; 8] = Default::default();

    for (field, source) in &resolution.fields {
        values[field.index()] = match source {
            ColumnSource::Raw { index, .. } => row.get(*index).cloned().flatten(),
            ColumnSource::Constant { value } => Some(value.to_string()),
            ColumnSource::Copied { from } => values[from.index()].clone(),
            ColumnSource::Null => None,
            ColumnSource::Label { value } => Some(value.clone()),
        };
    }

    let [_, setor_curso, unidade_analise, contexto, categoria, pergunta, resposta, _] = values;

    CanonicalRecord {
        origem: origin.to_string(),
        setor_curso,
        unidade_analise,
        contexto,
        categoria,
        pergunta,
        resposta,
        pontuacao: None,
    }
}
