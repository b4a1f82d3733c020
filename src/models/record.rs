/// The eight canonical fields, in output column order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CanonicalField {
    Origem,
    SetorCurso,
    UnidadeAnalise,
    Contexto,
    Categoria,
    Pergunta,
    Resposta,
    Pontuacao,
}

impl CanonicalField {
    pub const ALL: [CanonicalField; 8] = [
        CanonicalField::Origem,
        CanonicalField::SetorCurso,
        CanonicalField::UnidadeAnalise,
        CanonicalField::Contexto,
        CanonicalField::Categoria,
        CanonicalField::Pergunta,
        CanonicalField::Resposta,
        CanonicalField::Pontuacao,
    ];

    /// Column header used in the consolidated dataset
    pub fn column_name(&self) -> &'static str {
        match self {
            CanonicalField::Origem => "ORIGEM",
            CanonicalField::SetorCurso => "SETOR_CURSO",
            CanonicalField::UnidadeAnalise => "UNIDADE_ANALISE",
            CanonicalField::Contexto => "CONTEXTO",
            CanonicalField::Categoria => "CATEGORIA",
            CanonicalField::Pergunta => "PERGUNTA",
            CanonicalField::Resposta => "RESPOSTA",
            CanonicalField::Pontuacao => "PONTUACAO",
        }
    }

    /// Position of this field in the output row
    pub fn index(&self) -> usize {
        *self as usize
    }
}

/// Ternary satisfaction score derived from a free-text response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Score {
    Dissatisfied,
    Neutral,
    Satisfied,
}

impl Score {
    /// Label order used by the sentiment distribution view
    pub const DISPLAY_ORDER: [Score; 3] = [Score::Satisfied, Score::Neutral, Score::Dissatisfied];

    pub fn value(&self) -> i8 {
        match self {
            Score::Dissatisfied => -1,
            Score::Neutral => 0,
            Score::Satisfied => 1,
        }
    }

    pub fn from_value(value: i64) -> Option<Self> {
        match value {
            -1 => Some(Score::Dissatisfied),
            0 => Some(Score::Neutral),
            1 => Some(Score::Satisfied),
            _ => None,
        }
    }

    /// Human-facing sentiment label
    pub fn label(&self) -> &'static str {
        match self {
            Score::Dissatisfied => "Insatisfeito",
            Score::Neutral => "Neutro",
            Score::Satisfied => "Satisfeito",
        }
    }
}

/// A survey response normalized onto the canonical schema
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalRecord {
    /// Provenance label of the source file
    pub origem: String,
    pub setor_curso: Option<String>,
    pub unidade_analise: Option<String>,
    pub contexto: Option<String>,
    pub categoria: Option<String>,
    pub pergunta: Option<String>,
    /// Free-text answer; consolidated records always carry one
    pub resposta: Option<String>,
    /// Sentiment score, a pure function of `resposta`
    pub pontuacao: Option<Score>,
}

impl CanonicalRecord {
    /// Text value of a field; PONTUACAO is rendered as its numeric value
    pub fn text(&self, field: CanonicalField) -> Option<String> {
        match field {
            CanonicalField::Origem => Some(self.origem.clone()),
            CanonicalField::Pontuacao => self.pontuacao.map(|s| s.value().to_string()),
            other => self.get(other).map(str::to_string),
        }
    }

    /// Borrow a textual field (ORIGEM included, PONTUACAO excluded)
    pub fn get(&self, field: CanonicalField) -> Option<&str> {
        match field {
            CanonicalField::Origem => Some(self.origem.as_str()),
            CanonicalField::SetorCurso => self.setor_curso.as_deref(),
            CanonicalField::UnidadeAnalise => self.unidade_analise.as_deref(),
            CanonicalField::Contexto => self.contexto.as_deref(),
            CanonicalField::Categoria => self.categoria.as_deref(),
            CanonicalField::Pergunta => self.pergunta.as_deref(),
            CanonicalField::Resposta => self.resposta.as_deref(),
            CanonicalField::Pontuacao => None,
        }
    }

    /// Output row in canonical column order, nulls as empty fields
    pub fn to_fields(&self) -> Vec<String> {
        CanonicalField::ALL
            .iter()
            .map(|f| self.text(*f).unwrap_or_default())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> CanonicalRecord {
        CanonicalRecord {
            origem: "Cursos".to_string(),
            setor_curso: None,
            unidade_analise: Some("Direito".to_string()),
            contexto: Some("Direito".to_string()),
            categoria: Some("Geral".to_string()),
            pergunta: Some("O curso atende?".to_string()),
            resposta: Some("Concordo".to_string()),
            pontuacao: Some(Score::Satisfied),
        }
    }

    #[test]
    fn test_field_order_matches_index() {
        for (i, field) in CanonicalField::ALL.iter().enumerate() {
            assert_eq!(field.index(), i);
        }
        assert_eq!(CanonicalField::ALL[0].column_name(), "ORIGEM");
        assert_eq!(CanonicalField::ALL[7].column_name(), "PONTUACAO");
    }

    #[test]
    fn test_to_fields() {
        let fields = record().to_fields();
        assert_eq!(
            fields,
            vec!["Cursos", "", "Direito", "Direito", "Geral", "O curso atende?", "Concordo", "1"]
        );
    }

    #[test]
    fn test_score_values_and_labels() {
        assert_eq!(Score::from_value(-1), Some(Score::Dissatisfied));
        assert_eq!(Score::from_value(2), None);
        assert_eq!(Score::Neutral.value(), 0);
        assert_eq!(Score::Satisfied.label(), "Satisfeito");
        assert_eq!(Score::Dissatisfied.label(), "Insatisfeito");
    }
}
