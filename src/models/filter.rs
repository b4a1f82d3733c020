use serde::Serialize;

use super::CanonicalRecord;

/// Row filter applied before every report view
///
/// Each list is an allow-list; an empty list lets every value through.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReportFilter {
    pub origins: Vec<String>,
    pub sectors: Vec<String>,
    pub categories: Vec<String>,
}

impl ReportFilter {
    pub fn matches(&self, record: &CanonicalRecord) -> bool {
        allows(&self.origins, Some(record.origem.as_str()))
            && allows(&self.sectors, record.setor_curso.as_deref())
            && allows(&self.categories, record.categoria.as_deref())
    }

    pub fn is_empty(&self) -> bool {
        self.origins.is_empty() && self.sectors.is_empty() && self.categories.is_empty()
    }
}

fn allows(allowed: &[String], value: Option<&str>) -> bool {
    allowed.is_empty() || value.is_some_and(|v| allowed.iter().any(|a| a == v))
}
