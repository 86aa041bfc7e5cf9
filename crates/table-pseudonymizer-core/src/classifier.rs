//! Column classification by column-name pattern matching

use anyhow::Result;
use regex::Regex;
use std::fmt;
use tracing::debug;

/// Semantic type of a column, inferred from its name alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnKind {
    Name,
    Email,
    Website,
    Phone,
    WorkedDirectly,
    Generic,
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ColumnKind::Name => "name",
            ColumnKind::Email => "email",
            ColumnKind::Website => "website",
            ColumnKind::Phone => "phone",
            ColumnKind::WorkedDirectly => "worked_directly",
            ColumnKind::Generic => "generic",
        };
        f.write_str(label)
    }
}

// Evaluated top to bottom, first match wins.
const COLUMN_RULES: &[(ColumnKind, &str)] = &[
    (ColumnKind::Name, r"(?i)\bname\b"),
    (ColumnKind::Email, r"(?i)\bemail\b"),
    (ColumnKind::Website, r"(?i)\bwebsite\b"),
    (ColumnKind::Phone, r"(?i)\bphone\b"),
    (ColumnKind::WorkedDirectly, r"(?i)\bworked directly\b"),
];

#[derive(Clone)]
pub struct ColumnClassifier {
    rules: Vec<(ColumnKind, Regex)>,
}

impl ColumnClassifier {
    pub fn new() -> Result<Self> {
        let mut rules = Vec::with_capacity(COLUMN_RULES.len());

        for (kind, pattern_str) in COLUMN_RULES {
            let regex = Regex::new(pattern_str)
                .map_err(|e| anyhow::anyhow!("Invalid column pattern for '{}': {}", kind, e))?;
            debug!("Loaded column pattern for '{}': {}", kind, pattern_str);
            rules.push((*kind, regex));
        }

        Ok(Self { rules })
    }

    pub fn classify(&self, column: &str) -> ColumnKind {
        self.rules
            .iter()
            .find(|(_, regex)| regex.is_match(column))
            .map(|(kind, _)| *kind)
            .unwrap_or(ColumnKind::Generic)
    }
}
