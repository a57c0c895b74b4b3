use serde::{Deserialize, Serialize};

/// A cited source in biomedical findings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FindingSource {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
}

/// Structured output of the biomedical researcher.
///
/// Written only by the biomedical worker into `State` and read only when the
/// reporter builds its prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiomedicalFindings {
    pub summary: String,
    #[serde(default)]
    pub key_findings: Vec<String>,
    #[serde(default)]
    pub sources: Vec<FindingSource>,
    #[serde(default)]
    pub recommendations: Vec<String>,
    #[serde(default)]
    pub confidence_level: f64,
}

impl BiomedicalFindings {
    /// Record standing in for findings that could not be produced.
    pub fn from_error(error: impl std::fmt::Display) -> Self {
        Self {
            summary: format!("Error occurred during biomedical research: {}", error),
            key_findings: Vec::new(),
            sources: Vec::new(),
            recommendations: Vec::new(),
            confidence_level: 0.0,
        }
    }

    /// Clamp confidence into `[0, 1]`; non-finite values become 0.
    pub fn normalized(mut self) -> Self {
        self.confidence_level = if self.confidence_level.is_finite() {
            self.confidence_level.clamp(0.0, 1.0)
        } else {
            0.0
        };
        self
    }
}
