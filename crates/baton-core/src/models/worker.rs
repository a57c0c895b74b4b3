use serde::{Deserialize, Serialize};

/// The fixed roster of specialised workers.
///
/// Every place that resolves a worker name to behaviour matches on this
/// enum exhaustively, so adding a worker is a compile-time change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Worker {
    Researcher,
    Coder,
    Browser,
    DataAnalyst,
    BiomedicalResearcher,
    Reporter,
}

impl Worker {
    pub const ALL: [Worker; 6] = [
        Worker::Researcher,
        Worker::Coder,
        Worker::Browser,
        Worker::DataAnalyst,
        Worker::BiomedicalResearcher,
        Worker::Reporter,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Researcher => "researcher",
            Self::Coder => "coder",
            Self::Browser => "browser",
            Self::DataAnalyst => "data_analyst",
            Self::BiomedicalResearcher => "biomedical_researcher",
            Self::Reporter => "reporter",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim() {
            "researcher" => Some(Self::Researcher),
            "coder" => Some(Self::Coder),
            "browser" => Some(Self::Browser),
            "data_analyst" => Some(Self::DataAnalyst),
            "biomedical_researcher" => Some(Self::BiomedicalResearcher),
            "reporter" => Some(Self::Reporter),
            _ => None,
        }
    }

    /// Default generation tier for this worker.
    pub fn default_tier(&self) -> ModelTier {
        match self {
            Self::Researcher | Self::Reporter => ModelTier::Basic,
            Self::Coder | Self::DataAnalyst | Self::BiomedicalResearcher => ModelTier::Reasoning,
            Self::Browser => ModelTier::Vision,
        }
    }

    /// One-line capability summary shown to the planner and supervisor.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Researcher => {
                "Uses search engines and web crawlers to gather information from the internet."
            }
            Self::Coder => {
                "Executes Python or Bash commands, performs calculations, and reports results in Markdown."
            }
            Self::Browser => "Directly interacts with web pages to perform complex operations.",
            Self::DataAnalyst => {
                "Turns natural-language questions into validated SQL and reports query results."
            }
            Self::BiomedicalResearcher => {
                "Searches biomedical literature and databases and returns structured, cited findings."
            }
            Self::Reporter => "Writes a professional report based on the results of each step.",
        }
    }
}

impl std::fmt::Display for Worker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Generation backend tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelTier {
    Basic,
    Reasoning,
    Vision,
}

impl ModelTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Reasoning => "reasoning",
            Self::Vision => "vision",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "basic" => Some(Self::Basic),
            "reasoning" => Some(Self::Reasoning),
            "vision" => Some(Self::Vision),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worker_names_round_trip() {
        for worker in Worker::ALL {
            assert_eq!(Worker::from_name(worker.as_str()), Some(worker));
        }
        assert_eq!(Worker::from_name("supervisor"), None);
        assert_eq!(Worker::from_name("FINISH"), None);
    }

    #[test]
    fn test_worker_serde_uses_snake_case() {
        let json = serde_json::to_string(&Worker::BiomedicalResearcher).unwrap();
        assert_eq!(json, "\"biomedical_researcher\"");
    }

    #[test]
    fn test_default_tiers() {
        assert_eq!(Worker::Browser.default_tier(), ModelTier::Vision);
        assert_eq!(Worker::DataAnalyst.default_tier(), ModelTier::Reasoning);
        assert_eq!(Worker::Reporter.default_tier(), ModelTier::Basic);
    }
}
