//! SQL database access for the data-analysis worker.

pub mod sqlite;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::WorkflowError;

pub use sqlite::SqliteDatabase;

/// Rows rendered to text, capped at [`MAX_ROWS`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
    /// Rows produced by the statement, including ones not kept.
    pub total_rows: usize,
}

pub const MAX_ROWS: usize = 100;

impl QueryResult {
    pub fn truncated(&self) -> bool {
        self.total_rows > self.rows.len()
    }

    /// Markdown table of the kept rows.
    pub fn render(&self) -> String {
        if self.columns.is_empty() {
            return "(statement returned no columns)".to_string();
        }
        if self.rows.is_empty() {
            return "(no rows)".to_string();
        }
        let mut out = String::new();
        out.push_str(&format!("| {} |\n", self.columns.join(" | ")));
        out.push_str(&format!(
            "|{}\n",
            self.columns.iter().map(|_| " --- |").collect::<String>()
        ));
        for row in &self.rows {
            let cells: Vec<String> = row.iter().map(|c| c.replace('|', "\\|")).collect();
            out.push_str(&format!("| {} |\n", cells.join(" | ")));
        }
        if self.truncated() {
            out.push_str(&format!(
                "\n(showing first {} of {} rows)\n",
                self.rows.len(),
                self.total_rows
            ));
        }
        out
    }
}

#[async_trait]
pub trait SqlDatabase: Send + Sync {
    /// Human-readable schema description.
    async fn schema(&self) -> Result<String, WorkflowError>;

    async fn execute(&self, sql: &str) -> Result<QueryResult, WorkflowError>;
}
