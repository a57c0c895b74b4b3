//! Data analyst: bounded generate, validate, execute loop over SQL.
//!
//! Schema fetch, generation, validation and execution run inside one worker
//! invocation. Exhausting the retry bound or any tool failure ends the
//! invocation with error content; it never fails the outer workflow.

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::{WorkerCapability, WorkerContext, WorkerOutcome};
use crate::data::{QueryResult, SqlDatabase};
use crate::error::WorkflowError;
use crate::graph::validator::json_candidate;
use crate::llm::ChatRequest;
use crate::models::Message;
use crate::prompts::{PromptVars, SQL_FORMATTER, SQL_GENERATOR, SQL_VALIDATOR};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationStatus {
    Valid,
    Invalid,
    #[default]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueryType {
    #[default]
    Sql,
    SchemaDescription,
}

impl QueryType {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Sql => "sql",
            Self::SchemaDescription => "schema_description",
        }
    }
}

/// Scratch state of one data-analysis invocation.
#[derive(Debug, Clone, Default)]
pub struct SqlRetryState {
    pub generated_sql: Option<String>,
    pub validation_status: ValidationStatus,
    pub validation_feedback: String,
    pub execution_result: Option<QueryResult>,
    pub schema_answer: Option<String>,
    pub error_message: Option<String>,
    pub query_type: QueryType,
    pub retries: u32,
}

/// What the generator produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlExtraction {
    Sql(String),
    SchemaDescription(String),
    Missing,
}

fn sql_fence() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?is)```sql\s*(.*?)```").expect("valid sql fence pattern"))
}

/// Start of an unfenced statement. `WITH` only counts when it opens a CTE.
fn sql_statement() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"(?i)\b(?:(?:SELECT|INSERT|UPDATE|DELETE|CREATE|DROP|ALTER)\s|WITH\s+(?:RECURSIVE\s+)?\w+\s*(?:\([^)]*\)\s*)?AS\s*\()",
        )
        .expect("valid sql statement pattern")
    })
}

pub fn extract_sql(text: &str) -> SqlExtraction {
    if let Some(caps) = sql_fence().captures(text) {
        let sql = caps[1].trim();
        if !sql.is_empty() {
            return SqlExtraction::Sql(sql.to_string());
        }
    }

    if let Some(found) = sql_statement().find(text) {
        let sql = text[found.start()..].trim().trim_end_matches("```").trim();
        return SqlExtraction::Sql(sql.to_string());
    }

    let lower = text.to_lowercase();
    if lower.contains("database schema:") || (lower.contains("table:") && lower.contains("columns:"))
    {
        return SqlExtraction::SchemaDescription(text.trim().to_string());
    }
    SqlExtraction::Missing
}

#[derive(Debug, Deserialize)]
struct ValidatorReply {
    status: String,
    #[serde(default)]
    feedback: Option<String>,
}

/// Parse the validator's structured reply. Anything unreadable is `Unknown`.
pub fn parse_validation(raw: &str) -> (ValidationStatus, String) {
    match serde_json::from_str::<ValidatorReply>(json_candidate(raw)) {
        Ok(reply) => {
            let status = match reply.status.trim().to_lowercase().as_str() {
                "valid" => ValidationStatus::Valid,
                "invalid" => ValidationStatus::Invalid,
                _ => ValidationStatus::Unknown,
            };
            (status, reply.feedback.unwrap_or_default())
        }
        Err(e) => (
            ValidationStatus::Unknown,
            format!("Validator reply could not be parsed: {}", e),
        ),
    }
}

pub struct DataTeam {
    database: Option<Arc<dyn SqlDatabase>>,
    max_retries: u32,
}

impl DataTeam {
    pub fn new(database: Option<Arc<dyn SqlDatabase>>, max_retries: u32) -> Self {
        Self {
            database,
            max_retries,
        }
    }

    async fn fetch_schema(&self, ctx: &WorkerContext<'_>) -> Result<String, WorkflowError> {
        let db = self
            .database
            .as_ref()
            .ok_or_else(|| WorkflowError::Tool("No database is configured".to_string()))?;
        ctx.tracer
            .tool("get_database_schema", &serde_json::json!({}), ctx.guard(), db.schema())
            .await
    }

    fn generation_request(
        &self,
        ctx: &WorkerContext<'_>,
        schema: &str,
        query: &str,
        sql: &SqlRetryState,
    ) -> Result<ChatRequest, WorkflowError> {
        let feedback = if sql.retries > 0 {
            format!(
                "# Previous Attempt\n\nThis SQL was rejected:\n\n```sql\n{}\n```\n\nFeedback: {}\n\nFix these problems in your new query.",
                sql.generated_sql.as_deref().unwrap_or_default(),
                sql.validation_feedback
            )
        } else {
            String::new()
        };
        let mut vars = PromptVars::new();
        vars.insert("DATABASE_SCHEMA", schema.to_string());
        vars.insert("USER_QUERY", query.to_string());
        vars.insert("RETRY_FEEDBACK", feedback);
        let system = ctx.prompts.render(SQL_GENERATOR, &vars)?;
        Ok(ChatRequest::new(vec![
            Message::system(system),
            Message::user(query),
        ]))
    }

    async fn validate(
        &self,
        ctx: &WorkerContext<'_>,
        schema: &str,
        generated: &str,
    ) -> Result<(ValidationStatus, String), WorkflowError> {
        let mut vars = PromptVars::new();
        vars.insert("DATABASE_SCHEMA", schema.to_string());
        vars.insert("GENERATED_SQL", generated.to_string());
        let system = ctx.prompts.render(SQL_VALIDATOR, &vars)?;
        let raw = ctx
            .generate(ChatRequest::new(vec![Message::system(system)]).json())
            .await?;
        Ok(parse_validation(&raw))
    }

    async fn execute(&self, ctx: &WorkerContext<'_>, sql: &str) -> Result<QueryResult, WorkflowError> {
        let db = self
            .database
            .as_ref()
            .ok_or_else(|| WorkflowError::Tool("No database is configured".to_string()))?;
        ctx.tracer
            .tool("execute_sql_query", sql, ctx.guard(), db.execute(sql))
            .await
    }

    /// Generate, validate and execute, bounded by `max_retries` regenerations.
    pub async fn run_sql_loop(
        &self,
        ctx: &WorkerContext<'_>,
        query: &str,
    ) -> Result<SqlRetryState, WorkflowError> {
        let mut sql = SqlRetryState::default();

        let schema = match self.fetch_schema(ctx).await {
            Ok(schema) => schema,
            Err(e) if e.is_interruption() => return Err(e),
            Err(e) => {
                sql.error_message = Some(format!("Failed to load database schema: {}", e));
                return Ok(sql);
            }
        };

        loop {
            let request = self.generation_request(ctx, &schema, query, &sql)?;
            let raw = match ctx.generate(request).await {
                Ok(raw) => raw,
                Err(e) if e.is_interruption() => return Err(e),
                Err(e) => {
                    sql.error_message = Some(format!("SQL generation failed: {}", e));
                    return Ok(sql);
                }
            };

            let generated = match extract_sql(&raw) {
                SqlExtraction::Sql(generated) => generated,
                SqlExtraction::SchemaDescription(text) => {
                    sql.query_type = QueryType::SchemaDescription;
                    sql.validation_status = ValidationStatus::Valid;
                    sql.schema_answer = Some(text);
                    return Ok(sql);
                }
                SqlExtraction::Missing => {
                    sql.error_message = Some("Could not extract a SQL query from the response".to_string());
                    return Ok(sql);
                }
            };
            tracing::debug!("[DataTeam] Generated SQL (attempt {}): {}", sql.retries + 1, generated);
            sql.generated_sql = Some(generated.clone());

            // A failed validator call counts as an unknown verdict and
            // consumes a retry like any other rejection.
            let (status, feedback) = match self.validate(ctx, &schema, &generated).await {
                Ok(result) => result,
                Err(e) if e.is_interruption() => return Err(e),
                Err(e) => {
                    tracing::warn!("[DataTeam] Validator call failed: {}", e);
                    (ValidationStatus::Unknown, format!("Validator call failed: {}", e))
                }
            };
            sql.validation_status = status;
            sql.validation_feedback = feedback;

            if status == ValidationStatus::Valid {
                match self.execute(ctx, &generated).await {
                    Ok(result) => sql.execution_result = Some(result),
                    Err(e) if e.is_interruption() => return Err(e),
                    Err(e) => sql.error_message = Some(format!("SQL execution failed: {}", e)),
                }
                return Ok(sql);
            }

            if sql.retries >= self.max_retries {
                tracing::warn!(
                    "[DataTeam] Giving up after {} retries: {}",
                    sql.retries,
                    sql.validation_feedback
                );
                sql.error_message = Some(format!(
                    "SQL validation failed after {} retries: {}",
                    sql.retries, sql.validation_feedback
                ));
                return Ok(sql);
            }
            sql.retries += 1;
            tracing::info!(
                "[DataTeam] SQL rejected ({:?}), regenerating ({}/{})",
                status,
                sql.retries,
                self.max_retries
            );
        }
    }

    async fn format(&self, ctx: &WorkerContext<'_>, query: &str, sql: &SqlRetryState) -> String {
        let raw_results = match (&sql.schema_answer, &sql.execution_result) {
            (Some(answer), _) => answer.clone(),
            (None, Some(result)) => result.render(),
            (None, None) => String::new(),
        };
        let mut vars = PromptVars::new();
        vars.insert("USER_QUERY", query.to_string());
        vars.insert("QUERY_TYPE", sql.query_type.as_str().to_string());
        vars.insert("GENERATED_SQL", sql.generated_sql.clone().unwrap_or_default());
        vars.insert("RAW_RESULTS", raw_results.clone());
        vars.insert("ERROR_MESSAGE", sql.error_message.clone().unwrap_or_else(|| "None".to_string()));

        let formatted = match ctx.prompts.render(SQL_FORMATTER, &vars) {
            Ok(system) => ctx
                .generate(ChatRequest::new(vec![Message::system(system)]))
                .await
                .ok()
                .filter(|text| !text.trim().is_empty()),
            Err(_) => None,
        };
        formatted.unwrap_or_else(|| {
            tracing::warn!("[DataTeam] Formatter unavailable, using plain template");
            fallback_format(sql, &raw_results)
        })
    }
}

fn fallback_format(sql: &SqlRetryState, raw_results: &str) -> String {
    if let Some(error) = &sql.error_message {
        let mut out = format!("I could not answer this question from the database.\n\n**Error:** {}", error);
        if let Some(generated) = &sql.generated_sql {
            out.push_str(&format!("\n\n**Last SQL attempt:**\n```sql\n{}\n```", generated));
        }
        return out;
    }
    match sql.query_type {
        QueryType::SchemaDescription => raw_results.to_string(),
        QueryType::Sql => format!(
            "**Query:**\n```sql\n{}\n```\n\n**Results:**\n\n{}",
            sql.generated_sql.as_deref().unwrap_or_default(),
            raw_results
        ),
    }
}

#[async_trait]
impl WorkerCapability for DataTeam {
    async fn invoke(&self, ctx: &WorkerContext<'_>) -> Result<WorkerOutcome, WorkflowError> {
        let query = ctx
            .state
            .last_user_message()
            .map(|m| m.content.clone())
            .unwrap_or_default();
        tracing::info!("[DataTeam] Answering: {}", query);

        let sql = self.run_sql_loop(ctx, &query).await?;
        let mut content = self.format(ctx, &query, &sql).await;
        if let Some(error) = &sql.error_message {
            if !content.contains(error.as_str()) {
                content.push_str(&format!("\n\nError: {}", error));
            }
        }
        content.push_str(&format!("\n\nsql_retries: {}", sql.retries));

        tracing::info!(
            "[DataTeam] Done (status: {:?}, sql_retries: {}, error: {})",
            sql.validation_status,
            sql.retries,
            sql.error_message.is_some()
        );
        Ok(WorkerOutcome {
            content,
            biomedical_findings: None,
            sql_retries: Some(sql.retries),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_fenced_sql() {
        let text = "Here you go:\n```sql\nSELECT name FROM customers;\n```\nThis lists names.";
        assert_eq!(
            extract_sql(text),
            SqlExtraction::Sql("SELECT name FROM customers;".into())
        );
        assert_eq!(
            extract_sql("```SQL\nselect 1\n```"),
            SqlExtraction::Sql("select 1".into())
        );
    }

    #[test]
    fn test_extract_raw_keyword() {
        assert_eq!(
            extract_sql("The query is: select count(*) from orders"),
            SqlExtraction::Sql("select count(*) from orders".into())
        );
        assert_eq!(
            extract_sql("WITH t AS (SELECT 1) SELECT * FROM t"),
            SqlExtraction::Sql("WITH t AS (SELECT 1) SELECT * FROM t".into())
        );
    }

    #[test]
    fn test_extract_schema_and_missing() {
        assert!(matches!(
            extract_sql("Database schema:\nTable: customers\nColumns: id, name"),
            SqlExtraction::SchemaDescription(_)
        ));
        assert_eq!(extract_sql("I am not sure."), SqlExtraction::Missing);
    }

    #[test]
    fn test_extract_ignores_keywords_inside_words_and_prose() {
        assert_eq!(
            extract_sql("I'm not sure what to do with this request."),
            SqlExtraction::Missing
        );
        assert_eq!(extract_sql("The reselected rows look fine."), SqlExtraction::Missing);
        assert_eq!(
            extract_sql("with recursive n(x) as (select 1) select x from n"),
            SqlExtraction::Sql("with recursive n(x) as (select 1) select x from n".into())
        );
    }

    #[test]
    fn test_extract_prefers_sql_over_schema_text() {
        let text = "Table: customers\nColumns: id, name\n\nSELECT name FROM customers";
        assert_eq!(
            extract_sql(text),
            SqlExtraction::Sql("SELECT name FROM customers".into())
        );
    }

    #[test]
    fn test_parse_validation() {
        assert_eq!(
            parse_validation(r#"{"status":"valid","feedback":""}"#),
            (ValidationStatus::Valid, String::new())
        );
        assert_eq!(
            parse_validation("```json\n{\"status\":\"INVALID\",\"feedback\":\"no table x\"}\n```"),
            (ValidationStatus::Invalid, "no table x".to_string())
        );
        assert_eq!(parse_validation(r#"{"status":"error"}"#).0, ValidationStatus::Unknown);
        assert_eq!(parse_validation("looks fine").0, ValidationStatus::Unknown);
    }

    #[test]
    fn test_fallback_format() {
        let mut sql = SqlRetryState {
            generated_sql: Some("SELECT 1".into()),
            ..Default::default()
        };
        assert!(fallback_format(&sql, "| 1 |").contains("**Results:**"));
        sql.error_message = Some("boom".into());
        let text = fallback_format(&sql, "");
        assert!(text.contains("boom"));
        assert!(text.contains("SELECT 1"));
    }
}
