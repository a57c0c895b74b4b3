//! Terminal rendering of workflow events.

use std::io::{self, Write};

use console::style;

use baton_core::{Delta, WorkflowEvent};

const MAX_TOOL_RESULT_CHARS: usize = 200;

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let head: String = text.chars().take(max).collect();
    format!("{}…", head)
}

/// Writes events either as JSON lines or as a readable transcript.
pub struct EventRenderer {
    json: bool,
    /// Whether the cursor is mid-line after streamed content.
    mid_line: bool,
}

impl EventRenderer {
    pub fn new(json: bool) -> Self {
        Self {
            json,
            mid_line: false,
        }
    }

    pub fn render(&mut self, event: &WorkflowEvent, out: &mut impl Write) -> io::Result<()> {
        if self.json {
            let line = serde_json::to_string(event).map_err(io::Error::other)?;
            return writeln!(out, "{}", line);
        }

        match event {
            WorkflowEvent::StartOfWorkflow { workflow_id, .. } => {
                self.end_line(out)?;
                writeln!(out, "{}", style(format!("▶ workflow {}", workflow_id)).dim())?;
            }
            WorkflowEvent::StartOfAgent { agent_name, .. } => {
                self.end_line(out)?;
                writeln!(out, "\n{}", style(format!("[{}]", agent_name)).bold().cyan())?;
            }
            WorkflowEvent::Message { delta, .. } => {
                match delta {
                    Delta::Content(text) => write!(out, "{}", text)?,
                    Delta::ReasoningContent(text) => write!(out, "{}", style(text).dim())?,
                }
                self.mid_line = true;
                out.flush()?;
            }
            WorkflowEvent::ToolCall {
                tool_name,
                tool_input,
                ..
            } => {
                self.end_line(out)?;
                writeln!(
                    out,
                    "{}",
                    style(format!("  → {}({})", tool_name, tool_input)).yellow()
                )?;
            }
            WorkflowEvent::ToolCallResult {
                tool_name,
                tool_result,
                ..
            } => {
                self.end_line(out)?;
                let summary = truncate(&tool_result.to_string(), MAX_TOOL_RESULT_CHARS);
                writeln!(
                    out,
                    "{}",
                    style(format!("  ← {}: {}", tool_name, summary)).yellow()
                )?;
            }
            WorkflowEvent::EndOfWorkflow { workflow_id, .. } => {
                self.end_line(out)?;
                writeln!(out, "\n{}", style(format!("■ workflow {} finished", workflow_id)).dim())?;
            }
            WorkflowEvent::EndOfLlm { .. } => self.end_line(out)?,
            WorkflowEvent::StartOfLlm { .. } | WorkflowEvent::EndOfAgent { .. } => {}
        }
        Ok(())
    }

    fn end_line(&mut self, out: &mut impl Write) -> io::Result<()> {
        if self.mid_line {
            self.mid_line = false;
            writeln!(out)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render_all(json: bool, events: &[WorkflowEvent]) -> String {
        let mut renderer = EventRenderer::new(json);
        let mut out = Vec::new();
        for event in events {
            renderer.render(event, &mut out).unwrap();
        }
        String::from_utf8(out).unwrap()
    }

    fn sample() -> Vec<WorkflowEvent> {
        vec![
            WorkflowEvent::StartOfAgent {
                agent_name: "coder".into(),
                agent_id: "wf_coder_4".into(),
            },
            WorkflowEvent::Message {
                message_id: "m1".into(),
                delta: Delta::Content("forty".into()),
            },
            WorkflowEvent::Message {
                message_id: "m1".into(),
                delta: Delta::Content("-two".into()),
            },
            WorkflowEvent::EndOfLlm {
                agent_name: "coder".into(),
            },
            WorkflowEvent::EndOfWorkflow {
                workflow_id: "wf".into(),
                messages: None,
            },
        ]
    }

    #[test]
    fn test_json_lines() {
        let text = render_all(true, &sample());
        let lines: Vec<serde_json::Value> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0]["event"], "start_of_agent");
        assert_eq!(lines[1]["data"]["delta"]["content"], "forty");
        assert_eq!(lines[4]["event"], "end_of_workflow");
    }

    #[test]
    fn test_human_transcript() {
        let text = render_all(false, &sample());
        assert!(text.contains("[coder]"));
        assert!(text.contains("forty-two\n"));
        assert!(text.contains("workflow wf finished"));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdef", 3), "abc…");
    }
}
