use crate::error::{Error, Result};
use corex_providers::{ChatMessage, ChatRequest, ChatRole, ModelProvider, ToolDescriptor, client};
use corex_types::{Plan, Task, TaskId};
use serde::Deserialize;

#[derive(Debug, Clone)]
pub struct PlannerConfig {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Repair prompts attempted before a plan attempt reports `plan_failed`.
    pub max_repair_attempts: u32,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            model: "planner".into(),
            max_tokens: 2048,
            temperature: 0.2,
            max_repair_attempts: 3,
        }
    }
}

/// Context supplied to a replan call: the prior plan, which task failed,
/// why, and anything findings has recorded that bears on the repair.
pub struct RepairContext<'a> {
    pub prior_plan: &'a Plan,
    pub failed_task_id: &'a TaskId,
    pub error: &'a str,
    pub findings: &'a str,
}

/// Result of a replan attempt.
pub enum ReplanOutcome {
    Repaired(Plan),
    CannotReplan,
}

/// Decomposes a goal into an atomic task DAG by prompting a model and
/// validating the structure it returns, repairing up to a bounded number of
/// times before giving up.
pub struct AtomicPlanner {
    provider: ModelProvider,
    config: PlannerConfig,
}

impl AtomicPlanner {
    pub fn new(provider: ModelProvider, config: PlannerConfig) -> Self {
        Self { provider, config }
    }

    pub async fn plan(&self, goal: &str, tools: &[ToolDescriptor]) -> Result<Plan> {
        let mut last_error = String::new();
        for attempt in 0..=self.config.max_repair_attempts {
            let prompt = if attempt == 0 {
                compose_plan_prompt(goal, tools)
            } else {
                compose_repair_prompt(goal, tools, &last_error)
            };
            let text = self.complete(&prompt).await?;
            match parse_plan_response(goal, &text) {
                Ok(plan) => return Ok(plan),
                Err(err) => last_error = err.to_string(),
            }
        }
        Err(Error::PlanFailed(corex_types::Error::PlanValidationFailed(last_error)))
    }

    pub async fn replan(&self, ctx: RepairContext<'_>, tools: &[ToolDescriptor]) -> Result<ReplanOutcome> {
        let mut last_error = String::new();
        for attempt in 0..=self.config.max_repair_attempts {
            let prompt = compose_replan_prompt(&ctx, tools, attempt, &last_error);
            let text = self.complete(&prompt).await?;

            if text.trim_start().starts_with("CANNOT_REPLAN") {
                return Ok(ReplanOutcome::CannotReplan);
            }

            match parse_plan_response(&ctx.prior_plan.goal, &text) {
                Ok(candidate) => {
                    let merged = ctx.prior_plan.merge_preserving_progress(&candidate).map_err(Error::PlanFailed)?;
                    return Ok(ReplanOutcome::Repaired(merged));
                }
                Err(err) => last_error = err.to_string(),
            }
        }
        Ok(ReplanOutcome::CannotReplan)
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let request = ChatRequest {
            model: self.config.model.clone(),
            system: Some(PLANNER_SYSTEM_PROMPT.to_string()),
            messages: vec![ChatMessage { role: ChatRole::User, content: prompt.to_string() }],
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };
        let rx = self.provider.stream(request).await?;
        let (text, _input, _output) = client::collect(rx).await?;
        Ok(text)
    }
}

const PLANNER_SYSTEM_PROMPT: &str = "You decompose a goal into a minimal set of atomic, verifiable \
tasks. Respond with a single JSON object: {\"tasks\": [{\"id\", \"title\", \"description\", \
\"acceptance_criterion\", \"tool_hints\": [...], \"dependencies\": [...]}]}. No prose.";

fn compose_plan_prompt(goal: &str, tools: &[ToolDescriptor]) -> String {
    format!(
        "Goal: {goal}\n\nAvailable tools:\n{}\n\nEvery task must have exactly one verifiable acceptance criterion.",
        format_tool_list(tools)
    )
}

fn compose_repair_prompt(goal: &str, tools: &[ToolDescriptor], prior_error: &str) -> String {
    format!(
        "Goal: {goal}\n\nYour previous plan was rejected: {prior_error}\n\nAvailable tools:\n{}\n\n\
Return a corrected plan as the same JSON shape.",
        format_tool_list(tools)
    )
}

fn compose_replan_prompt(ctx: &RepairContext<'_>, tools: &[ToolDescriptor], attempt: u32, prior_error: &str) -> String {
    let mut prompt = format!(
        "Goal: {}\n\nTask '{}' failed: {}\n\nFindings so far:\n{}\n\nAvailable tools:\n{}\n\n\
Return a repaired plan preserving completed task ids and titles, or respond with exactly \
\"CANNOT_REPLAN\" if no repair is plausible.",
        ctx.prior_plan.goal, ctx.failed_task_id, ctx.error, ctx.findings, format_tool_list(tools)
    );
    if attempt > 0 {
        prompt.push_str(&format!("\n\nThe previous repair attempt was rejected: {prior_error}"));
    }
    prompt
}

fn format_tool_list(tools: &[ToolDescriptor]) -> String {
    if tools.is_empty() {
        return "(none registered)".to_string();
    }
    tools.iter().map(|t| format!("- {}: {}", t.name, t.description)).collect::<Vec<_>>().join("\n")
}

#[derive(Debug, Deserialize)]
struct RawPlan {
    tasks: Vec<RawTask>,
}

#[derive(Debug, Deserialize)]
struct RawTask {
    id: String,
    title: String,
    description: String,
    acceptance_criterion: String,
    #[serde(default)]
    tool_hints: Vec<String>,
    #[serde(default)]
    dependencies: Vec<String>,
}

fn parse_plan_response(goal: &str, text: &str) -> std::result::Result<Plan, corex_types::Error> {
    let json_slice = extract_json_object(text)
        .ok_or_else(|| corex_types::Error::PlanValidationFailed("response contained no JSON object".into()))?;
    let raw: RawPlan = serde_json::from_str(json_slice)
        .map_err(|e| corex_types::Error::PlanValidationFailed(format!("malformed plan JSON: {e}")))?;

    let tasks: Vec<Task> = raw
        .tasks
        .into_iter()
        .map(|r| {
            Task::new(TaskId::new(r.id), r.title, r.description, r.acceptance_criterion)
                .with_tool_hints(r.tool_hints)
                .with_dependencies(r.dependencies.into_iter().map(TaskId::new))
        })
        .collect();

    Plan::new(goal, tasks)
}

/// The model is prompted for bare JSON but may still wrap it in prose or a
/// fenced code block; take the first balanced `{...}` span.
fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0i32;
    for (offset, ch) in text[start..].char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}
