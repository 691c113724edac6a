use corex_providers::ToolDescriptor;
use corex_types::{ExecutionPath, RoutingDecision};
use std::collections::HashMap;

const DATA_FILE_EXTENSIONS: &[&str] = &[".csv", ".json", ".parquet", ".xlsx", ".tsv", ".jsonl"];
const STRUCTURED_VERBS: &[&str] =
    &["query", "aggregate", "transform", "filter", "sort", "join", "compute", "pivot", "merge"];
const TABLE_TERMS: &[&str] = &["table", "dataframe", "rows", "columns", "array", "matrix", "spreadsheet"];

/// Per-user-turn decision between skill / sandboxed-code / reasoning paths.
/// Thresholds are mutable at runtime so a caller can A/B different gates
/// without rebuilding the router. The router only decides; it never
/// executes the chosen path itself.
pub struct ExecutionRouter {
    skill_confidence_threshold: f64,
    structured_task_threshold: f64,
    decision_counts: HashMap<ExecutionPath, u64>,
}

impl ExecutionRouter {
    pub fn new(skill_confidence_threshold: f64, structured_task_threshold: f64) -> Self {
        Self { skill_confidence_threshold, structured_task_threshold, decision_counts: HashMap::new() }
    }

    pub fn set_thresholds(&mut self, skill_confidence_threshold: f64, structured_task_threshold: f64) {
        self.skill_confidence_threshold = skill_confidence_threshold;
        self.structured_task_threshold = structured_task_threshold;
    }

    pub fn decision_counts(&self) -> &HashMap<ExecutionPath, u64> {
        &self.decision_counts
    }

    /// Deterministic, in order: skill match, then structured-task
    /// detection, then reasoning as the catch-all.
    pub fn route(&mut self, turn_text: &str, skills: &[ToolDescriptor]) -> RoutingDecision {
        let decision = if let Some((skill, confidence)) = best_skill_match(turn_text, skills) {
            if confidence >= self.skill_confidence_threshold {
                RoutingDecision::new(
                    ExecutionPath::Skill,
                    confidence,
                    format!("matched skill '{skill}' with confidence {confidence:.2}"),
                )
                .with_fallback(ExecutionPath::SandboxedCode)
            } else {
                self.route_structured_or_reasoning(turn_text)
            }
        } else {
            self.route_structured_or_reasoning(turn_text)
        };

        *self.decision_counts.entry(decision.path).or_insert(0) += 1;
        decision
    }

    fn route_structured_or_reasoning(&self, turn_text: &str) -> RoutingDecision {
        let score = structured_task_score(turn_text);
        if score >= self.structured_task_threshold {
            RoutingDecision::new(ExecutionPath::SandboxedCode, score, format!("structured-task score {score:.2}"))
                .with_fallback(ExecutionPath::Reasoning)
        } else {
            RoutingDecision::new(ExecutionPath::Reasoning, 1.0 - score, format!("structured-task score {score:.2} below threshold"))
        }
    }
}

/// Keyword-overlap skill matcher: a skill's confidence is the fraction of
/// its own name+description tokens that also appear in the turn text.
/// Registration in the Tool Registry is the startup verification the spec
/// calls for ("skill is verified executable") — an unregistered skill
/// can't be matched at all.
fn best_skill_match(turn_text: &str, skills: &[ToolDescriptor]) -> Option<(String, f64)> {
    let turn_tokens = tokenize(turn_text);
    skills
        .iter()
        .map(|skill| {
            let skill_tokens = tokenize(&format!("{} {}", skill.name, skill.description));
            let confidence = if skill_tokens.is_empty() {
                0.0
            } else {
                let matched = skill_tokens.iter().filter(|t| turn_tokens.contains(*t)).count();
                matched as f64 / skill_tokens.len() as f64
            };
            (skill.name.clone(), confidence)
        })
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .filter(|(_, confidence)| *confidence > 0.0)
}

fn structured_task_score(text: &str) -> f64 {
    let lower = text.to_lowercase();
    let mut matched_categories = 0u32;

    if DATA_FILE_EXTENSIONS.iter().any(|ext| lower.contains(ext)) {
        matched_categories += 1;
    }
    if STRUCTURED_VERBS.iter().any(|verb| lower.contains(verb)) {
        matched_categories += 1;
    }
    if lower.contains("```") {
        matched_categories += 1;
    }
    if TABLE_TERMS.iter().any(|term| lower.contains(term)) {
        matched_categories += 1;
    }

    matched_categories as f64 / 4.0
}

fn tokenize(text: &str) -> std::collections::HashSet<String> {
    text.to_lowercase().split_whitespace().map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_string()).filter(|w| !w.is_empty()).collect()
}
