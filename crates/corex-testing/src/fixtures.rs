//! Small builders for the JSON/text fragments a scripted
//! [`corex_providers::client::MockConfig`] needs to embed.

/// A minimal single-task plan JSON object, as the planner expects it back
/// from the model.
pub fn single_task_plan_json(task_id: &str, title: &str, acceptance_criterion: &str) -> String {
    format!(
        r#"{{"tasks": [{{"id": "{task_id}", "title": "{title}", "description": "{title}", "acceptance_criterion": "{acceptance_criterion}"}}]}}"#
    )
}

/// A two-task plan where the second task depends on the first, for
/// exercising the scheduler's dependency gating.
pub fn two_task_plan_json(first_id: &str, second_id: &str) -> String {
    format!(
        r#"{{"tasks": [
            {{"id": "{first_id}", "title": "first step", "description": "do the first step", "acceptance_criterion": "first step done"}},
            {{"id": "{second_id}", "title": "second step", "description": "do the second step", "acceptance_criterion": "second step done", "dependencies": ["{first_id}"]}}
        ]}}"#
    )
}

/// A `FINAL_ANSWER:` marker on its own line, which the task executor's
/// line scan requires. Callers concatenating this after other scripted
/// text need the leading `\n` — see [`crate::providers`] for why.
pub fn final_answer(text: &str) -> String {
    format!("\nFINAL_ANSWER: {text}")
}
