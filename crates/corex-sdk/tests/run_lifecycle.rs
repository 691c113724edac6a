use corex_providers::client::MockConfig;
use corex_sdk::{Client, EventPayload, ModelProvider, RunOutcome};

fn mock_provider() -> ModelProvider {
    ModelProvider::Mock(MockConfig {
        scripted_text: vec![
            r#"{"tasks": [{"id": "a", "title": "Greet", "description": "say hello", "acceptance_criterion": "contains hello"}]}"#.to_string(),
            "\nFINAL_ANSWER: hello there".to_string(),
        ],
    })
}

#[tokio::test]
async fn a_run_emits_task_and_done_events_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let client = Client::builder()
        .workspace_root(dir.path().to_path_buf())
        .provider(mock_provider())
        .build()
        .await
        .unwrap();

    let mut run = client.run("greet the user");

    let mut saw_task_start = false;
    let mut saw_done = false;
    while let Some(event) = run.recv().await {
        match event.payload {
            EventPayload::TaskStart { .. } => saw_task_start = true,
            EventPayload::Done { status, .. } => {
                assert!(saw_task_start, "task_start must precede done");
                assert_eq!(status, RunOutcome::Success);
                saw_done = true;
                break;
            }
            _ => {}
        }
    }
    assert!(saw_done);
}

#[tokio::test]
async fn cancelling_a_run_before_it_starts_its_first_task_still_terminates() {
    let dir = tempfile::tempdir().unwrap();
    let client = Client::builder()
        .workspace_root(dir.path().to_path_buf())
        .provider(mock_provider())
        .build()
        .await
        .unwrap();

    let mut run = client.run("greet the user");
    run.cancel();

    let mut terminal = None;
    while let Some(event) = run.recv().await {
        if let EventPayload::Done { status, .. } = event.payload {
            terminal = Some(status);
            break;
        }
    }
    assert!(terminal.is_some(), "a cancelled run must still emit a terminal done event");
}
