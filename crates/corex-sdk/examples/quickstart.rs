//! Quickstart example: run a goal to completion against a mock model.
//!
//! Run with: cargo run -p corex-sdk --example quickstart

use corex_sdk::{Client, EventPayload, ModelProvider};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let provider = ModelProvider::Mock(Default::default());

    let client = Client::builder()
        .workspace_root(dir.path().to_path_buf())
        .provider(provider)
        .build()
        .await?;

    let mut run = client.run("say hello to the user");
    println!("started run {}", run.session_id());

    while let Some(event) = run.recv().await {
        match event.payload {
            EventPayload::TaskStart { title, .. } => println!("  task started: {title}"),
            EventPayload::TaskComplete { title, .. } => println!("  task completed: {title}"),
            EventPayload::Done { status, .. } => {
                println!("  run finished: {status:?}");
                break;
            }
            _ => {}
        }
    }

    Ok(())
}
