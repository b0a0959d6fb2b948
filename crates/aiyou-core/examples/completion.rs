use aiyou_core::{AiYouClient, ClientOptions};
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    println!("AI.You Completion Example");
    println!("=========================\n");

    // Set AIYOU_API_KEY before running; AIYOU_DEBUG=1 logs every request
    let token = std::env::var("AIYOU_API_KEY")?;
    let options = ClientOptions::from_env()?
        .with_temperature(0.7)
        .with_system_prompt("You are a concise assistant.")
        .with_retry(3, Duration::from_secs(1));
    let client = AiYouClient::new(token, options)?;

    let model = std::env::var("AIYOU_MODEL").unwrap_or_else(|_| "gpt-4o".to_string());
    let answer = client
        .completion(&model, "What is the capital of France?")
        .await?;
    println!("Assistant: {answer}");

    // The same call, answered through a server-sent-event stream
    let streaming = AiYouClient::new(
        std::env::var("AIYOU_API_KEY")?,
        client.options().clone().with_stream(true),
    )?;
    let answer = streaming
        .completion(&model, "Name three rivers in France.")
        .await?;
    println!("Assistant (aggregated stream): {answer}");

    Ok(())
}
