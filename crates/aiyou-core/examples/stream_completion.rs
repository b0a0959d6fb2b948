use aiyou_core::AiYouClient;
use futures::StreamExt;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    println!("AI.You Streaming Example");
    println!("========================\n");

    let client = AiYouClient::from_env()?;
    let model = std::env::var("AIYOU_MODEL").unwrap_or_else(|_| "gpt-4o".to_string());

    let mut stream = client
        .completion_stream(&model, "Tell me a short joke about programming.")
        .await?;

    print!("Assistant: ");
    while let Some(fragment) = stream.next().await {
        match fragment {
            Ok(text) => {
                print!("{text}");
                std::io::Write::flush(&mut std::io::stdout())?;
            }
            Err(e) => {
                println!("\nStream error: {e}");
                break;
            }
        }
    }
    println!("\nStream completed");

    Ok(())
}
