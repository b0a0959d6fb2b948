use aiyou_core::AiYouClient;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let client = AiYouClient::from_env()?;
    let models = client.list_models().await?;

    println!("{} models available:", models.len());
    for model in models {
        match model.context_window {
            Some(window) => println!("  {} (context window: {})", model.name, window.0),
            None => println!("  {}", model.name),
        }
    }

    Ok(())
}
