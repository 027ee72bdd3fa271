//! Send one prompt and print the answer, streamed with `--stream`.
//!
//! Needs `OPEN_AI_API_KEY` in the environment.

use futures::StreamExt;
use goppy::{ApiClient, ChatMessage, ChatRequestBuilder};
use std::io::Write;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    goppy::init_logging();

    let stream = std::env::args().any(|arg| arg == "--stream");
    let prompt = std::env::args()
        .skip(1)
        .find(|arg| !arg.starts_with("--"))
        .unwrap_or_else(|| "Say hello in three languages.".to_string());

    let client = ApiClient::from_env()?;
    let request = ChatRequestBuilder::new(
        vec![
            ChatMessage::system("You are a concise assistant."),
            ChatMessage::user(prompt),
        ],
        "gpt-4o-mini",
    )
    .max_tokens(200)
    .build();

    if stream {
        let mut chunks = client.chat_stream(&request).await?;
        let mut stdout = std::io::stdout();
        while let Some(chunk) = chunks.next().await {
            if let Some(text) = chunk?.delta_content() {
                write!(stdout, "{text}")?;
                stdout.flush()?;
            }
        }
        println!();
    } else {
        let response = client.chat(&request).await?;
        println!("{}", response.get_content().unwrap_or_default());
        if let Some(usage) = response.usage {
            eprintln!(
                "tokens: prompt={} completion={} total={}",
                usage.prompt_tokens, usage.completion_tokens, usage.total_tokens
            );
        }
    }
    Ok(())
}
