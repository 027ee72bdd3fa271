//! Build a chat request and print its JSON body without sending it.

use goppy::{ApiClient, ChatMessage, ChatRequestBuilder};

fn main() -> anyhow::Result<()> {
    goppy::init_logging();

    let client = ApiClient::from_env()?;
    println!("{:?}", client.config());

    let request = ChatRequestBuilder::new(vec![ChatMessage::user("Hello!")], "gpt-4")
        .temperature(0.7)
        .top_p(0.9)
        .stream(true)
        .build();

    println!("{}", serde_json::to_string(&request)?);
    Ok(())
}
