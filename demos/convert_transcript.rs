//! Converts a stored chat transcript into a Bedrock Converse request body.
//!
//! ```bash
//! cargo run --example convert_transcript
//! LOUD_WIRE=1 RUST_LOG=converse_rs=debug cargo run --example convert_transcript
//! ```

use converse_rs::{ToolResultMatching, TranscriptConverter};
use serde_json::json;
use std::error::Error;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    // 1. A transcript as the chat application stores it: a system prompt, a user
    //    question, an assistant turn that called two tools, and a follow-up the user
    //    sent before the assistant answered.
    let transcript = json!([
        {"role": "system", "content": "You are a travel assistant. Use tools for live data."},
        {"role": "user", "content": "Is it warmer in Lisbon or Madrid right now?"},
        {
            "role": "assistant",
            "content": [
                {"type": "text", "text": "Checking both cities."},
                {"type": "tool-call", "toolCallId": "call_lis", "toolName": "weather", "args": {"city": "Lisbon"}},
                {"type": "tool-call", "toolCallId": "call_mad", "toolName": "weather", "args": {"city": "Madrid"}}
            ],
            "toolInvocations": [
                {"toolCallId": "call_lis", "toolName": "weather", "state": "result", "result": {"celsius": 21}},
                {"toolCallId": "call_mad", "toolName": "weather", "state": "result", "result": {"celsius": 25}}
            ]
        },
        {"role": "user", "content": ["Also, which one is sunnier?", {"type": "image", "url": "https://example.com/map.png"}]}
    ]);

    // 2. Default policy: only the most recent tool call is answered.
    let converter = TranscriptConverter::default();
    let payload = converter.convert_value(transcript.clone())?;
    println!("--- MostRecent ---");
    println!("{}", serde_json::to_string_pretty(&payload)?);

    // 3. Answer every outstanding tool call instead.
    let converter = TranscriptConverter::builder()
        .tool_result_matching(ToolResultMatching::AllPending)
        .build();
    let payload = converter.convert_value(transcript)?;
    println!("\n--- AllPending ---");
    println!("{}", serde_json::to_string_pretty(&payload)?);

    // 4. Rejected transcripts explain why.
    match converter.convert_json(r#"[{"role": "assistant", "content": "Hello!"}]"#) {
        Ok(_) => println!("\nunexpectedly accepted"),
        Err(e) => println!("\nRejected: {e}"),
    }

    Ok(())
}
