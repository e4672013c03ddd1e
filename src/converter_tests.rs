//! Unit tests for transcript conversion: invariants, repairs, and tool-result splicing.

use super::*;
use serde_json::{Value, json};

fn texts(message: &Message) -> Vec<&str> {
    message
        .content
        .iter()
        .filter_map(WireContent::as_text)
        .collect()
}

fn roles(result: &ConversionResult) -> Vec<MessageRole> {
    result.messages.iter().map(|m| m.role).collect()
}

// --- Invariant checks ---

#[test]
fn test_single_system_message_passthrough() {
    let result = convert(&[Turn::system("S"), Turn::user("hi")]).unwrap();

    assert_eq!(result.system(), Some("S"));
    assert_eq!(
        result.messages,
        vec![Message::text(MessageRole::User, "hi")]
    );
}

#[test]
fn test_no_system_message_is_none() {
    let result = convert(&[Turn::user("hi")]).unwrap();
    assert_eq!(result.system(), None);
}

#[test]
fn test_multiple_system_messages_rejected() {
    let err = convert(&[Turn::system("a"), Turn::system("b"), Turn::user("hi")]).unwrap_err();
    assert_eq!(
        err.violation(),
        Some(TranscriptViolation::MultipleSystemMessages)
    );
    assert!(err.to_string().contains("multiple system messages are not supported"));
}

#[test]
fn test_system_messages_anywhere_are_counted() {
    let err = convert(&[
        Turn::system("a"),
        Turn::user("hi"),
        Turn::assistant("hello"),
        Turn::system("late"),
    ])
    .unwrap_err();
    assert_eq!(
        err.violation(),
        Some(TranscriptViolation::MultipleSystemMessages)
    );
}

#[test]
fn test_assistant_first_rejected() {
    let err = convert(&[Turn::assistant("hi")]).unwrap_err();
    assert_eq!(err.violation(), Some(TranscriptViolation::MissingLeadingUser));
    assert!(
        err.to_string()
            .contains("conversation must start with a user message after any system messages")
    );
}

#[test]
fn test_system_then_assistant_rejected() {
    let err = convert(&[Turn::system("s"), Turn::assistant("hi")]).unwrap_err();
    assert_eq!(err.violation(), Some(TranscriptViolation::MissingLeadingUser));
}

#[test]
fn test_empty_transcript_rejected() {
    let err = convert(&[]).unwrap_err();
    assert_eq!(err.violation(), Some(TranscriptViolation::MissingLeadingUser));
}

#[test]
fn test_system_only_transcript_rejected() {
    let err = convert(&[Turn::system("s")]).unwrap_err();
    assert_eq!(err.violation(), Some(TranscriptViolation::MissingLeadingUser));
}

#[test]
fn test_leading_role_check_takes_precedence() {
    // Both rules are broken; the leading-role check runs first.
    let err = convert(&[
        Turn::system("a"),
        Turn::system("b"),
        Turn::assistant("hi"),
    ])
    .unwrap_err();
    assert_eq!(err.violation(), Some(TranscriptViolation::MissingLeadingUser));
}

// --- Alternation repair ---

#[test]
fn test_consecutive_user_turns_get_filler() {
    let result = convert(&[Turn::user("a"), Turn::user("b")]).unwrap();

    assert_eq!(
        result.messages,
        vec![
            Message::text(MessageRole::User, "a"),
            Message::text(MessageRole::Assistant, "I understand."),
            Message::text(MessageRole::User, "b"),
        ]
    );
}

#[test]
fn test_three_user_turns_get_two_fillers() {
    let result = convert(&[Turn::user("a"), Turn::user("b"), Turn::user("c")]).unwrap();
    assert_eq!(
        roles(&result),
        vec![
            MessageRole::User,
            MessageRole::Assistant,
            MessageRole::User,
            MessageRole::Assistant,
            MessageRole::User,
        ]
    );
}

#[test]
fn test_consecutive_assistant_turns_not_repaired() {
    let result = convert(&[
        Turn::user("a"),
        Turn::assistant("b"),
        Turn::assistant("c"),
    ])
    .unwrap();
    assert_eq!(
        roles(&result),
        vec![
            MessageRole::User,
            MessageRole::Assistant,
            MessageRole::Assistant,
            MessageRole::User,
        ]
    );
}

#[test]
fn test_system_between_users_does_not_break_repair() {
    let result = convert(&[Turn::user("a"), Turn::system("s"), Turn::user("b")]).unwrap();
    assert_eq!(result.system(), Some("s"));
    assert_eq!(result.messages.len(), 3);
    assert_eq!(texts(&result.messages[1]), vec!["I understand."]);
}

// --- Trailing-turn repair ---

#[test]
fn test_trailing_user_left_unchanged() {
    let result = convert(&[Turn::user("hi")]).unwrap();
    assert_eq!(
        result.last_message(),
        Some(&Message::text(MessageRole::User, "hi"))
    );
    assert_eq!(result.messages.len(), 1);
}

#[test]
fn test_trailing_assistant_gets_continue() {
    let result = convert(&[Turn::user("hi"), Turn::assistant("there")]).unwrap();
    assert_eq!(
        result.messages,
        vec![
            Message::text(MessageRole::User, "hi"),
            Message::text(MessageRole::Assistant, "there"),
            Message::text(MessageRole::User, "Continue."),
        ]
    );
}

// --- Tool round trip ---

fn tool_call_turn(id: &str) -> Turn {
    Turn::assistant(vec![ContentPart::tool_call(id, "lookup", json!({"q": "x"}))])
}

#[test]
fn test_tool_result_spliced_after_assistant() {
    let result = convert(&[
        Turn::user("look it up"),
        tool_call_turn("t1").with_tool_invocation(ToolInvocation::result("t1", json!({"v": 1}))),
    ])
    .unwrap();

    assert_eq!(result.messages.len(), 3);
    assert_eq!(
        result.messages[1],
        Message::new(
            MessageRole::Assistant,
            vec![WireContent::tool_use("t1", "lookup", json!({"q": "x"}))]
        )
    );
    assert_eq!(
        result.messages[2],
        Message::new(
            MessageRole::User,
            vec![WireContent::ToolResult {
                tool_use_id: "t1".to_string(),
                content: vec![ToolResultContent::Text("{\"v\":1}".to_string())],
            }]
        )
    );
}

#[test]
fn test_tool_result_clears_pending_id() {
    let result = convert(&[
        Turn::user("look it up"),
        tool_call_turn("t1").with_tool_invocation(ToolInvocation::result("t1", json!({"v": 1}))),
        Turn::user("again?"),
        Turn::assistant("no").with_tool_invocation(ToolInvocation::result("t1", json!({"v": 2}))),
    ])
    .unwrap();

    let tool_results = result
        .messages
        .iter()
        .flat_map(|m| m.content.iter())
        .filter(|block| block.is_tool_result())
        .count();
    assert_eq!(tool_results, 1, "Second result for t1 must be ignored");
}

#[test]
fn test_user_after_tool_result_gets_filler() {
    let result = convert(&[
        Turn::user("look it up"),
        tool_call_turn("t1").with_tool_invocation(ToolInvocation::result("t1", json!(1))),
        Turn::user("thanks"),
    ])
    .unwrap();

    assert_eq!(
        roles(&result),
        vec![
            MessageRole::User,
            MessageRole::Assistant,
            MessageRole::User,
            MessageRole::Assistant,
            MessageRole::User,
        ]
    );
    assert_eq!(texts(&result.messages[3]), vec!["I understand."]);
}

#[test]
fn test_tool_result_satisfies_trailing_rule() {
    let result = convert(&[
        Turn::user("q"),
        tool_call_turn("t1").with_tool_invocation(ToolInvocation::result("t1", json!(null))),
    ])
    .unwrap();
    let last = result.last_message().unwrap();
    assert!(last.content[0].is_tool_result());
    assert!(!texts(last).contains(&"Continue."));
}

#[test]
fn test_non_result_invocations_ignored() {
    let result = convert(&[
        Turn::user("q"),
        tool_call_turn("t1").with_tool_invocation(ToolInvocation::call("t1")),
    ])
    .unwrap();
    // user, assistant(toolUse), Continue.
    assert_eq!(result.messages.len(), 3);
    assert_eq!(texts(&result.messages[2]), vec!["Continue."]);
}

#[test]
fn test_unmatched_invocation_ignored() {
    let result = convert(&[
        Turn::user("q"),
        tool_call_turn("t1").with_tool_invocation(ToolInvocation::result("other", json!(1))),
    ])
    .unwrap();
    assert!(
        result
            .messages
            .iter()
            .flat_map(|m| m.content.iter())
            .all(|block| !block.is_tool_result())
    );
}

#[test]
fn test_invocation_without_pending_tool_use_ignored() {
    let result = convert(&[
        Turn::user("q").with_tool_invocation(ToolInvocation::result("t1", json!(1))),
    ])
    .unwrap();
    assert_eq!(result.messages, vec![Message::text(MessageRole::User, "q")]);
}

#[test]
fn test_result_on_later_turn_matches_pending() {
    // The pending id survives across turns until answered.
    let result = convert(&[
        Turn::user("q"),
        tool_call_turn("t1"),
        Turn::user("here it is").with_tool_invocation(ToolInvocation::result("t1", json!("ok"))),
    ])
    .unwrap();
    assert_eq!(
        roles(&result),
        vec![
            MessageRole::User,
            MessageRole::Assistant,
            MessageRole::User,
            MessageRole::User,
        ]
    );
    assert!(result.messages[3].content[0].is_tool_result());
}

#[test]
fn test_multiple_tool_calls_last_one_wins() {
    let turn = Turn::assistant(vec![
        ContentPart::tool_call("a", "fetch", json!({})),
        ContentPart::tool_call("b", "fetch", json!({})),
    ])
    .with_tool_invocations(vec![
        ToolInvocation::result("a", json!(1)),
        ToolInvocation::result("b", json!(2)),
    ]);
    let result = convert(&[Turn::user("q"), turn]).unwrap();

    assert_eq!(result.tool_use_ids(), vec!["a", "b"]);
    assert_eq!(result.messages.len(), 3);
    match &result.messages[2].content[0] {
        WireContent::ToolResult { tool_use_id, .. } => assert_eq!(tool_use_id, "b"),
        other => panic!("Expected ToolResult, got {:?}", other),
    }
}

#[test]
fn test_all_pending_matches_every_call() {
    let turn = Turn::assistant(vec![
        ContentPart::tool_call("a", "fetch", json!({})),
        ContentPart::tool_call("b", "fetch", json!({})),
    ])
    .with_tool_invocations(vec![
        ToolInvocation::result("b", json!(2)),
        ToolInvocation::result("a", json!(1)),
        ToolInvocation::result("a", json!(1)),
    ]);
    let converter = TranscriptConverter::builder()
        .tool_result_matching(ToolResultMatching::AllPending)
        .build();
    let result = converter.convert(&[Turn::user("q"), turn]).unwrap();

    let answered: Vec<&str> = result
        .messages
        .iter()
        .flat_map(|m| m.content.iter())
        .filter_map(|block| match block {
            WireContent::ToolResult { tool_use_id, .. } => Some(tool_use_id.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(answered, vec!["b", "a"], "Each call answered once, in invocation order");
}

// --- Content normalization ---

#[test]
fn test_unknown_parts_dropped_without_breaking_turn() {
    let turn = Turn::user(vec![
        ContentPart::text("before"),
        ContentPart::Unknown {
            part_type: "image".to_string(),
            data: json!({"type": "image", "url": "https://example.com/cat.png"}),
        },
        ContentPart::text("after"),
    ]);
    let result = convert(&[turn]).unwrap();
    assert_eq!(texts(&result.messages[0]), vec!["before", "after"]);
    assert_eq!(result.messages[0].content.len(), 2);
}

#[test]
fn test_empty_parts_still_emit_message() {
    let result = convert(&[Turn::user(Vec::<ContentPart>::new())]).unwrap();
    assert_eq!(result.messages.len(), 1);
    assert!(result.messages[0].content.is_empty());
}

#[test]
fn test_text_and_tool_call_keep_order() {
    let turn = Turn::assistant(vec![
        ContentPart::text("Let me check."),
        ContentPart::tool_call("t1", "lookup", Value::Null),
    ]);
    let result = convert(&[Turn::user("q"), turn]).unwrap();
    let blocks = &result.messages[1].content;
    assert_eq!(blocks[0].as_text(), Some("Let me check."));
    assert!(blocks[1].is_tool_use());
}

// --- Configuration ---

#[test]
fn test_custom_filler_and_continuation() {
    let converter = TranscriptConverter::builder()
        .alternation_filler("Go on.")
        .continuation_prompt("Your turn.")
        .build();
    let result = converter
        .convert(&[Turn::user("a"), Turn::user("b"), Turn::assistant("c")])
        .unwrap();

    assert_eq!(texts(&result.messages[1]), vec!["Go on."]);
    assert_eq!(texts(result.last_message().unwrap()), vec!["Your turn."]);
}

// --- Determinism ---

#[test]
fn test_conversion_is_idempotent() {
    let turns = vec![
        Turn::system("s"),
        Turn::user("a"),
        Turn::user("b"),
        tool_call_turn("t1").with_tool_invocation(ToolInvocation::result("t1", json!({"k": [1, 2]}))),
        Turn::assistant("done"),
    ];
    let first = serde_json::to_string(&convert(&turns).unwrap()).unwrap();
    let second = serde_json::to_string(&convert(&turns).unwrap()).unwrap();
    assert_eq!(first, second);
}

// --- JSON entry points ---

#[test]
fn test_convert_json_rejects_malformed_json() {
    let err = TranscriptConverter::default()
        .convert_json("[{\"role\": ")
        .unwrap_err();
    assert!(matches!(err, ConverseError::Json(_)));
}

#[test]
fn test_convert_json_rejects_unknown_role() {
    let err = TranscriptConverter::default()
        .convert_json(r#"[{"role": "tool", "content": "x"}]"#)
        .unwrap_err();
    assert!(matches!(err, ConverseError::Json(_)));
}

#[test]
fn test_convert_value_reports_violation() {
    let err = TranscriptConverter::default()
        .convert_value(json!([{"role": "assistant", "content": "hi"}]))
        .unwrap_err();
    assert_eq!(err.violation(), Some(TranscriptViolation::MissingLeadingUser));
}
