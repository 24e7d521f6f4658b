use std::time::Duration;

use base64::Engine as _;
use parley_core::config::{RemoteHost, RemoteHostsConfig};
use serde_json::json;

use super::*;
use crate::remote::{CallToolResult, RemoteConnector};
use crate::testing::{user_author, FakeConnector, FakeHost, FakeMessage};

struct Harness {
    ctx: ResponseContext,
    outbound: Arc<FakeMessage>,
    connector: Arc<FakeConnector>,
}

fn harness_with(outbound: FakeMessage, connector: FakeConnector) -> Harness {
    let outbound = Arc::new(outbound);
    let connector = Arc::new(connector);
    let hosts = RemoteHostsConfig {
        hosts: vec![RemoteHost {
            name: "img".into(),
            url: "http://img/mcp".into(),
        }],
    };
    let dyn_connector: Arc<dyn RemoteConnector> = connector.clone();
    let session = RemoteSession::new(dyn_connector, Arc::new(hosts));
    let dyn_outbound: Arc<dyn OutboundMessage> = outbound.clone();
    let ctx = ResponseContext::new(
        user_author(),
        dyn_outbound,
        session,
        Arc::new(ResponseConfig::default()),
    );
    Harness {
        ctx,
        outbound,
        connector,
    }
}

fn harness() -> Harness {
    harness_with(
        FakeMessage::default(),
        FakeConnector::new().host("img", FakeHost::with_tools(&["draw"])),
    )
}

fn draw_tool() -> RemoteToolDescriptor {
    RemoteToolDescriptor::new("draw", "img", "Draw a picture", json!({}))
}

#[tokio::test(start_paused = true)]
async fn incremental_edits_are_throttled() {
    let mut h = harness();

    h.ctx.add_response("Hel").await;
    h.ctx.add_response("lo ").await;
    h.ctx.add_response("there").await;
    assert_eq!(h.outbound.edit_count(), 1);

    tokio::time::advance(Duration::from_millis(3001)).await;
    h.ctx.add_response("!").await;
    assert_eq!(h.outbound.edit_count(), 2);
    let preview = h.outbound.last_edit().unwrap().content.unwrap();
    assert_eq!(preview, "Hello there!✏️");

    h.ctx.finish().await;
    assert_eq!(h.outbound.edit_count(), 3);
    assert_eq!(
        h.outbound.last_edit().unwrap().content.as_deref(),
        Some("Hello there!")
    );

    h.ctx.finish().await;
    assert_eq!(h.outbound.edit_count(), 3, "finish renders exactly once");
}

#[tokio::test]
async fn whitespace_only_does_not_render() {
    let mut h = harness();
    h.ctx.add_response("  \n").await;
    assert_eq!(h.outbound.edit_count(), 0);
}

#[tokio::test]
async fn empty_reply_gets_placeholder() {
    let mut h = harness();
    h.ctx.finish().await;
    let last = h.outbound.last_edit().unwrap();
    assert_eq!(last.content.as_deref(), Some("-# No response."));
    assert!(last.view.is_none());
}

#[tokio::test]
async fn embeds_alone_still_render() {
    let mut h = harness();
    h.ctx.set_embeds(vec![Embed {
        title: Some("Weather".into()),
        ..Embed::default()
    }]);
    h.ctx.finish().await;
    let last = h.outbound.last_edit().unwrap();
    assert_eq!(last.content.as_deref(), Some(""));
    assert_eq!(last.embeds.unwrap().len(), 1);
}

#[tokio::test]
async fn long_answer_overflows_to_attachment() {
    let mut h = harness();
    let answer = "abcde".repeat(500);
    h.ctx.add_response(&answer).await;
    h.ctx.finish().await;

    let last = h.outbound.last_edit().unwrap();
    let content = last.content.unwrap();
    assert!(content.chars().count() <= 2000);
    assert!(content.ends_with(TRUNCATION_MARKER));

    let attachments = last.attachments.unwrap();
    assert_eq!(attachments.len(), 1);
    assert_eq!(attachments[0].filename, "response.md");
    assert_eq!(attachments[0].data.len(), 2500);
}

#[tokio::test]
async fn final_render_carries_view() {
    let mut h = harness();
    h.ctx
        .add_response("Pick one\n[#Separator#2]\n[Docs](btu|https://docs.rs)")
        .await;
    h.ctx.finish().await;

    let view = h.outbound.last_edit().unwrap().view.unwrap();
    assert_eq!(view.len(), 3);
    assert_eq!(view[0], MarkupNode::Text("Pick one".into()));
}

#[tokio::test]
async fn rejected_render_falls_back_to_diagnostic() {
    let mut h = harness_with(FakeMessage::rejecting_views(), FakeConnector::new());
    h.ctx.add_response("hello").await;
    let before = h.outbound.edit_count();
    h.ctx.finish().await;

    assert_eq!(h.outbound.edit_count(), before + 1);
    let content = h.outbound.last_edit().unwrap().content.unwrap();
    assert!(content.starts_with("hello"));
    assert!(content.contains("Failed to render response"));
    assert!(content.contains("invalid form body"));
}

#[tokio::test]
async fn invalid_tree_is_a_render_failure() {
    let mut h = harness();
    h.ctx
        .add_response("[#ActionRow#]\n[#ActionRow#]\n[Go](btu|https://x)\n[/ActionRow/]\n[/ActionRow/]")
        .await;
    h.ctx.finish().await;

    let last = h.outbound.last_edit().unwrap();
    assert!(last.view.is_none());
    assert!(last.content.unwrap().contains("nested"));
}

#[tokio::test]
async fn fail_appends_diagnostic() {
    let mut h = harness();
    h.ctx.add_response("partial").await;
    h.ctx.fail(&"provider unavailable").await;

    let content = h.outbound.last_edit().unwrap().content.unwrap();
    assert!(content.starts_with("partial"));
    assert!(content.ends_with("-# ⚠️ Error: provider unavailable"));
    assert!(h.ctx.is_finished());
}

#[tokio::test]
async fn set_status_uses_loading_indicator() {
    let mut h = harness();
    h.ctx.set_status("searching the web").await.unwrap();
    assert_eq!(
        h.outbound.last_edit().unwrap().content.as_deref(),
        Some("⏳ searching the web")
    );
}

#[tokio::test]
async fn image_blocks_become_temp_attachments() {
    let png = base64::engine::general_purpose::STANDARD.encode(b"\x89PNG fake");
    let connector = FakeConnector::new().host(
        "img",
        FakeHost::with_tools(&["draw"]).with_result(CallToolResult {
            content: vec![
                json!({"type": "text", "text": "here you go"}),
                json!({"type": "image", "data": png, "mimeType": "image/png"}),
            ],
            is_error: false,
        }),
    );
    let mut h = harness_with(FakeMessage::default(), connector);

    let result = h.ctx.call_remote_tool(&draw_tool(), json!({})).await.unwrap();
    let blocks = result["content"].as_array().unwrap();
    assert_eq!(blocks[0], json!({"type": "text", "text": "here you go"}));
    assert_eq!(blocks[1]["type"], "text");

    assert_eq!(h.ctx.temp_attachments().len(), 1);
    let filename = h.ctx.temp_attachments()[0].filename.clone();
    assert!(filename.ends_with(".png"));
    assert_eq!(filename.len(), 32 + 4);
    assert!(blocks[1]["text"].as_str().unwrap().contains(&filename));

    assert_eq!(h.ctx.move_temp_attachment(&filename), Some(filename.clone()));
    assert!(h.ctx.temp_attachments().is_empty());
    assert_eq!(h.ctx.move_temp_attachment(&filename), None);

    h.ctx.finish().await;
    let attachments = h.outbound.last_edit().unwrap().attachments.unwrap();
    assert_eq!(attachments[0].data, b"\x89PNG fake");
}

#[tokio::test]
async fn remote_error_result_is_tool_failure() {
    let connector = FakeConnector::new().host(
        "img",
        FakeHost::with_tools(&["draw"]).with_result(CallToolResult {
            content: vec![json!({"type": "text", "text": "quota exceeded"})],
            is_error: true,
        }),
    );
    let mut h = harness_with(FakeMessage::default(), connector);
    let err = h.ctx.call_remote_tool(&draw_tool(), json!({})).await.unwrap_err();
    assert!(matches!(err, RemoteError::ToolFailed { ref message, .. } if message == "quota exceeded"));
}

#[tokio::test]
async fn finish_closes_session() {
    let mut h = harness();
    h.ctx.call_remote_tool(&draw_tool(), json!({})).await.unwrap();
    assert_eq!(h.connector.open_count(), 1);

    h.ctx.finish().await;
    assert_eq!(h.connector.open_count(), 0);
    assert!(h.ctx.session().is_closed());
}

#[tokio::test]
async fn dropped_context_finalizes_in_background() {
    let Harness {
        mut ctx,
        outbound,
        connector,
    } = harness();
    ctx.call_remote_tool(&draw_tool(), json!({})).await.unwrap();
    ctx.add_response("interrupted").await;
    drop(ctx);

    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    assert_eq!(connector.open_count(), 0);
    assert_eq!(
        outbound.last_edit().unwrap().content.as_deref(),
        Some("interrupted")
    );
}

#[test]
fn take_chars_respects_char_boundaries() {
    assert_eq!(take_chars("héllo", 2), "hé");
    assert_eq!(take_chars("hi", 10), "hi");
    assert_eq!(take_chars("✏️x", 0), "");
}

#[test]
fn extension_table() {
    assert_eq!(extension_for("image/jpeg"), ".jpg");
    assert_eq!(extension_for("text/plain; charset=utf-8"), ".txt");
    assert_eq!(extension_for("application/x-unknown"), "");
}
