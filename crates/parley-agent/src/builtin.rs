//! Built-in tools that act on the reply itself.
//!
//! Registered like any other local tool:
//! `Registry::builder().register(builtin::descriptors()?)`.

use anyhow::{Context as _, Result};
use async_trait::async_trait;
use serde_json::{json, Value};

use crate::context::ResponseContext;
use crate::platform::Embed;
use crate::registry::{FunctionDescriptor, Handler, ToolHandler};
use crate::schema::{Param, ParamType, SchemaError};

const MAX_EMBEDS: usize = 10;

const SET_EMBEDS_DESCRIPTION: &str = "Set embeds to the response message.
- Embed Only Use display information to user.
- Mentions in embeds are not notified, use normal text to mention users.
- The embed title supports **plain text only**, no markdown or mentions.
- Image link is not displayed inside embed content.
- You MUST use `image` or `thumbnail` to display image link inside embed.
- You need at least one embed to send a message.
- You can set up to 10 embeds.
- You are only allowed to set embeds 1 time.";

const SET_STATUS_DESCRIPTION: &str = "Set status what you're doing if you're using tool.
- Status allows markdown and mentions.
- Status must be short and clear.
- You MUST use `set_status` before using tool except set data to the message.
- You are not allowed to say the tool name in status.
- You don't need to set status if you're not using tool.";

const ATTACH_FILE_DESCRIPTION: &str = "Attach a file produced by another tool to the response message.
- Tools that return images store them as temporary attachments and tell you the filename.
- Temporary attachments are not shown until you attach them.
- Reference an attached image inside an embed with `attachment://<filename>`.";

/// Descriptors of every built-in tool.
pub fn descriptors() -> Result<Vec<FunctionDescriptor>, SchemaError> {
    Ok(vec![
        FunctionDescriptor::new(
            "set_embeds",
            SET_EMBEDS_DESCRIPTION,
            &[Param::new("embeds", ParamType::list_of(embed_type()))],
            Handler::from_async(SetEmbeds),
        )?
        .describe("embeds", "list of embeds"),
        FunctionDescriptor::new(
            "set_status",
            SET_STATUS_DESCRIPTION,
            &[Param::new("status", ParamType::string())],
            Handler::from_async(SetStatus),
        )?
        .describe("status", "what you will do next"),
        FunctionDescriptor::new(
            "attach_file",
            ATTACH_FILE_DESCRIPTION,
            &[Param::new("filename", ParamType::string())],
            Handler::from_async(AttachFile),
        )?
        .describe("filename", "name of the temporary attachment"),
    ])
}

fn optional_string(name: &str) -> Param {
    Param::new(name, ParamType::optional(ParamType::string()))
}

fn image_type() -> ParamType {
    ParamType::object([Param::new("url", ParamType::string())])
}

fn embed_type() -> ParamType {
    ParamType::object([
        optional_string("title"),
        optional_string("description"),
        optional_string("url"),
        Param::new("color", ParamType::optional(ParamType::integer())),
        Param::new(
            "footer",
            ParamType::optional(ParamType::object([
                Param::new("text", ParamType::string()),
                optional_string("icon_url"),
            ])),
        ),
        Param::new(
            "fields",
            ParamType::optional(ParamType::list_of(ParamType::object([
                Param::new("name", ParamType::string()),
                Param::new("value", ParamType::string()),
                Param::new("inline", ParamType::optional(ParamType::boolean())),
            ]))),
        ),
        Param::new(
            "author",
            ParamType::optional(ParamType::object([
                Param::new("name", ParamType::string()),
                optional_string("url"),
                optional_string("icon_url"),
            ])),
        ),
        Param::new("thumbnail", ParamType::optional(image_type())),
        Param::new("image", ParamType::optional(image_type())),
    ])
}

pub(crate) fn string_arg<'a>(args: &'a Value, name: &str) -> Result<&'a str> {
    args.get(name)
        .and_then(Value::as_str)
        .with_context(|| format!("missing string argument '{name}'"))
}

pub(crate) fn rejected(reason: &str) -> Value {
    json!({ "success": false, "reason": reason })
}

struct SetEmbeds;

#[async_trait]
impl ToolHandler for SetEmbeds {
    async fn call(&self, ctx: &mut ResponseContext, args: Value) -> Result<Value> {
        let raw = args.get("embeds").cloned().unwrap_or(Value::Null);
        let embeds: Vec<Embed> =
            serde_json::from_value(raw).context("'embeds' must be a list of embed objects")?;

        if embeds.is_empty() {
            return Ok(rejected("there are no embeds to set"));
        }
        if embeds.len() > MAX_EMBEDS {
            return Ok(rejected("too many embeds to set"));
        }
        if ctx.has_embeds() {
            return Ok(rejected("embeds already set"));
        }

        let count = embeds.len();
        ctx.set_embeds(embeds);
        Ok(json!({
            "success": true,
            "embeds_count": ctx.embeds().len(),
            "reason": format!("{count} embeds added successfully"),
        }))
    }
}

struct SetStatus;

#[async_trait]
impl ToolHandler for SetStatus {
    async fn call(&self, ctx: &mut ResponseContext, args: Value) -> Result<Value> {
        let status = string_arg(&args, "status")?;
        ctx.set_status(status).await?;
        Ok(json!({ "success": true, "reason": "status set successfully" }))
    }
}

struct AttachFile;

#[async_trait]
impl ToolHandler for AttachFile {
    async fn call(&self, ctx: &mut ResponseContext, args: Value) -> Result<Value> {
        let filename = string_arg(&args, "filename")?;
        Ok(match ctx.move_temp_attachment(filename) {
            Some(name) => json!({ "success": true, "filename": name }),
            None => rejected(&format!("no temporary attachment named '{filename}'")),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use base64::Engine as _;

    use super::*;
    use crate::testing::{response_context, FakeConnector, FakeMessage};

    async fn call(name: &str, ctx: &mut ResponseContext, args: Value) -> Result<Value> {
        let desc = descriptors()
            .unwrap()
            .into_iter()
            .find(|d| d.name == name)
            .unwrap();
        match desc.handler {
            Handler::Async(h) => h.call(ctx, args).await,
            Handler::Blocking(_) => unreachable!("built-ins run on the reply task"),
        }
    }

    fn ctx() -> (ResponseContext, Arc<FakeMessage>) {
        let outbound = Arc::new(FakeMessage::default());
        let ctx = response_context(&outbound, &Arc::new(FakeConnector::new()), &[]);
        (ctx, outbound)
    }

    #[test]
    fn schemas_compile() {
        let descs = descriptors().unwrap();
        let names: Vec<&str> = descs.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["set_embeds", "set_status", "attach_file"]);
        assert!(descs.iter().all(FunctionDescriptor::is_async));

        let params = descs[0].tool_definition().function.parameters;
        assert_eq!(params["required"], json!(["embeds"]));
        assert_eq!(params["properties"]["embeds"]["description"], "list of embeds");
        let item = &params["properties"]["embeds"]["items"];
        assert_eq!(item["type"], "object");
        assert_eq!(item["required"], json!([]));
        assert_eq!(item["properties"]["color"], json!({"type": "integer"}));
        assert_eq!(
            item["properties"]["fields"]["items"]["required"],
            json!(["name", "value"])
        );
    }

    #[tokio::test]
    async fn set_embeds_once() {
        let (mut ctx, _) = ctx();
        let args = json!({"embeds": [{"title": "Forecast", "color": 3447003,
                                       "fields": [{"name": "Mon", "value": "Sunny"}]}]});

        let first = call("set_embeds", &mut ctx, args.clone()).await.unwrap();
        assert_eq!(first["success"], true);
        assert_eq!(first["embeds_count"], 1);
        assert_eq!(ctx.embeds()[0].fields[0].value, "Sunny");

        let second = call("set_embeds", &mut ctx, args).await.unwrap();
        assert_eq!(second, json!({"success": false, "reason": "embeds already set"}));
    }

    #[tokio::test]
    async fn set_embeds_bounds() {
        let (mut ctx, _) = ctx();
        let none = call("set_embeds", &mut ctx, json!({"embeds": []})).await.unwrap();
        assert_eq!(none["success"], false);

        let eleven: Vec<Value> = (0..11).map(|i| json!({"title": format!("#{i}")})).collect();
        let many = call("set_embeds", &mut ctx, json!({"embeds": eleven})).await.unwrap();
        assert_eq!(many["reason"], "too many embeds to set");
        assert!(!ctx.has_embeds());
    }

    #[tokio::test]
    async fn set_embeds_bad_shape_is_an_error() {
        let (mut ctx, _) = ctx();
        assert!(call("set_embeds", &mut ctx, json!({"embeds": "nope"})).await.is_err());
    }

    #[tokio::test]
    async fn set_status_edits_message() {
        let (mut ctx, outbound) = ctx();
        let out = call("set_status", &mut ctx, json!({"status": "looking it up"}))
            .await
            .unwrap();
        assert_eq!(out["success"], true);
        assert_eq!(
            outbound.last_edit().unwrap().content.as_deref(),
            Some("⏳ looking it up")
        );
    }

    #[tokio::test]
    async fn attach_file_moves_temp_attachment() {
        let (mut ctx, _) = ctx();
        let data = base64::engine::general_purpose::STANDARD.encode("hi");
        let name = ctx.add_temp_attachment(&data, "text/plain").unwrap();

        let out = call("attach_file", &mut ctx, json!({"filename": name})).await.unwrap();
        assert_eq!(out["success"], true);
        assert_eq!(ctx.attachments().len(), 1);

        let again = call("attach_file", &mut ctx, json!({"filename": name})).await.unwrap();
        assert_eq!(again["success"], false);
    }

    #[tokio::test]
    async fn missing_argument_is_an_error() {
        let (mut ctx, _) = ctx();
        let err = call("attach_file", &mut ctx, json!({})).await.unwrap_err();
        assert!(err.to_string().contains("filename"));
    }
}
