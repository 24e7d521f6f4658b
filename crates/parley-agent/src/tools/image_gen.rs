use anyhow::{Context as _, Result};
use async_trait::async_trait;
use parley_core::config::ImageGenConfig;
use serde_json::{json, Value};

use crate::builtin::{rejected, string_arg};
use crate::context::ResponseContext;
use crate::platform::Attachment;
use crate::registry::{FunctionDescriptor, Handler, ToolHandler};
use crate::schema::{Param, ParamType, SchemaError};

const MAX_SIDE: u64 = 1920;

const DESCRIPTION: &str = "Generate an image from a given prompt.
- You MUST call `set_status` before using this tool.
- Prompt MUST be in English.
- Prompt should be concise and clear.
- Separate each key charter with a comma.
- You not allow to generate image about NSFW content.
- Recommend aspect ratio is 1:1, 16:9 or 9:16.
- Width and height should be divisible by 16.
- The image is attached to the response. To show it inside an embed use `attachment://<file_name>`.";

pub(super) fn descriptor(
    http: reqwest::Client,
    config: ImageGenConfig,
) -> Result<FunctionDescriptor, SchemaError> {
    FunctionDescriptor::new(
        "generate_image",
        DESCRIPTION,
        &[
            Param::new("prompt", ParamType::string()).describe("Prompt for image generation"),
            Param::new("negative_prompt", ParamType::string())
                .describe("Negative prompt for image generation"),
            Param::new("width", ParamType::integer()).describe("Width of the image max: 1920"),
            Param::new("height", ParamType::integer()).describe("Height of the image max: 1920"),
        ],
        Handler::from_async(GenerateImage { http, config }),
    )
}

/// Text-to-image; the result is attached to the reply as `<hex>.png`.
pub struct GenerateImage {
    http: reqwest::Client,
    config: ImageGenConfig,
}

fn side_arg(args: &Value, name: &str) -> Result<u64> {
    args.get(name)
        .and_then(Value::as_u64)
        .with_context(|| format!("missing integer argument '{name}'"))
}

#[async_trait]
impl ToolHandler for GenerateImage {
    async fn call(&self, ctx: &mut ResponseContext, args: Value) -> Result<Value> {
        let prompt = string_arg(&args, "prompt")?;
        let negative_prompt = string_arg(&args, "negative_prompt")?;
        let width = side_arg(&args, "width")?;
        let height = side_arg(&args, "height")?;
        if width > MAX_SIDE || height > MAX_SIDE {
            return Ok(rejected("Image size is too large. Max size is 1920x1920."));
        }

        let url = format!(
            "{}/{}",
            self.config.endpoint.trim_end_matches('/'),
            self.config.model
        );
        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.config.token)
            .json(&json!({
                "inputs": prompt,
                "parameters": {
                    "width": width,
                    "height": height,
                    "negative_prompt": negative_prompt,
                }
            }))
            .send()
            .await
            .context("image generation request failed")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let error = serde_json::from_str::<Value>(&body)
                .ok()
                .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_string))
                .unwrap_or(body);
            tracing::warn!(status = status.as_u16(), "image generation failed: {}", error);
            return Ok(json!({
                "success": false,
                "reason": "Image generation failed.",
                "error": error,
            }));
        }

        let data = resp.bytes().await.context("reading generated image")?;
        let filename = format!("{}.png", uuid::Uuid::new_v4().simple());
        ctx.add_attachment(Attachment {
            filename: filename.clone(),
            content_type: "image/png".to_string(),
            data: data.to_vec(),
        });
        Ok(json!({
            "success": true,
            "reason": "Image generated successfully.",
            "file_name": filename,
        }))
    }
}
