//! Local web tools, registered only when their credentials are configured.
//!
//! - `search`: Google Custom Search
//! - `image_gen`: text-to-image through Hugging Face inference

mod image_gen;
mod search;

use parley_core::config::ToolsConfig;

use crate::registry::FunctionDescriptor;
use crate::schema::SchemaError;

pub use image_gen::GenerateImage;
pub use search::Search;

/// Descriptors of every configured tool. `http` is shared by all of them.
pub fn descriptors(
    config: &ToolsConfig,
    http: &reqwest::Client,
) -> Result<Vec<FunctionDescriptor>, SchemaError> {
    let mut descs = Vec::new();
    match &config.search {
        Some(cfg) => descs.push(search::descriptor(http.clone(), cfg.clone())?),
        None => tracing::info!("GOOGLE_API_KEY / GOOGLE_CX_ID not set; search disabled"),
    }
    match &config.image_gen {
        Some(cfg) => descs.push(image_gen::descriptor(http.clone(), cfg.clone())?),
        None => tracing::info!("HUGGINGFACE_TOKEN / HUGGINGFACE_MODEL not set; image generation disabled"),
    }
    Ok(descs)
}
