//! activity_prompt tool implementation.
//!
//! Looks up an activity's prompt row and assembles the full prompt text
//! for one slide. The projection is pure and runs only on the already
//! resolved result.

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tablecache_client::TableSource;
use tablecache_core::record::value_text;
use tablecache_core::{Error, Record};

use crate::orchestrator::{Provenance, QueryOrchestrator};

const PROMPT_SCHEMA: &str = "prompt_info";
const PROMPT_TABLE: &str = "activity_prompts";
const ID_COLUMN: &str = "activity_id";

/// Input parameters for activity_prompt tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ActivityPromptParams {
    /// Activity identifier (required).
    pub activity_id: Value,

    /// Index of the slide to select from prompt_pic (default: 0).
    #[serde(default)]
    pub current_slide: usize,
}

/// Output structure for activity_prompt tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ActivityPromptOutput {
    /// Matching records, each with an assembled `full_prompt` field.
    pub data: Vec<Record>,
    /// Unfiltered record count of the snapshot consulted.
    pub total_records: usize,
    /// Number of matching records.
    pub filtered_records: usize,
    /// Which path produced the records.
    pub provenance: Provenance,
}

/// Implementation of the activity_prompt tool.
pub async fn prompt_impl<S: TableSource>(
    orchestrator: &QueryOrchestrator<S>, params: ActivityPromptParams,
) -> Result<CallToolResult, McpError> {
    if params.activity_id.is_null() {
        return Err(Error::InvalidInput("activity_id is required".into()).into());
    }

    let result = orchestrator
        .resolve_row(PROMPT_SCHEMA, PROMPT_TABLE, ID_COLUMN, &params.activity_id)
        .await?;

    let data = result
        .data
        .into_iter()
        .map(|mut record| {
            let full_prompt = build_full_prompt(&record, params.current_slide);
            record.insert("full_prompt".to_string(), Value::String(full_prompt));
            record
        })
        .collect();

    let output = ActivityPromptOutput {
        data,
        total_records: result.total_records,
        filtered_records: result.filtered_records,
        provenance: result.provenance,
    };

    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}

/// Assemble `pre_prompt`, the selected slide, and `post_prompt` with
/// separating spaces, trimmed.
fn build_full_prompt(record: &Record, slide: usize) -> String {
    let pre = record.get("pre_prompt").map(value_text).unwrap_or_default();
    let pic = record.get("prompt_pic").map(|p| select_slide(p, slide)).unwrap_or_default();
    let post = record.get("post_prompt").map(value_text).unwrap_or_default();

    format!("{pre} {pic} {post}").trim().to_string()
}

/// Select one slide from an array- or object-valued field.
///
/// Objects are indexed by the stringified slide number, mirroring how
/// the source system stores slide collections keyed by index. Anything
/// else selects an empty string.
fn select_slide(pics: &Value, slide: usize) -> String {
    match pics {
        Value::Array(items) => items.get(slide).map(value_text).unwrap_or_default(),
        Value::Object(map) => map.get(&slide.to_string()).map(value_text).unwrap_or_default(),
        _ => String::new(),
    }
}
