//! System instruction and request body sent to the AI provider.

use serde::{Deserialize, Serialize};
use xlforge_core::{CellValue, Grid, Row};

pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
pub const DEFAULT_MAX_TOKENS: u32 = 1000;

const ACTIONS: &str = "set_cell(row,col,value) | add_row(position,values[]) | delete_row(row) | \
add_column(header,fill,values[]) | delete_column(col) | rename_column(col,newName) | \
sort(col,direction,hasHeader) | filter_delete(col,operator,value,hasHeader) | \
replace_all(col,find,replace,transform) | multiply_column(col,factor)";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptOptions {
    /// Rows included in the CSV preview, header included
    pub preview_rows: usize,
}

impl Default for PromptOptions {
    fn default() -> Self {
        Self { preview_rows: 25 }
    }
}

/// Build the system instruction describing the plan contract and the sheet
pub fn build_system_prompt(grid: &Grid, options: &PromptOptions) -> String {
    let preview = csv_preview(&grid.rows()[..grid.row_count().min(options.preview_rows)]);
    format!(
        "You are an expert spreadsheet transformation engine.\n\
         Respond ONLY with a valid JSON object, no markdown and no explanation.\n\
         {{\n  \"steps\": [{{ \"action\": string, \"description\": string, ...fields }}],\n  \"summary\": string\n}}\n\
         Rows and columns are zero-based; row 0 is the header row.\n\
         Actions: {ACTIONS}\n\
         Sheet: {} rows x {} cols.\n\
         CSV preview:\n{}",
        grid.row_count(),
        grid.col_count(),
        preview.trim_end()
    )
}

fn csv_preview(rows: &[Row]) -> String {
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(Vec::new());
    for row in rows {
        if let Err(e) = writer.write_record(row.iter().map(CellValue::as_text)) {
            tracing::debug!("CSV preview fell back to plain text: {}", e);
            return plain_preview(rows);
        }
    }
    writer
        .into_inner()
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .unwrap_or_else(|| plain_preview(rows))
}

fn plain_preview(rows: &[Row]) -> String {
    rows.iter()
        .map(|row| {
            row.iter()
                .map(CellValue::as_text)
                .collect::<Vec<_>>()
                .join(",")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// One chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

/// Request body for the provider's messages endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessagesRequest {
    pub model: String,
    pub max_tokens: u32,
    pub system: String,
    pub messages: Vec<Message>,
}

impl MessagesRequest {
    pub fn new(model: impl Into<String>, max_tokens: u32, system: String, instruction: &str) -> Self {
        Self {
            model: model.into(),
            max_tokens,
            system,
            messages: vec![Message {
                role: "user".to_string(),
                content: instruction.to_string(),
            }],
        }
    }

    /// Request for `instruction` against `grid` with default model settings
    pub fn for_grid(grid: &Grid, instruction: &str) -> Self {
        let system = build_system_prompt(grid, &PromptOptions::default());
        Self::new(DEFAULT_MODEL, DEFAULT_MAX_TOKENS, system, instruction)
    }
}
