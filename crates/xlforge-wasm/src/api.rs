use serde::{Deserialize, Serialize};
use wasm_bindgen::prelude::*;
use xlforge_core::{col_to_label, CellValue, WorkbookPayload, XlforgeError};
use xlforge_plan::{
    parse_plan_response, EditorSession, FileInfo, Plan, PlanContext, PlanParseError,
    PromptOptions,
};

/// Editor state exposed to JavaScript
#[wasm_bindgen]
pub struct EditorEngine {
    session: EditorSession,
    /// Grid state captured by the last `buildPrompt`
    pending_context: Option<PlanContext>,
}

/// Structured error object for JavaScript
#[derive(Serialize)]
pub struct JsEditorError {
    code: String,
    message: String,
}

impl From<XlforgeError> for JsEditorError {
    fn from(err: XlforgeError) -> Self {
        Self {
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}

impl From<PlanParseError> for JsEditorError {
    fn from(err: PlanParseError) -> Self {
        let code = match err {
            PlanParseError::NoJson => "NO_JSON",
            PlanParseError::InvalidJson(_) => "INVALID_JSON",
        };
        Self {
            code: code.to_string(),
            message: err.to_string(),
        }
    }
}

impl JsEditorError {
    fn from_error<E: std::fmt::Display>(err: E) -> JsValue {
        to_js_value(Self {
            code: "ERROR".to_string(),
            message: err.to_string(),
        })
    }
}

fn to_js_value(err: JsEditorError) -> JsValue {
    serde_wasm_bindgen::to_value(&err).unwrap_or(JsValue::NULL)
}

fn to_js_error<E: Into<JsEditorError>>(err: E) -> JsValue {
    to_js_value(err.into())
}

/// Body of the file endpoint: the workbook plus file metadata
#[derive(Deserialize)]
struct LoadRequest {
    #[serde(flatten)]
    payload: WorkbookPayload,
    #[serde(flatten)]
    file: FileInfo,
}

/// Parsed plan as shown in the review panel
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PlanPreview<'a> {
    #[serde(flatten)]
    plan: &'a Plan,
    descriptions: Vec<String>,
}

impl Default for EditorEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[wasm_bindgen]
impl EditorEngine {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Self {
            session: EditorSession::default(),
            pending_context: None,
        }
    }

    /// Load the JSON returned by the file endpoint.
    /// Returns the sheet names as a JSON array.
    #[wasm_bindgen]
    pub fn load(&mut self, file_json: &str) -> Result<String, JsValue> {
        let request: LoadRequest = serde_json::from_str(file_json).map_err(|e| {
            web_sys::console::error_1(&format!("[EditorEngine] invalid workbook JSON: {}", e).into());
            JsEditorError::from_error(e)
        })?;
        self.session
            .load(request.payload, request.file)
            .map_err(to_js_error)?;
        self.pending_context = None;
        Ok(self.get_sheet_names())
    }

    /// Active grid as a JSON array of rows
    #[wasm_bindgen(js_name = getGrid)]
    pub fn get_grid(&self) -> String {
        serde_json::to_string(self.session.grid()).unwrap_or_else(|_| "[]".to_string())
    }

    /// Set one cell from user input, growing the grid if needed
    #[wasm_bindgen(js_name = setCellValue)]
    pub fn set_cell_value(&mut self, row: usize, col: usize, value: &str) -> Result<bool, JsValue> {
        self.session
            .set_cell(row, col, CellValue::text(value))
            .map_err(to_js_error)
    }

    #[wasm_bindgen(js_name = addRow)]
    pub fn add_row(&mut self) -> bool {
        self.session.add_row()
    }

    #[wasm_bindgen(js_name = addColumn)]
    pub fn add_column(&mut self) -> bool {
        self.session.add_column()
    }

    /// Delete a row. Returns false when the grid is already a single row.
    #[wasm_bindgen(js_name = deleteRow)]
    pub fn delete_row(&mut self, row: usize) -> Result<bool, JsValue> {
        self.session.delete_row(row).map_err(to_js_error)
    }

    /// Delete a column. Returns false when the grid is already a single column.
    #[wasm_bindgen(js_name = deleteColumn)]
    pub fn delete_column(&mut self, col: usize) -> Result<bool, JsValue> {
        self.session.delete_column(col).map_err(to_js_error)
    }

    #[wasm_bindgen]
    pub fn undo(&mut self) -> bool {
        self.session.undo()
    }

    #[wasm_bindgen]
    pub fn redo(&mut self) -> bool {
        self.session.redo()
    }

    #[wasm_bindgen(js_name = canUndo)]
    pub fn can_undo(&self) -> bool {
        self.session.can_undo()
    }

    #[wasm_bindgen(js_name = canRedo)]
    pub fn can_redo(&self) -> bool {
        self.session.can_redo()
    }

    // --- Sheets ---

    #[wasm_bindgen(js_name = switchSheet)]
    pub fn switch_sheet(&mut self, name: &str) -> Result<(), JsValue> {
        self.session.switch_sheet(name).map_err(to_js_error)
    }

    /// Get all sheet names as JSON array
    #[wasm_bindgen(js_name = getSheetNames)]
    pub fn get_sheet_names(&self) -> String {
        serde_json::to_string(self.session.sheet_names()).unwrap_or_else(|_| "[]".to_string())
    }

    #[wasm_bindgen(js_name = getActiveSheet)]
    pub fn get_active_sheet(&self) -> String {
        self.session.active_sheet().to_string()
    }

    // --- AI plans ---

    /// System prompt for the active grid. Remembers the grid state so a
    /// later `applyPlan` can tell whether the sheet changed in between.
    #[wasm_bindgen(js_name = buildPrompt)]
    pub fn build_prompt(&mut self, preview_rows: Option<usize>) -> String {
        let mut options = PromptOptions::default();
        if let Some(rows) = preview_rows {
            options.preview_rows = rows;
        }
        let (prompt, context) = self.session.prepare_prompt(&options);
        self.pending_context = Some(context);
        prompt
    }

    /// Extract the plan from raw model text.
    /// Returns `{steps, summary, descriptions}` as JSON.
    #[wasm_bindgen(js_name = parsePlanResponse)]
    pub fn parse_plan_response(&self, raw: &str) -> Result<String, JsValue> {
        let plan = parse_plan_response(raw).map_err(|e| {
            web_sys::console::warn_1(&format!("[EditorEngine] unusable AI response: {}", e).into());
            to_js_error(e)
        })?;
        let preview = PlanPreview {
            descriptions: plan.descriptions(),
            plan: &plan,
        };
        serde_json::to_string(&preview).map_err(JsEditorError::from_error)
    }

    /// Apply a confirmed plan as one undo step. Returns the report as JSON.
    #[wasm_bindgen(js_name = applyPlan)]
    pub fn apply_plan(&mut self, plan_json: &str) -> Result<String, JsValue> {
        let plan: Plan = serde_json::from_str(plan_json).map_err(JsEditorError::from_error)?;
        let context = self.pending_context.take();
        let report = self.session.apply_plan(&plan, context.as_ref());

        for failure in &report.failures {
            web_sys::console::warn_1(&format!("[EditorEngine] {}", failure).into());
        }

        serde_json::to_string(&report).map_err(JsEditorError::from_error)
    }

    // --- Persistence ---

    /// Save payload `{sheetNames, sheets}` as JSON
    #[wasm_bindgen(js_name = getPayload)]
    pub fn get_payload(&self) -> String {
        serde_json::to_string(&self.session.payload()).unwrap_or_else(|_| "{}".to_string())
    }

    #[wasm_bindgen(js_name = markSaved)]
    pub fn mark_saved(&mut self, last_modified: Option<String>) {
        self.session.mark_saved(last_modified);
    }

    #[wasm_bindgen(js_name = isDirty)]
    pub fn is_dirty(&self) -> bool {
        self.session.is_dirty()
    }
}

/// Spreadsheet letter label for a zero-based column index
#[wasm_bindgen(js_name = columnLabel)]
pub fn column_label(col: usize) -> String {
    col_to_label(col)
}
