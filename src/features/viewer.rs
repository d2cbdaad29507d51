//! Result presentation: the summary/detailed render modes and the zoomable
//! full-screen image inspection overlay.

use crate::state::AppState;
use crate::ui::{Image as UiImage, Modal as UiModal, Row as UiRow, Text as UiText};
use serde_json::{json, Value};

/// Normalized output of a parameter submission. Owned by the wizard state;
/// the viewer only reads it. Image fields are base64 payloads, empty when
/// the backend produced nothing for that slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisResult {
    pub classification: String,
    pub original_image: String,
    pub heatmap_image: String,
    pub mask_image: String,
    pub table_image: String,
}

impl AnalysisResult {
    pub fn has_primary_image(&self) -> bool {
        !self.original_image.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewMode {
    Summary,
    Detailed,
}

pub const ZOOM_MIN: f64 = 0.5;
pub const ZOOM_MAX: f64 = 5.0;
pub const ZOOM_STEP: f64 = 0.25;
pub const ZOOM_WHEEL_STEP: f64 = 0.1;

/// The single inspection overlay. Opening always starts at 1.0x; every zoom
/// mutation goes through `set_zoom` so the factor can never leave
/// [ZOOM_MIN, ZOOM_MAX].
#[derive(Debug, Clone, PartialEq)]
pub struct ModalState {
    pub open: bool,
    pub src: Option<String>,
    pub zoom: f64,
}

impl ModalState {
    pub const fn new() -> Self {
        Self {
            open: false,
            src: None,
            zoom: 1.0,
        }
    }

    pub fn open_with(&mut self, src: String) {
        self.src = Some(src);
        self.zoom = 1.0;
        self.open = true;
    }

    pub fn close(&mut self) {
        self.open = false;
        self.src = None;
    }

    pub fn zoom_in(&mut self) {
        self.set_zoom(self.zoom + ZOOM_STEP);
    }

    pub fn zoom_out(&mut self) {
        self.set_zoom(self.zoom - ZOOM_STEP);
    }

    pub fn zoom_reset(&mut self) {
        self.zoom = 1.0;
    }

    /// Wheel input: scrolling up (negative delta) zooms in by a finer
    /// increment than the discrete controls.
    pub fn zoom_wheel(&mut self, delta_sign: i32) {
        let delta = if delta_sign < 0 {
            ZOOM_WHEEL_STEP
        } else {
            -ZOOM_WHEEL_STEP
        };
        self.set_zoom(self.zoom + delta);
    }

    fn set_zoom(&mut self, zoom: f64) {
        self.zoom = zoom.clamp(ZOOM_MIN, ZOOM_MAX);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewerState {
    pub mode: ViewMode,
    pub modal: ModalState,
}

impl ViewerState {
    pub const fn new() -> Self {
        Self {
            mode: ViewMode::Summary,
            modal: ModalState::new(),
        }
    }

    pub fn reset(&mut self) {
        *self = ViewerState::new();
    }
}

/// Resolve a result image kind (`image_open:<kind>`) to a renderable data
/// URL; `None` for unknown kinds or empty slots keeps the modal closed.
pub fn modal_src_for(result: &AnalysisResult, kind: &str) -> Option<String> {
    let payload = match kind {
        "original" => &result.original_image,
        "heatmap" => &result.heatmap_image,
        "mask" => &result.mask_image,
        "table" => &result.table_image,
        _ => return None,
    };
    if payload.is_empty() {
        return None;
    }
    Some(format!("data:image/jpeg;base64,{payload}"))
}

fn image_card(payload: &str, label: &str, action: &str) -> Option<Value> {
    if payload.is_empty() {
        return None;
    }
    let src = format!("data:image/jpeg;base64,{payload}");
    Some(serde_json::to_value(UiImage::new(&src).label(label).action(action)).unwrap())
}

fn render_classification(result: &AnalysisResult) -> Vec<Value> {
    vec![
        serde_json::to_value(UiText::new("Predicted Classification").size(16.0)).unwrap(),
        serde_json::to_value(
            UiText::new(&result.classification)
                .size(22.0)
                .content_description("classification_label"),
        )
        .unwrap(),
    ]
}

fn render_result_images(result: &AnalysisResult, mode: ViewMode) -> Vec<Value> {
    if !result.has_primary_image() {
        return Vec::new();
    }
    let mut cards = Vec::new();
    cards.extend(image_card(&result.original_image, "Original Image", "image_open:original"));
    cards.extend(image_card(&result.heatmap_image, "XAI Heatmap", "image_open:heatmap"));
    if mode == ViewMode::Detailed {
        cards.extend(image_card(&result.mask_image, "Segmentation Mask", "image_open:mask"));
        cards.extend(image_card(&result.table_image, "Cell Descriptor", "image_open:table"));
    }
    cards
}

pub fn render_results_screen(state: &AppState) -> Value {
    let wizard = &state.wizard;
    let mut children = vec![
        serde_json::to_value(UiText::new("Step 3: Analysis Results").size(20.0)).unwrap(),
        serde_json::to_value(
            UiText::new("View and download your analysis results").size(14.0),
        )
        .unwrap(),
    ];

    if let Some(result) = &wizard.result {
        let summary_active = state.viewer.mode == ViewMode::Summary;
        children.push(json!({
            "type": "Row",
            "children": [
                {
                    "type": "Button",
                    "text": "Summary View",
                    "action": "view_summary",
                    "id": "view_summary_btn",
                    "active": summary_active,
                },
                {
                    "type": "Button",
                    "text": "Detailed View",
                    "action": "view_detailed",
                    "id": "view_detailed_btn",
                    "active": !summary_active,
                },
                {
                    "type": "Button",
                    "text": "Download Results",
                    "action": "download_results",
                    "id": "download_btn",
                },
            ],
        }));

        children.extend(render_classification(result));
        children.extend(render_result_images(result, state.viewer.mode));

        if let Some(error) = &wizard.error {
            children.push(
                serde_json::to_value(
                    UiText::new(error).size(14.0).content_description("error_text"),
                )
                .unwrap(),
            );
        }

        children.push(
            serde_json::to_value(UiRow::new(vec![
                json!({"type": "Button", "text": "Back to Model", "action": "wizard_step:2", "id": "back_btn"}),
                json!({"type": "Button", "text": "Start Over", "action": "reset", "id": "reset_btn"}),
            ]))
            .unwrap(),
        );
    }

    json!({
        "type": "Column",
        "padding": 24,
        "children": children,
    })
}

pub fn render_image_modal(viewer: &ViewerState) -> Value {
    let modal = &viewer.modal;
    let zoom_label = format!("{}%", (modal.zoom * 100.0).round() as i64);
    let toolbar = serde_json::to_value(UiRow::new(vec![
        json!({"type": "Button", "text": "Zoom out", "action": "zoom_out", "id": "zoom_out_btn"}),
        serde_json::to_value(
            UiText::new(&zoom_label).content_description("zoom_value"),
        )
        .unwrap(),
        json!({"type": "Button", "text": "Zoom in", "action": "zoom_in", "id": "zoom_in_btn"}),
        json!({"type": "Button", "text": "Reset", "action": "zoom_reset", "id": "zoom_reset_btn"}),
        json!({"type": "Button", "text": "Close", "action": "modal_close", "id": "modal_close_btn"}),
    ]))
    .unwrap();

    let image = json!({
        "type": "ModalImage",
        "src": modal.src.clone().unwrap_or_default(),
        "zoom": modal.zoom,
        "wheel_action": "zoom_wheel",
    });

    serde_json::to_value(UiModal::new(vec![toolbar, image], "modal_close")).unwrap()
}
