//! The three-step wizard state machine: current step, per-step status,
//! navigation gating, parameter derivation and rehydration.

use crate::features::intake::{self, Artifact};
use crate::features::viewer::AnalysisResult;
use crate::session;
use crate::state::AppState;
use crate::ui::{
    Button as UiButton, Dropdown as UiDropdown, DropdownOption, Row as UiRow, Text as UiText,
    TextInput as UiTextInput,
};
use serde_json::{json, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardStep {
    Upload,
    Configure,
    Results,
}

impl WizardStep {
    pub fn index(self) -> u8 {
        match self {
            WizardStep::Upload => 1,
            WizardStep::Configure => 2,
            WizardStep::Results => 3,
        }
    }

    pub fn from_index(index: u8) -> Option<Self> {
        match index {
            1 => Some(WizardStep::Upload),
            2 => Some(WizardStep::Configure),
            3 => Some(WizardStep::Results),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    Unset,
    Success,
    Error,
}

impl StepStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            StepStatus::Unset => "unset",
            StepStatus::Success => "success",
            StepStatus::Error => "error",
        }
    }
}

/// Per-step completion state, indexed 1..=3. A step can only become
/// `Success` once its predecessor is `Success`; violating calls are
/// ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepStatuses([StepStatus; 3]);

impl StepStatuses {
    pub const fn new() -> Self {
        Self([StepStatus::Unset; 3])
    }

    pub fn get(&self, step: u8) -> StepStatus {
        match step {
            1..=3 => self.0[(step - 1) as usize],
            _ => StepStatus::Unset,
        }
    }

    pub fn is_success(&self, step: u8) -> bool {
        self.get(step) == StepStatus::Success
    }

    pub fn mark_success(&mut self, step: u8) {
        if !(1..=3).contains(&step) {
            return;
        }
        if step > 1 && !self.is_success(step - 1) {
            return;
        }
        self.0[(step - 1) as usize] = StepStatus::Success;
    }

    pub fn mark_error(&mut self, step: u8) {
        if (1..=3).contains(&step) {
            self.0[(step - 1) as usize] = StepStatus::Error;
        }
    }

    pub fn clear(&mut self) {
        self.0 = [StepStatus::Unset; 3];
    }
}

/// Which remote submission is currently outstanding. At most one; the
/// triggering controls are disabled while it is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingCall {
    Upload,
    Generate,
}

pub struct WizardState {
    pub step: WizardStep,
    pub statuses: StepStatuses,
    pub artifact: Option<Artifact>,
    pub drag_active: bool,
    pub model: String,
    pub xai_method: String,
    pub magval: String,
    pub result: Option<AnalysisResult>,
    pub in_flight: Option<PendingCall>,
    pub error: Option<String>,
    pub pending_bundle: Option<Vec<u8>>,
}

impl WizardState {
    pub const fn new() -> Self {
        Self {
            step: WizardStep::Upload,
            statuses: StepStatuses::new(),
            artifact: None,
            drag_active: false,
            model: String::new(),
            xai_method: String::new(),
            magval: String::new(),
            result: None,
            in_flight: None,
            error: None,
            pending_bundle: None,
        }
    }

    pub fn is_uploading(&self) -> bool {
        self.in_flight == Some(PendingCall::Upload)
    }

    pub fn is_generating(&self) -> bool {
        self.in_flight == Some(PendingCall::Generate)
    }

    pub fn params_ready(&self) -> bool {
        !self.model.is_empty() && !self.xai_method.is_empty() && !self.magval.is_empty()
    }

    /// Navigation gating: backwards is always allowed, forwards only over
    /// completed predecessors.
    pub fn can_go_to(&self, target: u8) -> bool {
        if target < 1 || target > 3 {
            return false;
        }
        if target <= self.step.index() {
            return true;
        }
        match target {
            2 => self.statuses.is_success(1),
            3 => self.statuses.is_success(1) && self.statuses.is_success(2),
            _ => false,
        }
    }

    /// Manual step navigation; disallowed targets are a no-op, not an
    /// error.
    pub fn go_to_step(&mut self, target: u8) {
        if self.can_go_to(target) {
            if let Some(step) = WizardStep::from_index(target) {
                self.step = step;
            }
        }
    }

    pub fn reset(&mut self) {
        *self = WizardState::new();
    }
}

/// The method is derived from the model choice and never independently
/// user-editable.
pub fn derive_method(model: &str) -> &'static str {
    match model {
        "vgg16" => "LRP",
        "xception" => "GradCAM++",
        _ => "",
    }
}

pub fn set_model(state: &mut WizardState, value: &str) {
    state.model = value.to_string();
    state.xai_method = derive_method(value).to_string();
    if state.model.is_empty() {
        session::clear(session::KEY_MODEL);
    } else {
        session::save(session::KEY_MODEL, &state.model);
    }
}

pub fn set_magval(state: &mut WizardState, value: &str) {
    state.magval = value.to_string();
    if state.magval.is_empty() {
        session::clear(session::KEY_MAGVAL);
    } else {
        session::save(session::KEY_MAGVAL, &state.magval);
    }
}

pub fn apply_upload_outcome(state: &mut WizardState, outcome: Result<(), String>) {
    state.in_flight = None;
    match outcome {
        Ok(()) => {
            state.statuses.mark_success(1);
            state.error = None;
            state.step = WizardStep::Configure;
        }
        Err(message) => {
            state.statuses.mark_error(1);
            state.error = Some(message);
        }
    }
}

pub fn apply_generate_outcome(state: &mut WizardState, outcome: Result<AnalysisResult, String>) {
    state.in_flight = None;
    match outcome {
        Ok(result) => {
            state.statuses.mark_success(2);
            // Step 3 counts as done only when there is a usable primary
            // image to show.
            if result.has_primary_image() {
                state.statuses.mark_success(3);
            }
            state.result = Some(result);
            state.error = None;
            state.step = WizardStep::Results;
        }
        Err(message) => {
            state.statuses.mark_error(2);
            state.error = Some(message);
        }
    }
}

/// Restore persisted parameters and artifact after a reload. Step statuses
/// are not persisted: restored data resumes at step 1, since the
/// reconstructed artifact has not been re-submitted to the remote service.
pub fn rehydrate(state: &mut WizardState) {
    if let Some(saved_model) = session::load(session::KEY_MODEL) {
        set_model(state, &saved_model);
    }
    if let Some(saved_mag) = session::load(session::KEY_MAGVAL) {
        state.magval = saved_mag;
    }
    if let Some(artifact) = intake::rehydrate_artifact() {
        state.artifact = Some(artifact);
    }
}

pub fn render_progress(state: &WizardState) -> Value {
    let mut children = Vec::new();
    for step in 1..=3u8 {
        children.push(json!({
            "type": "ProgressStep",
            "step": step,
            "status": state.statuses.get(step).as_str(),
            "current": state.step.index() == step,
            "action": format!("wizard_step:{step}"),
        }));
        if step < 3 {
            children.push(json!({
                "type": "ProgressConnector",
                "status": state.statuses.get(step).as_str(),
            }));
        }
    }
    serde_json::to_value(UiRow::new(children).content_description("wizard_progress")).unwrap()
}

pub fn render_configure_screen(state: &WizardState) -> Value {
    let generating = state.is_generating();
    let mut children = vec![
        serde_json::to_value(UiText::new("Step 2: Choose Model").size(20.0)).unwrap(),
        serde_json::to_value(UiText::new("Select a model for image analysis").size(14.0)).unwrap(),
        serde_json::to_value(
            UiDropdown::new(
                "model",
                "model_select",
                vec![
                    DropdownOption { value: "", label: "Select a model" },
                    DropdownOption { value: "vgg16", label: "VGG16 Adapted (LRP)" },
                    DropdownOption { value: "xception", label: "Xception Net (GradCAM++)" },
                ],
            )
            .selected(&state.model)
            .disabled(generating),
        )
        .unwrap(),
        serde_json::to_value(
            UiTextInput::new("magval", "magval_input")
                .hint("Enter Magnification Value")
                .value(&state.magval)
                .numeric(true)
                .disabled(generating),
        )
        .unwrap(),
    ];

    if let Some(error) = &state.error {
        children.push(
            serde_json::to_value(
                UiText::new(error).size(14.0).content_description("error_text"),
            )
            .unwrap(),
        );
    }

    let generate_label = if generating { "Processing..." } else { "Generate" };
    children.push(
        serde_json::to_value(UiRow::new(vec![
            serde_json::to_value(UiButton::new("Back", "wizard_step:1").id("back_btn")).unwrap(),
            serde_json::to_value(
                UiButton::new(generate_label, "generate")
                    .id("generate_btn")
                    .disabled(!state.params_ready() || generating),
            )
            .unwrap(),
        ]))
        .unwrap(),
    );

    json!({
        "type": "Column",
        "padding": 24,
        "children": children,
    })
}

pub fn render_wizard(state: &AppState) -> Value {
    let step_screen = match state.wizard.step {
        WizardStep::Upload => intake::render_upload_screen(&state.wizard),
        WizardStep::Configure => render_configure_screen(&state.wizard),
        WizardStep::Results => crate::features::viewer::render_results_screen(state),
    };
    json!({
        "type": "Column",
        "padding": 16,
        "children": [render_progress(&state.wizard), step_screen],
    })
}
