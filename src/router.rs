//! Command router. The host shell sends one JSON command per user action
//! (or `refresh` after an async submission completes) and re-renders from
//! the JSON UI description that comes back. All state lives behind a single
//! mutex; completed submission outcomes are drained at the top of every
//! dispatch, so state transitions only ever happen on this one path.

use crate::features::archive::{self, ArchiveEntry};
use crate::features::intake::{self, Selection};
use crate::features::theme;
use crate::features::viewer::{self, AnalysisResult, ViewMode};
use crate::features::wizard::{self, PendingCall, WizardStep};
use crate::gateway;
use crate::session;
use crate::state::{AppState, Screen};
use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Mutex;
use wasm_bindgen::prelude::*;

static STATE: Mutex<AppState> = Mutex::new(AppState::new());
static OUTCOMES: Mutex<Vec<TaskOutcome>> = Mutex::new(Vec::new());

#[derive(Deserialize)]
struct Command {
    action: String,
    api_base: Option<String>,
    name: Option<String>,
    size: Option<u64>,
    media_type: Option<String>,
    content_base64: Option<String>,
    object_url: Option<String>,
    error: Option<String>,
    bindings: Option<HashMap<String, String>>,
}

enum Action {
    Init { api_base: Option<String> },
    Refresh,
    Reset,
    SelectFile(Selection),
    SelectError { message: String },
    DragEnter,
    DragLeave,
    Upload,
    ModelSelect { value: String },
    MagvalInput { value: String },
    Generate,
    GoToStep { step: u8 },
    SetViewMode { detailed: bool },
    ImageOpen { kind: String },
    ModalClose,
    ZoomIn,
    ZoomOut,
    ZoomReset,
    ZoomWheel { delta_sign: i32 },
    DownloadResults,
    ArchiveScreen,
    WizardScreen,
    ThemeToggle,
}

enum SubmissionJob {
    Upload {
        api_base: String,
        artifact: intake::Artifact,
    },
    Generate {
        api_base: String,
        model: String,
        xai_method: String,
        magval: String,
    },
    Archive {
        api_base: String,
    },
    Bundle {
        api_base: String,
    },
}

enum TaskOutcome {
    Upload(Result<(), String>),
    Generate(Result<AnalysisResult, String>),
    Archive(Result<Vec<ArchiveEntry>, String>),
    Bundle(Result<Vec<u8>, String>),
}

async fn run_submission(job: SubmissionJob) -> TaskOutcome {
    match job {
        SubmissionJob::Upload { api_base, artifact } => {
            TaskOutcome::Upload(gateway::submit_artifact(&api_base, &artifact).await)
        }
        SubmissionJob::Generate {
            api_base,
            model,
            xai_method,
            magval,
        } => TaskOutcome::Generate(
            gateway::submit_parameters(&api_base, &model, &xai_method, &magval).await,
        ),
        SubmissionJob::Archive { api_base } => {
            TaskOutcome::Archive(gateway::fetch_archive(&api_base).await)
        }
        SubmissionJob::Bundle { api_base } => {
            TaskOutcome::Bundle(gateway::download_bundle(&api_base).await)
        }
    }
}

fn push_outcome(outcome: TaskOutcome) {
    OUTCOMES
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .push(outcome);
}

#[cfg(target_arch = "wasm32")]
fn spawn_submission(job: SubmissionJob) {
    wasm_bindgen_futures::spawn_local(async move {
        let outcome = run_submission(job).await;
        push_outcome(outcome);
        notify_render();
    });
}

// In tests the job queue stands in for the browser event loop: dispatching
// leaves the call in flight until the test drives it to completion.
#[cfg(all(not(target_arch = "wasm32"), test))]
static PENDING_JOBS: Mutex<Vec<SubmissionJob>> = Mutex::new(Vec::new());

#[cfg(all(not(target_arch = "wasm32"), test))]
fn spawn_submission(job: SubmissionJob) {
    PENDING_JOBS
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .push(job);
}

#[cfg(all(not(target_arch = "wasm32"), not(test)))]
fn spawn_submission(job: SubmissionJob) {
    // Submissions need a host event loop to resolve; off-wasm builds exist
    // for tests and tooling only.
    drop(job);
}

#[cfg(target_arch = "wasm32")]
thread_local! {
    static RENDER_CALLBACK: std::cell::RefCell<Option<js_sys::Function>> =
        std::cell::RefCell::new(None);
}

/// Register the shell callback invoked whenever an async submission
/// completes. The shell reacts by dispatching `refresh`.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
pub fn set_render_callback(callback: js_sys::Function) {
    RENDER_CALLBACK.with(|cell| *cell.borrow_mut() = Some(callback));
}

#[cfg(target_arch = "wasm32")]
fn notify_render() {
    RENDER_CALLBACK.with(|cell| {
        if let Some(callback) = cell.borrow().as_ref() {
            let _ = callback.call0(&JsValue::NULL);
        }
    });
}

fn parse_action(command: Command) -> Result<Action, String> {
    let Command {
        action,
        api_base,
        name,
        size,
        media_type,
        content_base64,
        object_url,
        error,
        bindings,
    } = command;

    let bindings = bindings.unwrap_or_default();

    match action.as_str() {
        "init" => Ok(Action::Init { api_base }),
        "refresh" => Ok(Action::Refresh),
        "reset" => Ok(Action::Reset),
        "select_file" => {
            if let Some(message) = error {
                return Ok(Action::SelectError { message });
            }
            let content_base64 =
                content_base64.ok_or_else(|| "missing_file_content".to_string())?;
            Ok(Action::SelectFile(Selection {
                name: name.unwrap_or_else(|| "file".to_string()),
                size: size.unwrap_or(0),
                media_type: media_type.unwrap_or_default(),
                content_base64,
                object_url,
            }))
        }
        "drag_enter" | "drag_over" => Ok(Action::DragEnter),
        "drag_leave" => Ok(Action::DragLeave),
        "upload" => Ok(Action::Upload),
        "model_select" => Ok(Action::ModelSelect {
            value: bindings.get("model").cloned().unwrap_or_default(),
        }),
        "magval_input" => Ok(Action::MagvalInput {
            value: bindings.get("magval").cloned().unwrap_or_default(),
        }),
        "generate" => Ok(Action::Generate),
        "view_summary" => Ok(Action::SetViewMode { detailed: false }),
        "view_detailed" => Ok(Action::SetViewMode { detailed: true }),
        "modal_close" => Ok(Action::ModalClose),
        "zoom_in" => Ok(Action::ZoomIn),
        "zoom_out" => Ok(Action::ZoomOut),
        "zoom_reset" => Ok(Action::ZoomReset),
        "zoom_wheel" => Ok(Action::ZoomWheel {
            delta_sign: bindings
                .get("delta_sign")
                .and_then(|v| v.trim().parse::<i32>().ok())
                .unwrap_or(1),
        }),
        "download_results" => Ok(Action::DownloadResults),
        "archive_screen" => Ok(Action::ArchiveScreen),
        "wizard_screen" => Ok(Action::WizardScreen),
        "theme_toggle" => Ok(Action::ThemeToggle),
        other => {
            if let Some(step) = other.strip_prefix("wizard_step:") {
                let step = step
                    .parse::<u8>()
                    .map_err(|_| format!("invalid_step:{step}"))?;
                Ok(Action::GoToStep { step })
            } else if let Some(kind) = other.strip_prefix("image_open:") {
                Ok(Action::ImageOpen {
                    kind: kind.to_string(),
                })
            } else {
                Err(error.unwrap_or_else(|| format!("unknown_action:{other}")))
            }
        }
    }
}

fn apply_task_outcomes(state: &mut AppState) {
    let outcomes: Vec<TaskOutcome> = OUTCOMES
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .drain(..)
        .collect();
    for outcome in outcomes {
        match outcome {
            TaskOutcome::Upload(result) => wizard::apply_upload_outcome(&mut state.wizard, result),
            TaskOutcome::Generate(result) => {
                wizard::apply_generate_outcome(&mut state.wizard, result)
            }
            TaskOutcome::Archive(result) => {
                archive::apply_fetch_outcome(&mut state.archive, result)
            }
            TaskOutcome::Bundle(result) => match result {
                Ok(bytes) => state.wizard.pending_bundle = Some(bytes),
                // A failed download surfaces a message but never touches
                // step state.
                Err(message) => state.wizard.error = Some(message),
            },
        }
    }
}

fn handle_command(command: Command) -> Result<Value, String> {
    let mut guard = STATE.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    let state = &mut *guard;

    apply_task_outcomes(state);

    let action = match parse_action(command) {
        Ok(action) => action,
        Err(err) => {
            state.wizard.error = Some(err);
            return Ok(render_ui(&state));
        }
    };

    match action {
        Action::Init { api_base } => {
            if let Some(base) = api_base {
                state.api_base = base;
            }
            state.theme = theme::load_preference();
            wizard::rehydrate(&mut state.wizard);
        }
        Action::Refresh => {
            // Outcomes were already drained above.
        }
        Action::Reset => {
            state.reset_runtime();
            session::clear_wizard();
        }
        Action::SelectFile(selection) => {
            if state.wizard.in_flight.is_none() {
                if let Err(err) = intake::select_artifact(&mut state.wizard, selection) {
                    state.wizard.error = Some(err);
                }
            }
        }
        Action::SelectError { message } => {
            state.wizard.error = Some(message);
            state.wizard.drag_active = false;
        }
        Action::DragEnter => state.wizard.drag_active = true,
        Action::DragLeave => state.wizard.drag_active = false,
        Action::Upload => {
            let api_base = state.api_base.clone();
            let wizard = &mut state.wizard;
            if wizard.in_flight.is_none() && !wizard.statuses.is_success(1) {
                if let Some(artifact) = wizard.artifact.clone() {
                    wizard.in_flight = Some(PendingCall::Upload);
                    wizard.error = None;
                    spawn_submission(SubmissionJob::Upload { api_base, artifact });
                }
            }
        }
        Action::ModelSelect { value } => {
            if state.wizard.in_flight.is_none() {
                wizard::set_model(&mut state.wizard, &value);
            }
        }
        Action::MagvalInput { value } => {
            if state.wizard.in_flight.is_none() {
                wizard::set_magval(&mut state.wizard, &value);
            }
        }
        Action::Generate => {
            let api_base = state.api_base.clone();
            let wizard = &mut state.wizard;
            if wizard.step == WizardStep::Configure
                && wizard.in_flight.is_none()
                && wizard.params_ready()
            {
                wizard.in_flight = Some(PendingCall::Generate);
                wizard.error = None;
                spawn_submission(SubmissionJob::Generate {
                    api_base,
                    model: wizard.model.clone(),
                    xai_method: wizard.xai_method.clone(),
                    magval: wizard.magval.clone(),
                });
            }
        }
        Action::GoToStep { step } => {
            if state.wizard.in_flight.is_none() {
                state.wizard.go_to_step(step);
            }
        }
        Action::SetViewMode { detailed } => {
            if state.wizard.result.is_some() {
                state.viewer.mode = if detailed {
                    ViewMode::Detailed
                } else {
                    ViewMode::Summary
                };
            }
        }
        Action::ImageOpen { kind } => {
            if let Some(result) = &state.wizard.result {
                if let Some(src) = viewer::modal_src_for(result, &kind) {
                    state.viewer.modal.open_with(src);
                }
            }
        }
        Action::ModalClose => state.viewer.modal.close(),
        Action::ZoomIn => {
            if state.viewer.modal.open {
                state.viewer.modal.zoom_in();
            }
        }
        Action::ZoomOut => {
            if state.viewer.modal.open {
                state.viewer.modal.zoom_out();
            }
        }
        Action::ZoomReset => {
            if state.viewer.modal.open {
                state.viewer.modal.zoom_reset();
            }
        }
        Action::ZoomWheel { delta_sign } => {
            if state.viewer.modal.open {
                state.viewer.modal.zoom_wheel(delta_sign);
            }
        }
        Action::DownloadResults => {
            if state.wizard.result.is_some() {
                spawn_submission(SubmissionJob::Bundle {
                    api_base: state.api_base.clone(),
                });
            }
        }
        Action::ArchiveScreen => {
            state.screen = Screen::Archive;
            state.archive.error = None;
            state.archive.loading = true;
            spawn_submission(SubmissionJob::Archive {
                api_base: state.api_base.clone(),
            });
        }
        Action::WizardScreen => state.screen = Screen::Wizard,
        Action::ThemeToggle => state.theme = theme::toggle(state.theme),
    }

    // A completed bundle download is handed to the shell as a one-shot
    // non-UI response; the shell saves the file and dispatches `refresh`.
    if let Some(bundle) = state.wizard.pending_bundle.take() {
        return Ok(save_file_payload(&bundle));
    }

    Ok(render_ui(&state))
}

fn save_file_payload(bytes: &[u8]) -> Value {
    json!({
        "type": "SaveFile",
        "filename": "output.zip",
        "data_base64": B64.encode(bytes),
    })
}

fn render_ui(state: &AppState) -> Value {
    let screen = match state.screen {
        Screen::Wizard => wizard::render_wizard(state),
        Screen::Archive => archive::render_archive_screen(&state.archive),
    };
    let mut children = vec![screen];
    if state.viewer.modal.open {
        children.push(viewer::render_image_modal(&state.viewer));
    }
    json!({
        "type": "Root",
        "theme": state.theme.as_str(),
        "children": children,
    })
}

fn error_ui(message: &str) -> Value {
    json!({
        "type": "Root",
        "theme": "light",
        "children": [{
            "type": "Text",
            "text": format!("Error: {message}"),
            "content_description": "error_text",
        }],
    })
}

#[wasm_bindgen]
pub fn dispatch(input: &str) -> String {
    let response = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        let command: Command = serde_json::from_str(input).unwrap_or(Command {
            action: "error".into(),
            api_base: None,
            name: None,
            size: None,
            media_type: None,
            content_base64: None,
            object_url: None,
            error: Some("invalid_json".into()),
            bindings: None,
        });

        handle_command(command)
    }));

    let json_value = match response {
        Ok(Ok(value)) => value,
        Ok(Err(err)) => error_ui(&err),
        Err(_) => {
            crate::console_error("dispatch panicked");
            error_ui("panic")
        }
    };

    json_value.to_string()
}

#[cfg(test)]
fn drive_pending_jobs() {
    loop {
        let job = {
            let mut jobs = PENDING_JOBS.lock().unwrap_or_else(|e| e.into_inner());
            if jobs.is_empty() {
                None
            } else {
                Some(jobs.remove(0))
            }
        };
        let Some(job) = job else { break };
        push_outcome(futures::executor::block_on(run_submission(job)));
    }
}
