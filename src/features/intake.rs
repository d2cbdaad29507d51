//! Artifact intake: file selection (picker or drop), preview generation and
//! the persistence side effects that make a selection survive a reload.

use crate::features::wizard::WizardState;
use crate::session;
use crate::ui::{Button as UiButton, Image as UiImage, Progress as UiProgress, Text as UiText};
use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine;
use serde_json::{json, Value};

/// The user-selected file under analysis. `preview` is a base64 data URL,
/// present iff the media type is an image type; it doubles as the persisted
/// representation the artifact is reconstructed from after a reload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub name: String,
    pub size: u64,
    pub media_type: String,
    pub content: Vec<u8>,
    pub preview: Option<String>,
}

impl Artifact {
    pub fn is_image(&self) -> bool {
        self.media_type.starts_with("image/")
    }
}

/// Payload the shell sends for a picker selection or a drop; both paths
/// arrive through the same command. `object_url` is an ephemeral browser
/// URL used only as a preview fallback when the content itself does not
/// decode as an image.
pub struct Selection {
    pub name: String,
    pub size: u64,
    pub media_type: String,
    pub content_base64: String,
    pub object_url: Option<String>,
}

/// Accept a selection wholesale: any file is taken (validation is the
/// remote service's job), metadata is persisted, and a preview is built for
/// image media types. Replaces the previous artifact and clears the drag
/// flag.
pub fn select_artifact(state: &mut WizardState, selection: Selection) -> Result<(), String> {
    let content = B64
        .decode(selection.content_base64.as_bytes())
        .map_err(|e| format!("content_decode_failed:{e}"))?;

    let media_type = if selection.media_type.is_empty() {
        sniff_media_type(&content)
    } else {
        selection.media_type
    };

    let mut artifact = Artifact {
        name: selection.name,
        size: selection.size,
        media_type,
        content,
        preview: None,
    };

    if artifact.is_image() {
        match build_preview(&artifact) {
            Ok(data_url) => {
                session::save(session::KEY_FILE_PREVIEW, &data_url);
                artifact.preview = Some(data_url);
            }
            Err(_) => {
                // Content did not decode as an image; fall back to the
                // shell's ephemeral object URL and persist nothing.
                session::clear(session::KEY_FILE_PREVIEW);
                artifact.preview = selection.object_url;
            }
        }
    } else {
        session::clear(session::KEY_FILE_PREVIEW);
    }

    let meta = json!({
        "name": artifact.name,
        "size": artifact.size,
        "type": artifact.media_type,
    });
    session::save(session::KEY_FILE_META, &meta.to_string());

    state.artifact = Some(artifact);
    state.drag_active = false;
    state.error = None;
    Ok(())
}

/// Encode the artifact content as a data URL, but only after the bytes
/// actually decode as an image; a preview that cannot render is worse than
/// no preview.
pub fn build_preview(artifact: &Artifact) -> Result<String, String> {
    image::load_from_memory(&artifact.content).map_err(|e| format!("decode_failed:{e}"))?;
    Ok(format!(
        "data:{};base64,{}",
        artifact.media_type,
        B64.encode(&artifact.content)
    ))
}

fn sniff_media_type(content: &[u8]) -> String {
    infer::Infer::new()
        .get(content)
        .map(|t| t.mime_type().to_string())
        .unwrap_or_default()
}

/// Rebuild the in-memory artifact from the persisted meta + preview pair.
/// Requires both: meta without a preview has no content to decode.
pub fn rehydrate_artifact() -> Option<Artifact> {
    let meta_str = session::load(session::KEY_FILE_META)?;
    let preview = session::load(session::KEY_FILE_PREVIEW)?;
    let meta: Value = serde_json::from_str(&meta_str).ok()?;
    let content = decode_data_url(&preview)?;
    Some(Artifact {
        name: meta.get("name").and_then(|v| v.as_str()).unwrap_or("file").to_string(),
        size: meta.get("size").and_then(|v| v.as_u64()).unwrap_or(0),
        media_type: meta.get("type").and_then(|v| v.as_str()).unwrap_or_default().to_string(),
        content,
        preview: Some(preview),
    })
}

pub fn decode_data_url(url: &str) -> Option<Vec<u8>> {
    let (_, payload) = url.split_once(";base64,")?;
    B64.decode(payload.as_bytes()).ok()
}

pub fn format_bytes(bytes: u64) -> String {
    if bytes == 0 {
        return "0 B".to_string();
    }
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let exp = ((bytes as f64).ln() / 1024f64.ln()).floor() as usize;
    let exp = exp.min(UNITS.len() - 1);
    format!("{:.1} {}", bytes as f64 / 1024f64.powi(exp as i32), UNITS[exp])
}

pub fn render_upload_screen(state: &WizardState) -> Value {
    let mut children = vec![
        serde_json::to_value(UiText::new("Step 1: Upload Image").size(20.0)).unwrap(),
        serde_json::to_value(UiText::new("Upload a medical image for analysis").size(14.0)).unwrap(),
    ];

    match &state.artifact {
        None => {
            let drop_text = if state.drag_active {
                "Drop your file here"
            } else {
                "Drag & drop your image here or click to browse"
            };
            children.push(json!({
                "type": "DropZone",
                "text": drop_text,
                "subtext": "Supports: PNG, JPG, JPEG, BMP, ZIP",
                "action": "select_file",
                "drag_active": state.drag_active,
                "requires_file_picker": true,
            }));
        }
        Some(artifact) => {
            if let Some(preview) = artifact.preview.as_deref().filter(|_| artifact.is_image()) {
                children.push(
                    serde_json::to_value(UiImage::new(preview).label("Uploaded")).unwrap(),
                );
            }
            children.push(
                serde_json::to_value(UiText::new(&format!("File: {}", artifact.name))).unwrap(),
            );
            children.push(
                serde_json::to_value(UiText::new(&format!(
                    "Size: {}",
                    format_bytes(artifact.size)
                )))
                .unwrap(),
            );

            if state.is_uploading() {
                children.push(
                    serde_json::to_value(UiProgress::new().text("Uploading...")).unwrap(),
                );
            } else if !state.statuses.is_success(1) {
                // Hidden once the upload has been accepted.
                children.push(
                    serde_json::to_value(UiButton::new("Upload", "upload").id("upload_btn"))
                        .unwrap(),
                );
            }
        }
    }

    if let Some(error) = &state.error {
        children.push(
            serde_json::to_value(
                UiText::new(error).size(14.0).content_description("error_text"),
            )
            .unwrap(),
        );
    }

    json!({
        "type": "Column",
        "padding": 24,
        "children": children,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::wizard::WizardState;

    fn lock() -> std::sync::MutexGuard<'static, ()> {
        crate::session::test_env_lock()
            .lock()
            .unwrap_or_else(|e| e.into_inner())
    }

    fn tiny_png() -> Vec<u8> {
        let img = image::RgbaImage::new(1, 1);
        let mut bytes: Vec<u8> = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(
                &mut std::io::Cursor::new(&mut bytes),
                image::ImageOutputFormat::Png,
            )
            .expect("encoding a 1x1 png should succeed");
        bytes
    }

    fn selection(name: &str, media_type: &str, content: &[u8]) -> Selection {
        Selection {
            name: name.to_string(),
            size: content.len() as u64,
            media_type: media_type.to_string(),
            content_base64: B64.encode(content),
            object_url: None,
        }
    }

    #[test]
    fn formats_byte_sizes_like_the_upload_summary() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(512), "512.0 B");
        assert_eq!(format_bytes(120_000), "117.2 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MB");
    }

    #[test]
    fn image_selection_builds_and_persists_preview() {
        let _guard = lock();
        crate::session::clear_wizard();
        let mut state = WizardState::new();
        let png = tiny_png();
        select_artifact(&mut state, selection("cell.png", "image/png", &png)).unwrap();

        let artifact = state.artifact.as_ref().unwrap();
        let preview = artifact.preview.as_deref().unwrap();
        assert!(preview.starts_with("data:image/png;base64,"));
        assert_eq!(
            crate::session::load(crate::session::KEY_FILE_PREVIEW).as_deref(),
            Some(preview)
        );
        let meta = crate::session::load(crate::session::KEY_FILE_META).unwrap();
        assert!(meta.contains("cell.png"));
    }

    #[test]
    fn undecodable_image_falls_back_to_object_url_without_persisting() {
        let _guard = lock();
        crate::session::clear_wizard();
        let mut state = WizardState::new();
        let mut sel = selection("broken.png", "image/png", b"not an image at all");
        sel.object_url = Some("blob:fallback".to_string());
        select_artifact(&mut state, sel).unwrap();

        let artifact = state.artifact.as_ref().unwrap();
        assert_eq!(artifact.preview.as_deref(), Some("blob:fallback"));
        assert_eq!(crate::session::load(crate::session::KEY_FILE_PREVIEW), None);
    }

    #[test]
    fn non_image_selection_clears_previous_preview() {
        let _guard = lock();
        crate::session::clear_wizard();
        let mut state = WizardState::new();
        let png = tiny_png();
        select_artifact(&mut state, selection("cell.png", "image/png", &png)).unwrap();
        assert!(crate::session::load(crate::session::KEY_FILE_PREVIEW).is_some());

        select_artifact(&mut state, selection("slides.zip", "application/zip", b"PK"))
            .unwrap();
        let artifact = state.artifact.as_ref().unwrap();
        assert_eq!(artifact.name, "slides.zip");
        assert_eq!(artifact.preview, None);
        assert_eq!(crate::session::load(crate::session::KEY_FILE_PREVIEW), None);
    }

    #[test]
    fn latest_selection_wins() {
        let _guard = lock();
        crate::session::clear_wizard();
        let mut state = WizardState::new();
        let png = tiny_png();
        select_artifact(&mut state, selection("first.png", "image/png", &png)).unwrap();
        select_artifact(&mut state, selection("second.png", "image/png", &png)).unwrap();
        select_artifact(&mut state, selection("third.bmp", "", b"\x00\x01")).unwrap();
        assert_eq!(state.artifact.as_ref().unwrap().name, "third.bmp");
    }

    #[test]
    fn empty_declared_type_is_sniffed_from_content() {
        let _guard = lock();
        crate::session::clear_wizard();
        let mut state = WizardState::new();
        let png = tiny_png();
        select_artifact(&mut state, selection("mystery", "", &png)).unwrap();
        assert_eq!(state.artifact.as_ref().unwrap().media_type, "image/png");
    }

    #[test]
    fn rehydrates_artifact_from_meta_and_preview() {
        let _guard = lock();
        crate::session::clear_wizard();
        let mut state = WizardState::new();
        let png = tiny_png();
        select_artifact(&mut state, selection("cell.png", "image/png", &png)).unwrap();
        let original = state.artifact.clone().unwrap();

        let restored = rehydrate_artifact().expect("artifact should rehydrate");
        assert_eq!(restored, original);
    }

    #[test]
    fn rehydration_requires_both_meta_and_preview() {
        let _guard = lock();
        crate::session::clear_wizard();
        crate::session::save(
            crate::session::KEY_FILE_META,
            r#"{"name":"cell.png","size":3,"type":"image/png"}"#,
        );
        assert!(rehydrate_artifact().is_none());
    }
}
