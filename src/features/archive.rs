//! Standalone archive of previously processed predictions, fetched from the
//! remote service. Independent of the wizard: a fetch failure is an error
//! state of this view only, and a wizard reset leaves it alone.

use crate::ui::{Image as UiImage, Progress as UiProgress, Text as UiText};
use serde_json::{json, Value};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub id: String,
    pub magnification: String,
    pub classification: String,
    pub original_image: String,
    pub heatmap_image: String,
    pub table_image: String,
}

pub struct ArchiveState {
    pub entries: Vec<ArchiveEntry>,
    pub loading: bool,
    pub error: Option<String>,
}

impl ArchiveState {
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
            loading: false,
            error: None,
        }
    }
}

pub fn apply_fetch_outcome(state: &mut ArchiveState, outcome: Result<Vec<ArchiveEntry>, String>) {
    state.loading = false;
    match outcome {
        Ok(entries) => {
            state.entries = entries;
            state.error = None;
        }
        Err(message) => {
            state.error = Some(message);
        }
    }
}

fn render_entry(index: usize, entry: &ArchiveEntry) -> Value {
    let mut children = vec![
        serde_json::to_value(UiText::new(&format!("#{}", index + 1)).size(18.0)).unwrap(),
        serde_json::to_value(UiText::new(&format!("ID: {}", entry.id))).unwrap(),
        serde_json::to_value(
            UiText::new(&format!("Magnification: {}", entry.magnification)),
        )
        .unwrap(),
        serde_json::to_value(
            UiText::new(&format!("Classification: {}", entry.classification))
                .content_description("classification_tag"),
        )
        .unwrap(),
    ];

    for (payload, label) in [
        (&entry.original_image, "Original Image"),
        (&entry.heatmap_image, "Heatmap"),
        (&entry.table_image, "Cell Descriptors Table"),
    ] {
        if payload.is_empty() {
            continue;
        }
        let src = format!("data:image/png;base64,{payload}");
        children.push(serde_json::to_value(UiImage::new(&src).label(label)).unwrap());
    }

    json!({
        "type": "Card",
        "children": children,
    })
}

pub fn render_archive_screen(state: &ArchiveState) -> Value {
    let mut children = vec![
        serde_json::to_value(UiText::new("Results Archive").size(22.0)).unwrap(),
        serde_json::to_value(
            UiText::new(
                "Review previously processed predictions with classification and visualizations.",
            )
            .size(14.0),
        )
        .unwrap(),
        json!({"type": "Button", "text": "Back to analysis", "action": "wizard_screen", "id": "wizard_screen_btn"}),
    ];

    if state.loading {
        children.push(
            serde_json::to_value(UiProgress::new().text("Loading previous results...")).unwrap(),
        );
    } else if let Some(error) = &state.error {
        children.push(
            serde_json::to_value(
                UiText::new(&format!("Error: {error}"))
                    .size(14.0)
                    .content_description("error_text"),
            )
            .unwrap(),
        );
    } else if state.entries.is_empty() {
        children.push(
            serde_json::to_value(UiText::new("No previous predictions found.")).unwrap(),
        );
    } else {
        for (index, entry) in state.entries.iter().enumerate() {
            children.push(render_entry(index, entry));
        }
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

    fn entry(id: &str) -> ArchiveEntry {
        ArchiveEntry {
            id: id.to_string(),
            magnification: "0.4".to_string(),
            classification: "Normal".to_string(),
            original_image: "orig".to_string(),
            heatmap_image: "heat".to_string(),
            table_image: String::new(),
        }
    }

    #[test]
    fn fetch_success_replaces_entries_and_clears_error() {
        let mut state = ArchiveState::new();
        state.error = Some("Failed to fetch data".to_string());
        state.loading = true;
        apply_fetch_outcome(&mut state, Ok(vec![entry("a"), entry("b")]));
        assert!(!state.loading);
        assert_eq!(state.error, None);
        assert_eq!(state.entries.len(), 2);
    }

    #[test]
    fn fetch_failure_keeps_previous_entries_but_surfaces_error() {
        let mut state = ArchiveState::new();
        apply_fetch_outcome(&mut state, Ok(vec![entry("a")]));
        state.loading = true;
        apply_fetch_outcome(&mut state, Err("Failed to fetch data".to_string()));
        assert!(!state.loading);
        assert_eq!(state.error.as_deref(), Some("Failed to fetch data"));
        assert_eq!(state.entries.len(), 1);
    }

    #[test]
    fn empty_archive_renders_the_placeholder() {
        let ui = render_archive_screen(&ArchiveState::new());
        let rendered = ui.to_string();
        assert!(rendered.contains("No previous predictions found."));
    }

    #[test]
    fn entry_cards_skip_missing_images() {
        let card = render_entry(0, &entry("a"));
        let rendered = card.to_string();
        assert!(rendered.contains("Original Image"));
        assert!(rendered.contains("Heatmap"));
        assert!(!rendered.contains("Cell Descriptors Table"));
    }
}
