use serde::Serialize;

#[derive(Serialize)]
pub struct Text<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_description: Option<&'a str>,
}

impl<'a> Text<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            kind: "Text",
            text,
            size: None,
            content_description: None,
        }
    }

    pub fn size(mut self, size: f64) -> Self {
        self.size = Some(size);
        self
    }

    pub fn content_description(mut self, cd: &'a str) -> Self {
        self.content_description = Some(cd);
        self
    }
}

#[derive(Serialize)]
pub struct Button<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub text: &'a str,
    pub action: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requires_file_picker: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_description: Option<&'a str>,
}

impl<'a> Button<'a> {
    pub fn new(text: &'a str, action: &'a str) -> Self {
        Self {
            kind: "Button",
            text,
            action,
            id: None,
            disabled: None,
            requires_file_picker: None,
            content_description: None,
        }
    }

    pub fn id(mut self, id: &'a str) -> Self {
        self.id = Some(id);
        self
    }

    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = Some(disabled);
        self
    }

    pub fn requires_file_picker(mut self, needs: bool) -> Self {
        self.requires_file_picker = Some(needs);
        self
    }

    pub fn content_description(mut self, cd: &'a str) -> Self {
        self.content_description = Some(cd);
        self
    }
}

#[derive(Serialize)]
pub struct Column<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub padding: Option<u32>,
    pub children: Vec<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_description: Option<&'a str>,
}

impl<'a> Column<'a> {
    pub fn new(children: Vec<serde_json::Value>) -> Self {
        Self {
            kind: "Column",
            padding: None,
            children,
            content_description: None,
        }
    }

    pub fn padding(mut self, padding: u32) -> Self {
        self.padding = Some(padding);
        self
    }

    pub fn content_description(mut self, cd: &'a str) -> Self {
        self.content_description = Some(cd);
        self
    }
}

#[derive(Serialize)]
pub struct Row<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub children: Vec<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_description: Option<&'a str>,
}

impl<'a> Row<'a> {
    pub fn new(children: Vec<serde_json::Value>) -> Self {
        Self {
            kind: "Row",
            children,
            content_description: None,
        }
    }

    pub fn content_description(mut self, cd: &'a str) -> Self {
        self.content_description = Some(cd);
        self
    }
}

/// An image rendered from a data URL (or an ephemeral object URL fallback).
#[derive(Serialize)]
pub struct Image<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub src: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_description: Option<&'a str>,
}

impl<'a> Image<'a> {
    pub fn new(src: &'a str) -> Self {
        Self {
            kind: "Image",
            src,
            label: None,
            action: None,
            content_description: None,
        }
    }

    pub fn label(mut self, label: &'a str) -> Self {
        self.label = Some(label);
        self
    }

    pub fn action(mut self, action: &'a str) -> Self {
        self.action = Some(action);
        self
    }

    pub fn content_description(mut self, cd: &'a str) -> Self {
        self.content_description = Some(cd);
        self
    }
}

#[derive(Serialize)]
pub struct TextInput<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub bind_key: &'a str,
    pub action: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub numeric: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disabled: Option<bool>,
}

impl<'a> TextInput<'a> {
    pub fn new(bind_key: &'a str, action: &'a str) -> Self {
        Self {
            kind: "TextInput",
            bind_key,
            action,
            hint: None,
            value: None,
            numeric: None,
            disabled: None,
        }
    }

    pub fn hint(mut self, hint: &'a str) -> Self {
        self.hint = Some(hint);
        self
    }

    pub fn value(mut self, value: &'a str) -> Self {
        self.value = Some(value);
        self
    }

    pub fn numeric(mut self, numeric: bool) -> Self {
        self.numeric = Some(numeric);
        self
    }

    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = Some(disabled);
        self
    }
}

#[derive(Serialize)]
pub struct DropdownOption<'a> {
    pub value: &'a str,
    pub label: &'a str,
}

#[derive(Serialize)]
pub struct Dropdown<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub bind_key: &'a str,
    pub action: &'a str,
    pub options: Vec<DropdownOption<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disabled: Option<bool>,
}

impl<'a> Dropdown<'a> {
    pub fn new(bind_key: &'a str, action: &'a str, options: Vec<DropdownOption<'a>>) -> Self {
        Self {
            kind: "Dropdown",
            bind_key,
            action,
            options,
            selected: None,
            hint: None,
            disabled: None,
        }
    }

    pub fn selected(mut self, selected: &'a str) -> Self {
        self.selected = Some(selected);
        self
    }

    pub fn hint(mut self, hint: &'a str) -> Self {
        self.hint = Some(hint);
        self
    }

    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = Some(disabled);
        self
    }
}

#[derive(Serialize)]
pub struct Progress<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_description: Option<&'a str>,
}

impl<'a> Progress<'a> {
    pub fn new() -> Self {
        Self {
            kind: "Progress",
            text: None,
            content_description: None,
        }
    }

    pub fn text(mut self, text: &'a str) -> Self {
        self.text = Some(text);
        self
    }

    pub fn content_description(mut self, cd: &'a str) -> Self {
        self.content_description = Some(cd);
        self
    }
}

/// Full-screen inspection overlay. `lock_scroll` tells the shell to suspend
/// background page scrolling while the node is mounted; `dismiss_action` is
/// sent for both the close control and the Escape key.
#[derive(Serialize)]
pub struct Modal<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub children: Vec<serde_json::Value>,
    pub lock_scroll: bool,
    pub dismiss_action: &'a str,
}

impl<'a> Modal<'a> {
    pub fn new(children: Vec<serde_json::Value>, dismiss_action: &'a str) -> Self {
        Self {
            kind: "Modal",
            children,
            lock_scroll: true,
            dismiss_action,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn button_serializes_disabled_and_picker_flags() {
        let button = Button::new("Upload", "upload")
            .id("upload_btn")
            .disabled(true)
            .requires_file_picker(false);
        let val = serde_json::to_value(button).unwrap();
        assert_eq!(val.get("type").and_then(|v| v.as_str()), Some("Button"));
        assert_eq!(val.get("action").and_then(|v| v.as_str()), Some("upload"));
        assert_eq!(val.get("disabled").and_then(|v| v.as_bool()), Some(true));
        assert_eq!(val.get("id").and_then(|v| v.as_str()), Some("upload_btn"));
    }

    #[test]
    fn modal_always_locks_scroll() {
        let modal = Modal::new(vec![json!({"type": "Text", "text": "x"})], "modal_close");
        let val = serde_json::to_value(modal).unwrap();
        assert_eq!(val.get("lock_scroll").and_then(|v| v.as_bool()), Some(true));
        assert_eq!(
            val.get("dismiss_action").and_then(|v| v.as_str()),
            Some("modal_close")
        );
    }

    #[test]
    fn dropdown_serializes_options_in_order() {
        let dropdown = Dropdown::new(
            "model",
            "model_select",
            vec![
                DropdownOption { value: "vgg16", label: "VGG16 Adapted (LRP)" },
                DropdownOption { value: "xception", label: "Xception Net (GradCAM++)" },
            ],
        )
        .selected("vgg16");
        let val = serde_json::to_value(dropdown).unwrap();
        let options = val.get("options").and_then(|o| o.as_array()).unwrap();
        assert_eq!(options.len(), 2);
        assert_eq!(options[0].get("value").and_then(|v| v.as_str()), Some("vgg16"));
        assert_eq!(val.get("selected").and_then(|v| v.as_str()), Some("vgg16"));
    }
}
