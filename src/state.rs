use crate::features::archive::ArchiveState;
use crate::features::theme::Theme;
use crate::features::viewer::ViewerState;
use crate::features::wizard::WizardState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Wizard,
    Archive,
}

pub struct AppState {
    pub screen: Screen,
    pub theme: Theme,
    pub api_base: String,
    pub wizard: WizardState,
    pub viewer: ViewerState,
    pub archive: ArchiveState,
}

impl AppState {
    // const so it can be used in static initialization
    pub const fn new() -> Self {
        Self {
            screen: Screen::Wizard,
            theme: Theme::Light,
            api_base: String::new(),
            wizard: WizardState::new(),
            viewer: ViewerState::new(),
            archive: ArchiveState::new(),
        }
    }

    /// Back to the wizard's initial state. The archive (server-side
    /// history) and the theme preference are deliberately left alone.
    pub fn reset_runtime(&mut self) {
        self.wizard.reset();
        self.viewer.reset();
        self.screen = Screen::Wizard;
    }
}
