//! Process-wide theme preference shared by every page of the host shell.
//!
//! Initialized once from the durable preference at startup, updated only by
//! the toggle action, and published to the shell on every render. A wizard
//! reset never touches it.

use crate::session;

const THEME_KEY: &str = "theme";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Theme {
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }
}

pub fn load_preference() -> Theme {
    match session::durable_load(THEME_KEY).as_deref() {
        Some("dark") => Theme::Dark,
        _ => Theme::Light,
    }
}

pub fn toggle(current: Theme) -> Theme {
    let next = match current {
        Theme::Light => Theme::Dark,
        Theme::Dark => Theme::Light,
    };
    session::durable_save(THEME_KEY, next.as_str());
    next
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lock() -> std::sync::MutexGuard<'static, ()> {
        crate::session::test_env_lock()
            .lock()
            .unwrap_or_else(|e| e.into_inner())
    }

    #[test]
    fn toggle_persists_the_new_preference() {
        let _guard = lock();
        let next = toggle(Theme::Light);
        assert_eq!(next, Theme::Dark);
        assert_eq!(load_preference(), Theme::Dark);
        let back = toggle(next);
        assert_eq!(back, Theme::Light);
        assert_eq!(load_preference(), Theme::Light);
    }

    #[test]
    fn unknown_preference_defaults_to_light() {
        let _guard = lock();
        crate::session::durable_save("theme", "sepia");
        assert_eq!(load_preference(), Theme::Light);
    }
}
