//! Session-scoped persistence for in-progress wizard state.
//!
//! Backed by the browser's `sessionStorage` on wasm, so saved values survive
//! a reload but not the end of the browsing session; the storage scope
//! itself enforces the cleanup, not application code. Everything here is
//! best-effort: a quota or serialization failure only costs resumability,
//! never correctness of the current run, so it is swallowed and the
//! in-memory value stays authoritative.

// The four tracked wizard keys; cleared together on reset.
pub const KEY_FILE_META: &str = "wizard_file_meta";
pub const KEY_FILE_PREVIEW: &str = "wizard_file_preview";
pub const KEY_MODEL: &str = "wizard_model";
pub const KEY_MAGVAL: &str = "wizard_magval";

#[cfg(test)]
pub fn test_env_lock() -> &'static std::sync::Mutex<()> {
    use std::sync::{Mutex, OnceLock};
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
}

pub fn save(key: &str, value: &str) {
    backend::session_set(key, value);
}

pub fn load(key: &str) -> Option<String> {
    backend::session_get(key)
}

pub fn clear(key: &str) {
    backend::session_remove(key);
}

pub fn clear_wizard() {
    for key in [KEY_FILE_META, KEY_FILE_PREVIEW, KEY_MODEL, KEY_MAGVAL] {
        clear(key);
    }
}

/// Durable (cross-session) preference storage, used only for the theme
/// preference. Lives in `localStorage` on wasm and is never part of the
/// wizard reset.
pub fn durable_save(key: &str, value: &str) {
    backend::durable_set(key, value);
}

pub fn durable_load(key: &str) -> Option<String> {
    backend::durable_get(key)
}

#[cfg(target_arch = "wasm32")]
mod backend {
    use web_sys::Storage;

    fn session_storage() -> Option<Storage> {
        web_sys::window()?.session_storage().ok().flatten()
    }

    fn local_storage() -> Option<Storage> {
        web_sys::window()?.local_storage().ok().flatten()
    }

    pub fn session_set(key: &str, value: &str) {
        if let Some(storage) = session_storage() {
            let _ = storage.set_item(key, value);
        }
    }

    pub fn session_get(key: &str) -> Option<String> {
        session_storage()?.get_item(key).ok().flatten()
    }

    pub fn session_remove(key: &str) {
        if let Some(storage) = session_storage() {
            let _ = storage.remove_item(key);
        }
    }

    pub fn durable_set(key: &str, value: &str) {
        if let Some(storage) = local_storage() {
            let _ = storage.set_item(key, value);
        }
    }

    pub fn durable_get(key: &str) -> Option<String> {
        local_storage()?.get_item(key).ok().flatten()
    }
}

// Off-wasm there is no browser storage; a process-local map keeps the same
// contract so the state machine and the tests can exercise persistence.
#[cfg(not(target_arch = "wasm32"))]
mod backend {
    use std::collections::HashMap;
    use std::sync::{Mutex, MutexGuard, OnceLock};

    fn session_map() -> MutexGuard<'static, HashMap<String, String>> {
        static STORE: OnceLock<Mutex<HashMap<String, String>>> = OnceLock::new();
        STORE
            .get_or_init(|| Mutex::new(HashMap::new()))
            .lock()
            .expect("session store mutex poisoned")
    }

    fn durable_map() -> MutexGuard<'static, HashMap<String, String>> {
        static STORE: OnceLock<Mutex<HashMap<String, String>>> = OnceLock::new();
        STORE
            .get_or_init(|| Mutex::new(HashMap::new()))
            .lock()
            .expect("durable store mutex poisoned")
    }

    pub fn session_set(key: &str, value: &str) {
        session_map().insert(key.to_string(), value.to_string());
    }

    pub fn session_get(key: &str) -> Option<String> {
        session_map().get(key).cloned()
    }

    pub fn session_remove(key: &str) {
        session_map().remove(key);
    }

    pub fn durable_set(key: &str, value: &str) {
        durable_map().insert(key.to_string(), value.to_string());
    }

    pub fn durable_get(key: &str) -> Option<String> {
        durable_map().get(key).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lock() -> std::sync::MutexGuard<'static, ()> {
        test_env_lock().lock().unwrap_or_else(|e| e.into_inner())
    }

    #[test]
    fn save_load_clear_roundtrip() {
        let _guard = lock();
        save("roundtrip_key", "value");
        assert_eq!(load("roundtrip_key").as_deref(), Some("value"));
        clear("roundtrip_key");
        assert_eq!(load("roundtrip_key"), None);
    }

    #[test]
    fn clear_wizard_removes_all_tracked_keys() {
        let _guard = lock();
        for key in [KEY_FILE_META, KEY_FILE_PREVIEW, KEY_MODEL, KEY_MAGVAL] {
            save(key, "x");
        }
        clear_wizard();
        for key in [KEY_FILE_META, KEY_FILE_PREVIEW, KEY_MODEL, KEY_MAGVAL] {
            assert_eq!(load(key), None, "{key} should be cleared");
        }
    }

    #[test]
    fn durable_scope_is_separate_from_session_scope() {
        let _guard = lock();
        durable_save("scope_key", "durable");
        save("scope_key", "session");
        assert_eq!(durable_load("scope_key").as_deref(), Some("durable"));
        clear("scope_key");
        assert_eq!(durable_load("scope_key").as_deref(), Some("durable"));
    }
}
