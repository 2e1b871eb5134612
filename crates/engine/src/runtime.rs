//! Process-wide engine slot.
//!
//! The engine has lifecycle `init -> start -> (ticks) -> stop -> destroy`
//! and there is at most one live instance per process. Installing a new
//! instance destroys its predecessor first.

use std::sync::{Arc, Mutex, OnceLock};

use crate::engine::SyncEngine;

fn slot() -> &'static Mutex<Option<Arc<SyncEngine>>> {
    static SLOT: OnceLock<Mutex<Option<Arc<SyncEngine>>>> = OnceLock::new();
    SLOT.get_or_init(|| Mutex::new(None))
}

/// Install a new engine as the process-wide instance, destroying any
/// previous one. Returns the replaced engine, already destroyed.
pub fn install_engine(engine: Arc<SyncEngine>) -> Option<Arc<SyncEngine>> {
    let mut guard = slot().lock().expect("engine slot poisoned");
    let previous = guard.replace(engine);
    if let Some(previous) = &previous {
        previous.destroy();
    }
    previous
}

/// The currently installed engine, if any.
pub fn current_engine() -> Option<Arc<SyncEngine>> {
    slot().lock().expect("engine slot poisoned").clone()
}

/// Destroy and drop the installed engine.
pub fn shutdown_engine() {
    let mut guard = slot().lock().expect("engine slot poisoned");
    if let Some(engine) = guard.take() {
        engine.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::SyncHooks;
    use crate::view::CatalogView;
    use promptdeck_core::sync::SyncConfig;
    use promptdeck_storage_sqlite::CatalogStore;
    use tempfile::{tempdir, TempDir};

    fn build_engine(dir: &TempDir) -> Arc<SyncEngine> {
        let store = Arc::new(
            CatalogStore::open_in_dir(&dir.path().to_string_lossy()).expect("open store"),
        );
        let view = CatalogView::new(Arc::clone(&store));
        SyncEngine::new(view, store, SyncConfig::default(), SyncHooks::default())
    }

    // Single test: the slot is process-global, so parallel tests would race.
    #[tokio::test]
    async fn install_replaces_and_destroys_the_predecessor() {
        let dir_a = tempdir().expect("tempdir");
        let dir_b = tempdir().expect("tempdir");

        let first = build_engine(&dir_a);
        assert!(install_engine(Arc::clone(&first)).is_none());
        assert!(Arc::ptr_eq(&current_engine().expect("installed"), &first));

        let second = build_engine(&dir_b);
        let replaced = install_engine(Arc::clone(&second)).expect("previous returned");
        assert!(Arc::ptr_eq(&replaced, &first));
        assert!(Arc::ptr_eq(&current_engine().expect("installed"), &second));

        shutdown_engine();
        assert!(current_engine().is_none());
    }
}
