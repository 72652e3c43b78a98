//! # Dedup Gate Module
//!
//! Tabella process-wide che impedisce due conversioni concorrenti dello
//! stesso path. Un path è membro del set per tutta la durata tra accettazione
//! e outcome terminale, mai fuori da quella finestra: la registrazione
//! restituisce una guardia RAII che rimuove il path al drop, su ogni percorso
//! di uscita (successo, errore o panic del task).

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Set of input paths currently being converted, guarded for concurrent use
#[derive(Clone, Default)]
pub struct ProcessingSet {
    inner: Arc<Mutex<HashSet<PathBuf>>>,
}

impl ProcessingSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically register a path; returns `None` when already registered.
    ///
    /// The check and the insert happen under the same lock, so concurrent
    /// duplicate discoveries of a path yield exactly one winner.
    pub fn register(&self, path: &Path) -> Option<ProcessingGuard> {
        let mut set = self.inner.lock().expect("processing set poisoned");
        if !set.insert(path.to_path_buf()) {
            return None;
        }
        Some(ProcessingGuard {
            set: Arc::clone(&self.inner),
            path: path.to_path_buf(),
        })
    }

    /// Check membership without registering
    pub fn contains(&self, path: &Path) -> bool {
        self.inner
            .lock()
            .expect("processing set poisoned")
            .contains(path)
    }

    /// Number of in-flight registrations
    pub fn len(&self) -> usize {
        self.inner.lock().expect("processing set poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// RAII registration: dropping it unregisters the path
pub struct ProcessingGuard {
    set: Arc<Mutex<HashSet<PathBuf>>>,
    path: PathBuf,
}

impl Drop for ProcessingGuard {
    fn drop(&mut self) {
        if let Ok(mut set) = self.set.lock() {
            set.remove(&self.path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_release() {
        let set = ProcessingSet::new();
        let path = Path::new("/rec/a.mov");

        let guard = set.register(path).expect("first registration wins");
        assert!(set.contains(path));
        assert_eq!(set.len(), 1);

        drop(guard);
        assert!(!set.contains(path));
        assert!(set.is_empty());
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let set = ProcessingSet::new();
        let path = Path::new("/rec/a.mov");

        let _guard = set.register(path).unwrap();
        assert!(set.register(path).is_none());

        // a different path is unaffected
        assert!(set.register(Path::new("/rec/b.mov")).is_some());
    }

    #[test]
    fn test_reregistration_after_release() {
        let set = ProcessingSet::new();
        let path = Path::new("/rec/a.mov");

        drop(set.register(path).unwrap());
        assert!(set.register(path).is_some());
    }

    #[tokio::test]
    async fn test_concurrent_duplicates_never_run_twice() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let set = ProcessingSet::new();
        let path = PathBuf::from("/rec/contended.mov");
        let running = Arc::new(AtomicUsize::new(0));
        let max_running = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..16 {
            let set = set.clone();
            let path = path.clone();
            let running = Arc::clone(&running);
            let max_running = Arc::clone(&max_running);
            handles.push(tokio::spawn(async move {
                if let Some(guard) = set.register(&path) {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    max_running.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(std::time::Duration::from_millis(10)).await;
                    running.fetch_sub(1, Ordering::SeqCst);
                    drop(guard);
                }
            }));
        }

        for handle in handles {
            handle.await.unwrap();
        }
        // the same path is never Running more than once at any instant
        assert_eq!(max_running.load(Ordering::SeqCst), 1);
        assert!(set.is_empty());
    }
}
