use crate::journal::{JOURNAL_FILE_NAME, Journal, ResourceEntry, TOKENS_DIR_NAME};
use crate::locks::{CompareMask, CreateMode, IdentityFactory, ResourceLock, RetryPolicy};
use crate::pool::{DirectoryScan, JournalStrategy, LockSettings, ResourcePool};
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock, Mutex, MutexGuard};
use std::time::Duration;
use tempfile::TempDir;

static CWD_LOCK: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

pub(crate) struct DirGuard {
    original: PathBuf,
    _lock: MutexGuard<'static, ()>,
}

impl DirGuard {
    pub(crate) fn new(new_dir: &Path) -> Self {
        // Changing the process current working directory is global and not thread-safe.
        // Lock it so tests don't race even if a #[serial] annotation is missed.
        let lock = CWD_LOCK.lock().unwrap_or_else(|poison| poison.into_inner());
        let original = std::env::current_dir().unwrap();
        std::env::set_current_dir(new_dir).unwrap();
        Self {
            original,
            _lock: lock,
        }
    }
}

impl Drop for DirGuard {
    fn drop(&mut self) {
        let _ = std::env::set_current_dir(&self.original);
    }
}

/// Write `uploaderN.vdf` files with distinct content into `dir`.
pub(crate) fn write_tokens(dir: &Path, count: usize) -> Vec<PathBuf> {
    std::fs::create_dir_all(dir).unwrap();
    (1..=count)
        .map(|i| {
            let path = dir.join(format!("uploader{}.vdf", i));
            std::fs::write(&path, format!("\"token\" {{ \"id\" \"{}\" }}\n", i)).unwrap();
            path
        })
        .collect()
}

/// Lock settings for a simulated machine with a fast retry policy.
pub(crate) fn test_settings(host: &str) -> LockSettings {
    LockSettings {
        factory: Arc::new(IdentityFactory::with_host(host)),
        mask: CompareMask::HOST,
        create_mode: CreateMode::Exclusive,
        retry: RetryPolicy::new(2, Duration::from_millis(5)),
    }
}

pub(crate) fn scan_pool(dir: &Path, host: &str) -> ResourcePool {
    ResourcePool::new(dir, "vdf", Box::new(DirectoryScan::new(test_settings(host)))).unwrap()
}

/// Create `Tokens/` with `count` token files and a journal tracking them
/// under `base`. Returns the journal path.
pub(crate) fn seed_journal(base: &Path, count: usize) -> PathBuf {
    let tokens_dir = base.join(TOKENS_DIR_NAME);
    write_tokens(&tokens_dir, count);

    let journal_path = base.join(JOURNAL_FILE_NAME);
    let factory = IdentityFactory::with_host("seeder");
    let mut guard = ResourceLock::new(&journal_path, &factory).with_mask(CompareMask::ALL);
    assert!(guard.try_lock(false, CompareMask::ALL).unwrap());

    let entries: Vec<ResourceEntry> = Journal::seed_from_dir(&tokens_dir, "vdf").unwrap();
    let journal = Journal::create(guard, entries).unwrap();
    assert!(journal.save().unwrap());
    journal.into_guard().unlock(false, CompareMask::ALL).unwrap();

    journal_path
}

pub(crate) fn journal_pool(base: &Path, host: &str, owner: &str) -> ResourcePool {
    let journal_path = base.join(JOURNAL_FILE_NAME);
    let strategy = JournalStrategy::new(test_settings(host), &journal_path, owner);
    ResourcePool::new(strategy.tokens_dir(), "vdf", Box::new(strategy)).unwrap()
}

pub(crate) fn temp_dir() -> TempDir {
    TempDir::new().unwrap()
}
