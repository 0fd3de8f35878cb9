use anyhow::Result;
use directories::ProjectDirs;
use fs2::FileExt;
use std::env;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

/// Overrides the data directory; tests point it at a temp dir.
pub const DATA_DIR_ENV: &str = "PACKPAL_DATA_DIR";

const LOCK_ATTEMPTS: u32 = 50;
const LOCK_RETRY_DELAY: Duration = Duration::from_millis(10);

/// Durable key/value storage: one JSON file per key under a root directory.
#[derive(Clone, Debug)]
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    /// Storage under the platform data dir (or `PACKPAL_DATA_DIR`).
    pub fn open_default() -> Option<Self> {
        Self::default_dir().map(Self::new)
    }

    pub fn default_dir() -> Option<PathBuf> {
        if let Ok(dir) = env::var(DATA_DIR_ENV) {
            return Some(PathBuf::from(dir));
        }
        ProjectDirs::from("com", "packpal", "packpal").map(|proj| proj.data_dir().to_path_buf())
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let safe: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
            .collect();
        self.root.join(format!("{}.json", safe))
    }

    fn ensure_root(&self) -> Result<()> {
        if !self.root.exists() {
            fs::create_dir_all(&self.root)?;
        }
        Ok(())
    }

    /// Atomic write: Write to .tmp file then rename
    pub fn atomic_write<P: AsRef<Path>, C: AsRef<[u8]>>(path: P, contents: C) -> Result<()> {
        let path = path.as_ref();
        let tmp_path = path.with_extension("tmp");
        fs::write(&tmp_path, contents)?;
        fs::rename(tmp_path, path)?;
        Ok(())
    }

    /// Runs `f` while holding an exclusive advisory lock next to `path`.
    ///
    /// Gives up after about half a second instead of parking the calling
    /// (async runtime) thread behind another process indefinitely.
    pub fn with_lock<T, F>(path: &Path, f: F) -> Result<T>
    where
        F: FnOnce() -> Result<T>,
    {
        let lock_path = path.with_extension("lock");
        let lock_file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)?;
        let mut attempt = 1;
        loop {
            match lock_file.try_lock_exclusive() {
                Ok(()) => break,
                Err(e)
                    if e.raw_os_error() == fs2::lock_contended_error().raw_os_error()
                        && attempt < LOCK_ATTEMPTS =>
                {
                    attempt += 1;
                    thread::sleep(LOCK_RETRY_DELAY);
                }
                Err(e) => {
                    return Err(anyhow::anyhow!("{} is locked: {}", lock_path.display(), e));
                }
            }
        }
        let result = f();
        let _ = FileExt::unlock(&lock_file);
        result
    }

    /// Raw stored value, `None` when the key was never written.
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        let raw = Self::with_lock(&path, || Ok(fs::read_to_string(&path)?))?;
        Ok(Some(raw))
    }

    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        self.ensure_root()?;
        let path = self.path_for(key);
        Self::with_lock(&path, || Self::atomic_write(&path, value))
    }

    pub fn remove(&self, key: &str) -> Result<()> {
        let path = self.path_for(key);
        if path.exists() {
            Self::with_lock(&path, || Ok(fs::remove_file(&path)?))?;
            let _ = fs::remove_file(path.with_extension("lock"));
        }
        Ok(())
    }
}
