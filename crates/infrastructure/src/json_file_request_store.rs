//! Durable request store backed by a single JSON snapshot file.
//!
//! Writers take an exclusive advisory lock on a `<file>.lock` sidecar, read
//! the latest snapshot, apply one mutation, write a temp file in the same
//! directory, fsync it and rename it over the snapshot. Readers take a shared
//! lock for a short while and fall back to an unlocked read, which is safe
//! because the snapshot is only ever replaced by rename.

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use fs2::FileExt;
use tempadmin_application::{
    MutationOutcome, PrivilegeRequestRepository, RequestMutation, UpdatedRequest,
};
use tempadmin_core::{AppError, AppResult};
use tempadmin_domain::{PrivilegeRequest, RequestId};
use tracing::{debug, error, warn};

mod snapshot;

use snapshot::{StoreSnapshot, StoredRequest};

/// Lock acquisition limits for the file store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStoreTimeouts {
    /// How long a writer waits for the exclusive lock before failing.
    pub write_lock: Duration,
    /// How long a reader waits for the shared lock before reading unlocked.
    pub read_lock: Duration,
}

impl Default for FileStoreTimeouts {
    fn default() -> Self {
        Self {
            write_lock: Duration::from_millis(5_000),
            read_lock: Duration::from_millis(250),
        }
    }
}

const LOCK_BACKOFF_START: Duration = Duration::from_millis(5);
const LOCK_BACKOFF_MAX: Duration = Duration::from_millis(100);

#[derive(Debug)]
struct StoreFiles {
    path: PathBuf,
    lock_path: PathBuf,
    timeouts: FileStoreTimeouts,
}

/// File-backed [`PrivilegeRequestRepository`] safe across processes.
#[derive(Debug, Clone)]
pub struct JsonFileRequestStore {
    files: Arc<StoreFiles>,
}

impl JsonFileRequestStore {
    /// Creates a store for the snapshot at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, timeouts: FileStoreTimeouts) -> Self {
        let path = path.into();
        let mut lock_name = path.as_os_str().to_owned();
        lock_name.push(".lock");

        Self {
            files: Arc::new(StoreFiles {
                path,
                lock_path: PathBuf::from(lock_name),
                timeouts,
            }),
        }
    }

    /// Returns the snapshot file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.files.path.as_path()
    }

    async fn run_blocking<T, F>(&self, operation: F) -> AppResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&StoreFiles) -> AppResult<T> + Send + 'static,
    {
        let files = Arc::clone(&self.files);
        tokio::task::spawn_blocking(move || operation(&files))
            .await
            .map_err(|error| AppError::Internal(format!("request store task failed: {error}")))?
    }
}

impl StoreFiles {
    fn open_lock_file(&self) -> AppResult<File> {
        if let Some(parent) = self.lock_path.parent().filter(|parent| !parent.as_os_str().is_empty())
        {
            fs::create_dir_all(parent).map_err(|error| {
                AppError::Store(format!(
                    "failed to create store directory '{}': {error}",
                    parent.display()
                ))
            })?;
        }

        OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&self.lock_path)
            .map_err(|error| {
                AppError::Store(format!(
                    "failed to open lock file '{}': {error}",
                    self.lock_path.display()
                ))
            })
    }

    /// Polls `try_lock` with exponential backoff until `timeout` elapses.
    fn acquire(
        &self,
        file: &File,
        timeout: Duration,
        try_lock: fn(&File) -> std::io::Result<()>,
    ) -> AppResult<bool> {
        let deadline = Instant::now() + timeout;
        let mut backoff = LOCK_BACKOFF_START;

        loop {
            match try_lock(file) {
                Ok(()) => return Ok(true),
                Err(error) if is_contended(&error) => {}
                Err(error) => {
                    return Err(AppError::Store(format!(
                        "failed to lock '{}': {error}",
                        self.lock_path.display()
                    )));
                }
            }

            let now = Instant::now();
            if now >= deadline {
                return Ok(false);
            }
            std::thread::sleep(backoff.min(deadline - now));
            backoff = (backoff * 2).min(LOCK_BACKOFF_MAX);
        }
    }

    fn read_snapshot(&self) -> AppResult<StoreSnapshot> {
        let contents = match fs::read(&self.path) {
            Ok(contents) => contents,
            Err(error) if error.kind() == ErrorKind::NotFound => {
                return Ok(StoreSnapshot::default());
            }
            Err(error) => {
                return Err(AppError::Store(format!(
                    "failed to read '{}': {error}",
                    self.path.display()
                )));
            }
        };

        if contents.iter().all(u8::is_ascii_whitespace) {
            return Ok(StoreSnapshot::default());
        }

        StoreSnapshot::from_json(&contents)
    }

    fn write_snapshot(&self, snapshot: &StoreSnapshot) -> AppResult<()> {
        let directory = self
            .path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let file_name = self
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "requests.json".to_owned());
        let temp_path = directory.join(format!(".{file_name}.{}.tmp", std::process::id()));

        let bytes = snapshot.to_json()?;
        let store_error = |error: std::io::Error| {
            AppError::Store(format!(
                "failed to write '{}': {error}",
                temp_path.display()
            ))
        };

        let mut temp = File::create(&temp_path).map_err(store_error)?;
        temp.write_all(&bytes).map_err(store_error)?;
        temp.sync_all().map_err(store_error)?;
        drop(temp);

        fs::rename(&temp_path, &self.path).map_err(|error| {
            let _ = fs::remove_file(&temp_path);
            AppError::Store(format!(
                "failed to replace '{}': {error}",
                self.path.display()
            ))
        })?;

        // Persist the rename itself.
        if let Err(error) = File::open(directory).and_then(|dir| dir.sync_all()) {
            debug!(error = %error, "directory fsync unavailable");
        }

        Ok(())
    }

    /// Runs one exclusive read-modify-write cycle.
    fn with_exclusive<T>(
        &self,
        apply: impl FnOnce(&mut StoreSnapshot) -> AppResult<(T, bool)>,
    ) -> AppResult<T> {
        let lock_file = self.open_lock_file()?;
        let acquired = self.acquire(
            &lock_file,
            self.timeouts.write_lock,
            <File as FileExt>::try_lock_exclusive,
        )?;
        if !acquired {
            return Err(AppError::Store(format!(
                "timed out after {}ms waiting for '{}'",
                self.timeouts.write_lock.as_millis(),
                self.lock_path.display()
            )));
        }

        let result = self.read_snapshot().and_then(|mut snapshot| {
            let (value, changed) = apply(&mut snapshot)?;
            if changed {
                self.write_snapshot(&snapshot)?;
            }
            Ok(value)
        });

        if let Err(error) = <File as FileExt>::unlock(&lock_file) {
            warn!(error = %error, "failed to release store lock");
        }
        result
    }

    fn with_shared(&self) -> AppResult<StoreSnapshot> {
        let lock_file = self.open_lock_file()?;
        let locked = self.acquire(
            &lock_file,
            self.timeouts.read_lock,
            <File as FileExt>::try_lock_shared,
        )?;
        if !locked {
            warn!(
                path = %self.path.display(),
                "store read lock busy, reading without lock"
            );
        }

        let snapshot = self.read_snapshot();
        if locked && let Err(error) = <File as FileExt>::unlock(&lock_file) {
            warn!(error = %error, "failed to release store lock");
        }
        snapshot
    }
}

fn is_contended(error: &std::io::Error) -> bool {
    error.kind() == ErrorKind::WouldBlock
        || error.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}

#[async_trait]
impl PrivilegeRequestRepository for JsonFileRequestStore {
    async fn create(&self, request: PrivilegeRequest) -> AppResult<()> {
        self.run_blocking(move |files| {
            files.with_exclusive(|snapshot| {
                let key = request.id().to_string();
                if snapshot.requests.contains_key(&key) {
                    return Err(AppError::Store(format!(
                        "privilege request '{key}' already exists"
                    )));
                }
                snapshot
                    .requests
                    .insert(key, StoredRequest::from(&request));
                Ok(((), true))
            })
        })
        .await
    }

    async fn find_by_id(&self, id: RequestId) -> AppResult<Option<PrivilegeRequest>> {
        self.run_blocking(move |files| {
            files
                .with_shared()?
                .requests
                .remove(&id.to_string())
                .map(StoredRequest::into_request)
                .transpose()
        })
        .await
    }

    async fn list_all(&self) -> AppResult<Vec<PrivilegeRequest>> {
        self.run_blocking(|files| {
            let snapshot = files.with_shared()?;
            let mut requests = Vec::with_capacity(snapshot.requests.len());
            for (key, stored) in snapshot.requests {
                match stored.into_request() {
                    Ok(request) => requests.push(request),
                    Err(error) => error!(
                        request_id = %key,
                        error = %error,
                        security = true,
                        "skipping unreadable stored request"
                    ),
                }
            }
            requests.sort_by_key(|request| std::cmp::Reverse(request.created_at()));
            Ok(requests)
        })
        .await
    }

    async fn update(
        &self,
        id: RequestId,
        mutation: RequestMutation,
    ) -> AppResult<UpdatedRequest> {
        self.run_blocking(move |files| {
            files.with_exclusive(|snapshot| {
                let key = id.to_string();
                let stored = snapshot.requests.get(&key).cloned().ok_or_else(|| {
                    AppError::NotFound(format!("privilege request '{id}' does not exist"))
                })?;

                let mut request = stored.into_request()?;
                let outcome = mutation(&mut request)?;
                if outcome == MutationOutcome::Changed {
                    request.check_invariants()?;
                    snapshot.requests.insert(key, StoredRequest::from(&request));
                }

                Ok((UpdatedRequest { request, outcome }, outcome == MutationOutcome::Changed))
            })
        })
        .await
    }
}
