use docstore::errors::{DocStoreError, DocStoreResult, ErrorKind};
use docstore::identifier::PolicyKind;
use docstore::manifest::Manifest;
use docstore::service::CrudService;
use std::backtrace::Backtrace;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use std::{env, fs, thread};

pub fn run_test<T, B, A>(before: B, test: T, after: A)
where
    T: Fn(TestContext) -> DocStoreResult<()> + std::panic::UnwindSafe + std::panic::RefUnwindSafe,
    B: Fn() -> DocStoreResult<TestContext> + std::panic::UnwindSafe + std::panic::RefUnwindSafe,
    A: Fn(TestContext) -> DocStoreResult<()> + std::panic::UnwindSafe + std::panic::RefUnwindSafe,
{
    const MAX_RETRIES: u32 = 3;
    let mut last_error: Option<String> = None;

    for attempt in 1..=MAX_RETRIES {
        let start_time = Instant::now();

        let result = std::panic::catch_unwind(|| {
            let backtrace = Backtrace::capture();
            match before() {
                Ok(ctx) => match test(ctx.clone()) {
                    Ok(_) => after(ctx)
                        .map_err(|e| (format!("After run failed: {:?}", e), backtrace.to_string())),
                    Err(e) => {
                        let _ = after(ctx);
                        Err((format!("Test failed: {:?}", e), backtrace.to_string()))
                    }
                },
                Err(e) => Err((format!("Before run failed: {:?}", e), backtrace.to_string())),
            }
        });

        let elapsed = start_time.elapsed();
        let failure = match result {
            Ok(Ok(_)) => return,
            Ok(Err((e, bt))) => {
                if !bt.is_empty() && !bt.contains("disabled") {
                    eprintln!("Backtrace:\n{}", bt);
                }
                e
            }
            Err(panic_err) => {
                let err_msg = if let Some(s) = panic_err.downcast_ref::<&str>() {
                    s.to_string()
                } else if let Some(s) = panic_err.downcast_ref::<String>() {
                    s.clone()
                } else {
                    format!("Unknown panic: {:?}", panic_err.type_id())
                };
                format!("Panic: {}", err_msg)
            }
        };

        if attempt < MAX_RETRIES {
            eprintln!(
                "\n========== Test Attempt {}/{} Failed (took {:?}) ==========",
                attempt, MAX_RETRIES, elapsed
            );
            eprintln!("{}", failure);
            eprintln!("Retrying in {}ms...\n", 100 * attempt);
            thread::sleep(Duration::from_millis(100 * attempt as u64));
        }
        last_error = Some(failure);
    }

    panic!(
        "Test failed after {} attempts. Last error: {}",
        MAX_RETRIES,
        last_error.unwrap_or_default()
    );
}

#[derive(Clone)]
pub struct TestContext {
    path: String,
    kind: PolicyKind,
    service: CrudService,
}

impl TestContext {
    pub fn new(path: String, kind: PolicyKind, service: CrudService) -> Self {
        Self {
            path,
            kind,
            service,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn kind(&self) -> PolicyKind {
        self.kind
    }

    pub fn service(&self) -> CrudService {
        self.service.clone()
    }

    /// Closes the current service and opens the same store again with
    /// `manifest`, as a process restart would.
    pub fn reopen(&self, kind: PolicyKind, manifest: &Manifest) -> DocStoreResult<CrudService> {
        self.service.close()?;
        open_service(&self.path, kind, manifest.clone())
    }
}

pub fn random_path() -> String {
    let id = uuid::Uuid::new_v4();
    env::temp_dir()
        .join(format!("docstore-{}", id))
        .to_string_lossy()
        .to_string()
}

/// Writes a manifest file into the temp directory and returns its path.
pub fn write_manifest(text: &str) -> DocStoreResult<PathBuf> {
    let path = PathBuf::from(format!("{}.conf", random_path()));
    fs::write(&path, text)?;
    Ok(path)
}

#[cfg(not(feature = "memory"))]
pub fn open_service(path: &str, kind: PolicyKind, manifest: Manifest) -> DocStoreResult<CrudService> {
    use docstore_fjall_adapter::FjallModule;

    let storage_module = FjallModule::with_config()
        .db_path(path)
        .low_memory_preset()
        .build();

    CrudService::builder()
        .load_module(storage_module)
        .identifier_policy(kind)
        .collections(manifest)
        .build()
}

#[cfg(feature = "memory")]
pub fn open_service(_path: &str, kind: PolicyKind, manifest: Manifest) -> DocStoreResult<CrudService> {
    CrudService::builder()
        .identifier_policy(kind)
        .collections(manifest)
        .build()
}

pub fn create_context(kind: PolicyKind) -> DocStoreResult<TestContext> {
    const MAX_ATTEMPTS: u32 = 3;
    let mut last_error: Option<DocStoreError> = None;

    for attempt in 1..=MAX_ATTEMPTS {
        let path = random_path();
        match open_service(&path, kind, Manifest::default()) {
            Ok(service) => return Ok(TestContext::new(path, kind, service)),
            Err(e) => {
                let _ = fs::remove_dir_all(&path);
                if attempt < MAX_ATTEMPTS {
                    eprintln!(
                        "Warning: Failed to create test context (attempt {}/{}): {:?}",
                        attempt, MAX_ATTEMPTS, e
                    );
                    thread::sleep(Duration::from_millis(50 * attempt as u64));
                }
                last_error = Some(e);
            }
        }
    }

    Err(last_error.unwrap_or_else(|| {
        DocStoreError::new("Failed to create test context", ErrorKind::InternalError)
    }))
}

/// Context with token identifiers.
pub fn create_test_context() -> DocStoreResult<TestContext> {
    create_context(PolicyKind::Token)
}

/// Context with positional identifiers.
pub fn create_positional_test_context() -> DocStoreResult<TestContext> {
    create_context(PolicyKind::Positional)
}

pub fn cleanup(ctx: TestContext) -> DocStoreResult<()> {
    if let Err(e) = ctx.service().close() {
        log::warn!("Failed to close service: {:?}", e);
    }

    let path = ctx.path().to_string();
    for retry in 0..10u64 {
        if !std::path::Path::new(&path).exists() {
            return Ok(());
        }
        match fs::remove_dir_all(&path) {
            Ok(_) => return Ok(()),
            Err(e) if retry < 9 => {
                log::debug!("Could not remove {} yet: {}", path, e);
                thread::sleep(Duration::from_millis(50 * (retry + 1)));
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}
