//! # docstore fjall adapter
//!
//! Persistent storage for docstore collections on top of the
//! [fjall](https://docs.rs/fjall) LSM-tree keyspace.
//!
//! ```text
//! use docstore::service::CrudService;
//! use docstore_fjall_adapter::FjallModule;
//!
//! let service = CrudService::builder()
//!     .load_module(FjallModule::with_config().production_preset().db_path("storage").build())
//!     .manifest("collections.conf")
//!     .build()?;
//! ```
//!
//! ## Module Organization
//!
//! - `config` - keyspace and partition tuning shared by every clone
//! - `module` - the store module and its builder with presets
//! - `store` - the [FjallStore] document store
//! - `wrapper` - byte encoding of documents, values and index keys

mod config;
mod module;
mod store;
mod wrapper;

pub use config::*;
pub use module::*;
pub use store::*;
pub use wrapper::{FjallValue, FjallValueError, FjallValueResult};

#[cfg(test)]
mod tests {
    use crate::config::FjallConfig;
    use crate::store::FjallStore;
    use docstore::store::DocumentStoreProvider;
    use std::mem;

    #[ctor::ctor]
    fn init() {
        colog::init();
    }

    pub struct Context {
        path: String,
        fjall_store: Option<FjallStore>,
    }

    impl Context {
        pub fn new(path: String, fjall_store: Option<FjallStore>) -> Self {
            Context { path, fjall_store }
        }

        pub fn path(&self) -> &str {
            &self.path
        }

        pub fn fjall_store(&self) -> FjallStore {
            self.fjall_store.clone().expect("FjallStore not available")
        }
    }

    impl Drop for Context {
        fn drop(&mut self) {
            if let Some(store) = mem::take(&mut self.fjall_store) {
                if let Err(e) = store.close() {
                    log::error!("Failed to close FjallStore during cleanup: {}", e);
                }
            }
            if let Err(e) = std::fs::remove_dir_all(&self.path) {
                log::debug!("Could not remove {} during cleanup: {}", self.path, e);
            }
        }
    }

    pub fn random_path() -> String {
        let id = uuid::Uuid::new_v4();
        std::env::temp_dir()
            .join(format!("docstore-fjall-{}", id))
            .to_string_lossy()
            .to_string()
    }

    pub fn create_test_context() -> Context {
        let path = random_path();
        let config = FjallConfig::new();
        config.set_db_path(&path);
        config.set_flush_workers(1);
        config.set_compaction_workers(1);

        let store = FjallStore::new(config);
        store.open_or_create().expect("Failed to open fjall store");
        Context::new(path, Some(store))
    }

    pub fn run_test<T, B, A>(before: B, test: T, after: A)
    where
        T: FnOnce(&Context) + std::panic::UnwindSafe,
        B: FnOnce() -> Context + std::panic::UnwindSafe,
        A: FnOnce(&Context) + std::panic::UnwindSafe,
    {
        let result = std::panic::catch_unwind(|| {
            let ctx = before();
            let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| test(&ctx)));
            after(&ctx);
            drop(ctx);
            if let Err(e) = outcome {
                std::panic::resume_unwind(e);
            }
        });

        if let Err(e) = result {
            let panic_msg = if let Some(msg) = e.downcast_ref::<String>() {
                msg.clone()
            } else if let Some(msg) = e.downcast_ref::<&str>() {
                msg.to_string()
            } else {
                format!("{:?}", e)
            };
            panic!("Test execution failed with panic: {}", panic_msg);
        }
    }

    #[test]
    fn context_cleans_up_its_directory() {
        let path;
        {
            let ctx = create_test_context();
            path = ctx.path().to_string();
            assert!(std::path::Path::new(&path).exists());
        }
        assert!(!std::path::Path::new(&path).exists());
    }

    #[test]
    fn harness_preserves_panic_message() {
        let caught = std::panic::catch_unwind(|| {
            run_test(
                || Context::new(random_path(), None),
                |_ctx| panic!("Specific error condition"),
                |_ctx| {},
            );
        });
        let err = caught.unwrap_err();
        let msg = err.downcast_ref::<String>().unwrap();
        assert!(msg.contains("Test execution failed with panic"));
        assert!(msg.contains("Specific error condition"));
    }
}
