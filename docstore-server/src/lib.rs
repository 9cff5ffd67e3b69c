//! # docstore server
//!
//! Serves docstore collections as JSON over HTTP.
//!
//! | Method | Path                   | Success                  |
//! |--------|------------------------|--------------------------|
//! | POST   | `/db/:collection`      | 201 created document     |
//! | GET    | `/db/:collection`      | 200 `{"results": [...]}` |
//! | GET    | `/db/:collection/:id`  | 200 document             |
//! | PUT    | `/db/:collection/:id`  | 200 replaced document    |
//! | DELETE | `/db/:collection/:id`  | 200 `{"id": ...}`        |
//! | POST   | `/db/search/:collection` | 501                    |
//!
//! Failures answer `{"error": "<message>"}` with the status chosen by
//! [docstore::service::Status::classify]; a request exceeding the configured
//! timeout answers 504.

pub mod config;
pub mod handlers;
pub mod server;

pub use config::{Args, ServerConfig};
pub use server::{build_service, DocStoreServer};
