//! HTTP client for the workflow engine.
//!
//! This crate provides a typed client for the engine's REST API
//! (`/api/v1/workflows`, `/api/v1/executions`) and for the absolute webhook
//! URLs the engine exposes for active workflows.
//!
//! # Example
//!
//! ```no_run
//! use flowbench_client::{EngineClient, Result};
//!
//! # async fn example() -> Result<()> {
//! let client = EngineClient::builder()
//!     .base_url("http://localhost:5678")
//!     .api_key("secret")
//!     .build()?;
//!
//! let workflow = client.workflows().get("wf-42").await?;
//! if !workflow.active {
//!     client.workflows().activate(&workflow.id).await?;
//! }
//!
//! let started = client.workflows().execute(&workflow.id).await?;
//! let record = client.executions().get(&started.id).await?;
//! println!("finished: {}", record.finished);
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod client;
pub mod error;
pub mod types;

pub use api::{EXECUTION_ID_HEADER, ExecutionsApi, WebhooksApi, WorkflowsApi};
pub use client::{ClientBuilder, EngineClient, API_KEY_HEADER};
pub use error::{Error, Result};
pub use types::*;
