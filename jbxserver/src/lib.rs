//! # jbxserver - Serveur web du JukeBox basé sur Axum
//!
//! - [`server`] : serveur principal et builder (routes JSON, handlers avec
//!   état, sous-routers, APIs documentées OpenAPI, arrêt sur Ctrl+C)
//! - [`logs`] : subscriber `tracing` avec buffer circulaire, flux SSE et
//!   niveau de log réglable à chaud
//!
//! ## Exemple d'utilisation
//!
//! ```rust,no_run
//! use jbxserver::ServerBuilder;
//!
//! #[tokio::main]
//! async fn main() -> std::io::Result<()> {
//!     let mut server = ServerBuilder::new_configured().build();
//!     server.init_logging().await;
//!
//!     server.add_route("/info", || async {
//!         serde_json::json!({"status": "ok"})
//!     }).await;
//!
//!     server.start().await?;
//!     server.wait().await;
//!     Ok(())
//! }
//! ```

pub mod logs;
pub mod server;

pub use logs::{LogState, SseLayer, log_dump, log_sse};
pub use server::{Server, ServerBuilder};
