//! # jbxyoutube - Source YouTube du JukeBox
//!
//! Lecture de vidéos YouTube dans un navigateur Firefox piloté par le
//! protocole W3C WebDriver (`geckodriver`), une session par vidéo.
//!
//! - [`webdriver`] : client WebDriver (sessions, navigation, scripts)
//! - [`source`] : [`YoutubeSource`], implémentation d'`AudioSource`
//! - [`adapter`] : [`YoutubeAdapter`], fabrique et recherche
//! - [`search`] : recherche via l'API YouTube Data (clé optionnelle)
//!
//! ```rust,ignore
//! let registry = AdapterRegistry::new();
//! registry.register(Arc::new(YoutubeAdapter::from_config()?)).await;
//! ```

pub mod adapter;
pub mod error;
pub mod scripts;
pub mod search;
pub mod slug;
pub mod source;
pub mod webdriver;

pub use adapter::YoutubeAdapter;
pub use error::{Result, WebDriverError};
pub use search::YoutubeSearch;
pub use slug::{parse_slug, watch_url};
pub use source::YoutubeSource;
pub use webdriver::{Session, WebDriverClient};
