//! Configuration: model, file and environment loading, validation

pub mod env_loader;
pub mod file_loader;
pub mod loader;
pub mod logging_config;
pub mod model;
pub mod request_options;
pub mod validation;

pub use env_loader::{apply_env, apply_env_from, load_dotenv};
pub use file_loader::{load_from_file, save_to_file};
pub use loader::{CliOverrides, ConfigLoader};
pub use logging_config::{LogFormat, LoggingConfig};
pub use model::{CompletionDefaults, Config, DEFAULT_API_BASE, DEFAULT_MODEL, DEFAULT_PROVIDER};
pub use request_options::{ClientCertificate, DEFAULT_REQUEST_TIMEOUT, RequestOptions};
pub use validation::{ConfigValidator, SUPPORTED_PROVIDERS};
