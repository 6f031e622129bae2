pub mod schema;
pub mod storage;

pub use schema::{AppConfig, CaptureConfig, ReplayConfig};
pub use storage::{get_config_path, load_config, load_from, save_config, save_to};
