pub mod async_runtime;
pub mod http;
pub mod json_path;
pub mod text_processing;
pub mod url_classification;

pub use async_runtime::*;
pub use json_path::*;
pub use text_processing::*;
pub use url_classification::*;
