pub mod access_log;
pub mod document;
pub mod ocr_job;
pub mod user;

pub use access_log::*;
pub use document::*;
pub use ocr_job::*;
pub use user::*;
