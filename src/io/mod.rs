pub mod api;
pub mod awp;
pub mod csv_export;
pub mod file;
mod keys;
pub mod xer;

pub use api::ApiClient;
pub use awp::{awp_store, AwpNodeRow, AwpTaskRow};
pub use xer::XerFile;
