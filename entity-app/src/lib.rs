pub mod app;
pub mod wiring;

pub use app::{AppError, AppProperties, AppResult};
