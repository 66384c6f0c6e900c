pub mod entity;
pub mod envelope;
pub mod error;
pub mod field;
pub mod filter;
mod pagination;
pub mod query;
pub mod repository;
mod timestamp;

pub use entity::{Entity, EntityId};
pub use pagination::Paging;
pub use timestamp::Timestamp;
