mod generated_id;
pub mod memory;

pub use generated_id::GeneratedId;
pub use memory::InMemoryRepo;
