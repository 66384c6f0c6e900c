mod error;
pub mod routes;
pub mod state;
mod stream;

pub use error::EndpointError;
