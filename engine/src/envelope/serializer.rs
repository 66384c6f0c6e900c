use crate::error::SerializeError;
use error_stack::{Report, ResultExt};
use serde::Serialize;

/// Compact JSON bytes. Field order is whatever the `Serialize` impls emit,
/// sequences keep insertion order and nothing is re-sorted.
pub fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, Report<SerializeError>> {
    serde_json::to_vec(value).change_context(SerializeError)
}

pub fn to_json_string<T: Serialize + ?Sized>(value: &T) -> Result<String, Report<SerializeError>> {
    serde_json::to_string(value).change_context(SerializeError)
}
