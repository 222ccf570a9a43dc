//! Deserialization of caller-supplied configuration with the JSON path of
//! the offending field in the error.
use serde::de::DeserializeOwned;

use crate::error::FormError;

fn describe<E: std::fmt::Display>(err: serde_path_to_error::Error<E>) -> FormError {
    let path = err.path().to_string();
    FormError::Options(format!("at JSON path {path} → {}", err.into_inner()))
}

pub fn from_str_with_path<T: DeserializeOwned>(src: &str) -> Result<T, FormError> {
    let de = &mut serde_json::Deserializer::from_str(src);
    serde_path_to_error::deserialize::<_, T>(de).map_err(describe)
}

pub fn from_value_with_path<T: DeserializeOwned>(value: serde_json::Value) -> Result<T, FormError> {
    serde_path_to_error::deserialize::<_, T>(value).map_err(describe)
}
