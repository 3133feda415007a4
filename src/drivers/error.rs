// src/drivers/error.rs
use std::io;
use thiserror::Error;
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("storage device is not available")]
    StorageUnavailable,
    #[error("failed to open `{name}`: {source}")]
    FileOpen {
        name: String,
        #[source]
        source: io::Error,
    },
    #[error("malformed record line {line_no}: {line:?}")]
    MalformedRecordLine { line_no: usize, line: String },
    #[error("front-end channel {0:?} did not return a sample")]
    FrontEndRead(crate::types::Lead),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("failed to encode image: {0}")]
    Image(String),
}
impl DeviceError {
    pub fn file_open(name: &str, source: io::Error) -> Self {
        DeviceError::FileOpen {
            name: name.to_string(),
            source,
        }
    }
}
impl From<image::ImageError> for DeviceError {
    fn from(value: image::ImageError) -> Self {
        DeviceError::Image(value.to_string())
    }
}
