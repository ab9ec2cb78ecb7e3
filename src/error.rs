pub use masterror::{AppError, AppResult};

/// Create file read error
pub fn file_read_error(path: &str, source: std::io::Error) -> AppError {
    AppError::internal(format!("Failed to read file '{}': {}", path, source))
}

/// Create host input decode error
pub fn input_parse_error(path: &str, message: impl Into<String>) -> AppError {
    let msg = message.into();
    AppError::bad_request(format!("Invalid host input '{}':\n  {}", path, msg))
}

/// Create config error
pub fn config_error(message: impl Into<String>) -> AppError {
    AppError::bad_request(message.into())
}

/// Create output serialization error
pub fn output_error(message: impl Into<String>) -> AppError {
    AppError::internal(format!("Failed to render report: {}", message.into()))
}
