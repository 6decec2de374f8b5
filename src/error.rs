//! Error handling for the light meter crate.

/// A specialized `Result` type for light meter operations.
pub type Result<T> = std::result::Result<T, MeterError>;

/// The main error type for light meter operations.
#[derive(Debug, thiserror::Error)]
pub enum MeterError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Telemetry parsing failed
    #[error("Failed to parse telemetry: {0}")]
    Parse(String),

    /// Ambient-light sensor failure
    #[error("Light sensor error: {0}")]
    Sensor(String),

    /// Camera device failure
    #[error("Camera error: {0}")]
    Camera(String),

    /// Hardware access was refused by the operating system
    #[error("Permission denied: {0}")]
    Permission(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Web server error
    #[error("Web server error: {0}")]
    WebServer(String),

    /// JSON (de)serialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl MeterError {
    /// Create a new parse error
    pub fn parse_error(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// Create a new light sensor error
    pub fn sensor_error(msg: impl Into<String>) -> Self {
        Self::Sensor(msg.into())
    }

    /// Create a new camera error
    pub fn camera_error(msg: impl Into<String>) -> Self {
        Self::Camera(msg.into())
    }

    /// Create a new permission error
    pub fn permission_error(msg: impl Into<String>) -> Self {
        Self::Permission(msg.into())
    }

    /// Create a new configuration error
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new web server error
    pub fn web_server_error(msg: impl Into<String>) -> Self {
        Self::WebServer(msg.into())
    }
}
