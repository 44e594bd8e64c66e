use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum NodeError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid topic segment: {0:?}")]
    InvalidTopicSegment(String),

    #[error("Duplicate element: {0}")]
    DuplicateElement(String),

    #[error("Rejected command: {0:?}")]
    RejectedCommand(String),

    #[error("Malformed signal request: {0}")]
    MalformedSignal(String),

    #[error("Peripheral fault: {0}")]
    Peripheral(String),

    #[error("Sensor read failed: {0}")]
    ReadFailure(String),

    #[error("MQTT connection error: {0}")]
    Connection(String),

    #[error(transparent)]
    Client(#[from] rumqttc::ClientError),

    #[error(transparent)]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    SerdeJsonError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, NodeError>;
