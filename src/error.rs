use crate::status::ErrorCondition;

/// Errors raised by the codec, the transports and the job driver.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("USB error: {0}")]
    Usb(#[from] rusb::Error),

    #[error("SNMP error: {0}")]
    Snmp(String),

    #[error("PNG decoding error: {0}")]
    Png(#[from] png::DecodingError),

    #[error("Short status read: expected 32 bytes, got {0}")]
    ShortRead(usize),

    #[error("Printer did not return a valid status after {0} attempts")]
    InitializationFailed(u32),

    #[error("No terminal status after {0} polling attempts")]
    PollTimeout(u32),

    #[error("Printer error: {}", describe_conditions(.0))]
    Printer(Vec<ErrorCondition>),

    #[error("Device error: {0}")]
    Device(String),

    #[error("Unsupported image: {0}")]
    Image(String),
}

fn describe_conditions(conditions: &[ErrorCondition]) -> String {
    if conditions.is_empty() {
        return "unspecified".to_string();
    }
    conditions
        .iter()
        .map(|c| c.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

pub type Result<T> = std::result::Result<T, Error>;
