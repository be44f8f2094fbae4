use crate::error::{Error, Result};
use crate::profile::Model;

/// Size of a status frame returned on the back-channel.
pub const STATUS_SIZE: usize = 32;

/// Value of `print_head_mark` in every well-formed status frame.
pub const PRINT_HEAD_MARK: u8 = 0x80;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusType {
    Reply,
    Completed,
    Error,
    Notification,
    PhaseChange,
    Unknown(u8),
}

impl From<u8> for StatusType {
    fn from(value: u8) -> Self {
        match value {
            0x00 => StatusType::Reply,
            0x01 => StatusType::Completed,
            0x02 => StatusType::Error,
            0x05 => StatusType::Notification,
            0x06 => StatusType::PhaseChange,
            other => StatusType::Unknown(other),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PhaseType {
    Waiting,
    Printing,
    Unknown(u8),
}

impl From<u8> for PhaseType {
    fn from(value: u8) -> Self {
        match value {
            0x00 => PhaseType::Waiting,
            0x01 => PhaseType::Printing,
            other => PhaseType::Unknown(other),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NotificationType {
    NotAvailable,
    CoolingStarted,
    CoolingFinished,
    Unknown(u8),
}

impl From<u8> for NotificationType {
    fn from(value: u8) -> Self {
        match value {
            0x00 => NotificationType::NotAvailable,
            0x03 => NotificationType::CoolingStarted,
            0x04 => NotificationType::CoolingFinished,
            other => NotificationType::Unknown(other),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MediaType {
    None,
    Continuous,
    DieCut,
    Unknown(u8),
}

impl From<u8> for MediaType {
    fn from(value: u8) -> Self {
        match value {
            0x00 => MediaType::None,
            0x0A => MediaType::Continuous,
            0x0B => MediaType::DieCut,
            other => MediaType::Unknown(other),
        }
    }
}

impl From<MediaType> for u8 {
    fn from(media_type: MediaType) -> Self {
        match media_type {
            MediaType::None => 0x00,
            MediaType::Continuous => 0x0A,
            MediaType::DieCut => 0x0B,
            MediaType::Unknown(other) => other,
        }
    }
}

/// A device-state error reported in `error_info_1` / `error_info_2`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorCondition {
    NoMedia,
    EndOfMedia,
    CutterJam,
    MainUnitInUse,
    FanMalfunction,
    WrongMedia,
    TransmissionError,
    CoverOpen,
    CannotFeed,
    SystemError,
}

#[rustfmt::skip]
const ERROR_INFO_1: [(u8, ErrorCondition); 5] = [
    (0x01, ErrorCondition::NoMedia),
    (0x02, ErrorCondition::EndOfMedia),
    (0x04, ErrorCondition::CutterJam),
    (0x10, ErrorCondition::MainUnitInUse),
    (0x80, ErrorCondition::FanMalfunction),
];

#[rustfmt::skip]
const ERROR_INFO_2: [(u8, ErrorCondition); 5] = [
    (0x01, ErrorCondition::WrongMedia),
    (0x04, ErrorCondition::TransmissionError),
    (0x10, ErrorCondition::CoverOpen),
    (0x40, ErrorCondition::CannotFeed),
    (0x80, ErrorCondition::SystemError),
];

impl ErrorCondition {
    /// Every condition whose bit is set, `error_info_1` first.
    pub fn from_bits(error_info1: u8, error_info2: u8) -> Vec<ErrorCondition> {
        let first = ERROR_INFO_1
            .iter()
            .filter(|(mask, _)| error_info1 & mask != 0);
        let second = ERROR_INFO_2
            .iter()
            .filter(|(mask, _)| error_info2 & mask != 0);
        first.chain(second).map(|(_, condition)| *condition).collect()
    }
}

impl std::fmt::Display for ErrorCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCondition::NoMedia => write!(f, "No media"),
            ErrorCondition::EndOfMedia => write!(f, "End of media"),
            ErrorCondition::CutterJam => write!(f, "Cutter jam"),
            ErrorCondition::MainUnitInUse => write!(f, "Main unit in use"),
            ErrorCondition::FanMalfunction => write!(f, "Fan malfunction"),
            ErrorCondition::WrongMedia => write!(f, "Wrong media"),
            ErrorCondition::TransmissionError => write!(f, "Transmission error"),
            ErrorCondition::CoverOpen => write!(f, "Cover open"),
            ErrorCondition::CannotFeed => write!(f, "Cannot feed"),
            ErrorCondition::SystemError => write!(f, "System error"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Status {
    raw_data: [u8; STATUS_SIZE],
}

impl Status {
    pub fn new(data: [u8; STATUS_SIZE]) -> Self {
        Status { raw_data: data }
    }

    /// Map a back-channel frame onto the status layout.
    ///
    /// Only the length is checked. A frame with a bad `print_head_mark`
    /// decodes fine; use [`Status::is_valid`] before acting on it.
    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < STATUS_SIZE {
            return Err(Error::ShortRead(data.len()));
        }
        let mut raw_data = [0u8; STATUS_SIZE];
        raw_data.copy_from_slice(&data[..STATUS_SIZE]);
        Ok(Status { raw_data })
    }

    pub fn raw_data(&self) -> &[u8; STATUS_SIZE] {
        &self.raw_data
    }

    pub fn to_bytes(&self) -> [u8; STATUS_SIZE] {
        self.raw_data
    }

    pub fn is_valid(&self) -> bool {
        self.print_head_mark() == PRINT_HEAD_MARK
    }

    pub fn print_head_mark(&self) -> u8 {
        self.raw_data[0]
    }

    pub fn size(&self) -> u8 {
        self.raw_data[1]
    }

    pub fn printer_id(&self) -> u8 {
        self.raw_data[4]
    }

    pub fn model(&self) -> Option<Model> {
        Model::from_printer_id(self.printer_id())
    }

    pub fn has_errors(&self) -> bool {
        self.error_info1() != 0x00 || self.error_info2() != 0x00
    }

    pub fn error_info1(&self) -> u8 {
        self.raw_data[8]
    }

    pub fn error_info2(&self) -> u8 {
        self.raw_data[9]
    }

    pub fn error_conditions(&self) -> Vec<ErrorCondition> {
        ErrorCondition::from_bits(self.error_info1(), self.error_info2())
    }

    pub fn media_width_mm(&self) -> u8 {
        self.raw_data[10]
    }

    pub fn media_type(&self) -> MediaType {
        MediaType::from(self.raw_data[11])
    }

    pub fn media_length_mm(&self) -> u8 {
        self.raw_data[17]
    }

    pub fn status_type(&self) -> StatusType {
        StatusType::from(self.raw_data[18])
    }

    pub fn phase_type(&self) -> PhaseType {
        PhaseType::from(self.raw_data[19])
    }

    pub fn phase_number(&self) -> u16 {
        u16::from_be_bytes([self.raw_data[20], self.raw_data[21]])
    }

    pub fn notification_type(&self) -> NotificationType {
        NotificationType::from(self.raw_data[22])
    }

    pub fn print_status_info(&self, verbose: bool) {
        if verbose {
            println!("Raw status response ({} bytes):", self.raw_data.len());
            print!("  Hex: ");
            for byte in &self.raw_data {
                print!("{:02X} ", byte);
            }
            println!();
            println!();
        }

        match self.model() {
            Some(model) => println!("Model: {}", model),
            None => println!("Model: unknown (0x{:02X})", self.printer_id()),
        }

        if !self.has_errors() {
            println!("Status: OK - No errors");
        } else {
            println!("Status: ERROR");
            for condition in self.error_conditions() {
                println!("  - {}", condition);
            }
        }

        println!("Media width: {} mm", self.media_width_mm());
        match self.media_type() {
            MediaType::Continuous => println!("Media type: continuous"),
            MediaType::DieCut => println!("Media type: die-cut ({} mm)", self.media_length_mm()),
            other => println!("Media type: 0x{:02X}", u8::from(other)),
        }

        if verbose {
            self.print_detailed_breakdown();
        }
    }

    fn print_detailed_breakdown(&self) {
        let error_info1 = self.error_info1();
        let error_info2 = self.error_info2();

        println!();
        println!("Detailed status breakdown:");
        println!("  Status type: {:?}", self.status_type());
        println!("  Phase type: {:?}", self.phase_type());
        println!("  Notification: {:?}", self.notification_type());
        println!("  Error info 1 (0x{:02X}):", error_info1);
        for bit in 0..8 {
            if error_info1 & (1 << bit) != 0 {
                println!("    Bit {}: Set", bit);
            }
        }
        println!("  Error info 2 (0x{:02X}):", error_info2);
        for bit in 0..8 {
            if error_info2 & (1 << bit) != 0 {
                println!("    Bit {}: Set", bit);
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// A well-formed QL-570 reply with 62 mm continuous tape loaded.
    pub(crate) fn ql570_reply() -> [u8; STATUS_SIZE] {
        let mut data = [0u8; STATUS_SIZE];
        data[0] = 0x80;
        data[1] = 0x20;
        data[2] = 0x42;
        data[3] = 0x34;
        data[4] = 0x32;
        data[5] = 0x30;
        data[10] = 62;
        data[11] = 0x0A;
        data
    }

    #[test]
    fn test_decode_maps_fields_positionally() {
        let mut data = ql570_reply();
        data[8] = 0x81;
        data[9] = 0x10;
        data[17] = 29;
        data[18] = 0x06;
        data[19] = 0x01;
        data[20] = 0x01;
        data[21] = 0x02;
        data[22] = 0x03;

        let status = Status::decode(&data).unwrap();
        assert!(status.is_valid());
        assert_eq!(status.size(), 32);
        assert_eq!(status.model(), Some(Model::QL570));
        assert_eq!(status.error_info1(), 0x81);
        assert_eq!(status.error_info2(), 0x10);
        assert_eq!(status.media_width_mm(), 62);
        assert_eq!(status.media_type(), MediaType::Continuous);
        assert_eq!(status.media_length_mm(), 29);
        assert_eq!(status.status_type(), StatusType::PhaseChange);
        assert_eq!(status.phase_type(), PhaseType::Printing);
        assert_eq!(status.phase_number(), 0x0102);
        assert_eq!(status.notification_type(), NotificationType::CoolingStarted);
    }

    #[test]
    fn test_decode_preserves_reserved_bytes() {
        let mut data = ql570_reply();
        data[24..].copy_from_slice(&[1, 2, 3, 4, 5, 6, 7, 8]);
        let status = Status::decode(&data).unwrap();
        assert_eq!(status.to_bytes(), data);
    }

    #[test]
    fn test_decode_short_read() {
        let data = ql570_reply();
        for len in [0, 1, 16, 31] {
            match Status::decode(&data[..len]) {
                Err(Error::ShortRead(n)) => assert_eq!(n, len),
                other => panic!("expected short read for {} bytes, got {:?}", len, other),
            }
        }
    }

    #[test]
    fn test_decode_does_not_check_magic() {
        let mut data = ql570_reply();
        data[0] = 0x00;
        let status = Status::decode(&data).unwrap();
        assert!(!status.is_valid());
    }

    #[test]
    fn test_error_conditions_are_independent() {
        let conditions = ErrorCondition::from_bits(0x01 | 0x80, 0x10 | 0x40);
        assert_eq!(
            conditions,
            vec![
                ErrorCondition::NoMedia,
                ErrorCondition::FanMalfunction,
                ErrorCondition::CoverOpen,
                ErrorCondition::CannotFeed,
            ]
        );
    }

    #[test]
    fn test_unused_error_bits_are_ignored() {
        assert!(ErrorCondition::from_bits(0x08 | 0x20 | 0x40, 0x02 | 0x08 | 0x20).is_empty());
    }

    #[test]
    fn test_unknown_discriminants() {
        assert_eq!(StatusType::from(0x03), StatusType::Unknown(0x03));
        assert_eq!(PhaseType::from(0x07), PhaseType::Unknown(0x07));
        assert_eq!(NotificationType::from(0x09), NotificationType::Unknown(0x09));
        assert_eq!(u8::from(MediaType::from(0x4A)), 0x4A);
    }
}
