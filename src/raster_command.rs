//! Brother QL raster command builder
//!
//! Based on the QL series Raster Command Reference ("Printing Command Details").

use crate::status::MediaType;

const ESC: u8 = 0x1B;

/// Opcode of a raster line frame (`g`)
const RASTER_OPCODE: u8 = 0x67;

/// Extended option: cut after the last page
const OPT_CUT_AT_END: u8 = 0x08;
/// Extended option: double the resolution along the label length
const OPT_HIGH_RESOLUTION: u8 = 0x40;

/// `valid_flag` bits of the print information record
const PI_KIND: u8 = 0x02;
const PI_WIDTH: u8 = 0x04;
const PI_LENGTH: u8 = 0x08;
const PI_QUALITY: u8 = 0x40;
const PI_RECOVER: u8 = 0x80;

/// Size of the serialized print information record, including the trailing fixed byte
pub const PRINT_INFO_SIZE: usize = 10;

/// Print information sent at the start of each page
///
/// Media constraints left as `None` are not checked by the printer. When a
/// constraint is set and does not match the loaded media, the printer stops
/// with a wrong-media error.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PrintInfo {
    /// Prefer print quality over speed
    pub quality: bool,
    /// Marked "always on" by the reference; no observed effect
    pub recover: bool,
    /// Required media type
    pub media_type: Option<MediaType>,
    /// Required media width in mm
    pub media_width: Option<u8>,
    /// Required media length in mm
    pub media_length: Option<u8>,
    /// Number of raster lines on the page
    pub raster_number: u32,
    /// `false` on the first page of a job, `true` afterwards
    pub successive_page: bool,
}

impl PrintInfo {
    pub fn valid_flag(&self) -> u8 {
        let mut flag = 0u8;
        if self.media_type.is_some() {
            flag |= PI_KIND;
        }
        if self.media_width.is_some() {
            flag |= PI_WIDTH;
        }
        if self.media_length.is_some() {
            flag |= PI_LENGTH;
        }
        if self.quality {
            flag |= PI_QUALITY;
        }
        if self.recover {
            flag |= PI_RECOVER;
        }
        flag
    }

    pub fn to_bytes(&self) -> [u8; PRINT_INFO_SIZE] {
        let raster_number = self.raster_number.to_le_bytes();
        [
            self.valid_flag(),
            self.media_type.map(u8::from).unwrap_or(0),
            self.media_width.unwrap_or(0),
            self.media_length.unwrap_or(0),
            raster_number[0],
            raster_number[1],
            raster_number[2],
            raster_number[3],
            self.successive_page as u8,
            0x00,
        ]
    }
}

/// Margin the printer adds before and after a label on the given media.
///
/// Continuous tape gets the recommended 35 lines; die-cut labels never
/// have margins.
pub fn default_margins(media_type: MediaType) -> u16 {
    match media_type {
        MediaType::Continuous => 35,
        _ => 0,
    }
}

/// Builder for Brother QL raster commands
///
/// This struct provides a fluent interface to build command sequences for
/// Brother QL label printers. The builder only produces bytes; sending them
/// is up to a [`Backend`](crate::backend::Backend).
///
/// # Example
///
/// ```
/// use qlprint::raster_command::{PrintInfo, RasterCommand};
///
/// let info = PrintInfo {
///     quality: true,
///     raster_number: 150,
///     ..Default::default()
/// };
///
/// let mut cmd = RasterCommand::new();
/// cmd.initialize(false)
///    .print_information_command(&info)
///    .expanded_mode(true, false)
///    .raster_graphics_transfer(90, &[0xFF; 90])
///    .raster_end(90)
///    .print_command(true);
///
/// let command_data = cmd.build();
/// assert_eq!(command_data.len(), 2 + 13 + 4 + 93 + 93 + 1);
/// ```
pub struct RasterCommand {
    buffer: Vec<u8>,
}

impl RasterCommand {
    /// Create a new empty command builder
    pub fn new() -> Self {
        RasterCommand { buffer: Vec::new() }
    }

    /// Add ESC @ (initialize) command
    ///
    /// With `flush`, 200 null bytes go first. They terminate any partial
    /// command still sitting in the printer's input buffer.
    pub fn initialize(&mut self, flush: bool) -> &mut Self {
        if flush {
            self.buffer.extend_from_slice(&[0x00; 200]);
        }
        self.buffer.extend_from_slice(&[ESC, 0x40]);
        self
    }

    /// Add status information request command
    ///
    /// The printer answers with a 32-byte status frame on the back-channel.
    pub fn status_information_request(&mut self) -> &mut Self {
        self.buffer.extend_from_slice(&[ESC, 0x69, 0x53]);
        self
    }

    /// Set print information command
    ///
    /// Starts a page. Must be sent before the page's raster data.
    pub fn print_information_command(&mut self, info: &PrintInfo) -> &mut Self {
        self.buffer.extend_from_slice(&[ESC, 0x69, 0x7A]);
        self.buffer.extend_from_slice(&info.to_bytes());
        self
    }

    /// Set expanded mode
    ///
    /// # Arguments
    /// * `cut_at_end` - Cut after the last page
    /// * `high_resolution` - 300x600 dpi instead of 300x300 dpi
    ///
    /// High resolution doubles the resolution along the label length only,
    /// which also halves the shortest printable label.
    pub fn expanded_mode(&mut self, cut_at_end: bool, high_resolution: bool) -> &mut Self {
        let mut options = 0u8;
        if cut_at_end {
            options |= OPT_CUT_AT_END;
        }
        if high_resolution {
            options |= OPT_HIGH_RESOLUTION;
        }
        self.buffer.extend_from_slice(&[ESC, 0x69, 0x4B, options]);
        self
    }

    /// Enable automatic cutting ("set each mode", bit 6)
    pub fn auto_cut_enable(&mut self) -> &mut Self {
        self.buffer.extend_from_slice(&[ESC, 0x69, 0x4D, 0x40]);
        self
    }

    /// Cut after every `n` labels
    pub fn auto_cut_interval(&mut self, n: u8) -> &mut Self {
        self.buffer.extend_from_slice(&[ESC, 0x69, 0x41, n]);
        self
    }

    /// Specify margin amount
    ///
    /// Number of blank lines the printer itself feeds before and after the
    /// label on continuous tape. Unrelated to blank lines sent as raster data.
    pub fn specify_margin_amount(&mut self, lines: u16) -> &mut Self {
        self.buffer.extend_from_slice(&[ESC, 0x69, 0x64]);
        self.buffer.extend_from_slice(&lines.to_le_bytes());
        self
    }

    /// Transfer one raster line of `length` bytes
    ///
    /// Exactly `length` payload bytes follow the header: `data` is truncated
    /// or zero-padded to fit. The printer expects the profile's buffer width
    /// per line.
    pub fn raster_graphics_transfer(&mut self, length: u8, data: &[u8]) -> &mut Self {
        let length = length as usize;
        let payload = &data[..data.len().min(length)];
        self.buffer
            .extend_from_slice(&[RASTER_OPCODE, 0x00, length as u8]);
        self.buffer.extend_from_slice(payload);
        self.buffer
            .extend(std::iter::repeat_n(0x00, length - payload.len()));
        self
    }

    /// Signal end of raster data
    ///
    /// Shaped like a raster line of `length` zero bytes, but flagged with
    /// 0xFF in the second header byte.
    pub fn raster_end(&mut self, length: u8) -> &mut Self {
        self.buffer.extend_from_slice(&[RASTER_OPCODE, 0xFF, length]);
        self.buffer
            .extend(std::iter::repeat_n(0x00, length as usize));
        self
    }

    /// Send print command
    ///
    /// `0x1A` (print with feeding) ends the last page, `0x0C` any other.
    pub fn print_command(&mut self, last_page: bool) -> &mut Self {
        self.buffer.push(if last_page { 0x1A } else { 0x0C });
        self
    }

    /// Bytes accumulated so far
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    /// Build and return the complete command sequence
    pub fn build(self) -> Vec<u8> {
        self.buffer
    }
}

impl Default for RasterCommand {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bytes(f: impl FnOnce(&mut RasterCommand) -> &mut RasterCommand) -> Vec<u8> {
        let mut cmd = RasterCommand::new();
        f(&mut cmd);
        cmd.build()
    }

    #[test]
    fn test_initialize_without_flush() {
        assert_eq!(bytes(|c| c.initialize(false)), vec![0x1B, 0x40]);
    }

    #[test]
    fn test_initialize_with_flush() {
        let data = bytes(|c| c.initialize(true));
        assert_eq!(data.len(), 202);
        assert!(data[..200].iter().all(|&b| b == 0x00));
        assert_eq!(&data[200..], &[0x1B, 0x40]);
    }

    #[test]
    fn test_status_information_request() {
        assert_eq!(
            bytes(|c| c.status_information_request()),
            vec![0x1B, 0x69, 0x53]
        );
    }

    #[test]
    fn test_raster_line_frame() {
        for len in [0usize, 1, 90, 162, 255] {
            let line = vec![0xA5; len];
            let data = bytes(|c| c.raster_graphics_transfer(len as u8, &line));
            assert_eq!(data.len(), 3 + len);
            assert_eq!(&data[..3], &[0x67, 0x00, len as u8]);
            assert_eq!(&data[3..], line.as_slice());
        }
    }

    #[test]
    fn test_raster_line_never_exceeds_declared_length() {
        let long = vec![0xA5; 300];
        let data = bytes(|c| c.raster_graphics_transfer(90, &long));
        assert_eq!(data.len(), 3 + 90);
        assert_eq!(&data[..3], &[0x67, 0x00, 90]);
        assert!(data[3..].iter().all(|&b| b == 0xA5));

        let short = [0xFFu8; 4];
        let data = bytes(|c| c.raster_graphics_transfer(8, &short));
        assert_eq!(data, vec![0x67, 0x00, 8, 0xFF, 0xFF, 0xFF, 0xFF, 0, 0, 0, 0]);
    }

    #[test]
    fn test_raster_end_frame() {
        for len in [0u8, 90, 162] {
            let data = bytes(|c| c.raster_end(len));
            assert_eq!(data.len(), 3 + len as usize);
            assert_eq!(&data[..3], &[0x67, 0xFF, len]);
            assert!(data[3..].iter().all(|&b| b == 0x00));
        }
    }

    #[test]
    fn test_print_information_minimal() {
        let info = PrintInfo {
            quality: true,
            raster_number: 150,
            ..Default::default()
        };
        assert_eq!(
            bytes(|c| c.print_information_command(&info)),
            vec![0x1B, 0x69, 0x7A, 0x40, 0, 0, 0, 150, 0, 0, 0, 0, 0]
        );
    }

    #[test]
    fn test_print_information_with_media_and_large_count() {
        let info = PrintInfo {
            quality: false,
            recover: true,
            media_type: Some(MediaType::DieCut),
            media_width: Some(29),
            media_length: Some(90),
            raster_number: 0x0102_0304,
            successive_page: true,
        };
        assert_eq!(info.valid_flag(), 0x02 | 0x04 | 0x08 | 0x80);
        assert_eq!(
            info.to_bytes(),
            [0x8E, 0x0B, 29, 90, 0x04, 0x03, 0x02, 0x01, 1, 0]
        );
    }

    #[test]
    fn test_print_command() {
        assert_eq!(bytes(|c| c.print_command(true)), vec![0x1A]);
        assert_eq!(bytes(|c| c.print_command(false)), vec![0x0C]);
    }

    #[test]
    fn test_expanded_mode_options() {
        assert_eq!(bytes(|c| c.expanded_mode(false, false)), vec![0x1B, 0x69, 0x4B, 0x00]);
        assert_eq!(bytes(|c| c.expanded_mode(true, false)), vec![0x1B, 0x69, 0x4B, 0x08]);
        assert_eq!(bytes(|c| c.expanded_mode(false, true)), vec![0x1B, 0x69, 0x4B, 0x40]);
        assert_eq!(bytes(|c| c.expanded_mode(true, true)), vec![0x1B, 0x69, 0x4B, 0x48]);
    }

    #[test]
    fn test_auto_cut_commands() {
        assert_eq!(bytes(|c| c.auto_cut_enable()), vec![0x1B, 0x69, 0x4D, 0x40]);
        assert_eq!(bytes(|c| c.auto_cut_interval(3)), vec![0x1B, 0x69, 0x41, 3]);
    }

    #[test]
    fn test_margins_little_endian() {
        assert_eq!(
            bytes(|c| c.specify_margin_amount(35)),
            vec![0x1B, 0x69, 0x64, 35, 0]
        );
        assert_eq!(
            bytes(|c| c.specify_margin_amount(0x0201)),
            vec![0x1B, 0x69, 0x64, 0x01, 0x02]
        );
    }

    #[test]
    fn test_default_margins() {
        assert_eq!(default_margins(MediaType::Continuous), 35);
        assert_eq!(default_margins(MediaType::DieCut), 0);
        assert_eq!(default_margins(MediaType::None), 0);
    }
}
