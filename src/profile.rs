#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Model {
    QL500_550,
    QL560,
    QL570,
    QL580N,
    QL650TD,
    QL700,
    QL1050,
    QL1060N,
}

impl std::fmt::Display for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Model::QL500_550 => write!(f, "QL-500/550"),
            Model::QL560 => write!(f, "QL-560"),
            Model::QL570 => write!(f, "QL-570"),
            Model::QL580N => write!(f, "QL-580N"),
            Model::QL650TD => write!(f, "QL-650TD"),
            Model::QL700 => write!(f, "QL-700"),
            Model::QL1050 => write!(f, "QL-1050"),
            Model::QL1060N => write!(f, "QL-1060N"),
        }
    }
}

impl Model {
    /// Identify the model from the `printer_id` byte of a status frame.
    pub fn from_printer_id(id: u8) -> Option<Self> {
        match id {
            0x4F => Some(Model::QL500_550),
            0x31 => Some(Model::QL560),
            0x32 => Some(Model::QL570),
            0x33 => Some(Model::QL580N),
            0x51 => Some(Model::QL650TD),
            0x35 => Some(Model::QL700),
            0x50 => Some(Model::QL1050),
            0x34 => Some(Model::QL1060N),
            _ => None,
        }
    }

    pub fn printer_id(&self) -> u8 {
        match self {
            Model::QL500_550 => 0x4F,
            Model::QL560 => 0x31,
            Model::QL570 => 0x32,
            Model::QL580N => 0x33,
            Model::QL650TD => 0x51,
            Model::QL700 => 0x35,
            Model::QL1050 => 0x50,
            Model::QL1060N => 0x34,
        }
    }

    pub fn profile(&self) -> PrinterProfile {
        PrinterProfile::new(*self)
    }
}

/// Device constants that differ between printers of the QL family.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PrinterProfile {
    pub model: Model,            // Printer model
    pub min_lines: u32,          // Shortest page the printer accepts, in raster lines
    pub buffer_width: u8,        // Bytes per raster line
    pub dpi: u32,                // Base resolution along both axes
    pub supports_high_res: bool, // Doubled resolution along the label length
}

impl PrinterProfile {
    #[rustfmt::skip]
    pub fn new(model: Model) -> Self {
        let (min_lines, buffer_width, dpi, supports_high_res) = match model {
            Model::QL500_550 => (150,  90, 300, false),
            Model::QL560     => (150,  90, 300, false),
            Model::QL570     => (150,  90, 300, true),
            Model::QL580N    => (150,  90, 300, true),
            Model::QL650TD   => (150,  90, 300, false),
            Model::QL700     => (150,  90, 300, true),
            Model::QL1050    => (295, 162, 300, true),
            Model::QL1060N   => (295, 162, 300, true),
        };
        PrinterProfile {
            model,
            min_lines,
            buffer_width,
            dpi,
            supports_high_res,
        }
    }

    /// Printable pixels across the print head.
    pub fn width_pixels(&self) -> u32 {
        self.buffer_width as u32 * 8
    }

    /// Whether a page at `vertical_dpi` should be printed in high-resolution mode.
    pub fn wants_high_resolution(&self, vertical_dpi: u32) -> bool {
        self.supports_high_res && vertical_dpi == self.dpi * 2
    }
}

impl Default for PrinterProfile {
    fn default() -> Self {
        PrinterProfile::new(Model::QL570)
    }
}
