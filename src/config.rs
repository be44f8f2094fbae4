//! Driver and job configuration.
//!
//! [`DriverConfig`] holds the retry bounds and delays of the
//! initialization and completion-polling loops. [`JobOptions`] holds the
//! per-job printer settings.

use std::time::Duration;

/// Retry bounds and delays used by [`Printer`](crate::printer::Printer).
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Initialization attempts before giving up.
    pub init_attempts: u32,

    /// Status reads after a page before reporting a timeout.
    pub poll_attempts: u32,

    /// Pause after initializing and after ending a page.
    pub settle_delay: Duration,

    /// Pause between two polling attempts.
    pub poll_interval: Duration,

    /// Timeout handed to the back-channel for each status read.
    pub read_timeout: Duration,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            init_attempts: 10,
            poll_attempts: 25,
            settle_delay: Duration::from_millis(100),
            poll_interval: Duration::from_millis(100),
            read_timeout: Duration::from_secs(10),
        }
    }
}

impl DriverConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: set initialization attempts.
    pub fn with_init_attempts(mut self, val: u32) -> Self {
        self.init_attempts = val;
        self
    }

    /// Builder: set polling attempts.
    pub fn with_poll_attempts(mut self, val: u32) -> Self {
        self.poll_attempts = val;
        self
    }

    /// Builder: set settle delay.
    pub fn with_settle_delay(mut self, val: Duration) -> Self {
        self.settle_delay = val;
        self
    }

    /// Builder: set poll interval.
    pub fn with_poll_interval(mut self, val: Duration) -> Self {
        self.poll_interval = val;
        self
    }

    /// Builder: set back-channel read timeout.
    pub fn with_read_timeout(mut self, val: Duration) -> Self {
        self.read_timeout = val;
        self
    }

    /// Same bounds with every delay set to zero.
    pub fn without_delays(self) -> Self {
        self.with_settle_delay(Duration::ZERO)
            .with_poll_interval(Duration::ZERO)
            .with_read_timeout(Duration::ZERO)
    }
}

/// Margins fed by the printer on continuous tape.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Margins {
    /// Don't send a margin command; the printer keeps its setting.
    #[default]
    Unset,
    /// Recommended margin for the media reported at initialization.
    MediaDefault,
    /// Fixed number of blank lines.
    Lines(u16),
}

/// Settings applied to every page of a job.
#[derive(Debug, Clone)]
pub struct JobOptions {
    /// Prefer quality over speed.
    pub quality: bool,

    /// Require the loaded media to match the media seen at initialization.
    pub check_media: bool,

    /// Enable auto cut every `n` labels.
    pub auto_cut_interval: Option<u8>,

    pub margins: Margins,
}

impl Default for JobOptions {
    fn default() -> Self {
        Self {
            quality: true,
            check_media: false,
            auto_cut_interval: None,
            margins: Margins::Unset,
        }
    }
}

impl JobOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: set quality flag.
    pub fn with_quality(mut self, val: bool) -> Self {
        self.quality = val;
        self
    }

    /// Builder: set media check flag.
    pub fn with_check_media(mut self, val: bool) -> Self {
        self.check_media = val;
        self
    }

    /// Builder: set auto cut interval.
    ///
    /// # Panics
    /// Panics if `val` is zero.
    pub fn with_auto_cut_interval(mut self, val: u8) -> Self {
        assert!(val > 0, "Auto cut interval must be at least 1");
        self.auto_cut_interval = Some(val);
        self
    }

    /// Builder: set margins.
    pub fn with_margins(mut self, val: Margins) -> Self {
        self.margins = val;
        self
    }
}
