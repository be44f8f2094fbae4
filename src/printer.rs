use crate::backend::Backend;
use crate::config::{DriverConfig, JobOptions, Margins};
use crate::error::{Error, Result};
use crate::event::{self, PageOutcome, StatusEvent};
use crate::page::{BlankPadding, Page, PageSource, fit_line};
use crate::profile::PrinterProfile;
use crate::raster_command::{PrintInfo, RasterCommand, default_margins};
use crate::status::{STATUS_SIZE, Status};
use log::{debug, error, info, warn};
use std::thread;

pub struct Printer<B: Backend> {
    backend: B,
    profile: PrinterProfile,
    config: DriverConfig,
    job: JobOptions,
    // Status returned by the last successful initialization
    media: Option<Status>,
}

impl<B: Backend> Printer<B> {
    pub fn new(backend: B, profile: PrinterProfile) -> Self {
        Printer::with_config(backend, profile, DriverConfig::default())
    }

    pub fn with_config(backend: B, profile: PrinterProfile, config: DriverConfig) -> Self {
        Printer {
            backend,
            profile,
            config,
            job: JobOptions::default(),
            media: None,
        }
    }

    pub fn profile(&self) -> &PrinterProfile {
        &self.profile
    }

    pub fn set_profile(&mut self, profile: PrinterProfile) {
        self.profile = profile;
    }

    pub fn set_job_options(&mut self, job: JobOptions) {
        self.job = job;
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn into_backend(self) -> B {
        self.backend
    }

    fn send(&mut self, cmd: &RasterCommand) -> Result<()> {
        self.backend.send_command(cmd.as_bytes())
    }

    /// Read one frame and keep it only if it is a well-formed status.
    fn read_valid_status(&mut self, attempt: u32) -> Option<Status> {
        let mut buf = [0u8; STATUS_SIZE];
        let n = match self.backend.read_status(&mut buf, self.config.read_timeout) {
            Ok(n) => n,
            Err(e) => {
                warn!("Attempt {}: back-channel read failed: {}", attempt, e);
                return None;
            }
        };

        let status = match Status::decode(&buf[..n]) {
            Ok(status) => status,
            Err(e) => {
                warn!("Attempt {}: {}, retrying", attempt, e);
                return None;
            }
        };

        if !status.is_valid() {
            warn!(
                "Attempt {}: invalid print head mark 0x{:02X} in {} byte status, retrying",
                attempt,
                status.print_head_mark(),
                n
            );
            return None;
        }

        debug!("Attempt {}: status {:02X?}", attempt, status.raw_data());
        Some(status)
    }

    /// Bring the printer into a known state and read its status.
    ///
    /// Every attempt after the first flushes the input buffer, for printers
    /// left halfway through a command by an earlier job.
    pub fn initialize(&mut self) -> Result<Status> {
        for attempt in 1..=self.config.init_attempts {
            self.send(RasterCommand::new().initialize(attempt > 1))?;
            thread::sleep(self.config.settle_delay);
            self.send(RasterCommand::new().status_information_request())?;

            if let Some(status) = self.read_valid_status(attempt) {
                info!(
                    "Printer initialized after {} attempt(s): {} mm media loaded",
                    attempt,
                    status.media_width_mm()
                );
                self.media = Some(status);
                return Ok(status);
            }
        }

        error!(
            "Printer did not answer with a valid status in {} attempts",
            self.config.init_attempts
        );
        Err(Error::InitializationFailed(self.config.init_attempts))
    }

    fn print_info(&self, raster_number: u32, successive_page: bool) -> PrintInfo {
        let mut info = PrintInfo {
            quality: self.job.quality,
            raster_number,
            successive_page,
            ..Default::default()
        };
        if self.job.check_media
            && let Some(media) = &self.media
        {
            info.media_type = Some(media.media_type());
            info.media_width = Some(media.media_width_mm());
            info.media_length = Some(media.media_length_mm());
        }
        info
    }

    fn margins(&self) -> Option<u16> {
        match self.job.margins {
            Margins::Unset => None,
            Margins::Lines(lines) => Some(lines),
            Margins::MediaDefault => Some(
                self.media
                    .map(|media| default_margins(media.media_type()))
                    .unwrap_or(0),
            ),
        }
    }

    fn send_blank_lines(&mut self, count: u32) -> Result<()> {
        let width = self.profile.buffer_width;
        for _ in 0..count {
            self.send(RasterCommand::new().raster_graphics_transfer(width, &[]))?;
        }
        Ok(())
    }

    /// Send one page and wait for the printer to finish it.
    ///
    /// Pages shorter than the profile's minimum are centred between blank
    /// lines; every row is fitted to the profile's buffer width.
    pub fn print_page<I>(
        &mut self,
        page: Page<I>,
        page_index: u32,
        last_page: bool,
    ) -> Result<PageOutcome>
    where
        I: Iterator<Item = Vec<u8>>,
    {
        let min_lines = self.profile.min_lines;
        let raster_number = page.line_count.max(min_lines);
        let info = self.print_info(raster_number, page_index > 0);
        let high_resolution = self.profile.wants_high_resolution(page.vertical_dpi);

        debug!(
            "Page {}: {} lines ({} declared), {} dpi, high resolution {}",
            page_index + 1,
            raster_number,
            page.line_count,
            page.vertical_dpi,
            high_resolution
        );

        self.send(RasterCommand::new().print_information_command(&info))?;
        self.send(RasterCommand::new().expanded_mode(true, high_resolution))?;
        if let Some(interval) = self.job.auto_cut_interval {
            self.send(RasterCommand::new().auto_cut_enable())?;
            self.send(RasterCommand::new().auto_cut_interval(interval))?;
        }
        if let Some(lines) = self.margins() {
            self.send(RasterCommand::new().specify_margin_amount(lines))?;
        }

        let width = self.profile.buffer_width;
        let padding = BlankPadding::new(page.line_count, min_lines);

        self.send_blank_lines(padding.before)?;

        let mut line = vec![0u8; width as usize];
        let mut sent = 0u32;
        for row in page.lines.take(page.line_count as usize) {
            fit_line(&row, &mut line);
            self.send(RasterCommand::new().raster_graphics_transfer(width, &line))?;
            sent += 1;
        }
        if sent < page.line_count {
            warn!(
                "Page {}: source ended after {} of {} lines, sending blank lines",
                page_index + 1,
                sent,
                page.line_count
            );
            self.send_blank_lines(page.line_count - sent)?;
        }

        self.send_blank_lines(padding.after)?;

        self.send(RasterCommand::new().raster_end(width))?;
        self.send(RasterCommand::new().print_command(last_page))?;

        self.wait_for_page_end()
    }

    /// Poll the back-channel until the printer reports a terminal status.
    pub fn wait_for_page_end(&mut self) -> Result<PageOutcome> {
        thread::sleep(self.config.settle_delay);

        for attempt in 1..=self.config.poll_attempts {
            if attempt > 1 {
                thread::sleep(self.config.poll_interval);
            }

            let Some(status) = self.read_valid_status(attempt) else {
                continue;
            };

            let classification = event::classify(&status);
            for event in &classification.events {
                report(event);
            }
            if let Some(outcome) = classification.outcome() {
                if let PageOutcome::Failed(conditions) = &outcome
                    && conditions.is_empty()
                {
                    error!(
                        "Printer error with unknown bits 0x{:02X} 0x{:02X}",
                        status.error_info1(),
                        status.error_info2()
                    );
                }
                return Ok(outcome);
            }
        }

        warn!(
            "No terminal status after {} polling attempts",
            self.config.poll_attempts
        );
        Err(Error::PollTimeout(self.config.poll_attempts))
    }

    /// Print every page of an already initialized job.
    ///
    /// Returns the number of pages printed. A page that fails on the
    /// printer aborts the job.
    pub fn print_pages<S: PageSource>(&mut self, source: &mut S) -> Result<u32> {
        let mut printed = 0;
        let mut current = source.next_page()?;

        while let Some(page) = current {
            let next = source.next_page()?;
            let last_page = next.is_none();

            match self.print_page(page, printed, last_page)? {
                PageOutcome::Failed(conditions) => return Err(Error::Printer(conditions)),
                outcome => debug!("Page {} finished: {:?}", printed + 1, outcome),
            }

            printed += 1;
            info!("PAGE: {} printed", printed);
            current = next;
        }

        Ok(printed)
    }

    /// Initialize the printer and print every page from `source`.
    pub fn print_job<S: PageSource>(&mut self, source: &mut S) -> Result<u32> {
        self.initialize()?;
        self.print_pages(source)
    }
}

fn report(event: &StatusEvent) {
    if event.is_error() {
        error!("{}", event);
    } else {
        info!("{}", event);
    }
}
