//! Driver for Brother QL series label printers.
//!
//! [`raster_command`] and [`status`] encode commands and decode the 32-byte
//! status frames. [`printer::Printer`] sequences them against a
//! [`backend::Backend`]. It initializes the printer, pads and fits pages
//! from a [`page::PageSource`], and polls the back-channel until each page
//! is done.
//!
//! ```no_run
//! use qlprint::{backend, png_page, printer::Printer, profile::PrinterProfile};
//!
//! # fn main() -> qlprint::Result<()> {
//! let png = std::fs::read("label.png")?;
//! let mut pages = vec![png_page::png_to_page(&png, 300)?].into_iter();
//!
//! let mut printer = Printer::new(backend::from_host("/dev/usb/lp0")?, PrinterProfile::default());
//! printer.print_job(&mut pages)?;
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod config;
pub mod error;
pub mod event;
pub mod page;
pub mod png_page;
pub mod printer;
pub mod profile;
pub mod raster_command;
pub mod status;

pub use error::{Error, Result};
