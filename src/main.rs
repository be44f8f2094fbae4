use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::generate;
use log::warn;
use std::io::{self, Read};
use std::path::PathBuf;

use qlprint::backend;
use qlprint::config::{JobOptions, Margins};
use qlprint::page::{Page, RasterRows};
use qlprint::png_page::png_to_page;
use qlprint::printer::Printer;
use qlprint::profile::{self, PrinterProfile};
use qlprint::{Error, Result};

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
#[clap(rename_all = "lowercase")]
enum Model {
    Ql500,
    Ql560,
    Ql570,
    Ql580n,
    Ql650td,
    Ql700,
    Ql1050,
    Ql1060n,
}

impl std::fmt::Display for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", profile::Model::from(*self))
    }
}

// To avoid bringing Clap into profile::, implement
// conversion from clap::ValueEnum to profile.
impl From<Model> for profile::Model {
    fn from(model: Model) -> Self {
        match model {
            Model::Ql500 => profile::Model::QL500_550,
            Model::Ql560 => profile::Model::QL560,
            Model::Ql570 => profile::Model::QL570,
            Model::Ql580n => profile::Model::QL580N,
            Model::Ql650td => profile::Model::QL650TD,
            Model::Ql700 => profile::Model::QL700,
            Model::Ql1050 => profile::Model::QL1050,
            Model::Ql1060n => profile::Model::QL1060N,
        }
    }
}

#[derive(Parser)]
#[command(name = "qlprint")]
#[command(about = "CLI for Brother QL Label Printers")]
#[command(version)]
#[command(next_line_help = false)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print PNG images, one label per image
    Print(PrintArgs),
    /// Get status information from the printer
    Status(StatusArgs),
    /// Generate shell completion scripts
    Completion(CompletionArgs),
}

#[derive(Args)]
struct PrintArgs {
    /// Printer: /dev/usb/lp0 (device), vid:pid (USB) or hostname (network)
    /// Examples: /dev/usb/lp0, 04f9:2028, ql580n.local
    #[arg(short = 'H', long = "host", required = true)]
    host: String,

    /// Printer model [default: detected from printer status]
    #[arg(short = 'm', long = "model")]
    model: Option<Model>,

    /// Vertical resolution in dpi [default: from PNG, else printer dpi]
    #[arg(short = 'r', long = "resolution")]
    resolution: Option<u32>,

    /// Stop with an error unless the loaded media stays the same
    #[arg(long = "check-media")]
    check_media: bool,

    /// Cut after every N labels
    #[arg(long = "cut-every", value_parser = clap::value_parser!(u8).range(1..))]
    cut_every: Option<u8>,

    /// Printer margins in lines, or "auto" for the media default
    #[arg(long = "margins", value_parser = parse_margins)]
    margins: Option<Margins>,

    /// Favor speed over print quality
    #[arg(long = "draft")]
    draft: bool,

    /// PNG files to print [default: stdin]
    png_files: Vec<PathBuf>,
}

#[derive(Args)]
struct StatusArgs {
    /// Printer: /dev/usb/lp0 (device), vid:pid (USB) or hostname (network)
    #[arg(short = 'H', long = "host", required = true)]
    host: String,

    /// Show verbose information
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,
}

#[derive(Args)]
struct CompletionArgs {
    /// Shell type
    #[arg(value_enum)]
    shell: clap_complete::Shell,
}

fn parse_margins(s: &str) -> std::result::Result<Margins, String> {
    if s.eq_ignore_ascii_case("auto") {
        return Ok(Margins::MediaDefault);
    }
    s.parse::<u16>()
        .map(Margins::Lines)
        .map_err(|e| format!("expected a line count or \"auto\": {}", e))
}

fn read_png_inputs(files: &[PathBuf]) -> Result<Vec<Vec<u8>>> {
    if files.is_empty() {
        let mut buffer = Vec::new();
        io::stdin().read_to_end(&mut buffer)?;
        return Ok(vec![buffer]);
    }
    files
        .iter()
        .map(|path| std::fs::read(path).map_err(Error::from))
        .collect()
}

fn load_pages(
    png_data: &[Vec<u8>],
    profile: &PrinterProfile,
    resolution: Option<u32>,
) -> Result<Vec<Page<RasterRows>>> {
    let mut pages = Vec::with_capacity(png_data.len());
    for (index, data) in png_data.iter().enumerate() {
        let mut page = png_to_page(data, profile.dpi)?;
        if let Some(dpi) = resolution {
            page.vertical_dpi = dpi;
        }
        if let Some(row) = page.lines.as_slice().first()
            && row.len() > profile.buffer_width as usize
        {
            warn!(
                "Image {} is {} pixels wide, {} prints only {}",
                index + 1,
                row.len() * 8,
                profile.model,
                profile.width_pixels()
            );
        }
        pages.push(page);
    }
    Ok(pages)
}

fn handle_print_command(args: PrintArgs) -> Result<()> {
    let png_data = read_png_inputs(&args.png_files)?;

    let profile = args
        .model
        .map(|model| profile::Model::from(model).profile())
        .unwrap_or_default();

    let backend = backend::from_host(&args.host)?;
    let mut printer = Printer::new(backend, profile);

    println!("Checking printer status...");
    let status = printer.initialize()?;

    if status.has_errors() {
        println!("Printer error detected:");
        status.print_status_info(false);
        return Err(Error::Printer(status.error_conditions()));
    }

    if args.model.is_none() {
        match status.model() {
            Some(model) => printer.set_profile(model.profile()),
            None => warn!(
                "Unknown printer id 0x{:02X}, assuming {}",
                status.printer_id(),
                printer.profile().model
            ),
        }
    }
    println!(
        "Printer: {}, {} mm media loaded",
        printer.profile().model,
        status.media_width_mm()
    );

    let mut job = JobOptions::new()
        .with_quality(!args.draft)
        .with_check_media(args.check_media)
        .with_margins(args.margins.unwrap_or_default());
    if let Some(n) = args.cut_every {
        job = job.with_auto_cut_interval(n);
    }
    printer.set_job_options(job);

    let pages = load_pages(&png_data, printer.profile(), args.resolution)?;
    println!("Starting print...");
    let printed = printer.print_pages(&mut pages.into_iter())?;
    println!("Printed {} page(s)", printed);

    Ok(())
}

fn handle_status_command(args: StatusArgs) -> Result<()> {
    let backend = backend::from_host(&args.host)?;
    let mut printer = Printer::new(backend, PrinterProfile::default());

    match printer.initialize() {
        Ok(status) => {
            status.print_status_info(args.verbose);
        }
        Err(e) => {
            println!("Error getting printer status: {}", e);
        }
    }

    Ok(())
}

fn handle_completion_command(args: CompletionArgs) -> Result<()> {
    let mut cmd = Cli::command();
    generate(args.shell, &mut cmd, "qlprint", &mut io::stdout());
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Print(args) => handle_print_command(args)?,
        Commands::Status(args) => handle_status_command(args)?,
        Commands::Completion(args) => handle_completion_command(args)?,
    }

    Ok(())
}
