use clap::{Parser, ValueEnum};
use sales_catalog::{
    ingest_file, ClientIndex, Error, LineFormat, ProductIndex, ReadStats, SalesCatalog, Validator,
};
use std::{fs::File, io::Write, path::PathBuf, process::ExitCode, time::Instant};

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Layout {
    /// type;client;product;month;price;branch;quantity
    Default,
    /// product price quantity type client month branch
    Sgv,
}

/// validate sales files against the client and product master files
/// and print the catalog of valid sales
#[derive(Parser, Debug)]
#[command(version)]
struct Args {
    /// one client code per line
    #[arg(long)]
    clients: PathBuf,
    /// one product code per line
    #[arg(long)]
    products: PathBuf,
    /// sales files, ingested in order into the same catalog
    #[arg(long, required = true, num_args = 1..)]
    sales: Vec<PathBuf>,
    #[arg(long, value_enum, default_value_t = Layout::Default)]
    layout: Layout,
    /// overrides the layout's field delimiter, a single ascii character
    #[arg(long, value_parser = parse_delimiter)]
    delimiter: Option<u8>,
    /// number of branches, valid branch ids are 1..=n
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..))]
    branches: Option<u8>,
    /// write the catalog here instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,
}

fn parse_delimiter(s: &str) -> Result<u8, String> {
    match s.as_bytes() {
        [b] if b.is_ascii() => Ok(*b),
        _ => Err(format!("{:?} is not a single ascii character", s)),
    }
}

fn line_format(args: &Args) -> LineFormat {
    let mut format = match args.layout {
        Layout::Default => LineFormat::default(),
        Layout::Sgv => LineFormat::sgv(),
    };
    if let Some(delimiter) = args.delimiter {
        format = format.with_delimiter(delimiter);
    }
    if let Some(branches) = args.branches {
        format = format.with_branches(1..=branches);
    }
    format
}

fn print_stats(stats: &ReadStats) -> Result<(), Error> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b',')
        .from_writer(std::io::stderr());
    writer
        .serialize(stats)
        .map_err(|source| Error::Export { source })?;
    writer.flush().map_err(|source| Error::Io { source })
}

fn run(args: Args) -> Result<(), Error> {
    let (clients, _) = ClientIndex::load_file(&args.clients)?;
    let (products, _) = ProductIndex::load_file(&args.products)?;
    let validator = Validator::new(line_format(&args), &products, &clients)?;

    let mut catalog = SalesCatalog::new();
    let mut stats = ReadStats::new();
    let now = Instant::now();
    for path in &args.sales {
        ingest_file(path, &mut catalog, &mut stats, &validator)?;
    }
    log::info!(
        "spent {} ms validating {} lines, {} catalog entries (tree height {})",
        now.elapsed().as_millis(),
        stats.lines_read,
        catalog.len(),
        catalog.height()
    );
    print_stats(&stats)?;

    match &args.output {
        Some(path) => {
            let f = File::create(path).map_err(|source| Error::Io { source })?;
            catalog.write_csv(f)
        }
        None => {
            let stdout = std::io::stdout();
            let mut lock = stdout.lock();
            catalog.write_csv(&mut lock)?;
            lock.flush().map_err(|source| Error::Io { source })
        }
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
