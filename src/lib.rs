use csv::{ByteRecord, Reader};

use snafu::{ResultExt, Snafu};
use std::{
    fs::File,
    io::Read,
    path::{Path, PathBuf},
};
pub mod avl;
mod catalog;
pub mod format;
mod reference;
mod sale;
mod stats;
mod validator;
pub use avl::{AvlTree, OrderedIndex};
pub use catalog::{Placement, SalesCatalog};
pub use format::{Column, LineFormat};
pub use reference::{
    ClientCode, ClientIndex, LoadStats, ProductCode, ProductIndex, ReferenceEntry, ReferenceIndex,
};
pub use sale::{Branch, Month, Price, Quantity, Sale, SaleKey, SaleRef, SaleType};
pub use stats::ReadStats;
pub use validator::{Rejection, RejectionKind, Validator};

// the fatal errors of the program, anything that stops a whole batch
#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("can't open source {}: {}", path.display(), source))]
    SourceUnavailable {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("failed to read the sales source: {}", source))]
    SourceRead { source: csv::Error },
    #[snafu(display("failed to write the catalog: {}", source))]
    Export { source: csv::Error },
    #[snafu(display("io error: {}", source))]
    Io { source: std::io::Error },
    #[snafu(display("the line format must name every column exactly once"))]
    IncompleteFormat,
}

/// reader for raw sales lines. no header, no quoting, the field count is left to the validator
pub fn build_line_reader<R: Read>(stream_reader: R, delimiter: u8) -> Reader<R> {
    csv::ReaderBuilder::new()
        .has_headers(false)
        .delimiter(delimiter)
        .flexible(true)
        .quoting(false)
        .trim(csv::Trim::All)
        .from_reader(stream_reader)
}

/// validate every line of `stream_reader` and fold the accepted sales into `catalog`.
/// rejected lines are only counted in `stats`; a read failure stops the batch and leaves
/// what was merged so far in the catalog
pub fn ingest_reader<R: Read, I: OrderedIndex<SaleKey, Sale>>(
    stream_reader: R,
    catalog: &mut SalesCatalog<I>,
    stats: &mut ReadStats,
    validator: &Validator,
) -> Result<(), Error> {
    let mut reader = build_line_reader(stream_reader, validator.format().delimiter);
    let mut raw_record = ByteRecord::new();
    while reader
        .read_byte_record(&mut raw_record)
        .context(SourceReadSnafu)?
    {
        match validator.validate_record(stats, &raw_record) {
            Ok(sale) => {
                let placement = catalog.insert(sale);
                stats.record_placement(placement);
            }
            Err(rejection) => {
                let line = raw_record.position().map_or(0, |p| p.line());
                log::debug!("line {}: rejected, {}", line, rejection);
            }
        }
    }
    Ok(())
}

/// `ingest_reader` over a file. the file name is kept in `stats.last_source`
pub fn ingest_file<I: OrderedIndex<SaleKey, Sale>>(
    path: impl AsRef<Path>,
    catalog: &mut SalesCatalog<I>,
    stats: &mut ReadStats,
    validator: &Validator,
) -> Result<(), Error> {
    let path = path.as_ref();
    let f = File::open(path).context(SourceUnavailableSnafu { path })?;
    let (read_before, accepted_before) = (stats.lines_read, stats.accepted);
    stats.last_source = Some(path.display().to_string());
    ingest_reader(f, catalog, stats, validator)?;

    let (read, accepted) = (
        stats.lines_read - read_before,
        stats.accepted - accepted_before,
    );
    if read > 0 && accepted == 0 {
        log::warn!("no valid sale in {:?} ({} lines read)", path, read);
    }
    log::info!(
        "{:?}: {} lines read, {} accepted, {} rejected, catalog holds {} entries",
        path,
        read,
        accepted,
        read - accepted,
        catalog.len()
    );
    Ok(())
}

/// ingest a file laid out as `type;client;product;month;price;branch;quantity`
pub fn ingest(
    path: impl AsRef<Path>,
    catalog: &mut SalesCatalog,
    stats: &mut ReadStats,
    products: &ProductIndex,
    clients: &ClientIndex,
) -> Result<(), Error> {
    let validator = Validator::new(LineFormat::default(), products, clients)?;
    ingest_file(path, catalog, stats, &validator)
}

#[cfg(test)]
mod tests {
    use crate::{
        ingest, ingest_file, ingest_reader, ClientCode, ClientIndex, Error, LineFormat,
        ProductCode, ProductIndex, ReadStats, SaleKey, SalesCatalog, Validator,
    };

    fn indexes() -> (ProductIndex, ClientIndex) {
        let products = ["P010", "P011"].into_iter().map(ProductCode::from).collect();
        let clients = ["C001", "C002"].into_iter().map(ClientCode::from).collect();
        (products, clients)
    }

    fn key(client: &str, product: &str, month: u8, branch: u8) -> SaleKey {
        SaleKey {
            client: ClientCode::new(client),
            product: ProductCode::new(product),
            month,
            branch,
        }
    }

    #[test]
    fn test_duplicate_lines_are_merged() {
        let (products, clients) = indexes();
        let validator = Validator::new(LineFormat::default(), &products, &clients).unwrap();
        let mut catalog = SalesCatalog::new();
        let mut stats = ReadStats::new();
        let data = "V;C001;P010;03;9.99;2;5\nV;C001;P010;03;9.99;2;3\n";
        ingest_reader(data.as_bytes(), &mut catalog, &mut stats, &validator).unwrap();
        assert_eq!(catalog.len(), 1);
        assert_eq!(
            catalog
                .get(&key("C001", "P010", 3, 2))
                .map(|s| s.quantity()),
            Some(8)
        );
        assert_eq!(stats.inserted, 1);
        assert_eq!(stats.merged, 1);
        assert!(stats.is_consistent());
    }

    #[test]
    fn test_unknown_client_leaves_catalog_unchanged() {
        let (products, clients) = indexes();
        let validator = Validator::new(LineFormat::default(), &products, &clients).unwrap();
        let mut catalog = SalesCatalog::new();
        let mut stats = ReadStats::new();
        ingest_reader(
            "V;C999;P010;03;9.99;2;5".as_bytes(),
            &mut catalog,
            &mut stats,
            &validator,
        )
        .unwrap();
        assert!(catalog.is_empty());
        assert_eq!(stats.rejected, 1);
        assert_eq!(stats.accepted, 0);
    }

    #[test]
    fn test_distinct_keys_keep_their_quantity() {
        let (products, clients) = indexes();
        let validator = Validator::new(LineFormat::default(), &products, &clients).unwrap();
        let mut catalog = SalesCatalog::new();
        let mut stats = ReadStats::new();
        let mut data = String::new();
        let mut expected = vec![];
        for month in 1..=12u8 {
            for branch in 1..=3u8 {
                let quantity = u64::from(month) * 10 + u64::from(branch);
                data.push_str(&format!(
                    "V;C002;P011;{};1.00;{};{}\r\n",
                    month, branch, quantity
                ));
                expected.push((key("C002", "P011", month, branch), quantity));
            }
        }
        ingest_reader(data.as_bytes(), &mut catalog, &mut stats, &validator).unwrap();
        assert_eq!(catalog.len(), 36);
        for (key, quantity) in expected {
            assert_eq!(catalog.get(&key).map(|s| s.quantity()), Some(quantity));
        }
        assert!(catalog.is_balanced());
        assert_eq!(stats.inserted, 36);
    }

    #[test]
    fn test_stats_accumulate_across_batches() {
        let (products, clients) = indexes();
        let validator = Validator::new(LineFormat::default(), &products, &clients).unwrap();
        let mut catalog = SalesCatalog::new();
        let mut stats = ReadStats::new();
        ingest_reader(
            "V;C001;P010;03;9.99;2;5\nbroken line\n".as_bytes(),
            &mut catalog,
            &mut stats,
            &validator,
        )
        .unwrap();
        ingest_reader(
            "V;C001;P010;03;9.99;2;5\n".as_bytes(),
            &mut catalog,
            &mut stats,
            &validator,
        )
        .unwrap();
        assert_eq!(stats.lines_read, 3);
        assert_eq!(stats.malformed, 1);
        assert_eq!(stats.merged, 1);
        assert_eq!(catalog.total_quantity(), 10);
    }

    #[test]
    fn test_missing_source_is_fatal() {
        let (products, clients) = indexes();
        let mut catalog = SalesCatalog::new();
        let mut stats = ReadStats::new();
        let result = ingest(
            "./sample_data/missing_sales.txt",
            &mut catalog,
            &mut stats,
            &products,
            &clients,
        );
        assert!(matches!(result, Err(Error::SourceUnavailable { .. })));
        assert_eq!(stats.lines_read, 0);
    }

    #[test]
    fn test_ingest_sample_file() {
        let (clients, _) = ClientIndex::load_file("./sample_data/clients.txt").unwrap();
        let (products, _) = ProductIndex::load_file("./sample_data/products.txt").unwrap();
        let validator = Validator::new(LineFormat::default(), &products, &clients).unwrap();
        let mut catalog = SalesCatalog::new();
        let mut stats = ReadStats::new();
        ingest_file(
            "./sample_data/sales.txt",
            &mut catalog,
            &mut stats,
            &validator,
        )
        .unwrap();

        // the blank line is skipped by the reader
        assert_eq!(stats.lines_read, 11);
        assert_eq!(stats.accepted, 6);
        assert_eq!(stats.rejected, 5);
        assert_eq!(stats.unknown_client, 1);
        assert_eq!(stats.unknown_product, 1);
        assert_eq!(stats.domain, 2);
        assert_eq!(stats.malformed, 1);
        assert_eq!(stats.inserted, 4);
        assert_eq!(stats.merged, 2);
        assert!(stats.is_consistent());
        assert_eq!(stats.last_source.as_deref(), Some("./sample_data/sales.txt"));

        assert_eq!(catalog.len(), 4);
        assert_eq!(
            catalog
                .get(&key("C001", "P010", 3, 2))
                .map(|s| s.quantity()),
            Some(8)
        );
        let merged = catalog.get(&key("C002", "P011", 12, 1)).unwrap();
        assert_eq!(merged.quantity(), 15);
        assert_eq!(merged.price(), 1.5);
    }
}
