use csv::ByteRecord;
use snafu::Snafu;

use crate::{
    build_line_reader,
    format::{Column, LineFormat, FIELD_COUNT},
    reference::{ClientCode, ClientIndex, ProductCode, ProductIndex},
    sale::{Sale, SaleDraft, SaleType},
    stats::ReadStats,
    Error,
};

/// why a single line was turned down. rejections are counted and skipped, they never abort a batch
#[derive(Debug, Snafu, Clone, PartialEq)]
pub enum Rejection {
    #[snafu(display("expected {} fields, found {}", expected, found))]
    FieldCount { expected: usize, found: usize },
    #[snafu(display("field {} can't be parsed: {:?}", field, value))]
    UnparsableField { field: &'static str, value: String },
    #[snafu(display("invalid sale type {:?}", tag))]
    InvalidType { tag: String },
    #[snafu(display("client {} is not in the client index", code))]
    UnknownClient { code: ClientCode },
    #[snafu(display("product {} is not in the product index", code))]
    UnknownProduct { code: ProductCode },
    #[snafu(display("{} out of range: {}", field, value))]
    DomainViolation { field: &'static str, value: String },
    #[snafu(display("line holds more than one record"))]
    TrailingRecord,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionKind {
    Malformed,
    InvalidType,
    UnknownClient,
    UnknownProduct,
    Domain,
}

impl Rejection {
    pub fn kind(&self) -> RejectionKind {
        match self {
            Rejection::FieldCount { .. }
            | Rejection::UnparsableField { .. }
            | Rejection::TrailingRecord => RejectionKind::Malformed,
            Rejection::InvalidType { .. } => RejectionKind::InvalidType,
            Rejection::UnknownClient { .. } => RejectionKind::UnknownClient,
            Rejection::UnknownProduct { .. } => RejectionKind::UnknownProduct,
            Rejection::DomainViolation { .. } => RejectionKind::Domain,
        }
    }
}

fn out_of_range(column: Column, value: &str) -> Rejection {
    Rejection::DomainViolation {
        field: column.name(),
        value: value.to_string(),
    }
}

fn unparsable(column: Column, value: &str) -> Rejection {
    Rejection::UnparsableField {
        field: column.name(),
        value: value.to_string(),
    }
}

/// checks raw sales lines against the line layout and the two reference indexes
pub struct Validator<'a> {
    format: LineFormat,
    products: &'a ProductIndex,
    clients: &'a ClientIndex,
    // field position of each column, indexed by `Column as usize`
    positions: [usize; FIELD_COUNT],
}

impl<'a> Validator<'a> {
    pub fn new(
        format: LineFormat,
        products: &'a ProductIndex,
        clients: &'a ClientIndex,
    ) -> Result<Self, Error> {
        if !format.is_complete() {
            return Err(Error::IncompleteFormat);
        }
        let mut positions = [0; FIELD_COUNT];
        for (i, column) in format.columns.iter().enumerate() {
            positions[*column as usize] = i;
        }
        Ok(Self {
            format,
            products,
            clients,
            positions,
        })
    }

    pub fn format(&self) -> &LineFormat {
        &self.format
    }

    /// validate one raw line, e.g. `V;C001;P010;03;9.99;2;5` with the default layout
    pub fn validate(&self, stats: &mut ReadStats, line: &str) -> Result<Sale, Rejection> {
        let mut reader = build_line_reader(line.as_bytes(), self.format.delimiter);
        let mut record = ByteRecord::new();
        // an empty or unreadable line leaves the record empty and fails the field count
        if !matches!(reader.read_byte_record(&mut record), Ok(true)) {
            record.clear();
        }
        // a line terminator inside `line` would smuggle a second sale past the caller
        let mut rest = ByteRecord::new();
        if matches!(reader.read_byte_record(&mut rest), Ok(true)) {
            stats.record_line();
            stats.record_rejection(RejectionKind::Malformed);
            return Err(Rejection::TrailingRecord);
        }
        self.validate_record(stats, &record)
    }

    /// validate a line already split into fields. counts the line in `stats` either way
    pub fn validate_record(
        &self,
        stats: &mut ReadStats,
        record: &ByteRecord,
    ) -> Result<Sale, Rejection> {
        stats.record_line();
        match self.check(record) {
            Ok(sale) => {
                stats.record_acceptance();
                Ok(sale)
            }
            Err(rejection) => {
                stats.record_rejection(rejection.kind());
                Err(rejection)
            }
        }
    }

    fn field<'r>(&self, record: &'r ByteRecord, column: Column) -> Result<&'r str, Rejection> {
        let raw = record
            .get(self.positions[column as usize])
            .unwrap_or_default();
        std::str::from_utf8(raw).map_err(|_| unparsable(column, &String::from_utf8_lossy(raw)))
    }

    fn integer(&self, record: &ByteRecord, column: Column) -> Result<(i64, String), Rejection> {
        let value = self.field(record, column)?;
        value
            .parse::<i64>()
            .map(|parsed| (parsed, value.to_string()))
            .map_err(|_| unparsable(column, value))
    }

    // fields, then references, then domain checks. the first failure wins
    fn check(&self, record: &ByteRecord) -> Result<Sale, Rejection> {
        if record.len() != FIELD_COUNT {
            return Err(Rejection::FieldCount {
                expected: FIELD_COUNT,
                found: record.len(),
            });
        }
        let mut draft = SaleDraft::new();

        let tag = self.field(record, Column::Type)?;
        let mut chars = tag.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) if self.format.accepts_type(c) => {
                draft.sale_type(SaleType::new(c));
            }
            _ => {
                return Err(Rejection::InvalidType {
                    tag: tag.to_string(),
                })
            }
        }

        let client = ClientCode::new(self.field(record, Column::Client)?);
        if !self.clients.contains(&client) {
            return Err(Rejection::UnknownClient { code: client });
        }
        draft.client(client);

        let product = ProductCode::new(self.field(record, Column::Product)?);
        if !self.products.contains(&product) {
            return Err(Rejection::UnknownProduct { code: product });
        }
        draft.product(product);

        let (month, raw) = self.integer(record, Column::Month)?;
        match u8::try_from(month) {
            Ok(month) if (1..=12).contains(&month) => draft.month(month),
            _ => return Err(out_of_range(Column::Month, &raw)),
        };

        let raw = self.field(record, Column::Price)?;
        let price = raw
            .parse::<f64>()
            .map_err(|_| unparsable(Column::Price, raw))?;
        if !price.is_finite() || price < 0.0 {
            return Err(out_of_range(Column::Price, raw));
        }
        draft.price(price);

        let (branch, raw) = self.integer(record, Column::Branch)?;
        match u8::try_from(branch) {
            Ok(branch) if self.format.branches.contains(&branch) => draft.branch(branch),
            _ => return Err(out_of_range(Column::Branch, &raw)),
        };

        let (quantity, raw) = self.integer(record, Column::Quantity)?;
        match u64::try_from(quantity) {
            Ok(quantity) if quantity > 0 => draft.quantity(quantity),
            _ => return Err(out_of_range(Column::Quantity, &raw)),
        };

        draft.finish().ok_or(Rejection::FieldCount {
            expected: FIELD_COUNT,
            found: record.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{Rejection, RejectionKind, Validator};
    use csv::ByteRecord;
    use crate::{
        format::{Column, LineFormat},
        reference::{ClientCode, ClientIndex, ProductCode, ProductIndex},
        stats::ReadStats,
        Error,
    };

    fn indexes() -> (ProductIndex, ClientIndex) {
        let products = ["P010", "P011"].into_iter().map(ProductCode::from).collect();
        let clients = ["C001", "C002"].into_iter().map(ClientCode::from).collect();
        (products, clients)
    }

    #[test]
    fn test_valid_line() {
        let (products, clients) = indexes();
        let validator = Validator::new(LineFormat::default(), &products, &clients).unwrap();
        let mut stats = ReadStats::new();
        let sale = validator
            .validate(&mut stats, "V;C001;P010;03;9.99;2;5")
            .unwrap();
        assert_eq!(sale.sale_type().tag(), 'V');
        assert_eq!(sale.client().as_str(), "C001");
        assert_eq!(sale.product().as_str(), "P010");
        assert_eq!(sale.month(), 3);
        assert_eq!(sale.price(), 9.99);
        assert_eq!(sale.branch(), 2);
        assert_eq!(sale.quantity(), 5);
        assert_eq!(stats.lines_read, 1);
        assert_eq!(stats.accepted, 1);
        assert_eq!(stats.rejected, 0);
    }

    #[test]
    fn test_unknown_references() {
        let (products, clients) = indexes();
        let validator = Validator::new(LineFormat::default(), &products, &clients).unwrap();
        let mut stats = ReadStats::new();
        let result = validator.validate(&mut stats, "V;C999;P010;03;9.99;2;5");
        assert_eq!(
            result,
            Err(Rejection::UnknownClient {
                code: ClientCode::new("C999")
            })
        );
        let result = validator.validate(&mut stats, "V;C001;P999;03;9.99;2;5");
        assert!(matches!(result, Err(Rejection::UnknownProduct { .. })));
        assert_eq!(stats.rejected, 2);
        assert_eq!(stats.unknown_client, 1);
        assert_eq!(stats.unknown_product, 1);
        assert!(stats.is_consistent());
    }

    #[test]
    fn test_client_is_checked_before_product() {
        let (products, clients) = indexes();
        let validator = Validator::new(LineFormat::default(), &products, &clients).unwrap();
        let mut stats = ReadStats::new();
        let result = validator.validate(&mut stats, "V;C999;P999;13;9.99;2;0");
        assert_eq!(result.unwrap_err().kind(), RejectionKind::UnknownClient);
    }

    #[test]
    fn test_domain_violations() {
        let (products, clients) = indexes();
        let validator = Validator::new(LineFormat::default(), &products, &clients).unwrap();
        let mut stats = ReadStats::new();
        for line in [
            "V;C001;P010;13;9.99;2;5",
            "V;C001;P010;0;9.99;2;5",
            "V;C001;P010;03;-1.0;2;5",
            "V;C001;P010;03;NaN;2;5",
            "V;C001;P010;03;9.99;4;5",
            "V;C001;P010;03;9.99;0;5",
            "V;C001;P010;03;9.99;2;0",
            "V;C001;P010;03;9.99;2;-3",
        ] {
            let result = validator.validate(&mut stats, line);
            assert!(
                matches!(result, Err(Rejection::DomainViolation { .. })),
                "{} -> {:?}",
                line,
                result
            );
        }
        assert_eq!(stats.domain, 8);
        assert_eq!(stats.accepted, 0);
    }

    #[test]
    fn test_malformed_lines() {
        let (products, clients) = indexes();
        let validator = Validator::new(LineFormat::default(), &products, &clients).unwrap();
        let mut stats = ReadStats::new();
        assert_eq!(
            validator.validate(&mut stats, "V;C001;P010;03;9.99;2"),
            Err(Rejection::FieldCount {
                expected: 7,
                found: 6
            })
        );
        assert_eq!(
            validator.validate(&mut stats, ""),
            Err(Rejection::FieldCount {
                expected: 7,
                found: 0
            })
        );
        assert_eq!(
            validator.validate(&mut stats, "V;C001;P010;march;9.99;2;5"),
            Err(Rejection::UnparsableField {
                field: "month",
                value: "march".into()
            })
        );
        assert!(matches!(
            validator.validate(&mut stats, "V;C001;P010;03;9.99;2;1.5"),
            Err(Rejection::UnparsableField {
                field: "quantity",
                ..
            })
        ));
        assert_eq!(stats.malformed, 4);
        assert_eq!(stats.lines_read, 4);
    }

    #[test]
    fn test_line_with_two_records_is_refused() {
        let (products, clients) = indexes();
        let validator = Validator::new(LineFormat::default(), &products, &clients).unwrap();
        let mut stats = ReadStats::new();
        assert_eq!(
            validator.validate(&mut stats, "V;C001;P010;03;9.99;2;5\ngarbage;more"),
            Err(Rejection::TrailingRecord)
        );
        assert_eq!(
            validator.validate(&mut stats, "V;C001;P010;03;9.99;2;5\nV;C002;P011;04;1.00;1;1"),
            Err(Rejection::TrailingRecord)
        );
        // a single trailing terminator is still one line
        assert!(validator
            .validate(&mut stats, "V;C001;P010;03;9.99;2;5\r\n")
            .is_ok());
        assert_eq!(stats.malformed, 2);
        assert_eq!(stats.lines_read, 3);
        assert_eq!(stats.accepted, 1);
    }

    #[test]
    fn test_non_utf8_field_is_unparsable() {
        let (products, clients) = indexes();
        let validator = Validator::new(LineFormat::default(), &products, &clients).unwrap();
        let mut stats = ReadStats::new();
        let record = ByteRecord::from(vec![
            &b"V"[..],
            &b"C001"[..],
            &b"P\xff10"[..],
            &b"03"[..],
            &b"9.99"[..],
            &b"2"[..],
            &b"5"[..],
        ]);
        assert!(matches!(
            validator.validate_record(&mut stats, &record),
            Err(Rejection::UnparsableField {
                field: "product",
                ..
            })
        ));
        assert_eq!(stats.malformed, 1);
    }

    #[test]
    fn test_quotes_are_kept_in_the_field() {
        let (products, clients) = indexes();
        let validator = Validator::new(LineFormat::default(), &products, &clients).unwrap();
        let mut stats = ReadStats::new();
        assert_eq!(
            validator.validate(&mut stats, "V;\"C001\";P010;03;9.99;2;5"),
            Err(Rejection::UnknownClient {
                code: ClientCode::new("\"C001\"")
            })
        );
        assert_eq!(stats.unknown_client, 1);
    }

    #[test]
    fn test_sale_type_tag() {
        let (products, clients) = indexes();
        let validator = Validator::new(LineFormat::default(), &products, &clients).unwrap();
        let mut stats = ReadStats::new();
        assert!(matches!(
            validator.validate(&mut stats, "VV;C001;P010;03;9.99;2;5"),
            Err(Rejection::InvalidType { .. })
        ));
        assert!(matches!(
            validator.validate(&mut stats, ";C001;P010;03;9.99;2;5"),
            Err(Rejection::InvalidType { .. })
        ));

        let restricted = LineFormat::default().with_sale_types(Some(vec!['N', 'P']));
        let validator = Validator::new(restricted, &products, &clients).unwrap();
        assert!(validator
            .validate(&mut stats, "V;C001;P010;03;9.99;2;5")
            .is_err());
        assert!(validator
            .validate(&mut stats, "P;C001;P010;03;9.99;2;5")
            .is_ok());
        assert_eq!(stats.invalid_type, 3);
    }

    #[test]
    fn test_sgv_layout_and_whitespace() {
        let (products, clients) = indexes();
        let validator = Validator::new(LineFormat::sgv(), &products, &clients).unwrap();
        let mut stats = ReadStats::new();
        let sale = validator
            .validate(&mut stats, "P011 12.50 4 N C002 11 3\r")
            .unwrap();
        assert_eq!(sale.product().as_str(), "P011");
        assert_eq!(sale.client().as_str(), "C002");
        assert_eq!(sale.month(), 11);
        assert_eq!(sale.branch(), 3);
        assert_eq!(sale.quantity(), 4);
        assert_eq!(sale.price(), 12.5);

        let spaced = Validator::new(LineFormat::default(), &products, &clients).unwrap();
        assert!(spaced
            .validate(&mut stats, " V ; C001 ; P010 ; 03 ; 9.99 ; 2 ; 5 ")
            .is_ok());
    }

    #[test]
    fn test_incomplete_format_is_refused() {
        let (products, clients) = indexes();
        let mut format = LineFormat::default();
        format.columns[0] = Column::Client;
        assert!(matches!(
            Validator::new(format, &products, &clients),
            Err(Error::IncompleteFormat)
        ));
    }
}
