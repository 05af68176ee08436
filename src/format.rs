use std::ops::RangeInclusive;

use crate::sale::Branch;

/// the seven fields every sale line carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Type,
    Client,
    Product,
    Month,
    Price,
    Branch,
    Quantity,
}

impl Column {
    pub fn name(&self) -> &'static str {
        match self {
            Column::Type => "type",
            Column::Client => "client",
            Column::Product => "product",
            Column::Month => "month",
            Column::Price => "price",
            Column::Branch => "branch",
            Column::Quantity => "quantity",
        }
    }
}

pub const FIELD_COUNT: usize = 7;

/// describes how a raw sales line is laid out and which values are acceptable
#[derive(Debug, Clone, PartialEq)]
pub struct LineFormat {
    pub delimiter: u8,
    pub columns: [Column; FIELD_COUNT],
    pub branches: RangeInclusive<Branch>,
    // None accepts any single non-whitespace character
    pub sale_types: Option<Vec<char>>,
}

impl Default for LineFormat {
    /// `type;client;product;month;price;branch;quantity`
    fn default() -> Self {
        Self {
            delimiter: b';',
            columns: [
                Column::Type,
                Column::Client,
                Column::Product,
                Column::Month,
                Column::Price,
                Column::Branch,
                Column::Quantity,
            ],
            branches: 1..=3,
            sale_types: None,
        }
    }
}

impl LineFormat {
    /// the legacy space separated layout: `product price quantity type client month branch`
    pub fn sgv() -> Self {
        Self {
            delimiter: b' ',
            columns: [
                Column::Product,
                Column::Price,
                Column::Quantity,
                Column::Type,
                Column::Client,
                Column::Month,
                Column::Branch,
            ],
            branches: 1..=3,
            sale_types: Some(vec!['N', 'P']),
        }
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_branches(mut self, branches: RangeInclusive<Branch>) -> Self {
        self.branches = branches;
        self
    }

    pub fn with_sale_types(mut self, sale_types: Option<Vec<char>>) -> Self {
        self.sale_types = sale_types;
        self
    }

    /// position of `column` inside a line
    pub fn position(&self, column: Column) -> Option<usize> {
        self.columns.iter().position(|c| *c == column)
    }

    /// every column appears exactly once
    pub fn is_complete(&self) -> bool {
        self.columns
            .iter()
            .enumerate()
            .all(|(i, column)| !self.columns[..i].contains(column))
    }

    pub fn accepts_type(&self, tag: char) -> bool {
        match &self.sale_types {
            Some(types) => types.contains(&tag),
            None => !tag.is_whitespace(),
        }
    }
}
