use snafu::ResultExt;
use std::io::Write;

use crate::{
    avl::{AvlTree, OrderedIndex},
    sale::{Price, Quantity, Sale, SaleKey, SaleRef},
    Error, ExportSnafu, IoSnafu,
};

/// where an accepted sale ended up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    // first sale for its key, a new node was added
    Inserted,
    // the key was already present, quantities were summed
    Merged,
}

/// the catalog of valid sales, one entry per (client, product, month, branch).
/// it owns every sale handed to it and only ever grows
#[derive(Debug, Clone)]
pub struct SalesCatalog<I = AvlTree<SaleKey, Sale>> {
    index: I,
}

impl SalesCatalog {
    pub fn new() -> Self {
        Self {
            index: AvlTree::new(),
        }
    }

    /// height of the underlying tree
    pub fn height(&self) -> u32 {
        self.index.height()
    }

    pub fn is_balanced(&self) -> bool {
        self.index.is_valid()
    }
}

impl Default for SalesCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: OrderedIndex<SaleKey, Sale>> SalesCatalog<I> {
    pub fn with_index(index: I) -> Self {
        Self { index }
    }

    /// merge-insert: a sale whose key is already present only adds its quantity
    /// to the existing entry, keeping the type and price recorded first
    pub fn insert(&mut self, sale: Sale) -> Placement {
        let key = sale.key();
        match self.index.lookup_mut(&key) {
            Some(existing) => {
                let total = existing.quantity().saturating_add(sale.quantity());
                existing.set_quantity(total);
                Placement::Merged
            }
            None => {
                self.index.insert(key, sale);
                Placement::Inserted
            }
        }
    }

    pub fn get(&self, key: &SaleKey) -> Option<&Sale> {
        self.index.lookup(key)
    }

    pub fn contains(&self, key: &SaleKey) -> bool {
        self.get(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// entries in ascending key order
    pub fn iter(&self) -> impl Iterator<Item = (&SaleKey, &Sale)> {
        self.index.iter()
    }

    pub fn entries(&self) -> impl Iterator<Item = SaleRef<'_>> {
        self.index
            .iter()
            .map(|(key, sale)| SaleRef::Indexed { key, sale })
    }

    pub fn total_quantity(&self) -> Quantity {
        self.index.iter().map(|(_, sale)| sale.quantity()).sum()
    }

    pub fn total_revenue(&self) -> Price {
        self.index
            .iter()
            .map(|(_, sale)| sale.price() * sale.quantity() as Price)
            .sum()
    }

    /// write every entry as csv, in key order
    pub fn write_csv<W: Write>(&self, w: W) -> Result<(), Error> {
        let mut writer = csv::WriterBuilder::new().delimiter(b',').from_writer(w);
        for (_, sale) in self.index.iter() {
            writer.serialize(sale).context(ExportSnafu)?;
        }
        writer.flush().context(IoSnafu)?;
        Ok(())
    }
}
