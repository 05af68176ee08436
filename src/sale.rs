use serde::{Serialize, Serializer};
use std::fmt;

use crate::reference::{ClientCode, ProductCode};

pub type Month = u8;
pub type Branch = u8;
pub type Price = f64;
pub type Quantity = u64;

/// the single character tag distinguishing sale categories
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct SaleType(char);

impl SaleType {
    pub fn new(tag: char) -> Self {
        Self(tag)
    }

    pub fn tag(&self) -> char {
        self.0
    }
}

impl fmt::Display for SaleType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn precision_serialize<S>(x: &Price, s: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let x = (x * 100.0).round() / 100.0;
    s.serialize_f64(x)
}

/// one validated sale. client and product codes are only set here
/// once they were found in the reference indexes.
/// outside this crate a `Sale` only comes out of a `Validator`
///
/// ```compile_fail
/// use sales_catalog::SaleDraft;
/// ```
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Sale {
    #[serde(rename = "type")]
    sale_type: SaleType,
    client: ClientCode,
    product: ProductCode,
    month: Month,
    #[serde(serialize_with = "precision_serialize")]
    price: Price,
    branch: Branch,
    quantity: Quantity,
}

impl Sale {
    pub fn sale_type(&self) -> SaleType {
        self.sale_type
    }

    pub fn client(&self) -> &ClientCode {
        &self.client
    }

    pub fn product(&self) -> &ProductCode {
        &self.product
    }

    pub fn month(&self) -> Month {
        self.month
    }

    pub fn price(&self) -> Price {
        self.price
    }

    pub fn branch(&self) -> Branch {
        self.branch
    }

    pub fn quantity(&self) -> Quantity {
        self.quantity
    }

    /// overwrite the quantity, the only field that changes after validation (used when merging)
    pub(crate) fn set_quantity(&mut self, quantity: Quantity) {
        self.quantity = quantity;
    }

    pub fn key(&self) -> SaleKey {
        SaleKey {
            client: self.client.clone(),
            product: self.product.clone(),
            month: self.month,
            branch: self.branch,
        }
    }
}

/// a sale being filled field by field while a line is validated.
/// dropping it on rejection releases whatever was set so far
#[derive(Debug, Default)]
pub(crate) struct SaleDraft {
    sale_type: Option<SaleType>,
    client: Option<ClientCode>,
    product: Option<ProductCode>,
    month: Option<Month>,
    price: Option<Price>,
    branch: Option<Branch>,
    quantity: Option<Quantity>,
}

impl SaleDraft {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sale_type(&mut self, sale_type: SaleType) -> &mut Self {
        self.sale_type = Some(sale_type);
        self
    }

    pub fn client(&mut self, client: ClientCode) -> &mut Self {
        self.client = Some(client);
        self
    }

    pub fn product(&mut self, product: ProductCode) -> &mut Self {
        self.product = Some(product);
        self
    }

    pub fn month(&mut self, month: Month) -> &mut Self {
        self.month = Some(month);
        self
    }

    pub fn price(&mut self, price: Price) -> &mut Self {
        self.price = Some(price);
        self
    }

    pub fn branch(&mut self, branch: Branch) -> &mut Self {
        self.branch = Some(branch);
        self
    }

    pub fn quantity(&mut self, quantity: Quantity) -> &mut Self {
        self.quantity = Some(quantity);
        self
    }

    /// the finished sale, or `None` while any field is still missing
    pub fn finish(self) -> Option<Sale> {
        Some(Sale {
            sale_type: self.sale_type?,
            client: self.client?,
            product: self.product?,
            month: self.month?,
            price: self.price?,
            branch: self.branch?,
            quantity: self.quantity?,
        })
    }
}

/// identity of a catalog entry.
/// the derived ordering compares client, then product, then month, then branch
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SaleKey {
    pub client: ClientCode,
    pub product: ProductCode,
    pub month: Month,
    pub branch: Branch,
}

impl fmt::Display for SaleKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "({}, {}, month {}, branch {})",
            self.client, self.product, self.month, self.branch
        )
    }
}

/// read access to a sale either as a loose record or as an entry sitting in the catalog tree
#[derive(Debug, Clone, Copy)]
pub enum SaleRef<'a> {
    Raw(&'a Sale),
    Indexed { key: &'a SaleKey, sale: &'a Sale },
}

impl<'a> SaleRef<'a> {
    pub fn sale_type(&self) -> SaleType {
        match self {
            SaleRef::Raw(sale) | SaleRef::Indexed { sale, .. } => sale.sale_type,
        }
    }

    pub fn client(&self) -> &'a ClientCode {
        match *self {
            SaleRef::Raw(sale) => &sale.client,
            SaleRef::Indexed { key, .. } => &key.client,
        }
    }

    pub fn product(&self) -> &'a ProductCode {
        match *self {
            SaleRef::Raw(sale) => &sale.product,
            SaleRef::Indexed { key, .. } => &key.product,
        }
    }

    pub fn month(&self) -> Month {
        match self {
            SaleRef::Raw(sale) => sale.month,
            SaleRef::Indexed { key, .. } => key.month,
        }
    }

    pub fn price(&self) -> Price {
        match self {
            SaleRef::Raw(sale) | SaleRef::Indexed { sale, .. } => sale.price,
        }
    }

    pub fn branch(&self) -> Branch {
        match self {
            SaleRef::Raw(sale) => sale.branch,
            SaleRef::Indexed { key, .. } => key.branch,
        }
    }

    pub fn quantity(&self) -> Quantity {
        match self {
            SaleRef::Raw(sale) | SaleRef::Indexed { sale, .. } => sale.quantity,
        }
    }
}

impl<'a> From<&'a Sale> for SaleRef<'a> {
    fn from(sale: &'a Sale) -> Self {
        SaleRef::Raw(sale)
    }
}

#[cfg(test)]
pub(crate) fn sale(
    client: &str,
    product: &str,
    month: Month,
    branch: Branch,
    quantity: Quantity,
) -> Sale {
    let mut draft = SaleDraft::new();
    draft
        .sale_type(SaleType::new('V'))
        .client(ClientCode::new(client))
        .product(ProductCode::new(product))
        .month(month)
        .price(9.99)
        .branch(branch)
        .quantity(quantity);
    draft.finish().unwrap()
}
