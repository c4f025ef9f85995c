use crate::domain::cart::CartItem;
use crate::error::{CommerceError, Result};
use std::io::Read;

/// Reads cart lines from a CSV source with the header
/// `product_id, name, price, quantity`.
///
/// Whitespace around fields is trimmed. Each row is validated the same way
/// as an item added through the shop.
pub struct CartReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> CartReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(source);
        Self { reader }
    }

    /// Lazily deserializes and validates each row.
    pub fn items(self) -> impl Iterator<Item = Result<CartItem>> {
        self.reader.into_deserialize().map(|result| {
            let raw: CartItem = result.map_err(CommerceError::from)?;
            CartItem::new(raw.product_id, raw.name, raw.unit_price, raw.quantity)
        })
    }
}
