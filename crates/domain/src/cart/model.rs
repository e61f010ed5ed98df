use chrono::{DateTime, Utc};
use common::{CartId, CartItemId, ProductId, UserId, line_total, round_money};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use store::{CartLine, CartRecord};

/// A cart line as shown to its owner.
///
/// `price_at_addition` is the frozen snapshot used for totals and checkout;
/// `current_price` and `stock_quantity` are live product values for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: CartItemId,
    pub product_id: ProductId,
    pub product_name: String,
    pub product_description: String,
    pub quantity: i32,
    pub price_at_addition: Decimal,
    pub current_price: Decimal,
    pub stock_quantity: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CartItem {
    /// Snapshot price times quantity.
    pub fn line_total(&self) -> Decimal {
        line_total(self.price_at_addition, self.quantity)
    }
}

impl From<CartLine> for CartItem {
    fn from(line: CartLine) -> Self {
        Self {
            id: line.id,
            product_id: line.product_id,
            product_name: line.product_name,
            product_description: line.product_description,
            quantity: line.quantity,
            price_at_addition: line.price_at_addition,
            current_price: line.current_price,
            stock_quantity: line.stock_quantity,
            created_at: line.created_at,
            updated_at: line.updated_at,
        }
    }
}

/// A user's cart with its computed totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    pub id: CartId,
    pub user_id: UserId,
    pub items: Vec<CartItem>,
    pub total_price: Decimal,
    pub total_items: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Cart {
    /// Builds the cart view. Totals are always derived from `items`.
    pub fn new(record: CartRecord, lines: Vec<CartLine>) -> Self {
        let items: Vec<CartItem> = lines.into_iter().map(CartItem::from).collect();
        let total_price = round_money(items.iter().map(CartItem::line_total).sum());
        let total_items = items.iter().map(|item| i64::from(item.quantity)).sum();

        Self {
            id: record.id,
            user_id: record.user_id,
            items,
            total_price,
            total_items,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }

    /// Returns true if the cart holds no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Looks up an item by id.
    pub fn item(&self, id: CartItemId) -> Option<&CartItem> {
        self.items.iter().find(|item| item.id == id)
    }

    /// Looks up the item holding a product.
    pub fn item_for_product(&self, product_id: ProductId) -> Option<&CartItem> {
        self.items.iter().find(|item| item.product_id == product_id)
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    fn line(
        id: i64,
        quantity: i32,
        price_at_addition: Decimal,
        current_price: Decimal,
    ) -> CartLine {
        let now = Utc::now();
        CartLine {
            id: CartItemId::new(id),
            cart_id: CartId::new(1),
            product_id: ProductId::new(id),
            product_name: format!("Product {id}"),
            product_description: String::new(),
            quantity,
            price_at_addition,
            current_price,
            stock_quantity: 10,
            created_at: now,
            updated_at: now,
        }
    }

    fn record() -> CartRecord {
        let now = Utc::now();
        CartRecord {
            id: CartId::new(1),
            user_id: UserId::new(7),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn totals_use_snapshot_prices() {
        let cart = Cart::new(
            record(),
            vec![
                line(1, 2, dec!(10.00), dec!(99.00)),
                line(2, 3, dec!(0.35), dec!(0.35)),
            ],
        );

        assert_eq!(cart.total_price, dec!(21.05));
        assert_eq!(cart.total_items, 5);
        assert_eq!(cart.item(CartItemId::new(2)).unwrap().line_total(), dec!(1.05));
    }

    #[test]
    fn empty_cart_has_zero_totals() {
        let cart = Cart::new(record(), Vec::new());

        assert!(cart.is_empty());
        assert_eq!(cart.total_price, Decimal::ZERO);
        assert_eq!(cart.total_items, 0);
    }
}
