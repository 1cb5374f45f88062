//! Sample payload records: customers and orders.
//!
//! These are illustrative shapes only. They carry no relationships and no
//! lifecycle beyond being stored in memory.

use serde::{Deserialize, Serialize};

/// A customer record as accepted by `POST /customer` and `POST /json`.
///
/// The identifier is expected to be positive, but that is a request
/// validation rule, not a construction invariant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
}

impl Customer {
    pub fn new(id: i64, first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            id,
            first_name: first_name.into(),
            last_name: last_name.into(),
        }
    }
}

/// Order line: item name, quantity, unit price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub item: String,
    pub amount: u32,
    /// Price in smallest currency unit (e.g., cents).
    pub price: u64,
}

impl OrderItem {
    pub fn new(item: impl Into<String>, amount: u32, price: u64) -> Self {
        Self {
            item: item.into(),
            amount,
            price,
        }
    }

    pub fn line_total(&self) -> u64 {
        u64::from(self.amount) * self.price
    }
}

/// An order: a string identifier plus its ordered line items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub number: String,
    pub contents: Vec<OrderItem>,
}

impl Order {
    pub fn new(number: impl Into<String>, contents: Vec<OrderItem>) -> Self {
        Self {
            number: number.into(),
            contents,
        }
    }

    /// Sum of `amount * price` over all lines, in cents.
    pub fn total(&self) -> u64 {
        self.contents.iter().map(OrderItem::line_total).sum()
    }
}

/// Render an amount in cents as a decimal string with two fraction digits.
pub fn format_cents(cents: u64) -> String {
    format!("{}.{:02}", cents / 100, cents % 100)
}

/// Orders available at startup.
pub fn sample_orders() -> Vec<Order> {
    vec![
        Order::new(
            "2020-04-06-01",
            vec![
                OrderItem::new("Ham Sandwich", 2, 550),
                OrderItem::new("Water", 1, 150),
                OrderItem::new("Beer", 3, 230),
                OrderItem::new("Cheesecake", 1, 375),
            ],
        ),
        Order::new(
            "2020-04-03-01",
            vec![
                OrderItem::new("Cheeseburger", 1, 850),
                OrderItem::new("Water", 2, 150),
                OrderItem::new("Coke", 2, 176),
                OrderItem::new("Ice Cream", 1, 235),
            ],
        ),
    ]
}
