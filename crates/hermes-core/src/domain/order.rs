//! Order and order-line types produced by the Fulfiller (spec §3, §4.3).

use serde::{Deserialize, Serialize};

use super::catalog::PromotionSpec;

/// Status of a single order line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderLineStatus {
    Created,
    OutOfStock,
}

impl OrderLineStatus {
    /// Display string matching the order-status CSV's status column.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderLineStatus::Created => "created",
            OrderLineStatus::OutOfStock => "out_of_stock",
        }
    }
}

/// A product offered in place of an out-of-stock line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlternativeProduct {
    pub product_id: String,
    pub name: String,
    pub price: f64,
    pub stock: u32,
}

/// One line of an [`Order`] (spec §3).
///
/// Invariant: `total_price == unit_price * quantity` after every mutation;
/// `unit_price <= base_price` unless a non-discount effect set it otherwise.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: String,
    pub description: String,
    pub quantity: u32,
    pub base_price: f64,
    pub unit_price: f64,
    pub total_price: f64,
    pub status: OrderLineStatus,
    pub stock_after: u32,
    #[serde(default)]
    pub promotion_applied: bool,
    pub promotion_description: Option<String>,
    pub promotion: Option<PromotionSpec>,
    #[serde(default)]
    pub alternatives: Vec<AlternativeProduct>,
}

impl OrderLine {
    /// Construct a fresh, pre-promotion draft line (spec §4.3 step 1: Fulfiller
    /// output has `base_price == unit_price`, `promotion_applied == false`).
    pub fn draft(
        product_id: impl Into<String>,
        description: impl Into<String>,
        quantity: u32,
        price: f64,
    ) -> Self {
        Self {
            product_id: product_id.into(),
            description: description.into(),
            quantity,
            base_price: price,
            unit_price: price,
            total_price: price * quantity as f64,
            status: OrderLineStatus::Created,
            stock_after: 0,
            promotion_applied: false,
            promotion_description: None,
            promotion: None,
            alternatives: Vec::new(),
        }
    }

    /// Recompute `total_price` from `unit_price * quantity`. Call after any
    /// mutation to `unit_price` or `quantity` to preserve the line invariant.
    pub fn recompute_total(&mut self) {
        self.total_price = self.unit_price * self.quantity as f64;
    }

    /// True when this line was marked for customer confirmation by the
    /// Stockkeeper/Fulfiller for a moderate-confidence match (spec §4.7).
    pub fn needs_clarification(&self) -> bool {
        self.description.starts_with("[CLARIFICATION NEEDED:")
    }
}

/// Aggregate order status (spec §3 invariants).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverallStatus {
    Created,
    OutOfStock,
    PartiallyFulfilled,
    NoValidProducts,
}

impl OverallStatus {
    /// Derive the overall status from the line statuses, per spec §3:
    /// `created` iff every line created; `out_of_stock` iff all lines
    /// out of stock; `partially_fulfilled` iff mixed; `no_valid_products`
    /// iff there are no lines.
    pub fn from_lines(lines: &[OrderLine]) -> Self {
        if lines.is_empty() {
            return OverallStatus::NoValidProducts;
        }
        let created = lines.iter().filter(|l| l.status == OrderLineStatus::Created).count();
        if created == lines.len() {
            OverallStatus::Created
        } else if created == 0 {
            OverallStatus::OutOfStock
        } else {
            OverallStatus::PartiallyFulfilled
        }
    }
}

/// The Fulfiller's terminal output (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub email_id: String,
    pub overall_status: OverallStatus,
    pub lines: Vec<OrderLine>,
    pub total_price: f64,
    pub total_discount: f64,
    pub message: Option<String>,
    #[serde(default)]
    pub stock_updated: bool,
}

impl Order {
    /// Recompute `total_price` (sum of created lines' `total_price`) and
    /// `overall_status` from the current line set. `total_discount` is left
    /// untouched — callers (the promotion engine) own that field directly.
    pub fn recompute(&mut self) {
        self.total_price = self
            .lines
            .iter()
            .filter(|l| l.status == OrderLineStatus::Created)
            .map(|l| l.total_price)
            .sum();
        self.overall_status = OverallStatus::from_lines(&self.lines);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn created_line(price: f64, qty: u32) -> OrderLine {
        let mut l = OrderLine::draft("A0001", "desc", qty, price);
        l.status = OrderLineStatus::Created;
        l
    }

    fn oos_line() -> OrderLine {
        let mut l = OrderLine::draft("A0002", "desc", 1, 10.0);
        l.status = OrderLineStatus::OutOfStock;
        l
    }

    #[test]
    fn overall_status_created_when_all_lines_created() {
        let lines = vec![created_line(10.0, 1), created_line(5.0, 2)];
        assert_eq!(OverallStatus::from_lines(&lines), OverallStatus::Created);
    }

    #[test]
    fn overall_status_out_of_stock_when_all_lines_oos() {
        let lines = vec![oos_line(), oos_line()];
        assert_eq!(OverallStatus::from_lines(&lines), OverallStatus::OutOfStock);
    }

    #[test]
    fn overall_status_partially_fulfilled_on_mix() {
        let lines = vec![created_line(10.0, 1), oos_line()];
        assert_eq!(OverallStatus::from_lines(&lines), OverallStatus::PartiallyFulfilled);
    }

    #[test]
    fn overall_status_no_valid_products_on_empty() {
        assert_eq!(OverallStatus::from_lines(&[]), OverallStatus::NoValidProducts);
    }

    #[test]
    fn order_recompute_sums_only_created_lines() {
        let mut order = Order {
            email_id: "e1".into(),
            overall_status: OverallStatus::NoValidProducts,
            lines: vec![created_line(10.0, 2), oos_line()],
            total_price: 0.0,
            total_discount: 0.0,
            message: None,
            stock_updated: false,
        };
        order.recompute();
        assert_eq!(order.total_price, 20.0);
        assert_eq!(order.overall_status, OverallStatus::PartiallyFulfilled);
    }

    #[test]
    fn draft_line_preserves_total_price_invariant() {
        let line = OrderLine::draft("A0001", "desc", 3, 7.5);
        assert_eq!(line.total_price, line.unit_price * line.quantity as f64);
        assert_eq!(line.base_price, line.unit_price);
    }
}
