//! Promotion engine (spec §4.3 "Promotion engine").
//!
//! `apply_promotions` is a pure function: given an [`Order`] and the active
//! [`PromotionSpec`]s, it mutates the order's lines and totals in place and
//! returns it. It processes specs in two phases to avoid double-application:
//! Phase A (combination promotions) first, Phase B (per-line promotions)
//! second, and is idempotent on an already-promoted order because every
//! phase skips lines already marked `promotion_applied`.

use std::collections::HashSet;

use crate::domain::{DiscountKind, DiscountSpec, Order, OrderLine, OrderLineStatus, PromotionEffects, PromotionSpec};

/// Apply the active promotion specs to `order`, mutating lines and totals
/// in place, and return it.
///
/// Invariants preserved on return (spec §4.3, §8):
/// - per-line `total_price == unit_price * quantity`
/// - `order.total_discount == sum of per-line discounts`
/// - `order.total_price == sum of line.total_price over created lines`
pub fn apply_promotions(mut order: Order, specs: &[PromotionSpec]) -> Order {
    apply_combination_phase(&mut order, specs);
    apply_per_line_phase(&mut order, specs);
    recompute_totals(&mut order);
    order
}

fn apply_combination_phase(order: &mut Order, specs: &[PromotionSpec]) {
    let eligible_ids: HashSet<String> = order
        .lines
        .iter()
        .filter(|l| l.status == OrderLineStatus::Created)
        .map(|l| l.product_id.clone())
        .collect();

    for spec in specs.iter().filter(|s| s.is_combination()) {
        let required = spec
            .conditions
            .product_combination
            .as_ref()
            .expect("is_combination guarantees Some");
        if !required.iter().all(|id| eligible_ids.contains(id)) {
            continue;
        }
        let to_product_id = spec.effects.apply_discount.as_ref().and_then(|d| d.to_product_id.as_deref());
        for line in order.lines.iter_mut() {
            if line.promotion_applied || line.status != OrderLineStatus::Created {
                continue;
            }
            let targeted = match to_product_id {
                Some(id) => line.product_id == id,
                None => required.contains(&line.product_id),
            };
            if targeted {
                apply_effects(line, &spec.effects);
            }
        }
    }
}

fn apply_per_line_phase(order: &mut Order, specs: &[PromotionSpec]) {
    for spec in specs.iter().filter(|s| !s.is_combination()) {
        let to_product_id = spec.effects.apply_discount.as_ref().and_then(|d| d.to_product_id.as_deref());
        for line in order.lines.iter_mut() {
            if line.promotion_applied || line.status != OrderLineStatus::Created {
                continue;
            }
            if let Some(id) = to_product_id {
                if line.product_id != id {
                    continue;
                }
            }
            let min_ok = spec.conditions.min_quantity.map_or(true, |mq| line.quantity >= mq);
            if min_ok {
                apply_effects(line, &spec.effects);
            }
        }
    }
}

/// Apply one spec's effects to a single line. Returns `true` if the line
/// was actually changed (used by callers that care; the engine itself
/// relies on `line.promotion_applied` being set as the idempotence guard).
fn apply_effects(line: &mut OrderLine, effects: &PromotionEffects) -> bool {
    let mut applied = false;
    let mut descriptions = Vec::new();

    if let Some(discount) = &effects.apply_discount {
        if let Some(desc) = apply_discount(line, discount) {
            applied = true;
            descriptions.push(desc);
        }
    }

    if let Some(free) = effects.free_items {
        if free > 0 && line.quantity > 0 {
            let free_count = free.min(line.quantity);
            if free_count > 0 {
                line.unit_price *= 1.0 - (free_count as f64 / line.quantity as f64);
                line.recompute_total();
                applied = true;
                descriptions.push(format!("{free_count} free item(s)"));
            }
        }
    }

    if let Some(gift) = &effects.free_gift {
        applied = true;
        descriptions.push(format!("free gift: {gift}"));
    }

    if applied {
        line.promotion_applied = true;
        line.promotion_description = Some(match line.promotion_description.take() {
            Some(existing) => format!("{existing}; {}", descriptions.join(", ")),
            None => descriptions.join(", "),
        });
    }
    applied
}

/// Apply a single discount rule (spec §4.3 "Discount semantics"). Returns
/// `None` (no-op) when the computed discount is zero, so that e.g. a
/// `bogo_half` on `quantity == 1` never sets `promotion_applied` (spec §8
/// boundary behavior).
fn apply_discount(line: &mut OrderLine, spec: &DiscountSpec) -> Option<String> {
    match spec.kind {
        DiscountKind::Percentage => {
            let new_unit = (line.unit_price * (1.0 - spec.amount / 100.0)).max(0.0);
            if new_unit >= line.unit_price {
                return None;
            }
            line.unit_price = new_unit;
            line.recompute_total();
            Some(format!("{}% off", spec.amount))
        }
        DiscountKind::Fixed => {
            let new_unit = (line.unit_price - spec.amount).max(0.0);
            if new_unit >= line.unit_price {
                return None;
            }
            line.unit_price = new_unit;
            line.recompute_total();
            Some(format!("${:.2} off", spec.amount))
        }
        DiscountKind::BogoHalf => {
            let discounted_items = line.quantity / 2;
            if discounted_items == 0 {
                return None;
            }
            let discount_this_line = line.base_price * 0.5 * discounted_items as f64;
            let new_unit = (line.base_price * line.quantity as f64 - discount_this_line) / line.quantity as f64;
            line.unit_price = new_unit;
            line.recompute_total();
            Some("buy-one-get-one half off".to_string())
        }
    }
}

fn recompute_totals(order: &mut Order) {
    order.total_discount = order
        .lines
        .iter()
        .map(|l| ((l.base_price - l.unit_price) * l.quantity as f64).max(0.0))
        .sum();
    order.recompute();
}
