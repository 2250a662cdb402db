//! Availability and pricing.
//!
//! Stock is checked per calendar day. For every day a request covers, the quantity already
//! reserved by non-cancelled bookings plus the quantity requested must not exceed the
//! item's total stock. Two bookings that merely touch (`[10, 12)` and `[12, 14)`) never
//! compete for the same day.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::BTreeMap;

use crate::models::{
    BookingLine, DateRange, InventoryItem, LineTarget, Package, Reservation,
};
use crate::services::RentalError;

/// `days × price_per_day × quantity`. Fails if the result does not fit a `Decimal`.
pub fn line_price(price_per_day: Decimal, days: u32, quantity: u32) -> Result<Decimal, RentalError> {
    price_per_day
        .checked_mul(Decimal::from(days))
        .and_then(|p| p.checked_mul(Decimal::from(quantity)))
        .ok_or_else(|| {
            RentalError::Validation(format!(
                "price of {} per day for {} days x {} is out of range",
                price_per_day, days, quantity
            ))
        })
}

/// Sum of line subtotals, refusing totals that overflow.
pub fn total_price<'a>(subtotals: impl IntoIterator<Item = &'a Decimal>) -> Result<Decimal, RentalError> {
    subtotals
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, s| acc.checked_add(*s))
        .ok_or_else(|| RentalError::Validation("booking total is out of range".to_string()))
}

/// Highest quantity reserved on any single day of `range`.
pub fn peak_reserved<'a>(
    reservations: impl IntoIterator<Item = &'a Reservation>,
    range: &DateRange,
) -> u32 {
    let mut deltas: BTreeMap<NaiveDate, i64> = BTreeMap::new();
    for r in reservations {
        if let Some(clipped) = r.range().clip(range) {
            *deltas.entry(clipped.start).or_default() += i64::from(r.quantity);
            *deltas.entry(clipped.end).or_default() -= i64::from(r.quantity);
        }
    }

    let mut running = 0i64;
    let mut peak = 0i64;
    for delta in deltas.values() {
        running += delta;
        peak = peak.max(running);
    }
    peak.max(0) as u32
}

/// Units of `item` still free on every day of `range`.
pub fn remaining<'a>(
    item: &InventoryItem,
    reservations: impl IntoIterator<Item = &'a Reservation>,
    range: &DateRange,
) -> u32 {
    item.total_quantity
        .saturating_sub(peak_reserved(reservations, range))
}

/// Verify that `requested` (all for `item`) fits alongside `existing`.
///
/// Requested reservations are summed, so two lines of one booking for the same item are
/// checked together. Days outside the requested ranges are ignored even if existing
/// reservations already exceed stock there.
pub fn check_item(
    item: &InventoryItem,
    existing: &[Reservation],
    requested: &[Reservation],
) -> Result<(), RentalError> {
    if !item.is_active() {
        return Err(RentalError::ItemUnavailable(item.name.clone()));
    }

    // (existing, requested) quantity deltas per boundary date.
    let mut deltas: BTreeMap<NaiveDate, (i64, i64)> = BTreeMap::new();
    for r in existing.iter().filter(|r| r.item_id == item.id) {
        deltas.entry(r.start_date).or_default().0 += i64::from(r.quantity);
        deltas.entry(r.end_date).or_default().0 -= i64::from(r.quantity);
    }
    for r in requested {
        deltas.entry(r.start_date).or_default().1 += i64::from(r.quantity);
        deltas.entry(r.end_date).or_default().1 -= i64::from(r.quantity);
    }

    let total = i64::from(item.total_quantity);
    let (mut reserved, mut wanted) = (0i64, 0i64);
    for (date, (d_reserved, d_wanted)) in deltas {
        reserved += d_reserved;
        wanted += d_wanted;
        if wanted > 0 && reserved + wanted > total {
            return Err(RentalError::InsufficientAvailability {
                item_id: item.id.clone(),
                name: item.name.clone(),
                date,
                requested: wanted as u32,
                available: (total - reserved).max(0) as u32,
            });
        }
    }
    Ok(())
}

/// Per-item reservations for a package: each component × its quantity × `units`.
pub fn expand_package(
    package: &Package,
    units: u32,
    range: &DateRange,
) -> Result<Vec<Reservation>, RentalError> {
    package
        .components
        .iter()
        .map(|c| {
            let quantity = c.quantity.checked_mul(units).ok_or_else(|| {
                RentalError::Validation(format!(
                    "{} units of {} exceed the reservable quantity",
                    units, package.name
                ))
            })?;
            Ok(Reservation {
                item_id: c.item_id.clone(),
                quantity,
                start_date: range.start,
                end_date: range.end,
            })
        })
        .collect()
}

/// A priced line plus the reservations it needs.
pub struct PricedLine {
    pub line: BookingLine,
    pub reservations: Vec<Reservation>,
}

pub fn price_item_line(
    item: &InventoryItem,
    quantity: u32,
    range: DateRange,
) -> Result<PricedLine, RentalError> {
    let days = range.days();
    Ok(PricedLine {
        line: BookingLine {
            target: LineTarget::Item {
                item_id: item.id.clone(),
            },
            name: item.name.clone(),
            quantity,
            start_date: range.start,
            end_date: range.end,
            days,
            price_per_day: item.price_per_day,
            subtotal: line_price(item.price_per_day, days, quantity)?,
        },
        reservations: vec![Reservation {
            item_id: item.id.clone(),
            quantity,
            start_date: range.start,
            end_date: range.end,
        }],
    })
}

pub fn price_package_line(
    package: &Package,
    quantity: u32,
    range: DateRange,
) -> Result<PricedLine, RentalError> {
    let days = range.days();
    Ok(PricedLine {
        line: BookingLine {
            target: LineTarget::Package {
                package_id: package.id.clone(),
            },
            name: package.name.clone(),
            quantity,
            start_date: range.start,
            end_date: range.end,
            days,
            price_per_day: package.price_per_day,
            subtotal: line_price(package.price_per_day, days, quantity)?,
        },
        reservations: expand_package(package, quantity, &range)?,
    })
}

/// Smallest range covering every reservation in `reservations`, which must be non-empty.
pub fn span(reservations: &[Reservation]) -> DateRange {
    let start = reservations.iter().map(|r| r.start_date).min();
    let end = reservations.iter().map(|r| r.end_date).max();
    match (start, end) {
        (Some(start), Some(end)) => DateRange { start, end },
        _ => DateRange {
            start: NaiveDate::MIN,
            end: NaiveDate::MIN,
        },
    }
}

/// Group reservations by item id.
pub fn by_item(reservations: &[Reservation]) -> BTreeMap<&str, Vec<Reservation>> {
    let mut grouped: BTreeMap<&str, Vec<Reservation>> = BTreeMap::new();
    for r in reservations {
        grouped.entry(r.item_id.as_str()).or_default().push(r.clone());
    }
    grouped
}
