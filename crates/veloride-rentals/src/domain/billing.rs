use crate::domain::types::{FeeSchedule, ZoneLabel};
use rust_decimal::Decimal;

/// Pure trip pricing.
///
/// `amount = start + floor(minutes) * minute`, plus the penalty when the
/// ride does not end at a dock (parking or charging), minus the discount
/// when it started at one of those. Never negative, never does I/O.
pub struct BillingCalculator;

impl BillingCalculator {
    pub fn compute(
        start_zone: ZoneLabel,
        end_zone: ZoneLabel,
        duration_minutes: f64,
        fee: &FeeSchedule,
    ) -> Decimal {
        let completed_minutes = Decimal::from(duration_minutes.max(0.0).floor() as i64);

        let mut amount = fee.start + completed_minutes * fee.minute;

        if !end_zone.is_dock() {
            amount += fee.penalty;
        }
        if !start_zone.is_dock() {
            amount -= fee.discount;
        }

        amount.max(Decimal::ZERO)
    }
}
