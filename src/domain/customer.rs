use crate::common::{CustomerId, LatLng};
use chrono::{NaiveTime};
use rust_decimal::Decimal;

#[derive(Debug, Clone)]
pub struct Customer {
    pub id: CustomerId,
    pub customer_code: String,
    pub name: String,
    pub address: String,
    pub location: LatLng,
    pub credit_limit: Decimal,
    pub current_balance: Decimal,
    pub is_credit_blocked: bool,
    pub is_terminated: bool,
    pub delivery_window: Option<(NaiveTime, NaiveTime)>,
}

impl Customer {
    pub fn available_credit(&self) -> Decimal {
        self.credit_limit - self.current_balance
    }

    /// Invariant (spec §3): `current_balance <= credit_limit` unless
    /// `is_credit_blocked = true` explicitly permits an override by a
    /// privileged role, which is enforced by the caller (credit check in
    /// `dispatch::credit`), not here.
    pub fn is_over_limit(&self) -> bool {
        self.current_balance > self.credit_limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn available_credit_is_limit_minus_balance() {
        let c = Customer {
            id: CustomerId::new(),
            customer_code: "C1".into(),
            name: "Test".into(),
            address: "addr".into(),
            location: LatLng::new(0.0, 0.0),
            credit_limit: Decimal::new(10000, 2),
            current_balance: Decimal::new(4000, 2),
            is_credit_blocked: false,
            is_terminated: false,
            delivery_window: None,
        };
        assert_eq!(c.available_credit(), Decimal::new(6000, 2));
        assert!(!c.is_over_limit());
    }
}
