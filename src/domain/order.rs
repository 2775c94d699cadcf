use crate::common::{CustomerId, OrderId, ProductId};
use crate::error::{CoreError, Result};
use chrono::NaiveDate;
use rust_decimal::Decimal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStatus {
    Pending,
    Confirmed,
    InDelivery,
    Delivered,
    Cancelled,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentStatus {
    Unpaid,
    Paid,
    PartiallyPaid,
    Refunded,
}

#[derive(Debug, Clone)]
pub struct OrderItem {
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_price: Decimal,
}

/// An Order owns its line items (spec §3).
#[derive(Debug, Clone)]
pub struct Order {
    pub id: OrderId,
    pub order_number: String,
    pub customer_id: CustomerId,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub scheduled_date: NaiveDate,
    pub total_amount: Decimal,
    pub final_amount: Decimal,
    pub line_items: Vec<OrderItem>,
}

impl Order {
    /// Valid transitions per spec §3:
    /// `pending -> confirmed -> in_delivery -> delivered`;
    /// any non-terminal state -> `cancelled`; any state -> `failed`.
    /// Only `pending` and `confirmed` orders may still be mutated.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        if next == Failed {
            return true;
        }
        match (self.status, next) {
            (Pending, Confirmed) => true,
            (Confirmed, InDelivery) => true,
            (InDelivery, Delivered) => true,
            (s, Cancelled) => !matches!(s, Delivered | Cancelled | Failed),
            _ => false,
        }
    }

    pub fn transition_to(&mut self, next: OrderStatus) -> Result<()> {
        if !self.can_transition_to(next) {
            return Err(CoreError::validation(format!(
                "order {} cannot transition {:?} -> {:?}",
                self.id, self.status, next
            )));
        }
        self.status = next;
        Ok(())
    }

    pub fn is_mutable(&self) -> bool {
        matches!(self.status, OrderStatus::Pending | OrderStatus::Confirmed)
    }
}
