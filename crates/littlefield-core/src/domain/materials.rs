//! Raw materials ordering policy and pending order.

use serde::{Deserialize, Serialize};

/// Raw materials ordering state.
///
/// Every field is optional: the upstream omits the pending-order fields when
/// nothing is on order, and policy fields may be blank early in a run.
/// Absence is `None`, never zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MaterialsInfo {
    /// Simulated day the pending order is due to arrive.
    pub next_arrival_eta: Option<u32>,
    pub next_arrival_quantity: Option<f64>,
    pub reorder_point: Option<f64>,
    pub order_quantity: Option<f64>,
    /// Supplier lead time in days.
    pub lead_time: Option<f64>,
}

impl MaterialsInfo {
    pub fn has_pending_order(&self) -> bool {
        self.next_arrival_eta.is_some() || self.next_arrival_quantity.is_some()
    }
}
