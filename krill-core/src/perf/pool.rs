//! Pre-sized order pool
//!
//! Orders are recycled through a lock-free pool sized at startup (at
//! least 4x the maximum expected open orders). The hot path never
//! allocates; running the pool dry means the engine is leaking order
//! slots and is treated as a fatal internal error by the caller.

use crate::core::types::Order;
use crossbeam::queue::ArrayQueue;
use std::sync::Arc;

/// Sizing rule: slots per allowed open order
pub const SLOTS_PER_OPEN_ORDER: usize = 4;

/// Lock-free recycling pool for [`Order`] values
#[derive(Clone)]
pub struct OrderPool {
    slots: Arc<ArrayQueue<Order>>,
    capacity: usize,
}

impl OrderPool {
    /// Pre-allocate `capacity` order slots
    pub fn new(capacity: usize) -> Self {
        let slots = Arc::new(ArrayQueue::new(capacity));
        for _ in 0..capacity {
            let _ = slots.push(blank_order());
        }
        Self { slots, capacity }
    }

    /// Pool sized for a given open-order limit
    pub fn for_open_orders(max_open_orders: usize) -> Self {
        Self::new(max_open_orders.max(1) * SLOTS_PER_OPEN_ORDER)
    }

    /// Take a slot; `None` means the pool is exhausted
    #[inline(always)]
    pub fn acquire(&self) -> Option<Order> {
        self.slots.pop()
    }

    /// Return a slot once its order is terminal
    #[inline(always)]
    pub fn release(&self, order: Order) {
        // A full pool drops the slot; capacity was fixed at startup
        let _ = self.slots.push(order);
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn available(&self) -> usize {
        self.slots.len()
    }

    pub fn is_exhausted(&self) -> bool {
        self.slots.is_empty()
    }
}

fn blank_order() -> Order {
    use crate::core::types::{OrderType, Side, Symbol, TimeInForce};
    Order {
        client_id: crate::core::types::OrderId::new(0),
        exchange_id: None,
        symbol: Symbol::default(),
        side: Side::Buy,
        order_type: OrderType::Limit,
        tif: TimeInForce::Gtc,
        price: 0,
        quantity: 0,
        filled_qty: 0,
        status: crate::core::types::OrderStatus::Pending,
        created_ts: 0,
        updated_ts: 0,
    }
}
