//! Drink orders, the bar's cash ledger, and the claim sites
//!
//! Every "take this if nobody else has" decision in the tavern goes through
//! one of the `claim_*` functions below. The simulation is single-threaded, so
//! check-then-set is enough; these are the places a concurrent port would need
//! real synchronization.

use std::collections::{BTreeMap, VecDeque};

use serde::Serialize;

use crate::behavior::customer::CustomerState;
use crate::core::error::{Result, TavernError};
use crate::core::types::{AgentId, Cell, OrderId, Tick};
use crate::entity::agent::Agent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum OrderStatus {
    Pending,
    Preparing,
    Ready,
    Delivered,
}

impl OrderStatus {
    /// The only status an order may move to from this one
    pub fn next(self) -> Option<Self> {
        match self {
            OrderStatus::Pending => Some(OrderStatus::Preparing),
            OrderStatus::Preparing => Some(OrderStatus::Ready),
            OrderStatus::Ready => Some(OrderStatus::Delivered),
            OrderStatus::Delivered => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Order {
    pub id: OrderId,
    pub customer: AgentId,
    /// Waiter responsible for the order. Changes only if the first waiter
    /// gave up and another one picked the drink up.
    pub waiter: AgentId,
    pub bartender: Option<AgentId>,
    pub status: OrderStatus,
    pub price: u32,
    pub created_at: Tick,
    /// The slip reached the bar and the ledger was credited
    pub handed_in: bool,
}

/// How many delivered orders the book remembers
pub const RECENT_DELIVERED: usize = 32;

/// Orders by stage.
///
/// `pending` holds orders still in a waiter's notebook, `counter` holds orders
/// handed in at the bar. Bartenders may start on either, so a drink can be on
/// the rail before its slip is handed in; `handed_in` tracks payment
/// separately from the stage. Delivered orders are counted, and only the
/// last [`RECENT_DELIVERED`] are kept.
#[derive(Debug, Clone, Default, Serialize)]
pub struct OrderBook {
    pending: Vec<Order>,
    counter: Vec<Order>,
    ready: Vec<Order>,
    recent_delivered: VecDeque<Order>,
    delivered_count: usize,
    next_id: u32,
}

impl OrderBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new order and return its id
    pub fn place(&mut self, customer: AgentId, waiter: AgentId, price: u32, now: Tick) -> OrderId {
        self.next_id += 1;
        let id = OrderId(self.next_id);
        self.pending.push(Order {
            id,
            customer,
            waiter,
            bartender: None,
            status: OrderStatus::Pending,
            price,
            created_at: now,
            handed_in: false,
        });
        id
    }

    pub fn pending(&self) -> &[Order] {
        &self.pending
    }

    pub fn counter(&self) -> &[Order] {
        &self.counter
    }

    pub fn ready(&self) -> &[Order] {
        &self.ready
    }

    /// Orders delivered since the tavern opened
    pub fn delivered_count(&self) -> usize {
        self.delivered_count
    }

    /// The most recent deliveries, oldest first
    pub fn recently_delivered(&self) -> impl Iterator<Item = &Order> {
        self.recent_delivered.iter()
    }

    /// Orders that still need a bartender's attention, oldest first
    pub fn open_orders(&self) -> impl Iterator<Item = &Order> {
        self.pending.iter().chain(self.counter.iter())
    }

    pub fn has_unclaimed(&self) -> bool {
        self.open_orders()
            .any(|o| o.status == OrderStatus::Pending && o.bartender.is_none())
    }

    pub fn find(&self, id: OrderId) -> Option<&Order> {
        self.pending
            .iter()
            .chain(&self.counter)
            .chain(&self.ready)
            .chain(&self.recent_delivered)
            .find(|o| o.id == id)
    }

    fn find_mut(&mut self, id: OrderId) -> Option<&mut Order> {
        self.pending
            .iter_mut()
            .chain(self.counter.iter_mut())
            .chain(self.ready.iter_mut())
            .chain(self.recent_delivered.iter_mut())
            .find(|o| o.id == id)
    }

    /// Move an order one step forward. Backward or skipping moves are refused.
    pub fn advance(&mut self, id: OrderId, to: OrderStatus) -> Result<()> {
        let order = self.find_mut(id).ok_or(TavernError::OrderNotFound(id))?;
        if order.status.next() != Some(to) {
            return Err(TavernError::InvalidTransition {
                order: id,
                from: order.status,
                to,
            });
        }
        order.status = to;
        Ok(())
    }

    /// A waiter reached the bar with the slip. Returns the price to credit.
    ///
    /// Works at any stage before delivery, since the bartender may already
    /// have the drink on the rail. Each order pays exactly once.
    pub fn hand_in(&mut self, id: OrderId) -> Result<u32> {
        let order = self
            .pending
            .iter_mut()
            .chain(self.counter.iter_mut())
            .chain(self.ready.iter_mut())
            .find(|o| o.id == id)
            .ok_or(TavernError::OrderNotFound(id))?;
        if order.handed_in {
            return Err(TavernError::AlreadyHandedIn(id));
        }
        order.handed_in = true;
        let price = order.price;
        if let Some(order) = take(&mut self.pending, id) {
            self.counter.push(order);
        }
        Ok(price)
    }

    /// Bartender finished: the drink leaves pending/counter and waits on the rail
    pub fn publish_ready(&mut self, id: OrderId) -> Result<()> {
        self.advance(id, OrderStatus::Ready)?;
        let order = take(&mut self.pending, id)
            .or_else(|| take(&mut self.counter, id))
            .ok_or(TavernError::OrderNotFound(id))?;
        self.ready.push(order);
        Ok(())
    }

    /// Drink handed to the customer
    pub fn deliver(&mut self, id: OrderId) -> Result<Order> {
        self.advance(id, OrderStatus::Delivered)?;
        let order = take(&mut self.ready, id).ok_or(TavernError::OrderNotFound(id))?;
        self.delivered_count += 1;
        if self.recent_delivered.len() == RECENT_DELIVERED {
            self.recent_delivered.pop_front();
        }
        self.recent_delivered.push_back(order.clone());
        Ok(order)
    }

    /// Undo a bartender's claim that never turned into preparation
    pub fn release_bartender(&mut self, id: OrderId) {
        if let Some(order) = self.find_mut(id) {
            if order.status == OrderStatus::Pending {
                order.bartender = None;
            }
        }
    }
}

fn take(orders: &mut Vec<Order>, id: OrderId) -> Option<Order> {
    let pos = orders.iter().position(|o| o.id == id)?;
    Some(orders.remove(pos))
}

/// Revenue per bar service position
#[derive(Debug, Clone, Default, Serialize)]
pub struct CashLedger {
    by_position: BTreeMap<Cell, u64>,
}

impl CashLedger {
    pub fn credit(&mut self, position: Cell, amount: u32) {
        *self.by_position.entry(position).or_insert(0) += amount as u64;
    }

    pub fn at(&self, position: Cell) -> u64 {
        self.by_position.get(&position).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.by_position.values().sum()
    }

    pub fn entries(&self) -> impl Iterator<Item = (Cell, u64)> + '_ {
        self.by_position.iter().map(|(&c, &v)| (c, v))
    }
}

/// Claim the first customer waiting for a waiter that nobody has claimed yet
pub fn claim_customer(agents: &mut [Agent], waiter: AgentId) -> Option<AgentId> {
    for agent in agents.iter_mut() {
        let id = agent.id;
        if let Some(mind) = agent.customer_mut() {
            if mind.state == CustomerState::WaitingForWaiter && mind.claimed_by.is_none() {
                mind.claimed_by = Some(waiter);
                return Some(id);
            }
        }
    }
    None
}

/// Claim the oldest open order without a bartender
pub fn claim_order_for_bartender(book: &mut OrderBook, bartender: AgentId) -> Option<OrderId> {
    let id = book
        .open_orders()
        .filter(|o| o.status == OrderStatus::Pending && o.bartender.is_none())
        .min_by_key(|o| (o.created_at, o.id))
        .map(|o| o.id)?;
    let order = book.find_mut(id)?;
    order.bartender = Some(bartender);
    Some(id)
}

/// Claim the oldest ready drink whose customer is free or already ours.
/// The customer claim doubles as the lock on the drink.
pub fn claim_ready_order(
    book: &mut OrderBook,
    agents: &mut [Agent],
    waiter: AgentId,
) -> Option<OrderId> {
    let mut ready: Vec<(Tick, OrderId, AgentId)> = book
        .ready
        .iter()
        .map(|o| (o.created_at, o.id, o.customer))
        .collect();
    ready.sort();

    for (_, order_id, customer_id) in ready {
        let Some(mind) = agents
            .iter_mut()
            .find(|a| a.id == customer_id)
            .and_then(|a| a.customer_mut())
        else {
            continue;
        };
        if mind.claimed_by.map_or(true, |w| w == waiter) {
            mind.claimed_by = Some(waiter);
            if let Some(order) = book.find_mut(order_id) {
                order.waiter = waiter;
            }
            return Some(order_id);
        }
    }
    None
}
