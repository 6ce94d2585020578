//! Waiter state machine
//!
//! Idle → GoingToCustomer → TakingOrder → GoingToBar → Idle
//! Idle → WaitingForDrink → DeliveringDrink → Idle
//!
//! Ready drinks take priority over new orders. A waiter keeps its claim on a
//! customer from taking the order until the drink is delivered.

use rand::Rng;
use serde::Serialize;

use crate::behavior::customer::CustomerState;
use crate::behavior::{at_bar, go_to_bar, nearest_service_cell, random_free_cell, within_reach};
use crate::behavior::{RetryStep, RouteRetry};
use crate::core::config::{random_ticks, secs_to_ticks};
use crate::core::types::{AgentId, Cell, Countdown, OrderId};
use crate::entity::agent::Motion;
use crate::simulation::orders::{claim_customer, claim_ready_order, OrderStatus};
use crate::simulation::tick::SimulationEvent;
use crate::simulation::world::World;
use crate::spatial::grid::WalkPolicy;
use crate::spatial::layout::WANDER_ZONES;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum WaiterState {
    Idle,
    GoingToCustomer,
    TakingOrder,
    GoingToBar,
    /// Walking to the bar to collect a ready drink
    WaitingForDrink,
    DeliveringDrink,
}

#[derive(Debug, Clone)]
pub struct WaiterMind {
    pub state: WaiterState,
    pub timer: Countdown,
    pub customer: Option<AgentId>,
    pub order: Option<OrderId>,
    pub idle_ticks: u32,
    /// Index into [`WANDER_ZONES`] for idle walks
    pub zone: usize,
    pub retry: RouteRetry,
}

impl WaiterMind {
    pub fn new(zone: usize) -> Self {
        Self {
            state: WaiterState::Idle,
            timer: Countdown::default(),
            customer: None,
            order: None,
            idle_ticks: 0,
            zone: zone % WANDER_ZONES.len(),
            retry: RouteRetry::default(),
        }
    }
}

pub fn update(id: AgentId, mind: &mut WaiterMind, motion: &mut Motion, world: &mut World) {
    let before = mind.state;
    match mind.state {
        WaiterState::Idle => update_idle(id, mind, motion, world),
        WaiterState::GoingToCustomer => update_going_to_customer(id, mind, motion, world),
        WaiterState::TakingOrder => update_taking_order(id, mind, motion, world),
        WaiterState::GoingToBar => update_going_to_bar(id, mind, motion, world),
        WaiterState::WaitingForDrink => update_collecting(id, mind, motion, world),
        WaiterState::DeliveringDrink => update_delivering(id, mind, motion, world),
    }
    if mind.state != before {
        tracing::debug!(id = %id, from = ?before, to = ?mind.state, "Waiter state change");
    }
}

fn customer_cell(world: &World, customer: AgentId) -> Option<Cell> {
    world.agent(customer).map(|a| a.cell())
}

fn customer_state(world: &World, customer: AgentId) -> Option<CustomerState> {
    world.agent(customer).and_then(|a| a.customer()).map(|m| m.state)
}

/// Drop our claim on a customer, if we still hold it
fn release_customer(id: AgentId, customer: AgentId, world: &mut World) {
    if let Some(mind) = world.agent_mut(customer).and_then(|a| a.customer_mut()) {
        if mind.claimed_by == Some(id) {
            mind.claimed_by = None;
        }
    }
}

fn go_idle(mind: &mut WaiterMind, motion: &mut Motion) {
    mind.state = WaiterState::Idle;
    mind.customer = None;
    mind.order = None;
    mind.idle_ticks = 0;
    mind.retry.reset();
    motion.stop();
}

fn update_idle(id: AgentId, mind: &mut WaiterMind, motion: &mut Motion, world: &mut World) {
    if let Some(order_id) = claim_ready_order(&mut world.orders, &mut world.agents, id) {
        mind.order = Some(order_id);
        mind.customer = world.orders.find(order_id).map(|o| o.customer);
        mind.state = WaiterState::WaitingForDrink;
        mind.retry.reset();
        go_to_bar(motion, world);
        return;
    }

    if let Some(customer) = claim_customer(&mut world.agents, id) {
        mind.customer = Some(customer);
        mind.state = WaiterState::GoingToCustomer;
        mind.retry.reset();
        if let Some(cell) = customer_cell(world, customer) {
            world.plan_next_to(motion, cell);
        }
        return;
    }

    mind.idle_ticks += 1;
    if !motion.is_moving() && mind.idle_ticks >= secs_to_ticks(world.config.waiter_idle_wander_secs) {
        mind.idle_ticks = 0;
        if let Some(cell) = random_free_cell(world, &WANDER_ZONES[mind.zone], WalkPolicy::Standard) {
            world.plan_route(motion, cell);
        }
    }
}

fn update_going_to_customer(id: AgentId, mind: &mut WaiterMind, motion: &mut Motion, world: &mut World) {
    let Some(customer) = mind.customer else {
        go_idle(mind, motion);
        return;
    };
    let still_waiting = customer_state(world, customer) == Some(CustomerState::WaitingForWaiter);
    let (Some(cell), true) = (customer_cell(world, customer), still_waiting) else {
        release_customer(id, customer, world);
        go_idle(mind, motion);
        return;
    };

    if motion.is_moving() {
        return;
    }
    if within_reach(motion, cell) {
        if let Some(c) = world.agent_mut(customer).and_then(|a| a.customer_mut()) {
            c.state = CustomerState::Ordering;
        }
        world.emit(SimulationEvent::CustomerStateChanged {
            id: customer,
            from: CustomerState::WaitingForWaiter,
            to: CustomerState::Ordering,
        });
        mind.retry.reset();
        mind.timer = Countdown::new(secs_to_ticks(world.config.taking_order_secs));
        mind.state = WaiterState::TakingOrder;
        return;
    }

    match mind.retry.poll(world.config.max_route_retries) {
        RetryStep::Wait => {}
        RetryStep::Retry => {
            world.plan_next_to(motion, cell);
        }
        RetryStep::GiveUp => {
            tracing::warn!(id = %id, customer = %customer, "Waiter could not reach customer");
            release_customer(id, customer, world);
            go_idle(mind, motion);
        }
    }
}

fn update_taking_order(id: AgentId, mind: &mut WaiterMind, motion: &mut Motion, world: &mut World) {
    let Some(customer) = mind.customer else {
        go_idle(mind, motion);
        return;
    };
    if customer_state(world, customer) != Some(CustomerState::Ordering) {
        release_customer(id, customer, world);
        go_idle(mind, motion);
        return;
    }
    if !mind.timer.tick() {
        return;
    }

    let (lo, hi) = world.config.price_range;
    let price = world.rng.gen_range(lo..=hi);
    let order = world.orders.place(customer, id, price, world.tick);
    if let Some(c) = world.agent_mut(customer).and_then(|a| a.customer_mut()) {
        c.state = CustomerState::WaitingDrink;
        c.order = Some(order);
    }
    world.emit(SimulationEvent::CustomerStateChanged {
        id: customer,
        from: CustomerState::Ordering,
        to: CustomerState::WaitingDrink,
    });
    world.emit(SimulationEvent::OrderPlaced {
        order,
        customer,
        waiter: id,
        price,
    });
    tracing::debug!(waiter = %id, customer = %customer, ?order, price, "Order taken");

    mind.order = Some(order);
    mind.state = WaiterState::GoingToBar;
    mind.retry.reset();
    go_to_bar(motion, world);
}

/// Hand the slip in at the nearest service position and credit the ledger.
/// The bartender may already be done with the drink; the order pays once
/// regardless.
fn hand_in_slip(id: AgentId, order: OrderId, motion: &Motion, world: &mut World) {
    let position = nearest_service_cell(motion.cell());
    match world.orders.hand_in(order) {
        Ok(price) => {
            world.ledger.credit(position, price);
            world.emit(SimulationEvent::OrderHandedIn {
                order,
                waiter: id,
                position,
                price,
            });
        }
        Err(err) => tracing::debug!(waiter = %id, %err, "Slip not handed in"),
    }
}

fn update_going_to_bar(id: AgentId, mind: &mut WaiterMind, motion: &mut Motion, world: &mut World) {
    let Some(order) = mind.order else {
        go_idle(mind, motion);
        return;
    };
    if motion.is_moving() {
        return;
    }

    if at_bar(motion) {
        hand_in_slip(id, order, motion, world);
        go_idle(mind, motion);
        return;
    }

    match mind.retry.poll(world.config.max_route_retries) {
        RetryStep::Wait => {}
        RetryStep::Retry => {
            go_to_bar(motion, world);
        }
        RetryStep::GiveUp => {
            // The order stays open for the bartenders; someone else can deliver it
            tracing::warn!(waiter = %id, ?order, "Waiter could not reach the bar");
            if let Some(customer) = mind.customer {
                release_customer(id, customer, world);
            }
            go_idle(mind, motion);
        }
    }
}

fn update_collecting(id: AgentId, mind: &mut WaiterMind, motion: &mut Motion, world: &mut World) {
    let (Some(order), Some(customer)) = (mind.order, mind.customer) else {
        go_idle(mind, motion);
        return;
    };
    if world.orders.find(order).map(|o| o.status) != Some(OrderStatus::Ready) {
        release_customer(id, customer, world);
        go_idle(mind, motion);
        return;
    }
    if motion.is_moving() {
        return;
    }

    if at_bar(motion) {
        // A waiter who gave up on the bar never handed this slip in
        if world.orders.find(order).is_some_and(|o| !o.handed_in) {
            hand_in_slip(id, order, motion, world);
        }
        mind.retry.reset();
        mind.state = WaiterState::DeliveringDrink;
        if let Some(cell) = customer_cell(world, customer) {
            world.plan_next_to(motion, cell);
        }
        return;
    }

    match mind.retry.poll(world.config.max_route_retries) {
        RetryStep::Wait => {}
        RetryStep::Retry => {
            go_to_bar(motion, world);
        }
        RetryStep::GiveUp => {
            tracing::warn!(waiter = %id, ?order, "Waiter could not collect drink");
            release_customer(id, customer, world);
            go_idle(mind, motion);
        }
    }
}

fn update_delivering(id: AgentId, mind: &mut WaiterMind, motion: &mut Motion, world: &mut World) {
    let (Some(order), Some(customer)) = (mind.order, mind.customer) else {
        go_idle(mind, motion);
        return;
    };
    let Some(cell) = customer_cell(world, customer) else {
        // Nobody to serve; close the order out so it does not sit on the rail
        if let Err(err) = world.orders.deliver(order) {
            tracing::debug!(waiter = %id, %err, "Orphaned order");
        }
        go_idle(mind, motion);
        return;
    };
    if motion.is_moving() {
        return;
    }

    if within_reach(motion, cell) {
        match world.orders.deliver(order) {
            Ok(_) => {
                let drink_ticks = random_ticks(&mut world.rng, world.config.drinking_secs);
                if let Some(c) = world.agent_mut(customer).and_then(|a| a.customer_mut()) {
                    c.state = CustomerState::Drinking;
                    c.timer = Countdown::new(drink_ticks);
                    c.order = None;
                    c.claimed_by = None;
                }
                world.emit(SimulationEvent::CustomerStateChanged {
                    id: customer,
                    from: CustomerState::WaitingDrink,
                    to: CustomerState::Drinking,
                });
                world.emit(SimulationEvent::OrderDelivered {
                    order,
                    customer,
                    waiter: id,
                });
                tracing::debug!(waiter = %id, customer = %customer, ?order, "Drink delivered");
            }
            Err(err) => {
                tracing::debug!(waiter = %id, %err, "Delivery failed");
                release_customer(id, customer, world);
            }
        }
        go_idle(mind, motion);
        return;
    }

    match mind.retry.poll(world.config.max_route_retries) {
        RetryStep::Wait => {}
        RetryStep::Retry => {
            world.plan_next_to(motion, cell);
        }
        RetryStep::GiveUp => {
            tracing::warn!(waiter = %id, customer = %customer, "Waiter could not reach customer with drink");
            release_customer(id, customer, world);
            go_idle(mind, motion);
        }
    }
}
