//! Core type definitions used throughout the codebase

use serde::{Deserialize, Serialize};

/// Unique identifier for agents (staff, customers, ambient NPCs, the player)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AgentId(pub u32);

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Unique identifier for drink orders
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OrderId(pub u32);

/// Simulation tick counter
pub type Tick = u64;

/// Integer grid coordinate (column, row)
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct Cell {
    pub c: i32,
    pub r: i32,
}

impl Cell {
    pub const fn new(c: i32, r: i32) -> Self {
        Self { c, r }
    }

    #[inline]
    pub fn offset(&self, dc: i32, dr: i32) -> Self {
        Self::new(self.c + dc, self.r + dr)
    }

    /// Euclidean distance in cells
    pub fn distance(&self, other: &Cell) -> f32 {
        let dc = (self.c - other.c) as f32;
        let dr = (self.r - other.r) as f32;
        (dc * dc + dr * dr).sqrt()
    }

    /// Chebyshev distance (number of king moves)
    pub fn chebyshev(&self, other: &Cell) -> i32 {
        (self.c - other.c).abs().max((self.r - other.r).abs())
    }

    /// True when the cells touch, including diagonally
    pub fn is_adjacent(&self, other: &Cell) -> bool {
        self.chebyshev(other) == 1
    }

    pub fn to_vec2(self) -> Vec2 {
        Vec2::new(self.c as f32, self.r as f32)
    }
}

impl std::fmt::Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.c, self.r)
    }
}

/// Continuous position in cell units, used for smooth sub-cell movement
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Self) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn length(&self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    pub fn normalize(&self) -> Self {
        let len = self.length();
        if len > 0.0 {
            Self::new(self.x / len, self.y / len)
        } else {
            *self
        }
    }

    /// The cell this position currently counts as standing on
    #[inline]
    pub fn to_cell(&self) -> Cell {
        Cell::new(self.x.round() as i32, self.y.round() as i32)
    }
}

impl std::ops::Add for Vec2 {
    type Output = Self;
    fn add(self, other: Self) -> Self {
        Self::new(self.x + other.x, self.y + other.y)
    }
}

impl std::ops::Sub for Vec2 {
    type Output = Self;
    fn sub(self, other: Self) -> Self {
        Self::new(self.x - other.x, self.y - other.y)
    }
}

impl std::ops::Mul<f32> for Vec2 {
    type Output = Self;
    fn mul(self, scalar: f32) -> Self {
        Self::new(self.x * scalar, self.y * scalar)
    }
}

/// A countdown measured in ticks.
///
/// `tick` decrements once per call and reports completion when the count
/// reaches zero. A countdown that is already at zero completes immediately.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Countdown(pub u32);

impl Countdown {
    pub fn new(ticks: u32) -> Self {
        Self(ticks)
    }

    /// Advance one tick. Returns true once the countdown has elapsed.
    pub fn tick(&mut self) -> bool {
        if self.0 == 0 {
            return true;
        }
        self.0 -= 1;
        self.0 == 0
    }

    pub fn remaining(&self) -> u32 {
        self.0
    }

    pub fn is_done(&self) -> bool {
        self.0 == 0
    }
}
