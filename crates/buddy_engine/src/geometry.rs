use std::ops::{Add, Mul, Sub};

/// Arena-local point or vector. `y` grows upward.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };
    pub const ONE: Self = Self { x: 1.0, y: 1.0 };
    pub const RIGHT: Self = Self { x: 1.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn length_squared(self) -> f32 {
        self.x * self.x + self.y * self.y
    }

    pub fn length(self) -> f32 {
        self.length_squared().sqrt()
    }

    pub fn distance(self, other: Self) -> f32 {
        (other - self).length()
    }

    /// Steps toward `target` by at most `max_delta`, landing exactly on it
    /// when the remaining distance is shorter than the step.
    pub fn move_towards(self, target: Self, max_delta: f32) -> Self {
        let delta = target - self;
        let distance_sq = delta.length_squared();
        if distance_sq == 0.0 || (max_delta >= 0.0 && distance_sq <= max_delta * max_delta) {
            return target;
        }

        let inv_distance = distance_sq.sqrt().recip();
        Self {
            x: self.x + delta.x * inv_distance * max_delta,
            y: self.y + delta.y * inv_distance * max_delta,
        }
    }
}

impl Add for Vec2 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Vec2 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f32> for Vec2 {
    type Output = Self;

    fn mul(self, rhs: f32) -> Self {
        Self::new(self.x * rhs, self.y * rhs)
    }
}

/// Axis-aligned rectangle in arena space. `top >= bottom` since `y` grows upward.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rect {
    pub left: f32,
    pub right: f32,
    pub bottom: f32,
    pub top: f32,
}

impl Rect {
    pub const fn new(left: f32, right: f32, bottom: f32, top: f32) -> Self {
        Self {
            left,
            right,
            bottom,
            top,
        }
    }

    /// Rectangle whose bottom-left corner sits at `(x, y)`.
    pub fn from_origin_size(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self::new(x, x + width, y, y + height)
    }

    pub fn from_center_half_extents(center: Vec2, half_extents: Vec2) -> Self {
        Self::new(
            center.x - half_extents.x,
            center.x + half_extents.x,
            center.y - half_extents.y,
            center.y + half_extents.y,
        )
    }

    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.top - self.bottom
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(
            (self.left + self.right) * 0.5,
            (self.bottom + self.top) * 0.5,
        )
    }

    /// Strict horizontal overlap with the span `[left, right]`; touching edges do not count.
    pub fn overlaps_x(&self, left: f32, right: f32) -> bool {
        left < self.right && right > self.left
    }

    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= self.left && point.x <= self.right && point.y >= self.bottom && point.y <= self.top
    }
}
