use crate::geometry::Vec2;

/// Cosmetic stretch-and-recover scale. Never read by the movement code.
#[derive(Debug, Clone)]
pub struct SquishAnimator {
    stretch: f32,
    compress: f32,
    recovery_seconds: f32,
    remaining_seconds: f32,
    direction: Vec2,
    scale: Vec2,
}

impl SquishAnimator {
    pub fn new(stretch: f32, compress: f32, recovery_seconds: f32) -> Self {
        Self {
            stretch,
            compress,
            recovery_seconds,
            remaining_seconds: 0.0,
            direction: Vec2::RIGHT,
            scale: Vec2::ONE,
        }
    }

    /// Restarts the recovery timer for a move along `direction`.
    pub fn start(&mut self, direction: Vec2) {
        self.direction = direction;
        self.remaining_seconds = self.recovery_seconds;
    }

    pub fn tick(&mut self, dt: f32) -> Vec2 {
        if self.remaining_seconds <= 0.0 {
            return self.scale;
        }

        self.remaining_seconds -= dt;
        if self.remaining_seconds <= 0.0 {
            self.reset();
            return self.scale;
        }

        let progress = 1.0 - (self.remaining_seconds / self.recovery_seconds).clamp(0.0, 1.0);
        let eased = smoothstep(progress);
        let stretch = lerp(self.stretch, 1.0, eased);
        let compress = lerp(self.compress, 1.0, eased);
        self.scale = if self.direction.x.abs() >= self.direction.y.abs() {
            Vec2::new(stretch, compress)
        } else {
            Vec2::new(compress, stretch)
        };
        self.scale
    }

    /// Snaps to neutral scale and cancels any running recovery.
    pub fn reset(&mut self) {
        self.remaining_seconds = 0.0;
        self.scale = Vec2::ONE;
    }

    pub fn scale(&self) -> Vec2 {
        self.scale
    }

    #[cfg(test)]
    fn is_active(&self) -> bool {
        self.remaining_seconds > 0.0
    }
}

fn smoothstep(t: f32) -> f32 {
    t * t * (3.0 - 2.0 * t)
}

fn lerp(from: f32, to: f32, t: f32) -> f32 {
    from + (to - from) * t
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() <= 1.0e-5
    }

    #[test]
    fn idle_animator_is_neutral() {
        let mut squish = SquishAnimator::new(1.15, 0.85, 0.25);
        assert_eq!(squish.tick(0.1), Vec2::ONE);
        assert!(!squish.is_active());
    }

    #[test]
    fn horizontal_move_stretches_x() {
        let mut squish = SquishAnimator::new(1.2, 0.8, 1.0);
        squish.start(Vec2::RIGHT);
        let scale = squish.tick(0.5);
        // t = 0.5 eases to 0.5.
        assert!(approx_eq(scale.x, 1.1));
        assert!(approx_eq(scale.y, 0.9));
    }

    #[test]
    fn vertical_move_stretches_y() {
        let mut squish = SquishAnimator::new(1.2, 0.8, 1.0);
        squish.start(Vec2::new(0.1, -0.99));
        let scale = squish.tick(0.25);
        // t = 0.25 eases to 0.15625.
        assert!(approx_eq(scale.y, 1.2 - 0.2 * 0.15625));
        assert!(approx_eq(scale.x, 0.8 + 0.2 * 0.15625));
    }

    #[test]
    fn expiry_snaps_to_neutral() {
        let mut squish = SquishAnimator::new(1.15, 0.85, 0.25);
        squish.start(Vec2::RIGHT);
        squish.tick(0.1);
        assert_ne!(squish.scale(), Vec2::ONE);
        assert_eq!(squish.tick(0.2), Vec2::ONE);
        assert!(!squish.is_active());
    }

    #[test]
    fn reset_cancels_recovery() {
        let mut squish = SquishAnimator::new(1.15, 0.85, 0.25);
        squish.start(Vec2::RIGHT);
        squish.tick(0.05);
        squish.reset();
        assert_eq!(squish.scale(), Vec2::ONE);
        assert_eq!(squish.tick(0.05), Vec2::ONE);
    }

    #[test]
    fn zero_recovery_never_squishes() {
        let mut squish = SquishAnimator::new(1.15, 0.85, 0.0);
        squish.start(Vec2::RIGHT);
        assert!(!squish.is_active());
        assert_eq!(squish.tick(0.016), Vec2::ONE);
    }
}
