//! The simulation step driver.
//!
//! One discrete step, in order: advance the step counter and simulated
//! time by the scene's fixed step length, run every actuator port, reset
//! per-step collision and contact counters, run collision detection
//! (rebuilding the temporary contact group), advance the solver with the
//! quick or full profile, discard the contact group, and update the
//! smoothed frame-rate estimate. Simulated time is fixed-step, never
//! wall-clock-adaptive.

use std::time::Instant;

use crate::context::Simulation;

/// Result of one simulation step.
#[derive(Debug, Clone, Copy)]
pub struct StepResult {
    /// The step counter after this step.
    pub step: u64,
    /// Simulated time after this step (s).
    pub time: f64,
    /// Geom pairs that produced contact points this step.
    pub collisions: u32,
    /// Contact constraints created this step.
    pub contacts: u32,
}

/// Smoothed steps-per-second estimate, recomputed at most every ~2 seconds
/// of wall time rather than every step.
#[derive(Debug)]
struct FrameRateEstimator {
    window_start: Instant,
    steps_in_window: u32,
    rate: f64,
}

impl FrameRateEstimator {
    const WINDOW_SECONDS: f64 = 2.0;

    fn new() -> Self {
        Self {
            window_start: Instant::now(),
            steps_in_window: 0,
            rate: 0.0,
        }
    }

    fn tick(&mut self) {
        self.steps_in_window += 1;
        let elapsed = self.window_start.elapsed().as_secs_f64();
        if elapsed >= Self::WINDOW_SECONDS {
            let sample = f64::from(self.steps_in_window) / elapsed;
            self.rate = if self.rate == 0.0 {
                sample
            } else {
                0.5 * (self.rate + sample)
            };
            self.window_start = Instant::now();
            self.steps_in_window = 0;
        }
    }
}

/// Drives a [`Simulation`] one fixed step at a time.
#[derive(Debug)]
pub struct Stepper {
    frame_rate: FrameRateEstimator,
}

impl Default for Stepper {
    fn default() -> Self {
        Self::new()
    }
}

impl Stepper {
    /// Create a stepper.
    #[must_use]
    pub fn new() -> Self {
        Self {
            frame_rate: FrameRateEstimator::new(),
        }
    }

    /// Execute one simulation step.
    ///
    /// # Errors
    ///
    /// Returns an error if the solver detects divergent (non-finite) body
    /// state.
    pub fn step(&mut self, sim: &mut Simulation) -> gantry_types::Result<StepResult> {
        // 1. Step counter and simulated time.
        sim.advance_counters();
        let dt = sim.step_config.step_length;

        // 2. Actuators run before collision detection.
        for motor in &mut sim.motors {
            motor.act(&mut sim.world, dt);
        }

        // 3. Per-step counters recount from zero.
        for sensor in &mut sim.sensors {
            sensor.begin_step();
        }

        // 4. Collision detection rebuilds the contact group and fires
        //    observers; this also resets the collision/contact counters.
        let body_collisions = sim.body_collisions;
        sim.world.collide(body_collisions);
        let collisions = sim.world.collision_count();
        let contacts = sim.world.contact_count();

        // 5-6. Solver step; the contact group does not survive it.
        let profile = sim.solver_profile();
        sim.world.step(dt, profile)?;

        // Sensors with per-step history (accelerometers) sample now.
        for sensor in &mut sim.sensors {
            sensor.update(&sim.world, dt);
        }

        // 7. Smoothed frame rate, recomputed on a wall-clock window.
        self.frame_rate.tick();

        Ok(StepResult {
            step: sim.step_count(),
            time: sim.time(),
            collisions,
            contacts,
        })
    }

    /// Run a fixed number of steps.
    ///
    /// # Errors
    ///
    /// Returns the first step error encountered.
    pub fn run(&mut self, sim: &mut Simulation, steps: u64) -> gantry_types::Result<StepResult> {
        let mut last = StepResult {
            step: sim.step_count(),
            time: sim.time(),
            collisions: 0,
            contacts: 0,
        };
        for _ in 0..steps {
            last = self.step(sim)?;
        }
        Ok(last)
    }

    /// The smoothed steps-per-second estimate; zero until the first
    /// two-second window has elapsed.
    #[must_use]
    pub fn frame_rate(&self) -> f64 {
        self.frame_rate.rate
    }
}
