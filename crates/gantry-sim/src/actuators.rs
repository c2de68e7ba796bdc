//! Actuator ports.
//!
//! A motor is a sensor+actuator pair on a joint axis: `act()` reads the
//! current joint position and velocity, computes a drive velocity from the
//! setpoint, and hands the command to the backend joint's motor row. The
//! step driver calls `act()` on every port before collision detection.
//!
//! User input ports are passive actuators: an externally settable value a
//! controller reads back, clamped to the declared range.

use gantry_phys::World;
use gantry_types::JointHandle;

/// Controller state of a motor port.
#[derive(Debug, Clone)]
pub enum MotorController {
    /// PD(+I) position servo.
    Servo {
        /// Proportional gain.
        p: f64,
        /// Integral gain.
        i: f64,
        /// Derivative gain.
        d: f64,
        /// Integral accumulator.
        integral: f64,
        /// Error of the previous step, for the derivative term.
        last_error: f64,
    },
    /// Direct velocity servo.
    Velocity,
    /// Second-order lag (PT2) position servo: the setpoint is filtered
    /// through a damped second-order system before a stiff velocity
    /// follow-up.
    Pt2 {
        /// Time constant.
        t: f64,
        /// Damping ratio.
        d: f64,
        /// Gain.
        k: f64,
        /// Filter position state.
        state: f64,
        /// Filter velocity state.
        state_velocity: f64,
    },
}

/// A motor port on a joint.
#[derive(Debug, Clone)]
pub struct MotorPort {
    /// Port name (the motor element's name), for controller lookups.
    pub name: Option<String>,
    /// The driven joint.
    pub joint: JointHandle,
    /// Desired position (servo, PT2) or velocity (velocity motor).
    pub setpoint: f64,
    /// Velocity ceiling of the drive.
    pub max_velocity: f64,
    /// Force/torque ceiling of the drive.
    pub max_force: f64,
    controller: MotorController,
}

impl MotorPort {
    /// Create a motor port.
    #[must_use]
    pub fn new(
        name: Option<String>,
        joint: JointHandle,
        max_velocity: f64,
        max_force: f64,
        controller: MotorController,
    ) -> Self {
        Self {
            name,
            joint,
            setpoint: 0.0,
            max_velocity,
            max_force,
            controller,
        }
    }

    /// Set the target position (servo, PT2) or velocity (velocity motor).
    pub fn set_setpoint(&mut self, setpoint: f64) {
        self.setpoint = setpoint;
    }

    /// Sensor side: current joint position.
    #[must_use]
    pub fn position(&self, world: &World) -> f64 {
        world.joint_position(self.joint)
    }

    /// Sensor side: current joint velocity.
    #[must_use]
    pub fn velocity(&self, world: &World) -> f64 {
        world.joint_velocity(self.joint)
    }

    /// Compute the drive command from the sensed state and hand it to the
    /// backend joint.
    pub fn act(&mut self, world: &mut World, dt: f64) {
        let position = world.joint_position(self.joint);
        let command = match &mut self.controller {
            MotorController::Servo {
                p,
                i,
                d,
                integral,
                last_error,
            } => {
                let error = self.setpoint - position;
                *integral += error * dt;
                let derivative = (error - *last_error) / dt;
                *last_error = error;
                *p * error + *i * *integral + *d * derivative
            }
            MotorController::Velocity => self.setpoint,
            MotorController::Pt2 {
                t,
                d,
                k,
                state,
                state_velocity,
            } => {
                // x'' = (K u - x - 2 D T x') / T²
                let t2 = *t * *t;
                let accel = (*k * self.setpoint - *state - 2.0 * *d * *t * *state_velocity) / t2;
                *state_velocity += accel * dt;
                *state += *state_velocity * dt;
                (*state - position) / dt
            }
        };

        let command = command.clamp(-self.max_velocity, self.max_velocity);
        let joint = world.joint_mut(self.joint);
        joint.motor_velocity = command;
        joint.motor_max_force = self.max_force;
    }
}

/// An externally settable input port.
#[derive(Debug, Clone)]
pub struct UserInputPort {
    /// Port name.
    pub name: Option<String>,
    /// Minimum accepted value.
    pub min: f64,
    /// Maximum accepted value.
    pub max: f64,
    value: f64,
}

impl UserInputPort {
    /// Create a port with an initial value.
    #[must_use]
    pub fn new(name: Option<String>, min: f64, max: f64, default: f64) -> Self {
        Self {
            name,
            min,
            max,
            value: default.clamp(min, max),
        }
    }

    /// Current value.
    #[must_use]
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Set the value, clamped to the declared range.
    pub fn set(&mut self, value: f64) {
        self.value = value.clamp(self.min, self.max);
    }
}
