//! End-to-end scenarios: scene description in, stepped simulation out.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use gantry_sim::{NullRenderer, SensorValue, Stepper, UsageClass, load_scene_str};

const FALLING_BALL: &str = r#"
    <Simulation>
        <Scene name="main" stepLength="0.01" gravity="-9.8">
            <Body ref="ball"/>
        </Scene>
        <Body name="ball">
            <Translation z="1m"/>
            <SphereMass name="m" value="1kg" radius="10cm"/>
            <SphereGeometry name="g" radius="10cm"/>
        </Body>
    </Simulation>
"#;

#[test]
fn falling_ball_velocity_after_100_steps() {
    let mut sim = load_scene_str(FALLING_BALL).expect("scene should load");
    let mut stepper = Stepper::new();
    for _ in 0..100 {
        stepper.step(&mut sim).expect("step should succeed");
    }

    let ball = sim.body_by_name("ball").unwrap();
    let body = sim.world.body(ball);

    // v = g * dt * steps with semi-implicit Euler and no contacts.
    assert!(
        (body.twist.linear.z + 9.8).abs() < 1e-9,
        "vz = {}",
        body.twist.linear.z
    );

    // z descends by dt² * g * (1 + 2 + ... + 100).
    let expected_drop = 9.8 * 0.01 * 0.01 * (100.0 * 101.0 / 2.0);
    assert!(
        (1.0 - body.pose.position.z - expected_drop).abs() < 1e-9,
        "z = {}",
        body.pose.position.z
    );

    assert_eq!(sim.step_count(), 100);
    assert!((sim.time() - 1.0).abs() < 1e-9);
}

#[test]
fn contacts_regenerate_every_step() {
    let source = r#"
        <Simulation>
            <Scene name="main" stepLength="0.005" gravity="-9.8">
                <Compound ref="floor"/>
                <Body ref="ball"/>
            </Scene>
            <Compound name="floor">
                <BoxGeometry name="slab" width="4" depth="4" height="1">
                    <Translation z="-0.5"/>
                </BoxGeometry>
            </Compound>
            <Body name="ball">
                <Translation z="0.08"/>
                <SphereMass name="m" value="1kg" radius="0.1"/>
                <SphereGeometry name="g" radius="0.1"/>
            </Body>
        </Simulation>
    "#;
    let mut sim = load_scene_str(source).expect("scene should load");
    let mut stepper = Stepper::new();

    // The ball starts overlapping the floor: every step must recount and
    // recreate its contacts from scratch.
    let first = stepper.step(&mut sim).expect("step should succeed");
    assert!(first.contacts > 0, "expected contacts on the first step");
    assert!(sim.world.contacts().is_empty(), "contacts must not persist");

    let second = stepper.step(&mut sim).expect("step should succeed");
    assert_eq!(second.contacts, first.contacts);
    assert_eq!(second.collisions, first.collisions);
}

#[test]
fn ball_settles_on_floor() {
    let source = r#"
        <Simulation>
            <Scene name="main" stepLength="0.005" gravity="-9.8">
                <Compound ref="floor"/>
                <Body ref="ball"/>
            </Scene>
            <Compound name="floor">
                <BoxGeometry name="slab" width="4" depth="4" height="1">
                    <Translation z="-0.5"/>
                </BoxGeometry>
            </Compound>
            <Body name="ball">
                <Translation z="0.5"/>
                <SphereMass name="m" value="1kg" radius="0.1"/>
                <SphereGeometry name="g" radius="0.1"/>
            </Body>
        </Simulation>
    "#;
    let mut sim = load_scene_str(source).expect("scene should load");
    let mut stepper = Stepper::new();
    stepper.run(&mut sim, 1000).expect("run should succeed");

    let ball = sim.body_by_name("ball").unwrap();
    let z = sim.world.body(ball).pose.position.z;
    assert!(
        (0.05..=0.15).contains(&z),
        "ball should rest near z = 0.1, got {z}"
    );
}

#[test]
fn velocity_motor_spins_hinge() {
    let source = r#"
        <Simulation>
            <Scene name="main" stepLength="0.005" gravity="0">
                <Body ref="base"/>
            </Scene>
            <Body name="base">
                <BoxMass name="m" value="10kg" width="0.2" depth="0.2" height="0.2"/>
                <BoxGeometry name="g" width="0.2" depth="0.2" height="0.2"/>
                <Hinge name="wheelJoint">
                    <Translation z="0.2"/>
                    <Axis x="0" y="0" z="1">
                        <VelocityMotor name="wheelMotor" maxVelocity="10" maxForce="50"/>
                    </Axis>
                    <Body name="wheel">
                        <CylinderMass name="wm" value="0.5kg" radius="0.1" height="0.04"/>
                        <CylinderGeometry name="wg" radius="0.1" height="0.04"/>
                    </Body>
                </Hinge>
            </Body>
        </Simulation>
    "#;
    let mut sim = load_scene_str(source).expect("scene should load");
    let joint = sim.joint_by_name("wheelJoint").unwrap();

    sim.motor_by_name("wheelMotor")
        .expect("motor port exists")
        .set_setpoint(2.0);

    let mut stepper = Stepper::new();
    stepper.run(&mut sim, 400).expect("run should succeed");

    let velocity = sim.world.joint_velocity(joint);
    assert!(
        (velocity - 2.0).abs() < 0.2,
        "wheel should spin near the commanded velocity, got {velocity}"
    );
    assert!(
        sim.world.joint_position(joint).abs() > 1.0,
        "wheel should have turned"
    );
}

#[test]
fn deflection_limits_hold_servo_back() {
    let source = r#"
        <Simulation>
            <Scene name="main" stepLength="0.005" gravity="0">
                <Body ref="base"/>
            </Scene>
            <Body name="base">
                <BoxMass name="m" value="10kg" width="0.2" depth="0.2" height="0.2"/>
                <Hinge name="armJoint">
                    <Axis x="0" y="0" z="1">
                        <Deflection min="-45degree" max="45degree"/>
                        <ServoMotor name="armServo" p="20" maxVelocity="5" maxForce="50"/>
                    </Axis>
                    <Body name="arm">
                        <SphereMass name="am" value="0.2kg" radius="0.05">
                            <Translation x="0.3"/>
                        </SphereMass>
                    </Body>
                </Hinge>
            </Body>
        </Simulation>
    "#;
    let mut sim = load_scene_str(source).expect("scene should load");
    let joint = sim.joint_by_name("armJoint").unwrap();

    // Command far past the stop.
    sim.motor_by_name("armServo").unwrap().set_setpoint(3.0);

    let mut stepper = Stepper::new();
    stepper.run(&mut sim, 800).expect("run should succeed");

    let angle = sim.world.joint_position(joint);
    let limit = 45.0_f64.to_radians();
    assert!(
        angle <= limit + 0.1,
        "stop should hold the arm near {limit}, got {angle}"
    );
    assert!(angle > 0.5, "servo should have driven towards the stop");
}

#[test]
fn matrix_classes_follow_step_stamps() {
    let mut sim = load_scene_str(FALLING_BALL).expect("scene should load");
    let mut stepper = Stepper::new();

    sim.update_matrices(UsageClass::Appearance, false);
    assert_eq!(sim.matrices.last_update(UsageClass::Appearance), Some(0));

    stepper.step(&mut sim).expect("step should succeed");
    sim.update_matrices(UsageClass::Appearance, false);
    assert_eq!(sim.matrices.last_update(UsageClass::Appearance), Some(1));

    // Matrices track the fallen body once refreshed.
    let items = sim.draw_items(UsageClass::Appearance);
    // The ball has no appearance elements, so the class may be empty; the
    // physical-drawing class always has the collision shape.
    assert!(items.is_empty());
    sim.update_matrices(UsageClass::PhysicalDrawing, false);
    let physical = sim.draw_items(UsageClass::PhysicalDrawing);
    assert_eq!(physical.len(), 1);
    let z = physical[0].matrix[(2, 3)];
    assert!(z < 1.0, "matrix should reflect the fallen pose, z = {z}");
}

#[test]
fn collision_sensor_counts_per_step() {
    let source = r#"
        <Simulation>
            <Scene name="main" stepLength="0.005" gravity="-9.8">
                <Compound ref="floor"/>
                <Body ref="probe"/>
            </Scene>
            <Compound name="floor">
                <BoxGeometry name="slab" width="4" depth="4" height="1">
                    <Translation z="-0.5"/>
                </BoxGeometry>
            </Compound>
            <Body name="probe">
                <Translation z="0.08"/>
                <SphereMass name="m" value="1kg" radius="0.1"/>
                <SphereGeometry name="g" radius="0.1"/>
                <CollisionSensor name="bumper"/>
            </Body>
        </Simulation>
    "#;
    let mut sim = load_scene_str(source).expect("scene should load");
    let mut stepper = Stepper::new();

    stepper.step(&mut sim).expect("step should succeed");
    let SensorValue::Count(hits) = sim.sensor_by_name("bumper").unwrap().read(&sim.world) else {
        panic!("expected a count");
    };
    assert!(hits > 0, "bumper should report the floor contact");
}

#[test]
fn distance_sensor_reads_through_scene() {
    let source = r#"
        <Simulation>
            <Scene name="main" stepLength="0.01" gravity="0">
                <Compound ref="wall"/>
                <Body ref="probe"/>
            </Scene>
            <Compound name="wall">
                <BoxGeometry name="panel" width="0.2" depth="4" height="4">
                    <Translation x="3"/>
                </BoxGeometry>
            </Compound>
            <Body name="probe">
                <SphereMass name="m" value="1kg" radius="0.05"/>
                <SphereGeometry name="g" radius="0.05"/>
                <SingleDistanceSensor name="ranger" min="0" max="10"/>
            </Body>
        </Simulation>
    "#;
    let sim = load_scene_str(source).expect("scene should load");
    let SensorValue::Scalar(d) = sim.sensor_by_name("ranger").unwrap().read(&sim.world) else {
        panic!("expected a scalar");
    };
    assert!((d - 2.9).abs() < 1e-6, "ranger should see the wall, got {d}");
}

#[test]
fn camera_renders_through_boundary() {
    let source = r##"
        <Simulation>
            <Scene name="main" stepLength="0.01" gravity="0">
                <Light x="0" y="0" z="3" diffuseColor="#fff"/>
                <Body ref="ball"/>
                <Body ref="eye"/>
            </Scene>
            <Body name="ball">
                <Translation x="2"/>
                <SphereMass name="m" value="1kg" radius="0.2"/>
                <SphereAppearance name="a" radius="0.2">
                    <Surface name="red" diffuseColor="#f00"/>
                </SphereAppearance>
            </Body>
            <Body name="eye">
                <PointMass name="em" value="0.1kg"/>
                <Camera name="cam" imageWidth="32" imageHeight="24" angleX="60degree" angleY="45degree"/>
            </Body>
        </Simulation>
    "##;
    let mut sim = load_scene_str(source).expect("scene should load");
    assert_eq!(sim.lights.len(), 1);

    let mut renderer = NullRenderer::default();
    let image = sim.camera_image("cam", &mut renderer).expect("camera exists");
    assert_eq!(image.len(), 32 * 24 * 4);
    assert_eq!(renderer.calls, 1);
}

#[test]
fn user_input_port_round_trip() {
    let source = r#"
        <Simulation>
            <Scene name="main" stepLength="0.01" gravity="0">
                <UserInput name="throttle" min="0" max="1" default="0.25"/>
                <Body ref="ball"/>
            </Scene>
            <Body name="ball">
                <PointMass name="m" value="1kg"/>
            </Body>
        </Simulation>
    "#;
    let mut sim = load_scene_str(source).expect("scene should load");
    let port = sim.user_input_by_name("throttle").unwrap();
    assert!((port.value() - 0.25).abs() < 1e-12);
    port.set(0.9);
    assert!((port.value() - 0.9).abs() < 1e-12);
}

#[test]
fn rejected_scene_reports_all_problems() {
    let source = r#"
        <Simulation>
            <Scene name="main">
                <Body name="a">
                    <SphereGeometry name="g" radius="-1"/>
                </Body>
                <Body name="b"/>
            </Scene>
        </Simulation>
    "#;
    let err = load_scene_str(source).expect_err("scene must be rejected");
    let gantry_sim::LoadError::Scene(scene_err) = err else {
        panic!("expected a scene rejection");
    };
    let problems = scene_err.problems().expect("should carry problems");
    // Negative radius, missing mass on both bodies.
    assert!(problems.len() >= 3, "{problems}");
}

#[test]
fn mass_aggregation_offsets_center_of_mass() {
    // Two equal masses, one at the origin and one offset: the body frame
    // (its COM) must sit midway, and the assembly must still fall freely.
    let source = r#"
        <Simulation>
            <Scene name="main" stepLength="0.01" gravity="-9.8">
                <Body ref="dumbbell"/>
            </Scene>
            <Body name="dumbbell">
                <Translation z="2"/>
                <SphereMass name="m1" value="1kg" radius="0.05"/>
                <SphereMass name="m2" value="1kg" radius="0.05">
                    <Translation x="0.4"/>
                </SphereMass>
            </Body>
        </Simulation>
    "#;
    let mut sim = load_scene_str(source).expect("scene should load");
    let body = sim.body_by_name("dumbbell").unwrap();
    let com = sim.world.body(body).pose.position;
    assert!((com.x - 0.2).abs() < 1e-12, "COM x = {}", com.x);
    assert!((com.z - 2.0).abs() < 1e-12);
    assert!((sim.world.body(body).mass.mass - 2.0).abs() < 1e-12);

    let mut stepper = Stepper::new();
    stepper.run(&mut sim, 50).expect("run should succeed");
    assert!(sim.world.body(body).twist.linear.z < -4.0);
}
