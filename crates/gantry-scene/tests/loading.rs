//! Whole-file loading: includes, templating and rejection behavior.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::fs;
use std::io::Write;

use gantry_scene::{ElementData, ElementKind, GeometryShape, SceneError, load_file, load_str};

#[test]
fn load_scene_with_include_and_templates() {
    let dir = tempfile::tempdir().unwrap();

    let shapes = dir.path().join("shapes.gsd");
    let mut f = fs::File::create(&shapes).unwrap();
    writeln!(
        f,
        r#"
        <Simulation>
            <BoxGeometry name="crate" width="$size" depth="$size" height="$size"/>
        </Simulation>
        "#
    )
    .unwrap();

    let scene = dir.path().join("scene.gsd");
    let mut f = fs::File::create(&scene).unwrap();
    writeln!(
        f,
        r#"
        <Simulation>
            <Include href="shapes.gsd"/>
            <Set name="size" value="0.5"/>
            <Scene name="main" stepLength="0.01">
                <Body name="box">
                    <BoxMass name="m" value="2kg" width="0.5" depth="0.5" height="0.5"/>
                    <BoxGeometry ref="crate"/>
                </Body>
            </Scene>
        </Simulation>
        "#
    )
    .unwrap();

    let tree = load_file(&scene).expect("scene should load");
    let geometry = tree
        .iter()
        .find(|e| e.kind == ElementKind::BoxGeometry)
        .expect("geometry instantiated");
    let ElementData::Geometry(attrs) = &geometry.data else {
        panic!("expected geometry data");
    };
    let GeometryShape::Box { width, .. } = attrs.shape else {
        panic!("expected box shape");
    };
    // The include's template resolved $size from the including file.
    assert!((width - 0.5).abs() < 1e-12);
}

#[test]
fn unit_suffix_variants_are_equivalent() {
    let with_units = load_str(
        r#"
        <Simulation>
            <Scene name="main" stepLength="0.01">
                <Body name="b">
                    <SphereMass name="m" value="500g" radius="5cm"/>
                </Body>
            </Scene>
        </Simulation>
        "#,
    )
    .expect("scene should load");
    let with_si = load_str(
        r#"
        <Simulation>
            <Scene name="main" stepLength="0.01">
                <Body name="b">
                    <SphereMass name="m" value="0.5kg" radius="50mm"/>
                </Body>
            </Scene>
        </Simulation>
        "#,
    )
    .expect("scene should load");

    let mass_of = |tree: &gantry_scene::SceneTree| {
        tree.iter()
            .find_map(|e| match &e.data {
                ElementData::Mass(m) => Some(*m),
                _ => None,
            })
            .expect("mass present")
    };
    let a = mass_of(&with_units);
    let b = mass_of(&with_si);
    assert!((a.mass - b.mass).abs() < 1e-12);
    assert!((a.inertia[(0, 0)] - b.inertia[(0, 0)]).abs() < 1e-12);
}

#[test]
fn rejection_reports_every_problem_in_order() {
    let err = load_str(
        r#"
        <Simulation>
            <Scene name="main">
                <Body name="one">
                    <SphereMass name="m" value="-3" radius="0.1"/>
                    <SphereGeometry name="g" radius="abc"/>
                </Body>
                <Body name="two"/>
            </Scene>
        </Simulation>
        "#,
    )
    .expect_err("scene must be rejected");

    let SceneError::Rejected(problems) = err else {
        panic!("expected rejection");
    };
    // Negative mass, malformed radius, missing mass on body "two".
    assert!(problems.len() >= 3, "{problems}");
    let lines: Vec<u32> = problems.iter().map(|p| p.line).collect();
    let mut sorted = lines.clone();
    sorted.sort_unstable();
    assert_eq!(lines, sorted, "problems should be in document order");
}

#[test]
fn looping_include_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let a = dir.path().join("a.gsd");
    let b = dir.path().join("b.gsd");

    fs::write(
        &a,
        "<Simulation><Include href=\"b.gsd\"/><Scene name=\"main\"/></Simulation>",
    )
    .unwrap();
    fs::write(&b, "<Simulation><Include href=\"a.gsd\"/></Simulation>").unwrap();

    let err = load_file(&a).expect_err("looping include must fail");
    let problems = err.problems().expect("should carry problems");
    assert!(
        problems.iter().any(|p| p.message.contains("looping include")),
        "{problems}"
    );
}
