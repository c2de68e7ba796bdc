//! Declarative scene description parser for the gantry simulation kernel.
//!
//! Scene descriptions are hierarchical XML-like files: a root `<Simulation>`
//! holds named element templates (macros), `<Include>` directives and
//! `<Set>` variable bindings, with exactly one `<Scene>` among the macros.
//! Loading runs two passes:
//!
//! 1. **Recording** ([`reader`]): every element under `<Simulation>` is
//!    captured as an unexpanded macro template keyed by its
//!    `(name, element kind)` composite key.
//! 2. **Replay** ([`builder`]): starting from the `<Scene>` macro, templates
//!    instantiate into a typed [`SceneTree`]. `ref` attributes splice in
//!    other macros (attribute sets merge child-overrides-parent, inherited
//!    children replay before own children), loops are rejected, and
//!    constant-flagged elements with no placeholder usage are built once
//!    and shared.
//!
//! Problems (malformed values, unknown elements, missing required children,
//! looping references, ...) accumulate as positioned records; a file with
//! any problem is rejected as a whole and nothing is installed.
//!
//! # Example
//!
//! ```
//! let tree = gantry_scene::load_str(r#"
//!     <Simulation>
//!         <Scene name="main" stepLength="0.01" gravity="-9.8">
//!             <Body ref="ball"/>
//!         </Scene>
//!         <Body name="ball">
//!             <Translation z="1m"/>
//!             <SphereMass name="m" value="1kg" radius="10cm"/>
//!             <SphereGeometry name="g" radius="10cm"/>
//!         </Body>
//!     </Simulation>
//! "#).expect("scene should load");
//!
//! assert_eq!(tree.scene_attrs().step_length, 0.01);
//! ```

#![doc(html_root_url = "https://docs.rs/gantry-scene/0.3.0")]
#![deny(clippy::unwrap_used, clippy::expect_used)]
#![warn(missing_docs)]
#![allow(
    clippy::missing_const_for_fn,
    clippy::missing_errors_doc,       // Error docs added where non-obvious
    clippy::cast_possible_truncation, // Line/column numbers fit u32 in practice
)]

mod builder;
pub mod elements;
mod macros;
mod problems;
mod reader;
pub mod values;

pub use elements::{
    AppearanceShape, AxisAttrs, DeflectionAttrs, Element, ElementData, ElementKind, ElementSpec,
    FacesAttrs, FrictionAttrs, GeometryAttrs, GeometryShape, LightAttrs, MotorAttrs, Projection,
    SceneAttrs, SceneTree, SensorAttrs, SurfaceAttrs, UserInputAttrs, element_spec,
    tags_for_class,
};
pub use macros::{Macro, MacroElement, MacroKey, MacroRegistry};
pub use problems::{Problem, ProblemList, Result, SceneError};
pub use values::{AttributeMap, MAX_ATTRIBUTES, PlaceholderUse};

use std::path::Path;

/// Load a scene description from a file, including its `<Include>`s.
///
/// # Errors
///
/// Returns [`SceneError::Io`] if the root file cannot be read, or
/// [`SceneError::Rejected`] with every recorded problem otherwise.
pub fn load_file(path: impl AsRef<Path>) -> Result<SceneTree> {
    let path = path.as_ref();
    let mut recorder = reader::Recorder::new();
    recorder.record_file(path)?;
    finish(recorder, &path.display().to_string())
}

/// Load a scene description from a string.
///
/// `<Include>` paths resolve relative to the current directory; prefer
/// [`load_file`] for scenes that include other files.
///
/// # Errors
///
/// Returns [`SceneError::Rejected`] with every recorded problem on failure.
pub fn load_str(source: &str) -> Result<SceneTree> {
    let mut recorder = reader::Recorder::new();
    recorder.record_source(source, "<string>", None);
    finish(recorder, "<string>")
}

fn finish(recorder: reader::Recorder, root_file: &str) -> Result<SceneTree> {
    let (registry, problems) = recorder.into_parts();
    let macro_count = registry.len();
    let (tree, problems) = builder::Builder::new(registry, problems).build(root_file);
    match tree {
        Some(tree) if problems.is_empty() => {
            tracing::debug!(
                elements = tree.len(),
                macros = macro_count,
                "scene description loaded"
            );
            Ok(tree)
        }
        _ => Err(SceneError::Rejected(problems)),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_load_str_rejects_on_any_problem() {
        let err = load_str(
            r#"
            <Simulation>
                <Scene name="main">
                    <Body name="b">
                        <PointMass name="m" value="1"/>
                        <SphereGeometry name="g" radius="-1"/>
                    </Body>
                </Scene>
            </Simulation>
            "#,
        )
        .unwrap_err();
        let problems = err.problems().expect("should be a rejection");
        assert_eq!(problems.len(), 1);
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let err = load_file("/nonexistent/scene.gsd").unwrap_err();
        assert!(matches!(err, SceneError::Io { .. }));
    }
}
