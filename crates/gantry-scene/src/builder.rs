//! The replay pass: macro templates to the typed element tree.
//!
//! Replay starts from the single `<Scene>` macro and instantiates templates
//! recursively. `ref` attributes splice in other macros of the same element
//! kind: the referenced chain's children are replayed in addition to the
//! referencing element's own children, and attribute sets merge
//! child-overrides-parent. Loops through `ref` are detected with a visited
//! set carried through the recursion. Constant-flagged elements that used no
//! placeholders are built once and shared by later bare references.

use gantry_types::ElementId;
use hashbrown::HashSet;
use nalgebra::{Point3, Vector3};

use crate::elements::{
    Element, ElementData, ElementSpec, FacesAttrs, SceneTree, element_spec, parse_data,
    parse_float_payload, parse_index_payload, tags_for_class,
};
use crate::macros::{MacroElement, MacroKey, MacroRegistry};
use crate::problems::ProblemList;
use crate::values::{Attr, AttributeMap, MAX_ATTRIBUTES, substitute_placeholders};

/// Replays macro templates into a [`SceneTree`].
pub(crate) struct Builder {
    registry: MacroRegistry,
    problems: ProblemList,
    elements: Vec<Element>,
    /// Variable scopes, innermost last. The bottom scope holds the
    /// `<Simulation>`-level bindings.
    scopes: Vec<Vec<(String, String)>>,
    /// Total number of attribute values that used a placeholder; compared
    /// around a subtree replay to decide constant-instance caching.
    placeholder_uses: usize,
}

impl Builder {
    pub(crate) fn new(registry: MacroRegistry, problems: ProblemList) -> Self {
        let globals = registry.globals.clone();
        Self {
            registry,
            problems,
            elements: Vec::new(),
            scopes: vec![globals],
            placeholder_uses: 0,
        }
    }

    /// Replay the scene macro and hand back the tree (or the problems).
    pub(crate) fn build(mut self, root_file: &str) -> (Option<SceneTree>, ProblemList) {
        let scene_keys = self.registry.keys_with_tag("Scene");
        let root_key = match scene_keys.as_slice() {
            [] => {
                self.problems
                    .push(root_file, 1, 1, "missing <Scene> element");
                return (None, self.problems);
            }
            [key] => key.clone(),
            [first, rest @ ..] => {
                for key in rest {
                    if let Some(mac) = self.registry.get(key) {
                        self.problems.push(
                            mac.element.file.clone(),
                            mac.element.line,
                            mac.element.column,
                            format!(
                                "more than one <Scene> element (first was \"{}\")",
                                first.0
                            ),
                        );
                    }
                }
                first.clone()
            }
        };

        #[allow(clippy::unwrap_used)] // The key came out of the registry.
        let template = self.registry.get(&root_key).unwrap().element.clone();
        let mut visited = HashSet::new();
        visited.insert(root_key);
        let root = self.replay(&template, None, &mut visited);

        match root {
            Some(root) if self.problems.is_empty() => {
                (Some(SceneTree::new(self.elements, root)), self.problems)
            }
            _ => (None, self.problems),
        }
    }

    /// Replay one macro element under `parent`.
    fn replay(
        &mut self,
        me: &MacroElement,
        parent: Option<ElementId>,
        visited: &mut HashSet<MacroKey>,
    ) -> Option<ElementId> {
        let Some(spec) = element_spec(&me.tag) else {
            self.problems.push(
                me.file.clone(),
                me.line,
                me.column,
                format!("unknown element <{}>", me.tag),
            );
            return None;
        };

        if me.is_pure_reference() {
            return self.replay_pure_reference(me, spec, parent, visited);
        }

        // Resolve the ref chain (if any) and merge attributes, children and
        // variable bindings along it, child-overrides-parent.
        let mut attrs: Vec<Attr> = me.attrs.iter().filter(|a| a.key != "ref").cloned().collect();
        let mut vars = me.vars.clone();
        let mut chain: Vec<MacroKey> = Vec::new();
        let mut inherited: Vec<MacroElement> = Vec::new();

        if let Some(ref_raw) = me.attr("ref") {
            let (ref_name, _) = self.substitute(ref_raw);
            let mut key = (ref_name, me.tag.clone());
            loop {
                if visited.contains(&key) || chain.contains(&key) {
                    self.problems.push(
                        me.file.clone(),
                        me.line,
                        me.column,
                        format!("looping reference to macro \"{} {}\"", key.0, key.1),
                    );
                    return None;
                }
                let Some(mac) = self.registry.get(&key) else {
                    self.problems.push(
                        me.file.clone(),
                        me.line,
                        me.column,
                        format!("reference to unknown macro \"{} {}\"", key.0, key.1),
                    );
                    return None;
                };
                let template = mac.element.clone();
                chain.push(key.clone());

                for attr in &template.attrs {
                    if attr.key != "ref" && !attrs.iter().any(|a| a.key == attr.key) {
                        if attrs.len() >= MAX_ATTRIBUTES {
                            self.problems.push(
                                me.file.clone(),
                                me.line,
                                me.column,
                                format!(
                                    "more than {MAX_ATTRIBUTES} attributes after resolving \
                                     references"
                                ),
                            );
                            break;
                        }
                        attrs.push(attr.clone());
                    }
                }
                for (name, value) in &template.vars {
                    if !vars.iter().any(|(n, _)| n == name) {
                        vars.push((name.clone(), value.clone()));
                    }
                }

                let next = template.attr("ref").map(str::to_string);
                inherited.push(template);
                match next {
                    Some(raw) => {
                        let (name, _) = self.substitute(&raw);
                        key = (name, me.tag.clone());
                    }
                    None => break,
                }
            }
        }

        // Children: base-most macro first, then along the chain, then own.
        let mut children: Vec<&MacroElement> = Vec::new();
        for template in inherited.iter().rev() {
            children.extend(template.children.iter());
        }
        children.extend(me.children.iter());

        for key in &chain {
            visited.insert(key.clone());
        }
        let id = self.construct(me, spec, attrs, vars, &children, parent, visited);
        for key in &chain {
            visited.remove(key);
        }
        id
    }

    /// Replay a reference-only element: reuse the cached instance if one
    /// exists, otherwise replay the referenced macro in place (caching the
    /// result for constant element kinds that used no placeholders).
    fn replay_pure_reference(
        &mut self,
        me: &MacroElement,
        spec: &'static ElementSpec,
        parent: Option<ElementId>,
        visited: &mut HashSet<MacroKey>,
    ) -> Option<ElementId> {
        #[allow(clippy::unwrap_used)] // is_pure_reference guarantees the attr.
        let (ref_name, _) = self.substitute(me.attr("ref").unwrap());
        let key = (ref_name, me.tag.clone());

        let Some(mac) = self.registry.get(&key) else {
            self.problems.push(
                me.file.clone(),
                me.line,
                me.column,
                format!("reference to unknown macro \"{} {}\"", key.0, key.1),
            );
            return None;
        };
        if let Some(instance) = mac.instance {
            self.link_shared(instance, parent);
            return Some(instance);
        }

        if visited.contains(&key) {
            self.problems.push(
                me.file.clone(),
                me.line,
                me.column,
                format!("looping reference to macro \"{} {}\"", key.0, key.1),
            );
            return None;
        }

        let template = mac.element.clone();
        visited.insert(key.clone());
        let uses_before = self.placeholder_uses;
        let id = self.replay(&template, parent, visited);
        visited.remove(&key);

        if let Some(id) = id {
            if spec.constant && self.placeholder_uses == uses_before {
                if let Some(mac) = self.registry.get_mut(&key) {
                    mac.instance = Some(id);
                }
            }
        }
        id
    }

    /// Construct an element from merged attributes and replay its children.
    fn construct(
        &mut self,
        me: &MacroElement,
        spec: &'static ElementSpec,
        attrs: Vec<Attr>,
        vars: Vec<(String, String)>,
        children: &[&MacroElement],
        parent: Option<ElementId>,
        visited: &mut HashSet<MacroKey>,
    ) -> Option<ElementId> {
        // Variable bindings become visible to this element's own attributes
        // and its whole subtree.
        let scope = vars
            .into_iter()
            .map(|(name, value)| {
                let (substituted, _) = self.substitute(&value);
                (name, substituted)
            })
            .collect();
        self.scopes.push(scope);

        let mut attrs = attrs;
        if attrs.len() > MAX_ATTRIBUTES {
            self.problems.push(
                me.file.clone(),
                me.line,
                me.column,
                format!("more than {MAX_ATTRIBUTES} attributes on element <{}>", me.tag),
            );
            attrs.truncate(MAX_ATTRIBUTES);
        }
        let attrs = attrs
            .into_iter()
            .map(|mut attr| {
                let (value, _) = self.substitute(&attr.value);
                attr.value = value;
                attr
            })
            .collect();

        let mut map = AttributeMap::new(me.file.clone(), me.tag.clone(), me.line, me.column, attrs);
        let name = map.get_string("name");
        let mut data = parse_data(spec.kind, &mut map, &mut self.problems);
        if spec.textual {
            self.attach_payload(me, &mut data);
        }

        let id = ElementId::new(u32::try_from(self.elements.len()).unwrap_or(u32::MAX));
        self.elements.push(Element {
            id,
            kind: spec.kind,
            name,
            data,
            parent,
            extra_parents: Vec::new(),
            children: Vec::new(),
            file: me.file.clone(),
            line: me.line,
            column: me.column,
        });
        if let Some(parent) = parent {
            self.elements[parent.index()].children.push(id);
        }

        // Replay children, tracking which child classes appeared.
        let mut seen = 0u32;
        for child in children {
            let Some(child_spec) = element_spec(&child.tag) else {
                self.problems.push(
                    child.file.clone(),
                    child.line,
                    child.column,
                    format!("unknown element <{}>", child.tag),
                );
                continue;
            };
            let class = child_spec.class;
            if class & spec.accepted_children() == 0 {
                self.problems.push(
                    child.file.clone(),
                    child.line,
                    child.column,
                    format!(
                        "element <{}> not allowed inside <{}>",
                        child.tag, me.tag
                    ),
                );
                continue;
            }
            if seen & class != 0 && class & spec.repeatable_children == 0 {
                self.problems.push(
                    child.file.clone(),
                    child.line,
                    child.column,
                    format!(
                        "more than one <{}> child in <{}>",
                        child.tag, me.tag
                    ),
                );
                continue;
            }
            seen |= class;
            self.replay(child, Some(id), visited);
        }

        // One problem per missing required class, naming every element type
        // that would have satisfied it.
        let mut missing = spec.required_children & !seen;
        while missing != 0 {
            let class = missing & missing.wrapping_neg();
            missing &= missing - 1;
            let tags = tags_for_class(class)
                .iter()
                .map(|t| format!("<{t}>"))
                .collect::<Vec<_>>()
                .join(", ");
            self.problems.push(
                me.file.clone(),
                me.line,
                me.column,
                format!("expected element {tags} as child of <{}>", me.tag),
            );
        }

        map.report_unused(&mut self.problems);
        self.scopes.pop();
        Some(id)
    }

    /// Link an already-built shared instance under an additional parent.
    fn link_shared(&mut self, instance: ElementId, parent: Option<ElementId>) {
        if let Some(parent) = parent {
            self.elements[parent.index()].children.push(instance);
            self.elements[instance.index()].extra_parents.push(parent);
        }
    }

    /// Parse the textual payload of a vertex/normal/texcoord/index element.
    fn attach_payload(&mut self, me: &MacroElement, data: &mut ElementData) {
        let problems = &mut self.problems;
        let (file, line, column) = (me.file.clone(), me.line, me.column);
        let mut report = |message: String| problems.push(file.clone(), line, column, message);

        match data {
            ElementData::Vertices(points) => {
                let floats = parse_float_payload(&me.text, &mut report);
                if floats.len() % 3 != 0 {
                    report(format!(
                        "vertex list length {} is not divisible by 3",
                        floats.len()
                    ));
                }
                *points = floats
                    .chunks_exact(3)
                    .map(|c| Point3::new(c[0], c[1], c[2]))
                    .collect();
            }
            ElementData::Normals(normals) => {
                let floats = parse_float_payload(&me.text, &mut report);
                if floats.len() % 3 != 0 {
                    report(format!(
                        "normal list length {} is not divisible by 3",
                        floats.len()
                    ));
                }
                *normals = floats
                    .chunks_exact(3)
                    .map(|c| Vector3::new(c[0], c[1], c[2]))
                    .collect();
            }
            ElementData::TexCoords(coords) => {
                let floats = parse_float_payload(&me.text, &mut report);
                if floats.len() % 2 != 0 {
                    report(format!(
                        "texture coordinate list length {} is not divisible by 2",
                        floats.len()
                    ));
                }
                *coords = floats.chunks_exact(2).map(|c| [c[0], c[1]]).collect();
            }
            ElementData::Faces(FacesAttrs { indices, quads }) => {
                let parsed = parse_index_payload(&me.text);
                let group = if *quads { 4 } else { 3 };
                if parsed.len() % group != 0 {
                    report(format!(
                        "index list length {} is not divisible by {group}",
                        parsed.len()
                    ));
                }
                *indices = parsed;
                indices.truncate(indices.len() / group * group);
            }
            _ => {}
        }
    }

    /// Substitute placeholders against the current scope chain, innermost
    /// scope first. Unresolved placeholders stay verbatim.
    fn substitute(&mut self, input: &str) -> (String, bool) {
        let scopes = &self.scopes;
        let lookup = |name: &str| {
            scopes.iter().rev().find_map(|scope| {
                scope
                    .iter()
                    .find(|(n, _)| n == name)
                    .map(|(_, v)| v.clone())
            })
        };
        let (value, usage) = substitute_placeholders(input, &lookup);
        if usage.any {
            self.placeholder_uses += 1;
        }
        (value, usage.unresolved)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::elements::{ElementKind, GeometryShape};
    use crate::reader::Recorder;
    use approx::assert_relative_eq;

    fn build(source: &str) -> (Option<SceneTree>, ProblemList) {
        let mut recorder = Recorder::new();
        recorder.record_source(source, "test.gsd", None);
        Builder::new(recorder.registry, recorder.problems).build("test.gsd")
    }

    fn build_ok(source: &str) -> SceneTree {
        let (tree, problems) = build(source);
        assert!(problems.is_empty(), "{problems}");
        tree.expect("scene should build")
    }

    const BALL_SCENE: &str = r#"
        <Simulation>
            <Scene name="main" stepLength="0.01" gravity="-9.8">
                <Body ref="ball"/>
            </Scene>
            <Body name="ball">
                <Translation z="1"/>
                <SphereMass name="m" value="1kg" radius="0.1"/>
                <SphereGeometry name="g" radius="0.1"/>
            </Body>
        </Simulation>
    "#;

    #[test]
    fn test_build_ball_scene() {
        let tree = build_ok(BALL_SCENE);
        let root = tree.get(tree.root());
        assert_eq!(root.kind, ElementKind::Scene);
        assert_relative_eq!(tree.scene_attrs().step_length, 0.01, epsilon = 1e-12);

        let body = tree.child_of_kind(tree.root(), ElementKind::Body).unwrap();
        let body = tree.get(body);
        assert_eq!(body.name.as_deref(), Some("ball"));
        assert_eq!(body.children.len(), 3);
    }

    #[test]
    fn test_round_trip_structural_identity() {
        let a = build_ok(BALL_SCENE);
        let b = build_ok(BALL_SCENE);
        assert_eq!(a.len(), b.len());
        for (ea, eb) in a.iter().zip(b.iter()) {
            assert_eq!(ea.kind, eb.kind);
            assert_eq!(ea.name, eb.name);
            assert_eq!(ea.data, eb.data);
            assert_eq!(ea.children, eb.children);
        }
    }

    #[test]
    fn test_looping_reference_rejected() {
        let (tree, problems) = build(
            r#"
            <Simulation>
                <Scene name="main">
                    <Body ref="a"/>
                </Scene>
                <Body name="a" ref="b">
                    <PointMass name="m" value="1"/>
                </Body>
                <Body name="b" ref="a">
                    <PointMass name="m" value="1"/>
                </Body>
            </Simulation>
            "#,
        );
        assert!(tree.is_none());
        assert!(
            problems
                .iter()
                .any(|p| p.message.contains("looping reference")),
            "{problems}"
        );
    }

    #[test]
    fn test_self_reference_rejected() {
        let (tree, problems) = build(
            r#"
            <Simulation>
                <Scene name="main">
                    <Body ref="a"/>
                </Scene>
                <Body name="a" ref="a"/>
            </Simulation>
            "#,
        );
        assert!(tree.is_none());
        assert!(problems.iter().any(|p| p.message.contains("looping")));
    }

    #[test]
    fn test_ref_inheritance_merges_attributes() {
        let tree = build_ok(
            r#"
            <Simulation>
                <Scene name="main">
                    <Body name="b">
                        <PointMass name="m" value="1"/>
                        <BoxGeometry name="g" ref="base" width="0.5"/>
                    </Body>
                </Scene>
                <BoxGeometry name="base" width="0.2" depth="0.3" height="0.4"/>
            </Simulation>
            "#,
        );
        let geometry = tree
            .iter()
            .find(|e| e.kind == ElementKind::BoxGeometry)
            .unwrap();
        let ElementData::Geometry(g) = &geometry.data else {
            panic!("expected geometry");
        };
        let GeometryShape::Box {
            width,
            depth,
            height,
        } = g.shape
        else {
            panic!("expected box");
        };
        // Own width overrides the base; depth/height are inherited.
        assert_relative_eq!(width, 0.5, epsilon = 1e-12);
        assert_relative_eq!(depth, 0.3, epsilon = 1e-12);
        assert_relative_eq!(height, 0.4, epsilon = 1e-12);
    }

    #[test]
    fn test_ref_chain_replays_inherited_children() {
        let tree = build_ok(
            r#"
            <Simulation>
                <Scene name="main">
                    <Body ref="robot"/>
                </Scene>
                <Body name="chassis">
                    <PointMass name="m" value="2"/>
                </Body>
                <Body name="robot" ref="chassis">
                    <SphereGeometry name="g" radius="0.2"/>
                </Body>
            </Simulation>
            "#,
        );
        let body = tree.child_of_kind(tree.root(), ElementKind::Body).unwrap();
        let kinds: Vec<ElementKind> = tree
            .children(body)
            .iter()
            .map(|&c| tree.get(c).kind)
            .collect();
        // Inherited mass first, own geometry after.
        assert_eq!(
            kinds,
            vec![ElementKind::PointMass, ElementKind::SphereGeometry]
        );
    }

    #[test]
    fn test_constant_element_shared() {
        let tree = build_ok(
            r#"
            <Simulation>
                <Scene name="main">
                    <Body name="a">
                        <PointMass name="m" value="1"/>
                        <SphereGeometry ref="shared"/>
                    </Body>
                    <Body name="b">
                        <PointMass name="m" value="1"/>
                        <SphereGeometry ref="shared"/>
                    </Body>
                </Scene>
                <SphereGeometry name="shared" radius="0.1"/>
            </Simulation>
            "#,
        );
        let geometries: Vec<&Element> = tree
            .iter()
            .filter(|e| e.kind == ElementKind::SphereGeometry)
            .collect();
        // One instance, linked under both bodies.
        assert_eq!(geometries.len(), 1);
        assert!(geometries[0].is_shared());
        assert_eq!(geometries[0].extra_parents.len(), 1);
    }

    #[test]
    fn test_placeholder_blocks_sharing() {
        let tree = build_ok(
            r#"
            <Simulation>
                <Scene name="main">
                    <Body name="a">
                        <Set name="r" value="0.1"/>
                        <PointMass name="m" value="1"/>
                        <SphereGeometry ref="tpl"/>
                    </Body>
                    <Body name="b">
                        <Set name="r" value="0.2"/>
                        <PointMass name="m" value="1"/>
                        <SphereGeometry ref="tpl"/>
                    </Body>
                </Scene>
                <SphereGeometry name="tpl" radius="$r"/>
            </Simulation>
            "#,
        );
        let radii: Vec<f64> = tree
            .iter()
            .filter_map(|e| match &e.data {
                ElementData::Geometry(g) => match g.shape {
                    GeometryShape::Sphere { radius } => Some(radius),
                    _ => None,
                },
                _ => None,
            })
            .collect();
        // Placeholder use disqualifies caching: two distinct instances.
        assert_eq!(radii.len(), 2);
        assert_relative_eq!(radii[0], 0.1, epsilon = 1e-12);
        assert_relative_eq!(radii[1], 0.2, epsilon = 1e-12);
    }

    #[test]
    fn test_missing_required_child_one_error_per_class() {
        let (tree, problems) = build(
            r#"
            <Simulation>
                <Scene name="main">
                    <Body name="empty"/>
                </Scene>
            </Simulation>
            "#,
        );
        assert!(tree.is_none());
        let missing: Vec<_> = problems
            .iter()
            .filter(|p| p.message.contains("expected element"))
            .collect();
        assert_eq!(missing.len(), 1);
        // The message names every satisfying element type.
        assert!(missing[0].message.contains("<BoxMass>"));
        assert!(missing[0].message.contains("<SphereMass>"));
        assert!(missing[0].message.contains("<PointMass>"));
    }

    #[test]
    fn test_required_child_present_no_error() {
        let (_, problems) = build(
            r#"
            <Simulation>
                <Scene name="main">
                    <Body name="ok">
                        <PointMass name="m" value="1"/>
                    </Body>
                </Scene>
            </Simulation>
            "#,
        );
        assert!(
            !problems.iter().any(|p| p.message.contains("expected element")),
            "{problems}"
        );
    }

    #[test]
    fn test_second_optional_once_child_rejected() {
        let (_, problems) = build(
            r#"
            <Simulation>
                <Scene name="main">
                    <Body name="b">
                        <PointMass name="m" value="1"/>
                        <Translation x="1"/>
                        <Translation x="2"/>
                    </Body>
                </Scene>
            </Simulation>
            "#,
        );
        assert!(
            problems
                .iter()
                .any(|p| p.message.contains("more than one <Translation>")),
            "{problems}"
        );
    }

    #[test]
    fn test_repeatable_child_allowed_twice() {
        let (_, problems) = build(
            r#"
            <Simulation>
                <Scene name="main">
                    <Body name="b">
                        <PointMass name="m1" value="1"/>
                        <PointMass name="m2" value="2"/>
                    </Body>
                </Scene>
            </Simulation>
            "#,
        );
        assert!(problems.is_empty(), "{problems}");
    }

    #[test]
    fn test_unknown_reference_reported() {
        let (tree, problems) = build(
            r#"
            <Simulation>
                <Scene name="main">
                    <Body ref="nosuch"/>
                </Scene>
            </Simulation>
            "#,
        );
        assert!(tree.is_none());
        assert!(
            problems
                .iter()
                .any(|p| p.message.contains("unknown macro \"nosuch Body\"")),
            "{problems}"
        );
    }

    #[test]
    fn test_variable_scope_walks_outward() {
        let tree = build_ok(
            r#"
            <Simulation>
                <Set name="r" value="0.4"/>
                <Scene name="main">
                    <Body name="b">
                        <PointMass name="m" value="1"/>
                        <SphereGeometry name="g" radius="$r"/>
                    </Body>
                </Scene>
            </Simulation>
            "#,
        );
        let geometry = tree
            .iter()
            .find(|e| e.kind == ElementKind::SphereGeometry)
            .unwrap();
        let ElementData::Geometry(g) = &geometry.data else {
            panic!("expected geometry");
        };
        let GeometryShape::Sphere { radius } = g.shape else {
            panic!("expected sphere");
        };
        assert_relative_eq!(radius, 0.4, epsilon = 1e-12);
    }

    #[test]
    fn test_complex_geometry_payload() {
        let tree = build_ok(
            r#"
            <Simulation>
                <Scene name="main">
                    <Compound name="floor">
                        <ComplexGeometry name="mesh">
                            <Vertices name="v">
                                0 0 0  1 0 0  0 1 0
                            </Vertices>
                            <Triangles name="t">
                                0 1 2
                            </Triangles>
                        </ComplexGeometry>
                    </Compound>
                </Scene>
            </Simulation>
            "#,
        );
        let vertices = tree
            .iter()
            .find(|e| e.kind == ElementKind::Vertices)
            .unwrap();
        let ElementData::Vertices(points) = &vertices.data else {
            panic!("expected vertices");
        };
        assert_eq!(points.len(), 3);

        let faces = tree
            .iter()
            .find(|e| e.kind == ElementKind::Triangles)
            .unwrap();
        let ElementData::Faces(f) = &faces.data else {
            panic!("expected faces");
        };
        assert_eq!(f.indices, vec![0, 1, 2]);
        assert!(!f.quads);
    }

    #[test]
    fn test_disallowed_child_reported() {
        let (_, problems) = build(
            r#"
            <Simulation>
                <Scene name="main">
                    <Axis name="a"/>
                </Scene>
            </Simulation>
            "#,
        );
        assert!(
            problems
                .iter()
                .any(|p| p.message.contains("not allowed inside <Scene>")),
            "{problems}"
        );
    }
}
