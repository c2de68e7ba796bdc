//! The recording pass: scene description files to macro templates.
//!
//! The reader streams a scene description with quick-xml and records every
//! element inside the top-level `<Simulation>` tag as a macro template.
//! Nothing is instantiated here; that is the replay pass in
//! [`crate::builder`]. `<Include href>` pulls in sibling files relative to
//! the including file, and `<Set>` records variable bindings.

use std::fs;
use std::path::{Path, PathBuf};

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::macros::{MacroElement, MacroRegistry};
use crate::problems::{ProblemList, SceneError};
use crate::values::Attr;

/// Byte-offset to line/column translation for one source file.
struct LineIndex {
    line_starts: Vec<usize>,
}

impl LineIndex {
    fn new(source: &str) -> Self {
        let mut line_starts = vec![0];
        for (i, b) in source.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(i + 1);
            }
        }
        Self { line_starts }
    }

    /// 1-based (line, column) of a byte offset.
    fn locate(&self, offset: usize) -> (u32, u32) {
        let line = self
            .line_starts
            .partition_point(|&start| start <= offset)
            .saturating_sub(1);
        let column = offset - self.line_starts[line];
        (line as u32 + 1, column as u32 + 1)
    }
}

/// Position of the next `<` at or after `offset`; quick-xml reports event
/// positions after leading whitespace is consumed, the tag itself reads
/// better in diagnostics.
fn tag_position(source: &str, index: &LineIndex, offset: usize) -> (u32, u32) {
    let offset = offset.min(source.len());
    let at = source[offset..]
        .find('<')
        .map_or(offset, |rel| offset + rel);
    index.locate(at)
}

/// Records macro templates from scene description files.
pub(crate) struct Recorder {
    pub registry: MacroRegistry,
    pub problems: ProblemList,
    include_stack: Vec<PathBuf>,
}

impl Recorder {
    pub fn new() -> Self {
        Self {
            registry: MacroRegistry::new(),
            problems: ProblemList::new(),
            include_stack: Vec::new(),
        }
    }

    /// Hand the recorded registry and problems to the replay pass.
    pub fn into_parts(self) -> (MacroRegistry, ProblemList) {
        (self.registry, self.problems)
    }

    /// Record the root scene description file.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the root file cannot be read. Included files
    /// that fail to read are recorded as problems instead.
    pub fn record_file(&mut self, path: &Path) -> std::result::Result<(), SceneError> {
        let source = fs::read_to_string(path).map_err(|source| SceneError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        self.include_stack.push(canonical);
        self.record_source(&source, &path.display().to_string(), path.parent());
        self.include_stack.pop();
        Ok(())
    }

    /// Record a scene description from a string.
    pub fn record_source(&mut self, source: &str, file: &str, base_dir: Option<&Path>) {
        let index = LineIndex::new(source);
        let mut reader = Reader::from_str(source);
        reader.config_mut().trim_text(true);

        let mut buf = Vec::new();
        let mut saw_simulation = false;
        loop {
            let offset = usize::try_from(reader.buffer_position()).unwrap_or(usize::MAX);
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(ref e)) if e.name().as_ref() == b"Simulation" => {
                    saw_simulation = true;
                    self.record_simulation(&mut reader, source, &index, file, base_dir);
                }
                Ok(Event::Empty(ref e)) if e.name().as_ref() == b"Simulation" => {
                    saw_simulation = true;
                }
                Ok(Event::Start(ref e) | Event::Empty(ref e)) => {
                    let (line, column) = tag_position(source, &index, offset);
                    let tag = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                    self.problems.push(
                        file,
                        line,
                        column,
                        format!("expected <Simulation> as root element, found <{tag}>"),
                    );
                    return;
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(err) => {
                    let (line, column) = tag_position(source, &index, offset);
                    self.problems
                        .push(file, line, column, format!("malformed XML: {err}"));
                    return;
                }
            }
            buf.clear();
        }

        if !saw_simulation {
            self.problems
                .push(file, 1, 1, "missing <Simulation> root element");
        }
    }

    /// Record the children of `<Simulation>`: includes, file-level variable
    /// bindings, and macro definitions.
    fn record_simulation(
        &mut self,
        reader: &mut Reader<&[u8]>,
        source: &str,
        index: &LineIndex,
        file: &str,
        base_dir: Option<&Path>,
    ) {
        let mut buf = Vec::new();
        loop {
            let offset = usize::try_from(reader.buffer_position()).unwrap_or(usize::MAX);
            let event = match reader.read_event_into(&mut buf) {
                Ok(event) => event.into_owned(),
                Err(err) => {
                    let (line, column) = tag_position(source, index, offset);
                    self.problems
                        .push(file, line, column, format!("malformed XML: {err}"));
                    return;
                }
            };
            let (line, column) = tag_position(source, index, offset);
            match event {
                Event::Start(ref e) | Event::Empty(ref e) => {
                    let is_empty = matches!(event, Event::Empty(_));
                    match e.name().as_ref() {
                        b"Include" => {
                            self.record_include(e, base_dir, file, line, column);
                            if !is_empty {
                                skip_element(reader, e.name().as_ref());
                            }
                        }
                        b"Set" => {
                            if let Some((name, value)) = set_binding(e) {
                                self.registry.define_global(name, value);
                            } else {
                                self.problems.push(
                                    file,
                                    line,
                                    column,
                                    "<Set> requires \"name\" and \"value\" attributes",
                                );
                            }
                            if !is_empty {
                                skip_element(reader, e.name().as_ref());
                            }
                        }
                        _ => {
                            let element = if is_empty {
                                leaf_element(e, file, line, column)
                            } else {
                                self.record_element(reader, source, index, e, file, line, column)
                            };
                            self.register_macro(element);
                        }
                    }
                }
                Event::End(ref e) if e.name().as_ref() == b"Simulation" => return,
                Event::Eof => {
                    self.problems.push(
                        file,
                        line,
                        column,
                        "unexpected end of file inside <Simulation>",
                    );
                    return;
                }
                _ => {}
            }
            buf.clear();
        }
    }

    /// Record one element template and its subtree.
    #[allow(clippy::too_many_arguments)]
    fn record_element(
        &mut self,
        reader: &mut Reader<&[u8]>,
        source: &str,
        index: &LineIndex,
        start: &BytesStart<'_>,
        file: &str,
        line: u32,
        column: u32,
    ) -> MacroElement {
        let mut element = leaf_element(start, file, line, column);
        let tag = element.tag.clone();

        let mut buf = Vec::new();
        loop {
            let offset = usize::try_from(reader.buffer_position()).unwrap_or(usize::MAX);
            let event = match reader.read_event_into(&mut buf) {
                Ok(event) => event.into_owned(),
                Err(err) => {
                    let (l, c) = tag_position(source, index, offset);
                    self.problems
                        .push(file, l, c, format!("malformed XML: {err}"));
                    return element;
                }
            };
            let (l, c) = tag_position(source, index, offset);
            match event {
                Event::Start(ref e) | Event::Empty(ref e) => {
                    let is_empty = matches!(event, Event::Empty(_));
                    if e.name().as_ref() == b"Set" {
                        if let Some((name, value)) = set_binding(e) {
                            element.define_var(name, value);
                        } else {
                            self.problems.push(
                                file,
                                l,
                                c,
                                "<Set> requires \"name\" and \"value\" attributes",
                            );
                        }
                        if !is_empty {
                            skip_element(reader, e.name().as_ref());
                        }
                    } else if is_empty {
                        element.children.push(leaf_element(e, file, l, c));
                    } else {
                        let child = self.record_element(reader, source, index, e, file, l, c);
                        element.children.push(child);
                    }
                }
                Event::Text(ref t) => {
                    let chunk = t
                        .unescape()
                        .map_or_else(|_| String::from_utf8_lossy(t).into_owned(), |s| {
                            s.into_owned()
                        });
                    element.text.push_str(&chunk);
                    element.text.push('\n');
                }
                Event::End(ref e) if e.name().as_ref() == tag.as_bytes() => break,
                Event::Eof => {
                    self.problems
                        .push(file, l, c, format!("unexpected end of file in <{tag}>"));
                    break;
                }
                _ => {}
            }
            buf.clear();
        }

        element
    }

    /// Register a recorded template; top-level templates must be named.
    fn register_macro(&mut self, element: MacroElement) {
        let Some(name) = element.attr("name").map(str::to_string) else {
            self.problems.push(
                element.file.clone(),
                element.line,
                element.column,
                format!("macro element <{}> must have a name", element.tag),
            );
            return;
        };
        let (file, line, column) = (element.file.clone(), element.line, element.column);
        let tag = element.tag.clone();
        if !self.registry.insert(name.clone(), element) {
            self.problems.push(
                file,
                line,
                column,
                format!("duplicate macro \"{name} {tag}\""),
            );
        }
    }

    /// Resolve and record an `<Include href>` file.
    fn record_include(
        &mut self,
        e: &BytesStart<'_>,
        base_dir: Option<&Path>,
        file: &str,
        line: u32,
        column: u32,
    ) {
        let Some(href) = attribute_value(e, "href") else {
            self.problems
                .push(file, line, column, "<Include> requires an \"href\" attribute");
            return;
        };

        let path = base_dir.map_or_else(|| PathBuf::from(&href), |base| base.join(&href));
        let canonical = path.canonicalize().unwrap_or_else(|_| path.clone());
        if self.include_stack.contains(&canonical) {
            self.problems.push(
                file,
                line,
                column,
                format!("looping include of \"{href}\""),
            );
            return;
        }

        match fs::read_to_string(&path) {
            Ok(source) => {
                self.include_stack.push(canonical);
                self.record_source(&source, &path.display().to_string(), path.parent());
                self.include_stack.pop();
            }
            Err(err) => {
                self.problems.push(
                    file,
                    line,
                    column,
                    format!("failed to read include \"{href}\": {err}"),
                );
            }
        }
    }
}

/// Build a leaf template from an element's tag and attributes.
fn leaf_element(e: &BytesStart<'_>, file: &str, line: u32, column: u32) -> MacroElement {
    let mut attrs = Vec::new();
    for attr in e.attributes().flatten() {
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_or_else(|_| String::from_utf8_lossy(&attr.value).into_owned(), |v| {
                v.into_owned()
            });
        attrs.push(Attr {
            key,
            value,
            line,
            column,
        });
    }
    MacroElement {
        tag: String::from_utf8_lossy(e.name().as_ref()).into_owned(),
        attrs,
        text: String::new(),
        vars: Vec::new(),
        children: Vec::new(),
        file: file.to_string(),
        line,
        column,
    }
}

/// Extract the (name, value) pair from a `<Set>` element.
fn set_binding(e: &BytesStart<'_>) -> Option<(String, String)> {
    Some((attribute_value(e, "name")?, attribute_value(e, "value")?))
}

/// Get an attribute value from a raw event.
fn attribute_value(e: &BytesStart<'_>, name: &str) -> Option<String> {
    for attr in e.attributes().flatten() {
        if attr.key.as_ref() == name.as_bytes() {
            return Some(
                attr.unescape_value()
                    .map_or_else(|_| String::from_utf8_lossy(&attr.value).into_owned(), |v| {
                        v.into_owned()
                    }),
            );
        }
    }
    None
}

/// Skip an element and all its children.
fn skip_element(reader: &mut Reader<&[u8]>, name: &[u8]) {
    let mut buf = Vec::new();
    let mut depth = 1;
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) if e.name().as_ref() == name => depth += 1,
            Ok(Event::End(ref e)) if e.name().as_ref() == name => {
                depth -= 1;
                if depth == 0 {
                    break;
                }
            }
            Ok(Event::Eof) | Err(_) => break,
            Ok(_) => {}
        }
        buf.clear();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn record(source: &str) -> Recorder {
        let mut recorder = Recorder::new();
        recorder.record_source(source, "test.gsd", None);
        recorder
    }

    #[test]
    fn test_records_macros() {
        let recorder = record(
            r#"
            <Simulation>
                <Scene name="main" stepLength="0.01"/>
                <Body name="ball">
                    <SphereMass name="m" value="1kg" radius="0.1"/>
                </Body>
            </Simulation>
            "#,
        );
        assert!(recorder.problems.is_empty(), "{}", recorder.problems);
        assert_eq!(recorder.registry.len(), 2);
        let key = ("ball".to_string(), "Body".to_string());
        let ball = recorder.registry.get(&key).unwrap();
        assert_eq!(ball.element.children.len(), 1);
        assert_eq!(ball.element.children[0].tag, "SphereMass");
    }

    #[test]
    fn test_duplicate_macro_is_problem() {
        let recorder = record(
            r#"
            <Simulation>
                <Scene name="main"/>
                <Body name="a"/>
                <Body name="a"/>
            </Simulation>
            "#,
        );
        assert_eq!(recorder.problems.len(), 1);
        assert!(recorder.problems.as_slice()[0]
            .message
            .contains("duplicate macro \"a Body\""));
    }

    #[test]
    fn test_same_name_different_kind_is_fine() {
        let recorder = record(
            r#"
            <Simulation>
                <Scene name="main"/>
                <Body name="wheel"/>
                <CylinderGeometry name="wheel" radius="0.1" height="0.05"/>
            </Simulation>
            "#,
        );
        assert!(recorder.problems.is_empty());
        assert_eq!(recorder.registry.len(), 3);
    }

    #[test]
    fn test_set_bindings() {
        let recorder = record(
            r#"
            <Simulation>
                <Set name="unit" value="0.1"/>
                <Set name="unit" value="0.5"/>
                <Scene name="main"/>
                <Body name="b">
                    <Set name="radius" value="0.2"/>
                </Body>
            </Simulation>
            "#,
        );
        assert!(recorder.problems.is_empty());
        // First definition wins at file level.
        assert_eq!(
            recorder.registry.globals,
            vec![("unit".to_string(), "0.1".to_string())]
        );
        let key = ("b".to_string(), "Body".to_string());
        let body = recorder.registry.get(&key).unwrap();
        assert_eq!(body.element.vars.len(), 1);
    }

    #[test]
    fn test_text_payload_recorded() {
        let recorder = record(
            r#"
            <Simulation>
                <Scene name="main"/>
                <Vertices name="tri">
                    0 0 0
                    1 0 0
                    0 1 0
                </Vertices>
            </Simulation>
            "#,
        );
        let key = ("tri".to_string(), "Vertices".to_string());
        let mac = recorder.registry.get(&key).unwrap();
        let numbers: Vec<&str> = mac.element.text.split_whitespace().collect();
        assert_eq!(numbers.len(), 9);
    }

    #[test]
    fn test_unnamed_macro_is_problem() {
        let recorder = record(
            r#"
            <Simulation>
                <Scene name="main"/>
                <Body/>
            </Simulation>
            "#,
        );
        assert_eq!(recorder.problems.len(), 1);
        assert!(recorder.problems.as_slice()[0].message.contains("name"));
    }

    #[test]
    fn test_malformed_xml_is_positioned_problem() {
        let recorder = record("<Simulation>\n  <Body name=\"a\">\n</Simulation>");
        assert!(!recorder.problems.is_empty());
        let p = &recorder.problems.as_slice()[0];
        assert!(p.line >= 2, "line was {}", p.line);
    }

    #[test]
    fn test_wrong_root_element() {
        let recorder = record("<Scene name=\"main\"/>");
        assert_eq!(recorder.problems.len(), 1);
        assert!(recorder.problems.as_slice()[0]
            .message
            .contains("expected <Simulation>"));
    }

    #[test]
    fn test_include_from_directory() {
        use std::io::Write;

        let dir = tempfile::tempdir().unwrap();
        let included = dir.path().join("shapes.gsd");
        let mut f = fs::File::create(&included).unwrap();
        writeln!(
            f,
            "<Simulation><SphereGeometry name=\"ball\" radius=\"0.1\"/></Simulation>"
        )
        .unwrap();

        let root = dir.path().join("scene.gsd");
        let mut f = fs::File::create(&root).unwrap();
        writeln!(
            f,
            "<Simulation><Include href=\"shapes.gsd\"/><Scene name=\"main\"/></Simulation>"
        )
        .unwrap();

        let mut recorder = Recorder::new();
        recorder.record_file(&root).unwrap();
        assert!(recorder.problems.is_empty(), "{}", recorder.problems);
        assert_eq!(recorder.registry.len(), 2);
    }

    #[test]
    fn test_missing_include_is_problem() {
        let recorder = record(
            r#"
            <Simulation>
                <Include href="missing.gsd"/>
                <Scene name="main"/>
            </Simulation>
            "#,
        );
        assert_eq!(recorder.problems.len(), 1);
        assert!(recorder.problems.as_slice()[0]
            .message
            .contains("missing.gsd"));
    }
}
