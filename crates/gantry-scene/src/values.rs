//! Unit-aware attribute and value parsing.
//!
//! Element handlers pull typed values out of an [`AttributeMap`]; each read
//! marks the attribute consumed so leftovers can be reported after the
//! handler ran. Numeric getters accept an optional trailing unit suffix and
//! normalize to SI. Constraint violations are recoverable: the problem is
//! queued and a usable (clamped or default) value is still returned so
//! parsing can continue and surface further problems.

use gantry_types::Rgba;

use crate::problems::ProblemList;

/// Maximum number of attributes in one (possibly ref-merged) attribute set.
pub const MAX_ATTRIBUTES: usize = 64;

/// One attribute with its source position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attr {
    /// Attribute key.
    pub key: String,
    /// Attribute value after placeholder substitution.
    pub value: String,
    /// 1-based line of the element carrying the attribute.
    pub line: u32,
    /// 1-based column of the element carrying the attribute.
    pub column: u32,
}

/// A consumed-tracking attribute set for one element instance.
#[derive(Debug, Clone)]
pub struct AttributeMap {
    file: String,
    element: String,
    line: u32,
    column: u32,
    attrs: Vec<Attr>,
    consumed: u64,
}

impl AttributeMap {
    /// Create an attribute map for an element at the given position.
    #[must_use]
    pub fn new(
        file: impl Into<String>,
        element: impl Into<String>,
        line: u32,
        column: u32,
        attrs: Vec<Attr>,
    ) -> Self {
        debug_assert!(attrs.len() <= MAX_ATTRIBUTES);
        Self {
            file: file.into(),
            element: element.into(),
            line,
            column,
            attrs,
            consumed: 0,
        }
    }

    /// The element type name this map belongs to.
    #[must_use]
    pub fn element(&self) -> &str {
        &self.element
    }

    /// Source position of the element.
    #[must_use]
    pub fn position(&self) -> (u32, u32) {
        (self.line, self.column)
    }

    /// Source file of the element.
    #[must_use]
    pub fn file(&self) -> &str {
        &self.file
    }

    fn find(&mut self, key: &str) -> Option<usize> {
        let idx = self.attrs.iter().position(|a| a.key == key)?;
        self.consumed |= 1 << idx;
        Some(idx)
    }

    /// Read a string attribute, or `None` if absent.
    pub fn get_string(&mut self, key: &str) -> Option<String> {
        let idx = self.find(key)?;
        Some(self.attrs[idx].value.clone())
    }

    /// Read a required string attribute; queues a problem if absent.
    pub fn require_string(&mut self, key: &str, problems: &mut ProblemList) -> Option<String> {
        let value = self.get_string(key);
        if value.is_none() {
            problems.push(
                self.file.clone(),
                self.line,
                self.column,
                format!(
                    "missing attribute \"{key}\" on element <{}>",
                    self.element
                ),
            );
        }
        value
    }

    /// Read a boolean attribute (`true` / `false`).
    pub fn get_bool(&mut self, key: &str, default: bool, problems: &mut ProblemList) -> bool {
        let Some(idx) = self.find(key) else {
            return default;
        };
        let attr = &self.attrs[idx];
        match attr.value.as_str() {
            "true" => true,
            "false" => false,
            other => {
                let (line, column, file) = (attr.line, attr.column, self.file.clone());
                let msg = format!("invalid boolean \"{other}\" for attribute \"{key}\"");
                problems.push(file, line, column, msg);
                default
            }
        }
    }

    /// Read an integer attribute.
    pub fn get_int(&mut self, key: &str, default: i64, problems: &mut ProblemList) -> i64 {
        let Some(idx) = self.find(key) else {
            return default;
        };
        let attr = &self.attrs[idx];
        match attr.value.parse::<i64>() {
            Ok(v) => v,
            Err(_) => {
                let (line, column, file) = (attr.line, attr.column, self.file.clone());
                let msg = format!("invalid integer \"{}\" for attribute \"{key}\"", attr.value);
                problems.push(file, line, column, msg);
                default
            }
        }
    }

    /// Read a non-negative integer attribute.
    pub fn get_uint(&mut self, key: &str, default: u32, problems: &mut ProblemList) -> u32 {
        let v = self.get_int(key, i64::from(default), problems);
        if v < 0 {
            self.problem(problems, format!("attribute \"{key}\" must not be negative"));
            return default;
        }
        u32::try_from(v).unwrap_or(default)
    }

    /// Read a plain (unitless) float attribute.
    pub fn get_float(&mut self, key: &str, default: f64, problems: &mut ProblemList) -> f64 {
        self.quantity(key, Quantity::Plain, default, problems)
    }

    /// Read a float constrained to `[min, max]`; out-of-range values are
    /// clamped and a problem is queued.
    pub fn get_float_minmax(
        &mut self,
        key: &str,
        default: f64,
        min: f64,
        max: f64,
        problems: &mut ProblemList,
    ) -> f64 {
        let v = self.quantity(key, Quantity::Plain, default, problems);
        if v < min || v > max {
            self.problem(
                problems,
                format!("attribute \"{key}\" must be in [{min}, {max}], got {v}"),
            );
            return v.clamp(min, max);
        }
        v
    }

    /// Read a length attribute (`mm`, `cm`, `m`, `km`; meters by default).
    pub fn get_length(&mut self, key: &str, default: f64, problems: &mut ProblemList) -> f64 {
        self.quantity(key, Quantity::Length, default, problems)
    }

    /// Read a length that must be positive. With `allow_zero`, zero passes.
    /// Violations queue a problem and return the value anyway.
    pub fn get_length_positive(
        &mut self,
        key: &str,
        default: f64,
        allow_zero: bool,
        problems: &mut ProblemList,
    ) -> f64 {
        let v = self.quantity(key, Quantity::Length, default, problems);
        if v < 0.0 || (!allow_zero && v == 0.0) {
            let requirement = if allow_zero { ">= 0" } else { "> 0" };
            self.problem(
                problems,
                format!("attribute \"{key}\" must be {requirement}, got {v}"),
            );
        }
        v
    }

    /// Read an angle attribute (`degree`, `radian`; radians by default).
    pub fn get_angle(&mut self, key: &str, default: f64, problems: &mut ProblemList) -> f64 {
        self.quantity(key, Quantity::Angle, default, problems)
    }

    /// Read a mass attribute (`g`, `kg`; kilograms by default).
    pub fn get_mass(&mut self, key: &str, default: f64, problems: &mut ProblemList) -> f64 {
        self.quantity(key, Quantity::Mass, default, problems)
    }

    /// Read a mass that must be non-zero positive.
    pub fn get_mass_positive(
        &mut self,
        key: &str,
        default: f64,
        problems: &mut ProblemList,
    ) -> f64 {
        let v = self.quantity(key, Quantity::Mass, default, problems);
        if v <= 0.0 {
            self.problem(
                problems,
                format!("attribute \"{key}\" must be > 0, got {v}"),
            );
        }
        v
    }

    /// Read a time attribute (`s`; seconds by default), must be positive.
    pub fn get_time_positive(
        &mut self,
        key: &str,
        default: f64,
        problems: &mut ProblemList,
    ) -> f64 {
        let v = self.quantity(key, Quantity::Time, default, problems);
        if v <= 0.0 {
            self.problem(
                problems,
                format!("attribute \"{key}\" must be > 0, got {v}"),
            );
        }
        v
    }

    /// Read a velocity attribute (`m/s`, `km/h`).
    pub fn get_velocity(&mut self, key: &str, default: f64, problems: &mut ProblemList) -> f64 {
        self.quantity(key, Quantity::Velocity, default, problems)
    }

    /// Read an angular velocity attribute (`degree/s`, `radian/s`).
    pub fn get_angular_velocity(
        &mut self,
        key: &str,
        default: f64,
        problems: &mut ProblemList,
    ) -> f64 {
        self.quantity(key, Quantity::AngularVelocity, default, problems)
    }

    /// Read a color attribute.
    pub fn get_color(&mut self, key: &str, default: Rgba, problems: &mut ProblemList) -> Rgba {
        let Some(idx) = self.find(key) else {
            return default;
        };
        let attr = &self.attrs[idx];
        match parse_color(&attr.value) {
            Ok(c) => c,
            Err(message) => {
                let (line, column, file) = (attr.line, attr.column, self.file.clone());
                problems.push(file, line, column, message);
                default
            }
        }
    }

    /// Report every attribute that no getter consumed.
    pub fn report_unused(&self, problems: &mut ProblemList) {
        for (idx, attr) in self.attrs.iter().enumerate() {
            if self.consumed & (1 << idx) == 0 {
                problems.push(
                    self.file.clone(),
                    attr.line,
                    attr.column,
                    format!(
                        "unexpected attribute \"{}\" on element <{}>",
                        attr.key, self.element
                    ),
                );
            }
        }
    }

    fn quantity(
        &mut self,
        key: &str,
        quantity: Quantity,
        default: f64,
        problems: &mut ProblemList,
    ) -> f64 {
        let Some(idx) = self.find(key) else {
            return default;
        };
        let attr = &self.attrs[idx];
        match parse_quantity(&attr.value, quantity) {
            Ok(v) => v,
            Err(message) => {
                let (line, column, file) = (attr.line, attr.column, self.file.clone());
                problems.push(
                    file,
                    line,
                    column,
                    format!("attribute \"{key}\": {message}"),
                );
                default
            }
        }
    }

    fn problem(&self, problems: &mut ProblemList, message: String) {
        problems.push(self.file.clone(), self.line, self.column, message);
    }
}

/// Physical quantity kinds with their accepted unit suffixes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Quantity {
    Plain,
    Length,
    Angle,
    Mass,
    Time,
    Velocity,
    AngularVelocity,
}

impl Quantity {
    /// Suffix table, longest first so `mm` wins over `m`.
    fn suffixes(self) -> &'static [(&'static str, f64)] {
        match self {
            Self::Plain => &[],
            Self::Length => &[("mm", 0.001), ("cm", 0.01), ("km", 1000.0), ("m", 1.0)],
            Self::Angle => &[
                ("degree", std::f64::consts::PI / 180.0),
                ("radian", 1.0),
            ],
            Self::Mass => &[("kg", 1.0), ("g", 0.001)],
            Self::Time => &[("s", 1.0)],
            Self::Velocity => &[("km/h", 1.0 / 3.6), ("m/s", 1.0)],
            Self::AngularVelocity => &[
                ("degree/s", std::f64::consts::PI / 180.0),
                ("radian/s", 1.0),
            ],
        }
    }
}

/// Parse a numeric value with an optional unit suffix, normalized to SI.
fn parse_quantity(value: &str, quantity: Quantity) -> std::result::Result<f64, String> {
    let value = value.trim();
    if let Ok(v) = value.parse::<f64>() {
        return Ok(v);
    }
    for (suffix, factor) in quantity.suffixes() {
        if let Some(prefix) = value.strip_suffix(suffix) {
            let prefix = prefix.trim_end();
            if let Ok(v) = prefix.parse::<f64>() {
                return Ok(v * factor);
            }
        }
    }
    Err(format!("invalid numeric value \"{value}\""))
}

/// Parse a color in one of the supported forms:
/// `#rgb`, `#rgba`, `#rrggbb`, `#rrggbbaa`, `rgb(r, g, b)`, `rgba(r, g, b, a)`.
/// The `rgb`/`rgba` component forms accept integers 0-255 or percentages.
pub fn parse_color(value: &str) -> std::result::Result<Rgba, String> {
    let value = value.trim();
    if let Some(hex) = value.strip_prefix('#') {
        return parse_hex_color(hex).ok_or_else(|| format!("invalid color \"{value}\""));
    }
    if let Some(body) = value
        .strip_prefix("rgba(")
        .and_then(|rest| rest.strip_suffix(')'))
    {
        return parse_fn_color(body, true).ok_or_else(|| format!("invalid color \"{value}\""));
    }
    if let Some(body) = value
        .strip_prefix("rgb(")
        .and_then(|rest| rest.strip_suffix(')'))
    {
        return parse_fn_color(body, false).ok_or_else(|| format!("invalid color \"{value}\""));
    }
    Err(format!("invalid color \"{value}\""))
}

fn parse_hex_color(hex: &str) -> Option<Rgba> {
    let nibble = |c: char| c.to_digit(16).map(|d| d as u8);
    let chars: Vec<u8> = hex.chars().map(nibble).collect::<Option<_>>()?;
    match chars.len() {
        // #rgb / #rgba: each nibble doubled
        3 | 4 => {
            let expand = |n: u8| n << 4 | n;
            let a = if chars.len() == 4 {
                expand(chars[3])
            } else {
                255
            };
            Some(Rgba::from_bytes(
                expand(chars[0]),
                expand(chars[1]),
                expand(chars[2]),
                a,
            ))
        }
        6 | 8 => {
            let byte = |i: usize| chars[i] << 4 | chars[i + 1];
            let a = if chars.len() == 8 { byte(6) } else { 255 };
            Some(Rgba::from_bytes(byte(0), byte(2), byte(4), a))
        }
        _ => None,
    }
}

fn parse_fn_color(body: &str, with_alpha: bool) -> Option<Rgba> {
    let parts: Vec<&str> = body.split(',').map(str::trim).collect();
    if parts.len() != if with_alpha { 4 } else { 3 } {
        return None;
    }
    let component = |s: &str| -> Option<f32> {
        if let Some(pct) = s.strip_suffix('%') {
            let v: f32 = pct.trim().parse().ok()?;
            Some((v / 100.0).clamp(0.0, 1.0))
        } else {
            let v: f32 = s.parse().ok()?;
            Some((v / 255.0).clamp(0.0, 1.0))
        }
    };
    let r = component(parts[0])?;
    let g = component(parts[1])?;
    let b = component(parts[2])?;
    let a = if with_alpha {
        // Alpha is a plain 0..1 value (percentage also accepted).
        let s = parts[3];
        if let Some(pct) = s.strip_suffix('%') {
            (pct.trim().parse::<f32>().ok()? / 100.0).clamp(0.0, 1.0)
        } else {
            s.parse::<f32>().ok()?.clamp(0.0, 1.0)
        }
    } else {
        1.0
    };
    Some(Rgba::new(r, g, b, a))
}

/// Outcome of placeholder substitution over one string.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlaceholderUse {
    /// At least one placeholder appeared in the input.
    pub any: bool,
    /// At least one placeholder could not be resolved.
    pub unresolved: bool,
}

impl PlaceholderUse {
    /// Merge with another outcome.
    #[must_use]
    pub fn merge(self, other: Self) -> Self {
        Self {
            any: self.any || other.any,
            unresolved: self.unresolved || other.unresolved,
        }
    }
}

/// Substitute `$name`, `$(name)` and `${name}` placeholders.
///
/// `lookup` walks the chain of enclosing element scopes outward. Unresolved
/// placeholders are left verbatim; optional templating is not an error.
pub fn substitute_placeholders(
    input: &str,
    lookup: &dyn Fn(&str) -> Option<String>,
) -> (String, PlaceholderUse) {
    if !input.contains('$') {
        return (input.to_string(), PlaceholderUse::default());
    }

    let mut out = String::with_capacity(input.len());
    let mut usage = PlaceholderUse::default();
    let bytes = input.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'$' {
            // Advance over one full UTF-8 character.
            let ch_len = input[i..].chars().next().map_or(1, char::len_utf8);
            out.push_str(&input[i..i + ch_len]);
            i += ch_len;
            continue;
        }

        usage.any = true;
        let rest = &input[i + 1..];
        let (name, consumed) = if let Some(stripped) = rest.strip_prefix('(') {
            match stripped.find(')') {
                Some(end) => (&stripped[..end], end + 3),
                None => ("", 0),
            }
        } else if let Some(stripped) = rest.strip_prefix('{') {
            match stripped.find('}') {
                Some(end) => (&stripped[..end], end + 3),
                None => ("", 0),
            }
        } else {
            let end = rest
                .find(|c: char| !c.is_ascii_alphanumeric() && c != '_')
                .unwrap_or(rest.len());
            (&rest[..end], end + 1)
        };

        if name.is_empty() {
            // A bare `$` or unterminated form stays verbatim.
            usage.unresolved = true;
            out.push('$');
            i += 1;
            continue;
        }

        match lookup(name) {
            Some(binding) => {
                out.push_str(&binding);
                i += consumed;
            }
            None => {
                usage.unresolved = true;
                out.push_str(&input[i..i + consumed]);
                i += consumed;
            }
        }
    }

    (out, usage)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn map(attrs: &[(&str, &str)]) -> AttributeMap {
        let attrs = attrs
            .iter()
            .map(|(k, v)| Attr {
                key: (*k).to_string(),
                value: (*v).to_string(),
                line: 1,
                column: 1,
            })
            .collect();
        AttributeMap::new("test.gsd", "Test", 1, 1, attrs)
    }

    #[test]
    fn test_length_unit_normalization() {
        let mut problems = ProblemList::new();
        let mut a = map(&[("a", "5cm"), ("b", "0.05m"), ("c", "50mm"), ("d", "0.00005km")]);
        let v1 = a.get_length("a", 0.0, &mut problems);
        let v2 = a.get_length("b", 0.0, &mut problems);
        let v3 = a.get_length("c", 0.0, &mut problems);
        let v4 = a.get_length("d", 0.0, &mut problems);
        assert_relative_eq!(v1, 0.05, epsilon = 1e-12);
        assert_relative_eq!(v1, v2, epsilon = 1e-12);
        assert_relative_eq!(v1, v3, epsilon = 1e-12);
        assert_relative_eq!(v1, v4, epsilon = 1e-12);
        assert!(problems.is_empty());
    }

    #[test]
    fn test_angle_unit_normalization() {
        let mut problems = ProblemList::new();
        let mut a = map(&[("a", "180degree"), ("b", "3.14159265358979radian")]);
        let deg = a.get_angle("a", 0.0, &mut problems);
        let rad = a.get_angle("b", 0.0, &mut problems);
        assert_relative_eq!(deg, std::f64::consts::PI, epsilon = 1e-10);
        assert_relative_eq!(deg, rad, epsilon = 1e-10);
    }

    #[test]
    fn test_mass_and_time_units() {
        let mut problems = ProblemList::new();
        let mut a = map(&[("m", "250g"), ("t", "0.5s"), ("v", "36km/h")]);
        assert_relative_eq!(a.get_mass("m", 0.0, &mut problems), 0.25, epsilon = 1e-12);
        assert_relative_eq!(
            a.get_time_positive("t", 1.0, &mut problems),
            0.5,
            epsilon = 1e-12
        );
        assert_relative_eq!(a.get_velocity("v", 0.0, &mut problems), 10.0, epsilon = 1e-12);
        assert!(problems.is_empty());
    }

    #[test]
    fn test_constraint_violation_is_recoverable() {
        let mut problems = ProblemList::new();
        let mut a = map(&[("radius", "-2"), ("ratio", "7")]);
        // Value is still returned, problem queued; parsing continues.
        let r = a.get_length_positive("radius", 1.0, false, &mut problems);
        assert_relative_eq!(r, -2.0, epsilon = 1e-12);
        let c = a.get_float_minmax("ratio", 0.0, 0.0, 1.0, &mut problems);
        assert_relative_eq!(c, 1.0, epsilon = 1e-12);
        assert_eq!(problems.len(), 2);
    }

    #[test]
    fn test_invalid_number_uses_default() {
        let mut problems = ProblemList::new();
        let mut a = map(&[("x", "abc")]);
        let v = a.get_float("x", 42.0, &mut problems);
        assert_relative_eq!(v, 42.0, epsilon = 1e-12);
        assert_eq!(problems.len(), 1);
    }

    #[test]
    fn test_unused_attributes_reported() {
        let mut problems = ProblemList::new();
        let mut a = map(&[("used", "1"), ("stray", "2")]);
        let _ = a.get_float("used", 0.0, &mut problems);
        a.report_unused(&mut problems);
        assert_eq!(problems.len(), 1);
        assert!(problems.as_slice()[0].message.contains("stray"));
    }

    #[test]
    fn test_color_forms() {
        let c = parse_color("#f00").unwrap();
        assert_relative_eq!(c.r, 1.0, epsilon = 1e-6);
        assert_relative_eq!(c.g, 0.0, epsilon = 1e-6);

        let c = parse_color("#80ff0040").unwrap();
        assert_relative_eq!(c.a, 64.0 / 255.0, epsilon = 1e-6);

        let c = parse_color("rgb(255, 0, 51)").unwrap();
        assert_relative_eq!(c.b, 0.2, epsilon = 1e-6);

        let c = parse_color("rgb(100%, 50%, 0%)").unwrap();
        assert_relative_eq!(c.g, 0.5, epsilon = 1e-6);

        let c = parse_color("rgba(0, 0, 0, 0.25)").unwrap();
        assert_relative_eq!(c.a, 0.25, epsilon = 1e-6);

        assert!(parse_color("#12345").is_err());
        assert!(parse_color("blue").is_err());
    }

    #[test]
    fn test_placeholder_forms() {
        let lookup = |name: &str| match name {
            "size" => Some("0.3".to_string()),
            "color" => Some("#f00".to_string()),
            _ => None,
        };
        let (s, usage) = substitute_placeholders("$size", &lookup);
        assert_eq!(s, "0.3");
        assert!(usage.any && !usage.unresolved);

        let (s, _) = substitute_placeholders("$(size)m", &lookup);
        assert_eq!(s, "0.3m");

        let (s, _) = substitute_placeholders("${color}", &lookup);
        assert_eq!(s, "#f00");
    }

    #[test]
    fn test_unresolved_placeholder_left_verbatim() {
        let lookup = |_: &str| None;
        let (s, usage) = substitute_placeholders("$missing and $(gone)", &lookup);
        assert_eq!(s, "$missing and $(gone)");
        assert!(usage.any && usage.unresolved);
    }

    #[test]
    fn test_no_placeholder_fast_path() {
        let lookup = |_: &str| Some("x".to_string());
        let (s, usage) = substitute_placeholders("plain text", &lookup);
        assert_eq!(s, "plain text");
        assert!(!usage.any);
    }
}
