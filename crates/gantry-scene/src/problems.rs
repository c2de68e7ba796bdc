//! Accumulated scene-description problems.
//!
//! Parsing and scene construction do not stop at the first malformed
//! attribute: problems are collected as ordered, positioned records so a
//! scene author sees everything wrong with a file in one pass. A file with
//! any recorded problem is rejected as a whole; nothing is installed.

use thiserror::Error;

/// One positioned problem in a scene description file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Problem {
    /// File the problem was found in.
    pub file: String,
    /// 1-based line number.
    pub line: u32,
    /// 1-based column number.
    pub column: u32,
    /// Human-readable description.
    pub message: String,
}

impl std::fmt::Display for Problem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}:{}: {}",
            self.file, self.line, self.column, self.message
        )
    }
}

/// Ordered list of problems recorded while loading a scene description.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProblemList {
    problems: Vec<Problem>,
}

impl ProblemList {
    /// Create an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a problem.
    pub fn push(
        &mut self,
        file: impl Into<String>,
        line: u32,
        column: u32,
        message: impl Into<String>,
    ) {
        self.problems.push(Problem {
            file: file.into(),
            line,
            column,
            message: message.into(),
        });
    }

    /// Whether no problems were recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.problems.is_empty()
    }

    /// Number of recorded problems.
    #[must_use]
    pub fn len(&self) -> usize {
        self.problems.len()
    }

    /// Iterate over problems in recording order.
    pub fn iter(&self) -> impl Iterator<Item = &Problem> {
        self.problems.iter()
    }

    /// All recorded problems, in order.
    #[must_use]
    pub fn as_slice(&self) -> &[Problem] {
        &self.problems
    }
}

impl std::fmt::Display for ProblemList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, p) in self.problems.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{p}")?;
        }
        Ok(())
    }
}

impl IntoIterator for ProblemList {
    type Item = Problem;
    type IntoIter = std::vec::IntoIter<Problem>;

    fn into_iter(self) -> Self::IntoIter {
        self.problems.into_iter()
    }
}

/// Error returned when a scene description cannot be loaded.
#[derive(Debug, Error)]
pub enum SceneError {
    /// The file (or an included file) could not be read.
    #[error("failed to read '{path}': {source}")]
    Io {
        /// Path that failed.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Problems were recorded; the whole file is rejected.
    #[error("{}", .0)]
    Rejected(ProblemList),
}

impl SceneError {
    /// The recorded problems, if this is a rejection.
    #[must_use]
    pub fn problems(&self) -> Option<&ProblemList> {
        match self {
            Self::Rejected(list) => Some(list),
            Self::Io { .. } => None,
        }
    }
}

/// Result type for scene loading.
pub type Result<T> = std::result::Result<T, SceneError>;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_problem_display() {
        let mut list = ProblemList::new();
        list.push("robot.gsd", 12, 7, "unexpected attribute \"color\"");
        list.push("robot.gsd", 14, 3, "expected element <Axis>");

        let text = list.to_string();
        assert!(text.contains("robot.gsd:12:7"));
        assert!(text.contains("expected element <Axis>"));
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn test_rejected_error_carries_problems() {
        let mut list = ProblemList::new();
        list.push("a.gsd", 1, 1, "duplicate macro \"box Body\"");
        let err = SceneError::Rejected(list);
        assert_eq!(err.problems().unwrap().len(), 1);
        assert!(err.to_string().contains("duplicate macro"));
    }
}
