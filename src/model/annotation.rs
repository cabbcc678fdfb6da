//! Vertex annotations of extended Newick strings.
//!
//! Values of `[&key=value,...]` blocks are captured by [AnnotationValue] as
//! `f64`, `i64`, or `String`.

// =#========================================================================#=
// ANNOTATION VALUE
// =#========================================================================#=
/// Enum to encapsulate a parsed annotation value.
#[derive(Debug, Clone, PartialEq)]
pub enum AnnotationValue {
    /// For floating point values
    Float(f64),
    /// For integer values
    Int(i64),
    /// For strings
    String(String),
}

impl AnnotationValue {
    /// Parses a raw annotation value, preferring integer over float over string.
    pub fn parse(raw: &str) -> Self {
        if let Ok(v) = raw.parse::<i64>() {
            AnnotationValue::Int(v)
        } else if let Ok(v) = raw.parse::<f64>() {
            AnnotationValue::Float(v)
        } else {
            AnnotationValue::String(raw.to_string())
        }
    }

    /// Returns the value as a float if it is numeric.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AnnotationValue::Float(v) => Some(*v),
            AnnotationValue::Int(v) => Some(*v as f64),
            AnnotationValue::String(_) => None,
        }
    }
}

impl From<f64> for AnnotationValue {
    fn from(v: f64) -> Self {
        AnnotationValue::Float(v)
    }
}

impl From<i64> for AnnotationValue {
    fn from(v: i64) -> Self {
        AnnotationValue::Int(v)
    }
}

impl From<&str> for AnnotationValue {
    fn from(v: &str) -> Self {
        AnnotationValue::String(v.to_string())
    }
}
