//! CSS colours for exported diagrams.
//!
//! [`Color`] wraps the `DynamicColor` type of the color crate so that style
//! settings can be written as any CSS colour string and handed straight to
//! the SVG builder.

use std::{
    fmt,
    hash::{Hash, Hasher},
    str::FromStr,
};

use color::DynamicColor;

/// A parsed CSS colour.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Color {
    color: DynamicColor,
}

impl Eq for Color {}

impl Hash for Color {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.to_string().hash(state);
    }
}

impl Color {
    /// Parses a CSS colour string such as `"#ff0000"`, `"rgb(255, 0, 0)"` or `"red"`.
    ///
    /// # Examples
    ///
    /// ```
    /// use planum::color::Color;
    ///
    /// let stroke = Color::new("#22242a").unwrap();
    /// assert!(Color::new("not-a-color").is_err());
    /// # let _ = stroke;
    /// ```
    pub fn new(color_str: &str) -> Result<Self, String> {
        match DynamicColor::from_str(color_str) {
            Ok(color) => Ok(Self { color }),
            Err(err) => Err(format!("invalid color `{color_str}`: {err}")),
        }
    }

    /// Returns a copy with the given alpha (0.0 transparent, 1.0 opaque).
    pub fn with_alpha(self, alpha: f32) -> Self {
        Color {
            color: self.color.with_alpha(alpha),
        }
    }

    pub fn alpha(&self) -> f32 {
        self.color.components[3]
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::new("black").expect("'black' is a valid CSS color")
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.color)
    }
}

impl From<&Color> for svg::node::Value {
    fn from(color: &Color) -> Self {
        Self::from(color.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_new() {
        assert!(Color::new("#22242a").is_ok());
        assert!(Color::new("rgb(255, 0, 0)").is_ok());

        let err = Color::new("chartreuse-ish").unwrap_err();
        assert!(err.starts_with("invalid color `chartreuse-ish`"));
    }

    #[test]
    fn test_color_default() {
        assert_eq!(Color::default().to_string(), "black");
    }

    #[test]
    fn test_color_with_alpha() {
        let fill = Color::new("white").unwrap().with_alpha(0.25);
        assert!((fill.alpha() - 0.25).abs() < 0.001);
    }

    #[test]
    fn test_color_eq_hash() {
        use std::collections::HashSet;

        let a = Color::new("red").unwrap();
        let b = Color::new("red").unwrap();
        let c = Color::new("blue").unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);

        let set: HashSet<Color> = [a].into_iter().collect();
        assert!(set.contains(&b));
        assert!(!set.contains(&c));
    }
}
