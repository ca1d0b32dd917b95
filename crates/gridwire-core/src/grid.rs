//! Grid geometry, coordinate validation and grid names

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Default grid width
pub const DEFAULT_WIDTH: u32 = 20;

/// Default grid height
pub const DEFAULT_HEIGHT: u32 = 20;

/// Maximum length of a grid instance name
pub const MAX_GRID_NAME_LEN: usize = 64;

/// Upper bound on `width * height`; whole-grid reads materialize every cell
pub const MAX_CELLS: u64 = 1_000_000;

/// Full grid contents, `height` rows of `width` strings
pub type GridMatrix = Vec<Vec<String>>;

/// Fixed size of a grid, chosen at process start
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridDimensions {
    pub width: u32,
    pub height: u32,
}

impl Default for GridDimensions {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
        }
    }
}

impl GridDimensions {
    /// Create dimensions; both sides at least 1, at most [`MAX_CELLS`] cells
    pub fn new(width: u32, height: u32) -> Option<Self> {
        if width == 0 || height == 0 || u64::from(width) * u64::from(height) > MAX_CELLS {
            return None;
        }
        Some(Self { width, height })
    }

    /// Reject coordinates outside `[0, width) x [0, height)`
    pub fn check(&self, x: i64, y: i64) -> Result<(), ValidationError> {
        if self.contains(x, y) {
            Ok(())
        } else {
            Err(ValidationError::OutOfBounds {
                x,
                y,
                max_x: self.width - 1,
                max_y: self.height - 1,
            })
        }
    }

    pub fn contains(&self, x: i64, y: i64) -> bool {
        x >= 0 && x < i64::from(self.width) && y >= 0 && y < i64::from(self.height)
    }

    /// An all-empty matrix of this size
    pub fn empty_matrix(&self) -> GridMatrix {
        vec![vec![String::new(); self.width as usize]; self.height as usize]
    }
}

/// Convert a JSON number to a whole-number coordinate.
///
/// Fractions and non-finite values are `NonInteger`; whole numbers too large
/// for `i64` are `CoordinateOutOfRange` carrying the number as sent. Nothing
/// is rounded or clamped.
pub fn coordinate_from_json(n: &serde_json::Number) -> Result<i64, ValidationError> {
    if let Some(v) = n.as_i64() {
        return Ok(v);
    }
    if n.is_u64() {
        return Err(ValidationError::CoordinateOutOfRange(n.to_string()));
    }
    match n.as_f64() {
        Some(f) if f.is_finite() && f.fract() == 0.0 => {
            if f.abs() < 9.0e15 {
                Ok(f as i64)
            } else {
                Err(ValidationError::CoordinateOutOfRange(n.to_string()))
            }
        }
        _ => Err(ValidationError::NonInteger(n.to_string())),
    }
}

/// Name addressing one grid instance
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridName(String);

impl GridName {
    /// Validate a name: 1 to 64 characters of `[A-Za-z0-9_-]`
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let valid = !raw.is_empty()
            && raw.len() <= MAX_GRID_NAME_LEN
            && raw
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if valid {
            Ok(Self(raw.to_string()))
        } else {
            Err(ValidationError::InvalidGridName(raw.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for GridName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
