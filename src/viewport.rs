use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// Browser window dimensions, parseable from `WIDTHxHEIGHT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

#[derive(Debug, Error)]
pub enum ViewportParseError {
    #[error("Invalid viewport format: expected WIDTHxHEIGHT (e.g., 1280x720)")]
    InvalidFormat,
    #[error("Invalid dimension '{0}': not a number")]
    InvalidDimension(String),
    #[error("Viewport dimensions must be positive")]
    ZeroDimension,
}

impl FromStr for Viewport {
    type Err = ViewportParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (width, height) = s.split_once('x').ok_or(ViewportParseError::InvalidFormat)?;
        if height.contains('x') {
            return Err(ViewportParseError::InvalidFormat);
        }

        let parse = |part: &str| -> Result<u32, ViewportParseError> {
            part.trim()
                .parse()
                .map_err(|_| ViewportParseError::InvalidDimension(part.trim().to_string()))
        };
        let width = parse(width)?;
        let height = parse(height)?;

        if width == 0 || height == 0 {
            return Err(ViewportParseError::ZeroDimension);
        }
        Ok(Viewport { width, height })
    }
}

impl std::fmt::Display for Viewport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}
