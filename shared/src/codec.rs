//! Conversion between a captured pointer path and the `Stroke` record that
//! travels on the wire and lives in the operation log.
//!
//! Encoding is lossless: values are validated, never clamped. A path that
//! would not survive the round trip unchanged is refused.

use crate::{CompositeMode, Point, Stroke, StrokeId, UserId};

pub const MAX_POINTS_PER_STROKE: usize = 5000;
pub const MAX_STROKE_WIDTH: f32 = 60.0;
pub const MAX_COLOR_LEN: usize = 32;

#[derive(Clone, Debug, PartialEq)]
pub struct Brush {
    pub color: String,
    pub width: f32,
    pub mode: CompositeMode,
}

impl Default for Brush {
    fn default() -> Self {
        Self {
            color: "#000000".to_string(),
            width: 3.0,
            mode: CompositeMode::Normal,
        }
    }
}

/// What the pointer capture produces on pointer-up.
#[derive(Clone, Debug, PartialEq)]
pub struct CapturedPath {
    pub points: Vec<Point>,
    pub brush: Brush,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EncodingError {
    #[error("stroke path is empty")]
    EmptyPath,
    #[error("point {index} is not finite")]
    NonFinitePoint { index: usize },
    #[error("stroke has {len} points, limit is {max}", max = MAX_POINTS_PER_STROKE)]
    TooManyPoints { len: usize },
    #[error("stroke width {0} is outside (0, {max}]", max = MAX_STROKE_WIDTH)]
    InvalidWidth(f32),
    #[error("stroke color must be 1..={max} bytes", max = MAX_COLOR_LEN)]
    InvalidColor,
    #[error("stroke author is invalid")]
    InvalidAuthor,
}

pub fn encode(path: CapturedPath, id: StrokeId, author: UserId) -> Result<Stroke, EncodingError> {
    let stroke = Stroke {
        id,
        author,
        color: path.brush.color,
        width: path.brush.width,
        mode: path.brush.mode,
        points: path.points,
    };
    validate(&stroke)?;
    Ok(stroke)
}

pub fn decode(stroke: &Stroke) -> CapturedPath {
    CapturedPath {
        points: stroke.points.clone(),
        brush: Brush {
            color: stroke.color.clone(),
            width: stroke.width,
            mode: stroke.mode,
        },
    }
}

/// Well-formedness check applied both at the source and on submission.
pub fn validate(stroke: &Stroke) -> Result<(), EncodingError> {
    if stroke.points.is_empty() {
        return Err(EncodingError::EmptyPath);
    }
    if stroke.points.len() > MAX_POINTS_PER_STROKE {
        return Err(EncodingError::TooManyPoints {
            len: stroke.points.len(),
        });
    }
    if let Some(index) = stroke.points.iter().position(|point| !point.is_finite()) {
        return Err(EncodingError::NonFinitePoint { index });
    }
    if !stroke.width.is_finite() || stroke.width <= 0.0 || stroke.width > MAX_STROKE_WIDTH {
        return Err(EncodingError::InvalidWidth(stroke.width));
    }
    if stroke.color.is_empty() || stroke.color.len() > MAX_COLOR_LEN {
        return Err(EncodingError::InvalidColor);
    }
    if !stroke.author.is_valid() {
        return Err(EncodingError::InvalidAuthor);
    }
    Ok(())
}

#[cfg(test)]
#[path = "codec_test.rs"]
mod tests;
