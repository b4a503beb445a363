//! Grid partition geometry: image size + rows/cols/gap -> pixel rectangles.

use crate::error::{Result, SnipError};
use serde::Serialize;

/// One grid cell's pixel region within the source image.
///
/// `index` is the 0-based position in row-major traversal order
/// (row 0 left to right, then row 1, ...).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct TileRect {
    pub index: usize,
    pub row: u32,
    pub col: u32,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

fn positive(value: i64, name: &'static str) -> Result<()> {
    if value <= 0 {
        return Err(SnipError::NonPositive { name, value });
    }
    Ok(())
}

fn image_dimension(value: i64, name: &'static str) -> Result<()> {
    positive(value, name)?;
    if value > u32::MAX as i64 {
        return Err(SnipError::OversizedDimension {
            name,
            value,
            max: u32::MAX,
        });
    }
    Ok(())
}

/// Validate rows/cols/gap alone, before an image is chosen.
/// Each bad parameter is a distinct error.
pub fn validate_grid(rows: i64, cols: i64, gap: i64) -> Result<()> {
    positive(rows, "rows")?;
    positive(cols, "cols")?;
    if gap < 0 {
        return Err(SnipError::NegativeGap(gap));
    }
    Ok(())
}

/// Partition an image into `rows` x `cols` rectangles separated by `gap`
/// pixels, in row-major order.
///
/// Base tile size is the floor of the gap-adjusted dimension divided by the
/// count; the last column/row absorbs the remainder so every pixel belongs
/// to exactly one tile or one gap band.
pub fn partition(
    image_width: i64,
    image_height: i64,
    rows: i64,
    cols: i64,
    gap: i64,
) -> Result<Vec<TileRect>> {
    validate_grid(rows, cols, gap)?;
    image_dimension(image_width, "image_width")?;
    image_dimension(image_height, "image_height")?;

    // A gap span too large for i64 certainly exceeds the image.
    let gap_span_w = (cols - 1)
        .checked_mul(gap)
        .ok_or(SnipError::GridTooLarge)?;
    let gap_span_h = (rows - 1)
        .checked_mul(gap)
        .ok_or(SnipError::GridTooLarge)?;
    let available_width = image_width - gap_span_w;
    let available_height = image_height - gap_span_h;
    if available_width <= 0 || available_height <= 0 {
        return Err(SnipError::GridTooLarge);
    }

    let base_width = available_width / cols;
    let base_height = available_height / rows;
    if base_width <= 0 || base_height <= 0 {
        return Err(SnipError::GridTooLarge);
    }
    let width_remainder = available_width - base_width * cols;
    let height_remainder = available_height - base_height * rows;

    let mut rects = Vec::with_capacity((rows * cols) as usize);
    let mut index = 0usize;
    let mut y = 0i64;

    for row in 0..rows {
        let height = if row == rows - 1 {
            base_height + height_remainder
        } else {
            base_height
        };
        let mut x = 0i64;

        for col in 0..cols {
            let width = if col == cols - 1 {
                base_width + width_remainder
            } else {
                base_width
            };
            rects.push(TileRect {
                index,
                row: row as u32,
                col: col as u32,
                x: x as u32,
                y: y as u32,
                width: width as u32,
                height: height as u32,
            });
            index += 1;
            x += width;
            if col < cols - 1 {
                x += gap;
            }
        }

        y += height;
        if row < rows - 1 {
            y += gap;
        }
    }

    Ok(rects)
}
