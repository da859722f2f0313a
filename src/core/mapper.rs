use crate::config::positions::{Origin, PositionEntry, PositionsConfig, LINE_HEIGHT_FACTOR};
use crate::config::receipt::ReceiptConfig;
use crate::domain::model::{PageSize, Placement, StudentRecord};
use crate::utils::error::{ReceiptError, Result};

/// Fallback text width when a position has no `max_width`, as a share of the page width.
pub const DEFAULT_MAX_WIDTH_PCT: f32 = 0.6;

/// Resolves a record against the template layout.
///
/// Blank or unknown values are left off the receipt. A required field that has a
/// value but no position is a configuration error for this record.
pub fn map_fields(
    record: &StudentRecord,
    receipt: &ReceiptConfig,
    positions: &PositionsConfig,
    page: PageSize,
) -> Result<Vec<Placement>> {
    let resolve = |key: &str| {
        record
            .value(key)
            .or_else(|| receipt.value(key))
            .map(str::trim)
            .filter(|value| !value.is_empty())
    };

    for required in &positions.required_fields {
        if resolve(required).is_some() && positions.entry(required).is_none() {
            return Err(ReceiptError::config(format!(
                "field '{}' has no position on the template",
                required
            )));
        }
    }

    let mut placements = Vec::with_capacity(positions.fields.len());
    for (key, entry) in &positions.fields {
        match resolve(key) {
            Some(text) => placements.push(place(key, text, entry, positions, page)),
            None => tracing::debug!(
                "Row {}: no value for '{}', leaving it blank",
                record.row,
                key
            ),
        }
    }

    Ok(placements)
}

pub fn place(
    key: &str,
    text: &str,
    entry: &PositionEntry,
    positions: &PositionsConfig,
    page: PageSize,
) -> Placement {
    let font_size = entry.font_size.unwrap_or(positions.font_size);
    let y = match positions.origin {
        Origin::BottomLeft => page.height * entry.y_pct,
        Origin::TopLeft => page.height * (1.0 - entry.y_pct),
    };

    Placement {
        key: key.to_string(),
        text: text.to_string(),
        x: page.width * entry.x_pct,
        y,
        max_width: entry
            .max_width
            .unwrap_or(page.width * DEFAULT_MAX_WIDTH_PCT),
        font_size,
        line_height: font_size * LINE_HEIGHT_FACTOR,
        overflow: entry.overflow,
    }
}
