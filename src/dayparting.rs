//! Dayparting encoder.
//!
//! The UI shows a week grid starting on Sunday. The platform expects a
//! 168-character string of `'0'`/`'1'` flags starting on Monday, 24 hours per
//! day. No timezone conversion happens here: the bitmap is read by the
//! platform in its own local time, independent of the ad group's timezone.

use crate::error::{CampaignError, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

pub const DAYS_PER_WEEK: usize = 7;
pub const HOURS_PER_DAY: usize = 24;
pub const BITMAP_LEN: usize = DAYS_PER_WEEK * HOURS_PER_DAY;

/// Platform day `i` (Monday = 0) is read from UI day `PLATFORM_DAY_SOURCE[i]` (Sunday = 0).
const PLATFORM_DAY_SOURCE: [usize; DAYS_PER_WEEK] = [1, 2, 3, 4, 5, 6, 0];

/// Hour-of-week selection as the UI presents it: `cells[day][hour]`, day 0 = Sunday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DaypartGrid {
    cells: [[bool; HOURS_PER_DAY]; DAYS_PER_WEEK],
}

impl DaypartGrid {
    /// An empty grid (nothing selected).
    pub fn new() -> Self {
        Self::default()
    }

    /// A grid with every hour selected.
    pub fn all() -> Self {
        Self {
            cells: [[true; HOURS_PER_DAY]; DAYS_PER_WEEK],
        }
    }

    /// Builds a grid from raw UI cells.
    pub fn from_cells(cells: [[bool; HOURS_PER_DAY]; DAYS_PER_WEEK]) -> Self {
        Self { cells }
    }

    /// Sets one cell. Out-of-range indices are ignored.
    pub fn set(&mut self, ui_day: usize, hour: usize, selected: bool) {
        if let Some(cell) = self.cells.get_mut(ui_day).and_then(|d| d.get_mut(hour)) {
            *cell = selected;
        }
    }

    /// Selects all 24 hours of a UI day.
    pub fn select_day(&mut self, ui_day: usize) {
        if let Some(day) = self.cells.get_mut(ui_day) {
            *day = [true; HOURS_PER_DAY];
        }
    }

    /// Selects `hours` on every day of the week.
    pub fn select_hours(&mut self, hours: std::ops::Range<usize>) {
        for day in self.cells.iter_mut() {
            for hour in hours.clone().filter(|h| *h < HOURS_PER_DAY) {
                day[hour] = true;
            }
        }
    }

    pub fn is_selected(&self, ui_day: usize, hour: usize) -> bool {
        self.cells
            .get(ui_day)
            .and_then(|d| d.get(hour))
            .copied()
            .unwrap_or(false)
    }

    pub fn selected_count(&self) -> usize {
        self.cells.iter().flatten().filter(|c| **c).count()
    }
}

/// A validated 168-flag availability bitmap in platform (Monday-first) order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Bitmap168(String);

impl Bitmap168 {
    /// Parses a wire value. Anything other than exactly 168 `'0'`/`'1'` characters is rejected.
    pub fn parse(value: &str) -> Result<Self> {
        if value.len() != BITMAP_LEN {
            return Err(CampaignError::validation(
                "dayparting",
                format!("must be {BITMAP_LEN} characters, got {}", value.len()),
            ));
        }
        if !value.bytes().all(|b| b == b'0' || b == b'1') {
            return Err(CampaignError::validation(
                "dayparting",
                "may only contain '0' and '1'",
            ));
        }
        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the platform day (Monday = 0) and hour are available.
    pub fn is_available(&self, platform_day: usize, hour: usize) -> bool {
        if platform_day >= DAYS_PER_WEEK || hour >= HOURS_PER_DAY {
            return false;
        }
        self.0.as_bytes()[platform_day * HOURS_PER_DAY + hour] == b'1'
    }

    /// Number of available hours in the week.
    pub fn selected_hours(&self) -> usize {
        self.0.bytes().filter(|b| *b == b'1').count()
    }

    /// Converts back to the UI grid (Sunday-first).
    pub fn decode(&self) -> DaypartGrid {
        let mut grid = DaypartGrid::new();
        for (platform_day, ui_day) in PLATFORM_DAY_SOURCE.iter().enumerate() {
            for hour in 0..HOURS_PER_DAY {
                grid.set(*ui_day, hour, self.is_available(platform_day, hour));
            }
        }
        grid
    }
}

impl fmt::Display for Bitmap168 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for Bitmap168 {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Bitmap168 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Bitmap168::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Encodes the UI grid for the platform.
///
/// Returns `None` without reading the grid when dayparting is disabled. A
/// result of the wrong length is also reported as `None`, so the caller sends
/// no restriction rather than a malformed value.
pub fn encode(enabled: bool, grid: &DaypartGrid) -> Option<Bitmap168> {
    if !enabled {
        return None;
    }

    let encoded: String = PLATFORM_DAY_SOURCE
        .iter()
        .flat_map(|ui_day| grid.cells[*ui_day].iter())
        .map(|selected| if *selected { '1' } else { '0' })
        .collect();

    match Bitmap168::parse(&encoded) {
        Ok(bitmap) => Some(bitmap),
        Err(e) => {
            tracing::warn!("Discarding dayparting selection: {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SUNDAY: usize = 0;
    const MONDAY: usize = 1;
    const SATURDAY: usize = 6;

    #[test]
    fn test_disabled_returns_none() {
        assert_eq!(encode(false, &DaypartGrid::all()), None);
    }

    #[test]
    fn test_output_is_always_168_chars() {
        let mut grid = DaypartGrid::new();
        for seed in 0..50u64 {
            let day = (seed % 7) as usize;
            let hour = (seed * 13 % 24) as usize;
            grid.set(day, hour, seed % 3 != 0);
            let bitmap = encode(true, &grid).unwrap();
            assert_eq!(bitmap.as_str().len(), BITMAP_LEN);
        }
        assert_eq!(encode(true, &DaypartGrid::new()).unwrap().as_str(), "0".repeat(168));
    }

    #[test]
    fn test_monday_all_hours_leads_bitmap() {
        let mut grid = DaypartGrid::new();
        grid.select_day(MONDAY);

        let bitmap = encode(true, &grid).unwrap();
        assert_eq!(&bitmap.as_str()[..24], "1".repeat(24));
        assert_eq!(&bitmap.as_str()[24..], "0".repeat(144));
    }

    #[test]
    fn test_sunday_moves_to_end() {
        let mut grid = DaypartGrid::new();
        grid.select_day(SUNDAY);

        let bitmap = encode(true, &grid).unwrap();
        assert_eq!(&bitmap.as_str()[144..], "1".repeat(24));
        assert_eq!(bitmap.selected_hours(), 24);
        assert!(bitmap.is_available(6, 0));
        assert!(!bitmap.is_available(0, 0));
    }

    #[test]
    fn test_saturday_evening() {
        let mut grid = DaypartGrid::new();
        grid.set(SATURDAY, 20, true);

        let bitmap = encode(true, &grid).unwrap();
        assert!(bitmap.is_available(5, 20));
        assert_eq!(bitmap.as_str().find('1'), Some(5 * 24 + 20));
    }

    #[test]
    fn test_grid_from_raw_cells() {
        let mut cells = [[false; HOURS_PER_DAY]; DAYS_PER_WEEK];
        cells[MONDAY] = [true; HOURS_PER_DAY];
        cells[SUNDAY][23] = true;
        let grid = DaypartGrid::from_cells(cells);
        assert_eq!(grid.selected_count(), 25);

        let bitmap = encode(true, &grid).unwrap();
        assert_eq!(bitmap.selected_hours(), grid.selected_count());
        assert_eq!(&bitmap.as_str()[..24], "1".repeat(24));
        assert!(bitmap.is_available(6, 23));
        assert_eq!(bitmap.decode(), grid);

        assert_eq!(DaypartGrid::new().selected_count(), 0);
        assert_eq!(DaypartGrid::all().selected_count(), BITMAP_LEN);
    }

    #[test]
    fn test_decode_restores_ui_grid() {
        let mut grid = DaypartGrid::new();
        grid.select_hours(9..17);
        grid.set(SUNDAY, 3, true);

        let bitmap = encode(true, &grid).unwrap();
        assert_eq!(bitmap.decode(), grid);
    }

    #[test]
    fn test_parse_rejects_malformed_values() {
        assert!(Bitmap168::parse(&"1".repeat(167)).is_err());
        assert!(Bitmap168::parse(&"1".repeat(169)).is_err());
        assert!(Bitmap168::parse(&"2".repeat(168)).is_err());
        assert!(Bitmap168::parse(&"01".repeat(84)).is_ok());
    }

    #[test]
    fn test_serde_as_plain_string() {
        let bitmap = encode(true, &DaypartGrid::all()).unwrap();
        let json = serde_json::to_string(&bitmap).unwrap();
        assert_eq!(json, format!("\"{}\"", "1".repeat(168)));

        let bad: std::result::Result<Bitmap168, _> = serde_json::from_str("\"0101\"");
        assert!(bad.is_err());
    }
}
