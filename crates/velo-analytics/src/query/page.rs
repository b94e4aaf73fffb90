//! Pagination and date ranges.

use chrono::{Datelike, NaiveDate};

/// Caller-facing pagination, resolved from `(skip, take)`.
///
/// `skip` is a page index and `take` a page size, except that a `take` of
/// `-1` asks for every row and turns `skip` into a raw row offset. A `skip`
/// of `-1` disables offsetting altogether.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    /// Page `index` of `size` rows; `index` is `None` when offsetting is off.
    Bounded { index: Option<u64>, size: u64 },
    /// Every row from `offset` onwards.
    Unbounded { offset: Option<u64> },
}

impl Page {
    /// Resolve the raw `(skip, take)` pair. Any negative value acts as `-1`.
    pub fn from_skip_take(skip: i64, take: i64) -> Self {
        let skip = u64::try_from(skip).ok();
        match u64::try_from(take) {
            Ok(size) => Page::Bounded { index: skip, size },
            Err(_) => Page::Unbounded { offset: skip },
        }
    }

    /// The offset/limit pair consumed by stores.
    pub fn window(&self) -> Window {
        match *self {
            Page::Bounded { index, size } => Window {
                offset: index.map(|i| i.saturating_mul(size)),
                limit: Some(size),
            },
            Page::Unbounded { offset } => Window {
                offset,
                limit: None,
            },
        }
    }
}

/// Row offset and limit. `None` means "not applied".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Window {
    pub offset: Option<u64>,
    pub limit: Option<u64>,
}

impl Window {
    /// Every row.
    pub const ALL: Window = Window {
        offset: None,
        limit: None,
    };

    /// Apply the window to an already ordered sequence.
    pub fn apply<T>(&self, rows: impl IntoIterator<Item = T>) -> Vec<T> {
        let skip = self.offset.unwrap_or(0) as usize;
        let rows = rows.into_iter().skip(skip);
        match self.limit {
            Some(limit) => rows.take(limit as usize).collect(),
            None => rows.collect(),
        }
    }
}

/// Inclusive range of calendar days. Either end may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start.map_or(true, |s| day >= s) && self.end.map_or(true, |e| day <= e)
    }

    /// The same range widened to whole months.
    pub fn to_months(&self) -> DateRange {
        DateRange {
            start: self.start.map(month_of),
            end: self.end.map(month_of),
        }
    }
}

/// First day of the month containing `day`.
pub fn month_of(day: NaiveDate) -> NaiveDate {
    day.with_day(1).unwrap_or(day)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(2, 5, Some(10), Some(5) ; "page index times size")]
    #[test_case(0, 10, Some(0), Some(10) ; "first page")]
    #[test_case(2, -1, Some(2), None ; "unbounded uses skip as raw offset")]
    #[test_case(-1, -1, None, None ; "everything")]
    #[test_case(-1, 10, None, Some(10) ; "no offset but limited")]
    #[test_case(3, 0, Some(0), Some(0) ; "empty page")]
    fn test_resolves_window(skip: i64, take: i64, offset: Option<u64>, limit: Option<u64>) {
        assert_eq!(
            Page::from_skip_take(skip, take).window(),
            Window { offset, limit }
        );
    }

    #[test]
    fn test_window_applies_offset_then_limit() {
        let rows: Vec<u32> = (0..20).collect();
        let window = Page::from_skip_take(2, 5).window();
        assert_eq!(window.apply(rows.clone()), vec![10, 11, 12, 13, 14]);
        assert_eq!(Page::from_skip_take(2, -1).window().apply(rows.clone()).len(), 18);
        assert_eq!(Window::ALL.apply(rows).len(), 20);
    }

    #[test]
    fn test_date_range_is_inclusive() {
        let d = |m, day| NaiveDate::from_ymd_opt(2023, m, day).unwrap();
        let range = DateRange::new(Some(d(1, 1)), Some(d(1, 31)));
        assert!(range.contains(d(1, 1)));
        assert!(range.contains(d(1, 31)));
        assert!(!range.contains(d(2, 1)));
        assert!(DateRange::default().contains(d(7, 4)));
    }

    #[test]
    fn test_months_are_truncated() {
        let range = DateRange::new(
            NaiveDate::from_ymd_opt(2023, 3, 15),
            NaiveDate::from_ymd_opt(2023, 5, 2),
        )
        .to_months();
        assert_eq!(range.start, NaiveDate::from_ymd_opt(2023, 3, 1));
        assert_eq!(range.end, NaiveDate::from_ymd_opt(2023, 5, 1));
    }
}
