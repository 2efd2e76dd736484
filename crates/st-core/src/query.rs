//! Search, filter, sort and pagination over derived rows.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::status::UnknownStatus;

/// A row the composer can search, filter and sort.
///
/// Implemented by the flat view rows (e.g. student skill status rows).
pub trait QueryRow {
    /// The derived status the status filter compares against.
    type Status: Copy + Eq + Ord;

    /// Returns the subject's display name.
    fn name(&self) -> &str;

    /// Returns the roll number.
    fn roll(&self) -> &str;

    /// Returns every text field that free-text search looks at.
    fn search_fields(&self) -> Vec<&str>;

    /// Returns the derived status.
    fn status(&self) -> Self::Status;

    /// Returns the course name, if the row belongs to one.
    fn course(&self) -> Option<&str> {
        None
    }

    /// Returns the score used for score sorting.
    fn score(&self) -> Option<u8> {
        None
    }

    /// Returns the date used for date filtering and sorting.
    fn date(&self) -> Option<NaiveDate> {
        None
    }
}

/// Column to sort by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    #[default]
    Name,
    Roll,
    Course,
    Status,
    Score,
    Date,
}

impl SortKey {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Roll => "roll",
            Self::Course => "course",
            Self::Status => "status",
            Self::Score => "score",
            Self::Date => "date",
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "name" => Ok(Self::Name),
            "roll" | "roll_no" | "rollno" => Ok(Self::Roll),
            "course" | "course_name" | "skill" => Ok(Self::Course),
            "status" => Ok(Self::Status),
            "score" | "best_score" | "bestscore" => Ok(Self::Score),
            "date" => Ok(Self::Date),
            _ => Err(format!("invalid sort key: {s}")),
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(Self::Asc),
            "desc" | "descending" => Ok(Self::Desc),
            _ => Err(format!("invalid sort order: {s}")),
        }
    }
}

/// Page size bounds applied to requested limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageLimits {
    pub default_limit: usize,
    pub max_limit: usize,
}

impl Default for PageLimits {
    fn default() -> Self {
        Self {
            default_limit: 20,
            max_limit: 100,
        }
    }
}

impl PageLimits {
    /// Clamps a requested limit into `1..=max_limit`.
    pub fn resolve(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.default_limit)
            .clamp(1, self.max_limit.max(1))
    }
}

/// Parameters for [`apply`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryParams<S> {
    pub search: Option<String>,
    pub status_filter: Option<S>,
    pub date_filter: Option<NaiveDate>,
    pub sort_by: Option<SortKey>,
    pub sort_order: SortOrder,
    /// 1-based. 0 is treated as 1.
    pub page: usize,
    pub limit: Option<usize>,
}

impl<S> Default for QueryParams<S> {
    fn default() -> Self {
        Self {
            search: None,
            status_filter: None,
            date_filter: None,
            sort_by: None,
            sort_order: SortOrder::Asc,
            page: 1,
            limit: None,
        }
    }
}

impl<S: FromStr<Err = UnknownStatus>> QueryParams<S> {
    /// Sets the status filter from a raw string.
    pub fn with_status(mut self, raw: &str) -> Result<Self, UnknownStatus> {
        self.status_filter = Some(raw.parse()?);
        Ok(self)
    }
}

/// Pagination metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: usize,
    pub limit: usize,
    pub total_pages: usize,
    pub total_count: usize,
}

/// One page of rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}

fn matches_search<R: QueryRow>(row: &R, needle: &str) -> bool {
    row.search_fields()
        .iter()
        .any(|field| field.to_lowercase().contains(needle))
}

fn compare_text(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase())
}

/// Applies `order` to present values; missing values go last either way.
fn compare_optional<T: Ord>(a: Option<T>, b: Option<T>, order: SortOrder) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => match order {
            SortOrder::Asc => a.cmp(&b),
            SortOrder::Desc => b.cmp(&a),
        },
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn compare_rows<R: QueryRow>(a: &R, b: &R, key: SortKey, order: SortOrder) -> Ordering {
    let directed = |ordering: Ordering| match order {
        SortOrder::Asc => ordering,
        SortOrder::Desc => ordering.reverse(),
    };
    match key {
        SortKey::Name => directed(compare_text(a.name(), b.name())),
        SortKey::Roll => directed(compare_text(a.roll(), b.roll())),
        SortKey::Status => directed(a.status().cmp(&b.status())),
        SortKey::Course => compare_optional(
            a.course().map(str::to_lowercase),
            b.course().map(str::to_lowercase),
            order,
        ),
        SortKey::Score => compare_optional(a.score(), b.score(), order),
        SortKey::Date => compare_optional(a.date(), b.date(), order),
    }
}

/// Searches, filters, sorts and pages `rows`.
///
/// Search runs before the status filter. Sorting is stable, so rows with
/// equal keys keep their input order and repeated calls page identically.
/// A page past the end is empty but still reports the real totals.
pub fn apply<R>(rows: &[R], params: &QueryParams<R::Status>, limits: PageLimits) -> Page<R>
where
    R: QueryRow + Clone,
{
    let needle = params
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase);

    let mut matched: Vec<&R> = rows
        .iter()
        .filter(|row| needle.as_deref().is_none_or(|n| matches_search(*row, n)))
        .filter(|row| params.status_filter.is_none_or(|s| row.status() == s))
        .filter(|row| params.date_filter.is_none_or(|d| row.date() == Some(d)))
        .collect();

    if let Some(key) = params.sort_by {
        matched.sort_by(|a, b| compare_rows(*a, *b, key, params.sort_order));
    }

    let limit = limits.resolve(params.limit);
    let page = params.page.max(1);
    let total_count = matched.len();
    let total_pages = total_count.div_ceil(limit);

    let items = matched
        .into_iter()
        .skip((page - 1).saturating_mul(limit))
        .take(limit)
        .cloned()
        .collect();

    Page {
        items,
        pagination: Pagination {
            page,
            limit,
            total_pages,
            total_count,
        },
    }
}
