use crate::error::AppError;

pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 100;

/// Columns a recipe listing may be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    CreatedAt,
    Title,
    Id,
}

impl SortField {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "createdAt" | "created_at" => Some(SortField::CreatedAt),
            "title" => Some(SortField::Title),
            "id" => Some(SortField::Id),
            _ => None,
        }
    }

    pub fn column(self) -> &'static str {
        match self {
            SortField::CreatedAt => "created_at",
            SortField::Title => "title",
            SortField::Id => "id",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    /// `asc` in any case is ascending; everything else falls back to descending.
    pub fn parse(raw: &str) -> Self {
        if raw.eq_ignore_ascii_case("asc") {
            SortDirection::Asc
        } else {
            SortDirection::Desc
        }
    }

    pub fn sql(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// A zero-indexed page request with ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub size: i64,
    pub sort: SortField,
    pub direction: SortDirection,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 0,
            size: DEFAULT_PAGE_SIZE,
            sort: SortField::CreatedAt,
            direction: SortDirection::Desc,
        }
    }
}

impl PageRequest {
    pub fn new(page: i64, size: i64, sort_by: &str, direction: &str) -> Result<Self, AppError> {
        if page < 0 {
            return Err(AppError::validation("page", "Page index must not be negative"));
        }
        if !(1..=MAX_PAGE_SIZE).contains(&size) {
            return Err(AppError::validation(
                "size",
                format!("Page size must be between 1 and {MAX_PAGE_SIZE}"),
            ));
        }
        if page.checked_mul(size).is_none() {
            return Err(AppError::validation("page", "Page index is too large"));
        }
        let sort = SortField::parse(sort_by).ok_or_else(|| {
            AppError::validation("sortBy", format!("Unsupported sort field: {sort_by}"))
        })?;
        Ok(Self {
            page,
            size,
            sort,
            direction: SortDirection::parse(direction),
        })
    }

    /// Rows to skip. `new` guarantees `page * size` fits in an `i64`.
    pub fn offset(&self) -> i64 {
        self.page * self.size
    }
}

/// One slice of an ordered result set plus the total it was cut from.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: i64,
    pub size: i64,
    pub total: i64,
}

impl<T> Page<T> {
    pub fn total_pages(&self) -> i64 {
        if self.total == 0 {
            0
        } else {
            (self.total + self.size - 1) / self.size
        }
    }

    pub fn is_last(&self) -> bool {
        self.page >= self.total_pages() - 1
    }
}
