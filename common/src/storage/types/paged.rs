use serde::Serialize;

use crate::error::AppError;

/// One page of query results plus the paging/sort parameters that produced it
/// and the total number of matching rows across all pages.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PagedResult<T> {
    pub content: Vec<T>,
    pub page: u32,
    pub size: u32,
    pub sort: String,
    pub direction: String,
    pub total_elements: u64,
}

impl<T> PagedResult<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PagedResult<U> {
        PagedResult {
            content: self.content.into_iter().map(f).collect(),
            page: self.page,
            size: self.size,
            sort: self.sort,
            direction: self.direction,
            total_elements: self.total_elements,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        match raw.to_ascii_uppercase().as_str() {
            "ASC" => Ok(SortDirection::Asc),
            "DESC" => Ok(SortDirection::Desc),
            _ => Err(AppError::Validation(format!(
                "Invalid sort direction: {raw}"
            ))),
        }
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}
