//! Page/limit arithmetic shared by the listing queries

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Upper bound on a single page
pub const MAX_PAGE_SIZE: u32 = 100;

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "ASC" => Some(SortOrder::Asc),
            "DESC" => Some(SortOrder::Desc),
            _ => None,
        }
    }
}

/// One page of a listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub data: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub total_pages: u64,
}

impl<T> Page<T> {
    pub fn new(data: Vec<T>, total: u64, page: u32, limit: u32) -> Self {
        Self {
            data,
            total,
            page,
            total_pages: total_pages(total, limit),
        }
    }
}

/// `ceil(total / limit)`; a zero limit yields zero pages
pub fn total_pages(total: u64, limit: u32) -> u64 {
    if limit == 0 {
        return 0;
    }
    total.div_ceil(limit as u64)
}

/// Validate page/limit and return the row offset
pub fn offset(page: u32, limit: u32) -> Result<u64> {
    if page == 0 {
        return Err(Error::Validation("page starts at 1".into()));
    }
    if limit == 0 || limit > MAX_PAGE_SIZE {
        return Err(Error::Validation(format!(
            "limit must be between 1 and {}",
            MAX_PAGE_SIZE
        )));
    }
    Ok((page as u64 - 1) * limit as u64)
}

/// Escape a user query for a `LIKE ... ESCAPE '\'` pattern
pub fn like_pattern(query: &str) -> String {
    let mut out = String::with_capacity(query.len() + 2);
    out.push('%');
    for c in query.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('%');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_pages() {
        assert_eq!(total_pages(15, 10), 2);
        assert_eq!(total_pages(20, 10), 2);
        assert_eq!(total_pages(0, 10), 0);
        assert_eq!(total_pages(1, 10), 1);
    }

    #[test]
    fn test_total_pages_independent_of_page() {
        for page in 1..5 {
            let p: Page<()> = Page::new(vec![], 15, page, 10);
            assert_eq!(p.total_pages, 2);
        }
    }

    #[test]
    fn test_offset() {
        assert_eq!(offset(1, 10).unwrap(), 0);
        assert_eq!(offset(3, 10).unwrap(), 20);
        assert!(offset(0, 10).is_err());
        assert!(offset(1, 0).is_err());
        assert!(offset(1, MAX_PAGE_SIZE + 1).is_err());
    }

    #[test]
    fn test_like_pattern_escapes() {
        assert_eq!(like_pattern("ana"), "%ana%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }
}
