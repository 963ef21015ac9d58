use serde::{Deserialize, Serialize};

/// Paged response envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub content: Vec<T>,
    pub total_pages: i64,
    pub total_elements: i64,
    /// Zero-based page index
    pub number: i64,
    pub size: i64,
    pub first: bool,
    pub last: bool,
    pub number_of_elements: i64,
    pub empty: bool,
}

impl<T> Page<T> {
    pub fn new(content: Vec<T>, request: PageRequest, total_elements: i64) -> Self {
        let size = request.size.max(1);
        let total_pages = (total_elements + size - 1) / size;
        let number_of_elements = content.len() as i64;

        Self {
            empty: content.is_empty(),
            content,
            total_pages,
            total_elements,
            number: request.page,
            size,
            first: request.page == 0,
            last: request.page + 1 >= total_pages,
            number_of_elements,
        }
    }

    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> Page<U> {
        Page {
            content: self.content.into_iter().map(f).collect(),
            total_pages: self.total_pages,
            total_elements: self.total_elements,
            number: self.number,
            size: self.size,
            first: self.first,
            last: self.last,
            number_of_elements: self.number_of_elements,
            empty: self.empty,
        }
    }
}

/// Zero-based page request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub size: i64,
}

impl PageRequest {
    pub const DEFAULT_SIZE: i64 = 20;

    pub fn of(page: i64) -> Self {
        Self {
            page: page.max(0),
            size: Self::DEFAULT_SIZE,
        }
    }

    pub fn limit(&self) -> i64 {
        self.size
    }

    pub fn offset(&self) -> i64 {
        self.page * self.size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_counts() {
        let page = Page::new(vec![1, 2, 3], PageRequest { page: 1, size: 3 }, 7);
        assert_eq!(page.total_pages, 3);
        assert!(!page.first);
        assert!(!page.last);
        assert_eq!(page.number_of_elements, 3);
    }

    #[test]
    fn empty_page_is_first_and_last() {
        let page: Page<i32> = Page::new(vec![], PageRequest::of(0), 0);
        assert!(page.first && page.last && page.empty);
        assert_eq!(page.total_pages, 0);
    }

    #[test]
    fn negative_page_clamps() {
        let req = PageRequest::of(-4);
        assert_eq!(req.page, 0);
        assert_eq!(req.offset(), 0);
    }

    #[test]
    fn serializes_camel_case() {
        let page = Page::new(vec!["a"], PageRequest::of(0), 1);
        let json = serde_json::to_value(&page).unwrap();
        assert_eq!(json["totalElements"], 1);
        assert_eq!(json["numberOfElements"], 1);
    }
}
