use serde::{Deserialize, Serialize};

use bookmart_core::{CategoryId, PageRequest};

use crate::book::Book;

/// Storefront search filters. All filters combine with AND; `keyword` matches
/// title/author/description case-insensitively.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookSearchParams {
    pub keyword: Option<String>,
    pub category_id: Option<CategoryId>,
    pub author: Option<String>,
    pub isbn: Option<String>,
    #[serde(default)]
    pub page: Option<PageRequest>,
}

impl BookSearchParams {
    /// Whether a book matches the filters. Status filtering (active-only for
    /// the storefront, everything for the back-office) is the caller's call.
    pub fn matches(&self, book: &Book) -> bool {
        if let Some(keyword) = &self.keyword {
            let kw = keyword.to_lowercase();
            let in_title = book.title.to_lowercase().contains(&kw);
            let in_author = book.author.to_lowercase().contains(&kw);
            let in_description = book
                .description
                .as_deref()
                .map(|d| d.to_lowercase().contains(&kw))
                .unwrap_or(false);
            if !(in_title || in_author || in_description) {
                return false;
            }
        }
        if let Some(category_id) = self.category_id {
            if book.category_id != Some(category_id) {
                return false;
            }
        }
        if let Some(author) = &self.author {
            if !book.author.to_lowercase().contains(&author.to_lowercase()) {
                return false;
            }
        }
        if let Some(isbn) = &self.isbn {
            if !book.isbn.contains(isbn.as_str()) {
                return false;
            }
        }
        true
    }
}
