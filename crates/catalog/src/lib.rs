//! `bookmart-catalog` — books and categories.

pub mod book;
pub mod category;
pub mod search;

pub use book::{Book, BookDraft, BookPatch, BookStatus};
pub use category::Category;
pub use search::BookSearchParams;
