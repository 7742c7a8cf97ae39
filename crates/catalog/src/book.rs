use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bookmart_core::{BookId, CategoryId, DomainError, Money};

/// Listing status of a book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookStatus {
    Active,
    Inactive,
}

impl BookStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, BookStatus::Active)
    }
}

/// A book in the catalog.
///
/// `stock_quantity` may only go negative through an explicit admin override;
/// the sale path refuses to oversell. `sales_count` is monotonic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub id: BookId,
    pub isbn: String,
    pub title: String,
    pub author: String,
    pub publisher: Option<String>,
    pub price: Money,
    pub stock_quantity: i64,
    pub sales_count: i64,
    pub description: Option<String>,
    pub cover_image: Option<String>,
    pub category_id: Option<CategoryId>,
    pub status: BookStatus,
    pub created_at: DateTime<Utc>,
}

impl Book {
    /// Validate and materialize a draft into a catalog entry.
    pub fn create(id: BookId, draft: BookDraft, now: DateTime<Utc>) -> Result<Self, DomainError> {
        draft.validate()?;
        Ok(Self {
            id,
            isbn: draft.isbn,
            title: draft.title,
            author: draft.author,
            publisher: draft.publisher,
            price: draft.price,
            stock_quantity: draft.stock_quantity,
            sales_count: 0,
            description: draft.description,
            cover_image: draft.cover_image,
            category_id: draft.category_id,
            status: BookStatus::Active,
            created_at: now,
        })
    }

    /// Apply an admin edit. Stock is intentionally not editable here; stock
    /// moves only through the audited adjustment/checkout paths.
    pub fn apply_patch(&mut self, patch: BookPatch) -> Result<(), DomainError> {
        if let Some(isbn) = patch.isbn {
            if isbn.trim().is_empty() {
                return Err(DomainError::validation("isbn cannot be empty"));
            }
            self.isbn = isbn;
        }
        if let Some(title) = patch.title {
            if title.trim().is_empty() {
                return Err(DomainError::validation("title cannot be empty"));
            }
            self.title = title;
        }
        if let Some(author) = patch.author {
            if author.trim().is_empty() {
                return Err(DomainError::validation("author cannot be empty"));
            }
            self.author = author;
        }
        if let Some(price) = patch.price {
            self.price = price;
        }
        if let Some(publisher) = patch.publisher {
            self.publisher = Some(publisher);
        }
        if let Some(description) = patch.description {
            self.description = Some(description);
        }
        if let Some(cover_image) = patch.cover_image {
            self.cover_image = Some(cover_image);
        }
        if let Some(category_id) = patch.category_id {
            self.category_id = Some(category_id);
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        Ok(())
    }
}

/// Input for creating a book (admin path).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookDraft {
    pub isbn: String,
    pub title: String,
    pub author: String,
    pub publisher: Option<String>,
    pub price: Money,
    pub stock_quantity: i64,
    pub description: Option<String>,
    pub cover_image: Option<String>,
    pub category_id: Option<CategoryId>,
}

impl BookDraft {
    fn validate(&self) -> Result<(), DomainError> {
        if self.isbn.trim().is_empty() {
            return Err(DomainError::validation("isbn cannot be empty"));
        }
        if self.title.trim().is_empty() {
            return Err(DomainError::validation("title cannot be empty"));
        }
        if self.author.trim().is_empty() {
            return Err(DomainError::validation("author cannot be empty"));
        }
        if self.stock_quantity < 0 {
            return Err(DomainError::validation("initial stock cannot be negative"));
        }
        Ok(())
    }
}

/// Partial update for a book (admin path). `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookPatch {
    pub isbn: Option<String>,
    pub title: Option<String>,
    pub author: Option<String>,
    pub publisher: Option<String>,
    pub price: Option<Money>,
    pub description: Option<String>,
    pub cover_image: Option<String>,
    pub category_id: Option<CategoryId>,
    pub status: Option<BookStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn draft() -> BookDraft {
        BookDraft {
            isbn: "978-0-13-468599-1".to_string(),
            title: "The Rust Programming Language".to_string(),
            author: "Klabnik & Nichols".to_string(),
            publisher: None,
            price: Money::new(dec!(39.99)).unwrap(),
            stock_quantity: 5,
            description: None,
            cover_image: None,
            category_id: None,
        }
    }

    #[test]
    fn create_starts_active_with_zero_sales() {
        let book = Book::create(BookId::new(), draft(), Utc::now()).unwrap();
        assert_eq!(book.status, BookStatus::Active);
        assert_eq!(book.sales_count, 0);
        assert_eq!(book.stock_quantity, 5);
    }

    #[test]
    fn create_rejects_blank_title() {
        let mut d = draft();
        d.title = "   ".to_string();
        assert!(matches!(
            Book::create(BookId::new(), d, Utc::now()),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn create_rejects_negative_initial_stock() {
        let mut d = draft();
        d.stock_quantity = -1;
        assert!(Book::create(BookId::new(), d, Utc::now()).is_err());
    }

    #[test]
    fn patch_updates_price_and_status_only_when_set() {
        let mut book = Book::create(BookId::new(), draft(), Utc::now()).unwrap();
        let patch = BookPatch {
            price: Some(Money::new(dec!(29.99)).unwrap()),
            status: Some(BookStatus::Inactive),
            ..BookPatch::default()
        };
        book.apply_patch(patch).unwrap();
        assert_eq!(book.price.amount(), dec!(29.99));
        assert_eq!(book.status, BookStatus::Inactive);
        assert_eq!(book.title, "The Rust Programming Language");
    }

    #[test]
    fn patch_rejects_blank_isbn() {
        let mut book = Book::create(BookId::new(), draft(), Utc::now()).unwrap();
        let patch = BookPatch {
            isbn: Some(String::new()),
            ..BookPatch::default()
        };
        assert!(book.apply_patch(patch).is_err());
    }
}
