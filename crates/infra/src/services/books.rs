//! Storefront catalog reads.

use std::sync::Arc;

use tracing::instrument;

use bookmart_catalog::{Book, BookSearchParams, Category};
use bookmart_core::{BookId, DomainError, DomainResult, PageRequest, Paginated};

use crate::store::Datastore;

/// A book joined with its category, for the detail page.
#[derive(Debug, Clone)]
pub struct BookDetails {
    pub book: Book,
    pub category: Option<Category>,
}

#[derive(Clone)]
pub struct BookService {
    store: Arc<dyn Datastore>,
}

impl BookService {
    pub fn new(store: Arc<dyn Datastore>) -> Self {
        Self { store }
    }

    /// Search active books. Pagination rides inside the params.
    #[instrument(skip(self, params))]
    pub async fn search_books(&self, params: &BookSearchParams) -> DomainResult<Paginated<Book>> {
        let page = params.page.unwrap_or_default();
        let mut tx = self.store.begin().await?;
        let (books, total) = tx.search_books(params, false, page).await?;
        Ok(Paginated::new(books, total, page))
    }

    /// Detail view of an active book. Inactive books are invisible here.
    #[instrument(skip(self), fields(book_id = %book_id))]
    pub async fn get_book(&self, book_id: BookId) -> DomainResult<BookDetails> {
        let mut tx = self.store.begin().await?;
        let book = tx
            .find_book(book_id)
            .await?
            .filter(|b| b.status.is_active())
            .ok_or(DomainError::BookNotFound)?;
        let category = match book.category_id {
            Some(id) => tx
                .list_categories()
                .await?
                .into_iter()
                .find(|c| c.id == id),
            None => None,
        };
        Ok(BookDetails { book, category })
    }

    pub async fn list_categories(&self) -> DomainResult<Vec<Category>> {
        let mut tx = self.store.begin().await?;
        Ok(tx.list_categories().await?)
    }

    /// Bestsellers for the storefront landing page.
    pub async fn featured_books(&self, limit: usize) -> DomainResult<Vec<Book>> {
        let mut tx = self.store.begin().await?;
        Ok(tx.featured_books(limit).await?)
    }
}
