//! Catalog management service

use crate::{
    error::AppResult,
    models::book::{Book, CreateBook, UpdateBook},
    policy::{self, Actor, Operation},
    repository::Repository,
};

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
}

impl CatalogService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// List every book
    pub async fn list_books(&self, actor: &Actor) -> AppResult<Vec<Book>> {
        policy::authorize(actor, Operation::ListBooks)?;
        self.repository.books.list().await
    }

    /// Get book by ID
    pub async fn get_book(&self, actor: &Actor, id: i32) -> AppResult<Book> {
        policy::authorize(actor, Operation::RetrieveBook)?;
        self.repository.books.get_by_id(id).await
    }

    /// Create a new book
    pub async fn create_book(&self, actor: &Actor, book: CreateBook) -> AppResult<Book> {
        policy::authorize(actor, Operation::CreateBook)?;
        book.check()?;

        let created = self.repository.books.create(&book).await?;
        tracing::info!(book_id = created.id, title = %created.title, "Book created");
        Ok(created)
    }

    /// Replace every field of a book
    pub async fn replace_book(&self, actor: &Actor, id: i32, book: CreateBook) -> AppResult<Book> {
        policy::authorize(actor, Operation::UpdateBook)?;
        book.check()?;

        self.repository.books.update(id, &UpdateBook::from(book)).await
    }

    /// Update the fields present in the request
    pub async fn update_book(&self, actor: &Actor, id: i32, update: UpdateBook) -> AppResult<Book> {
        policy::authorize(actor, Operation::UpdateBook)?;
        update.check()?;

        self.repository.books.update(id, &update).await
    }

    /// Delete a book and its borrowings
    pub async fn delete_book(&self, actor: &Actor, id: i32) -> AppResult<()> {
        policy::authorize(actor, Operation::DeleteBook)?;

        self.repository.books.delete(id).await?;
        tracing::info!(book_id = id, "Book deleted");
        Ok(())
    }
}
