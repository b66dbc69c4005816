//! Data models for Libris

pub mod book;
pub mod borrowing;
pub mod user;

// Re-export commonly used types
pub use book::{Book, Cover, CreateBook, UpdateBook};
pub use borrowing::{Borrowing, BorrowingDetails, BorrowingFilter, BorrowingSummary};
pub use user::{User, UserClaims, UserShort};
