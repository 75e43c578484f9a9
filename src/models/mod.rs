//! Data models for Lectern

pub mod author;
pub mod book;
pub mod issue;
pub mod purchase;
pub mod request;
pub mod review;
pub mod section;
pub mod user;

// Re-export commonly used types
pub use author::Author;
pub use book::{Book, BookAccess, BookDetails};
pub use issue::{Issue, IssueDetails};
pub use purchase::{Purchase, PurchaseDetails};
pub use request::{BorrowRequest, RequestDetails, RequestStatus};
pub use review::{Review, ReviewDetails};
pub use section::Section;
pub use user::{Role, Scope, User, UserClaims, UserPublic};
