//! Data models for eLibrary

pub mod address;
pub mod author;
pub mod loan;
pub mod user;
pub mod work;

// Re-export commonly used types
pub use address::{LibraryUserAddress, LibraryUserInfo, LookupEntry, LookupTable, ProfileView};
pub use author::{Author, AuthorName};
pub use loan::{LibraryUnit, LoanDetails, UnitStatus, WorkRef};
pub use user::{Account, UserClaims};
pub use work::{Article, FictionBook, ScienceBook, Work, WorkFields, WorkKind};
