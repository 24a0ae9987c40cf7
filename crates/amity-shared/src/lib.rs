//! # amity-shared
//!
//! Vocabulary shared by the Amity store and server: the error taxonomy, the
//! Paged Query Engine and the request enums (message containers, member
//! ordering, role tags).

pub mod constants;
pub mod error;
pub mod paging;
pub mod types;

pub use error::AmityError;
pub use paging::{PageMetadata, PageRequest, PageSource, PagedList};
pub use types::{MemberOrder, MessageContainer, Role};
