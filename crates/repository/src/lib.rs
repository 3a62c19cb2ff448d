mod error;
mod item;
mod query;
mod user;

pub use error::RepositoryError;
pub use item::ItemRepository;
pub use query::{append_pagination, FilterKind, OrderByBuilder, WhereBuilder};
pub use user::UserRepository;
