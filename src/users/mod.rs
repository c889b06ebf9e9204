pub mod error;
pub mod model;
pub mod password;
pub mod repo;
pub mod tokens;

pub use error::UserRepoError;
pub use model::{NewUser, User, UserChanges};
pub use tokens::TokenKeys;
