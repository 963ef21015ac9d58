pub mod jwt;
pub mod password;

pub use jwt::{bearer_token, Claims, JwtManager, ACCESS_TOKEN, REFRESH_TOKEN};
pub use password::{hash_password, unusable_password, verify_password};
