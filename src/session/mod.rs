//! Session lifecycle: storage, guard, per-page gate and read-only accessor

pub mod gate;
pub mod guard;
pub mod reader;
pub mod store;

pub use gate::PageGate;
pub use guard::{GuardSettings, SessionGuard, SessionStatus};
pub use reader::SessionReader;
pub use store::{
    FileStorage, MemoryStorage, SessionStore, SessionTokens, TokenStorage, ACCESS_TOKEN_KEY,
    REFRESH_TOKEN_KEY,
};
