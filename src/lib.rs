//! 电子元件库存控制台的会话层
//! 持有访问令牌/刷新令牌，守卫受保护页面，并为菜单提供角色信息

pub mod auth;
pub mod config;
pub mod error;
pub mod identity;
pub mod models;
pub mod navigation;
pub mod session;
pub mod telemetry;

pub use auth::{extract_roles, parse_claims, Roles, TokenClaims};
pub use error::{AppError, ClaimsError, RefreshError, StorageError};
pub use identity::{HttpIdentityClient, IdentityApi};
pub use navigation::Navigator;
pub use session::{PageGate, SessionGuard, SessionReader, SessionStatus};
