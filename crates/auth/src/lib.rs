//! `casebridge-auth`: session and role-guard boundary.
//!
//! This crate is intentionally decoupled from HTTP and storage: it knows what a
//! session is and which roles may do what, not where sessions live.

pub mod authorize;
pub mod password;
pub mod principal;
pub mod roles;
pub mod session;
pub mod user;

pub use authorize::{AuthzError, require_owner_or_staff, require_role};
pub use password::{MIN_PASSWORD_LEN, PasswordError, hash_password, verify_password};
pub use principal::Principal;
pub use roles::{ADMIN_ONLY, ANY_ROLE, Role, STAFF};
pub use session::{SessionRecord, SessionToken};
pub use user::{NewUser, User, UserPatch, display_name};
