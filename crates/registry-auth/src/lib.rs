//! Registry Authentication
//!
//! Turns a login mode plus credentials into a serialized cookie credential
//! that the platform client can reuse without repeating the challenge.
//!
//! # Modes
//!
//! - **cookie**: inject a pre-obtained cookie string, probe once
//! - **qrcode**: show the QR page and poll until the mobile app confirms
//! - **phone**: request an SMS code and poll until it is entered
//!
//! Both interactive modes poll at a fixed interval under a wall-clock
//! ceiling. A captcha suspends the poll until it is cleared or its own
//! ceiling passes.

pub mod cookies;
pub mod error;
pub mod session;
pub mod surface;

pub use cookies::{parse_cookie_string, serialize_cookies};
pub use error::{AuthError, Result};
pub use session::{AuthSession, ChallengeKind, Credentials, LoginSettings, LoginState};
pub use surface::LoginSurface;
