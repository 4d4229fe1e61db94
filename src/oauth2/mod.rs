//! OAuth2 onboarding support
//!
//! # Module Layout
//!
//! - `discovery`    -- best-effort authorization server metadata lookup
//! - `well_known`   -- local RFC 9728 / RFC 8414 probe for direct discovery
//! - `registration` -- Dynamic Client Registration and staleness tracking
//! - `callback`     -- redirect target and callback query handling

pub mod callback;
pub mod discovery;
pub mod registration;
pub mod well_known;

pub use callback::{clean_callback_url, parse_callback, CallbackOutcome, CallbackTarget};
pub use discovery::{DiscoveryMode, DiscoveryOutcome, OAuth2DiscoveryClient, OAuth2Metadata};
pub use registration::{AutomaticRegistration, DcrRequest, DcrResponse, DcrResult, DynamicClientRegistrar};
