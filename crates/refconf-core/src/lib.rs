//! refconf-core: placeholder reference resolver for flat configuration
//!
//! A configuration context maps dotted keys to values. String values may
//! carry four kinds of placeholder:
//!
//! - `$ref{key}` - the value of another key in the same context
//! - `$sys{name}` - a system property
//! - `$env{name}` - an environment variable
//! - `$secret{alias}` - an entry in a secret store (validated, never inlined)
//!
//! # Example
//!
//! ```rust
//! use std::collections::HashMap;
//! use refconf_core::{context, resolve};
//!
//! let mut ctx = context::from_yaml(r#"
//! server:
//!   hostname: localhost
//!   port: 9443
//!   url: "https://$ref{server.hostname}:$ref{server.port}/"
//! "#).unwrap();
//!
//! let secrets: HashMap<String, String> = HashMap::new();
//! let vault_enabled = resolve(&mut ctx, &secrets).unwrap();
//!
//! assert!(!vault_enabled);
//! assert_eq!(ctx["server.url"].as_str(), Some("https://localhost:9443/"));
//! ```

pub mod context;
pub mod error;
pub mod pipeline;
pub mod placeholder;
pub mod references;
pub mod secrets;
pub mod source;
pub mod substitute;
pub mod value;

pub use context::Context;
pub use error::{Error, Result};
pub use pipeline::{resolve, Resolution, Resolver, ResolverOptions, Stage};
pub use placeholder::PlaceholderKind;
pub use secrets::{SecretPolicy, SecretStore};
pub use source::{Environment, PropertySource, PropertyTable, SystemProperties};
pub use value::Value;
