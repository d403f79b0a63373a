//! Architecture-specific register definitions
//!
//! SMU command ids, fuse addresses and PM table layouts differ between
//! processor generations. Everything that is known to work across the Zen
//! line lives in `zen`; codename-specific variation is expressed as data
//! inside that module rather than as separate feature-gated trees.
//!
//! ## Supported Architectures
//!
//! - **Zen** (`zen` feature) - Family 17h, 19h and 1Ah

#[cfg(feature = "zen")]
pub mod zen;
