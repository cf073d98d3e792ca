#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

mod policy_type;
pub mod resolve;

pub use self::{
    policy_type::PolicyType,
    resolve::{ConfigError, NamespacedResourceResolver, ResolveError},
};
