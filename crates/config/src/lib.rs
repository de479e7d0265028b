//! Configuration for mnema: typed schema, file discovery and `${VAR}`
//! substitution.

pub mod env_subst;
pub mod loader;
pub mod schema;

pub use {env_subst::substitute_env, loader::*, schema::*};
