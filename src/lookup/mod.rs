//! Answering cross-namespace id lookups
//!
//! - **resolver**: multi-strategy id resolution for one repository
//! - **wire**: `lookup` command middleware in front of a default handler

mod resolver;
mod wire;

pub use resolver::{Direction, IdentityResolver};
pub use wire::{
    format_response, handle_lookup, local_lookup, parse_key, remote_lookup, LookupChain,
    GITLOOKUP_PREFIX, GIT_TO_LOCAL_PREFIX, LOCAL_TO_GIT_PREFIX,
};
