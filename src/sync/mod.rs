//! Git metadata exchange between peers
//!
//! - **scan**: backward search of the mapfile for missing records
//! - **producer**: server side, builds the parts for a request
//! - **consumer**: client side, applies received parts
//! - **client**: one complete pull from a peer

mod client;
mod consumer;
mod producer;
mod scan;

pub use client::{getmeta_request, pull_git_meta, read_common_heads};
pub use consumer::{apply_part, apply_parts, ApplyReport};
pub use producer::{full_file_parts, get_meta_parts, mapfile_delta};
pub use scan::{find_missing_lines, MissingLines};
