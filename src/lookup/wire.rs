//! `lookup` wire command middleware
//!
//! Keys of the form `_gitlookup_git_<hex>` and `_gitlookup_hg_<hex>` are
//! answered here; every other key goes to the default handler untouched.

use crate::error::{Error, Result};
use crate::model::ID_LEN;
use crate::repository::HostRepo;

use super::resolver::{Direction, IdentityResolver};

pub const GITLOOKUP_PREFIX: &str = "_gitlookup_";
/// git hash in, local hash out
pub const GIT_TO_LOCAL_PREFIX: &str = "_gitlookup_git_";
/// local hash in, git hash out
pub const LOCAL_TO_GIT_PREFIX: &str = "_gitlookup_hg_";

const FAILED: &str = "gitlookup failed";

/// Split a lookup key into direction and hash
pub fn parse_key(key: &str) -> Option<(Direction, &str)> {
    if let Some(sha) = key.strip_prefix(GIT_TO_LOCAL_PREFIX) {
        Some((Direction::ToLocal, sha))
    } else {
        key.strip_prefix(LOCAL_TO_GIT_PREFIX)
            .map(|sha| (Direction::ToForeign, sha))
    }
}

/// Wire response line: `1 <hex>` on success, `0 <message>` otherwise
pub fn format_response(result: Option<&str>) -> String {
    match result {
        Some(hex) => format!("1 {}\n", hex),
        None => format!("0 {}\n", FAILED),
    }
}

async fn lookup_key<H: HostRepo>(
    resolver: &mut IdentityResolver<'_, H>,
    key: &str,
) -> Result<Option<String>> {
    match parse_key(key) {
        Some((direction, sha)) => resolver.resolve(sha, direction).await,
        None => Ok(None),
    }
}

/// Middleware step: `None` when the key is not ours
pub async fn handle_lookup<H: HostRepo>(
    resolver: &mut IdentityResolver<'_, H>,
    key: &str,
) -> Option<Result<String>> {
    if !key.starts_with(GITLOOKUP_PREFIX) {
        return None;
    }
    Some(
        lookup_key(resolver, key)
            .await
            .map(|found| format_response(found.as_deref())),
    )
}

/// Remote `lookup` command with gitlookup keys intercepted
pub async fn remote_lookup<H, F>(
    resolver: &mut IdentityResolver<'_, H>,
    key: &str,
    default: F,
) -> Result<String>
where
    H: HostRepo,
    F: FnOnce(&str) -> Result<String>,
{
    match handle_lookup(resolver, key).await {
        Some(response) => response,
        None => default(key),
    }
}

/// Local name lookup: a gitlookup key resolves to the binary node of the
/// answer, anything else (including a miss) goes to `default`.
pub async fn local_lookup<H, F>(
    resolver: &mut IdentityResolver<'_, H>,
    key: &str,
    default: F,
) -> Result<[u8; ID_LEN]>
where
    H: HostRepo,
    F: FnOnce(&str) -> Result<[u8; ID_LEN]>,
{
    match lookup_key(resolver, key).await? {
        Some(hex) => {
            let mut node = [0u8; ID_LEN];
            hex::decode_to_slice(&hex, &mut node).map_err(|_| Error::InvalidId(hex.clone()))?;
            Ok(node)
        }
        None => default(key),
    }
}

/// Remote `lookup` with the gitlookup step in front of a default handler.
///
/// Owns the handler, so one chain serves any number of keys.
pub struct LookupChain<'r, 'a, H, F> {
    resolver: &'r mut IdentityResolver<'a, H>,
    default: F,
}

impl<'r, 'a, H, F> LookupChain<'r, 'a, H, F>
where
    H: HostRepo,
    F: FnMut(&str) -> Result<String>,
{
    pub fn new(resolver: &'r mut IdentityResolver<'a, H>, default: F) -> Self {
        Self { resolver, default }
    }

    pub async fn lookup(&mut self, key: &str) -> Result<String> {
        match handle_lookup(self.resolver, key).await {
            Some(response) => response,
            None => (self.default)(key),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key() {
        let sha = "6916a3c30f53878032dea8d01074d8c2a03927bd";
        assert_eq!(
            parse_key(&format!("_gitlookup_git_{}", sha)),
            Some((Direction::ToLocal, sha))
        );
        assert_eq!(
            parse_key(&format!("_gitlookup_hg_{}", sha)),
            Some((Direction::ToForeign, sha))
        );
        assert_eq!(parse_key("_gitlookup_svn_1"), None);
        assert_eq!(parse_key(sha), None);
    }

    #[test]
    fn test_format_response() {
        assert_eq!(format_response(Some("abc")), "1 abc\n");
        assert_eq!(format_response(None), "0 gitlookup failed\n");
    }
}
