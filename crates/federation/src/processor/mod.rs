//! Per-type activity processors.
//!
//! Each processor owns the semantics of one activity type. The shared
//! authorization rule: no activity may modify or destroy state owned by
//! an actor other than the signer, with the sole exception of incoming
//! Follows.

mod accept;
mod announce;
mod create;
mod delete;
mod follow;
mod like;
mod undo;
mod update;

pub use accept::AcceptProcessor;
pub use announce::AnnounceProcessor;
pub use create::CreateProcessor;
pub use delete::DeleteProcessor;
pub use follow::FollowProcessor;
pub use like::LikeProcessor;
pub use undo::UndoProcessor;
pub use update::UpdateProcessor;

use starling_common::config::FederationConfig;
use url::Url;

/// Extract the username of a local actor URI
/// (`https://{local_domain}/users/{username}`), when the URI is ours.
pub(crate) fn local_username_from_uri(config: &FederationConfig, uri: &Url) -> Option<String> {
    if uri.host_str() != Some(config.local_domain.as_str()) {
        return None;
    }
    uri.path()
        .strip_prefix("/users/")
        .filter(|rest| !rest.is_empty() && !rest.contains('/'))
        .map(std::string::ToString::to_string)
}
