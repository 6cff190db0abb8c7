//! HTTP handlers for the endpoints peers consume.
//!
//! The outer web layer mounts these on its router; each handler owns its
//! response, including status codes and `ActivityPub` content types.

mod actor;
mod collections;
mod inbox;
mod note;
mod webfinger;

pub use actor::actor_handler;
pub use collections::{CollectionQuery, followers_handler, following_handler, outbox_handler};
pub use inbox::{shared_inbox_handler, user_inbox_handler};
pub use note::note_handler;
pub use webfinger::{WebfingerQuery, webfinger_handler};

use starling_common::config::FederationConfig;
use starling_db::repositories::{
    AccountRepository, FollowRepository, NoteRepository, RemoteActorRepository,
};

use crate::inbox::InboxService;
use crate::outbox::OutboxService;

/// Content type for `ActivityPub` JSON-LD responses.
pub const ACTIVITY_CONTENT_TYPE: &str = "application/activity+json; charset=utf-8";

/// Shared state for the federation handlers.
#[derive(Clone)]
pub struct FederationState {
    pub config: FederationConfig,
    pub accounts: AccountRepository,
    pub notes: NoteRepository,
    pub follows: FollowRepository,
    pub remote_actors: RemoteActorRepository,
    pub inbox: InboxService,
    pub outbox: OutboxService,
}
