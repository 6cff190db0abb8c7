//! ActivityPub federation for starling.
//!
//! This crate implements the federation core:
//!
//! - **Activities**: typed Create, Delete, Follow, Accept, Like, Announce,
//!   Update and Undo variants parsed from the common envelope
//! - **Resolver**: WebFinger handle resolution and the TTL-cached remote
//!   actor store
//! - **Inbox**: signature-verified, deduplicated processing of incoming
//!   activities with per-type processors
//! - **Outbox**: activity assembly, addressing and recipient collection
//!   for local actions
//! - **Relays**: the relay subscription state machine and relay-forwarded
//!   content detection
//! - **Handlers**: the JSON-LD endpoints peers consume (actor document,
//!   outbox, followers/following, note objects, WebFinger)

pub mod activities;
pub mod client;
pub mod handler;
pub mod inbox;
pub mod notify;
pub mod objects;
pub mod outbox;
pub mod processor;
pub mod relay;
pub mod resolver;
pub mod testing;

pub use activities::{
    AcceptActivity, AnnounceActivity, CreateActivity, DeleteActivity, FollowActivity,
    IncomingActivity, LikeActivity, ObjectRef, UndoActivity, UpdateActivity,
};
pub use client::{ApClient, HttpResponse, HttpTransport, ReqwestTransport};
pub use inbox::{InboxOutcome, InboxService};
pub use notify::Notifier;
pub use objects::{ACTIVITYSTREAMS_CONTEXT, ApNote, ApTag, PUBLIC};
pub use outbox::OutboxService;
pub use relay::RelayController;
pub use resolver::ActorResolver;
