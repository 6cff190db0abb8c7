//! Database entities.

pub mod account;
pub mod activity;
pub mod boost;
pub mod delivery_item;
pub mod follow;
pub mod like;
pub mod note;
pub mod notification;
pub mod relay;
pub mod remote_actor;

pub use account::Entity as Account;
pub use activity::Entity as Activity;
pub use boost::Entity as Boost;
pub use delivery_item::Entity as DeliveryItem;
pub use follow::Entity as Follow;
pub use like::Entity as Like;
pub use note::Entity as Note;
pub use notification::Entity as Notification;
pub use relay::Entity as Relay;
pub use remote_actor::Entity as RemoteActor;
