mod registry;
mod room_hub;

pub use registry::HubRegistry;
pub use room_hub::{RoomHub, Subscription, SubscriptionGuard};
