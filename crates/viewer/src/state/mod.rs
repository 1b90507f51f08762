pub mod settings;
pub mod view;

pub use settings::ViewerSettings;
pub use view::{SubscriberId, Topic, TopicSet, ViewEvent, ViewState};
