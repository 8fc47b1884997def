//! Profile intake: the one-time form that gates every conversation.

pub mod intake;
pub mod model;

pub use intake::ProfileForm;
pub use model::{Gender, UserProfile};
