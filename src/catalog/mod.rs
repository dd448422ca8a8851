/// Cultural catalog
///
/// Totems, the content items attached to them, and visitor profiles.

pub mod contents;
pub mod profiles;
pub mod totems;

pub use contents::{ContentStore, SubmitContent};
pub use profiles::{ProfileStore, ProfileUpdate};
pub use totems::{CategoryGroup, NewTotem, TotemPage, TotemStore};
