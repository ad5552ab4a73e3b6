// handlers/public - no authentication required
pub mod invitation;
pub mod root;

pub use invitation::preview as invitation_preview;
pub use root::{health, root};
