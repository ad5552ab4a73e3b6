pub mod child;
pub mod indsatstrappe;
pub mod invitation;
pub mod notification;
pub mod tool;
pub mod user;

pub use child::{Child, ChildWithRelation, Caregiver, RelationType, UserChildRelation};
pub use indsatstrappe::{Indsatstrappe, IndsatstrappeStep, StepPeriod};
pub use invitation::{Invitation, InvitationStatus};
pub use notification::{Notification, NotificationKind};
pub use tool::{BarometerEntry, DagensSmileyEntry, ScaleType, SengetiderEntry, ToolHeader, ToolKind};
pub use user::User;
