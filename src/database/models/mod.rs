pub mod activity;
pub mod announcement;
pub mod church;
pub mod event;
pub mod files;
pub mod group;
pub mod message;
pub mod post;
pub mod profile;
pub mod token;
pub mod user;

pub use activity::{Activity, GroupNotification};
pub use announcement::{Announcement, AnnouncementDetail, AnnouncementKind};
pub use church::{Church, ChurchStaff, OperatingException, OperatingHour, OperatingHourView, STAFF_ROLES};
pub use event::{
    ConfirmedEvent, Event, EventDetail, EventScope, EventUpdate, Participation, ATTENDANCE_MODES,
    PARTICIPATION_STATUSES,
};
pub use files::{ChurchFile, EducationalResource, WithUrl};
pub use group::{ChatMessage, Group, GroupRole, Membership};
pub use message::PrivateMessage;
pub use post::{Comment, Post, PostView};
pub use profile::{Profile, ProfileDetail};
pub use token::AuthToken;
pub use user::{User, UserSummary};
