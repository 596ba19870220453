pub mod conversation;
pub mod preview;
pub mod session;
pub mod uploads;

pub use conversation::Conversation;
pub use preview::{format_file_size, icon_for_mime, PreviewRegistry};
pub use session::ChatSession;
pub use uploads::{Preview, StagedFile, UploadCoordinator, UploadEvent, UploadResult};
