pub mod catalog;
pub mod editor;
pub mod export;
pub mod inflight;
pub mod links;
pub mod listing;
pub mod upload;

pub use editor::{Editable, EditorSession, EditorView, SubmitOutcome};
pub use export::{Export, export_applications};
pub use inflight::{InFlight, InFlightTicket};
pub use listing::{ListView, Notice, NoticeKind, RowAction};
pub use upload::{ImageCategory, ImageFile, upload_image};
