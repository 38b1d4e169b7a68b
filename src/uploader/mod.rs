// Uploader module - stages images on disk and hands them to Imgbox
//
// One task per image runs concurrently; staged files are removed once the
// whole batch has settled.

pub mod imgbox_client;
pub mod response;
pub mod temp_files;
pub mod upload_queue;

pub use imgbox_client::{ImageHost, ImgboxRequest};
pub use response::{parse_upload_response, UploadOutcome};
pub use temp_files::TempFileStore;
pub use upload_queue::UploadOrchestrator;
