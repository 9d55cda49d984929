// Uploader module - everything between a folder of images and Imgur
//
// Files are handled one at a time: upload, record in the manifest, move on.

pub mod imgur_client;
pub mod progress_tracker;
pub mod retry;
pub mod upload_queue;

pub use imgur_client::{ImageHost, ImgurClient, UploadedImage};
pub use progress_tracker::{UploadOutcome, UploadSummary};
pub use retry::RetryConfig;
pub use upload_queue::Uploader;
