pub mod remote;
pub mod upload;

pub use remote::RemoteCorpusService;
pub use upload::encode_upload;
