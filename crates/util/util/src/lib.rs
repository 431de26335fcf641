pub mod codec;
pub mod debug_log;

pub use codec::{CodecError, CredentialCodec};
pub use debug_log::DebugLog;
