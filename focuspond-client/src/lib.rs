//! Remote resource client for the FocusPond backend.
//!
//! [`RemoteResources`] is the seam the sync layer calls through: one method
//! per backend operation, each returning success or a [`ClientError`].
//! [`HttpResourceClient`] implements it over the JSON HTTP API with a hard
//! per-call timeout.
//!
//! Every call takes the account captured by the caller when the call was
//! initiated. The HTTP client forwards it in a header, so a call that
//! outlives a logout still targets the account that issued it.

mod config;
mod error;
mod http;
mod remote;

pub use config::ClientConfig;
pub use error::{ClientError, ClientResult};
pub use http::HttpResourceClient;
pub use remote::RemoteResources;
