//! Object-storage POST upload protocol.
//!
//! One image upload is:
//!
//! ```text
//! credentials ──▶ policy ──▶ signature ──▶ key ──▶ form ──▶ POST
//!  (GET, STS)     (JSON,b64)  (HMAC-SHA1)   (unique)  (ordered)
//! ```
//!
//! - [`credentials`]: parse and validate temporary credentials
//! - [`policy`]:      build, encode and sign the upload policy
//! - [`key`]:         derive a unique object key per image instance
//! - [`form`]:        assemble the multipart fields in protocol order
//! - [`transport`]:   the HTTP seam; swapped out in tests

pub mod credentials;
pub mod form;
pub mod key;
pub mod policy;
pub mod transport;

pub use credentials::UploadCredentials;
pub use form::UploadForm;
pub use key::ObjectKey;
pub use policy::{SignedPolicy, UploadPolicy};
pub use transport::{HttpOssTransport, OssTransport, UploadResponse};
