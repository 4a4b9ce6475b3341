//! Projection stages between rich markup and masked plain text.
//!
//! Each submodule implements exactly one step, so each can be tested on its
//! own and the sync controller only has to call [`placeholder::project`] and
//! [`placeholder::restore`].
//!
//! ## Data Flow
//!
//! ```text
//! markup ──▶ locate ──▶ materialize ──▶ placeholder ──▶ (canonical, masked, table)
//!                │
//!                └──▶ remote (render only: fetch + decode http(s) images)
//! ```
//!
//! 1. [`locate`]:      find `<img>` tags with byte spans; classify each `src`
//!    as inline, local, remote or unresolved
//! 2. [`materialize`]: rewrite readable local files to `data:` URIs
//! 3. [`placeholder`]: swap tags for numbered tokens and back
//! 4. [`remote`]:      fetch remote images for display; the only stage with
//!    network I/O

pub mod locate;
pub mod materialize;
pub mod placeholder;
pub mod remote;
