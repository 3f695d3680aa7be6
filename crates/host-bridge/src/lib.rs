//! `cb-bridge`: client for the native host bridge.
//!
//! The page talks to its host through a one-way [`HostChannel`]
//! (`aiwize_applications.<method>` plus positional JSON arguments).  The
//! host answers by invoking named callbacks, which [`BrowserBridge`] turns
//! back into the result of the pending request.
//!
//! ```text
//!  page_info() ──▶ HostChannel::send("aiwize_applications.getPageInfo")
//!      ▲                                │
//!      └── on_page_info_received ◀──────┘  (host callback)
//! ```

pub mod bridge;
pub mod error;
pub mod host;

pub use bridge::{BrowserBridge, PageContent, PageInfo};
pub use error::BridgeError;
pub use host::HostChannel;
