//! HTTP/1.x request handling.
//!
//! Only the request line matters to a forward proxy: the method selects
//! tunnel versus forward, the target names the origin. Headers and body are
//! parsed just far enough to know where the request ends and are then
//! forwarded untouched.

pub mod parser;
pub mod target;

pub use parser::{Event, RequestHead, RequestParser};
pub use target::{resolve, TargetAddr};
