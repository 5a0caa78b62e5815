//! Gateway bridge.
//!
//! A worker exposes a callback object (an interface name plus named
//! methods) to a host process over loopback TCP. Frames are newline
//! delimited JSON, see [`protocol`].
//!
//! ```text
//!  worker                                   host
//!  ──────                                   ────
//!  WorkerBridge (Idle)
//!     │ register ─────── Register ───────▶ Gateway
//!     │ ◀──────────────── Registered ────── │
//!  ServingBridge (Serving)                 RemoteObject
//!     │ ◀──────────────── Call ──────────── │ call / get_papers / get_vector
//!     │ ─────── Return | Error ──────────▶  │
//! ```

mod callback;
mod error;
pub mod host;
mod method;
pub mod protocol;
mod worker;

pub use callback::{CallbackBuilder, CallbackObject};
pub use error::{BridgeError, BridgeResult};
pub use host::{with_retry, Gateway, RemoteObject};
pub use method::{int_arg, string_arg, CallContext, Method, MethodMetadata};
pub use protocol::Frame;
pub use worker::{ServingBridge, WorkerBridge};
