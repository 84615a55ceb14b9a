//! Console log bridge.
//!
//! Connector logs are forwarded to the connector manager as `log` events.
//! A [`LogHandler`] carries a level threshold shared through a [`LevelVar`],
//! a list of attributes and a list of open groups. Both lists are persistent:
//! deriving a handler pushes onto a shared tail, so sibling loggers derived
//! from the same parent never see each other's additions.
//!
//! ```text
//!   base ── with(test=test) ──┬── with(attr1=toto)   {"test":"test","attr1":"toto"}
//!                             └── with(attr2=foo)    {"test":"test","attr2":"foo"}
//! ```
//!
//! [`Logger`] is the call-site facade, and [`ConsoleLayer`] plugs the same
//! handler into a `tracing` subscriber.

mod attr;
mod chain;
mod handler;
mod layer;
mod level;
mod logger;

pub use attr::Attr;
pub use handler::{LogHandler, Record};
pub use layer::ConsoleLayer;
pub use level::{Level, LevelVar};
pub use logger::Logger;
