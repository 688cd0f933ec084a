//! Process identities for the tandem runtime.
//!
//! * [`Uid`] / [`UidGenerator`]: coordination-free 96-bit unique ids
//! * [`ProcessId`]: the immutable, totally ordered identity value
//! * [`NameRegistry`]: name publication, reconciliation and deferred lookups
//! * [`Identities`]: per-node service that mints and publishes identities
//!
//! ```
//! use tandem_identity::Identities;
//!
//! let ids = Identities::new("127.0.0.1", "");
//! let leader = ids.create("Leader", vec![Some(5000)], "leader").unwrap();
//! assert_eq!(ids.lookup("leader"), Some(leader));
//! ```

pub mod display;
pub mod error;
pub mod name;
pub mod pid;
pub mod registry;
mod service;
pub mod uid;

pub use display::{PidDisplay, PidFormat, display_format, set_display_format};
pub use error::{IdentityError, Result};
pub use name::NameKey;
pub use pid::{ProcessId, TransportAddr};
pub use registry::{NameRegistry, ResolveCallback};
pub use service::Identities;
pub use uid::{Uid, UidGenerator, UidParts};
