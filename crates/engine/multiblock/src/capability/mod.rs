//! Capabilities exposed by structure members and the proxies binding them

mod io;
mod proxy;
mod storage;
mod table;

pub use io::{Capability, Io};
pub use proxy::CapabilityProxy;
pub use storage::{ResourceStorage, SharedStorage, StorageProxy};
pub use table::ProxyTable;
