//! mbcheck - validate multiblock scenarios outside a running world
//!
//! A scenario file (KDL) declares one controller, its pattern, its recipes and
//! the cells around it. [`run`] validates the controller the way a server
//! would on chunk load, ticks the manager and reports what happened.
//!
//! ```rust
//! use mbcheck::{run, RunOptions, Scenario};
//!
//! let scenario = Scenario::from_string(r#"
//!     controller "mbd:tank" 0 0 0
//!     pattern {
//!         aisle "CSC"
//!         symbol "S" controller="mbd:tank"
//!         symbol "C" "mbd:glass"
//!     }
//!     world {
//!         block "mbd:glass" -1 0 0
//!         block "mbd:glass" 1 0 0
//!     }
//! "#).unwrap();
//!
//! let report = run(scenario, &RunOptions::default()).unwrap();
//! assert!(report.is_formed());
//! assert_eq!(report.members, 3);
//! ```

pub mod run;
pub mod scenario;

pub use run::{run, Report, RunOptions, StorageReport};
pub use scenario::Scenario;
