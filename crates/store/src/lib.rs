//! Keystone object store.
//!
//! A [`StoreSession`] resolves a URI, or an attached stream, to a loader
//! from a [`LoaderRegistry`] and pulls keys, certificates, CRLs and names
//! out of it one at a time. The built-in `file` loader reads PEM files
//! and lists directories.
//!
//! ```no_run
//! use keystone_store::{LoaderRegistry, ObjectType, OpenOptions, StoreSession};
//!
//! let registry = LoaderRegistry::with_defaults();
//! let options = OpenOptions::new().expect(ObjectType::Certificate);
//! let mut session = StoreSession::open(&registry, "file:///etc/keystone/ca.pem", options)?;
//! for object in &mut session {
//!     println!("{}", object.certificate()?.subject());
//! }
//! assert!(!session.error());
//! session.close()?;
//! # Ok::<(), keystone_store::StoreError>(())
//! ```

pub mod error;
pub mod file;
pub mod loader;
pub mod object;
pub mod passphrase;
pub mod pem;
pub mod registry;
pub mod search;
pub mod session;

pub use error::{StoreError, StoreResult};
pub use file::FileLoader;
pub use loader::{LoaderContext, LoaderParam, ParamKind, StoreLoader};
pub use object::{KeyParameters, ObjectType, StoreObject};
pub use passphrase::{PassphraseCache, PassphraseSource, StaticPassphrase};
pub use registry::{LoaderProvider, LoaderRegistry};
pub use search::{SearchCriterion, SearchType};
pub use session::{candidate_schemes, OpenOptions, PostProcess, StoreSession};
