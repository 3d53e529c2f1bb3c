//! Process-wide table of named filler factories
//!
//! The registry lets sources be described by name -- in a config file, say -- instead of by
//! type. It has an explicit lifecycle: nothing works until [`init`] installs the built-in
//! factories, and [`teardown`] removes everything again. Calling into the registry outside of
//! that window is an [`Error::RegistryUninitialized`].
//!
//! The built-in factories are:
//!
//! | name         | filler              | parameters                          |
//! |--------------|---------------------|-------------------------------------|
//! | `"zero"`     | [`ConstantFiller`]  | none                                |
//! | `"constant"` | [`ConstantFiller`]  | `byte`                              |
//! | `"memory"`   | [`MemoryFiller`]    | `block` (required), `base`          |
//!
//! ```
//! use redwood::registry::{self, FillerParams};
//! use redwood::{Buffer, Source};
//!
//! registry::init();
//! let filler = registry::create("constant", &FillerParams { byte: 0x41, ..Default::default() })?;
//! let mut buf = Buffer::new(Source::from_boxed(filler, None).with_limit(0..16));
//! assert_eq!(buf.read_to_vec(..)?, [0x41; 16]);
//! registry::teardown();
//! # Ok::<(), redwood::Error>(())
//! ```

use std::collections::BTreeMap;

use parking_lot::{const_mutex, Mutex};

use crate::block::BlockRef;
use crate::source::{ConstantFiller, Filler, MemoryFiller};
use crate::Error;

/// Function that builds a filler from a set of parameters
pub type Factory = Box<dyn Fn(&FillerParams) -> Result<Box<dyn Filler>, Error> + Send + Sync>;

/// Parameters passed to a [`Factory`]; each factory uses whichever of these it needs
#[derive(Debug, Clone, Default)]
pub struct FillerParams {
    pub byte: u8,
    pub block: Option<BlockRef>,
    pub base: u64,
}

static REGISTRY: Mutex<Option<BTreeMap<String, Factory>>> = const_mutex(None);

/// Initializes the registry with the built-in factories
///
/// Does nothing if the registry is already initialized; factories registered since then are
/// kept.
pub fn init() {
    let mut registry = REGISTRY.lock();
    if registry.is_some() {
        return;
    }

    let mut table: BTreeMap<String, Factory> = BTreeMap::new();
    table.insert(
        "zero".into(),
        Box::new(|_: &FillerParams| Ok(Box::new(ConstantFiller::new(0)) as Box<dyn Filler>)),
    );
    table.insert(
        "constant".into(),
        Box::new(|p: &FillerParams| Ok(Box::new(ConstantFiller::new(p.byte)) as Box<dyn Filler>)),
    );
    table.insert("memory".into(), Box::new(memory_factory));

    tracing::debug!(factories = table.len(), "filler registry initialized");
    *registry = Some(table);
}

fn memory_factory(p: &FillerParams) -> Result<Box<dyn Filler>, Error> {
    match &p.block {
        Some(block) => Ok(Box::new(MemoryFiller::new(block.acquire()).at_offset(p.base))),
        None => Err(Error::MissingParam {
            filler: "memory".into(),
            param: "block",
        }),
    }
}

/// Adds a factory under `name`, replacing any factory already registered there
pub fn register<F>(name: &str, factory: F) -> Result<(), Error>
where
    F: 'static + Fn(&FillerParams) -> Result<Box<dyn Filler>, Error> + Send + Sync,
{
    let mut registry = REGISTRY.lock();
    let table = registry.as_mut().ok_or(Error::RegistryUninitialized)?;
    if table.insert(name.to_owned(), Box::new(factory)).is_some() {
        tracing::debug!(name, "replaced filler factory");
    }
    Ok(())
}

/// Builds a filler with the factory registered under `name`
pub fn create(name: &str, params: &FillerParams) -> Result<Box<dyn Filler>, Error> {
    let registry = REGISTRY.lock();
    let table = registry.as_ref().ok_or(Error::RegistryUninitialized)?;
    let factory = table
        .get(name)
        .ok_or_else(|| Error::UnknownFiller(name.to_owned()))?;
    factory(params)
}

/// Returns whether the registry is currently initialized
pub fn is_initialized() -> bool {
    REGISTRY.lock().is_some()
}

/// Drops every registered factory, returning the registry to its uninitialized state
pub fn teardown() {
    if let Some(table) = REGISTRY.lock().take() {
        tracing::debug!(factories = table.len(), "filler registry torn down");
    }
}
