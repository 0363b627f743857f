//! Reusable small-integer identifier pools.
//!
//! Capture sources need a sensor id, device sources a device id, and every
//! source a generic source id. Each id space is a pool with lowest-free-slot
//! allocation and a bijective name↔id binding, so freeing an id makes it
//! eligible for reuse by the next allocation.
//!
//! The allocator is an explicit value with constructor-defined lifetime.
//! Constructors that need an id receive it as an [`Arc`] handle; there is no
//! ambient global state.

use crate::error::{Error, Result};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Well-known pool name for camera sensor ids.
pub const SENSOR_POOL: &str = "sensor";
/// Well-known pool name for capture device ids.
pub const DEVICE_POOL: &str = "device";
/// Well-known pool name for generic source ids.
pub const SOURCE_POOL: &str = "source";

#[derive(Debug, Default)]
struct Pool {
    /// Slot occupancy; index is the id.
    used: Vec<bool>,
    name_to_id: HashMap<String, usize>,
    id_to_name: HashMap<usize, String>,
}

impl Pool {
    fn lowest_free(&self) -> usize {
        self.used
            .iter()
            .position(|slot| !slot)
            .unwrap_or(self.used.len())
    }

    fn bind(&mut self, name: &str, id: usize) {
        if id >= self.used.len() {
            self.used.resize(id + 1, false);
        }
        self.used[id] = true;
        self.name_to_id.insert(name.to_string(), id);
        self.id_to_name.insert(id, name.to_string());
    }

    fn unbind(&mut self, name: &str) -> Option<usize> {
        let id = self.name_to_id.remove(name)?;
        self.id_to_name.remove(&id);
        self.used[id] = false;
        Some(id)
    }
}

/// Thread-safe identifier allocator over named pools.
///
/// `Allocate`/`Free` can be invoked from construction and destruction on any
/// thread, so the pool table sits behind a mutex.
#[derive(Debug, Default)]
pub struct IdentifierAllocator {
    pools: Mutex<HashMap<String, Pool>>,
}

impl IdentifierAllocator {
    /// Create an empty allocator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an allocator wrapped for sharing with component constructors.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Allocate the lowest free id in `pool` and bind it to `name`.
    ///
    /// Fails with `NameNotUnique` if `name` is already bound in this pool.
    pub fn allocate(&self, pool: &str, name: &str) -> Result<usize> {
        let mut pools = self.pools.lock().unwrap();
        let pool = pools.entry(pool.to_string()).or_default();

        if pool.name_to_id.contains_key(name) {
            return Err(Error::NameNotUnique(name.to_string()));
        }

        let id = pool.lowest_free();
        pool.bind(name, id);
        Ok(id)
    }

    /// Bind `name` to an explicit `id`.
    ///
    /// Fails with `NameNotUnique` if `id` is already held by a different
    /// name. Rebinding a name that already holds an id moves it: the old
    /// slot is freed first, so failure leaves the old binding intact.
    pub fn set_explicit(&self, pool: &str, name: &str, id: usize) -> Result<()> {
        let mut pools = self.pools.lock().unwrap();
        let pool = pools.entry(pool.to_string()).or_default();

        match pool.id_to_name.get(&id) {
            Some(holder) if holder == name => return Ok(()),
            Some(holder) => {
                return Err(Error::NameNotUnique(format!(
                    "id {id} is already bound to '{holder}'"
                )));
            }
            None => {}
        }

        pool.unbind(name);
        pool.bind(name, id);
        Ok(())
    }

    /// Free the id bound to `name`, making it eligible for reuse.
    ///
    /// Returns the freed id. Fails with `NotFound` if `name` is unmapped.
    pub fn free(&self, pool: &str, name: &str) -> Result<usize> {
        let mut pools = self.pools.lock().unwrap();
        let pool = pools
            .get_mut(pool)
            .ok_or_else(|| Error::not_found(format!("identifier pool '{pool}'")))?;

        pool.unbind(name)
            .ok_or_else(|| Error::not_found(format!("identifier binding '{name}'")))
    }

    /// Look up the id bound to `name`, if any.
    pub fn id_of(&self, pool: &str, name: &str) -> Option<usize> {
        let pools = self.pools.lock().unwrap();
        pools.get(pool)?.name_to_id.get(name).copied()
    }

    /// Look up the name bound to `id`, if any.
    pub fn name_of(&self, pool: &str, id: usize) -> Option<String> {
        let pools = self.pools.lock().unwrap();
        pools.get(pool)?.id_to_name.get(&id).cloned()
    }

    /// Number of live bindings in `pool`.
    pub fn len(&self, pool: &str) -> usize {
        let pools = self.pools.lock().unwrap();
        pools.get(pool).map_or(0, |p| p.name_to_id.len())
    }

    /// Whether `pool` has no live bindings.
    pub fn is_empty(&self, pool: &str) -> bool {
        self.len(pool) == 0
    }
}
