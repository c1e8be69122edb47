/// Accounting for geometry and material allocations held by meshes
use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

#[derive(Debug, Default)]
struct Counters {
    live_geometries: Cell<usize>,
    live_materials: Cell<usize>,
    acquired: Cell<usize>,
    released: Cell<usize>,
}

/// Tracks every buffer a parsed mesh holds until it is disposed.
///
/// Cloning a ledger shares its counters.
#[derive(Debug, Clone, Default)]
pub struct ResourceLedger {
    counters: Rc<Counters>,
}

impl ResourceLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Account for `geometries` buffers and `materials` material slots
    pub fn lease(&self, geometries: usize, materials: usize) -> ResourceLease {
        let c = &self.counters;
        c.live_geometries.set(c.live_geometries.get() + geometries);
        c.live_materials.set(c.live_materials.get() + materials);
        c.acquired.set(c.acquired.get() + 1);

        ResourceLease {
            counters: Some(Rc::clone(&self.counters)),
            geometries,
            materials,
        }
    }

    pub fn live_geometries(&self) -> usize {
        self.counters.live_geometries.get()
    }

    pub fn live_materials(&self) -> usize {
        self.counters.live_materials.get()
    }

    /// Leases handed out and not yet released
    pub fn live_leases(&self) -> usize {
        self.counters.acquired.get() - self.counters.released.get()
    }

    pub fn total_acquired(&self) -> usize {
        self.counters.acquired.get()
    }

    pub fn total_released(&self) -> usize {
        self.counters.released.get()
    }
}

/// Allocations owned by one mesh; released once, explicitly or on drop
pub struct ResourceLease {
    counters: Option<Rc<Counters>>,
    geometries: usize,
    materials: usize,
}

impl ResourceLease {
    pub fn release(&mut self) {
        if let Some(c) = self.counters.take() {
            c.live_geometries.set(c.live_geometries.get() - self.geometries);
            c.live_materials.set(c.live_materials.get() - self.materials);
            c.released.set(c.released.get() + 1);
        }
    }

    pub fn is_released(&self) -> bool {
        self.counters.is_none()
    }
}

impl fmt::Debug for ResourceLease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceLease")
            .field("geometries", &self.geometries)
            .field("materials", &self.materials)
            .field("released", &self.is_released())
            .finish()
    }
}

impl Drop for ResourceLease {
    fn drop(&mut self) {
        if !self.is_released() {
            log::debug!(
                "releasing undisposed lease ({} geometries, {} materials)",
                self.geometries,
                self.materials
            );
            self.release();
        }
    }
}
