use serde::{Serialize, Serializer, ser::SerializeStruct};

/// Counters as read from the runtime in a single sample.
///
/// Counters the platform cannot supply are left at their sentinel value,
/// see [`RuntimeSource`](crate::RuntimeSource).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RawCounters {
    pub alloc: u64,
    pub total_alloc: u64,
    pub sys: u64,
    pub mallocs: u64,
    pub frees: u64,
    pub pause_total_ns: u64,
    pub num_gc: u32,
    pub num_threads: usize,
}

/// The latest sampled values held by a [`MemoryRecord`](crate::MemoryRecord).
///
/// Serializes to a flat object with the keys `Alloc`, `TotalAlloc`, `Sys`,
/// `Mallocs`, `Frees`, `LiveObjects`, `PauseTotalNs`, `NumGC` and
/// `NumGoroutine`, always in that order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryStats {
    pub alloc: u64,
    pub total_alloc: u64,
    pub sys: u64,
    pub mallocs: u64,
    pub frees: u64,
    pub pause_total_ns: u64,
    pub num_gc: u32,
    pub num_goroutine: usize,
}

impl MemoryStats {
    /// Objects allocated and not yet freed.
    ///
    /// Saturates at zero: the allocator counters are read one at a time, so a
    /// sample may see a free whose matching allocation it missed.
    #[must_use]
    pub const fn live_objects(&self) -> u64 {
        self.mallocs.saturating_sub(self.frees)
    }
}

impl From<RawCounters> for MemoryStats {
    fn from(raw: RawCounters) -> Self {
        Self {
            alloc: raw.alloc,
            total_alloc: raw.total_alloc,
            sys: raw.sys,
            mallocs: raw.mallocs,
            frees: raw.frees,
            pause_total_ns: raw.pause_total_ns,
            num_gc: raw.num_gc,
            num_goroutine: raw.num_threads,
        }
    }
}

impl Serialize for MemoryStats {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("MemoryStats", 9)?;
        state.serialize_field("Alloc", &self.alloc)?;
        state.serialize_field("TotalAlloc", &self.total_alloc)?;
        state.serialize_field("Sys", &self.sys)?;
        state.serialize_field("Mallocs", &self.mallocs)?;
        state.serialize_field("Frees", &self.frees)?;
        state.serialize_field("LiveObjects", &self.live_objects())?;
        state.serialize_field("PauseTotalNs", &self.pause_total_ns)?;
        state.serialize_field("NumGC", &self.num_gc)?;
        state.serialize_field("NumGoroutine", &self.num_goroutine)?;
        state.end()
    }
}
