use corex_types::{Error, SessionId};
use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Opaque handle to one isolated code-execution environment. The actual
/// isolation technology (subprocess, container, microVM) is out of scope
/// for the core; callers that need to run code against this handle do so
/// through a tool that owns that integration.
#[derive(Debug, Clone)]
pub struct SandboxInstance {
    pub id: String,
    use_count: u32,
}

impl SandboxInstance {
    fn new(id: String) -> Self {
        Self { id, use_count: 0 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SlotState {
    Idle,
    Acquiring,
    Busy,
}

struct Slot {
    state: SlotState,
    instance: Option<SandboxInstance>,
    session: Option<SessionId>,
    last_used: Instant,
}

impl Slot {
    fn empty() -> Self {
        Self { state: SlotState::Idle, instance: None, session: None, last_used: Instant::now() }
    }
}

struct PoolState {
    slots: Vec<Slot>,
    /// Sessions with an acquire call currently in flight (between marking a
    /// slot `acquiring` and that call returning). A second `acquire` for the
    /// same session while one is in flight is a race, not a legitimate
    /// reentrant call, and is rejected.
    in_flight: HashSet<SessionId>,
    /// Sessions holding a completed lease, and which slot it lives in.
    leases: HashMap<SessionId, usize>,
}

/// Bounded pool of sandbox instances, leased to sessions one at a time.
/// Per-instance state (`idle`/`acquiring`/`busy`) avoids a
/// check-then-create race: the `acquiring` marker is set inside the lock
/// before the slow creation step runs outside it.
pub struct SandboxPool {
    state: Mutex<PoolState>,
    max: usize,
    min: usize,
    idle_timeout: Duration,
    max_use_count: u32,
    next_id: Mutex<u64>,
}

/// A lease on a sandbox instance; release it explicitly via
/// [`SandboxPool::release`] when the caller is done (the spec models
/// cancellation as releasing all leases held by the cancelled run).
pub struct SandboxLease {
    pub instance: SandboxInstance,
    pub session_id: SessionId,
}

impl SandboxPool {
    pub fn new(max: usize, min: usize, idle_timeout: Duration, max_use_count: u32) -> Self {
        let slots = (0..min).map(|_| Slot::empty()).collect();
        Self {
            state: Mutex::new(PoolState { slots, in_flight: HashSet::new(), leases: HashMap::new() }),
            max,
            min,
            idle_timeout,
            max_use_count,
            next_id: Mutex::new(0),
        }
    }

    /// Acquire the pool's instance for `session_id`. Reentrant while the
    /// session already holds a lease (returns the same instance); rejects
    /// with `concurrent_access` if a prior acquire for the same session is
    /// still in flight.
    pub async fn acquire(&self, session_id: &SessionId) -> corex_types::Result<SandboxLease> {
        let slot_index = {
            let mut state = self.state.lock().await;

            if let Some(&idx) = state.leases.get(session_id) {
                let instance = state.slots[idx].instance.clone().expect("leased slot has an instance");
                return Ok(SandboxLease { instance, session_id: session_id.clone() });
            }
            if state.in_flight.contains(session_id) {
                return Err(Error::ConcurrentAccess(session_id.to_string()));
            }

            let idx = match state.slots.iter().position(|s| s.state == SlotState::Idle) {
                Some(idx) => idx,
                None if state.slots.len() < self.max => {
                    state.slots.push(Slot::empty());
                    state.slots.len() - 1
                }
                None => return Err(Error::SandboxRejected("pool exhausted".into())),
            };
            state.slots[idx].state = SlotState::Acquiring;
            state.in_flight.insert(session_id.clone());
            idx
        };

        let needs_create = {
            let state = self.state.lock().await;
            state.slots[slot_index].instance.is_none()
        };
        let instance = if needs_create { self.create_instance().await } else {
            self.state.lock().await.slots[slot_index].instance.clone().expect("checked above")
        };

        let mut state = self.state.lock().await;
        state.slots[slot_index].instance = Some(instance.clone());
        state.slots[slot_index].state = SlotState::Busy;
        state.slots[slot_index].session = Some(session_id.clone());
        state.slots[slot_index].last_used = Instant::now();
        state.in_flight.remove(session_id);
        state.leases.insert(session_id.clone(), slot_index);

        Ok(SandboxLease { instance, session_id: session_id.clone() })
    }

    pub async fn release(&self, session_id: &SessionId) {
        let mut state = self.state.lock().await;
        if let Some(idx) = state.leases.remove(session_id) {
            if let Some(instance) = &mut state.slots[idx].instance {
                instance.use_count += 1;
            }
            state.slots[idx].state = SlotState::Idle;
            state.slots[idx].session = None;
            state.slots[idx].last_used = Instant::now();
        }
    }

    /// Destroy idle instances that have exceeded the idle timeout or their
    /// use-count cap, down to `min` warm slots. Intended to be called
    /// periodically by the orchestrator's background tick.
    pub async fn evict_idle(&self) {
        let mut state = self.state.lock().await;
        let min = self.min;
        let idle_timeout = self.idle_timeout;
        let max_use_count = self.max_use_count;

        let mut live_idle = state.slots.iter().filter(|s| s.state == SlotState::Idle).count();
        for slot in state.slots.iter_mut() {
            if slot.state != SlotState::Idle || slot.instance.is_none() {
                continue;
            }
            let expired = slot.last_used.elapsed() >= idle_timeout;
            let overused = slot.instance.as_ref().is_some_and(|i| i.use_count >= max_use_count);
            if (expired || overused) && live_idle > min {
                slot.instance = None;
                live_idle -= 1;
            }
        }
    }

    pub async fn live_instance_count(&self) -> usize {
        self.state.lock().await.slots.iter().filter(|s| s.instance.is_some()).count()
    }

    async fn create_instance(&self) -> SandboxInstance {
        let mut next_id = self.next_id.lock().await;
        *next_id += 1;
        SandboxInstance::new(format!("sandbox-{}", *next_id))
    }
}
