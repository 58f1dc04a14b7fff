//! Persistence manager: list, load, save and delete architectures against an
//! [`ArchitectureStore`] while the editor keeps running.
//!
//! Two ordering guarantees are layered on top of the store:
//!
//! * Loads are tagged with a [`LoadToken`] when they are issued. Only the
//!   most recently issued load may be installed into the controller; older
//!   responses that arrive late are discarded.
//! * Saves are ticketed per architecture id when they are issued and written
//!   under a per-id lock. A save whose ticket is older than one already
//!   written is coalesced into it instead of being written, so the store
//!   never sees an out-of-order write.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use skyplan_core::{
    import_from_file, Controller, Error, GraphSnapshot, ImportedArchitecture, Result,
};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::architecture::{Architecture, ArchitectureSummary};
use crate::store::ArchitectureStore;

/// Identifies one issued load. Tokens increase monotonically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LoadToken(u64);

#[derive(Debug, Clone)]
pub struct LoadedArchitecture {
    pub token: LoadToken,
    pub architecture: Architecture,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InstallOutcome {
    Installed { id: String, name: String },
    /// A newer load was issued after this one; nothing was touched.
    Stale,
}

#[derive(Debug, Clone)]
pub struct SaveRequest {
    /// `None` creates a new architecture.
    pub id: Option<String>,
    pub name: String,
    pub snapshot: GraphSnapshot,
}

impl SaveRequest {
    pub fn create(name: impl Into<String>, snapshot: GraphSnapshot) -> Self {
        Self {
            id: None,
            name: name.into(),
            snapshot,
        }
    }

    pub fn update(id: impl Into<String>, name: impl Into<String>, snapshot: GraphSnapshot) -> Self {
        Self {
            id: Some(id.into()),
            name: name.into(),
            snapshot,
        }
    }
}

/// A save that has been ordered but not yet written. Dropping it without
/// committing gives up its place.
#[derive(Debug)]
pub struct SaveTicket {
    id: String,
    seq: u64,
    creates: bool,
    name: String,
    snapshot: GraphSnapshot,
    lock: Arc<tokio::sync::Mutex<()>>,
    lease: SlotLease,
}

impl SaveTicket {
    /// Id the record will be stored under. Known before the write happens,
    /// so a follow-up save can target a record that is still being created.
    pub fn id(&self) -> &str {
        &self.id
    }
}

/// A save running on the tokio runtime.
#[derive(Debug)]
pub struct PendingSave {
    pub id: String,
    pub handle: JoinHandle<Result<Architecture>>,
}

type SaveSlots = Arc<Mutex<HashMap<String, SaveSlot>>>;

/// Write order for one id. A slot lives only while tickets or deletes for
/// the id are outstanding.
#[derive(Debug, Default)]
struct SaveSlot {
    issued: u64,
    written: u64,
    outstanding: usize,
    /// The first ticket for this id was a creation.
    creating: bool,
    /// Last record written while the slot was alive; coalesced saves
    /// resolve to it.
    latest: Option<Architecture>,
    lock: Arc<tokio::sync::Mutex<()>>,
}

/// Holds a slot open. The slot is dropped with its last lease.
#[derive(Debug)]
struct SlotLease {
    slots: SaveSlots,
    id: String,
}

impl Drop for SlotLease {
    fn drop(&mut self) {
        let mut slots = self.slots.lock();
        if let Some(slot) = slots.get_mut(&self.id) {
            slot.outstanding = slot.outstanding.saturating_sub(1);
            if slot.outstanding == 0 {
                slots.remove(&self.id);
            }
        }
    }
}

/// What a ticket sees of its slot once it holds the write lock.
struct SlotState {
    superseded_by: Option<Architecture>,
    written_before: bool,
    latest_updated_at: Option<DateTime<Utc>>,
}

pub struct PersistenceManager<S> {
    store: S,
    owner_id: String,
    latest_load: AtomicU64,
    saves: SaveSlots,
}

fn next_timestamp(now: DateTime<Utc>, previous: Option<DateTime<Utc>>) -> DateTime<Utc> {
    match previous {
        Some(prev) if now <= prev => prev + Duration::milliseconds(1),
        _ => now,
    }
}

impl<S: ArchitectureStore> PersistenceManager<S> {
    pub fn new(store: S, owner_id: impl Into<String>) -> Self {
        Self {
            store,
            owner_id: owner_id.into(),
            latest_load: AtomicU64::new(0),
            saves: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    // --- Listing ---

    /// Point-in-time listing, most recently updated first.
    pub async fn list_architectures(&self, owner_id: &str) -> Result<Vec<ArchitectureSummary>> {
        let mut summaries: Vec<ArchitectureSummary> = self
            .store
            .list(owner_id)
            .await?
            .iter()
            .map(Architecture::summary)
            .collect();
        summaries.sort_by(|a, b| {
            b.updated_at
                .cmp(&a.updated_at)
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(summaries)
    }

    /// Case-insensitive name filter over [`Self::list_architectures`].
    pub async fn find_architectures(
        &self,
        owner_id: &str,
        term: &str,
    ) -> Result<Vec<ArchitectureSummary>> {
        let term = term.trim().to_lowercase();
        let mut summaries = self.list_architectures(owner_id).await?;
        if !term.is_empty() {
            summaries.retain(|s| s.name.to_lowercase().contains(&term));
        }
        Ok(summaries)
    }

    // --- Loading ---

    /// The token is taken when this is called, not when the future is first
    /// polled, so call order decides which load is current.
    pub fn load_architecture(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<LoadedArchitecture>> + '_ {
        let token = LoadToken(self.latest_load.fetch_add(1, Ordering::SeqCst) + 1);
        let id = id.to_string();
        debug!("load {} issued with token {:?}", id, token);
        async move {
            let architecture = self
                .store
                .get(&id)
                .await?
                .ok_or(Error::ArchitectureNotFound(id))?;
            Ok(LoadedArchitecture {
                token,
                architecture,
            })
        }
    }

    pub fn is_current(&self, token: LoadToken) -> bool {
        self.latest_load.load(Ordering::SeqCst) == token.0
    }

    /// Invalidate every load still in flight, e.g. when the user starts a
    /// fresh canvas.
    pub fn supersede_pending_loads(&self) {
        self.latest_load.fetch_add(1, Ordering::SeqCst);
    }

    /// Restore a loaded architecture into the controller unless a newer load
    /// has been issued since. A record that fails validation leaves the
    /// controller untouched.
    pub fn install(
        &self,
        loaded: LoadedArchitecture,
        controller: &mut Controller,
    ) -> Result<InstallOutcome> {
        let architecture = loaded.architecture;
        if !self.is_current(loaded.token) {
            warn!(
                "discarding stale load of {} ({:?})",
                architecture.id, loaded.token
            );
            return Ok(InstallOutcome::Stale);
        }
        controller.install(architecture.snapshot()).map_err(|e| {
            let id = &architecture.id;
            Error::PersistenceFailure(format!("stored architecture '{}' is invalid: {}", id, e))
        })?;
        info!("loaded architecture {} ({})", architecture.id, architecture.name);
        Ok(InstallOutcome::Installed {
            id: architecture.id,
            name: architecture.name,
        })
    }

    /// Parse an export file and install it, superseding any load in flight.
    pub fn import_into(
        &self,
        bytes: &[u8],
        controller: &mut Controller,
    ) -> Result<ImportedArchitecture> {
        let imported = import_from_file(bytes, controller.graph().taxonomy())?;
        self.supersede_pending_loads();
        controller
            .install(imported.snapshot.clone())
            .map_err(|e| Error::MalformedImport(e.to_string()))?;
        info!("imported '{}'", imported.name);
        Ok(imported)
    }

    // --- Saving ---

    /// Take a lease on the slot for `id`, creating the slot if needed.
    fn lease<'a>(
        &self,
        slots: &'a mut HashMap<String, SaveSlot>,
        id: &str,
        creates: bool,
    ) -> (&'a mut SaveSlot, SlotLease) {
        let slot = slots.entry(id.to_string()).or_insert_with(|| SaveSlot {
            creating: creates,
            ..SaveSlot::default()
        });
        slot.outstanding += 1;
        let lease = SlotLease {
            slots: Arc::clone(&self.saves),
            id: id.to_string(),
        };
        (slot, lease)
    }

    /// Validate the request and take its place in the per-id write order.
    pub fn prepare_save(&self, request: SaveRequest) -> Result<SaveTicket> {
        let name = request.name.trim().to_string();
        if name.is_empty() {
            return Err(Error::Validation("Architecture name must not be empty".into()));
        }
        let (id, creates_now) = match request.id {
            Some(id) => (id, false),
            None => (Uuid::new_v4().to_string(), true),
        };

        let mut saves = self.saves.lock();
        let (slot, lease) = self.lease(&mut saves, &id, creates_now);
        slot.issued += 1;
        Ok(SaveTicket {
            seq: slot.issued,
            creates: slot.creating,
            lock: Arc::clone(&slot.lock),
            id,
            name,
            snapshot: request.snapshot,
            lease,
        })
    }

    /// Write a prepared save. Returns the stored record, which for a
    /// coalesced save is the newer record that superseded it.
    pub async fn commit_save(&self, ticket: SaveTicket) -> Result<Architecture> {
        let SaveTicket {
            id,
            seq,
            creates,
            name,
            snapshot,
            lock,
            lease: _lease,
        } = ticket;
        let _guard = lock.lock().await;

        let state = self.slot_state(&id, seq);
        if let Some(latest) = state.superseded_by {
            debug!("save #{} of {} coalesced into a newer write", seq, id);
            return Ok(latest);
        }

        let existing = self.store.get(&id).await.map_err(|e| {
            warn!("save of {} failed: {}", id, e);
            e
        })?;
        let now = Utc::now();
        let (created_at, owner_id) = match &existing {
            Some(record) => (record.created_at, record.owner_id.clone()),
            None if creates && !state.written_before => (now, self.owner_id.clone()),
            None => return Err(Error::ArchitectureNotFound(id)),
        };
        let floor = existing
            .as_ref()
            .map(|r| r.updated_at)
            .max(state.latest_updated_at);

        let record = Architecture {
            id,
            name,
            owner_id,
            nodes: snapshot.nodes,
            edges: snapshot.edges,
            created_at,
            updated_at: next_timestamp(now, floor),
        };
        if let Err(e) = self.store.put(&record).await {
            warn!("save of {} failed: {}", record.id, e);
            return Err(e);
        }

        if let Some(slot) = self.saves.lock().get_mut(&record.id) {
            slot.written = slot.written.max(seq);
            slot.latest = Some(record.clone());
        }
        info!(
            "saved architecture {} ({}) with {} node(s)",
            record.id,
            record.name,
            record.nodes.len()
        );
        Ok(record)
    }

    /// Prepare and commit in one step. The write order is fixed by call
    /// order, not by when the returned future is awaited.
    pub fn save_architecture(
        &self,
        request: SaveRequest,
    ) -> impl Future<Output = Result<Architecture>> + '_ {
        let prepared = self.prepare_save(request);
        async move { self.commit_save(prepared?).await }
    }

    fn slot_state(&self, id: &str, seq: u64) -> SlotState {
        let saves = self.saves.lock();
        let Some(slot) = saves.get(id) else {
            return SlotState {
                superseded_by: None,
                written_before: false,
                latest_updated_at: None,
            };
        };
        let superseded_by = if slot.written >= seq {
            slot.latest.clone()
        } else {
            None
        };
        SlotState {
            superseded_by,
            written_before: slot.written > 0,
            latest_updated_at: slot.latest.as_ref().map(|r| r.updated_at),
        }
    }

    #[cfg(test)]
    fn open_slots(&self) -> usize {
        self.saves.lock().len()
    }

    // --- Deleting ---

    /// No-op when the architecture is already gone. Waits for any write of
    /// the same id in progress.
    pub async fn delete_architecture(&self, id: &str) -> Result<()> {
        let (lock, _lease) = {
            let mut saves = self.saves.lock();
            let (slot, lease) = self.lease(&mut saves, id, false);
            (Arc::clone(&slot.lock), lease)
        };
        let _guard = lock.lock().await;
        self.store.remove(id).await?;
        info!("deleted architecture {}", id);
        Ok(())
    }
}

impl<S: ArchitectureStore + 'static> PersistenceManager<S> {
    /// Fire-and-forget save. Validation errors are returned immediately; the
    /// write result arrives through the join handle.
    pub fn spawn_save(self: &Arc<Self>, request: SaveRequest) -> Result<PendingSave> {
        let ticket = self.prepare_save(request)?;
        let id = ticket.id.clone();
        let manager = Arc::clone(self);
        let handle = tokio::spawn(async move { manager.commit_save(ticket).await });
        Ok(PendingSave { id, handle })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use chrono::TimeZone;

    #[test]
    fn timestamps_never_go_backwards() {
        let t = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        assert_eq!(next_timestamp(t, None), t);
        assert_eq!(next_timestamp(t, Some(t - Duration::seconds(1))), t);
        assert_eq!(next_timestamp(t, Some(t)), t + Duration::milliseconds(1));
        let ahead = t + Duration::seconds(5);
        assert_eq!(
            next_timestamp(t, Some(ahead)),
            ahead + Duration::milliseconds(1)
        );
    }

    fn manager() -> PersistenceManager<MemoryStore> {
        PersistenceManager::new(MemoryStore::new(), "local")
    }

    #[tokio::test]
    async fn slots_are_released_after_each_save() {
        let manager = manager();
        let created = manager
            .save_architecture(SaveRequest::create("Demo", GraphSnapshot::default()))
            .await
            .unwrap();
        assert_eq!(manager.open_slots(), 0);

        for name in ["Renamed", "Renamed again"] {
            let request = SaveRequest::update(&created.id, name, GraphSnapshot::default());
            manager.save_architecture(request).await.unwrap();
        }
        manager.delete_architecture(&created.id).await.unwrap();
        assert_eq!(manager.open_slots(), 0);
    }

    #[tokio::test]
    async fn coalesced_ticket_resolves_before_its_slot_is_released() {
        let manager = manager();
        let first = manager
            .prepare_save(SaveRequest::create("Draft", GraphSnapshot::default()))
            .unwrap();
        let id = first.id().to_string();
        let second = manager
            .prepare_save(SaveRequest::update(&id, "Final", GraphSnapshot::default()))
            .unwrap();
        assert_eq!(manager.open_slots(), 1);

        let newer = manager.commit_save(second).await.unwrap();
        assert_eq!(manager.open_slots(), 1);
        let older = manager.commit_save(first).await.unwrap();
        assert_eq!(older, newer);
        assert_eq!(older.name, "Final");
        assert_eq!(manager.open_slots(), 0);
    }

    #[tokio::test]
    async fn dropped_ticket_gives_up_its_slot() {
        let manager = manager();
        let ticket = manager
            .prepare_save(SaveRequest::create("Abandoned", GraphSnapshot::default()))
            .unwrap();
        let id = ticket.id().to_string();
        drop(ticket);
        assert_eq!(manager.open_slots(), 0);

        // The creation was never written, so the id is unknown.
        let request = SaveRequest::update(&id, "Late", GraphSnapshot::default());
        let err = manager.save_architecture(request).await.unwrap_err();
        assert_eq!(err, Error::ArchitectureNotFound(id));
    }
}
