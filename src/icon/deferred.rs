//! Deferred icon resolution
//!
//! Strategies that walk directories or the registry find far more executables
//! than they can afford to extract icons for inline. Their records start with
//! the placeholder icon and the real icon is fetched on the rayon pool. Each
//! record's slot is completed exactly once and, when a collaborator
//! subscribed, exactly one [`IconUpdate`] is sent for it.
//!
//! The dispatcher never assumes a UI thread exists; whoever receives the
//! updates is responsible for moving them onto its own rendering context.

use super::{AppIcon, IconResolver, generated};
use crate::apps::ApplicationRecord;
use parking_lot::{Condvar, Mutex};
use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::mpsc::{Receiver, Sender};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Notification that a record's icon has been resolved
#[derive(Debug, Clone)]
pub struct IconUpdate {
    /// Record identity
    pub id: String,
    /// Resolved (or generated default) icon
    pub icon: AppIcon,
}

/// Counts in-flight fetches so callers can wait for them
#[derive(Default)]
struct PendingTracker {
    count: Mutex<usize>,
    idle: Condvar,
}

/// Decrements the tracker when a fetch task ends
struct PendingGuard(Arc<PendingTracker>);

impl Drop for PendingGuard {
    fn drop(&mut self) {
        let mut count = self.0.count.lock();
        *count = count.saturating_sub(1);
        if *count == 0 {
            self.0.idle.notify_all();
        }
    }
}

/// Resolves icons inline or in the background
#[derive(Clone, Default)]
pub struct IconDispatcher {
    resolver: IconResolver,
    updates: Option<Sender<IconUpdate>>,
    pending: Arc<PendingTracker>,
}

impl IconDispatcher {
    /// Create a dispatcher without a subscriber
    pub fn new(resolver: IconResolver) -> Self {
        Self {
            resolver,
            updates: None,
            pending: Arc::default(),
        }
    }

    /// Send one [`IconUpdate`] per completed deferred fetch to `sender`
    #[must_use]
    pub fn with_updates(mut self, sender: Sender<IconUpdate>) -> Self {
        self.updates = Some(sender);
        self
    }

    /// Resolve an icon on the calling thread
    pub fn resolve_now(&self, target: &str) -> AppIcon {
        self.resolver.resolve(target)
    }

    /// Fetch the record's icon in the background
    ///
    /// The record keeps showing its placeholder until the fetch completes.
    /// Records whose slot is already resolved are left alone.
    pub fn defer(&self, record: &ApplicationRecord) {
        if record.is_icon_resolved() {
            return;
        }

        let slot = record.icon_slot().clone();
        let id = record.id.clone();
        let target = record.executable_path.clone();
        let resolver = self.resolver;
        let updates = self.updates.clone();

        *self.pending.count.lock() += 1;
        let guard = PendingGuard(Arc::clone(&self.pending));

        rayon::spawn(move || {
            let _guard = guard;
            let icon = resolve_contained(&target, || resolver.resolve(&target));
            if slot.complete(icon.clone())
                && let Some(sender) = updates
                && sender.send(IconUpdate { id, icon }).is_err()
            {
                debug!("Icon update receiver dropped");
            }
        });
    }

    /// Number of fetches still running
    pub fn pending(&self) -> usize {
        *self.pending.count.lock()
    }

    /// Block until every deferred fetch has finished or `timeout` elapses
    ///
    /// Returns `true` if all fetches finished.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut count = self.pending.count.lock();
        while *count > 0 {
            if self.pending.idle.wait_until(&mut count, deadline).timed_out() {
                return *count == 0;
            }
        }
        true
    }
}

/// Run `resolve`, turning a panic into the default icon
///
/// Panics escaping a `rayon::spawn` task abort the process.
fn resolve_contained(target: &str, resolve: impl FnOnce() -> AppIcon) -> AppIcon {
    catch_unwind(AssertUnwindSafe(resolve)).unwrap_or_else(|_| {
        warn!("Icon resolution panicked for {target}, using default icon");
        generated::default_icon()
    })
}

/// Gathers [`IconUpdate`]s on a background thread, keyed by record id
pub struct IconCollector {
    received: Arc<Mutex<HashMap<String, AppIcon>>>,
    handle: JoinHandle<()>,
}

impl IconCollector {
    /// Start draining `updates`
    ///
    /// # Errors
    ///
    /// Returns an error if the collector thread cannot be started.
    pub fn spawn(updates: Receiver<IconUpdate>) -> std::io::Result<Self> {
        let received: Arc<Mutex<HashMap<String, AppIcon>>> = Arc::default();
        let sink = Arc::clone(&received);
        let handle = std::thread::Builder::new()
            .name("icon-updates".to_string())
            .spawn(move || {
                for update in updates {
                    sink.lock().insert(update.id, update.icon);
                }
            })?;
        Ok(Self { received, handle })
    }

    /// Updates received so far; may still grow while senders are alive
    pub fn received_so_far(&self) -> usize {
        self.received.lock().len()
    }

    /// Wait until every sender is dropped, then return all icons by record id
    ///
    /// Blocks for as long as any dispatcher or in-flight fetch holds a sender.
    pub fn finish(self) -> HashMap<String, AppIcon> {
        if self.handle.join().is_err() {
            warn!("Icon update collector panicked");
        }
        std::mem::take(&mut *self.received.lock())
    }
}

impl std::fmt::Debug for IconCollector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IconCollector")
            .field("received", &self.received_so_far())
            .finish_non_exhaustive()
    }
}

impl std::fmt::Debug for IconDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IconDispatcher")
            .field("subscribed", &self.updates.is_some())
            .field("pending", &self.pending())
            .finish()
    }
}
