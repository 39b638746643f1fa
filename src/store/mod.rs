//! Local mirror of everything the user submitted
//!
//! The mirror lets the client show organizations, memberships and reports
//! without asking the network. It is a cache: losing it costs visibility,
//! never funds or submissions, so load and flush failures are logged and
//! absorbed instead of returned.
//!
//! The whole mirror is one JSON document under [`STORAGE_KEY`]. It is loaded
//! on first access and written back whole after every mutation, with the
//! read-modify-write held under a single lock.

mod backend;

pub use backend::{FileBackend, MemoryBackend, StorageBackend};

use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::codec::ScalarValue;
use crate::model::{
    now_ms, ActivityEntry, ActivityKind, Member, Organization, Report, ReportStatus,
};

/// Key of the persisted mirror document
pub const STORAGE_KEY: &str = "zkwhistle_data";

/// Activity entries kept, most recent first
pub const ACTIVITY_CAPACITY: usize = 20;

/// The persisted document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerDocument {
    #[serde(default)]
    pub orgs: Vec<Organization>,
    #[serde(default)]
    pub members: Vec<Member>,
    #[serde(default)]
    pub reports: Vec<Report>,
    #[serde(default)]
    pub activity: Vec<ActivityEntry>,
}

impl LedgerDocument {
    fn push_activity(&mut self, entry: ActivityEntry) {
        self.activity.insert(0, entry);
        self.activity.truncate(ACTIVITY_CAPACITY);
    }
}

/// Persisted local mirror
///
/// # Example
///
/// ```rust,ignore
/// use whistle_client::store::{FileBackend, LocalLedgerStore};
///
/// let store = LocalLedgerStore::new(FileBackend::new("/tmp/whistle"));
/// for org in store.list_organizations() {
///     println!("{} {}", org.name, org.org_id);
/// }
/// ```
pub struct LocalLedgerStore {
    backend: Box<dyn StorageBackend>,
    /// `None` until the first access loads it
    document: Mutex<Option<LedgerDocument>>,
}

impl LocalLedgerStore {
    pub fn new(backend: impl StorageBackend + 'static) -> Self {
        Self {
            backend: Box::new(backend),
            document: Mutex::new(None),
        }
    }

    /// Store backed by memory only
    pub fn in_memory() -> Self {
        Self::new(MemoryBackend::new())
    }

    // ==================== Mutations ====================

    /// Record a registered organization
    ///
    /// Returns `false` (and changes nothing) if the id is already mirrored
    /// or is not a canonical literal.
    pub fn insert_organization(&self, org: Organization) -> bool {
        if !storable(&[Some(&org.org_id)]) {
            return false;
        }
        self.mutate(|doc| {
            if doc.orgs.iter().any(|o| o.org_id == org.org_id) {
                return false;
            }
            let entry = ActivityEntry::new(
                ActivityKind::OrgRegistered,
                format!("Organization \"{}\" registered", org.name),
                Some(org.org_id.to_string()),
            );
            doc.orgs.push(org);
            doc.push_activity(entry);
            true
        })
    }

    /// Record a membership, keyed by `(member_hash, org_id)`
    pub fn insert_member(&self, member: Member) -> bool {
        let scalars = [
            member.org_id.as_ref(),
            member.member_hash.as_ref(),
            member.secret.as_ref(),
        ];
        if !storable(&scalars) {
            return false;
        }
        self.mutate(|doc| {
            let exists = doc
                .members
                .iter()
                .any(|m| m.member_hash == member.member_hash && m.org_id == member.org_id);
            if exists {
                return false;
            }

            let org_ref = member.org_id.as_ref().map(|o| o.to_string());
            let short: String = org_ref.as_deref().unwrap_or("?").chars().take(12).collect();
            let kind = if member.member_hash.is_some() {
                ActivityKind::MemberAdded
            } else {
                ActivityKind::MemberJoined
            };
            let entry = ActivityEntry::new(kind, format!("Member added to org {short}..."), org_ref);
            doc.members.push(member);
            doc.push_activity(entry);
            true
        })
    }

    /// Record a submitted report
    pub fn insert_report(&self, report: Report) -> bool {
        if !storable(&[Some(&report.report_id), Some(&report.org_id)]) {
            return false;
        }
        self.mutate(|doc| {
            if doc.reports.iter().any(|r| r.report_id == report.report_id) {
                return false;
            }
            let entry = ActivityEntry::new(
                ActivityKind::ReportSubmitted,
                format!("Anonymous report submitted ({})", report.severity.label()),
                Some(report.report_id.to_string()),
            );
            doc.reports.push(report);
            doc.push_activity(entry);
            true
        })
    }

    /// Associate a locally known secret with a membership hash
    ///
    /// Fills in the first member carrying `hash`; if none exists yet, a
    /// hash-and-secret-only member is recorded with no organization.
    pub fn attach_secret_to_member(&self, hash: &ScalarValue, secret: &ScalarValue) {
        if !storable(&[Some(hash), Some(secret)]) {
            return;
        }
        self.mutate(|doc| {
            match doc
                .members
                .iter_mut()
                .find(|m| m.member_hash.as_ref() == Some(hash))
            {
                Some(member) => member.secret = Some(secret.clone()),
                None => doc.members.push(Member {
                    org_id: None,
                    member_hash: Some(hash.clone()),
                    secret: Some(secret.clone()),
                    tx_id: None,
                    created_at: now_ms(),
                }),
            }
            true
        });
    }

    /// Append an activity entry, evicting the oldest beyond capacity
    pub fn append_activity(&self, entry: ActivityEntry) {
        self.mutate(|doc| {
            doc.push_activity(entry);
            true
        });
    }

    /// Cache a status change submitted for a report
    ///
    /// The activity entry is recorded even for reports this client did not
    /// submit (admins update other members' reports). Returns whether a
    /// mirrored report was updated.
    pub fn update_report_status(&self, report_id: &ScalarValue, status: ReportStatus) -> bool {
        self.mutate_with(|doc| {
            let found = match doc.reports.iter_mut().find(|r| &r.report_id == report_id) {
                Some(report) => {
                    report.status = status;
                    true
                }
                None => false,
            };
            doc.push_activity(ActivityEntry::new(
                ActivityKind::StatusUpdated,
                format!("Report status updated to {}", status.label()),
                Some(report_id.to_string()),
            ));
            (found, true)
        })
    }

    /// Drop the whole mirror, in memory and on disk
    pub fn reset(&self) {
        let mut guard = self.lock();
        *guard = Some(LedgerDocument::default());
        if let Err(e) = self.backend.remove(STORAGE_KEY) {
            warn!(error = %e, "Failed to remove persisted mirror");
        }
    }

    // ==================== Snapshots ====================

    pub fn list_organizations(&self) -> Vec<Organization> {
        self.read(|doc| doc.orgs.clone())
    }

    pub fn list_members(&self) -> Vec<Member> {
        self.read(|doc| doc.members.clone())
    }

    pub fn list_reports(&self) -> Vec<Report> {
        self.read(|doc| doc.reports.clone())
    }

    /// Activity, most recent first
    pub fn list_activity(&self) -> Vec<ActivityEntry> {
        self.read(|doc| doc.activity.clone())
    }

    /// Full document snapshot
    pub fn snapshot(&self) -> LedgerDocument {
        self.read(|doc| doc.clone())
    }

    /// Secret of a member of `org_id`, if one was saved
    pub fn secret_for_org(&self, org_id: &ScalarValue) -> Option<ScalarValue> {
        self.read(|doc| {
            doc.members
                .iter()
                .find(|m| m.org_id.as_ref() == Some(org_id) && m.secret.is_some())
                .and_then(|m| m.secret.clone())
        })
    }

    pub fn has_organization(&self, org_id: &ScalarValue) -> bool {
        self.read(|doc| doc.orgs.iter().any(|o| &o.org_id == org_id))
    }

    pub fn has_report(&self, report_id: &ScalarValue) -> bool {
        self.read(|doc| doc.reports.iter().any(|r| &r.report_id == report_id))
    }

    /// Most recently registered organization
    pub fn latest_org_id(&self) -> Option<ScalarValue> {
        self.read(|doc| doc.orgs.last().map(|o| o.org_id.clone()))
    }

    // ==================== Internals ====================

    fn lock(&self) -> MutexGuard<'_, Option<LedgerDocument>> {
        self.document.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn read<R>(&self, f: impl FnOnce(&LedgerDocument) -> R) -> R {
        let mut guard = self.lock();
        let doc = guard.get_or_insert_with(|| self.load());
        f(doc)
    }

    /// Run `f` under the lock and flush unless it left the document untouched
    ///
    /// `f` returns its result and whether it changed the document.
    fn mutate_with<R>(&self, f: impl FnOnce(&mut LedgerDocument) -> (R, bool)) -> R {
        let mut guard = self.lock();
        let doc = guard.get_or_insert_with(|| self.load());
        let (result, changed) = f(doc);
        if changed {
            self.flush(doc);
        }
        result
    }

    /// [`Self::mutate_with`] for closures whose only result is "changed"
    fn mutate(&self, f: impl FnOnce(&mut LedgerDocument) -> bool) -> bool {
        self.mutate_with(|doc| {
            let changed = f(doc);
            (changed, changed)
        })
    }

    fn load(&self) -> LedgerDocument {
        let raw = match self.backend.read(STORAGE_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return LedgerDocument::default(),
            Err(e) => {
                warn!(error = %e, "Local mirror unreadable, starting empty");
                return LedgerDocument::default();
            }
        };

        match serde_json::from_str(&raw) {
            Ok(doc) => doc,
            Err(e) => {
                warn!(error = %e, "Local mirror corrupt, starting empty");
                LedgerDocument::default()
            }
        }
    }

    fn flush(&self, doc: &LedgerDocument) {
        let result = serde_json::to_string(doc)
            .map_err(std::io::Error::from)
            .and_then(|json| self.backend.write(STORAGE_KEY, &json));

        match result {
            Ok(()) => debug!(
                orgs = doc.orgs.len(),
                members = doc.members.len(),
                reports = doc.reports.len(),
                "Local mirror flushed"
            ),
            Err(e) => warn!(error = %e, "Failed to persist local mirror"),
        }
    }
}

/// Every present scalar must survive a save and reload
///
/// A single unreadable literal would make the whole document fail to load.
fn storable(scalars: &[Option<&ScalarValue>]) -> bool {
    match scalars.iter().flatten().find(|v| !v.is_canonical()) {
        Some(bad) => {
            warn!(value = %bad, "Refusing to mirror a malformed ledger literal");
            false
        }
        None => true,
    }
}
