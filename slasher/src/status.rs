use crate::Error;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use ssz::{Decode, DecodeError, Encode};
use std::collections::HashMap;
use std::fmt;
use strum::{Display, EnumString};
use tree_hash::TreeHash;
use types::Hash256;

/// Lifecycle of a discovered slashing.
///
/// `Unknown -> Active -> Included -> Reverted -> Active -> ...`
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SlashingStatus {
    #[default]
    Unknown,
    /// Discovered and not yet included on chain.
    Active,
    /// Included in a block.
    Included,
    /// The including block was reverted, so the evidence is relevant again.
    Reverted,
}

impl SlashingStatus {
    fn as_u8(self) -> u8 {
        match self {
            SlashingStatus::Unknown => 0,
            SlashingStatus::Active => 1,
            SlashingStatus::Included => 2,
            SlashingStatus::Reverted => 3,
        }
    }

    pub fn can_transition_to(self, next: SlashingStatus) -> bool {
        use SlashingStatus::*;

        matches!(
            (self, next),
            (Unknown, Active) | (Active, Included) | (Included, Reverted) | (Reverted, Active)
        )
    }
}

/// SSZ-encoded as a single byte.
impl Encode for SlashingStatus {
    fn is_ssz_fixed_len() -> bool {
        true
    }

    fn ssz_fixed_len() -> usize {
        1
    }

    fn ssz_bytes_len(&self) -> usize {
        1
    }

    fn ssz_append(&self, buf: &mut Vec<u8>) {
        buf.push(self.as_u8())
    }
}

impl Decode for SlashingStatus {
    fn is_ssz_fixed_len() -> bool {
        true
    }

    fn ssz_fixed_len() -> usize {
        1
    }

    fn from_ssz_bytes(bytes: &[u8]) -> Result<Self, DecodeError> {
        match u8::from_ssz_bytes(bytes)? {
            0 => Ok(SlashingStatus::Unknown),
            1 => Ok(SlashingStatus::Active),
            2 => Ok(SlashingStatus::Included),
            3 => Ok(SlashingStatus::Reverted),
            other => Err(DecodeError::BytesInvalid(format!(
                "invalid slashing status: {}",
                other
            ))),
        }
    }
}

/// Handle to a slashing held by a `SlashingStatusTracker`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SlashingId(u64);

impl SlashingId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }

    fn as_index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for SlashingId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug)]
struct TrackedSlashing<T> {
    evidence: T,
    status: Mutex<SlashingStatus>,
}

#[derive(Debug)]
struct TrackerInner<T> {
    /// Indexed by `SlashingId`, in insertion order.
    records: Vec<TrackedSlashing<T>>,
    ids_by_root: HashMap<Hash256, SlashingId>,
}

/// Append-only store of slashing evidence and the status of each piece.
///
/// Evidence is identified by its tree hash root, so recording the same slashing twice yields the
/// same id. Records are never removed: `Included` and `Reverted` evidence stays queryable.
#[derive(Debug)]
pub struct SlashingStatusTracker<T> {
    inner: RwLock<TrackerInner<T>>,
}

impl<T> Default for SlashingStatusTracker<T> {
    fn default() -> Self {
        Self {
            inner: RwLock::new(TrackerInner {
                records: vec![],
                ids_by_root: HashMap::new(),
            }),
        }
    }
}

impl<T: TreeHash + Clone> SlashingStatusTracker<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `evidence` as `Active`, or return the id it was already stored under.
    ///
    /// The second value is `true` if the evidence was not previously known.
    pub fn record(&self, evidence: T) -> (SlashingId, bool) {
        let root = evidence.tree_hash_root();
        if let Some(id) = self.inner.read().ids_by_root.get(&root) {
            return (*id, false);
        }

        let mut inner = self.inner.write();
        if let Some(id) = inner.ids_by_root.get(&root) {
            return (*id, false);
        }
        let id = SlashingId::new(inner.records.len() as u64);
        inner.records.push(TrackedSlashing {
            evidence,
            status: Mutex::new(SlashingStatus::Active),
        });
        inner.ids_by_root.insert(root, id);
        (id, true)
    }

    /// Move the slashing `id` to `status`, failing if the state machine doesn't allow it.
    pub fn transition(&self, id: SlashingId, status: SlashingStatus) -> Result<(), Error> {
        let inner = self.inner.read();
        let record = inner
            .records
            .get(id.as_index())
            .ok_or(Error::UnknownSlashing(id))?;

        let mut current = record.status.lock();
        if current.can_transition_to(status) {
            *current = status;
            Ok(())
        } else {
            Err(Error::InvalidTransition {
                id,
                from: *current,
                to: status,
            })
        }
    }

    pub fn status(&self, id: SlashingId) -> Result<SlashingStatus, Error> {
        self.inner
            .read()
            .records
            .get(id.as_index())
            .map(|record| *record.status.lock())
            .ok_or(Error::UnknownSlashing(id))
    }

    pub fn id_of(&self, evidence: &T) -> Option<SlashingId> {
        self.inner
            .read()
            .ids_by_root
            .get(&evidence.tree_hash_root())
            .copied()
    }

    /// All evidence currently in `status`, oldest first.
    pub fn query(&self, status: SlashingStatus) -> Vec<T> {
        self.inner
            .read()
            .records
            .iter()
            .filter(|record| *record.status.lock() == status)
            .map(|record| record.evidence.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.read().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_utils::{block, E};
    use std::str::FromStr;
    use types::ProposerSlashing;

    fn slashing(slot: u64) -> ProposerSlashing {
        ProposerSlashing {
            signed_header_1: block(slot, 3, 1),
            signed_header_2: block(slot, 3, 2),
        }
    }

    #[test]
    fn transition_table() {
        use SlashingStatus::*;

        let all = [Unknown, Active, Included, Reverted];
        let allowed = [
            (Unknown, Active),
            (Active, Included),
            (Included, Reverted),
            (Reverted, Active),
        ];
        for from in all {
            for to in all {
                assert_eq!(
                    from.can_transition_to(to),
                    allowed.contains(&(from, to)),
                    "{} -> {}",
                    from,
                    to
                );
            }
        }
    }

    #[test]
    fn status_names() {
        assert_eq!(SlashingStatus::Included.to_string(), "included");
        assert_eq!(
            SlashingStatus::from_str("reverted").unwrap(),
            SlashingStatus::Reverted
        );
        assert_eq!(SlashingStatus::default(), SlashingStatus::Unknown);
    }

    #[test]
    fn status_ssz() {
        assert_eq!(SlashingStatus::Included.as_ssz_bytes(), vec![2]);
        assert_eq!(
            SlashingStatus::from_ssz_bytes(&[3]).unwrap(),
            SlashingStatus::Reverted
        );
        assert!(matches!(
            SlashingStatus::from_ssz_bytes(&[4]),
            Err(DecodeError::BytesInvalid(_))
        ));
        assert!(SlashingStatus::from_ssz_bytes(&[1, 1]).is_err());
    }

    #[test]
    fn record_is_idempotent() {
        let tracker = SlashingStatusTracker::new();
        let (id1, new1) = tracker.record(slashing(1));
        let (id2, new2) = tracker.record(slashing(2));
        let (id3, new3) = tracker.record(slashing(1));

        assert!(new1 && new2 && !new3);
        assert_eq!(id1, id3);
        assert_ne!(id1, id2);
        assert_eq!(tracker.len(), 2);
        assert_eq!(tracker.status(id1).unwrap(), SlashingStatus::Active);
        assert_eq!(tracker.id_of(&slashing(2)), Some(id2));
        assert_eq!(tracker.id_of(&slashing(3)), None);
    }

    #[test]
    fn full_cycle() {
        let tracker = SlashingStatusTracker::new();
        let (id, _) = tracker.record(slashing(1));

        tracker.transition(id, SlashingStatus::Included).unwrap();
        tracker.transition(id, SlashingStatus::Reverted).unwrap();
        tracker.transition(id, SlashingStatus::Active).unwrap();
        assert_eq!(tracker.status(id).unwrap(), SlashingStatus::Active);
    }

    #[test]
    fn invalid_transition_leaves_status() {
        let tracker = SlashingStatusTracker::new();
        let (id, _) = tracker.record(slashing(1));

        assert!(matches!(
            tracker.transition(id, SlashingStatus::Reverted),
            Err(Error::InvalidTransition {
                from: SlashingStatus::Active,
                to: SlashingStatus::Reverted,
                ..
            })
        ));
        tracker.transition(id, SlashingStatus::Included).unwrap();
        assert!(matches!(
            tracker.transition(id, SlashingStatus::Active),
            Err(Error::InvalidTransition { .. })
        ));
        assert_eq!(tracker.status(id).unwrap(), SlashingStatus::Included);
    }

    #[test]
    fn unknown_id() {
        let tracker = SlashingStatusTracker::<ProposerSlashing>::new();
        let id = SlashingId::new(4);
        assert!(matches!(
            tracker.transition(id, SlashingStatus::Included),
            Err(Error::UnknownSlashing(_))
        ));
        assert!(matches!(tracker.status(id), Err(Error::UnknownSlashing(_))));
    }

    #[test]
    fn query_in_insertion_order() {
        let tracker = SlashingStatusTracker::new();
        let ids = (0..5)
            .map(|slot| tracker.record(slashing(slot)).0)
            .collect::<Vec<_>>();

        tracker.transition(ids[3], SlashingStatus::Included).unwrap();
        tracker.transition(ids[1], SlashingStatus::Included).unwrap();

        assert_eq!(
            tracker.query(SlashingStatus::Included),
            vec![slashing(1), slashing(3)]
        );
        assert_eq!(
            tracker.query(SlashingStatus::Active),
            vec![slashing(0), slashing(2), slashing(4)]
        );
        assert!(tracker.query(SlashingStatus::Unknown).is_empty());
    }

    #[test]
    fn attester_evidence_dedup() {
        use crate::test_utils::{att_slashing, indexed_att};

        let tracker = SlashingStatusTracker::<types::AttesterSlashing<E>>::new();
        let att1 = indexed_att(vec![1], 0, 3, 0);
        let att2 = indexed_att(vec![1], 0, 3, 1);
        let (id, _) = tracker.record(att_slashing(&att1, &att2));
        assert_eq!(tracker.record(att_slashing(&att1, &att2)), (id, false));
        let (other, new) = tracker.record(att_slashing(&att2, &att1));
        assert!(new);
        assert_ne!(id, other);
    }
}
