use std::collections::HashMap;
use std::io;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use staybook_kernel::error::{StoreError, StoreResult};
use staybook_kernel::model::{
    Booking, BookingId, BookingStatus, NewBooking, PropertyId, StayRange, UserId,
};
use staybook_kernel::repository::BookingLedger;
use tokio::sync::Mutex;

use crate::journal::{Journal, JournalEntry};

type SharedStays = Arc<Mutex<PropertyStays>>;
type KeyOwner = (UserId, String);

/// What an idempotency key was first used for. The booking id is chosen when
/// the key is claimed, before the booking is committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct KeyClaim {
    booking_id: BookingId,
    property_id: PropertyId,
    stay: StayRange,
}

impl KeyClaim {
    fn of(booking: &Booking) -> Self {
        Self {
            booking_id: booking.id,
            property_id: booking.property_id,
            stay: booking.stay(),
        }
    }

    fn same_request(&self, other: &KeyClaim) -> bool {
        self.property_id == other.property_id && self.stay == other.stay
    }
}

/// Every booking of one property, sorted by check-in.
#[derive(Debug, Default)]
struct PropertyStays {
    bookings: Vec<Booking>,
}

impl PropertyStays {
    /// Insert keeping the check-in order.
    fn insert(&mut self, booking: Booking) {
        let pos = self
            .bookings
            .partition_point(|b| b.check_in <= booking.check_in);
        self.bookings.insert(pos, booking);
    }

    fn upsert(&mut self, booking: Booking) {
        self.bookings.retain(|b| b.id != booking.id);
        self.insert(booking);
    }

    fn find(&self, id: BookingId) -> Option<&Booking> {
        self.bookings.iter().find(|b| b.id == id)
    }

    fn find_mut(&mut self, id: BookingId) -> Option<&mut Booking> {
        self.bookings.iter_mut().find(|b| b.id == id)
    }

    /// Active bookings sharing a night with `stay`. Everything from the first
    /// booking checking in on or after `stay.check_out` is skipped.
    fn overlapping<'a>(&'a self, stay: &'a StayRange) -> impl Iterator<Item = &'a Booking> + 'a {
        let right_bound = self
            .bookings
            .partition_point(|b| b.check_in < stay.check_out());
        self.bookings[..right_bound]
            .iter()
            .filter(move |b| b.is_active() && b.stay().overlaps(stay))
    }
}

/// Booking ledger keeping one async mutex per property.
///
/// The overlap check and the write of `insert` run under the property's
/// mutex, so two overlapping requests for the same property cannot both
/// succeed. Properties never share a lock.
pub struct InMemoryLedger {
    properties: DashMap<PropertyId, SharedStays>,
    /// Reverse lookup: booking id → property id
    booking_to_property: DashMap<BookingId, PropertyId>,
    idempotency_keys: DashMap<KeyOwner, KeyClaim>,
    journal: Option<Journal>,
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self {
            properties: DashMap::new(),
            booking_to_property: DashMap::new(),
            idempotency_keys: DashMap::new(),
            journal: None,
        }
    }

    /// Replay `path` and keep appending to it.
    pub fn open(path: &Path, fsync: bool) -> io::Result<Self> {
        let mut replayed: HashMap<PropertyId, PropertyStays> = HashMap::new();
        let ledger = Self::new();

        for entry in Journal::replay::<Booking>(path)? {
            match entry {
                JournalEntry::Put { record } => {
                    ledger
                        .booking_to_property
                        .insert(record.id, record.property_id);
                    if let Some(key) = &record.idempotency_key {
                        ledger
                            .idempotency_keys
                            .insert((record.requester_id, key.clone()), KeyClaim::of(&record));
                    }
                    replayed.entry(record.property_id).or_default().upsert(record);
                }
                JournalEntry::Delete { id } => {
                    tracing::warn!(target: "staybook-db", %id, "ignoring delete entry in booking journal");
                }
            }
        }

        for (property_id, stays) in replayed {
            ledger
                .properties
                .insert(property_id, Arc::new(Mutex::new(stays)));
        }

        Ok(Self {
            journal: Some(Journal::open(path, fsync)?),
            ..ledger
        })
    }

    fn partition(&self, property_id: PropertyId) -> SharedStays {
        self.properties.entry(property_id).or_default().value().clone()
    }

    fn existing_partition(&self, property_id: PropertyId) -> Option<SharedStays> {
        self.properties.get(&property_id).map(|e| e.value().clone())
    }

    fn partition_of(&self, id: BookingId) -> StoreResult<SharedStays> {
        self.booking_to_property
            .get(&id)
            .map(|e| *e.value())
            .and_then(|property_id| self.existing_partition(property_id))
            .ok_or_else(|| StoreError::not_found("booking", id))
    }

    fn append(&self, booking: &Booking) -> StoreResult<()> {
        if let Some(journal) = &self.journal {
            journal.append(&JournalEntry::Put { record: booking })?;
        }
        Ok(())
    }

    /// Reserve `owner`'s key for `claim`. Returns the stored booking when the
    /// key already belongs to the same request, `None` when the key is now ours.
    async fn claim_key(&self, owner: &KeyOwner, claim: KeyClaim) -> StoreResult<Option<Booking>> {
        loop {
            let held = match self.idempotency_keys.entry(owner.clone()) {
                Entry::Vacant(slot) => {
                    slot.insert(claim);
                    return Ok(None);
                }
                Entry::Occupied(slot) => *slot.get(),
            };

            if !held.same_request(&claim) {
                return Err(StoreError::IdempotencyKeyReused(held.booking_id));
            }

            // The holder commits under this property's lock.
            let partition = self.partition(held.property_id);
            let stays = partition.lock().await;
            if let Some(found) = stays.find(held.booking_id) {
                return Ok(Some(found.clone()));
            }
            drop(stays);
            tokio::task::yield_now().await;
        }
    }

    /// Overlap check and write under the property's lock.
    async fn commit(&self, id: BookingId, booking: NewBooking) -> StoreResult<Booking> {
        let partition = self.partition(booking.property_id);
        let mut stays = partition.lock().await;

        if let Some(conflict) = stays.overlapping(&booking.stay).next() {
            tracing::debug!(
                target: "staybook-db",
                property_id = %booking.property_id,
                conflicting = %conflict.id,
                "booking rejected: overlapping stay"
            );
            return Err(StoreError::Conflict(conflict.id));
        }

        let stored = Booking {
            id,
            property_id: booking.property_id,
            requester_id: booking.requester_id,
            check_in: booking.stay.check_in(),
            check_out: booking.stay.check_out(),
            status: BookingStatus::Pending,
            total_price: booking.total_price,
            idempotency_key: booking.idempotency_key,
            created_at: booking.requested_at,
            updated_at: booking.requested_at,
        };
        self.append(&stored)?;

        self.booking_to_property
            .insert(stored.id, stored.property_id);
        stays.insert(stored.clone());
        Ok(stored)
    }

    /// Bookings of every property matching `keep`. Locks one property at a time.
    async fn collect(&self, keep: impl Fn(&Booking) -> bool) -> Vec<Booking> {
        let partitions: Vec<SharedStays> =
            self.properties.iter().map(|e| e.value().clone()).collect();
        let mut out = Vec::new();
        for partition in partitions {
            let stays = partition.lock().await;
            out.extend(stays.bookings.iter().filter(|b| keep(b)).cloned());
        }
        out
    }
}

fn newest_first(bookings: &mut [Booking]) {
    bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
}

#[async_trait]
impl BookingLedger for InMemoryLedger {
    async fn find_overlapping(
        &self,
        property_id: PropertyId,
        stay: StayRange,
    ) -> StoreResult<Vec<Booking>> {
        let Some(partition) = self.existing_partition(property_id) else {
            return Ok(Vec::new());
        };
        let stays = partition.lock().await;
        Ok(stays.overlapping(&stay).cloned().collect())
    }

    async fn insert(&self, booking: NewBooking) -> StoreResult<Booking> {
        let id = BookingId::new();
        let owner = booking
            .idempotency_key
            .as_ref()
            .map(|key| (booking.requester_id, key.clone()));

        if let Some(owner) = &owner {
            let claim = KeyClaim {
                booking_id: id,
                property_id: booking.property_id,
                stay: booking.stay,
            };
            if let Some(existing) = self.claim_key(owner, claim).await? {
                return Ok(existing);
            }
        }

        let committed = self.commit(id, booking).await;
        if committed.is_err() {
            if let Some(owner) = &owner {
                self.idempotency_keys
                    .remove_if(owner, |_, claim| claim.booking_id == id);
            }
        }
        committed
    }

    async fn update_status(
        &self,
        id: BookingId,
        status: BookingStatus,
        at: DateTime<Utc>,
    ) -> StoreResult<Booking> {
        let partition = self.partition_of(id)?;
        let mut stays = partition.lock().await;
        let current = stays
            .find_mut(id)
            .ok_or_else(|| StoreError::not_found("booking", id))?;

        if !current.status.can_transition_to(status) {
            return Err(StoreError::InvalidTransition {
                from: current.status,
                to: status,
            });
        }

        let mut updated = current.clone();
        updated.status = status;
        updated.updated_at = at.max(updated.created_at);
        self.append(&updated)?;
        *current = updated.clone();
        Ok(updated)
    }

    async fn get(&self, id: BookingId) -> StoreResult<Booking> {
        let partition = self.partition_of(id)?;
        let stays = partition.lock().await;
        stays
            .find(id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("booking", id))
    }

    async fn list_by_requester(&self, requester_id: UserId) -> StoreResult<Vec<Booking>> {
        let mut bookings = self.collect(|b| b.requester_id == requester_id).await;
        newest_first(&mut bookings);
        Ok(bookings)
    }

    async fn list_by_property(&self, property_id: PropertyId) -> StoreResult<Vec<Booking>> {
        let Some(partition) = self.existing_partition(property_id) else {
            return Ok(Vec::new());
        };
        let mut bookings = partition.lock().await.bookings.clone();
        newest_first(&mut bookings);
        Ok(bookings)
    }

    async fn list_all(&self) -> StoreResult<Vec<Booking>> {
        let mut bookings = self.collect(|_| true).await;
        newest_first(&mut bookings);
        Ok(bookings)
    }

    async fn due_for_completion(&self, today: NaiveDate) -> StoreResult<Vec<Booking>> {
        Ok(self
            .collect(|b| b.status == BookingStatus::Confirmed && b.check_out < today)
            .await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn stay(from: NaiveDate, to: NaiveDate) -> StayRange {
        StayRange::new(from, to).unwrap()
    }

    fn request(property_id: PropertyId, requester_id: UserId, s: StayRange) -> NewBooking {
        NewBooking {
            property_id,
            requester_id,
            stay: s,
            total_price: 100.0 * s.nights() as f64,
            idempotency_key: None,
            requested_at: Utc::now(),
        }
    }

    /// No two active bookings of one property overlap.
    async fn assert_no_active_overlap(ledger: &InMemoryLedger, property_id: PropertyId) {
        let bookings = ledger.list_by_property(property_id).await.unwrap();
        let active: Vec<&Booking> = bookings.iter().filter(|b| b.is_active()).collect();
        for (i, a) in active.iter().enumerate() {
            for b in &active[i + 1..] {
                assert!(
                    !a.stay().overlaps(&b.stay()),
                    "{} overlaps {}",
                    a.id,
                    b.id
                );
            }
        }
    }

    #[tokio::test]
    async fn touching_boundary_is_accepted_and_crossing_is_rejected() {
        let ledger = InMemoryLedger::new();
        let property = PropertyId::new();
        let guest = UserId::new();

        let first = ledger
            .insert(request(property, guest, stay(date(2025, 6, 1), date(2025, 6, 5))))
            .await
            .unwrap();
        assert_eq!(first.status, BookingStatus::Pending);
        ledger
            .update_status(first.id, BookingStatus::Confirmed, Utc::now())
            .await
            .unwrap();

        let err = ledger
            .insert(request(property, UserId::new(), stay(date(2025, 6, 4), date(2025, 6, 8))))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(id) if id == first.id));

        ledger
            .insert(request(property, UserId::new(), stay(date(2025, 6, 5), date(2025, 6, 8))))
            .await
            .unwrap();
        assert_no_active_overlap(&ledger, property).await;
    }

    #[tokio::test]
    async fn find_overlapping_ignores_inactive_and_other_properties() {
        let ledger = InMemoryLedger::new();
        let property = PropertyId::new();
        let other = PropertyId::new();
        let guest = UserId::new();
        let june = stay(date(2025, 6, 10), date(2025, 6, 12));

        let cancelled = ledger.insert(request(property, guest, june)).await.unwrap();
        ledger
            .update_status(cancelled.id, BookingStatus::Cancelled, Utc::now())
            .await
            .unwrap();
        ledger.insert(request(other, guest, june)).await.unwrap();

        assert!(ledger
            .find_overlapping(property, june)
            .await
            .unwrap()
            .is_empty());

        let pending = ledger.insert(request(property, guest, june)).await.unwrap();
        let hits = ledger
            .find_overlapping(property, stay(date(2025, 6, 11), date(2025, 6, 20)))
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, pending.id);
    }

    #[tokio::test]
    async fn terminal_states_reject_transitions() {
        let ledger = InMemoryLedger::new();
        let property = PropertyId::new();
        let booking = ledger
            .insert(request(property, UserId::new(), stay(date(2025, 7, 1), date(2025, 7, 3))))
            .await
            .unwrap();

        ledger
            .update_status(booking.id, BookingStatus::Cancelled, Utc::now())
            .await
            .unwrap();
        let err = ledger
            .update_status(booking.id, BookingStatus::Confirmed, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::InvalidTransition {
                from: BookingStatus::Cancelled,
                to: BookingStatus::Confirmed
            }
        ));

        let other = ledger
            .insert(request(property, UserId::new(), stay(date(2025, 7, 1), date(2025, 7, 3))))
            .await
            .unwrap();
        ledger
            .update_status(other.id, BookingStatus::Confirmed, Utc::now())
            .await
            .unwrap();
        ledger
            .update_status(other.id, BookingStatus::Completed, Utc::now())
            .await
            .unwrap();
        for next in [
            BookingStatus::Pending,
            BookingStatus::Confirmed,
            BookingStatus::Cancelled,
        ] {
            assert!(ledger.update_status(other.id, next, Utc::now()).await.is_err());
        }
    }

    #[tokio::test]
    async fn unknown_booking_is_not_found() {
        let ledger = InMemoryLedger::new();
        let err = ledger
            .update_status(BookingId::new(), BookingStatus::Confirmed, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_overlapping_inserts_yield_one_winner() {
        let ledger = Arc::new(InMemoryLedger::new());
        let property = PropertyId::new();

        let mut handles = Vec::new();
        for offset in 0..16 {
            let ledger = ledger.clone();
            // Every window contains the night of 2025-08-10.
            let from = date(2025, 8, 10) - Duration::days(offset % 4);
            let to = date(2025, 8, 11) + Duration::days(offset % 3);
            handles.push(tokio::spawn(async move {
                ledger
                    .insert(request(property, UserId::new(), stay(from, to)))
                    .await
            }));
        }

        let mut wins = 0;
        let mut conflicts = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => wins += 1,
                Err(StoreError::Conflict(_)) => conflicts += 1,
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
        assert_eq!(wins, 1);
        assert_eq!(conflicts, 15);
        assert_no_active_overlap(&ledger, property).await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn different_properties_do_not_contend() {
        let ledger = Arc::new(InMemoryLedger::new());
        let window = stay(date(2025, 9, 1), date(2025, 9, 5));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let ledger = ledger.clone();
            handles.push(tokio::spawn(async move {
                ledger
                    .insert(request(PropertyId::new(), UserId::new(), window))
                    .await
            }));
        }
        for handle in handles {
            assert!(handle.await.unwrap().is_ok());
        }
        assert_eq!(ledger.list_all().await.unwrap().len(), 8);
    }

    #[tokio::test]
    async fn list_by_requester_is_newest_first() {
        let ledger = InMemoryLedger::new();
        let guest = UserId::new();
        let base = Utc::now();

        for (i, day) in [3u32, 10, 20].into_iter().enumerate() {
            let mut req = request(
                PropertyId::new(),
                guest,
                stay(date(2025, 10, day), date(2025, 10, day + 2)),
            );
            req.requested_at = base + Duration::seconds(i as i64);
            ledger.insert(req).await.unwrap();
        }
        ledger
            .insert(request(PropertyId::new(), UserId::new(), stay(date(2025, 10, 1), date(2025, 10, 2))))
            .await
            .unwrap();

        let mine = ledger.list_by_requester(guest).await.unwrap();
        let check_ins: Vec<u32> = mine.iter().map(|b| chrono::Datelike::day(&b.check_in)).collect();
        assert_eq!(check_ins, vec![20, 10, 3]);
    }

    #[tokio::test]
    async fn idempotency_key_returns_the_original_booking() {
        let ledger = InMemoryLedger::new();
        let property = PropertyId::new();
        let guest = UserId::new();
        let mut req = request(property, guest, stay(date(2025, 11, 1), date(2025, 11, 4)));
        req.idempotency_key = Some("retry-1".to_string());

        let first = ledger.insert(req.clone()).await.unwrap();
        let second = ledger.insert(req).await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(ledger.list_by_property(property).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn reused_idempotency_key_with_a_different_stay_is_rejected() {
        let ledger = InMemoryLedger::new();
        let property = PropertyId::new();
        let guest = UserId::new();
        let mut original = request(property, guest, stay(date(2025, 11, 1), date(2025, 11, 4)));
        original.idempotency_key = Some("retry-2".to_string());
        let first = ledger.insert(original.clone()).await.unwrap();

        let mut other_dates = original.clone();
        other_dates.stay = stay(date(2025, 11, 10), date(2025, 11, 12));
        let err = ledger.insert(other_dates).await.unwrap_err();
        assert!(matches!(err, StoreError::IdempotencyKeyReused(id) if id == first.id));

        let mut other_property = original.clone();
        other_property.property_id = PropertyId::new();
        let err = ledger.insert(other_property).await.unwrap_err();
        assert!(matches!(err, StoreError::IdempotencyKeyReused(id) if id == first.id));

        // Another requester owns a separate key space.
        let mut stranger = original;
        stranger.requester_id = UserId::new();
        stranger.property_id = PropertyId::new();
        ledger.insert(stranger).await.unwrap();

        assert_eq!(ledger.list_all().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn failed_insert_releases_its_idempotency_key() {
        let ledger = InMemoryLedger::new();
        let property = PropertyId::new();
        let window = stay(date(2025, 11, 1), date(2025, 11, 4));
        ledger
            .insert(request(property, UserId::new(), window))
            .await
            .unwrap();

        let guest = UserId::new();
        let mut blocked = request(property, guest, window);
        blocked.idempotency_key = Some("retry-3".to_string());
        assert!(matches!(
            ledger.insert(blocked).await,
            Err(StoreError::Conflict(_))
        ));

        let mut elsewhere = request(PropertyId::new(), guest, window);
        elsewhere.idempotency_key = Some("retry-3".to_string());
        ledger.insert(elsewhere).await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn one_idempotency_key_commits_at_most_one_booking_across_properties() {
        for _ in 0..32 {
            let ledger = Arc::new(InMemoryLedger::new());
            let guest = UserId::new();
            let window = stay(date(2026, 1, 5), date(2026, 1, 7));

            let mut handles = Vec::new();
            for _ in 0..2 {
                let ledger = ledger.clone();
                let mut req = request(PropertyId::new(), guest, window);
                req.idempotency_key = Some("same-click".to_string());
                handles.push(tokio::spawn(async move { ledger.insert(req).await }));
            }

            let mut wins = 0;
            let mut reused = 0;
            for handle in handles {
                match handle.await.unwrap() {
                    Ok(_) => wins += 1,
                    Err(StoreError::IdempotencyKeyReused(_)) => reused += 1,
                    Err(e) => panic!("unexpected error: {e}"),
                }
            }
            assert_eq!((wins, reused), (1, 1));
            assert_eq!(ledger.list_all().await.unwrap().len(), 1);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_retries_share_one_booking() {
        let ledger = Arc::new(InMemoryLedger::new());
        let property = PropertyId::new();
        let mut req = request(property, UserId::new(), stay(date(2026, 2, 1), date(2026, 2, 3)));
        req.idempotency_key = Some("double-submit".to_string());

        let mut handles = Vec::new();
        for _ in 0..8 {
            let ledger = ledger.clone();
            let req = req.clone();
            handles.push(tokio::spawn(async move { ledger.insert(req).await }));
        }
        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap().unwrap().id);
        }
        ids.dedup();
        assert_eq!(ids.len(), 1);
        assert_eq!(ledger.list_by_property(property).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn status_change_is_stamped_with_the_given_time() {
        let ledger = InMemoryLedger::new();
        let booking = ledger
            .insert(request(PropertyId::new(), UserId::new(), stay(date(2026, 3, 1), date(2026, 3, 2))))
            .await
            .unwrap();

        let at = booking.created_at + Duration::hours(5);
        let confirmed = ledger
            .update_status(booking.id, BookingStatus::Confirmed, at)
            .await
            .unwrap();
        assert_eq!(confirmed.updated_at, at);
        assert_eq!(confirmed.created_at, booking.created_at);
        assert_eq!(ledger.get(booking.id).await.unwrap().updated_at, at);
    }

    #[tokio::test]
    async fn list_by_property_is_newest_first() {
        let ledger = InMemoryLedger::new();
        let property = PropertyId::new();
        let base = Utc::now();

        // Requested in the opposite order of their check-in dates.
        for (i, day) in [20u32, 10, 3].into_iter().enumerate() {
            let mut req = request(
                property,
                UserId::new(),
                stay(date(2026, 4, day), date(2026, 4, day + 2)),
            );
            req.requested_at = base + Duration::seconds(i as i64);
            ledger.insert(req).await.unwrap();
        }

        let listed = ledger.list_by_property(property).await.unwrap();
        let check_ins: Vec<u32> = listed
            .iter()
            .map(|b| chrono::Datelike::day(&b.check_in))
            .collect();
        assert_eq!(check_ins, vec![3, 10, 20]);
    }

    #[tokio::test]
    async fn due_for_completion_selects_elapsed_confirmed_stays() {
        let ledger = InMemoryLedger::new();
        let property = PropertyId::new();
        let guest = UserId::new();

        let elapsed = ledger
            .insert(request(property, guest, stay(date(2025, 5, 1), date(2025, 5, 3))))
            .await
            .unwrap();
        ledger
            .update_status(elapsed.id, BookingStatus::Confirmed, Utc::now())
            .await
            .unwrap();
        ledger
            .insert(request(property, guest, stay(date(2025, 5, 3), date(2025, 5, 4))))
            .await
            .unwrap();
        let future = ledger
            .insert(request(property, guest, stay(date(2025, 6, 1), date(2025, 6, 3))))
            .await
            .unwrap();
        ledger
            .update_status(future.id, BookingStatus::Confirmed, Utc::now())
            .await
            .unwrap();

        // Checkout day itself is still part of the stay.
        assert!(ledger
            .due_for_completion(date(2025, 5, 3))
            .await
            .unwrap()
            .is_empty());

        let due = ledger.due_for_completion(date(2025, 5, 4)).await.unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].id, elapsed.id);
    }

    #[tokio::test]
    async fn journal_replay_restores_state_and_invariant() {
        let dir = std::env::temp_dir().join("staybook_test_ledger");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(format!("{}.jsonl", BookingId::new()));

        let property = PropertyId::new();
        let guest = UserId::new();
        let booking = {
            let ledger = InMemoryLedger::open(&path, false).unwrap();
            let b = ledger
                .insert(request(property, guest, stay(date(2025, 12, 1), date(2025, 12, 5))))
                .await
                .unwrap();
            ledger
                .update_status(b.id, BookingStatus::Confirmed, Utc::now())
                .await
                .unwrap()
        };

        let reopened = InMemoryLedger::open(&path, false).unwrap();
        let restored = reopened.get(booking.id).await.unwrap();
        assert_eq!(restored.status, BookingStatus::Confirmed);
        assert!(matches!(
            reopened
                .insert(request(property, UserId::new(), stay(date(2025, 12, 4), date(2025, 12, 6))))
                .await,
            Err(StoreError::Conflict(_))
        ));
        std::fs::remove_file(&path).ok();
    }
}
