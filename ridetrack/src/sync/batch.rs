//! Grouping of pending positions into network batches.

use crate::position::{PositionSample, RideId, StoredPosition};

/// Positions of one ride delivered in one network call.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    pub ride_id: RideId,
    pub positions: Vec<StoredPosition>,
}

impl Batch {
    pub fn local_ids(&self) -> Vec<i64> {
        self.positions.iter().map(|p| p.local_id).collect()
    }

    pub fn samples(&self) -> Vec<PositionSample> {
        self.positions.iter().map(|p| p.sample.clone()).collect()
    }
}

/// Group positions by ride and split each group into chunks of `batch_size`.
///
/// Rides appear in order of their oldest pending position, and each batch is
/// ordered by capture time then local id.
pub fn plan_batches(mut pending: Vec<StoredPosition>, batch_size: usize) -> Vec<Batch> {
    let batch_size = batch_size.max(1);
    pending.sort_by(|a, b| {
        a.sample
            .captured_at
            .cmp(&b.sample.captured_at)
            .then(a.local_id.cmp(&b.local_id))
    });

    let mut groups: Vec<(RideId, Vec<StoredPosition>)> = Vec::new();
    for position in pending {
        let ride_id = position.sample.ride_id;
        match groups.iter_mut().find(|(id, _)| *id == ride_id) {
            Some((_, group)) => group.push(position),
            None => groups.push((ride_id, vec![position])),
        }
    }

    groups
        .into_iter()
        .flat_map(|(ride_id, group)| {
            group
                .chunks(batch_size)
                .map(|chunk| Batch {
                    ride_id,
                    positions: chunk.to_vec(),
                })
                .collect::<Vec<_>>()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::{GeoFix, SyncState};
    use chrono::{TimeZone, Utc};

    fn stored(local_id: i64, ride: u64, secs: i64) -> StoredPosition {
        let at = Utc.timestamp_opt(1_714_564_800 + secs, 0).unwrap();
        StoredPosition {
            local_id,
            sample: GeoFix::new(40.0, -74.0, 5.0, at).into_sample(RideId(ride)),
            sync_state: SyncState::Pending,
        }
    }

    #[test]
    fn test_120_positions_make_three_batches() {
        let pending: Vec<_> = (0..120).map(|i| stored(i, 42, i)).collect();

        let batches = plan_batches(pending, 50);

        let sizes: Vec<_> = batches.iter().map(|b| b.positions.len()).collect();
        assert_eq!(sizes, vec![50, 50, 20]);
        assert_eq!(batches[0].local_ids()[0], 0);
        assert_eq!(batches[2].local_ids()[19], 119);
    }

    #[test]
    fn test_groups_by_ride_in_capture_order() {
        let pending = vec![
            stored(1, 7, 30),
            stored(2, 42, 10),
            stored(3, 7, 20),
            stored(4, 42, 5),
        ];

        let batches = plan_batches(pending, 50);

        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].ride_id, RideId(42));
        assert_eq!(batches[0].local_ids(), vec![4, 2]);
        assert_eq!(batches[1].ride_id, RideId(7));
        assert_eq!(batches[1].local_ids(), vec![3, 1]);
    }

    #[test]
    fn test_equal_timestamps_order_by_local_id() {
        let batches = plan_batches(vec![stored(9, 1, 0), stored(3, 1, 0)], 50);
        assert_eq!(batches[0].local_ids(), vec![3, 9]);
    }

    #[test]
    fn test_empty_input() {
        assert!(plan_batches(Vec::new(), 50).is_empty());
    }
}
