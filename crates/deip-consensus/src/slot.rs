//! Slot math (§4.7): maps wall-clock time to witness-schedule slots and
//! back, and picks the witness due at a given slot out of the active
//! shuffled schedule.

use deip_core::types::{AccountName, Timestamp};

fn align_up(t: Timestamp, interval: i64) -> Timestamp {
    let remainder = t.rem_euclid(interval);
    if remainder == 0 {
        t
    } else {
        t + (interval - remainder)
    }
}

/// Wall-clock time of the `k`-th slot ahead of `head_block_time`. `k == 0`
/// has no defined slot time; callers pass `k >= 1`.
pub fn slot_time(head_block_time: Timestamp, interval: i64, k: u64) -> Timestamp {
    let first = align_up(head_block_time + interval, interval);
    first + (k.saturating_sub(1)) as i64 * interval
}

/// Number of whole slots between `head_block_time` and `t`, floored at 0.
pub fn slot_at_time(head_block_time: Timestamp, interval: i64, t: Timestamp) -> u64 {
    if t <= head_block_time {
        return 0;
    }
    ((t - head_block_time) / interval) as u64
}

/// The witness due `k` slots ahead of `current_aslot` in the active
/// shuffled schedule.
pub fn get_scheduled_witness(schedule: &[AccountName], current_aslot: u64, k: u64) -> Option<&AccountName> {
    if schedule.is_empty() {
        return None;
    }
    let index = ((current_aslot + k) % schedule.len() as u64) as usize;
    schedule.get(index)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_time_aligns_to_the_block_interval() {
        assert_eq!(slot_time(100, 3, 1), 102);
        assert_eq!(slot_time(101, 3, 1), 102);
        assert_eq!(slot_time(102, 3, 1), 105);
        assert_eq!(slot_time(100, 3, 2), 105);
    }

    #[test]
    fn slot_at_time_floors_and_never_goes_negative() {
        assert_eq!(slot_at_time(100, 3, 100), 0);
        assert_eq!(slot_at_time(100, 3, 99), 0);
        assert_eq!(slot_at_time(100, 3, 106), 2);
    }

    #[test]
    fn get_scheduled_witness_wraps_around_the_schedule() {
        let schedule = vec![
            AccountName::new_unchecked("w0"),
            AccountName::new_unchecked("w1"),
            AccountName::new_unchecked("w2"),
        ];
        assert_eq!(get_scheduled_witness(&schedule, 2, 2), Some(&schedule[1]));
        assert_eq!(get_scheduled_witness(&[], 0, 1), None);
    }
}
