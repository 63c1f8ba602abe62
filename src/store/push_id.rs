// 8 timestamp chars + 12 random chars over an alphabet sorted by byte value.

use std::sync::Mutex;

use chrono::Utc;
use rand::Rng;

const PUSH_CHARS: &[u8; 64] = b"-0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ_abcdefghijklmnopqrstuvwxyz";

const TIME_LEN: usize = 8;
const RANDOM_LEN: usize = 12;

#[derive(Default)]
struct PushIdState {
    last_time: i64,
    last_random: [u8; RANDOM_LEN],
}

#[derive(Default)]
pub struct PushIdGenerator {
    state: Mutex<PushIdState>,
}

impl PushIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&self) -> String {
        self.next_id_at(Utc::now().timestamp_millis())
    }

    pub fn next_id_at(&self, now_millis: i64) -> String {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());

        // A clock that steps backwards must not break ordering.
        let mut now = now_millis.max(state.last_time);

        if now == state.last_time && state.last_time != 0 {
            if !increment(&mut state.last_random) {
                now += 1;
                state.last_random = random_digits();
            }
        } else {
            state.last_random = random_digits();
        }
        state.last_time = now;

        let mut id = String::with_capacity(TIME_LEN + RANDOM_LEN);
        id.push_str(&encode_time(now));
        id.extend(state.last_random.iter().map(|&d| PUSH_CHARS[d as usize] as char));
        id
    }
}

fn encode_time(mut millis: i64) -> String {
    let mut chars = [b'-'; TIME_LEN];
    for slot in chars.iter_mut().rev() {
        *slot = PUSH_CHARS[(millis.rem_euclid(64)) as usize];
        millis = millis.div_euclid(64);
    }
    chars.iter().map(|&c| c as char).collect()
}

fn random_digits() -> [u8; RANDOM_LEN] {
    let mut rng = rand::thread_rng();
    let mut digits = [0u8; RANDOM_LEN];
    for d in digits.iter_mut() {
        *d = rng.gen_range(0..64);
    }
    digits
}

fn increment(digits: &mut [u8; RANDOM_LEN]) -> bool {
    for d in digits.iter_mut().rev() {
        if *d < 63 {
            *d += 1;
            return true;
        }
        *d = 0;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_have_fixed_length() {
        let generator = PushIdGenerator::new();
        assert_eq!(generator.next_id().len(), TIME_LEN + RANDOM_LEN);
    }

    #[test]
    fn same_millisecond_ids_increase() {
        let generator = PushIdGenerator::new();
        let ids: Vec<String> = (0..200).map(|_| generator.next_id_at(1_700_000_000_000)).collect();
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn later_time_sorts_after() {
        let generator = PushIdGenerator::new();
        let a = generator.next_id_at(1_000);
        let b = generator.next_id_at(2_000);
        assert!(a < b);
    }

    #[test]
    fn clock_going_backwards_keeps_order() {
        let generator = PushIdGenerator::new();
        let a = generator.next_id_at(5_000);
        let b = generator.next_id_at(4_000);
        assert!(a < b);
    }

    #[test]
    fn increment_overflow_rolls_time() {
        let mut digits = [63u8; RANDOM_LEN];
        assert!(!increment(&mut digits));
        assert_eq!(digits, [0u8; RANDOM_LEN]);
    }
}
