//! inputs banned from standard rounds after stalling one

use std::collections::HashMap;
use std::time::Duration;

use bitcoin::OutPoint;
use tokio::time::Instant;

use crate::parameters::RoundId;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Offence {
    pub round_id: RoundId,
    pub released_at: Instant,
}

#[derive(Debug, Default)]
pub struct Prison {
    inmates: HashMap<OutPoint, Offence>,
}

impl Prison {
    pub fn new() -> Self {
        Self::default()
    }

    /// ban `inputs` until `now + duration`; a repeat offence extends the ban
    pub fn punish(
        &mut self,
        inputs: &[OutPoint],
        round_id: RoundId,
        now: Instant,
        duration: Duration,
    ) {
        let released_at = now + duration;
        for input in inputs {
            self.inmates
                .entry(*input)
                .and_modify(|o| {
                    if o.released_at < released_at {
                        *o = Offence {
                            round_id,
                            released_at,
                        };
                    }
                })
                .or_insert(Offence {
                    round_id,
                    released_at,
                });
        }
    }

    pub fn is_banned(&self, input: &OutPoint, now: Instant) -> bool {
        self.inmates
            .get(input)
            .map_or(false, |o| now < o.released_at)
    }

    pub fn offence(&self, input: &OutPoint) -> Option<&Offence> {
        self.inmates.get(input)
    }

    /// forget served bans, returning the released inputs
    pub fn release_expired(&mut self, now: Instant) -> Vec<OutPoint> {
        let released: Vec<OutPoint> = self
            .inmates
            .iter()
            .filter(|(_, o)| o.released_at <= now)
            .map(|(input, _)| *input)
            .collect();
        for input in &released {
            self.inmates.remove(input);
        }
        released
    }

    pub fn len(&self) -> usize {
        self.inmates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inmates.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitcoin::hashes::Hash;
    use bitcoin::Txid;

    fn outpoint(n: u8) -> OutPoint {
        OutPoint::new(Txid::from_byte_array([n; 32]), 0)
    }

    #[tokio::test(start_paused = true)]
    async fn test_ban_expires() {
        let mut prison = Prison::new();
        let now = Instant::now();
        prison.punish(&[outpoint(1)], RoundId([0; 32]), now, Duration::from_secs(60));

        assert!(prison.is_banned(&outpoint(1), now));
        assert!(!prison.is_banned(&outpoint(2), now));

        tokio::time::advance(Duration::from_secs(61)).await;
        let later = Instant::now();
        assert!(!prison.is_banned(&outpoint(1), later));
        assert_eq!(prison.release_expired(later), vec![outpoint(1)]);
        assert!(prison.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeat_offence_extends() {
        let mut prison = Prison::new();
        let now = Instant::now();
        prison.punish(&[outpoint(1)], RoundId([0; 32]), now, Duration::from_secs(60));
        prison.punish(&[outpoint(1)], RoundId([1; 32]), now, Duration::from_secs(600));

        let offence = prison.offence(&outpoint(1)).unwrap();
        assert_eq!(offence.round_id, RoundId([1; 32]));
        assert_eq!(offence.released_at, now + Duration::from_secs(600));
        assert_eq!(prison.len(), 1);
    }
}
