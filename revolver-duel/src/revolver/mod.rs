pub mod commitment;

pub use commitment::LayoutCommitment;

use crate::config::DuelConfig;
use rand::seq::index;
use rand::Rng;
use std::ops::RangeInclusive;

/// One loaded cylinder. The layout is fixed for its lifetime; firing only
/// advances the current chamber.
#[derive(Debug, Clone, Default)]
pub struct Revolver {
    layout: Vec<bool>,
    current: usize,
    commitment: LayoutCommitment,
}

impl Revolver {
    pub(crate) fn from_layout(layout: Vec<bool>) -> Self {
        Self {
            layout,
            current: 0,
            commitment: LayoutCommitment::default(),
        }
    }

    pub fn chambers(&self) -> usize {
        self.layout.len()
    }

    pub fn bullets(&self) -> usize {
        self.layout.iter().filter(|&&loaded| loaded).count()
    }

    pub fn current_chamber(&self) -> usize {
        self.current
    }

    pub fn chambers_left(&self) -> usize {
        self.chambers().saturating_sub(self.current)
    }

    pub fn bullets_left(&self) -> usize {
        self.layout
            .get(self.current..)
            .map_or(0, |rest| rest.iter().filter(|&&loaded| loaded).count())
    }

    /// Probability that the next trigger pull fires a bullet.
    pub fn bullet_chance(&self) -> f64 {
        let chambers_left = self.chambers_left();
        if chambers_left == 0 {
            return 0.0;
        }
        self.bullets_left() as f64 / chambers_left as f64
    }

    /// Every chamber has been fired.
    pub fn is_spent(&self) -> bool {
        self.current >= self.chambers()
    }

    pub fn commitment(&self) -> &LayoutCommitment {
        &self.commitment
    }

    /// The hidden layout. Only published once the cylinder is retired.
    pub(crate) fn layout(&self) -> &[bool] {
        &self.layout
    }

    /// Fire the current chamber and advance. Returns whether it was loaded.
    pub(crate) fn fire(&mut self) -> bool {
        debug_assert!(!self.is_spent(), "fired a spent cylinder");
        let loaded = self.layout.get(self.current).copied().unwrap_or(false);
        self.current += 1;
        loaded
    }

    #[cfg(test)]
    pub(crate) fn set_current(&mut self, current: usize) {
        self.current = current;
    }
}

/// Builds the randomized cylinder for each round.
#[derive(Debug, Clone)]
pub struct RevolverFactory {
    chambers: RangeInclusive<usize>,
}

impl RevolverFactory {
    pub fn new(chambers: RangeInclusive<usize>) -> Self {
        Self { chambers }
    }

    pub fn from_config(config: &DuelConfig) -> Self {
        Self::new(config.min_chambers..=config.max_chambers)
    }

    /// Bullet count range before clamping; density rises every round.
    pub fn bullet_range(round: u32) -> RangeInclusive<usize> {
        match round {
            0 | 1 => 1..=3,
            2 => 3..=4,
            _ => 4..=5,
        }
    }

    pub fn build<R: Rng + ?Sized>(&self, round: u32, rng: &mut R) -> Revolver {
        let chambers = rng.gen_range(self.chambers.clone());

        // at least one empty chamber
        let bullets = rng
            .gen_range(Self::bullet_range(round))
            .min(chambers - 1);

        let mut layout = vec![false; chambers];
        for position in index::sample(rng, chambers, bullets).into_iter() {
            layout[position] = true;
        }

        let commitment = LayoutCommitment::seal(&layout, rng);

        tracing::debug!(
            "Built revolver for round {}: {} chambers, {} bullets",
            round,
            chambers,
            bullets
        );

        Revolver {
            layout,
            current: 0,
            commitment,
        }
    }
}

impl Default for RevolverFactory {
    fn default() -> Self {
        Self::from_config(&DuelConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_built_revolvers_respect_bounds() {
        let factory = RevolverFactory::default();
        let mut rng = StdRng::seed_from_u64(17);

        for round in 1..=4 {
            let range = RevolverFactory::bullet_range(round);
            for _ in 0..500 {
                let revolver = factory.build(round, &mut rng);
                assert!((6..=9).contains(&revolver.chambers()));
                assert!(revolver.bullets() < revolver.chambers());
                assert!(revolver.bullets() >= *range.start());
                assert!(revolver.bullets() <= *range.end());
                assert_eq!(revolver.current_chamber(), 0);
            }
        }
    }

    #[test]
    fn test_clamp_keeps_an_empty_chamber() {
        let factory = RevolverFactory::new(2..=2);
        let mut rng = StdRng::seed_from_u64(5);

        for _ in 0..100 {
            let revolver = factory.build(3, &mut rng);
            assert_eq!(revolver.chambers(), 2);
            assert_eq!(revolver.bullets(), 1);
        }
    }

    #[test]
    fn test_bullet_chance_uses_unfired_suffix() {
        let mut revolver = Revolver::from_layout(vec![true, false, false, true]);
        assert_eq!(revolver.bullet_chance(), 0.5);

        assert!(revolver.fire());
        assert_eq!(revolver.chambers_left(), 3);
        assert_eq!(revolver.bullets_left(), 1);
        assert!((revolver.bullet_chance() - 1.0 / 3.0).abs() < f64::EPSILON);

        revolver.set_current(4);
        assert!(revolver.is_spent());
        assert_eq!(revolver.bullet_chance(), 0.0);
    }

    #[test]
    fn test_build_is_reproducible_and_committed() {
        let factory = RevolverFactory::default();
        let a = factory.build(2, &mut StdRng::seed_from_u64(99));
        let b = factory.build(2, &mut StdRng::seed_from_u64(99));

        assert_eq!(a.layout(), b.layout());
        assert_eq!(a.commitment(), b.commitment());
        assert!(LayoutCommitment::verify(
            &a.commitment().digest_hex(),
            a.layout(),
            &a.commitment().nonce_hex()
        ));
    }
}
