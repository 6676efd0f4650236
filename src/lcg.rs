/// Multiplier of the 32-bit linear congruential generator
pub const LCG_MULTIPLIER: u32 = 22_695_477;
pub const LCG_INCREMENT: u32 = 1;
/// Bit of a draw used to break spill ties
const SPILL_BIT: u32 = 16;

/// Cheap deterministic generator driving the particle shuffle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lcg {
    state: u32,
}

impl Lcg {
    pub fn new(seed: u32) -> Self {
        Self { state: seed }
    }

    /// Advance and return the new state
    #[inline]
    pub fn next_u32(&mut self) -> u32 {
        self.state = self
            .state
            .wrapping_mul(LCG_MULTIPLIER)
            .wrapping_add(LCG_INCREMENT);
        self.state
    }

    pub fn state(&self) -> u32 {
        self.state
    }
}

/// Map a draw onto `0..remaining`
#[inline]
pub fn pick_index(draw: u32, remaining: usize) -> usize {
    debug_assert!(remaining > 0 && remaining <= u32::MAX as usize);
    (draw % remaining as u32) as usize
}

/// Reuse a bit of an existing draw instead of advancing the generator
#[inline]
pub fn spill_up(draw: u32) -> bool {
    (draw >> SPILL_BIT) & 1 == 1
}
