/// Rolling key over the trailing K digits of a window.
///
/// The key is the numeric value of the last K digits seen, so two windows with
/// equal keys share their trailing K digits exactly.
/// Supports O(1) sliding updates: shift in the new digit, drop the oldest.
#[derive(Debug, Clone)]
pub struct WindowKey {
    value: u32,
    modulus: u32,
}

impl WindowKey {
    /// `modulus` is 10^K.
    pub fn new(modulus: u32) -> Self {
        Self { value: 0, modulus }
    }

    /// Compute the key directly from a block of digits.
    pub fn init(&mut self, digits: &[u8]) {
        self.value = 0;
        for &d in digits {
            self.push(d);
        }
    }

    /// Slide the window by one digit.
    pub fn push(&mut self, digit: u8) {
        // 10^9 * 10 + 9 overflows u32, so widen for the multiply.
        self.value = ((self.value as u64 * 10 + digit as u64) % self.modulus as u64) as u32;
    }

    pub fn digest(&self) -> u32 {
        self.value
    }
}
