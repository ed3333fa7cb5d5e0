/// Mints `u32` keys from a wrapping counter that skips zero, so zero can
/// serve everywhere as the "no handle" / "no correlation" value.
///
/// Keys are never recycled: a handle that has been released must keep
/// behaving as a stale no-op, so the counter only ever moves forward and
/// wrap-around collisions are checked by callers at the registration site.
pub struct KeyGenerator {
    next_key: u32,
}

impl KeyGenerator {
    pub fn new() -> Self {
        Self { next_key: 1 }
    }

    /// Starts the counter at an arbitrary point. Useful for exercising
    /// wrap-around without minting four billion keys.
    pub fn starting_at(next_key: u32) -> Self {
        Self {
            next_key: if next_key == 0 { 1 } else { next_key },
        }
    }

    pub fn generate(&mut self) -> u32 {
        let key = self.next_key;
        self.next_key = self.next_key.wrapping_add(1);
        if self.next_key == 0 {
            self.next_key = 1;
        }
        key
    }
}

impl Default for KeyGenerator {
    fn default() -> Self {
        Self::new()
    }
}
