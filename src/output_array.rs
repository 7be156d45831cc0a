use embassy_rp::gpio::{self, Level};

use crate::words::{Word, WordOutputs};
use crate::{Error, Result};

/// A fixed set of GPIO outputs, one per lamp.
pub struct OutputArray<'a, const N: usize>([gpio::Output<'a>; N]);

impl<'a, const N: usize> OutputArray<'a, N> {
    #[must_use]
    pub const fn new(outputs: [gpio::Output<'a>; N]) -> Self {
        Self(outputs)
    }

    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfBounds`] if `index` is not below `N`.
    #[inline]
    pub fn set_level_at(&mut self, index: usize, level: Level) -> Result<()> {
        self.0
            .get_mut(index)
            .ok_or(Error::IndexOutOfBounds)?
            .set_level(level);
        Ok(())
    }
}

// Lamps are driven active high.
impl<const N: usize> WordOutputs for OutputArray<'_, N> {
    fn set_word(&mut self, word: Word, lit: bool) -> Result<()> {
        self.set_level_at(usize::from(word.index()), Level::from(lit))
    }
}
