//! Skin assignment: picks a visual variant for each new session.
//!
//! Skins are cosmetic, not identity: two players may well get the same
//! one. The only requirements are that every skin comes from the
//! configured palette and that tests can make the choice deterministic,
//! which is why the source of randomness is injected through the
//! [`SkinSource`] trait instead of being called directly.

use nightshift_protocol::Skin;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::SessionError;

/// The finite set of skins a session can be given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkinPalette {
    variants: Vec<Skin>,
}

impl SkinPalette {
    /// Builds a palette from the given variants. Duplicates are dropped so
    /// that every variant stays equally likely.
    ///
    /// # Errors
    /// Returns [`SessionError::EmptyPalette`] if no variants are given.
    pub fn new(
        variants: impl IntoIterator<Item = Skin>,
    ) -> Result<Self, SessionError> {
        let mut unique: Vec<Skin> = Vec::new();
        for skin in variants {
            if !unique.contains(&skin) {
                unique.push(skin);
            }
        }
        if unique.is_empty() {
            return Err(SessionError::EmptyPalette);
        }
        Ok(Self { variants: unique })
    }

    /// The distinct variants, in the order they were first given.
    pub fn variants(&self) -> &[Skin] {
        &self.variants
    }

    /// Whether `skin` can be handed out from this palette.
    pub fn contains(&self, skin: Skin) -> bool {
        self.variants.contains(&skin)
    }

    /// Number of distinct variants; at least one.
    pub fn len(&self) -> usize {
        self.variants.len()
    }

    /// Always `false`; a palette cannot be built empty.
    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }
}

/// The three character models shipped with the browser client.
impl Default for SkinPalette {
    fn default() -> Self {
        Self {
            variants: vec![Skin(1), Skin(2), Skin(3)],
        }
    }
}

/// Hands out a skin for each newly created session.
///
/// `Send + 'static` because the registry that owns it lives inside the
/// world actor task.
pub trait SkinSource: Send + 'static {
    fn assign(&mut self) -> Skin;
}

/// Draws skins uniformly at random from a palette.
///
/// Generic over the RNG so tests can pass a seeded one; production uses
/// an OS-seeded [`StdRng`].
#[derive(Debug, Clone)]
pub struct RandomSkins<R = StdRng> {
    palette: SkinPalette,
    rng: R,
}

impl RandomSkins<StdRng> {
    /// Random skins seeded from the operating system.
    pub fn new(palette: SkinPalette) -> Self {
        Self::with_rng(palette, StdRng::from_os_rng())
    }

    /// Reproducible skins: the same seed always yields the same sequence.
    pub fn seeded(palette: SkinPalette, seed: u64) -> Self {
        Self::with_rng(palette, StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> RandomSkins<R> {
    /// Draws from `palette` using a caller-supplied RNG.
    pub fn with_rng(palette: SkinPalette, rng: R) -> Self {
        Self { palette, rng }
    }

    /// The variants this source draws from.
    pub fn palette(&self) -> &SkinPalette {
        &self.palette
    }
}

impl Default for RandomSkins<StdRng> {
    fn default() -> Self {
        Self::new(SkinPalette::default())
    }
}

impl<R: Rng + Send + 'static> SkinSource for RandomSkins<R> {
    fn assign(&mut self) -> Skin {
        let index = self.rng.random_range(0..self.palette.variants.len());
        self.palette.variants[index]
    }
}

/// Replays a fixed list of skins in order, wrapping around at the end.
#[derive(Debug, Clone)]
pub struct SequenceSkins {
    sequence: Vec<Skin>,
    next: usize,
}

impl SequenceSkins {
    /// # Errors
    /// Returns [`SessionError::EmptyPalette`] if the sequence is empty.
    pub fn new(
        sequence: impl IntoIterator<Item = Skin>,
    ) -> Result<Self, SessionError> {
        let sequence: Vec<Skin> = sequence.into_iter().collect();
        if sequence.is_empty() {
            return Err(SessionError::EmptyPalette);
        }
        Ok(Self { sequence, next: 0 })
    }
}

impl SkinSource for SequenceSkins {
    fn assign(&mut self) -> Skin {
        let skin = self.sequence[self.next];
        self.next = (self.next + 1) % self.sequence.len();
        skin
    }
}
