//! Attempt tokens and activation epochs
//!
//! Every issued fetch gets a fresh [`AttemptToken`]. The engine remembers
//! exactly one current token; a settlement may write the value cell only if
//! it carries that token.

/// Identifier for a single issued fetch attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AttemptToken(u64);

impl AttemptToken {
    /// Create a token with the given value
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw token value
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for AttemptToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "attempt-{}", self.0)
    }
}

/// Counts activations: each `activate()` or restart opens a new epoch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Epoch(u64);

impl Epoch {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for Epoch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "epoch-{}", self.0)
    }
}

/// Per-engine source of tokens and epochs
///
/// Both counters start at 1 and only move forward, so a token is never
/// handed out twice by the same engine.
#[derive(Debug)]
pub(crate) struct TokenClock {
    next_token: u64,
    next_epoch: u64,
}

impl TokenClock {
    pub(crate) fn new() -> Self {
        Self {
            next_token: 1,
            next_epoch: 1,
        }
    }

    pub(crate) fn mint(&mut self) -> AttemptToken {
        let token = AttemptToken(self.next_token);
        self.next_token += 1;
        token
    }

    pub(crate) fn next_epoch(&mut self) -> Epoch {
        let epoch = Epoch(self.next_epoch);
        self.next_epoch += 1;
        epoch
    }

    /// Number of tokens minted so far
    pub(crate) fn minted(&self) -> u64 {
        self.next_token - 1
    }

    /// Number of epochs opened so far
    pub(crate) fn epochs(&self) -> u64 {
        self.next_epoch - 1
    }
}
