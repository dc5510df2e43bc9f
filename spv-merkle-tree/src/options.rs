use std::fmt;

/// How an unmatched trailing node on an odd level gets its sibling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ExtensionPolicy {
    /// The sibling slot receives a copy of the unmatched node's digest.
    /// Deterministic; the verifier must pad the same way.
    #[default]
    UseCopy,
    /// The sibling slot receives a random pad from the tree's
    /// [`RandomPadGenerator`](crate::RandomPadGenerator). The pad ledger of
    /// the run must be delivered to verifiers out of band.
    UseSpecialKeys,
}

impl fmt::Display for ExtensionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtensionPolicy::UseCopy => write!(f, "UseCopy"),
            ExtensionPolicy::UseSpecialKeys => write!(f, "UseSpecialKeys"),
        }
    }
}

/// Tree configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TreeOptions {
    /// Padding rule for odd levels.
    pub extension_policy: ExtensionPolicy,
    /// Seed for the pad generator. `None` seeds from the system clock, which
    /// makes `UseSpecialKeys` roots differ between trees.
    pub pad_seed: Option<u64>,
}

impl TreeOptions {
    /// Options with the given policy and a clock seed.
    pub fn with_policy(extension_policy: ExtensionPolicy) -> Self {
        TreeOptions {
            extension_policy,
            pad_seed: None,
        }
    }

    /// Same options with a fixed pad seed.
    pub fn seeded(mut self, seed: u64) -> Self {
        self.pad_seed = Some(seed);
        self
    }
}

impl fmt::Display for TreeOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TreeOptions {{ extension_policy: {}, pad_seed: {:?} }}",
            self.extension_policy, self.pad_seed
        )
    }
}
