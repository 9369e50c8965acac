/// Errors produced while parsing hardware values in `gpuhost-core`.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum CoreError {
    /// A compute capability string was not of the form `major.minor`.
    #[error("invalid compute capability '{value}': expected 'major.minor'")]
    InvalidCapability { value: String },
}

/// Failures signalled by the [`ResourceLock`](crate::ResourceLock).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum LockError {
    /// The accelerator is already held. Callers retry later.
    #[error("accelerator is busy")]
    Busy,

    /// Unlock was attempted by someone other than the current holder.
    #[error("unlock rejected: '{requested_by}' does not hold the lock")]
    Unauthorized { requested_by: String },
}

/// Failures signalled by the [`ClanRegistry`](crate::ClanRegistry).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum ClanError {
    /// `form` was called on a registry that already hosts a clan.
    #[error("clan {clan_id} is already formed")]
    AlreadyFormed { clan_id: String },

    /// A clan operation was attempted before `form`.
    #[error("no clan has been formed on this host")]
    NotFormed,

    /// The candidate failed the hardware compatibility predicate.
    #[error("hardware incompatible with clan host: {0}")]
    Incompatible(#[from] Incompatibility),
}

/// The first compatibility check a worker candidate failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum Incompatibility {
    /// Architecture families differ.
    #[error("architecture mismatch (host {host}, worker {worker})")]
    Architecture { host: String, worker: String },

    /// Compute capability strings differ.
    #[error("compute capability mismatch (host {host}, worker {worker})")]
    Capability { host: String, worker: String },

    /// Total memory is outside ±10% of the host's.
    #[error("memory imbalance (host {host} bytes, worker {worker} bytes)")]
    Memory { host: u64, worker: u64 },
}
