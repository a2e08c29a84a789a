//! Identifier generation for view model instances.
//!
//! An explicit id always wins and is returned verbatim, which is how several
//! views intentionally share one instance. Otherwise [`IdGenerator::generate`]
//! derives `{prefix}_{sequence}` from an [`IdScope`]:
//!
//! - the prefix is a short session token, memoized on the scope the first
//!   time it asks for an id
//! - the sequence is a per-scope counter starting at zero, zero padded
//!
//! All state lives in the generator and scope values. Nothing is process
//! global, so tests can create isolated generators or [`reset`](IdScope::reset)
//! a scope.
//!
//! # Examples
//!
//! ```
//! use mvvm_core::{IdConfig, IdGenerator, IdScope, ViewModelId};
//!
//! let config = IdConfig { include_kind_name: false, ..IdConfig::default() };
//! let generator = IdGenerator::with_session_prefix(config, "s1");
//! let scope = IdScope::new();
//!
//! assert_eq!(generator.generate(&scope, None).as_str(), "s1_00000");
//! assert_eq!(generator.generate(&scope, None).as_str(), "s1_00001");
//!
//! let fixed = ViewModelId::new("my-test");
//! assert_eq!(generator.resolve(Some(&fixed), &scope, None), fixed);
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::config::IdConfig;
use crate::types::{ViewModelId, ViewModelKind};

const ALPHABET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Produces unique view model ids.
#[derive(Debug)]
pub struct IdGenerator {
    config: IdConfig,

    /// Session token shared by every scope this generator initializes.
    session: String,

    /// Number of scopes that have taken a prefix from this generator.
    scopes: AtomicU64,
}

impl IdGenerator {
    /// Creates a generator with a random session token.
    #[must_use]
    pub fn new(config: IdConfig) -> Self {
        let session = random_token(config.prefix_len);
        Self::with_session_prefix(config, session)
    }

    /// Creates a generator with a fixed session token.
    ///
    /// Useful for deterministic ids in tests and replayed scenarios.
    #[must_use]
    pub fn with_session_prefix(config: IdConfig, session: impl Into<String>) -> Self {
        Self {
            config,
            session: session.into(),
            scopes: AtomicU64::new(0),
        }
    }

    /// Returns the id format configuration.
    #[inline]
    #[must_use]
    pub const fn config(&self) -> &IdConfig {
        &self.config
    }

    /// Returns the session token.
    #[inline]
    #[must_use]
    pub fn session(&self) -> &str {
        &self.session
    }

    /// Returns `explicit` if it is a non-empty id, otherwise generates one.
    #[must_use]
    pub fn resolve(
        &self,
        explicit: Option<&ViewModelId>,
        scope: &IdScope,
        kind: Option<ViewModelKind>,
    ) -> ViewModelId {
        match explicit {
            Some(id) if !id.is_empty() => id.clone(),
            _ => self.generate(scope, kind),
        }
    }

    /// Generates the next id for `scope`.
    ///
    /// Never fails. Repeated calls with the same scope yield a strictly
    /// increasing sequence.
    #[must_use]
    pub fn generate(&self, scope: &IdScope, kind: Option<ViewModelKind>) -> ViewModelId {
        let prefix = scope
            .inner
            .prefix
            .get_or_init(|| self.next_scope_prefix());
        let sequence = scope.inner.counter.fetch_add(1, Ordering::Relaxed);
        let width = self.config.pad_width;

        let base = format!("{prefix}_{sequence:0width$}");
        match kind {
            Some(kind) if self.config.include_kind_name => {
                ViewModelId::new(format!("{}_{base}", kind.short_name()))
            }
            _ => ViewModelId::new(base),
        }
    }

    fn next_scope_prefix(&self) -> String {
        match self.scopes.fetch_add(1, Ordering::Relaxed) {
            0 => self.session.clone(),
            n => format!("{}{}", self.session, to_base36(n)),
        }
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new(IdConfig::default())
    }
}

/// The memoization scope for generated ids.
///
/// Plays the role of the shared context object of a binding: every view bound
/// through the same binding draws ids from the same scope. Cloning a scope
/// shares its state.
#[derive(Debug, Clone, Default)]
pub struct IdScope {
    inner: Arc<ScopeState>,
}

#[derive(Debug, Default)]
struct ScopeState {
    prefix: OnceLock<String>,
    counter: AtomicU64,
}

impl IdScope {
    /// Creates a fresh scope with no prefix and a zero counter.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the memoized prefix, if an id has been generated yet.
    #[must_use]
    pub fn prefix(&self) -> Option<&str> {
        self.inner.prefix.get().map(String::as_str)
    }

    /// Returns how many ids this scope has issued since the last reset.
    #[must_use]
    pub fn issued(&self) -> u64 {
        self.inner.counter.load(Ordering::Relaxed)
    }

    /// Restarts the sequence at zero. The prefix is kept.
    pub fn reset(&self) {
        self.inner.counter.store(0, Ordering::Relaxed);
    }

    /// Returns `true` if both handles share the same scope state.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

fn to_base36(mut value: u64) -> String {
    if value == 0 {
        return "0".to_owned();
    }
    let mut digits = Vec::new();
    while value > 0 {
        digits.push(ALPHABET[(value % 36) as usize]);
        value /= 36;
    }
    digits.reverse();
    String::from_utf8_lossy(&digits).into_owned()
}

/// Draws `len` base-36 digits from the OS entropy source. A `u64` covers the
/// longest allowed token (36^12 < 2^64).
fn random_token(len: usize) -> String {
    let mut value = getrandom::u64().unwrap_or_else(|_| clock_seed());

    let mut token = String::with_capacity(len);
    for _ in 0..len {
        token.push(char::from(ALPHABET[(value % 36) as usize]));
        value /= 36;
    }
    token
}

/// Seed for targets without an entropy source.
fn clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FxHashSet;

    struct Sidebar;

    fn plain_config() -> IdConfig {
        IdConfig {
            include_kind_name: false,
            ..IdConfig::default()
        }
    }

    #[test]
    fn test_explicit_id_wins() {
        let generator = IdGenerator::new(plain_config());
        let scope = IdScope::new();
        let fixed = ViewModelId::new("my-test");

        assert_eq!(generator.resolve(Some(&fixed), &scope, None), fixed);
        assert_eq!(scope.issued(), 0);
        assert!(scope.prefix().is_none());
    }

    #[test]
    fn test_empty_explicit_id_is_generated() {
        let generator = IdGenerator::with_session_prefix(plain_config(), "s");
        let scope = IdScope::new();
        let id = generator.resolve(Some(&ViewModelId::new("")), &scope, None);
        assert_eq!(id.as_str(), "s_00000");
    }

    #[test]
    fn test_sequence_is_strictly_increasing() {
        let generator = IdGenerator::with_session_prefix(plain_config(), "abc");
        let scope = IdScope::new();

        let ids: Vec<_> = (0..3).map(|_| generator.generate(&scope, None)).collect();
        assert_eq!(ids[0].as_str(), "abc_00000");
        assert_eq!(ids[1].as_str(), "abc_00001");
        assert_eq!(ids[2].as_str(), "abc_00002");
        assert_eq!(scope.prefix(), Some("abc"));
    }

    #[test]
    fn test_generated_ids_are_unique_across_scopes() {
        let generator = IdGenerator::new(plain_config());
        let scopes: Vec<_> = (0..4).map(|_| IdScope::new()).collect();

        let mut seen = FxHashSet::default();
        for scope in &scopes {
            for _ in 0..50 {
                assert!(seen.insert(generator.generate(scope, None)));
            }
        }
        assert_eq!(seen.len(), 200);
    }

    #[test]
    fn test_second_scope_gets_distinct_prefix() {
        let generator = IdGenerator::with_session_prefix(plain_config(), "abc");
        let first = IdScope::new();
        let second = IdScope::new();

        assert_eq!(generator.generate(&first, None).as_str(), "abc_00000");
        assert_eq!(generator.generate(&second, None).as_str(), "abc1_00000");
    }

    #[test]
    fn test_kind_name_prefix() {
        let config = IdConfig {
            include_kind_name: true,
            ..IdConfig::default()
        };
        let generator = IdGenerator::with_session_prefix(config, "abc");
        let scope = IdScope::new();

        let id = generator.generate(&scope, Some(ViewModelKind::of::<Sidebar>()));
        assert_eq!(id.as_str(), "Sidebar_abc_00000");

        let without_kind = generator.generate(&scope, None);
        assert_eq!(without_kind.as_str(), "abc_00001");
    }

    #[test]
    fn test_kind_name_omitted_when_disabled() {
        let generator = IdGenerator::with_session_prefix(plain_config(), "abc");
        let scope = IdScope::new();
        let id = generator.generate(&scope, Some(ViewModelKind::of::<Sidebar>()));
        assert_eq!(id.as_str(), "abc_00000");
    }

    #[test]
    fn test_pad_width() {
        let config = IdConfig {
            include_kind_name: false,
            pad_width: 2,
            ..IdConfig::default()
        };
        let generator = IdGenerator::with_session_prefix(config, "p");
        let scope = IdScope::new();
        assert_eq!(generator.generate(&scope, None).as_str(), "p_00");
    }

    #[test]
    fn test_scope_reset_and_sharing() {
        let generator = IdGenerator::with_session_prefix(plain_config(), "abc");
        let scope = IdScope::new();
        let shared = scope.clone();

        let _ = generator.generate(&scope, None);
        let _ = generator.generate(&shared, None);
        assert_eq!(scope.issued(), 2);
        assert!(scope.ptr_eq(&shared));

        scope.reset();
        assert_eq!(generator.generate(&shared, None).as_str(), "abc_00000");
    }

    #[test]
    fn test_random_token_length() {
        let generator = IdGenerator::new(IdConfig {
            prefix_len: 8,
            ..plain_config()
        });
        assert_eq!(generator.session().len(), 8);
        assert!(generator.session().chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_random_tokens_differ_between_sessions() {
        let config = IdConfig {
            prefix_len: 12,
            ..plain_config()
        };
        let sessions: FxHashSet<String> = (0..16)
            .map(|_| IdGenerator::new(config).session().to_owned())
            .collect();
        assert_eq!(sessions.len(), 16);
        assert!(sessions.iter().all(|session| session.len() == 12));
    }

    #[test]
    fn test_to_base36() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "z");
        assert_eq!(to_base36(36), "10");
    }
}
