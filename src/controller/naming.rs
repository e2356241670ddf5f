//! Task name generation with collision checks.
//!
//! Names take the form `<profile>-<RRGGBB>` where the suffix is three random
//! bytes rendered as upper-case hex. Three bytes leave room for collisions, so
//! every candidate is checked against the names already in use before it is
//! handed out.

use std::collections::BTreeSet;
use std::sync::{Mutex, PoisonError};

use uuid::Uuid;

/// Upper bound on candidate names tried for one task.
pub const MAX_NAME_ATTEMPTS: usize = 8;

/// Renders a fresh candidate name for `profile`.
#[must_use]
pub fn candidate_name(profile: &str) -> String {
    let [first, second, third, ..] = Uuid::new_v4().into_bytes();
    format!("{profile}-{first:02X}{second:02X}{third:02X}")
}

/// Task names known to be taken, shared by the items of one batch.
#[derive(Debug, Default)]
pub(crate) struct NameReservations {
    taken: Mutex<BTreeSet<String>>,
}

impl NameReservations {
    pub(crate) fn new(existing: impl IntoIterator<Item = String>) -> Self {
        Self {
            taken: Mutex::new(existing.into_iter().collect()),
        }
    }

    /// Reserves an unused name, or `None` once the attempts run out.
    pub(crate) fn reserve(&self, profile: &str) -> Option<String> {
        self.reserve_with(profile, candidate_name)
    }

    fn reserve_with(
        &self,
        profile: &str,
        mut generate: impl FnMut(&str) -> String,
    ) -> Option<String> {
        let mut taken = self.taken.lock().unwrap_or_else(PoisonError::into_inner);
        (0..MAX_NAME_ATTEMPTS)
            .map(|_| generate(profile))
            .find(|name| taken.insert(name.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn has_hex_suffix(name: &str, profile: &str) -> bool {
        name.strip_prefix(profile)
            .and_then(|rest| rest.strip_prefix('-'))
            .is_some_and(|suffix| {
                suffix.len() == 6
                    && suffix
                        .chars()
                        .all(|ch| ch.is_ascii_digit() || ('A'..='F').contains(&ch))
            })
    }

    #[rstest]
    fn candidate_names_carry_six_upper_hex_digits() {
        for _ in 0..64 {
            let name = candidate_name("deadline-linux");
            assert!(has_hex_suffix(&name, "deadline-linux"), "bad name {name}");
        }
    }

    #[rstest]
    fn reserve_skips_names_already_taken() {
        let reservations = NameReservations::new([String::from("p-000001")]);
        let mut counter = 0_u32;
        let name = reservations.reserve_with("p", |profile| {
            counter += 1;
            format!("{profile}-{counter:06X}")
        });
        assert_eq!(name.as_deref(), Some("p-000002"));
    }

    #[rstest]
    fn reserve_gives_up_after_bounded_attempts() {
        let reservations = NameReservations::new([String::from("p-AAAAAA")]);
        let mut attempts = 0_usize;
        let name = reservations.reserve_with("p", |profile| {
            attempts += 1;
            format!("{profile}-AAAAAA")
        });
        assert!(name.is_none());
        assert_eq!(attempts, MAX_NAME_ATTEMPTS);
    }

    #[rstest]
    fn reserved_names_are_not_handed_out_twice() {
        let reservations = NameReservations::default();
        let first = reservations.reserve_with("p", |profile| format!("{profile}-ABCDEF"));
        let second = reservations.reserve_with("p", |profile| format!("{profile}-ABCDEF"));
        assert_eq!(first.as_deref(), Some("p-ABCDEF"));
        assert!(second.is_none());
    }
}
