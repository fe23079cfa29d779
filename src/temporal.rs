// ⏰ Temporal model - history of a record
//
// "Identity persists, values change": a ficha keeps one identity (the
// worker's RUT) and an append-only timeline of values. Each value knows
// when it became true, when it stopped being true, who changed it and why.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// VERSION
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Version<T> {
    pub value: T,

    /// Monotonically increasing, starts at 1
    pub version: i64,

    pub valid_from: DateTime<Utc>,

    /// None = still current
    pub valid_until: Option<DateTime<Utc>>,

    pub changed_by: String,
    pub change_reason: Option<String>,
}

impl<T> Version<T> {
    pub fn is_current(&self) -> bool {
        self.valid_until.is_none()
    }

    pub fn was_valid_at(&self, time: DateTime<Utc>) -> bool {
        self.valid_from <= time && self.valid_until.map_or(true, |until| until > time)
    }
}

/// Field-level comparison, so history can say *what* changed
pub trait Diff {
    fn changed_fields(&self, other: &Self) -> Vec<&'static str>;
}

// ============================================================================
// TIMELINE
// ============================================================================

/// Never empty. Not `Deserialize` for that reason; use `from_versions`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Timeline<T> {
    versions: Vec<Version<T>>,
}

impl<T: Clone> Timeline<T> {
    pub fn new(initial: T, created_by: &str) -> Self {
        Self::new_at(initial, created_by, Utc::now())
    }

    pub fn new_at(initial: T, created_by: &str, at: DateTime<Utc>) -> Self {
        Timeline {
            versions: vec![Version {
                value: initial,
                version: 1,
                valid_from: at,
                valid_until: None,
                changed_by: created_by.to_string(),
                change_reason: None,
            }],
        }
    }

    /// Rebuild from stored versions; `None` if there are none
    pub fn from_versions(mut versions: Vec<Version<T>>) -> Option<Self> {
        if versions.is_empty() {
            return None;
        }
        versions.sort_by_key(|v| v.version);
        Some(Timeline { versions })
    }

    pub fn current(&self) -> &Version<T> {
        // Constructors guarantee at least one version
        &self.versions[self.versions.len() - 1]
    }

    pub fn at_version(&self, version: i64) -> Option<&Version<T>> {
        self.versions.iter().find(|v| v.version == version)
    }

    /// Value as it was at `time`
    pub fn as_of(&self, time: DateTime<Utc>) -> Option<&Version<T>> {
        self.versions.iter().find(|v| v.was_valid_at(time))
    }

    pub fn history(&self) -> &[Version<T>] {
        &self.versions
    }

    pub fn update(&mut self, value: T, actor: &str, reason: Option<String>) -> i64 {
        self.update_at(value, actor, reason, Utc::now())
    }

    /// Close the current version at `at` and append `value` as the next one.
    /// `at` is clamped so versions never overlap backwards.
    pub fn update_at(
        &mut self,
        value: T,
        actor: &str,
        reason: Option<String>,
        at: DateTime<Utc>,
    ) -> i64 {
        let last = self.versions.len() - 1;
        let at = at.max(self.versions[last].valid_from);
        self.versions[last].valid_until = Some(at);

        let next = self.versions[last].version + 1;
        self.versions.push(Version {
            value,
            version: next,
            valid_from: at,
            valid_until: None,
            changed_by: actor.to_string(),
            change_reason: reason,
        });
        next
    }

    pub fn version_count(&self) -> usize {
        self.versions.len()
    }

    pub fn has_history(&self) -> bool {
        self.versions.len() > 1
    }
}

impl<T: Clone + Diff> Timeline<T> {
    /// Fields that differ between two versions; `None` if either is missing
    pub fn changes_between(&self, from: i64, to: i64) -> Option<Vec<&'static str>> {
        let a = self.at_version(from)?;
        let b = self.at_version(to)?;
        Some(a.value.changed_fields(&b.value))
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[derive(Debug, Clone, PartialEq)]
    struct Cargo {
        nombre: String,
        sueldo: i64,
    }

    impl Diff for Cargo {
        fn changed_fields(&self, other: &Self) -> Vec<&'static str> {
            let mut fields = Vec::new();
            if self.nombre != other.nombre {
                fields.push("nombre");
            }
            if self.sueldo != other.sueldo {
                fields.push("sueldo");
            }
            fields
        }
    }

    fn cargo(nombre: &str, sueldo: i64) -> Cargo {
        Cargo {
            nombre: nombre.to_string(),
            sueldo,
        }
    }

    #[test]
    fn test_new_timeline_has_one_current_version() {
        let t = Timeline::new(cargo("Operador", 800_000), "rrhh");

        assert_eq!(t.version_count(), 1);
        assert!(!t.has_history());
        assert_eq!(t.current().version, 1);
        assert!(t.current().is_current());
    }

    #[test]
    fn test_update_closes_previous_version() {
        let t0 = Utc::now();
        let mut t = Timeline::new_at(cargo("Operador", 800_000), "rrhh", t0);

        let v = t.update_at(
            cargo("Operador", 900_000),
            "rrhh",
            Some("reajuste".to_string()),
            t0 + Duration::days(30),
        );

        assert_eq!(v, 2);
        let history = t.history();
        assert_eq!(history[0].valid_until, Some(t0 + Duration::days(30)));
        assert!(history[1].is_current());
        assert_eq!(history[1].change_reason.as_deref(), Some("reajuste"));
    }

    #[test]
    fn test_as_of_returns_value_valid_at_time() {
        let t0 = Utc::now();
        let mut t = Timeline::new_at(cargo("Operador", 800_000), "rrhh", t0);
        t.update_at(cargo("Supervisor", 1_200_000), "rrhh", None, t0 + Duration::days(10));

        assert!(t.as_of(t0 - Duration::seconds(1)).is_none());
        assert_eq!(t.as_of(t0 + Duration::days(5)).unwrap().value.nombre, "Operador");
        assert_eq!(t.as_of(t0 + Duration::days(10)).unwrap().value.nombre, "Supervisor");
        assert_eq!(t.as_of(t0 + Duration::days(99)).unwrap().version, 2);
    }

    #[test]
    fn test_update_never_goes_backwards() {
        let t0 = Utc::now();
        let mut t = Timeline::new_at(cargo("Operador", 800_000), "rrhh", t0);
        t.update_at(cargo("Operador", 810_000), "rrhh", None, t0 - Duration::days(1));

        assert_eq!(t.history()[1].valid_from, t0);
    }

    #[test]
    fn test_changes_between() {
        let mut t = Timeline::new(cargo("Operador", 800_000), "rrhh");
        t.update(cargo("Operador", 900_000), "rrhh", None);
        t.update(cargo("Supervisor", 900_000), "rrhh", None);

        assert_eq!(t.changes_between(1, 2), Some(vec!["sueldo"]));
        assert_eq!(t.changes_between(1, 3), Some(vec!["nombre", "sueldo"]));
        assert_eq!(t.changes_between(1, 9), None);
    }

    #[test]
    fn test_from_versions_sorts() {
        let mut t = Timeline::new(cargo("A", 1), "rrhh");
        t.update(cargo("B", 2), "rrhh", None);

        let mut stored = t.history().to_vec();
        stored.reverse();

        let rebuilt = Timeline::from_versions(stored).unwrap();
        assert_eq!(rebuilt, t);
        assert!(Timeline::<Cargo>::from_versions(Vec::new()).is_none());
    }
}
