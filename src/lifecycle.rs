// ♻️ Soft delete / restore
//
// Compras, ventas, bonos and trabajadores are never physically removed.
// Deleting flips `active` off and records who and why; restoring clears it.
// Entities layer their own guards on top (a venta reverting its machine,
// a compra refusing while its machine is sold, ...).

use crate::error::DomainError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveState {
    pub active: bool,
    pub deactivated_at: Option<DateTime<Utc>>,
    pub deactivated_by: Option<String>,
    pub reason: Option<String>,
}

impl ActiveState {
    pub fn new() -> Self {
        ActiveState {
            active: true,
            deactivated_at: None,
            deactivated_by: None,
            reason: None,
        }
    }

    pub fn deactivate(&mut self, actor: &str, reason: Option<String>) -> Result<(), DomainError> {
        if !self.active {
            return Err(DomainError::AlreadyInactive);
        }
        self.active = false;
        self.deactivated_at = Some(Utc::now());
        self.deactivated_by = Some(actor.to_string());
        self.reason = reason;
        Ok(())
    }

    pub fn restore(&mut self) -> Result<(), DomainError> {
        if self.active {
            return Err(DomainError::AlreadyActive);
        }
        *self = ActiveState::new();
        Ok(())
    }
}

impl Default for ActiveState {
    fn default() -> Self {
        Self::new()
    }
}

/// Uniform soft-delete surface for entities that embed an `ActiveState`.
pub trait SoftDelete {
    fn state(&self) -> &ActiveState;
    fn state_mut(&mut self) -> &mut ActiveState;

    fn is_active(&self) -> bool {
        self.state().active
    }

    fn soft_delete(&mut self, actor: &str, reason: Option<String>) -> Result<(), DomainError> {
        self.state_mut().deactivate(actor, reason)
    }

    fn restore(&mut self) -> Result<(), DomainError> {
        self.state_mut().restore()
    }
}

/// Keep active records only, unless `include_inactive`
pub fn visible<T: SoftDelete>(items: Vec<T>, include_inactive: bool) -> Vec<T> {
    if include_inactive {
        items
    } else {
        items.into_iter().filter(|i| i.is_active()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Record {
        estado: ActiveState,
    }

    impl SoftDelete for Record {
        fn state(&self) -> &ActiveState {
            &self.estado
        }
        fn state_mut(&mut self) -> &mut ActiveState {
            &mut self.estado
        }
    }

    #[test]
    fn test_deactivate_records_actor_and_reason() {
        let mut r = Record { estado: ActiveState::new() };
        r.soft_delete("rrhh", Some("duplicado".to_string())).unwrap();

        assert!(!r.is_active());
        assert!(r.estado.deactivated_at.is_some());
        assert_eq!(r.estado.deactivated_by.as_deref(), Some("rrhh"));
        assert_eq!(r.estado.reason.as_deref(), Some("duplicado"));
    }

    #[test]
    fn test_double_delete_fails() {
        let mut r = Record { estado: ActiveState::new() };
        r.soft_delete("rrhh", None).unwrap();
        assert_eq!(r.soft_delete("rrhh", None), Err(DomainError::AlreadyInactive));
    }

    #[test]
    fn test_restore_clears_deactivation() {
        let mut r = Record { estado: ActiveState::new() };
        assert_eq!(r.restore(), Err(DomainError::AlreadyActive));

        r.soft_delete("admin", Some("error".to_string())).unwrap();
        r.restore().unwrap();

        assert_eq!(r.estado, ActiveState::new());
    }

    #[test]
    fn test_visible_filters_inactive() {
        let mut gone = Record { estado: ActiveState::new() };
        gone.soft_delete("admin", None).unwrap();
        let kept = Record { estado: ActiveState::new() };

        assert_eq!(visible(vec![gone, kept], false).len(), 1);

        let mut gone = Record { estado: ActiveState::new() };
        gone.soft_delete("admin", None).unwrap();
        let kept = Record { estado: ActiveState::new() };
        assert_eq!(visible(vec![gone, kept], true).len(), 2);
    }
}
