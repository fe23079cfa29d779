// 🔐 Roles - who may see and change what
//
// Identity is established upstream; this only answers "may role R do A".

use crate::error::DomainError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Administrador,
    RecursosHumanos,
    Gerencia,
    Usuario,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    ViewWorkers,
    ManageWorkers,
    ManageBonos,
    ViewMachinery,
    ManageMachinery,
    ViewOwnRecord,
    ManageUsers,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::ViewWorkers => "ver trabajadores",
            Action::ManageWorkers => "gestionar trabajadores",
            Action::ManageBonos => "gestionar bonos",
            Action::ViewMachinery => "ver maquinaria",
            Action::ManageMachinery => "gestionar maquinaria",
            Action::ViewOwnRecord => "ver su ficha",
            Action::ManageUsers => "gestionar usuarios",
        }
    }
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Administrador => "administrador",
            Role::RecursosHumanos => "recursos_humanos",
            Role::Gerencia => "gerencia",
            Role::Usuario => "usuario",
        }
    }

    pub fn can(&self, action: Action) -> bool {
        use Action::*;

        match self {
            Role::Administrador => true,
            Role::RecursosHumanos => matches!(
                action,
                ViewWorkers | ManageWorkers | ManageBonos | ViewOwnRecord
            ),
            Role::Gerencia => matches!(
                action,
                ViewWorkers | ViewMachinery | ManageMachinery | ViewOwnRecord
            ),
            Role::Usuario => action == ViewOwnRecord,
        }
    }
}

pub fn authorize(role: Role, action: Action) -> Result<(), DomainError> {
    if role.can(action) {
        Ok(())
    } else {
        Err(DomainError::Forbidden {
            role: role.to_string(),
            action: action.as_str().to_string(),
        })
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "administrador" | "admin" => Ok(Role::Administrador),
            "recursos_humanos" | "rrhh" => Ok(Role::RecursosHumanos),
            "gerencia" => Ok(Role::Gerencia),
            "usuario" => Ok(Role::Usuario),
            other => Err(format!("rol desconocido: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_can_everything() {
        for action in [
            Action::ViewWorkers,
            Action::ManageWorkers,
            Action::ManageBonos,
            Action::ViewMachinery,
            Action::ManageMachinery,
            Action::ViewOwnRecord,
            Action::ManageUsers,
        ] {
            assert!(Role::Administrador.can(action));
        }
    }

    #[test]
    fn test_rrhh_cannot_touch_machinery() {
        assert!(Role::RecursosHumanos.can(Action::ManageWorkers));
        assert!(Role::RecursosHumanos.can(Action::ManageBonos));
        assert!(!Role::RecursosHumanos.can(Action::ViewMachinery));
        assert!(!Role::RecursosHumanos.can(Action::ManageUsers));
    }

    #[test]
    fn test_gerencia_manages_machinery_only() {
        assert!(Role::Gerencia.can(Action::ManageMachinery));
        assert!(Role::Gerencia.can(Action::ViewWorkers));
        assert!(!Role::Gerencia.can(Action::ManageWorkers));
    }

    #[test]
    fn test_usuario_sees_own_record_only() {
        assert!(Role::Usuario.can(Action::ViewOwnRecord));
        assert!(authorize(Role::Usuario, Action::ViewWorkers).is_err());
    }

    #[test]
    fn test_role_parsing() {
        assert_eq!("RRHH".parse::<Role>(), Ok(Role::RecursosHumanos));
        assert_eq!("recursos_humanos".parse::<Role>(), Ok(Role::RecursosHumanos));
        assert_eq!(" Admin ".parse::<Role>(), Ok(Role::Administrador));
        assert!("jefe".parse::<Role>().is_err());
        assert_eq!(Role::Gerencia.to_string(), "gerencia");
    }
}
