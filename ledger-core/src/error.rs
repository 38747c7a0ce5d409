//! Rule violations reported by the rules engine

use crate::hex::Hex;
use crate::units::UnitId;

/// Why an action was refused. `Display` gives the human-readable reason.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum RuleViolation {
    #[error("unknown unit {0}")]
    UnknownUnit(UnitId),

    #[error("unit {0} is destroyed")]
    DeadUnit(UnitId),

    #[error("unit {0} does not belong to the active player")]
    NotActivePlayer(UnitId),

    #[error("unit {0} has no position")]
    NoPosition(UnitId),

    #[error("unknown weapon index {0}")]
    UnknownWeapon(usize),

    #[error("invalid target {0}")]
    InvalidTarget(UnitId),

    #[error("major action not available")]
    MajorUnavailable,

    #[error("minor action not available")]
    MinorUnavailable,

    #[error("overwatch requires both major and minor actions")]
    OverwatchUnavailable,

    #[error("invalid path")]
    InvalidPath,

    #[error("path exceeds movement allowance ({cost} > {allowance})")]
    PathTooLong { cost: i32, allowance: i32 },

    #[error("position {0} out of bounds")]
    OutOfBounds(Hex),

    #[error("position {0} is blocked")]
    Blocked(Hex),

    #[error("insufficient movement")]
    InsufficientMovement,

    #[error("unit has already moved")]
    AlreadyMoved,

    #[error("cannot use minor move with movement 1")]
    CannotMinorMove,

    #[error("minor move is limited to 1 tile")]
    MinorMoveTooFar,

    #[error("no building at {0}")]
    NoBuilding(Hex),

    #[error("unit has already shot this turn")]
    AlreadyShot,

    #[error("weapon {0} already fired this turn")]
    AlreadyFired(String),

    #[error("target out of range")]
    OutOfRange,

    #[error("no line of sight")]
    NoLineOfSight,

    #[error("target not in frontal arc")]
    NotInFrontalArc,

    #[error("salvo needs at least one shot")]
    EmptySalvo,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        assert!(RuleViolation::CannotMinorMove
            .to_string()
            .contains("cannot use minor move"));
        assert!(RuleViolation::AlreadyFired("Rifle".into())
            .to_string()
            .contains("already fired"));
        assert_eq!(
            RuleViolation::OutOfBounds(Hex::new(9, 0)).to_string(),
            "position (9, 0) out of bounds"
        );
    }
}
