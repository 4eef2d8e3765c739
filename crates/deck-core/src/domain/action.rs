//! Action identifiers shared by hotkeys, pins, and the command router.
//!
//! An *action id* is a plain string.  It is either one of the two reserved
//! control ids below, or the id of a scene in the host's item table.  Keeping
//! it a string (rather than an enum persisted to disk) means stored hotkeys
//! and pins keep working across host restarts as long as the host preserves
//! its item ids.

use std::fmt;

/// Reserved action id for "toggle stream".
pub const CONTROL_STREAM: &str = "control_stream";

/// Reserved action id for "toggle record".
pub const CONTROL_RECORD: &str = "control_record";

/// The meaning of an action id, as resolved at dispatch time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Action {
    ToggleStream,
    ToggleRecord,
    /// Switch the host to the scene with this id.
    ShowScene(String),
}

impl Action {
    /// Classifies an action id.
    ///
    /// Anything that is not a reserved control id is treated as a scene id;
    /// whether that scene exists is decided later against the live scene list.
    pub fn from_id(id: &str) -> Self {
        match id {
            CONTROL_STREAM => Action::ToggleStream,
            CONTROL_RECORD => Action::ToggleRecord,
            other => Action::ShowScene(other.to_string()),
        }
    }

    /// The action id string for this action.
    pub fn id(&self) -> &str {
        match self {
            Action::ToggleStream => CONTROL_STREAM,
            Action::ToggleRecord => CONTROL_RECORD,
            Action::ShowScene(id) => id,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserved_ids_map_to_controls() {
        assert_eq!(Action::from_id(CONTROL_STREAM), Action::ToggleStream);
        assert_eq!(Action::from_id(CONTROL_RECORD), Action::ToggleRecord);
    }

    #[test]
    fn test_other_ids_are_scene_actions() {
        // Arrange / Act
        let action = Action::from_id("scene-42");

        // Assert
        assert_eq!(action, Action::ShowScene("scene-42".to_string()));
    }

    #[test]
    fn test_id_round_trips_through_action() {
        for id in [CONTROL_STREAM, CONTROL_RECORD, "abc"] {
            assert_eq!(Action::from_id(id).id(), id);
        }
    }

    #[test]
    fn test_display_prints_action_id() {
        assert_eq!(Action::ToggleRecord.to_string(), "control_record");
    }
}
