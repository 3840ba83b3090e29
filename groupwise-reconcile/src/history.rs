//! Undo stack for edit state

/// Linear edit history; the initial state can never be undone
#[derive(Debug, Clone)]
pub struct EditHistory<T> {
    states: Vec<T>,
}

impl<T: Clone> EditHistory<T> {
    pub fn new(initial_state: T) -> Self {
        Self {
            states: vec![initial_state],
        }
    }

    /// The most recently saved state
    pub fn desired_state(&self) -> &T {
        // states is never empty: `undo` keeps the initial state
        &self.states[self.states.len() - 1]
    }

    pub fn save(&mut self, state: T) {
        self.states.push(state);
    }

    /// Drop the latest state. Returns false when only the initial state is left.
    pub fn undo(&mut self) -> bool {
        if self.can_undo() {
            self.states.pop();
            true
        } else {
            false
        }
    }

    pub fn can_undo(&self) -> bool {
        self.states.len() > 1
    }

    /// Number of saved states on top of the initial one
    pub fn depth(&self) -> usize {
        self.states.len() - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_undo_returns_to_previous_state() {
        let mut history = EditHistory::new(0);
        history.save(1);
        history.save(2);
        assert_eq!(*history.desired_state(), 2);
        assert_eq!(history.depth(), 2);

        assert!(history.undo());
        assert_eq!(*history.desired_state(), 1);
    }

    #[test]
    fn test_undo_stops_at_initial_state() {
        let mut history = EditHistory::new("initial");
        assert!(!history.can_undo());
        assert!(!history.undo());
        assert_eq!(*history.desired_state(), "initial");
    }
}
