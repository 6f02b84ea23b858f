// Types and enums for the maze state machine
use std::collections::VecDeque;
use std::time::Duration;

/// Which fight a battle state is handling. Boss fights are followed by the
/// shop and support screens before the next route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BattleKind {
    Standard,
    Boss,
}

impl BattleKind {
    /// States visited after the relic pickup that ends this fight
    pub fn post_chain(self) -> Continuation {
        match self {
            BattleKind::Standard => Continuation::from([StateKind::RouteSelection]),
            BattleKind::Boss => Continuation::from([
                StateKind::Shop,
                StateKind::Support,
                StateKind::RouteSelection,
            ]),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateKind {
    Init,
    Prepare,
    RouteSelection,
    RouteConfirmation { battle: BattleKind },
    Battle(BattleKind),
    RelicSelection,
    Shop,
    Support,
}

impl StateKind {
    pub fn name(&self) -> &'static str {
        match self {
            StateKind::Init => "Init",
            StateKind::Prepare => "Prepare",
            StateKind::RouteSelection => "RouteSelection",
            StateKind::RouteConfirmation { .. } => "RouteConfirmation",
            StateKind::Battle(BattleKind::Standard) => "Battle",
            StateKind::Battle(BattleKind::Boss) => "BossBattle",
            StateKind::RelicSelection => "RelicSelection",
            StateKind::Shop => "Shop",
            StateKind::Support => "Support",
        }
    }

    /// Watchdog limit for one visit to this state
    pub fn timeout(&self) -> Duration {
        let secs = match self {
            StateKind::Init | StateKind::Prepare => 15,
            StateKind::RouteSelection => 20,
            StateKind::RouteConfirmation { .. } => 10,
            StateKind::Battle(_) => 45,
            StateKind::RelicSelection => 15,
            StateKind::Shop | StateKind::Support => 10,
        };
        Duration::from_secs(secs)
    }
}

impl std::fmt::Display for StateKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Ordered successors a state hands control to when it finishes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Continuation(VecDeque<StateKind>);

impl Continuation {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Pop the head; the rest becomes its continuation. An exhausted chain
    /// falls back to route selection.
    pub fn next(mut self) -> StateSpec {
        let kind = self.0.pop_front().unwrap_or(StateKind::RouteSelection);
        StateSpec { kind, after: self }
    }
}

impl<const N: usize> From<[StateKind; N]> for Continuation {
    fn from(kinds: [StateKind; N]) -> Self {
        Self(VecDeque::from(kinds))
    }
}

/// What a step returns to move the machine: the next kind and what follows it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateSpec {
    pub kind: StateKind,
    pub after: Continuation,
}

impl StateSpec {
    pub fn to(kind: StateKind) -> Self {
        Self {
            kind,
            after: Continuation::empty(),
        }
    }

    pub fn with_after(kind: StateKind, after: Continuation) -> Self {
        Self { kind, after }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AutomationEvent {
    Log(String),
    StateChanged(StateKind),
    Error(String),
    Stopped,
}
