// Arbiter module - composes several links behind the one Link contract

mod failover;
mod fanout;

pub use failover::FailoverArbiter;
pub use fanout::FanOutArbiter;

/// Failover selector: which constituent link currently carries traffic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActiveLink {
    #[default]
    None,
    /// Index into the arbiter's priority-ordered link list
    Link(usize),
}

impl ActiveLink {
    pub fn index(&self) -> Option<usize> {
        match self {
            Self::None => None,
            Self::Link(i) => Some(*i),
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}
