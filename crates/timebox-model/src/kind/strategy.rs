use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::ModelError;

/// How the deadline enforcer interrupts a workload that outlives its deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum Strategy {
    /// A one-shot interrupt is delivered to the running call at the deadline.
    ///
    /// The call only stops once the workload reaches one of its interruption points,
    /// so there is no upper bound on how long an abort takes.
    Cooperative,
    /// The workload runs on an isolated thread that is abandoned at the deadline.
    #[default]
    Preemptive,
}

impl Strategy {
    /// Returns `true` for the signal-style strategy.
    ///
    /// Kept under this name because callers polling for results read it as `use_signals`.
    #[inline]
    pub fn uses_signals(&self) -> bool {
        matches!(self, Strategy::Cooperative)
    }

    /// Picks the strategy from a `use_signals` style flag.
    #[inline]
    pub fn from_signals(use_signals: bool) -> Self {
        if use_signals {
            Strategy::Cooperative
        } else {
            Strategy::Preemptive
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Cooperative => "cooperative",
            Strategy::Preemptive => "preemptive",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let norm = s.trim().to_ascii_lowercase();
        match norm.as_str() {
            "cooperative" | "signals" => Ok(Strategy::Cooperative),
            "preemptive" | "thread" => Ok(Strategy::Preemptive),
            _ => Err(ModelError::UnknownStrategy(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signals_flag_maps_to_strategy() {
        assert_eq!(Strategy::from_signals(true), Strategy::Cooperative);
        assert_eq!(Strategy::from_signals(false), Strategy::Preemptive);
        assert!(Strategy::Cooperative.uses_signals());
        assert!(!Strategy::Preemptive.uses_signals());
    }

    #[test]
    fn parse_accepts_aliases() {
        assert_eq!(" Cooperative ".parse::<Strategy>().unwrap(), Strategy::Cooperative);
        assert_eq!("thread".parse::<Strategy>().unwrap(), Strategy::Preemptive);
        assert!(matches!(
            "bogus".parse::<Strategy>(),
            Err(ModelError::UnknownStrategy(_))
        ));
    }
}
