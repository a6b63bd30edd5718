//! Build stages

use serde::{Deserialize, Serialize};
use std::fmt;

/// The states a build moves through, in order.
///
/// `Init -> Enumerated -> Packed -> Encoded -> Written -> Done`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Init,
    Enumerated,
    Packed,
    Encoded,
    Written,
    Done,
}

impl Stage {
    /// The stage that follows this one, or `None` once the build is done
    pub fn next(self) -> Option<Stage> {
        match self {
            Stage::Init => Some(Stage::Enumerated),
            Stage::Enumerated => Some(Stage::Packed),
            Stage::Packed => Some(Stage::Encoded),
            Stage::Encoded => Some(Stage::Written),
            Stage::Written => Some(Stage::Done),
            Stage::Done => None,
        }
    }

    /// Name of the step that leaves this stage
    pub fn next_step(self) -> &'static str {
        match self {
            Stage::Init => "enumerate",
            Stage::Enumerated => "pack",
            Stage::Packed => "encode",
            Stage::Encoded => "write",
            Stage::Written => "finish",
            Stage::Done => "none",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Init => write!(f, "init"),
            Stage::Enumerated => write!(f, "enumerated"),
            Stage::Packed => write!(f, "packed"),
            Stage::Encoded => write!(f, "encoded"),
            Stage::Written => write!(f, "written"),
            Stage::Done => write!(f, "done"),
        }
    }
}
