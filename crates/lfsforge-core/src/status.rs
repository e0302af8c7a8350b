use serde::{Deserialize, Serialize};
use std::fmt;

/// Terminal/in-flight status recorded for a package. Also doubles as the Scheduler's ready-set bookkeeping value
/// (`blocked` is engine-internal and never persisted).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Ok,
    Failed,
    Skipped,
    InProgress,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Status::Ok => "ok",
            Status::Failed => "failed",
            Status::Skipped => "skipped",
            Status::InProgress => "in_progress",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_yaml() {
        for s in [Status::Ok, Status::Failed, Status::Skipped, Status::InProgress] {
            let yaml = serde_yaml::to_string(&s).unwrap();
            let back: Status = serde_yaml::from_str(&yaml).unwrap();
            assert_eq!(s, back);
        }
    }
}
