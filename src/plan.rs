use crate::route::RouteKey;
use crate::scheduler::{DecisionKind, TickReport};
use crate::track::TrainId;
use serde_json::json;
use std::collections::BTreeMap;
use std::path::Path;

/// One committed assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchStep {
    pub tick: usize,
    pub train: TrainId,
    pub route: RouteKey,
    pub kind: DecisionKind,
}

#[derive(Debug, Default)]
pub struct DispatchLog {
    pub steps: Vec<DispatchStep>,
    pub stopped_at: Option<usize>,
}

impl DispatchLog {
    pub fn record(&mut self, tick: usize, report: &TickReport) {
        if let Some((train, route, kind)) = report.assigned {
            self.steps.push(DispatchStep {
                tick,
                train,
                route,
                kind,
            });
        }
        if report.stopped && self.stopped_at.is_none() {
            self.stopped_at = Some(tick);
        }
    }
}

pub fn write_log_json(filename: &Path, log: &DispatchLog) -> std::io::Result<()> {
    std::fs::write(filename, serde_json::to_string_pretty(&log_json(log))?)?;
    Ok(())
}

fn log_json(log: &DispatchLog) -> serde_json::Value {
    let steps = log
        .steps
        .iter()
        .map(|s| {
            json!({
                "tick": s.tick,
                "train": s.train,
                "route": s.route.to_string(),
                "kind": s.kind,
            })
        })
        .collect::<Vec<_>>();
    json!({ "steps": steps, "stopped_at": log.stopped_at })
}

/// Returns a per-train summary and the command list in tick order.
pub fn print_log(log: &DispatchLog) -> (String, String) {
    let mut per_train: BTreeMap<TrainId, Vec<&DispatchStep>> = BTreeMap::new();
    for step in log.steps.iter() {
        per_train.entry(step.train).or_default().push(step);
    }

    let mut summary = String::new();
    for (train, steps) in per_train.iter() {
        summary.push_str(&format!("t{:<3}", train));
        summary.push_str(
            &steps
                .iter()
                .map(|s| {
                    let mark = match s.kind {
                        DecisionKind::Extension => '*',
                        DecisionKind::Continuation => '+',
                    };
                    format!("{}{}@{}", mark, s.route, s.tick)
                })
                .collect::<Vec<_>>()
                .join(" "),
        );
        summary.push('\n');
    }
    if let Some(tick) = log.stopped_at {
        summary.push_str(&format!("stopped at tick {}\n", tick));
    }

    let commands = log
        .steps
        .iter()
        .map(|s| format!("{:>5} t{} r{}", s.tick, s.train, s.route))
        .collect::<Vec<_>>()
        .join("\n");
    (summary, commands)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::track::Direction;

    fn report(train: TrainId, record: u16, kind: DecisionKind) -> TickReport {
        TickReport {
            assigned: Some((train, RouteKey { group: Direction::East, record }, kind)),
            ..Default::default()
        }
    }

    fn log() -> DispatchLog {
        let mut log = DispatchLog::default();
        log.record(0, &report(2, 1, DecisionKind::Extension));
        log.record(1, &TickReport::default());
        log.record(3, &report(1, 4, DecisionKind::Extension));
        log.record(5, &report(2, 7, DecisionKind::Continuation));
        log.record(9, &TickReport { stopped: true, ..Default::default() });
        log.record(10, &TickReport { stopped: true, ..Default::default() });
        log
    }

    #[test]
    fn summary_and_commands() {
        let log = log();
        assert_eq!(log.steps.len(), 3);
        assert_eq!(log.stopped_at, Some(9));

        let (summary, commands) = print_log(&log);
        assert_eq!(summary, "t1  *E4@3\nt2  *E1@0 +E7@5\nstopped at tick 9\n");
        assert_eq!(commands, "    0 t2 rE1\n    3 t1 rE4\n    5 t2 rE7");
    }

    #[test]
    fn json_export() {
        let value = log_json(&log());
        assert_eq!(value["steps"][2]["route"], "E7");
        assert_eq!(value["steps"][2]["kind"], "continuation");
        assert_eq!(value["stopped_at"], 9);
    }
}
