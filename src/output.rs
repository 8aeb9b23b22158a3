use std::fmt::Write;

use crate::models::ConnectorType;
use crate::state::{ReplicationReport, SimulationReport, StateVectorRow, Summary};

pub trait Formatter {
    fn write(&self, report: &SimulationReport) -> String;
}

pub struct HumanFormatter;
pub struct SummaryFormatter;
pub struct JsonFormatter;
pub struct CsvFormatter;

impl Formatter for HumanFormatter {
    fn write(&self, report: &SimulationReport) -> String {
        let mut output = String::new();
        write_metadata(&mut output, report);
        if let Some(row) = report.last_row() {
            output.push_str("Last row:\n");
            for (key, value) in row_columns(row) {
                let _ = writeln!(output, "{}: {}", key, value);
            }
        }
        write_summary(&mut output, &report.summary);
        output
    }
}

impl Formatter for SummaryFormatter {
    fn write(&self, report: &SimulationReport) -> String {
        let mut output = String::new();
        write_metadata(&mut output, report);
        write_summary(&mut output, &report.summary);
        output
    }
}

impl Formatter for JsonFormatter {
    fn write(&self, report: &SimulationReport) -> String {
        match serde_json::to_string_pretty(report) {
            Ok(json) => format!("{}\n", json),
            Err(err) => format!("{{\"error\":\"{}\"}}\n", err),
        }
    }
}

/// One line per row; the header is taken from the first row's columns.
impl Formatter for CsvFormatter {
    fn write(&self, report: &SimulationReport) -> String {
        let mut output = String::new();
        let Some(first) = report.rows.first() else {
            return output;
        };
        let header = row_columns(first)
            .into_iter()
            .map(|(key, _)| key)
            .collect::<Vec<_>>();
        let _ = writeln!(output, "{}", header.join(","));
        for row in &report.rows {
            let values = row_columns(row)
                .into_iter()
                .map(|(_, value)| value)
                .collect::<Vec<_>>();
            let _ = writeln!(output, "{}", values.join(","));
        }
        output
    }
}

pub fn write_replications(report: &ReplicationReport) -> String {
    let mut output = String::from("Replications:\n");
    for (seed, summary) in &report.runs {
        let _ = writeln!(output, "seed {}: {}", seed, summary_line(summary));
    }
    let _ = writeln!(output, "Mean: {}", summary_line(&report.mean));
    output
}

/// Flattens a row into ordered `(column, value)` pairs. Every row of a run
/// yields the same keys in the same order.
pub fn row_columns(row: &StateVectorRow) -> Vec<(String, String)> {
    let mut columns = vec![
        ("iteration".to_string(), row.iteration.to_string()),
        ("clock".to_string(), fixed(row.clock)),
        ("event".to_string(), row.event.to_string()),
        (
            "post".to_string(),
            optional(row.post.map(|post| post + 1), |post| post.to_string()),
        ),
        ("connector_rnd".to_string(), optional(row.connector_rnd, fixed)),
        (
            "connector".to_string(),
            optional(row.connector, |connector| connector.to_string()),
        ),
        ("interarrival_rnd".to_string(), optional(row.interarrival_rnd, fixed)),
        ("interarrival".to_string(), optional(row.interarrival, fixed)),
        ("next_arrival".to_string(), optional(row.next_arrival, fixed)),
        ("charge_rnd".to_string(), optional(row.charge_rnd, fixed)),
        ("charge_minutes".to_string(), optional(row.charge_minutes, fixed)),
        ("validation_end".to_string(), optional(row.validation_end, fixed)),
        ("charge_end".to_string(), optional(row.charge_end, fixed)),
        ("occupied_posts".to_string(), row.occupied_posts.to_string()),
        ("occupancy_pct".to_string(), money(row.occupancy_pct)),
    ];

    for (idx, post) in row.posts.iter().enumerate() {
        let state = if post.occupied { "occupied" } else { "idle" };
        columns.push((format!("post_{}_state", idx + 1), state.to_string()));
        columns.push((
            format!("post_{}_charge_end", idx + 1),
            optional(post.charge_end, fixed),
        ));
    }

    columns.push(("accepted".to_string(), row.accepted.to_string()));
    columns.push(("rejected".to_string(), row.rejected.to_string()));
    for connector in ConnectorType::ALL {
        columns.push((
            format!("charge_minutes_{}", connector.column_key()),
            fixed(*row.charge_minutes_by_type.get(connector)),
        ));
    }
    for connector in ConnectorType::ALL {
        columns.push((
            format!("revenue_{}", connector.column_key()),
            money(*row.revenue_by_type.get(connector)),
        ));
    }
    columns.push(("revenue".to_string(), money(row.revenue)));
    columns.push(("utilization_pct".to_string(), money(row.utilization_pct)));
    columns
}

fn write_metadata(output: &mut String, report: &SimulationReport) {
    let metadata = &report.metadata;
    output.push_str("Metadata:\n");
    let _ = writeln!(output, "seed: {}", metadata.seed);
    let _ = writeln!(output, "servers: {}", metadata.n_servers);
    let _ = writeln!(output, "events: {}", metadata.events);
    let _ = writeln!(output, "stop_reason: {}", metadata.stop_reason);
    let _ = writeln!(output, "final_clock: {}", fixed(metadata.final_clock));
}

fn write_summary(output: &mut String, summary: &Summary) {
    output.push_str("Summary:\n");
    let _ = writeln!(output, "n_aceptadas: {}", summary.accepted);
    let _ = writeln!(output, "n_rechazadas: {}", summary.rejected);
    let _ = writeln!(output, "recaudacion_total: {}", money(summary.total_revenue));
    let _ = writeln!(
        output,
        "utilizacion_promedio: {}",
        money(summary.mean_utilization_pct)
    );
}

fn summary_line(summary: &Summary) -> String {
    format!(
        "{} accepted, {} rejected, revenue {}, utilization {}%",
        summary.accepted,
        summary.rejected,
        money(summary.total_revenue),
        money(summary.mean_utilization_pct)
    )
}

fn fixed(value: f64) -> String {
    format!("{:.4}", value)
}

fn money(value: f64) -> String {
    format!("{:.2}", value)
}

fn optional<T>(value: Option<T>, render: impl Fn(T) -> String) -> String {
    value.map(render).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;
    use crate::models::{ByConnector, StopReason};
    use crate::pool::PostSnapshot;
    use crate::state::RunMetadata;

    fn row(iteration: u64, clock: f64) -> StateVectorRow {
        StateVectorRow {
            iteration,
            clock,
            event: EventKind::Arrival,
            post: Some(0),
            connector_rnd: Some(0.12345),
            connector: Some(ConnectorType::UsbC),
            interarrival_rnd: Some(0.5),
            interarrival: Some(9.0109),
            next_arrival: Some(clock + 9.0109),
            charge_rnd: Some(0.3),
            charge_minutes: Some(60.0),
            validation_end: Some(clock + 2.0),
            charge_end: None,
            occupied_posts: 1,
            occupancy_pct: 50.0,
            posts: vec![
                PostSnapshot {
                    occupied: true,
                    client: Some(1),
                    charge_end: None,
                },
                PostSnapshot {
                    occupied: false,
                    client: None,
                    charge_end: None,
                },
            ],
            accepted: 1,
            rejected: 0,
            charge_minutes_by_type: ByConnector::default(),
            revenue_by_type: ByConnector::default(),
            revenue: 0.0,
            utilization_pct: 0.0,
        }
    }

    fn report() -> SimulationReport {
        SimulationReport {
            metadata: RunMetadata {
                seed: 7,
                n_servers: 2,
                events: 2,
                arrivals: 2,
                clients_in_system: 1,
                final_clock: 20.0,
                stop_reason: StopReason::TimeLimit,
            },
            summary: Summary {
                accepted: 1,
                rejected: 0,
                total_revenue: 300.0,
                mean_utilization_pct: 12.5,
            },
            rows: vec![row(1, 10.0), row(2, 20.0)],
        }
    }

    #[test]
    fn row_columns_render_empty_cells_for_missing_values() {
        let columns = row_columns(&row(1, 10.0));
        let lookup = |key: &str| {
            columns
                .iter()
                .find(|(column, _)| column == key)
                .map(|(_, value)| value.clone())
        };
        assert_eq!(lookup("post"), Some("1".to_string()));
        assert_eq!(lookup("connector"), Some("USB-C".to_string()));
        assert_eq!(lookup("connector_rnd"), Some("0.1235".to_string()));
        assert_eq!(lookup("charge_end"), Some(String::new()));
        assert_eq!(lookup("post_2_state"), Some("idle".to_string()));
        assert_eq!(lookup("revenue_microusb"), Some("0.00".to_string()));
    }

    #[test]
    fn csv_header_matches_every_row_width() {
        let csv = CsvFormatter.write(&report());
        let lines = csv.lines().collect::<Vec<_>>();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("iteration,clock,event,post,"));
        let width = lines[0].split(',').count();
        assert!(lines.iter().all(|line| line.split(',').count() == width));
    }

    #[test]
    fn summary_format_is_stable() {
        let expected = concat!(
            "Metadata:\n",
            "seed: 7\n",
            "servers: 2\n",
            "events: 2\n",
            "stop_reason: time-limit\n",
            "final_clock: 20.0000\n",
            "Summary:\n",
            "n_aceptadas: 1\n",
            "n_rechazadas: 0\n",
            "recaudacion_total: 300.00\n",
            "utilizacion_promedio: 12.50\n",
        );
        assert_eq!(SummaryFormatter.write(&report()), expected);
    }

    #[test]
    fn human_format_shows_the_last_row() {
        let output = HumanFormatter.write(&report());
        assert!(output.contains("Last row:\niteration: 2\nclock: 20.0000\n"));
        assert!(output.ends_with("utilizacion_promedio: 12.50\n"));
    }

    #[test]
    fn json_format_uses_collaborator_summary_names() {
        let output = JsonFormatter.write(&report());
        let value: serde_json::Value = serde_json::from_str(&output).expect("valid json");
        assert_eq!(value["summary"]["n_aceptadas"], 1);
        assert_eq!(value["rows"].as_array().map(Vec::len), Some(2));
        assert_eq!(value["metadata"]["stop_reason"], "time-limit");
    }

    #[test]
    fn replication_output_lists_each_seed_and_the_mean() {
        let summary = report().summary;
        let output = write_replications(&ReplicationReport::from_runs(vec![
            (1, summary.clone()),
            (2, summary),
        ]));
        assert_eq!(
            output,
            concat!(
                "Replications:\n",
                "seed 1: 1 accepted, 0 rejected, revenue 300.00, utilization 12.50%\n",
                "seed 2: 1 accepted, 0 rejected, revenue 300.00, utilization 12.50%\n",
                "Mean: 1 accepted, 0 rejected, revenue 300.00, utilization 12.50%\n",
            )
        );
    }
}
