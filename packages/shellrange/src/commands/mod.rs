pub mod attach;

use anyhow::Result;
use tracing::warn;

use crate::api::{ApiClient, ApiError, LabSummary};
use attach::AttachOutcome;

/// List available labs.
pub async fn labs_command(api: &ApiClient, json: bool) -> Result<()> {
    let labs = match api.labs().await {
        Ok(labs) => labs,
        Err(ApiError::Unavailable) => {
            report_unreachable(api);
            return Ok(());
        }
        Err(err) => return Err(err.into()),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&labs)?);
    } else if labs.is_empty() {
        println!("No labs available.");
    } else {
        print!("{}", labs_table(&labs));
        println!("\n{} lab(s)", labs.len());
    }

    Ok(())
}

/// Show one lab's details and its markdown guide.
pub async fn info_command(api: &ApiClient, lab_id: u64) -> Result<()> {
    let lab = match api.lab(lab_id).await {
        Ok(lab) => lab,
        Err(ApiError::Unavailable) => {
            report_unreachable(api);
            return Ok(());
        }
        Err(err) => return Err(err.into()),
    };

    println!("{} [{}]", lab.title, lab.difficulty);
    println!("category: {}   time limit: {} min", lab.category, lab.time_limit);
    println!("\n{}", lab.description);
    if !lab.objectives.is_empty() {
        println!("\nObjectives:");
        for objective in &lab.objectives {
            println!("  - {objective}");
        }
    }
    if !lab.content.is_empty() {
        println!("\n{}", lab.content);
    }

    Ok(())
}

/// Start a lab instance, then attach to it unless told otherwise.
pub async fn start_command(api: &ApiClient, lab_id: u64, no_attach: bool) -> Result<()> {
    let instance = match api.start_lab(lab_id).await {
        Ok(instance) => instance,
        Err(ApiError::Unavailable) => {
            report_unreachable(api);
            return Ok(());
        }
        Err(err) => return Err(err.into()),
    };

    eprintln!(
        "Instance {} is {}",
        instance.instance_id, instance.status
    );

    if no_attach {
        eprintln!("Attach with `range attach {}`", instance.instance_id);
        return Ok(());
    }

    // `start` owns the instance lifecycle: when the remote shell ends, the
    // instance is released too.
    run_attach(api, instance.instance_id, true).await
}

/// Attach to an already-running instance.
pub async fn attach_command(api: &ApiClient, instance_id: u64) -> Result<()> {
    run_attach(api, instance_id, false).await
}

/// Stop a running instance.
pub async fn stop_command(api: &ApiClient, instance_id: u64) -> Result<()> {
    match api.stop_instance(instance_id).await {
        Ok(()) => {
            eprintln!("Instance {instance_id} stopped.");
            Ok(())
        }
        Err(ApiError::Unavailable) => {
            report_unreachable(api);
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}

async fn run_attach(api: &ApiClient, instance_id: u64, stop_on_exit: bool) -> Result<()> {
    match attach::attach(api, instance_id).await? {
        AttachOutcome::Detached => {
            eprintln!(
                "\r[range: detached -- instance {instance_id} keeps running, reattach with `range attach {instance_id}`]"
            );
        }
        AttachOutcome::Closed(code) => {
            if stop_on_exit {
                match api.stop_instance(instance_id).await {
                    Ok(()) => eprintln!(
                        "\r[range: session ended (code {code}), instance {instance_id} stopped]"
                    ),
                    Err(err) => {
                        warn!(%err, instance_id, "failed to stop instance after session end");
                        eprintln!(
                            "\r[range: session ended (code {code}), stop with `range stop {instance_id}`]"
                        );
                    }
                }
            } else {
                eprintln!(
                    "\r[range: session ended (code {code}), stop with `range stop {instance_id}`]"
                );
            }
        }
        AttachOutcome::Errored => {
            eprintln!(
                "\r[range: session failed, check `range labs` or restart with `range start`]"
            );
        }
    }
    Ok(())
}

fn report_unreachable(api: &ApiClient) {
    eprintln!(
        "[range: lab server unreachable at {}]",
        api.server().base_url()
    );
}

/// Pure table rendering for `range labs`.
fn labs_table(labs: &[LabSummary]) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{:<5} {:<32} {:<12} {:<16} {}\n",
        "ID", "TITLE", "DIFFICULTY", "CATEGORY", "MINUTES"
    ));
    out.push_str(&format!("{}\n", "-".repeat(78)));
    for lab in labs {
        out.push_str(&format!(
            "{:<5} {:<32} {:<12} {:<16} {}\n",
            lab.id, lab.title, lab.difficulty, lab.category, lab.estimated_minutes
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lab(id: u64, title: &str) -> LabSummary {
        LabSummary {
            id,
            title: title.to_string(),
            description: "d".to_string(),
            difficulty: "beginner".to_string(),
            category: "networking".to_string(),
            estimated_minutes: 45,
        }
    }

    #[test]
    fn labs_table_has_header_and_rows() {
        let table = labs_table(&[lab(1, "Port scanning"), lab(2, "Packet capture")]);
        let lines: Vec<&str> = table.lines().collect();
        assert!(lines[0].starts_with("ID"));
        assert!(lines[2].contains("Port scanning"));
        assert!(lines[3].contains("Packet capture"));
        assert_eq!(lines.len(), 4);
    }

    #[test]
    fn labs_table_aligns_columns() {
        let table = labs_table(&[lab(7, "x")]);
        let row = table.lines().nth(2).unwrap();
        assert!(row.starts_with("7     x"));
        assert!(row.contains("beginner"));
        assert!(row.ends_with("45"));
    }
}
