use anyhow::Context;
use clap::Subcommand;
use serde_json::json;
use sqlx::PgPool;
use std::path::PathBuf;

use crate::cli::utils::{output_collection, output_success};
use crate::cli::OutputFormat;
use crate::database::models::{NewPlan, Plan};
use crate::database::Repository;

#[derive(Subcommand)]
pub enum PlanCommands {
    #[command(about = "Create or update plans from a YAML file (matched by name)")]
    Import {
        #[arg(help = "YAML file holding a list of plans")]
        file: PathBuf,
    },

    #[command(about = "List all plans, including inactive ones")]
    List,
}

/// Parse a YAML list of plans
pub fn parse_plans(source: &str) -> anyhow::Result<Vec<NewPlan>> {
    let plans: Vec<NewPlan> = serde_yaml::from_str(source).context("invalid plan file")?;
    for (index, plan) in plans.iter().enumerate() {
        if let Err(reason) = plan.validate() {
            anyhow::bail!("plan #{} '{}': {}", index + 1, plan.name.trim(), reason);
        }
    }
    Ok(plans)
}

pub async fn handle(cmd: PlanCommands, pool: &PgPool, output_format: OutputFormat) -> anyhow::Result<()> {
    let plans: Repository<Plan> = Repository::new(pool.clone());

    match cmd {
        PlanCommands::Import { file } => {
            let source = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let mut imported = Vec::new();
            for plan in parse_plans(&source)? {
                imported.push(plans.upsert_by_name(plan).await?);
            }
            output_success(
                output_format,
                &format!("Imported {} plan(s) from {}", imported.len(), file.display()),
                Some(json!({ "plans": imported })),
            )
        }
        PlanCommands::List => {
            let all = plans.select_all().await?;
            let lines = all
                .iter()
                .map(|p| {
                    format!(
                        "{}  {:<20} {:>10} {:<10} groups={:<3} {}",
                        p.id,
                        p.name,
                        p.price,
                        p.cycle,
                        p.max_groups,
                        if p.active { "active" } else { "inactive" }
                    )
                })
                .collect::<Vec<_>>();
            output_collection(output_format, "plans", &all, &lines, "No plans defined")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn parses_plan_file_with_defaults() {
        let plans = parse_plans(
            r#"
- name: Basic
  price: 19.90
- name: Pro
  description: Up to five groups
  price: 49.90
  max_groups: 5
  cycle: yearly
"#,
        )
        .unwrap();
        assert_eq!(plans.len(), 2);
        assert_eq!(plans[0].max_groups, 1);
        assert_eq!(plans[0].cycle, "MONTHLY");
        assert_eq!(plans[0].price, Decimal::new(1990, 2));
        assert_eq!(plans[1].cycle, "yearly");
        assert_eq!(plans[1].max_groups, 5);
    }

    #[test]
    fn rejects_plans_without_groups() {
        let err = parse_plans("- name: Empty\n  price: 1\n  max_groups: 0\n").unwrap_err();
        assert!(err.to_string().contains("Empty"));
    }

    #[test]
    fn rejects_free_plans() {
        let err = parse_plans("- name: Free\n  price: 0\n").unwrap_err();
        assert!(err.to_string().contains("price must be greater than zero"));
    }

    #[test]
    fn rejects_unknown_cycles() {
        let err = parse_plans("- name: Daily\n  price: 5\n  cycle: daily\n").unwrap_err();
        assert!(err.to_string().contains("cycle must be one of"));
        assert!(err.to_string().contains("Daily"));
    }

    #[test]
    fn rejects_nameless_plans() {
        let err = parse_plans("- name: '  '\n  price: 5\n").unwrap_err();
        assert!(err.to_string().contains("name is required"));
    }
}
