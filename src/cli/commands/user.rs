use clap::Subcommand;
use serde_json::json;
use sqlx::PgPool;

use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::database::models::{Role, User};
use crate::database::Repository;

#[derive(Subcommand)]
pub enum UserCommands {
    #[command(about = "Grant the admin role")]
    Promote {
        #[arg(help = "Account email")]
        email: String,
    },

    #[command(about = "Revoke the admin role")]
    Demote {
        #[arg(help = "Account email")]
        email: String,
    },
}

pub async fn handle(cmd: UserCommands, pool: &PgPool, output_format: OutputFormat) -> anyhow::Result<()> {
    let users: Repository<User> = Repository::new(pool.clone());

    let (email, role) = match cmd {
        UserCommands::Promote { email } => (email, Role::Admin),
        UserCommands::Demote { email } => (email, Role::User),
    };

    let user = users.set_role_by_email(&email, role).await?;
    tracing::info!("Set role of {} to {}", user.email, user.role);
    output_success(
        output_format,
        &format!("{} is now {}", user.email, user.role),
        Some(json!({ "user": user })),
    )
}
