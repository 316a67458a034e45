use std::path::PathBuf;

use clap::{Parser, Subcommand};

use super::app_config::LogLevel;
use crate::domain::entities::{AuditAction, ItemCondition};
use crate::infrastructure::storage::TokenStoreKind;

#[derive(Debug, Parser)]
#[command(
    name = "stockdesk",
    version,
    about = "Command-line client for the stock management API",
    long_about = None
)]
pub struct CliArgs {
    /// Configuration file path.
    #[arg(short, long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Log file path.
    #[arg(long, value_name = "PATH", global = true)]
    pub log_path: Option<PathBuf>,

    /// Log verbosity level.
    #[arg(long, value_enum, env = "STOCKDESK_LOG_LEVEL", global = true)]
    pub log_level: Option<LogLevel>,

    /// REST API base URI.
    #[arg(long, value_name = "URL", env = "STOCKDESK_API_URL", global = true)]
    pub api_url: Option<String>,

    /// Realtime push base URI.
    #[arg(long, value_name = "URL", env = "STOCKDESK_WS_URL", global = true)]
    pub ws_url: Option<String>,

    /// Per-request timeout in milliseconds.
    #[arg(long, env = "STOCKDESK_REQUEST_TIMEOUT_MS", global = true)]
    pub request_timeout_ms: Option<u64>,

    /// Reconnects attempted after the realtime connection drops.
    #[arg(long, env = "STOCKDESK_RECONNECT_ATTEMPTS", global = true)]
    pub reconnect_attempts: Option<u32>,

    /// Delay between reconnects in milliseconds.
    #[arg(long, env = "STOCKDESK_RECONNECT_INTERVAL_MS", global = true)]
    pub reconnect_interval_ms: Option<u64>,

    /// Token persistence backend.
    #[arg(long, value_enum, env = "STOCKDESK_TOKEN_STORE", global = true)]
    pub token_store: Option<TokenStoreKind>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Sign in and persist the session tokens.
    Login {
        #[arg(short, long)]
        username: String,
        /// Password; read from the environment when omitted.
        #[arg(short, long, env = "STOCKDESK_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Forget the stored session.
    Logout,
    /// Show the signed-in user.
    Whoami,
    /// List stock items.
    Stock {
        #[arg(long)]
        department: Option<u64>,
    },
    /// List equipment assigned to you.
    Equipment,
    /// List departments.
    Departments,
    /// List users available for assignment.
    Users,
    /// Browse the audit log.
    Audit {
        #[arg(long)]
        item: Option<u64>,
        #[arg(long)]
        user: Option<u64>,
        #[arg(long)]
        department: Option<u64>,
        #[arg(long, value_parser = parse_action)]
        action: Option<AuditAction>,
        #[arg(long)]
        page: Option<u32>,
        #[arg(long)]
        per_page: Option<u32>,
    },
    /// Assign a stock item to a user.
    Assign {
        #[arg(long)]
        item: u64,
        #[arg(long)]
        user: u64,
        #[arg(long)]
        reason: Option<String>,
    },
    /// Return an assigned item.
    Return {
        #[arg(long)]
        item: u64,
        #[arg(long)]
        reason: String,
        #[arg(long, value_parser = parse_condition, default_value = "good")]
        condition: ItemCondition,
    },
    /// Report an item as faulty.
    Faulty {
        #[arg(long)]
        item: u64,
        #[arg(long)]
        reason: String,
    },
    /// Delete a stock item.
    Delete {
        #[arg(long)]
        item: u64,
    },
    /// Follow realtime updates until interrupted.
    Watch,
}

fn parse_action(value: &str) -> Result<AuditAction, String> {
    value.parse()
}

fn parse_condition(value: &str) -> Result<ItemCondition, String> {
    value.parse().map_err(|e: crate::domain::errors::ValidationError| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_audit_filters() {
        let args = CliArgs::parse_from([
            "stockdesk",
            "audit",
            "--action",
            "mark_faulty",
            "--per-page",
            "20",
        ]);

        match args.command {
            Command::Audit {
                action, per_page, ..
            } => {
                assert_eq!(action, Some(AuditAction::MarkFaulty));
                assert_eq!(per_page, Some(20));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_return_condition_defaults_to_good() {
        let args =
            CliArgs::parse_from(["stockdesk", "return", "--item", "2", "--reason", "Departure"]);

        assert!(matches!(
            args.command,
            Command::Return {
                condition: ItemCondition::Good,
                ..
            }
        ));
    }

    #[test]
    fn test_unknown_action_rejected() {
        let result = CliArgs::try_parse_from(["stockdesk", "audit", "--action", "explode"]);
        assert!(result.is_err());
    }
}
