//! Command-line front end over the application services.

use std::sync::Arc;

use color_eyre::eyre::{Report, Result, eyre};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use crate::application::services::{
    AuthSession, CacheInvalidationBridge, QueryCache, RequestGateway, SessionEvent, StockService,
};
use crate::domain::entities::{
    AssignStockRequest, AuditLogsFilters, MarkFaultyRequest, MutationResult, ReturnItemRequest,
    StockStatus, User,
};
use crate::domain::errors::{ApiError, AuthError};
use crate::domain::ports::RealtimeEvent;
use crate::infrastructure::config::Command;
use crate::infrastructure::realtime::RealtimeChannel;
use crate::infrastructure::storage::ProfileStore;

const LOGIN_HINT: &str = "Run `stockdesk login -u <username>` to sign in again.";

/// Services shared by every command.
pub struct AppContext {
    pub session: Arc<AuthSession>,
    pub gateway: Arc<RequestGateway>,
    pub cache: Arc<QueryCache>,
    pub stock: StockService,
    pub realtime: RealtimeChannel,
    pub profile: ProfileStore,
}

/// Runs one command to completion.
///
/// # Errors
/// Returns a user-facing report when the command fails.
pub async fn run(command: Command, ctx: &AppContext) -> Result<()> {
    match command {
        Command::Login { username, password } => {
            let user = ctx
                .session
                .login(&username, &password)
                .await
                .map_err(|e| auth_report(&e))?;
            ctx.profile.save(&user);
            println!("Logged in as {} ({})", user.display_name(), user.roles.join(", "));
        }
        Command::Logout => {
            ctx.session.logout().await;
            ctx.profile.clear();
            println!("Logged out.");
        }
        Command::Whoami => {
            let user = resolve_user(ctx).await?;
            print_user(&user);
        }
        Command::Stock { department } => {
            let items = ctx.stock.stock(department).await.map_err(api_report)?;
            if items.is_empty() {
                println!("No stock items.");
            }
            for item in items {
                let par = if item.below_par { " below par" } else { "" };
                println!(
                    "{:>6}  {:<32} {:>4}/{:<4} {:<9} {}{par}",
                    item.id,
                    item.name,
                    item.quantity,
                    item.par_level,
                    status_label(item.status),
                    item.assigned_to.as_deref().unwrap_or("-"),
                );
            }
        }
        Command::Equipment => {
            let items = ctx.stock.my_equipment().await.map_err(api_report)?;
            if items.is_empty() {
                println!("No equipment assigned to you.");
            }
            for item in items {
                let faulty = if item.is_faulty { "  [faulty]" } else { "" };
                println!(
                    "{:>6}  {:<32} {:<20} since {}{faulty}",
                    item.id,
                    item.name,
                    item.department,
                    item.assigned_at.format("%Y-%m-%d"),
                );
            }
        }
        Command::Departments => {
            for department in ctx.stock.departments().await.map_err(api_report)? {
                println!("{:>6}  {}", department.id, department.name);
            }
        }
        Command::Users => {
            for user in ctx.stock.users().await.map_err(api_report)? {
                println!(
                    "{:>6}  {:<20} {:<28} {}",
                    user.id,
                    user.username,
                    user.full_name.as_deref().unwrap_or("-"),
                    user.department_name.as_deref().unwrap_or("-"),
                );
            }
        }
        Command::Audit {
            item,
            user,
            department,
            action,
            page,
            per_page,
        } => {
            let filters = AuditLogsFilters {
                item_id: item,
                user_id: user,
                department_id: department,
                action,
                page,
                per_page,
            };
            let response = ctx.stock.audit_logs(&filters).await.map_err(api_report)?;

            for log in &response.logs {
                println!(
                    "{}  {:<16} {:<28} by {}{}",
                    log.timestamp.format("%Y-%m-%d %H:%M"),
                    log.action.as_str(),
                    log.stock_item_name.as_deref().unwrap_or("-"),
                    log.performed_by_name,
                    log.reason
                        .as_deref()
                        .map(|reason| format!(": {reason}"))
                        .unwrap_or_default(),
                );
            }
            println!(
                "Page {} of {} ({} entries)",
                response.page, response.total_pages, response.total
            );
        }
        Command::Assign { item, user, reason } => {
            let request = AssignStockRequest {
                stock_item_id: item,
                assignee_user_id: user,
                reason,
            };
            let result = ctx.stock.assign_stock(&request).await.map_err(api_report)?;
            print_mutation(&result, "Item assigned.");
        }
        Command::Return {
            item,
            reason,
            condition,
        } => {
            let request = ReturnItemRequest {
                item_id: item,
                reason,
                condition,
            };
            let result = ctx.stock.return_item(&request).await.map_err(api_report)?;
            print_mutation(&result, "Item returned.");
        }
        Command::Faulty { item, reason } => {
            let request = MarkFaultyRequest {
                item_id: item,
                reason,
            };
            let result = ctx.stock.mark_faulty(&request).await.map_err(api_report)?;
            print_mutation(&result, "Item reported as faulty.");
        }
        Command::Delete { item } => {
            let result = ctx.stock.delete_stock(item).await.map_err(api_report)?;
            print_mutation(&result, "Item deleted.");
        }
        Command::Watch => watch(ctx).await?,
    }

    Ok(())
}

/// Follows realtime updates until Ctrl-C, the session ends, or reconnects
/// are exhausted.
async fn watch(ctx: &AppContext) -> Result<()> {
    let user = resolve_user(ctx).await?;

    let bridge = CacheInvalidationBridge::new(ctx.cache.clone());
    let mut invalidations = bridge.subscribe();
    let bridge_task = bridge.spawn(ctx.realtime.subscribe(), ctx.gateway.subscribe_mutations());

    let mut events = ctx.realtime.subscribe();
    let mut session_events = ctx.session.subscribe();

    ctx.realtime.connect(user.id).await;
    info!(user_id = user.id, "Watching realtime updates");
    println!(
        "Watching updates for {}. Press Ctrl-C to stop.",
        user.display_name()
    );

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                println!();
                break;
            }

            event = events.recv() => match event {
                Ok(RealtimeEvent::GaveUp { attempts }) => {
                    println!("Connection lost after {attempts} reconnect attempts.");
                    break;
                }
                Ok(event) => print_realtime_event(&event),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Realtime events dropped");
                }
                Err(RecvError::Closed) => break,
            },

            Ok(event) = invalidations.recv() => {
                println!("  refresh needed: {}", event.topic);
            }

            Ok(SessionEvent::LoginRequired) = session_events.recv() => {
                println!("Your session has ended. {LOGIN_HINT}");
                break;
            }
        }
    }

    ctx.realtime.disconnect().await;
    bridge_task.abort();

    Ok(())
}

/// The signed-in user: from this run's login, else the stored profile.
async fn resolve_user(ctx: &AppContext) -> Result<User> {
    if let Some(user) = ctx.session.current_user() {
        return Ok(user);
    }

    if !ctx.session.is_authenticated().await {
        return Err(eyre!("Not logged in. {LOGIN_HINT}"));
    }

    ctx.profile
        .load()
        .ok_or_else(|| eyre!("No profile stored for this session. {LOGIN_HINT}"))
}

fn api_report(error: ApiError) -> Report {
    if error.requires_login() {
        eyre!("{} {LOGIN_HINT}", error.user_message())
    } else {
        eyre!(error.user_message())
    }
}

fn auth_report(error: &AuthError) -> Report {
    match error {
        AuthError::InvalidCredentials { message, .. } => eyre!("Login failed: {message}"),
        other => eyre!("Login failed: {other}"),
    }
}

fn print_user(user: &User) {
    println!("{} <{}>", user.display_name(), user.email);
    println!("  id:    {}", user.id);
    println!("  user:  {}", user.username);
    if !user.roles.is_empty() {
        println!("  roles: {}", user.roles.join(", "));
    }
    if let Some(department) = user.department_id {
        println!("  department: {department}");
    }
}

fn print_mutation(result: &MutationResult, fallback: &str) {
    println!("{}", result.message.as_deref().unwrap_or(fallback));
}

fn print_realtime_event(event: &RealtimeEvent) {
    match event {
        RealtimeEvent::Connected => println!("Connected."),
        RealtimeEvent::Disconnected { reason } => println!("Disconnected: {reason}"),
        RealtimeEvent::Reconnecting { attempt, delay_ms } => {
            println!("Reconnecting in {delay_ms} ms (attempt {attempt})");
        }
        RealtimeEvent::GaveUp { attempts } => println!("Gave up after {attempts} attempts."),
        RealtimeEvent::Message(message) => match &message.topic {
            Some(topic) => println!("Update on {topic}: {}", message.payload),
            None => println!("Update: {}", message.payload),
        },
    }
}

const fn status_label(status: StockStatus) -> &'static str {
    match status {
        StockStatus::Available => "available",
        StockStatus::Assigned => "assigned",
        StockStatus::Faulty => "faulty",
        StockStatus::Deleted => "deleted",
    }
}
