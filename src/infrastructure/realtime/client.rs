use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use super::connection::{ConnectTarget, RealtimeConnector, RealtimeStream};
use super::constants::{
    DEFAULT_MAX_RECONNECT_ATTEMPTS, DEFAULT_RECONNECT_INTERVAL, EVENT_CHANNEL_CAPACITY,
    RECONNECT_DELAY_MAX, RECONNECT_JITTER_MAX,
};
use super::error::RealtimeError;
use crate::domain::ConnectionState;
use crate::domain::entities::UserId;
use crate::domain::ports::{AccessTokenProvider, InboundMessage, RealtimeEvent};

/// Reconnect delay strategy as written in configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackoffMode {
    #[default]
    Fixed,
    Exponential,
}

/// Delay between reconnect attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectPolicy {
    /// Same delay before every attempt.
    Fixed { interval: Duration },
    /// Doubling delay from `base`, capped at `max`, plus jitter.
    Exponential { base: Duration, max: Duration },
}

impl ReconnectPolicy {
    #[must_use]
    pub const fn from_mode(mode: BackoffMode, interval: Duration) -> Self {
        match mode {
            BackoffMode::Fixed => Self::Fixed { interval },
            BackoffMode::Exponential => Self::Exponential {
                base: interval,
                max: RECONNECT_DELAY_MAX,
            },
        }
    }

    /// Delay before the given reconnect attempt (1-based).
    #[must_use]
    pub fn delay(&self, attempt: u32) -> Duration {
        match *self {
            Self::Fixed { interval } => interval,
            Self::Exponential { base, max } => calculate_backoff_delay(base, max, attempt),
        }
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::Fixed {
            interval: DEFAULT_RECONNECT_INTERVAL,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RealtimeChannelConfig {
    pub base_url: String,
    pub max_attempts: u32,
    pub policy: ReconnectPolicy,
}

impl RealtimeChannelConfig {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            max_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
            policy: ReconnectPolicy::default(),
        }
    }

    #[must_use]
    pub const fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    #[must_use]
    pub const fn with_policy(mut self, policy: ReconnectPolicy) -> Self {
        self.policy = policy;
        self
    }
}

struct ActiveConnection {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Persistent push connection for one user with bounded reconnects.
///
/// Lifecycle: `Disconnected -> Connecting -> Connected -> Disconnected`, retried
/// while attempts remain. Once `max_attempts` consecutive reconnects fail the
/// channel emits [`RealtimeEvent::GaveUp`] and stays down until [`connect`] is
/// called again.
///
/// [`connect`]: RealtimeChannel::connect
pub struct RealtimeChannel {
    config: RealtimeChannelConfig,
    connector: Arc<dyn RealtimeConnector>,
    tokens: Arc<dyn AccessTokenProvider>,
    events: broadcast::Sender<RealtimeEvent>,
    state: Arc<watch::Sender<ConnectionState>>,
    active: Mutex<Option<ActiveConnection>>,
}

impl RealtimeChannel {
    #[must_use]
    pub fn new(
        config: RealtimeChannelConfig,
        connector: Arc<dyn RealtimeConnector>,
        tokens: Arc<dyn AccessTokenProvider>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (state, _) = watch::channel(ConnectionState::Disconnected);

        Self {
            config,
            connector,
            tokens,
            events,
            state: Arc::new(state),
            active: Mutex::new(None),
        }
    }

    /// Starts the connection task for `user_id` with a fresh attempt counter.
    ///
    /// Any running connection is shut down first.
    pub async fn connect(&self, user_id: UserId) {
        self.disconnect().await;

        let (shutdown, shutdown_rx) = watch::channel(false);
        let context = LoopContext {
            config: self.config.clone(),
            user_id,
            connector: self.connector.clone(),
            tokens: self.tokens.clone(),
            events: self.events.clone(),
            state: self.state.clone(),
        };

        info!(user_id, "Starting realtime channel");
        let handle = tokio::spawn(run_channel_loop(context, shutdown_rx));

        *self.active.lock() = Some(ActiveConnection { shutdown, handle });
    }

    /// Closes the connection and cancels any pending reconnect. Idempotent.
    pub async fn disconnect(&self) {
        let active = self.active.lock().take();
        let Some(active) = active else {
            return;
        };

        let _ = active.shutdown.send(true);
        if let Err(e) = active.handle.await {
            error!(error = %e, "Realtime task failed");
        }

        self.state.send_replace(ConnectionState::Disconnected);
        debug!("Realtime channel stopped");
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<RealtimeEvent> {
        self.events.subscribe()
    }

    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    #[must_use]
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }
}

impl Drop for RealtimeChannel {
    fn drop(&mut self) {
        if let Some(active) = self.active.get_mut().take() {
            let _ = active.shutdown.send(true);
            active.handle.abort();
        }
    }
}

struct LoopContext {
    config: RealtimeChannelConfig,
    user_id: UserId,
    connector: Arc<dyn RealtimeConnector>,
    tokens: Arc<dyn AccessTokenProvider>,
    events: broadcast::Sender<RealtimeEvent>,
    state: Arc<watch::Sender<ConnectionState>>,
}

impl LoopContext {
    fn emit(&self, event: RealtimeEvent) {
        let _ = self.events.send(event);
    }

    fn set_state(&self, state: ConnectionState) {
        self.state.send_replace(state);
    }
}

enum ConnectionResult {
    Shutdown,
    Closed(RealtimeError),
}

async fn run_channel_loop(context: LoopContext, mut shutdown: watch::Receiver<bool>) {
    let mut reconnect_attempts: u32 = 0;

    loop {
        let result = run_single_connection(&context, &mut shutdown, &mut reconnect_attempts).await;

        let ConnectionResult::Closed(e) = result else {
            break;
        };

        context.set_state(ConnectionState::Disconnected);
        if e.is_disconnect() {
            info!(error = %e, "Realtime connection closed");
        } else {
            warn!(error = %e, "Realtime connection failed");
        }
        context.emit(RealtimeEvent::Disconnected {
            reason: e.to_string(),
        });

        if reconnect_attempts >= context.config.max_attempts {
            error!(
                attempts = reconnect_attempts,
                "Max reconnection attempts exceeded"
            );
            context.emit(RealtimeEvent::GaveUp {
                attempts: reconnect_attempts,
            });
            break;
        }

        reconnect_attempts += 1;
        let delay = context.config.policy.delay(reconnect_attempts);
        let delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);

        info!(
            attempt = reconnect_attempts,
            delay_ms, "Reconnecting to realtime channel"
        );
        context.emit(RealtimeEvent::Reconnecting {
            attempt: reconnect_attempts,
            delay_ms,
        });

        tokio::select! {
            () = sleep(delay) => {}
            () = stopped(&mut shutdown) => break,
        }
    }

    context.set_state(ConnectionState::Disconnected);
    debug!("Realtime loop terminated");
}

async fn run_single_connection(
    context: &LoopContext,
    shutdown: &mut watch::Receiver<bool>,
    reconnect_attempts: &mut u32,
) -> ConnectionResult {
    if *shutdown.borrow() {
        return ConnectionResult::Shutdown;
    }

    context.set_state(ConnectionState::Connecting);

    // Re-read on every attempt: the session may have refreshed in between.
    let Some(token) = context.tokens.current_access_token().await else {
        return ConnectionResult::Closed(RealtimeError::MissingToken);
    };

    let target = ConnectTarget {
        base_url: context.config.base_url.clone(),
        user_id: context.user_id,
        token,
    };

    let connected = tokio::select! {
        result = context.connector.connect(&target) => result,
        () = stopped(shutdown) => return ConnectionResult::Shutdown,
    };

    let mut stream = match connected {
        Ok(stream) => stream,
        Err(e) => return ConnectionResult::Closed(e),
    };

    *reconnect_attempts = 0;
    context.set_state(ConnectionState::Connected);
    context.emit(RealtimeEvent::Connected);
    info!(user_id = context.user_id, "Realtime channel connected");

    run_connection_loop(context, stream.as_mut(), shutdown).await
}

async fn run_connection_loop(
    context: &LoopContext,
    stream: &mut dyn RealtimeStream,
    shutdown: &mut watch::Receiver<bool>,
) -> ConnectionResult {
    loop {
        tokio::select! {
            frame = stream.next_frame() => match frame {
                Ok(text) => handle_frame(context, &text),
                Err(e) => return ConnectionResult::Closed(e),
            },
            () = stopped(shutdown) => {
                stream.close().await;
                return ConnectionResult::Shutdown;
            }
        }
    }
}

fn handle_frame(context: &LoopContext, text: &str) {
    match InboundMessage::parse(text) {
        Ok(message) => {
            debug!(topic = ?message.topic, "Realtime message received");
            context.emit(RealtimeEvent::Message(message));
        }
        Err(e) => {
            warn!(error = %e, "Dropping unparseable realtime frame");
        }
    }
}

/// Resolves once shutdown is requested or the owning channel is gone.
async fn stopped(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}

#[allow(clippy::cast_possible_truncation)]
fn calculate_backoff_delay(base: Duration, max: Duration, attempt: u32) -> Duration {
    let base_delay = base.as_millis() as u64;
    let max_delay = max.as_millis() as u64;
    let jitter_max = RECONNECT_JITTER_MAX.as_millis() as u64;

    let exponent = attempt.saturating_sub(1).min(6);
    let exponential_delay = base_delay.saturating_mul(2_u64.saturating_pow(exponent));
    let capped_delay = exponential_delay.min(max_delay);

    let jitter = rand_jitter(jitter_max);
    Duration::from_millis(capped_delay.saturating_add(jitter))
}

fn rand_jitter(max: u64) -> u64 {
    use std::time::SystemTime;

    if max == 0 {
        return 0;
    }

    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| u64::from(d.subsec_nanos()))
        .unwrap_or(0);

    nanos % max
}
