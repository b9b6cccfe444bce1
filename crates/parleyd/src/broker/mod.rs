//! Chat room broker using the Actor pattern.
//!
//! The broker is the central state manager for rooms and registered users.
//! It receives commands via a tokio mpsc channel and is the canonical
//! source of truth for chat state.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌─────────────────┐
//! │ Connection task │────▶│   BrokerActor   │
//! └─────────────────┘     └─────────────────┘
//!         │                       │
//!         │   BrokerCommand       │   owns
//!         │   (mpsc channel)      ▼
//!         ▼                  HashMap<RoomName, Room>
//!    oneshot reply           Vec<UserName>
//! ```
//!
//! A ticker task sends fire-and-forget `SweepIdle` commands so room
//! eviction happens inside the actor, serialized with every other
//! state change.
//!
//! # Panic-Free Guarantees
//!
//! - No `.unwrap()` or `.expect()` in production code
//! - All fallible operations return `Result` or `Option`
//! - Channel operations handle closure gracefully

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::interval;
use tracing::debug;

mod actor;
mod commands;
mod handle;

pub use actor::BrokerActor;
pub use commands::BrokerCommand;
pub use handle::BrokerHandle;

/// Channel buffer size
const COMMAND_BUFFER: usize = 100;

/// Timing knobs for the broker and its lifecycle sweeper.
#[derive(Debug, Clone, Copy)]
pub struct BrokerConfig {
    /// How often the sweeper ticks.
    pub sweep_interval: Duration,

    /// Idle time a room must exceed before it is evicted.
    pub idle_threshold: Duration,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            sweep_interval: Duration::from_secs(5),
            idle_threshold: Duration::from_secs(300),
        }
    }
}

/// Spawn the broker actor and return a handle for interaction.
///
/// This function:
/// 1. Creates the command channel
/// 2. Spawns the BrokerActor on a tokio task
/// 3. Spawns the background idle sweeper
/// 4. Returns a BrokerHandle for client use
///
/// # Example
///
/// ```no_run
/// use parleyd::broker::{spawn_broker, BrokerConfig};
///
/// #[tokio::main]
/// async fn main() {
///     let handle = spawn_broker(BrokerConfig::default());
///
///     let rooms = handle.list_rooms().await;
/// }
/// ```
pub fn spawn_broker(config: BrokerConfig) -> BrokerHandle {
    let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_BUFFER);

    let actor = BrokerActor::new(cmd_rx, config.idle_threshold);
    tokio::spawn(actor.run());

    spawn_sweeper(cmd_tx.clone(), config.sweep_interval);

    BrokerHandle::new(cmd_tx)
}

/// Spawn a background task that triggers periodic idle-room sweeps.
fn spawn_sweeper(sender: mpsc::Sender<BrokerCommand>, sweep_interval: Duration) {
    tokio::spawn(async move {
        let mut ticker = interval(sweep_interval);

        // The first tick completes immediately; consume it so rooms do
        // not accrue a full interval of idle time at startup.
        ticker.tick().await;

        loop {
            ticker.tick().await;

            let cmd = BrokerCommand::SweepIdle {
                elapsed: sweep_interval,
            };
            if sender.send(cmd).await.is_err() {
                // Channel closed, actor stopped - exit sweeper task
                debug!("Sweeper task stopping: broker channel closed");
                break;
            }

            debug!("Triggered idle room sweep");
        }
    });
}
