//! Actor that serializes concurrent callers onto one auction.
//!
//! The engine lives inside a single tokio task; handles send it commands over
//! an mpsc channel and await the reply on a oneshot.

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use sealbid_common::{AccountId, Amount, AuctionError, AuctionId, Result};
use sealbid_crypto::{Commitment, Nonce};

use crate::auction::{AuctionEngine, AuctionSnapshot};
use crate::events::EventRecord;
use crate::phase::Deadlines;
use crate::settlement::ClaimReceipt;

/// Default command queue depth.
pub const DEFAULT_QUEUE_DEPTH: usize = 256;

enum Command {
    Start {
        caller: AccountId,
        reply: oneshot::Sender<Result<Deadlines>>,
    },
    Commit {
        caller: AccountId,
        commitment: Commitment,
        deposit: Amount,
        reply: oneshot::Sender<Result<()>>,
    },
    Reveal {
        caller: AccountId,
        value: Amount,
        nonce: Nonce,
        reply: oneshot::Sender<Result<()>>,
    },
    ClaimLot {
        caller: AccountId,
        reply: oneshot::Sender<Result<ClaimReceipt>>,
    },
    WithdrawExcess {
        caller: AccountId,
        reply: oneshot::Sender<Result<Amount>>,
    },
    CollectProceeds {
        caller: AccountId,
        reply: oneshot::Sender<Result<Amount>>,
    },
    ReclaimLot {
        caller: AccountId,
        reply: oneshot::Sender<Result<Amount>>,
    },
    Snapshot {
        reply: oneshot::Sender<AuctionSnapshot>,
    },
    Events {
        reply: oneshot::Sender<Vec<EventRecord>>,
    },
}

/// Cloneable handle to a running auction actor.
#[derive(Clone)]
pub struct AuctionHandle {
    auction_id: AuctionId,
    tx: mpsc::Sender<Command>,
}

/// Spawn the actor. The join handle yields the engine back once every
/// [`AuctionHandle`] is dropped.
pub fn spawn(engine: AuctionEngine, queue_depth: usize) -> (AuctionHandle, JoinHandle<AuctionEngine>) {
    let (tx, rx) = mpsc::channel(queue_depth.max(1));
    let auction_id = engine.id();

    info!(auction_id = %auction_id, "Auction service started");
    let task = tokio::spawn(run(engine, rx));

    (AuctionHandle { auction_id, tx }, task)
}

async fn run(mut engine: AuctionEngine, mut rx: mpsc::Receiver<Command>) -> AuctionEngine {
    while let Some(command) = rx.recv().await {
        // A dropped reply receiver means the caller gave up; the command
        // has still been applied.
        match command {
            Command::Start { caller, reply } => {
                let _ = reply.send(engine.start(&caller));
            }
            Command::Commit {
                caller,
                commitment,
                deposit,
                reply,
            } => {
                let _ = reply.send(engine.commit(&caller, commitment, deposit));
            }
            Command::Reveal {
                caller,
                value,
                nonce,
                reply,
            } => {
                let _ = reply.send(engine.reveal(&caller, value, &nonce));
            }
            Command::ClaimLot { caller, reply } => {
                let _ = reply.send(engine.claim_lot(&caller));
            }
            Command::WithdrawExcess { caller, reply } => {
                let _ = reply.send(engine.withdraw_excess(&caller));
            }
            Command::CollectProceeds { caller, reply } => {
                let _ = reply.send(engine.collect_proceeds(&caller));
            }
            Command::ReclaimLot { caller, reply } => {
                let _ = reply.send(engine.reclaim_lot(&caller));
            }
            Command::Snapshot { reply } => {
                let _ = reply.send(engine.snapshot());
            }
            Command::Events { reply } => {
                let _ = reply.send(engine.events().to_vec());
            }
        }
    }

    debug!(auction_id = %engine.id(), "Auction service stopped");
    engine
}

impl AuctionHandle {
    /// Id of the auction behind this handle.
    pub fn auction_id(&self) -> AuctionId {
        self.auction_id
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(build(reply))
            .await
            .map_err(|_| AuctionError::ServiceUnavailable)?;
        rx.await.map_err(|_| AuctionError::ServiceUnavailable)
    }

    pub async fn start(&self, caller: AccountId) -> Result<Deadlines> {
        self.request(|reply| Command::Start { caller, reply }).await?
    }

    pub async fn commit(
        &self,
        caller: AccountId,
        commitment: Commitment,
        deposit: Amount,
    ) -> Result<()> {
        self.request(|reply| Command::Commit {
            caller,
            commitment,
            deposit,
            reply,
        })
        .await?
    }

    pub async fn reveal(&self, caller: AccountId, value: Amount, nonce: Nonce) -> Result<()> {
        self.request(|reply| Command::Reveal {
            caller,
            value,
            nonce,
            reply,
        })
        .await?
    }

    pub async fn claim_lot(&self, caller: AccountId) -> Result<ClaimReceipt> {
        self.request(|reply| Command::ClaimLot { caller, reply })
            .await?
    }

    pub async fn withdraw_excess(&self, caller: AccountId) -> Result<Amount> {
        self.request(|reply| Command::WithdrawExcess { caller, reply })
            .await?
    }

    pub async fn collect_proceeds(&self, caller: AccountId) -> Result<Amount> {
        self.request(|reply| Command::CollectProceeds { caller, reply })
            .await?
    }

    pub async fn reclaim_lot(&self, caller: AccountId) -> Result<Amount> {
        self.request(|reply| Command::ReclaimLot { caller, reply })
            .await?
    }

    pub async fn snapshot(&self) -> Result<AuctionSnapshot> {
        self.request(|reply| Command::Snapshot { reply }).await
    }

    pub async fn events(&self) -> Result<Vec<EventRecord>> {
        self.request(|reply| Command::Events { reply }).await
    }
}
