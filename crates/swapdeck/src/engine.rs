//! Single-writer state holder.
//!
//! Network work runs in spawned tasks and reports back with exactly one [`Message`]. Only
//! [`Engine::update`] assigns the connection, wallet details and quote state.

use crate::{
    amm::SwapQuote,
    balances::{load_details, WalletDetails, DEFAULT_BALANCES_TIMEOUT},
    errors::SwapdeckError,
    node::{connect, NodeConnection, NodeReader, DEFAULT_CONNECT_TIMEOUT},
    pair::DEFAULT_CALL_TIMEOUT,
    quote::{execute_quote, QuoteAction, QuoteFingerprint, QuoteOrchestrator},
    registry::WatchedToken,
};
use alloy::primitives::Address;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub connect: Duration,
    pub balances: Duration,
    pub call: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            connect: DEFAULT_CONNECT_TIMEOUT,
            balances: DEFAULT_BALANCES_TIMEOUT,
            call: DEFAULT_CALL_TIMEOUT,
        }
    }
}

#[derive(Debug)]
pub enum Message<N> {
    Connected(Result<N, SwapdeckError>),
    DetailsLoaded(WalletDetails),
    QuoteResolved {
        fingerprint: QuoteFingerprint,
        result: Result<SwapQuote, SwapdeckError>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuoteEdit {
    FromAmount(String),
    ToAmount(String),
    FromToken(usize),
    ToToken(usize),
}

#[derive(Debug)]
pub struct Engine<N> {
    node: Option<N>,
    connection_error: Option<SwapdeckError>,
    connecting: bool,
    details: Option<WalletDetails>,
    details_for: Option<Address>,
    quotes: QuoteOrchestrator,
    timeouts: Timeouts,
    tx: mpsc::UnboundedSender<Message<N>>,
    rx: mpsc::UnboundedReceiver<Message<N>>,
}

impl<N: NodeReader> Engine<N> {
    pub fn new(timeouts: Timeouts) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            node: None,
            connection_error: None,
            connecting: false,
            details: None,
            details_for: None,
            quotes: QuoteOrchestrator::new(),
            timeouts,
            tx,
            rx,
        }
    }

    pub const fn node(&self) -> Option<&N> {
        self.node.as_ref()
    }

    pub const fn connection_error(&self) -> Option<&SwapdeckError> {
        self.connection_error.as_ref()
    }

    pub const fn is_connecting(&self) -> bool {
        self.connecting
    }

    pub const fn details(&self) -> Option<&WalletDetails> {
        self.details.as_ref()
    }

    pub const fn is_loading_details(&self) -> bool {
        self.details_for.is_some()
    }

    pub const fn quotes(&self) -> &QuoteOrchestrator {
        &self.quotes
    }

    /// Apply one result message. This is the only place shared state is assigned.
    pub fn update(&mut self, msg: Message<N>) {
        match msg {
            Message::Connected(Ok(node)) => {
                self.connecting = false;
                self.connection_error = None;
                self.node = Some(node);
            }
            Message::Connected(Err(e)) => {
                warn!(error = %e, "connect failed");
                self.connecting = false;
                self.connection_error = Some(e);
                self.node = None;
            }
            Message::DetailsLoaded(details) => {
                if self.details_for != Some(details.address) {
                    warn!(
                        address = %details.address,
                        "discarding balances for a superseded address"
                    );
                    return;
                }
                self.details_for = None;
                self.details = Some(details);
            }
            Message::QuoteResolved {
                fingerprint,
                result,
            } => {
                self.quotes.apply_result(&fingerprint, result);
            }
        }
    }

    /// Wait for the next result and apply it.
    pub async fn pump(&mut self) -> bool {
        match self.rx.recv().await {
            Some(msg) => {
                self.update(msg);
                true
            }
            None => false,
        }
    }

    pub fn request_details(&mut self, address: Address, watchlist: Vec<WatchedToken>) {
        self.details_for = Some(address);
        let node = self.node.clone();
        let timeout = self.timeouts.balances;
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let details = load_details(node, address, &watchlist, timeout).await;
            if tx.send(Message::DetailsLoaded(details)).is_err() {
                debug!("engine dropped before balances arrived");
            }
        });
    }

    /// Apply a form edit and start a fetch if the orchestrator asks for one.
    pub fn edit_quote(&mut self, edit: QuoteEdit) -> QuoteAction {
        let action = match edit {
            QuoteEdit::FromAmount(s) => self.quotes.set_from_amount(&s),
            QuoteEdit::ToAmount(s) => self.quotes.set_to_amount(&s),
            QuoteEdit::FromToken(i) => self.quotes.select_from_token(i),
            QuoteEdit::ToToken(i) => self.quotes.select_to_token(i),
        };
        let QuoteAction::Fetch(req) = &action else {
            return action;
        };

        let Some(node) = self.node.clone() else {
            let err = SwapdeckError::Connection {
                url: String::new(),
                cause: "no RPC client".to_owned(),
            };
            self.quotes.apply_result(&req.fingerprint, Err(err));
            return action;
        };
        let req = req.clone();
        let timeout = self.timeouts.call;
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = execute_quote(&node, &req, timeout).await;
            let msg = Message::QuoteResolved {
                fingerprint: req.fingerprint,
                result,
            };
            if tx.send(msg).is_err() {
                debug!("engine dropped before quote arrived");
            }
        });
        action
    }
}

impl Engine<NodeConnection> {
    /// Open a new connection in the background; the current one stays until it lands.
    pub fn request_connect(&mut self, url: &str) {
        self.connecting = true;
        let url = url.to_owned();
        let timeout = self.timeouts.connect;
        let tx = self.tx.clone();
        info!(url = %url, "connecting");
        tokio::spawn(async move {
            let result = connect(&url, timeout).await;
            if tx.send(Message::Connected(result)).is_err() {
                debug!("engine dropped before connect finished");
            }
        });
    }
}
