//! Forward/reverse quote state for the swap form.
//!
//! The orchestrator never touches the network. Edits return a [`QuoteAction`]; a
//! [`QuoteAction::Fetch`] carries everything [`execute_quote`] needs, and the result is
//! handed back through [`QuoteOrchestrator::apply_result`] together with the fingerprint
//! it was issued for.

use crate::{
    amm::{quote_exact_in, quote_exact_out, ImpactSeverity, SwapQuote},
    amount::{format_base_to_ui, is_blank_or_zero, parse_amount_ui_to_base},
    errors::SwapdeckError,
    node::NodeReader,
    pair::{get_pair, get_reserves},
    registry::{known_pair_for, SwapToken},
};
use alloy::primitives::{Address, U256};
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteMode {
    /// The input amount is live; the output is derived.
    Forward,
    /// The desired output is live; the required input is derived.
    Reverse,
}

/// Memo key for one quote request. Amounts compare as text, so "1.0" and "1" differ.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteFingerprint {
    pub mode: QuoteMode,
    pub amount_text: String,
    pub from_index: usize,
    pub to_index: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapForm {
    pub from_amount: String,
    pub to_amount: String,
    pub from_index: usize,
    pub to_index: usize,
}

impl Default for SwapForm {
    fn default() -> Self {
        Self {
            from_amount: String::new(),
            to_amount: String::new(),
            from_index: 0,
            to_index: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteRequest {
    pub fingerprint: QuoteFingerprint,
    pub pair_address: Address,
    pub token_in: Address,
    /// Exact input (forward) or desired output (reverse), in smallest units.
    pub amount: U256,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuoteAction {
    NoOp,
    Cleared,
    Invalid(String),
    Unsupported(String),
    Fetch(QuoteRequest),
}

#[derive(Debug, Clone, Default)]
pub struct QuoteOrchestrator {
    form: SwapForm,
    mode: Option<QuoteMode>,
    quote: Option<SwapQuote>,
    error: Option<String>,
    warning: Option<String>,
    last_fingerprint: Option<QuoteFingerprint>,
    in_flight: Option<QuoteFingerprint>,
}

impl QuoteOrchestrator {
    pub fn new() -> Self {
        Self::default()
    }

    pub const fn form(&self) -> &SwapForm {
        &self.form
    }

    pub const fn mode(&self) -> QuoteMode {
        match self.mode {
            Some(m) => m,
            None => QuoteMode::Forward,
        }
    }

    pub const fn quote(&self) -> Option<&SwapQuote> {
        self.quote.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn warning(&self) -> Option<&str> {
        self.warning.as_deref()
    }

    pub const fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn set_from_amount(&mut self, text: &str) -> QuoteAction {
        text.clone_into(&mut self.form.from_amount);
        self.mode = Some(QuoteMode::Forward);
        self.evaluate()
    }

    pub fn set_to_amount(&mut self, text: &str) -> QuoteAction {
        text.clone_into(&mut self.form.to_amount);
        self.mode = Some(QuoteMode::Reverse);
        self.evaluate()
    }

    pub fn select_from_token(&mut self, index: usize) -> QuoteAction {
        if SwapToken::at(index).is_none() {
            return QuoteAction::NoOp;
        }
        self.form.from_index = index;
        self.evaluate()
    }

    pub fn select_to_token(&mut self, index: usize) -> QuoteAction {
        if SwapToken::at(index).is_none() {
            return QuoteAction::NoOp;
        }
        self.form.to_index = index;
        self.evaluate()
    }

    fn live_amount(&self) -> &str {
        match self.mode() {
            QuoteMode::Forward => &self.form.from_amount,
            QuoteMode::Reverse => &self.form.to_amount,
        }
    }

    fn complementary_amount(&self) -> &str {
        match self.mode() {
            QuoteMode::Forward => &self.form.to_amount,
            QuoteMode::Reverse => &self.form.from_amount,
        }
    }

    fn complementary_amount_mut(&mut self) -> &mut String {
        match self.mode() {
            QuoteMode::Forward => &mut self.form.to_amount,
            QuoteMode::Reverse => &mut self.form.from_amount,
        }
    }

    fn fingerprint(&self) -> QuoteFingerprint {
        QuoteFingerprint {
            mode: self.mode(),
            amount_text: self.live_amount().to_owned(),
            from_index: self.form.from_index,
            to_index: self.form.to_index,
        }
    }

    fn clear_derived(&mut self) {
        self.complementary_amount_mut().clear();
        self.quote = None;
        self.error = None;
        self.warning = None;
        self.in_flight = None;
    }

    fn evaluate(&mut self) -> QuoteAction {
        if self.form.from_index == self.form.to_index {
            self.in_flight = None;
            return QuoteAction::NoOp;
        }
        let (Some(from), Some(to)) = (
            SwapToken::at(self.form.from_index),
            SwapToken::at(self.form.to_index),
        ) else {
            return QuoteAction::NoOp;
        };

        if is_blank_or_zero(self.live_amount()) {
            self.clear_derived();
            return QuoteAction::Cleared;
        }

        let live_token = match self.mode() {
            QuoteMode::Forward => from,
            QuoteMode::Reverse => to,
        };
        let amount = match parse_amount_ui_to_base(self.live_amount(), live_token.decimals) {
            Ok(v) => v,
            Err(e) => {
                self.clear_derived();
                let msg = format!("invalid {} amount: {e:#}", live_token.symbol);
                self.error = Some(msg.clone());
                return QuoteAction::Invalid(msg);
            }
        };

        let Some(pair) = known_pair_for(from.symbol, to.symbol) else {
            self.clear_derived();
            let msg = SwapdeckError::UnsupportedPair {
                from: from.symbol.to_owned(),
                to: to.symbol.to_owned(),
            }
            .to_string();
            self.warning = Some(msg.clone());
            return QuoteAction::Unsupported(msg);
        };

        let fingerprint = self.fingerprint();
        let resolved = self.last_fingerprint.as_ref() == Some(&fingerprint)
            && self.quote.is_some()
            && !self.complementary_amount().trim().is_empty();
        if resolved || self.in_flight.as_ref() == Some(&fingerprint) {
            debug!(?fingerprint, "quote unchanged; skipping fetch");
            return QuoteAction::NoOp;
        }

        self.clear_derived();
        self.in_flight = Some(fingerprint.clone());
        QuoteAction::Fetch(QuoteRequest {
            fingerprint,
            pair_address: pair.pair_address,
            token_in: from.address,
            amount,
        })
    }

    /// Apply a finished fetch. Returns `false` when the result was superseded and dropped.
    pub fn apply_result(
        &mut self,
        fingerprint: &QuoteFingerprint,
        result: Result<SwapQuote, SwapdeckError>,
    ) -> bool {
        if self.in_flight.as_ref() != Some(fingerprint) {
            warn!(?fingerprint, "discarding superseded quote response");
            return false;
        }
        if &self.fingerprint() != fingerprint {
            // The form moved on without issuing a new request; nothing else will land.
            self.in_flight = None;
            warn!(?fingerprint, "discarding quote response for an edited form");
            return false;
        }
        self.in_flight = None;

        match result {
            Ok(q) => {
                let derived = match fingerprint.mode {
                    QuoteMode::Forward => SwapToken::at(fingerprint.to_index)
                        .map(|t| format_base_to_ui(q.amount_out, t.decimals)),
                    QuoteMode::Reverse => SwapToken::at(fingerprint.from_index)
                        .map(|t| format_base_to_ui(q.amount_in, t.decimals)),
                };
                *self.complementary_amount_mut() = derived.unwrap_or_default();
                self.warning = impact_warning(&q);
                self.error = None;
                self.quote = Some(q);
                self.last_fingerprint = Some(fingerprint.clone());
            }
            Err(e) => {
                self.quote = None;
                self.error = Some(e.to_string());
            }
        }
        true
    }
}

fn impact_warning(q: &SwapQuote) -> Option<String> {
    let pct = q.price_impact_percent.round_dp(2);
    match q.severity() {
        ImpactSeverity::High => Some(format!("High price impact: {pct}%")),
        ImpactSeverity::Moderate => Some(format!("Moderate price impact: {pct}%")),
        ImpactSeverity::Low => None,
    }
}

/// Read the pair and its reserves, then run the quote the request asks for.
pub async fn execute_quote<N: NodeReader>(
    node: &N,
    req: &QuoteRequest,
    timeout: Duration,
) -> Result<SwapQuote, SwapdeckError> {
    let pair = get_pair(node, req.pair_address, timeout).await?;
    let reserves = get_reserves(node, req.pair_address, false, timeout).await?;
    let q = match req.fingerprint.mode {
        QuoteMode::Forward => quote_exact_in(req.token_in, req.amount, &pair, &reserves)?,
        QuoteMode::Reverse => quote_exact_out(req.token_in, req.amount, &pair, &reserves)?,
    };
    info!(
        pair = %req.pair_address,
        mode = ?req.fingerprint.mode,
        amount_in = %q.amount_in,
        amount_out = %q.amount_out,
        impact = %q.price_impact_percent,
        "quote resolved"
    );
    Ok(q)
}
