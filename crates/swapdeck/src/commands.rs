//! CLI command runners. Each one drives the [`Engine`] the same way an interactive
//! front end would: request, pump one message, render.

use crate::{
    amm::SwapQuote,
    amount::format_base_to_ui,
    balances::WalletDetails,
    cli_output::{print_error_body, print_json, print_warning, stdout_writeln},
    config::SwapdeckConfig,
    engine::{Engine, QuoteEdit},
    errors::ErrorBody,
    node::{connect, NodeConnection},
    package::{package_swap, package_transfer, ChainTarget, TransactionPackage},
    quote::{QuoteAction, QuoteMode},
    registry::{swap_token_index, SwapToken, MAINNET_CHAIN_ID, NATIVE_DECIMALS, NATIVE_SYMBOL},
};
use alloy::primitives::Address;
use serde_json::json;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteAmount<'a> {
    In(&'a str),
    Out(&'a str),
}

fn rpc_url(cfg: &SwapdeckConfig, rpc: Option<&str>) -> eyre::Result<String> {
    rpc.map(str::to_owned)
        .or_else(|| cfg.active_rpc().map(|r| r.url.clone()))
        .ok_or_else(|| eyre::eyre!("no rpc url; pass --rpc or add rpc_urls to config.json"))
}

fn wallet_address(cfg: &SwapdeckConfig, arg: Option<&str>) -> eyre::Result<String> {
    arg.map(str::to_owned)
        .or_else(|| cfg.active_wallet().map(|w| w.address.clone()))
        .ok_or_else(|| eyre::eyre!("no wallet address; pass --address or add wallets to config.json"))
}

/// Chain id from the flag, then the config entry, then the node itself.
async fn chain_target(cfg: &SwapdeckConfig, chain_id: Option<u64>) -> ChainTarget {
    let ep = cfg.active_rpc();
    let rpc_url = ep.map(|r| r.url.clone()).unwrap_or_default();
    if let Some(chain_id) = chain_id.or_else(|| ep.and_then(|r| r.chain_id)) {
        return ChainTarget { rpc_url, chain_id };
    }
    if rpc_url.is_empty() {
        return ChainTarget {
            rpc_url,
            chain_id: MAINNET_CHAIN_ID,
        };
    }
    match connect(&rpc_url, cfg.timeouts().connect).await {
        Ok(conn) => ChainTarget::from(&conn),
        Err(e) => {
            print_warning(&format!("{e}; assuming mainnet"));
            ChainTarget::mainnet(&rpc_url)
        }
    }
}

async fn connected_engine(
    cfg: &SwapdeckConfig,
    url: &str,
    as_json: bool,
) -> Engine<NodeConnection> {
    let mut engine = Engine::new(cfg.timeouts());
    engine.request_connect(url);
    while engine.is_connecting() {
        if !engine.pump().await {
            break;
        }
    }
    if let Some(e) = engine.connection_error() {
        if as_json {
            print_error_body(&ErrorBody::from(e));
        } else {
            print_warning(&e.to_string());
        }
    }
    engine
}

fn details_json(d: &WalletDetails) -> serde_json::Value {
    json!({
        "address": d.address.to_checksum(None),
        "native": {
            "symbol": NATIVE_SYMBOL,
            "balance": d.native_balance.to_string(),
            "balance_ui": format_base_to_ui(d.native_balance, NATIVE_DECIMALS),
        },
        "tokens": d.tokens.iter().map(|t| json!({
            "symbol": t.symbol,
            "decimals": t.decimals,
            "balance": t.balance.to_string(),
            "balance_ui": format_base_to_ui(t.balance, t.decimals),
        })).collect::<Vec<_>>(),
        "loaded_at": d.loaded_at.to_rfc3339(),
        "error": d.error_message,
    })
}

fn print_details_human(d: &WalletDetails) -> eyre::Result<()> {
    stdout_writeln(&d.address.to_checksum(None))?;
    stdout_writeln(&format!(
        "  {NATIVE_SYMBOL:<6} {}",
        format_base_to_ui(d.native_balance, NATIVE_DECIMALS)
    ))?;
    for t in &d.tokens {
        stdout_writeln(&format!(
            "  {:<6} {}",
            t.symbol,
            format_base_to_ui(t.balance, t.decimals)
        ))?;
    }
    stdout_writeln(&format!("  loaded at {}", d.loaded_at.to_rfc3339()))
}

pub async fn balances(
    cfg: &SwapdeckConfig,
    address: Option<&str>,
    rpc: Option<&str>,
    as_json: bool,
) -> eyre::Result<()> {
    let address: Address = wallet_address(cfg, address)?
        .trim()
        .parse()
        .map_err(|e| eyre::eyre!("invalid address: {e}"))?;
    let url = rpc_url(cfg, rpc)?;
    let mut engine = connected_engine(cfg, &url, as_json).await;
    engine.request_details(address, cfg.watchlist.clone());
    engine.pump().await;

    let Some(details) = engine.details() else {
        eyre::bail!("balance load produced no result");
    };
    if as_json {
        print_json(&details_json(details))?;
    } else {
        print_details_human(details)?;
    }
    if let Some(msg) = &details.error_message {
        eyre::bail!("balance load failed: {msg}");
    }
    Ok(())
}

fn token_index(symbol: &str) -> eyre::Result<usize> {
    swap_token_index(symbol).ok_or_else(|| {
        let known: Vec<_> = crate::registry::SWAP_TOKENS.iter().map(|t| t.symbol).collect();
        eyre::eyre!("unknown token {symbol:?}; known: {}", known.join(", "))
    })
}

struct QuoteView<'a> {
    from: &'a SwapToken,
    to: &'a SwapToken,
    mode: QuoteMode,
    chain_id: Option<u64>,
    warning: Option<&'a str>,
}

fn quote_json(v: &QuoteView<'_>, q: &SwapQuote) -> serde_json::Value {
    let (from, to) = (v.from, v.to);
    json!({
        "chain_id": v.chain_id,
        "from": from.symbol,
        "to": to.symbol,
        "mode": match v.mode {
            QuoteMode::Forward => "exact_in",
            QuoteMode::Reverse => "exact_out",
        },
        "amount_in": format_base_to_ui(q.amount_in, from.decimals),
        "amount_in_base": q.amount_in.to_string(),
        "amount_out": format_base_to_ui(q.amount_out, to.decimals),
        "amount_out_base": q.amount_out.to_string(),
        "price_impact_percent": q.price_impact_percent.to_string(),
        "price_impact": q.severity().as_str(),
        "effective_price": q.effective_price.to_string(),
        "reserve0": q.reserve0.to_string(),
        "reserve1": q.reserve1.to_string(),
        "warning": v.warning,
    })
}

pub async fn quote(
    cfg: &SwapdeckConfig,
    from: &str,
    to: &str,
    amount: QuoteAmount<'_>,
    rpc: Option<&str>,
    as_json: bool,
) -> eyre::Result<()> {
    let from_idx = token_index(from)?;
    let to_idx = token_index(to)?;
    let (Some(tin), Some(tout)) = (SwapToken::at(from_idx), SwapToken::at(to_idx)) else {
        eyre::bail!("unknown token index");
    };
    let url = rpc_url(cfg, rpc)?;
    let mut engine = connected_engine(cfg, &url, as_json).await;

    engine.edit_quote(QuoteEdit::FromToken(from_idx));
    engine.edit_quote(QuoteEdit::ToToken(to_idx));
    let action = engine.edit_quote(match amount {
        QuoteAmount::In(s) => QuoteEdit::FromAmount(s.to_owned()),
        QuoteAmount::Out(s) => QuoteEdit::ToAmount(s.to_owned()),
    });
    match action {
        QuoteAction::Fetch(_) => {
            if engine.quotes().is_loading() {
                engine.pump().await;
            }
        }
        QuoteAction::NoOp => eyre::bail!("cannot quote {} for itself", tin.symbol),
        QuoteAction::Cleared => eyre::bail!("amount must be greater than zero"),
        QuoteAction::Invalid(msg) | QuoteAction::Unsupported(msg) => eyre::bail!(msg),
    }

    let orch = engine.quotes();
    if let Some(e) = orch.error() {
        eyre::bail!("quote failed: {e}");
    }
    let Some(q) = orch.quote() else {
        eyre::bail!("quote produced no result");
    };
    if as_json {
        let view = QuoteView {
            from: tin,
            to: tout,
            mode: orch.mode(),
            chain_id: engine.node().map(NodeConnection::chain_id),
            warning: orch.warning(),
        };
        return print_json(&quote_json(&view, q));
    }
    stdout_writeln(&format!(
        "{} {} -> {} {}",
        orch.form().from_amount,
        tin.symbol,
        orch.form().to_amount,
        tout.symbol
    ))?;
    stdout_writeln(&format!(
        "  price impact: {}% ({})",
        q.price_impact_percent.round_dp(4),
        q.severity().as_str()
    ))?;
    if let Some(w) = orch.warning() {
        print_warning(w);
    }
    Ok(())
}

fn emit_package(p: &TransactionPackage, as_json: bool) -> eyre::Result<()> {
    if as_json {
        print_json(p)?;
    } else if p.error.is_none() {
        stdout_writeln(&format!("format: {}", p.format.as_str()))?;
        stdout_writeln(&format!("qr: {}", p.qr_payload))?;
        stdout_writeln(&p.display_text)?;
    }
    if let Some(e) = &p.error {
        eyre::bail!("{e}");
    }
    Ok(())
}

pub async fn transfer(
    cfg: &SwapdeckConfig,
    from: Option<&str>,
    to: &str,
    amount: &str,
    chain_id: Option<u64>,
    as_json: bool,
) -> eyre::Result<()> {
    let from = wallet_address(cfg, from)?;
    let target = chain_target(cfg, chain_id).await;
    let p = package_transfer(&from, to, amount, &target);
    emit_package(&p, as_json)
}

pub struct SwapArgs<'a> {
    pub from: Option<&'a str>,
    pub from_token: &'a str,
    pub to_token: &'a str,
    pub amount_in: &'a str,
    pub min_out: &'a str,
    pub chain_id: Option<u64>,
}

pub async fn swap(cfg: &SwapdeckConfig, args: &SwapArgs<'_>, as_json: bool) -> eyre::Result<()> {
    let from = wallet_address(cfg, args.from)?;
    let target = chain_target(cfg, args.chain_id).await;
    let p = package_swap(
        &from,
        args.from_token,
        args.to_token,
        args.amount_in,
        args.min_out,
        &target,
    );
    emit_package(&p, as_json)
}
