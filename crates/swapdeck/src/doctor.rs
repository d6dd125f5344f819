use crate::{config::SwapdeckConfig, node::connect, paths::SwapdeckPaths};
use eyre::Context as _;
use serde_json::json;
use std::path::PathBuf;

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|s| s.trim().to_owned())
        .filter(|s| !s.is_empty())
}

struct ConfigReport {
    path: PathBuf,
    exists: bool,
    parse_ok: bool,
    error: Option<String>,
    rpc_count: usize,
    wallet_count: usize,
    watchlist_len: usize,
    logger: bool,
}

struct RpcReport {
    url: Option<String>,
    reachable: bool,
    chain_id: Option<u64>,
    expected_chain_id: Option<u64>,
    note: Option<String>,
}

impl RpcReport {
    fn chain_matches(&self) -> Option<bool> {
        Some(self.chain_id? == self.expected_chain_id?)
    }
}

struct DoctorReport {
    version: &'static str,
    paths: SwapdeckPaths,
    config: ConfigReport,
    rpc: RpcReport,
    env: serde_json::Value,
}

async fn probe_rpc(cfg: Option<&SwapdeckConfig>) -> RpcReport {
    let Some(cfg) = cfg else {
        return RpcReport {
            url: None,
            reachable: false,
            chain_id: None,
            expected_chain_id: None,
            note: Some("config unreadable; rpc not probed".to_owned()),
        };
    };
    let Some(ep) = cfg.active_rpc() else {
        return RpcReport {
            url: None,
            reachable: false,
            chain_id: None,
            expected_chain_id: None,
            note: Some("no rpc_urls configured".to_owned()),
        };
    };
    match connect(&ep.url, cfg.timeouts().connect).await {
        Ok(conn) => RpcReport {
            url: Some(ep.url.clone()),
            reachable: true,
            chain_id: Some(conn.chain_id()),
            expected_chain_id: ep.chain_id,
            note: None,
        },
        Err(e) => RpcReport {
            url: Some(ep.url.clone()),
            reachable: false,
            chain_id: None,
            expected_chain_id: ep.chain_id,
            note: Some(e.to_string()),
        },
    }
}

async fn collect(paths: &SwapdeckPaths) -> DoctorReport {
    let config_path = paths.config_file();
    let config_exists = config_path.exists();
    let (config_ok, config_err, cfg) = match SwapdeckConfig::load(&config_path) {
        Ok(cfg) => (true, None, Some(cfg)),
        Err(e) => (false, Some(format!("{e:#}")), None),
    };
    let rpc = probe_rpc(cfg.as_ref()).await;

    let env = json!({
      "SWAPDECK_CONFIG_DIR": env_opt("SWAPDECK_CONFIG_DIR"),
      "SWAPDECK_DATA_DIR": env_opt("SWAPDECK_DATA_DIR"),
      "SWAPDECK_RPC_URL": env_opt("SWAPDECK_RPC_URL"),
      "RUST_LOG": env_opt("RUST_LOG"),
    });

    DoctorReport {
        version: env!("CARGO_PKG_VERSION"),
        paths: paths.clone(),
        config: ConfigReport {
            path: config_path,
            exists: config_exists,
            parse_ok: config_ok,
            error: config_err,
            rpc_count: cfg.as_ref().map_or(0, |c| c.rpc_urls.len()),
            wallet_count: cfg.as_ref().map_or(0, |c| c.wallets.len()),
            watchlist_len: cfg.as_ref().map_or(0, |c| c.watchlist.len()),
            logger: cfg.as_ref().is_some_and(|c| c.logger),
        },
        rpc,
        env,
    }
}

fn print_json(out: &mut impl std::io::Write, r: &DoctorReport) -> eyre::Result<()> {
    let s = serde_json::to_string_pretty(&json!({
      "ok": r.config.parse_ok,
      "version": r.version,
      "paths": {
        "config_dir": r.paths.config_dir,
        "data_dir": r.paths.data_dir,
        "log_file": r.paths.log_file,
      },
      "config": {
        "path": r.config.path,
        "exists": r.config.exists,
        "parse_ok": r.config.parse_ok,
        "error": r.config.error,
        "rpc_count": r.config.rpc_count,
        "wallet_count": r.config.wallet_count,
        "watchlist_len": r.config.watchlist_len,
        "logger": r.config.logger,
      },
      "rpc": {
        "url": r.rpc.url,
        "reachable": r.rpc.reachable,
        "chain_id": r.rpc.chain_id,
        "expected_chain_id": r.rpc.expected_chain_id,
        "chain_matches": r.rpc.chain_matches(),
        "note": r.rpc.note,
      },
      "env": r.env,
    }))
    .context("serialize doctor json")?;
    writeln!(out, "{s}").context("write doctor json")?;
    Ok(())
}

fn print_human(out: &mut impl std::io::Write, r: &DoctorReport) -> eyre::Result<()> {
    writeln!(out, "swapdeck doctor (v{})", r.version).context("write header")?;
    writeln!(out).context("write newline")?;

    writeln!(out, "Paths:").context("write paths header")?;
    for (label, p) in [
        ("config", &r.paths.config_dir),
        ("data", &r.paths.data_dir),
        ("log", &r.paths.log_file),
    ] {
        writeln!(out, "  {label:<7} {}", p.display()).context("write paths")?;
    }
    writeln!(out).context("write newline")?;

    writeln!(out, "Config:").context("write config header")?;
    writeln!(out, "  config.json: {}", r.config.path.display()).context("write config")?;
    if !r.config.exists {
        writeln!(out, "  status: missing (using defaults)").context("write config")?;
    } else if r.config.parse_ok {
        writeln!(
            out,
            "  status: ok ({} rpc, {} wallets, {} watched tokens, logger={})",
            r.config.rpc_count, r.config.wallet_count, r.config.watchlist_len, r.config.logger
        )
        .context("write config")?;
    } else {
        writeln!(out, "  status: parse failed").context("write config")?;
        if let Some(e) = &r.config.error {
            let head = e.lines().next().unwrap_or_default();
            writeln!(out, "  {head}").context("write config")?;
        }
    }
    writeln!(out).context("write newline")?;

    writeln!(out, "RPC:").context("write rpc header")?;
    writeln!(out, "  url: {}", r.rpc.url.as_deref().unwrap_or("-")).context("write rpc")?;
    writeln!(out, "  reachable: {}", r.rpc.reachable).context("write rpc")?;
    if let Some(id) = r.rpc.chain_id {
        writeln!(out, "  chain_id: {id}").context("write rpc")?;
    }
    if r.rpc.chain_matches() == Some(false) {
        writeln!(
            out,
            "  warning: node reports chain {:?}, config expects {:?}",
            r.rpc.chain_id, r.rpc.expected_chain_id
        )
        .context("write rpc")?;
    }
    if let Some(note) = &r.rpc.note {
        writeln!(out, "  note: {note}").context("write rpc")?;
    }
    writeln!(out).context("write newline")?;

    writeln!(out, "Env:").context("write env header")?;
    for key in ["SWAPDECK_CONFIG_DIR", "SWAPDECK_DATA_DIR", "SWAPDECK_RPC_URL"] {
        writeln!(
            out,
            "  {key}: {:?}",
            r.env.get(key).and_then(serde_json::Value::as_str)
        )
        .context("write env")?;
    }
    Ok(())
}

pub async fn run(as_json: bool) -> eyre::Result<()> {
    let paths = SwapdeckPaths::discover()?;
    let report = collect(&paths).await;
    let mut out = std::io::stdout().lock();
    if as_json {
        print_json(&mut out, &report)?;
    } else {
        print_human(&mut out, &report)?;
    }
    Ok(())
}
