use assert_cmd::Command;
use eyre::Context as _;
use predicates::prelude::*;
use serde_json::Value;
use std::path::Path;

const SENDER: &str = "0x1111111111111111111111111111111111111111";
const RECIPIENT: &str = "0xAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";
const DEAD_RPC: &str = "http://127.0.0.1:1";

struct Dirs {
    config: tempfile::TempDir,
    data: tempfile::TempDir,
}

impl Dirs {
    fn new() -> eyre::Result<Self> {
        Ok(Self {
            config: tempfile::tempdir()?,
            data: tempfile::tempdir()?,
        })
    }

    fn with_config(json: &str) -> eyre::Result<Self> {
        let d = Self::new()?;
        std::fs::write(d.config.path().join("config.json"), json).context("write config.json")?;
        Ok(d)
    }

    fn cmd(&self) -> Command {
        let mut c = Command::new(assert_cmd::cargo::cargo_bin!("swapdeck"));
        c.env("SWAPDECK_CONFIG_DIR", self.config.path())
            .env("SWAPDECK_DATA_DIR", self.data.path())
            .env_remove("SWAPDECK_RPC_URL")
            .env_remove("RUST_LOG");
        c
    }
}

fn dead_rpc_config() -> String {
    format!(
        r#"{{
          "rpc_urls": [{{"name": "dead", "url": "{DEAD_RPC}", "active": true, "chain_id": 1}}],
          "wallets": [{{"address": "{SENDER}", "name": "main", "active": true}}],
          "timeouts": {{"connect_seconds": 2}}
        }}"#
    )
}

fn stdout_json(out: &[u8]) -> eyre::Result<Value> {
    serde_json::from_slice(out).context("parse stdout json")
}

#[test]
fn paths_honours_env_overrides() -> eyre::Result<()> {
    let dirs = Dirs::new()?;
    let out = dirs.cmd().arg("paths").output().context("run swapdeck paths")?;
    assert!(out.status.success(), "paths failed: {}", String::from_utf8_lossy(&out.stderr));
    let v = stdout_json(&out.stdout)?;
    assert_eq!(
        v.get("config_dir").and_then(Value::as_str).map(Path::new),
        Some(dirs.config.path())
    );
    assert!(v
        .get("log_file")
        .and_then(Value::as_str)
        .is_some_and(|s| s.ends_with("swapdeck.log.jsonl")));
    Ok(())
}

#[test]
fn package_transfer_emits_an_eip681_uri() -> eyre::Result<()> {
    let dirs = Dirs::new()?;
    let out = dirs
        .cmd()
        .args(["package", "transfer", "--from", SENDER, "--to", RECIPIENT])
        .args(["--amount", "1.0", "--chain-id", "1", "--json"])
        .output()
        .context("run package transfer")?;
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
    let v = stdout_json(&out.stdout)?;
    assert_eq!(v.get("format").and_then(Value::as_str), Some("EIP-681"));
    assert_eq!(
        v.get("qr_payload").and_then(Value::as_str),
        Some("ethereum:0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa@1?value=1000000000000000000")
    );
    assert!(v.get("error").is_none(), "successful package has no error field");
    Ok(())
}

#[test]
fn package_transfer_rejects_bad_amounts() -> eyre::Result<()> {
    let dirs = Dirs::new()?;
    dirs.cmd()
        .args(["package", "transfer", "--from", SENDER, "--to", RECIPIENT])
        .args(["--amount", "one", "--chain-id", "1", "--json"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("\"error\""))
        .stdout(predicate::str::contains("one"));
    Ok(())
}

#[test]
fn package_swap_warns_about_approval_for_token_input() -> eyre::Result<()> {
    let dirs = Dirs::with_config(&dead_rpc_config())?;
    dirs.cmd()
        .args(["package", "swap", "--from-token", "USDC", "--to-token", "ETH"])
        .args(["--amount-in", "1000", "--min-out", "0.49"])
        .assert()
        .success()
        .stdout(predicate::str::contains("swapExactTokensForETH"))
        .stdout(predicate::str::contains("approval"))
        .stdout(predicate::str::contains("EIP-4527-like"));
    Ok(())
}

#[test]
fn doctor_reports_unreachable_rpc() -> eyre::Result<()> {
    let dirs = Dirs::with_config(&dead_rpc_config())?;
    let out = dirs
        .cmd()
        .args(["doctor", "--json"])
        .output()
        .context("run swapdeck doctor --json")?;
    assert!(
        out.status.success(),
        "doctor exited non-zero: status={:?}, stderr={}",
        out.status.code(),
        String::from_utf8_lossy(&out.stderr)
    );
    let v = stdout_json(&out.stdout)?;
    assert_eq!(v.get("ok").and_then(Value::as_bool), Some(true));
    assert!(v.get("version").and_then(Value::as_str).is_some());
    let rpc = v.get("rpc").ok_or_else(|| eyre::eyre!("missing rpc section"))?;
    assert_eq!(rpc.get("url").and_then(Value::as_str), Some(DEAD_RPC));
    assert_eq!(rpc.get("reachable").and_then(Value::as_bool), Some(false));
    assert!(rpc.get("note").and_then(Value::as_str).is_some());
    Ok(())
}

#[test]
fn doctor_flags_a_broken_config() -> eyre::Result<()> {
    let dirs = Dirs::with_config("{ nope")?;
    let out = dirs
        .cmd()
        .args(["doctor", "--json"])
        .output()
        .context("run swapdeck doctor --json")?;
    assert!(out.status.success(), "doctor must not fail on bad config");
    let v = stdout_json(&out.stdout)?;
    assert_eq!(v.get("ok").and_then(Value::as_bool), Some(false));
    let parse_ok = v
        .get("config")
        .and_then(|c| c.get("parse_ok"))
        .and_then(Value::as_bool);
    assert_eq!(parse_ok, Some(false));
    Ok(())
}

#[test]
fn quote_for_unknown_pool_fails_with_a_warning() -> eyre::Result<()> {
    let dirs = Dirs::with_config(&dead_rpc_config())?;
    dirs.cmd()
        .args(["quote", "--from", "ETH", "--to", "DAI", "--amount-in", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no known pool for ETH/DAI"));
    Ok(())
}

#[test]
fn balances_without_a_node_report_no_rpc_client() -> eyre::Result<()> {
    let dirs = Dirs::with_config(&dead_rpc_config())?;
    let out = dirs
        .cmd()
        .args(["balances", "--json"])
        .output()
        .context("run swapdeck balances")?;
    assert!(!out.status.success(), "load against a dead node must fail");
    let v = stdout_json(&out.stdout)?;
    assert_eq!(v.get("error").and_then(Value::as_str), Some("no RPC client"));
    assert_eq!(
        v.get("tokens").and_then(Value::as_array).map(Vec::len),
        Some(0)
    );
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("connection_error"), "stderr: {stderr}");
    Ok(())
}
