//! `isotp-tap`：打开一个 `isotp://` 资源，按固定间隔读取并以十六进制打印新累积的内容。
//!
//! ```text
//! isotp-tap <uri> [--config <file>] [--polls <n>] [--interval-ms <ms>] [--sandbox]
//! ```
//!
//! 日志级别由 `RUST_LOG` 控制，默认 `info`。

use std::{env, fs, path::PathBuf, thread, time::Duration};

use anyhow::{Context, Result, bail};
use spark_io_isotp::{
    ISOTP_PLUGIN, IsotpIo, IsotpIoConfig, OpenOutcome, Permissions, SandboxMode, TracingObserver,
    USAGE,
};
use spark_transport_isotp::IsotpConnector;
use tracing::info;
use tracing_subscriber::EnvFilter;

const ROW_WIDTH: usize = 16;

#[derive(Debug)]
struct Args {
    uri: String,
    config: Option<PathBuf>,
    polls: u32,
    interval: Duration,
    sandbox: bool,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Option<Args>> {
    let mut uri = None;
    let mut config = None;
    let mut polls = 10;
    let mut interval = Duration::from_millis(100);
    let mut sandbox = false;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => return Ok(None),
            "--config" => {
                config = Some(PathBuf::from(args.next().context("--config needs a path")?));
            }
            "--polls" => {
                let value = args.next().context("--polls needs a count")?;
                polls = value
                    .parse()
                    .with_context(|| format!("invalid --polls value `{value}`"))?;
            }
            "--interval-ms" => {
                let value = args.next().context("--interval-ms needs milliseconds")?;
                let millis: u64 = value
                    .parse()
                    .with_context(|| format!("invalid --interval-ms value `{value}`"))?;
                interval = Duration::from_millis(millis);
            }
            "--sandbox" => sandbox = true,
            other if other.starts_with("--") => bail!("unknown option `{other}`"),
            other => {
                if uri.replace(other.to_owned()).is_some() {
                    bail!("only one uri may be given");
                }
            }
        }
    }

    let Some(uri) = uri else {
        return Ok(None);
    };
    Ok(Some(Args {
        uri,
        config,
        polls,
        interval,
        sandbox,
    }))
}

fn load_config(path: Option<&PathBuf>) -> Result<IsotpIoConfig> {
    let Some(path) = path else {
        return Ok(IsotpIoConfig::default());
    };
    let source = fs::read_to_string(path)
        .with_context(|| format!("cannot read config file {}", path.display()))?;
    IsotpIoConfig::from_toml_str(&source)
        .with_context(|| format!("invalid config file {}", path.display()))
}

fn dump(base: u64, chunk: &[u8]) {
    for (row, bytes) in chunk.chunks(ROW_WIDTH).enumerate() {
        let address = base + (row * ROW_WIDTH) as u64;
        println!("0x{address:08x}  {}", hex::encode(bytes));
    }
}

fn build_env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(build_env_filter())
        .init();

    let Some(args) = parse_args(env::args().skip(1))? else {
        eprintln!("{} {}: {}", ISOTP_PLUGIN.name, ISOTP_PLUGIN.version, ISOTP_PLUGIN.description);
        eprintln!("{USAGE} [--config <file>] [--polls <n>] [--interval-ms <ms>] [--sandbox]");
        return Ok(());
    };
    let config = load_config(args.config.as_ref())?;
    let chunk_size = config.chunk_size;
    let policy = if args.sandbox {
        SandboxMode::Sandboxed
    } else {
        SandboxMode::Unrestricted
    };
    let io = IsotpIo::new(IsotpConnector::new(), policy).with_config(config);
    if !io.accepts(&args.uri) {
        bail!("`{}` is not an {} uri", args.uri, ISOTP_PLUGIN.uris);
    }

    let mut descriptor = match io.open(&args.uri, Permissions::READ_WRITE)? {
        OpenOutcome::Opened(descriptor) => descriptor.with_observer(TracingObserver),
        OpenOutcome::Usage(text) => {
            eprintln!("{text}");
            return Ok(());
        }
    };

    for _ in 0..args.polls {
        let base = descriptor.offset();
        let chunk = descriptor.read(chunk_size);
        if !chunk.is_empty() {
            dump(base, &chunk);
        }
        thread::sleep(args.interval);
    }

    info!(
        endpoint = %descriptor.endpoint(),
        size = descriptor.size(),
        frames = descriptor.frame_count(),
        "tap finished"
    );
    descriptor.close();
    Ok(())
}
