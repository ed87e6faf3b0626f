//! camo-prefix: inspect and sample camouflage prefixes

use anyhow::{Context, Result};
use camo_prefix::generator::{Generator, Segment};
use camo_prefix::prefix::{AbsorbPolicy, DEFAULT_DNS_MSG_LEN, DnsPrefix, PrefixMaker};
use camo_prefix::transport::{DialerConfig, ListenerConfig, UpstreamGenerator};
use tracing::{error, info, warn};

const VERSION: &str = env!("CARGO_PKG_VERSION");
const APP_NAME: &str = "camo-prefix";

fn print_usage() {
    println!("Usage: {APP_NAME} COMMAND [OPTIONS]");
    println!("Commands:");
    println!("  generate PROGRAM          Print sample prefixes for a generator program");
    println!("  dns                       Print sample DNS-over-TCP prefixes");
    println!("  upstream BASE             Print sample placeholder upstream addresses");
    println!("  check PROGRAM             Parse a program and describe it");
    println!("  check-dialer FILE         Validate a dialer settings file");
    println!("  check-listener FILE       Validate a listener settings file");
    println!("Options:");
    println!("  -n, --count COUNT         Number of samples (default: 1)");
    println!("      --len LENGTH          DNS message length (default: {DEFAULT_DNS_MSG_LEN})");
    println!("      --text                Print prefixes as escaped text instead of hex");
    println!("  -V, --version             Show version information");
    println!("  -h, --help                Show this help message");
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    // Parse command line arguments
    let mut args = std::env::args().skip(1);
    let mut command = None;
    let mut operand = None;
    let mut count: usize = 1;
    let mut dns_len = DEFAULT_DNS_MSG_LEN as usize;
    let mut as_text = false;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-n" | "--count" => {
                let value = args.next().context("Expected count after -n")?;
                count = value
                    .parse()
                    .map_err(|e| anyhow::anyhow!("--count expects a non-negative integer: {}", e))?;
            }
            "--len" => {
                let value = args.next().context("Expected length after --len")?;
                dns_len = value
                    .parse()
                    .map_err(|e| anyhow::anyhow!("--len expects a non-negative integer: {}", e))?;
            }
            "--text" => as_text = true,
            "-V" | "--version" => {
                println!("{APP_NAME} {VERSION}");
                return Ok(());
            }
            "-h" | "--help" => {
                print_usage();
                return Ok(());
            }
            _ if command.is_none() => command = Some(arg),
            _ if operand.is_none() => operand = Some(arg),
            _ => {
                error!("Unknown argument: {}", arg);
                return Err(anyhow::anyhow!("Unknown argument: {}", arg));
            }
        }
    }

    let Some(command) = command else {
        print_usage();
        return Ok(());
    };

    match command.as_str() {
        "generate" => {
            let program = operand.context("generate requires a PROGRAM")?;
            let generator = Generator::new(&program).context("Failed to parse generator program")?;
            for _ in 0..count {
                let prefix = generator.generate().context("Generator failed")?;
                println!("{}", render(&prefix, as_text));
            }
        }
        "dns" => {
            let dns = DnsPrefix::new(dns_len).context("Invalid DNS message length")?;
            info!("DNS-over-TCP prefixes for message length {}", dns.msg_len());
            for _ in 0..count {
                println!("{}", render(&dns.make(), as_text));
            }
        }
        "upstream" => {
            let base = operand.context("upstream requires a BASE name")?;
            let generator = UpstreamGenerator::new(base)?;
            for _ in 0..count {
                println!("{}", generator.new_upstream());
            }
        }
        "check" => {
            let program = operand.context("check requires a PROGRAM")?;
            let generator = Generator::new(&program).context("Failed to parse generator program")?;
            describe(&generator);
        }
        "check-dialer" => {
            let path = operand.context("check-dialer requires a FILE")?;
            let data = std::fs::read(&path)
                .with_context(|| format!("Failed to read dialer settings: {}", path))?;
            let config = DialerConfig::from_bytes(&data).context("Invalid dialer settings")?;
            let maker = config.prefix.build().context("Invalid prefix")?;
            info!("Dialer settings OK: {} via upstream base {}", config.addr, config.upstream);
            match maker.matching_policy() {
                Some(policy) => info!("Listener can absorb with: {:?}", policy),
                None => warn!("Prefix length varies between connections; no listener can absorb it"),
            }
        }
        "check-listener" => {
            let path = operand.context("check-listener requires a FILE")?;
            let data = std::fs::read(&path)
                .with_context(|| format!("Failed to read listener settings: {}", path))?;
            let config = ListenerConfig::from_bytes(&data).context("Invalid listener settings")?;
            let absorber = config.absorber().context("Invalid absorb settings")?;
            info!(
                "Listener settings OK: {} absorbing {} byte prefix",
                config.addr,
                absorber.policy().prefix_len()
            );
        }
        other => {
            error!("Unknown command: {}", other);
            return Err(anyhow::anyhow!("Unknown command: {}", other));
        }
    }

    Ok(())
}

fn render(prefix: &[u8], as_text: bool) -> String {
    if as_text {
        prefix.escape_ascii().to_string()
    } else {
        hex::encode(prefix)
    }
}

fn describe(generator: &Generator) {
    let program = generator.program();
    let (major, minor) = program.version();
    println!("version: v{}.{}", major, minor);
    for segment in program.segments() {
        match segment {
            Segment::Literal(bytes) => println!("  literal {:?}", bytes),
            Segment::Call(call) => println!("  call    ${}({})", call.name(), call.args().join(", ")),
        }
    }

    let maker = PrefixMaker::Generator(generator.clone());
    match maker.matching_policy() {
        Some(AbsorbPolicy::Length(len)) => println!("randomized, {} bytes: absorb by length", len),
        Some(policy) => println!("static: absorb with {:?}", policy),
        None => warn!("Prefix length varies between connections; no listener can absorb it"),
    }
}
