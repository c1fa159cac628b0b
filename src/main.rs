use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use serde_json::{json, Value};

use prod::config::{self, Config};
use prod::core::BindingContext;
use prod::domain::abi::{AbiSchema, AbiType, ArgumentCoercer, DecodedItem, MethodEntry};
use prod::domain::invoke::InvocationController;
use prod::infrastructure::{AlloyChainClient, AlloyCodec, NodeWallet};
use prod::store::{ContractRecord, ContractStore};

#[derive(Debug, Parser)]
#[command(
    name = "prod",
    version,
    about = "Prod: load any contract ABI, call it, transact with it, decode its payloads"
)]
struct Cli {
    /// HTTP JSON-RPC endpoint for the target chain (e.g. http://localhost:8545)
    #[arg(long, global = true)]
    rpc: Option<String>,

    /// Target chain id
    #[arg(long, global = true)]
    chain_id: Option<u64>,

    /// Config file (defaults to $PROD_CONFIG or ~/.config/prod/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

/// Where the ABI and contract address come from
#[derive(Debug, Args)]
struct Target {
    /// ABI JSON file, or `-` for stdin
    #[arg(long, conflicts_with = "contract")]
    abi: Option<PathBuf>,

    /// Contract address
    #[arg(long, conflicts_with = "contract")]
    address: Option<String>,

    /// Name of a saved contract
    #[arg(long)]
    contract: Option<String>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List read and write methods with their selectors
    Methods {
        #[command(flatten)]
        target: Target,
    },
    /// Call a read method
    Call {
        #[command(flatten)]
        target: Target,
        /// Method key (`balanceOf(address)`) or unambiguous name
        method: String,
        #[arg(allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// Send a write transaction from the node-managed wallet
    Send {
        #[command(flatten)]
        target: Target,
        method: String,
        #[arg(allow_hyphen_values = true)]
        args: Vec<String>,
        /// Ether to send with a payable method (e.g. 0.5)
        #[arg(long)]
        value: Option<String>,
        /// Node account to send from
        #[arg(long)]
        account: Option<String>,
    },
    /// Decode raw payloads against the ABI
    Decode {
        #[command(flatten)]
        target: Target,
        #[command(subcommand)]
        payload: Payload,
    },
    /// Show the example input for a type
    Example {
        /// Solidity type, e.g. `uint256[]`
        ty: String,
    },
    /// Manage saved contracts
    Contracts {
        #[command(subcommand)]
        action: ContractsAction,
    },
}

#[derive(Debug, Subcommand)]
enum Payload {
    /// Revert data
    Error { data: String },
    /// A log's topics and data
    Event {
        /// Topic, repeatable; topic0 first
        #[arg(long = "topic", required = true)]
        topics: Vec<String>,
        #[arg(default_value = "0x")]
        data: String,
    },
    /// Transaction input
    Calldata { data: String },
    /// Return data of a method, by selector or name
    Return { method: String, data: String },
}

#[derive(Debug, Subcommand)]
enum ContractsAction {
    Save {
        name: String,
        #[arg(long)]
        abi: PathBuf,
        #[arg(long)]
        address: String,
        /// Wallet allowed to send transactions to this contract
        #[arg(long)]
        owner: Option<String>,
    },
    List,
    Remove {
        name: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = config::load(cli.config.as_deref());
    config.apply_overrides(cli.rpc.clone(), cli.chain_id);

    match cli.command {
        Command::Methods { target } => methods(&config, &target),
        Command::Call {
            target,
            method,
            args,
        } => call(&config, &target, &method, &args).await,
        Command::Send {
            target,
            method,
            args,
            value,
            account,
        } => send(&config, &target, &method, &args, value, account).await,
        Command::Decode { target, payload } => decode(&config, &target, payload),
        Command::Example { ty } => example(&ty),
        Command::Contracts { action } => contracts(&config, action),
    }
}

fn methods(config: &Config, target: &Target) -> Result<()> {
    let controller = load_controller(config, target, false)?;
    let listing = controller
        .with_registry(|registry| {
            let describe = |kind: &str, entry: &MethodEntry| {
                let outputs: Vec<_> = entry.function.outputs.iter().map(|p| p.ty.canonical()).collect();
                format!(
                    "{} {:<5} {} -> ({}) [{}]",
                    entry.selector_hex(),
                    kind,
                    entry.key,
                    outputs.join(","),
                    entry.function.mutability.as_str()
                )
            };
            let mut lines: Vec<String> = registry.reads().map(|e| describe("read", e)).collect();
            lines.extend(registry.writes().map(|e| describe("write", e)));
            lines.extend(registry.errors().iter().map(|e| {
                format!("0x{} error {}", hex::encode(e.selector), e.key)
            }));
            for key in registry.collisions() {
                lines.push(format!("warning: {} declared more than once", key));
            }
            lines
        })
        .unwrap_or_default();

    for line in listing {
        println!("{line}");
    }
    Ok(())
}

async fn call(config: &Config, target: &Target, method: &str, args: &[String]) -> Result<()> {
    let controller = load_controller(config, target, true)?;
    verify_endpoint(config, controller.binding().target_chain_id).await?;
    let key = controller.resolve_method(method)?;
    fill_inputs(&controller, key.as_str(), args)?;

    let result = controller.invoke_read(key.as_str()).await?;
    println!("{result}");
    Ok(())
}

async fn send(
    config: &Config,
    target: &Target,
    method: &str,
    args: &[String],
    value: Option<String>,
    account: Option<String>,
) -> Result<()> {
    let rpc = config
        .wallet_rpc()
        .context("No wallet endpoint configured")?;
    let pinned = account.or_else(|| config.wallet_account.clone());
    let wallet = NodeWallet::connect_http(&rpc, pinned.as_deref())?;

    let controller = load_controller(config, target, true)?.with_wallet(Arc::new(wallet));
    verify_endpoint(config, controller.binding().target_chain_id).await?;
    controller.sync_wallet().await?;

    let key = controller.resolve_method(method)?;
    fill_inputs(&controller, key.as_str(), args)?;
    if let Some(value) = value {
        controller.set_payable_value(key.as_str(), value)?;
    }

    let hash = controller.invoke_write(key.as_str()).await?;
    println!("{hash}");
    Ok(())
}

fn decode(config: &Config, target: &Target, payload: Payload) -> Result<()> {
    let controller = load_controller(config, target, false)?;
    let decoded = match payload {
        Payload::Error { data } => controller.decode_error(&parse_hex(&data)?)?,
        Payload::Event { topics, data } => {
            let topics = topics
                .iter()
                .map(|t| parse_topic(t))
                .collect::<Result<Vec<_>>>()?;
            controller.decode_event(&topics, &parse_hex(&data)?)?
        }
        Payload::Calldata { data } => controller.decode_calldata(&parse_hex(&data)?)?,
        Payload::Return { method, data } => controller.decode_return(&method, &parse_hex(&data)?)?,
    };
    println!("{}", serde_json::to_string_pretty(&render(&decoded))?);
    Ok(())
}

fn example(ty: &str) -> Result<()> {
    let ty = AbiType::resolve(ty.trim(), None)?;
    println!("{}", ArgumentCoercer::placeholder(&ty));
    Ok(())
}

fn contracts(config: &Config, action: ContractsAction) -> Result<()> {
    let store = open_store(config)?;
    match action {
        ContractsAction::Save {
            name,
            abi,
            address,
            owner,
        } => {
            let abi = read_abi(&abi)?;
            // Reject documents that would not load later
            AbiSchema::parse_str(&abi)?;
            store.save(&ContractRecord {
                name,
                chain_id: config.target_chain(),
                address,
                owner,
                abi,
            })?;
        }
        ContractsAction::List => {
            for record in store.list()? {
                println!(
                    "{}\tchain {}\t{}\t{}",
                    record.name,
                    record.chain_id,
                    record.address,
                    record.owner.as_deref().unwrap_or("-")
                );
            }
        }
        ContractsAction::Remove { name } => {
            if !store.remove(&name)? {
                bail!("No saved contract named {name}");
            }
        }
    }
    Ok(())
}

/// Build the controller for `target`; `needs_address` for call/send
fn load_controller(
    config: &Config,
    target: &Target,
    needs_address: bool,
) -> Result<InvocationController> {
    let (abi, binding) = match &target.contract {
        Some(name) => {
            let record = open_store(config)?
                .get(name)?
                .with_context(|| format!("No saved contract named {name}"))?;
            let binding = record.binding();
            (record.abi, binding)
        }
        None => {
            let path = target.abi.as_deref().context("Pass --abi or --contract")?;
            let address = match (&target.address, needs_address) {
                (Some(address), _) => address.clone(),
                (None, false) => String::new(),
                (None, true) => bail!("Pass --address with --abi"),
            };
            (read_abi(path)?, BindingContext::new(config.target_chain(), address))
        }
    };

    let mut controller = InvocationController::new(Arc::new(AlloyCodec::new()), binding);
    for chain in config.chains() {
        let client = AlloyChainClient::connect_http(chain.chain_id, &chain.rpc)
            .with_context(|| format!("RPC for {}", chain.display_name()))?;
        controller = controller.with_client(Arc::new(client));
    }
    controller.load_schema_str(&abi)?;
    Ok(controller)
}

/// Fail early when the RPC configured for `chain_id` serves another network
async fn verify_endpoint(config: &Config, chain_id: u64) -> Result<()> {
    // Unknown chains surface as UnsupportedChain from the controller
    let Some(chain) = config.chains().into_iter().find(|c| c.chain_id == chain_id) else {
        return Ok(());
    };
    let client = AlloyChainClient::connect_http(chain.chain_id, &chain.rpc)?;
    let remote = client.remote_chain_id().await?;
    if remote != chain_id {
        bail!(
            "{} ({}) serves chain {remote}, expected {chain_id}",
            chain.display_name(),
            chain.rpc
        );
    }
    Ok(())
}

fn fill_inputs(controller: &InvocationController, key: &str, args: &[String]) -> Result<()> {
    for (index, arg) in args.iter().enumerate() {
        controller.set_input(key, index, arg.clone())?;
    }
    Ok(())
}

fn open_store(config: &Config) -> Result<ContractStore> {
    let path = config
        .contracts_db_path()
        .context("No data directory for the contracts database")?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create {}", parent.display()))?;
    }
    ContractStore::open(&path)
}

fn read_abi(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        return io::read_to_string(io::stdin()).context("read ABI from stdin");
    }
    fs::read_to_string(path).with_context(|| format!("read ABI {}", path.display()))
}

fn parse_hex(value: &str) -> Result<Vec<u8>> {
    let value = value.trim();
    let digits = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value);
    hex::decode(digits).with_context(|| format!("Invalid hex: {value}"))
}

fn parse_topic(value: &str) -> Result<[u8; 32]> {
    let bytes = parse_hex(value)?;
    <[u8; 32]>::try_from(bytes.as_slice())
        .map_err(|_| anyhow::anyhow!("Topic must be 32 bytes, got {}", bytes.len()))
}

fn render(decoded: &DecodedItem) -> Value {
    json!({
        "name": decoded.name,
        "signature": decoded.signature,
        "args": decoded.args_object(),
    })
}
