//! `ferry`: command line front end of the Ethereum <-> Vara relayer.
//!
//! ```text
//! ferry compose-proof --tx <hash> [--wait]     SCALE encoded receipt proof, hex
//! ferry checkpoint --slot <n> [--wait]         checkpoint covering a beacon slot
//! ferry merkle-root --block <n> [--wait]       root published for a Vara block
//! ferry is-processed --nonce <n>               message queue nonce status
//! ferry relay-vara-to-eth ...                  deliver one Vara message
//! ```

use std::{path::PathBuf, sync::Arc};

use alloy_primitives::{Address, Bytes, B256, U256};
use anyhow::Context;
use clap::{Parser, Subcommand};
use ferry_core::{encode_proof_result, CrossChainMessage};
use ferry_relay::{
    beacon::HttpBeaconClient,
    checkpoint::{CheckpointClient, CheckpointProgram},
    composer::ProofComposer,
    execution::HttpExecutionClient,
    gear::{HttpGearClient, KnownMessages},
    message_queue::{wait_for_merkle_root, HttpMessageQueue, MessageQueue},
    proxy::{HistoricalProxy, HistoricalProxyClient},
    vara_to_eth::{Request, Status, VaraToEthRelayer},
    Config,
};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "ferry")]
#[command(about = "Relay verifiable messages between Ethereum and Vara")]
struct Cli {
    #[arg(long, short, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compose the proof of an Ethereum transaction's receipt.
    ComposeProof {
        #[arg(long)]
        tx: B256,
        /// Wait for the checkpoint light client to catch up.
        #[arg(long)]
        wait: bool,
    },
    /// Look up the checkpoint covering a beacon slot.
    Checkpoint {
        #[arg(long)]
        slot: u64,
        #[arg(long)]
        wait: bool,
    },
    /// Look up the merkle root published for a Vara block.
    MerkleRoot {
        #[arg(long)]
        block: u64,
        #[arg(long)]
        wait: bool,
    },
    /// Check whether the message queue processed a nonce.
    IsProcessed {
        /// Nonce as the contract indexes it.
        #[arg(long)]
        nonce: U256,
    },
    /// Deliver a Vara message to Ethereum.
    RelayVaraToEth {
        /// Vara block the message was queued in.
        #[arg(long)]
        block: u64,
        #[arg(long)]
        nonce: U256,
        #[arg(long)]
        source: B256,
        #[arg(long)]
        destination: Address,
        #[arg(long, default_value = "0x")]
        payload: Bytes,
        #[arg(long)]
        wait: bool,
    },
}

fn gear_client(config: &Config) -> Arc<HttpGearClient> {
    Arc::new(HttpGearClient::new(
        config.vara.rpc_url.clone(),
        config.vara.origin,
        config.vara.query_gas_limit,
    ))
}

fn checkpoint_client(config: &Config, gear: Arc<HttpGearClient>) -> CheckpointClient {
    CheckpointClient::new(Arc::new(CheckpointProgram::new(
        gear,
        config.relay.poll_interval(),
    )))
}

fn message_queue(config: &Config) -> HttpMessageQueue {
    HttpMessageQueue::new(
        HttpExecutionClient::new(config.ethereum.rpc_url.clone()),
        config.ethereum.message_queue,
        config.ethereum.sender,
        config.relay.poll_interval(),
    )
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = Config::load(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    info!(
        ethereum = %config.ethereum.rpc_url,
        beacon = %config.ethereum.beacon_url,
        vara = %config.vara.rpc_url,
        "Loaded configuration"
    );

    let gear = gear_client(&config);
    let proxy = Arc::new(HistoricalProxyClient::new(
        config.vara.historical_proxy,
        gear.clone(),
    ));

    match cli.command {
        Command::ComposeProof { tx, wait } => {
            let composer = ProofComposer::new(
                Arc::new(HttpExecutionClient::new(config.ethereum.rpc_url.clone())),
                Arc::new(HttpBeaconClient::new(config.ethereum.beacon_url.clone())),
                proxy,
                checkpoint_client(&config, gear),
                config.ethereum.seconds_per_slot,
            );
            let proof = composer.compose(tx, wait).await?;
            info!(
                slot = proof.proof_block.block.slot,
                headers = proof.proof_block.headers.len(),
                "Proof composed"
            );
            println!("0x{}", hex::encode(encode_proof_result(&proof)));
        }
        Command::Checkpoint { slot, wait } => {
            let endpoint = proxy.endpoint_for(slot).await?;
            let program = proxy.checkpoint_client_address(endpoint).await?;
            let checkpoints = checkpoint_client(&config, gear);
            let (checkpoint_slot, root) = checkpoints.checkpoint_for(program, slot, wait).await?;
            println!("{checkpoint_slot} {root}");
        }
        Command::MerkleRoot { block, wait } => {
            let queue = message_queue(&config);
            if wait {
                let found = wait_for_merkle_root(&queue, block, None).await?;
                println!("{} {}", found.block_number, found.merkle_root);
            } else {
                match queue.merkle_root(block).await? {
                    Some(root) => println!("{block} {root}"),
                    None => anyhow::bail!("no merkle root published for Vara block {block}"),
                }
            }
        }
        Command::IsProcessed { nonce } => {
            println!("{}", message_queue(&config).is_processed(nonce).await?);
        }
        Command::RelayVaraToEth {
            block,
            nonce,
            source,
            destination,
            payload,
            wait,
        } => {
            let message = CrossChainMessage {
                nonce_le: nonce.to_le_bytes::<32>(),
                source: source.0,
                destination: destination.into_array(),
                payload: payload.to_vec(),
            };
            let relayer = VaraToEthRelayer::new(
                gear,
                Arc::new(KnownMessages(vec![(block, message)])),
                Arc::new(HttpExecutionClient::new(config.ethereum.rpc_url.clone())),
                Arc::new(message_queue(&config)),
                config.ethereum.block_time_secs,
            );
            let on_status = |status: &Status| info!(?status, "Relay progress");
            let processed = relayer
                .relay(Request { block, nonce, wait }, &on_status)
                .await?;
            println!("{}", processed.tx_hash);
        }
    }

    Ok(())
}
