// Copyright (c) 2025-present Cesar Saguier Antebi
// All Rights Reserved.
//
// This file is part of the QUORUS ledger project.
// Licensed under the Business Source License 1.1 (BUSL-1.1).
// See LICENSE file in the project root for full license information.
//
// Commercial use requires express written consent and royalty agreements.
// Contact: Cesar Saguier Antebi

mod cli;
mod config;
mod keypair;

use anyhow::{anyhow, Context, Result};
use genesis::{ChainParams, EmbeddedAssets};
use ledger_core::{generate_keypair, Chain, ChainContext};

use crate::config::NodeConfiguration;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = crate::cli::parse_cli();

    match &cli.command {
        crate::cli::Commands::Init(args) => {
            let config_path = args
                .common
                .config
                .clone()
                .unwrap_or_else(NodeConfiguration::default_config_path);
            if config_path.exists() && !args.force {
                return Err(anyhow!(
                    "config file already exists: {} (use --force to overwrite)",
                    config_path.display()
                ));
            }

            let mut cfg = NodeConfiguration::default()
                .merge_with_env()
                .merge_with_cli(&args.common);
            cfg.faster = args.faster;
            cfg.save_to_file(&config_path)?;

            let chain = open_chain(&cfg)?;
            chain
                .init(&EmbeddedAssets, true)
                .context("chain initialization failed")?;

            let keypair_path = cfg.keypair_path();
            if !keypair::keypair_exists(&keypair_path) {
                let (_, secret) = generate_keypair();
                keypair::save_keypair(&secret, &keypair_path)?;
            }

            let tip = chain.tip()?.ok_or_else(|| anyhow!("no tip after init"))?;
            println!(
                "init complete: config_path={}, data_dir={}, height={}, tip={}",
                config_path.display(),
                cfg.data_dir.display(),
                tip.height,
                tip.hash
            );
        }
        crate::cli::Commands::Verify(common) => {
            let cfg = config::resolve(common)?;
            let chain = open_chain(&cfg)?;
            chain
                .verify_everything()
                .context("chain verification failed")?;
            println!("chain ok: height={}", chain.height()?);
        }
        crate::cli::Commands::Status(common) => {
            let cfg = config::resolve(common)?;
            let chain = open_chain(&cfg)?;
            match chain.tip()? {
                Some(tip) => {
                    println!("height: {}", tip.height);
                    println!("tip hash: {}", tip.hash);
                    println!("tip signer: {}", tip.signature_public_key_hash);
                    println!("tip accepted: {}", tip.time_accepted.to_rfc3339());
                }
                None => println!("the chain is empty"),
            }
            let (total, revoked) = chain.store().count_public_keys()?;
            println!("signatories: {} ({} revoked)", total, revoked);
            let peers = chain.store().saved_peers()?;
            println!("saved peers: {}", peers.len());
            for peer in peers {
                println!("  {}", peer);
            }
        }
        crate::cli::Commands::Keygen(args) => {
            let cfg = config::resolve(&args.common)?;
            let keypair_path = cfg.keypair_path();
            if keypair::keypair_exists(&keypair_path) && !args.force {
                return Err(anyhow!(
                    "keypair already exists: {} (use --force to overwrite)",
                    keypair_path.display()
                ));
            }
            let (_, secret) = generate_keypair();
            keypair::save_keypair(&secret, &keypair_path)?;
            println!(
                "generated keypair: path={}, key_hash={}",
                keypair_path.display(),
                keypair::key_hash(&secret)
            );
        }
        crate::cli::Commands::Accept(args) => {
            let mut cfg = config::resolve(&args.common)?;
            cfg.faster = cfg.faster || args.faster;
            let chain = open_chain(&cfg)?;
            chain
                .init(&EmbeddedAssets, false)
                .context("chain startup failed")?;
            let hash_signature = hex::decode(&args.hash_signature)
                .context("hash signature is not valid hex")?;
            let height = chain
                .accept_block(&args.file, &hash_signature)
                .with_context(|| format!("rejected {}", args.file.display()))?;
            println!("accepted {} at height {}", args.file.display(), height);
        }
        crate::cli::Commands::SignImport(args) => {
            let mut cfg = config::resolve(&args.common)?;
            cfg.faster = cfg.faster || args.faster;
            let chain = open_chain(&cfg)?;
            chain
                .init(&EmbeddedAssets, false)
                .context("chain startup failed")?;
            let key = keypair::load_keypair(&cfg.keypair_path())?;
            let height = chain
                .sign_import(&args.file, &key)
                .with_context(|| format!("rejected {}", args.file.display()))?;
            println!(
                "signed and accepted {} at height {}",
                args.file.display(),
                height
            );
        }
    }

    Ok(())
}

fn open_chain(cfg: &NodeConfiguration) -> Result<Chain> {
    let params = ChainParams::load(&cfg.data_dir).context("failed to load chain params")?;
    let ctx = ChainContext {
        data_dir: cfg.data_dir.clone(),
        params,
        fast_mode: cfg.faster,
    };
    Chain::open(ctx).context("failed to open chain")
}
