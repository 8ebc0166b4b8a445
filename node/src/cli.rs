// Copyright (c) 2025-present Cesar Saguier Antebi
// All Rights Reserved.
//
// This file is part of the QUORUS ledger project.
// Licensed under the Business Source License 1.1 (BUSL-1.1).
// See LICENSE file in the project root for full license information.
//
// Commercial use requires express written consent and royalty agreements.
// Contact: Cesar Saguier Antebi

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "quorus-node")]
#[command(version, about = "QUORUS proof-of-authority ledger node", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize the data directory and install the genesis block
    Init(InitArgs),
    /// Run the full-chain consistency verifier
    Verify(CommonArgs),
    /// Display chain tip, registry and peer summary
    Status(CommonArgs),
    /// Generate the node keypair
    Keygen(KeygenArgs),
    /// Run a candidate block file through acceptance
    Accept(AcceptArgs),
    /// Sign a prepared block file with the node key and accept it
    SignImport(SignImportArgs),
}

#[derive(Parser, Debug, Clone)]
pub struct CommonArgs {
    /// Config file path
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Data directory override
    #[arg(long)]
    pub data_dir: Option<PathBuf>,
}

#[derive(Parser, Debug, Clone)]
pub struct InitArgs {
    #[command(flatten)]
    pub common: CommonArgs,
    /// Skip the startup consistency checks
    #[arg(long, default_value_t = false)]
    pub faster: bool,
    /// Overwrite an existing config file
    #[arg(long, default_value_t = false)]
    pub force: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct KeygenArgs {
    #[command(flatten)]
    pub common: CommonArgs,
    /// Overwrite an existing keypair
    #[arg(long, default_value_t = false)]
    pub force: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct AcceptArgs {
    #[command(flatten)]
    pub common: CommonArgs,
    /// Candidate block file
    pub file: PathBuf,
    /// Hex signature over the candidate's content hash
    #[arg(long)]
    pub hash_signature: String,
    /// Skip the startup consistency checks
    #[arg(long, default_value_t = false)]
    pub faster: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct SignImportArgs {
    #[command(flatten)]
    pub common: CommonArgs,
    /// Prepared block file to sign and submit
    pub file: PathBuf,
    /// Skip the startup consistency checks
    #[arg(long, default_value_t = false)]
    pub faster: bool,
}

pub fn parse_cli() -> Cli {
    Cli::parse()
}
