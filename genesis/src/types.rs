// Copyright (c) 2025-present Cesar Saguier Antebi
// All Rights Reserved.
//
// This file is part of the QUORUS ledger project.
// Licensed under the Business Source License 1.1 (BUSL-1.1).
// See LICENSE file in the project root for full license information.
//
// Commercial use requires express written consent and royalty agreements.
// Contact: Cesar Saguier Antebi

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GenesisError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("unknown asset: {0}")]
    UnknownAsset(String),
    #[error("asset {name} is corrupted: {source}")]
    CorruptAsset {
        name: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid chain params file {path}: {source}")]
    InvalidParams {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}
