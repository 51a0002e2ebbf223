// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use super::{print_json, AppContext};
use anyhow::Result;
use clap::{Args, Subcommand};
use serde_json::json;

#[derive(Subcommand, Debug)]
pub enum BuilderCommand {
    /// Store the project access key
    SetAccessKey(SetAccessKeyArgs),
    /// Show the stored access key (masked)
    Show,
}

#[derive(Args, Debug)]
pub struct SetAccessKeyArgs {
    /// Project access key
    pub access_key: String,
}

pub fn run(ctx: &AppContext, cmd: BuilderCommand) -> Result<()> {
    match cmd {
        BuilderCommand::SetAccessKey(args) => {
            let identity = ctx.builder().set_access_key(&args.access_key)?;
            print_json(&json!({
                "configured": true,
                "accessKey": identity.masked_key(),
                "updatedAt": identity.updated_at.to_rfc3339(),
            }))
        }
        BuilderCommand::Show => {
            let stored = ctx.builder().load()?;
            let env_override = ctx.config.access_key.is_some();
            match stored {
                Some(identity) => print_json(&json!({
                    "configured": true,
                    "accessKey": identity.masked_key(),
                    "updatedAt": identity.updated_at.to_rfc3339(),
                    "overriddenByEnv": env_override,
                })),
                None => print_json(&json!({
                    "configured": false,
                    "overriddenByEnv": env_override,
                })),
            }
        }
    }
}
