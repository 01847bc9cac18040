//! Scouter: agent runtime for tool-using LLM agents.
//!
//! A run is a list of flows, each an ordered list of steps (input, model
//! call, tool batch). The runner asks the model for a completion, fans out
//! any requested tool calls concurrently, records the results and repeats
//! until the continuation policy says stop.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use scouter::prelude::*;
//!
//! # async fn example() -> scouter::error::Result<()> {
//! let settings = ScouterConfig::from_env()?.llm;
//! let client = settings.client(&ClientCache::new())?;
//! let runner = AgentRunner::new(client, Arc::new(ToolRegistry::new()))
//!     .with_retry_policy(settings.retry_policy());
//!
//! let config = AgentConfig::builder()
//!     .model(settings.model.clone())
//!     .instructions("Answer briefly.")
//!     .build();
//! let mut run = runner.create_run(&config);
//! runner.run(&mut run, &config, vec![ModelMessage::user("Hello!")]).await?;
//! println!("{}", run.last_output()?);
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod config;
pub mod error;
pub mod prelude;
pub mod provider;
pub mod tools;
pub mod types;
pub mod util;
