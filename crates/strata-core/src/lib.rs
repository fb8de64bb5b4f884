//! Core types, the import graph, and configuration for strata.
//!
//! This crate provides the foundational data structures used across all strata crates:
//! - [`types`]: Modules, direct imports, and error types
//! - [`expression`]: Module and import expressions with `*` / `**` wildcards
//! - [`graph`]: The [`ImportGraph`](graph::ImportGraph), with squashing and cloning
//! - [`graph_chains`]: Shortest chains and layer dependency search
//! - [`graph_cycles`]: Shortest cycles, elementary cycles, and cycle breakers
//! - [`builder`]: The [`GraphBuilder`](builder::GraphBuilder) trait and JSON snapshots
//! - [`config`]: Configuration loading from `.strata/contracts.json`

pub mod builder;
pub mod config;
pub mod expression;
pub mod graph;
pub mod graph_chains;
pub mod graph_cycles;
pub mod types;
