//! # Lorekeeper
//!
//! An incremental scan engine for novel manuscript corpora.
//!
//! Lorekeeper indexes a corpus of small Markdown documents — chapters,
//! characters, plot threads, factions, and locations, each carrying a YAML
//! frontmatter header — into a validated, ordered Snapshot. Scans are
//! incremental: per file, a two-tier cache check (stat match, then content
//! hash) decides whether prior results can be replayed instead of re-parsing.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌─────────┐   ┌──────────┐   ┌──────────┐
//! │ Discover │──▶│  Cache  │──▶│ Extract  │──▶│ Validate │
//! │ walk+sort│   │ 2-tier  │   │ YAML hdr │   │ global   │
//! └──────────┘   └─────────┘   └──────────┘   └────┬─────┘
//!                                                  ▼
//!                                            ┌──────────┐
//!                                            │ Snapshot │
//!                                            │ + cache  │
//!                                            └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! lore scan                         # incremental scan of ./lore
//! lore scan --mode full             # ignore the cache, re-parse everything
//! lore scan --strict                # escalate warnings to errors
//! lore stats                        # summarize the persisted snapshot
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`diagnostics`] | Severity, diagnostic codes, strict-mode escalation |
//! | [`discover`] | File discovery and ordering |
//! | [`extract`] | Frontmatter extraction into typed entities |
//! | [`cache`] | Change-detection cache and persistence |
//! | [`validate`] | Cross-entity validation |
//! | [`snapshot`] | Snapshot assembly and ordering |
//! | [`scan`] | Pipeline orchestration |

pub mod cache;
pub mod config;
pub mod diagnostics;
pub mod discover;
pub mod extract;
pub mod models;
pub mod scan;
pub mod snapshot;
pub mod validate;
