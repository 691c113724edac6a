//! Testing infrastructure shared by `corex-sdk` and `corex-cli` integration
//! tests.
//!
//! - [`world::TestWorld`]: a disposable workspace plus a pre-wired
//!   [`corex_sdk::Client`] for driving runs end to end against a scripted
//!   mock model.
//! - [`providers`]: canned [`corex_providers::client::MockConfig`] scripts
//!   for the common run shapes (single task, tool failure, confirmation).
//! - [`fixtures`]: small builders for the plan/acceptance text those
//!   scripts need to embed.

pub mod fixtures;
pub mod providers;
pub mod world;

pub use world::TestWorld;
