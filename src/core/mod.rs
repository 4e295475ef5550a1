// ─── Runtime Packages Core ───
// Resolves which package is installed in a folder, from disk or from its
// remote manifest.
//
// Architecture:
//   core/
//     package/    — Package model, manifest parser, folder inspection
//     downloader/ — Streaming validator, cache entries, HTTP fetcher
//     task/       — Install task: races both paths, settles once
//     config/     — Persisted install settings
//     http/       — Shared reqwest client setup

pub mod config;
pub mod downloader;
pub mod error;
pub mod http;
pub mod package;
pub mod task;
