//! Startup update check against a remote version manifest.

use std::time::Duration;

use semver::Version;
use serde::Deserialize;
use tracing::{info, warn};

/// Remote manifest shape.
///
/// Fetched once per check, immutable afterwards, discarded as soon as
/// the update decision is made.
#[derive(Debug, Deserialize)]
struct VersionManifest {
    latest_version: String,
    download_url: String,
}

/// Result of an update check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Manifest version does not exceed the current version
    NoUpdate,
    /// A strictly newer version exists
    UpdateAvailable {
        latest_version: String,
        download_url: String,
    },
    /// Network failure, non-success status, malformed payload, or timeout.
    /// Callers treat this identically to `NoUpdate` - the check never
    /// blocks startup on network problems.
    CheckFailed,
}

/// Check whether a newer release exists.
///
/// Fail-open by construction: every error path collapses into
/// `CheckFailed` and is logged, never surfaced.
pub async fn check(current_version: &str, manifest_url: &str, timeout: Duration) -> UpdateOutcome {
    let current = match Version::parse(current_version) {
        Ok(v) => v,
        Err(e) => {
            warn!("Cannot parse current version {current_version:?}: {e}");
            return UpdateOutcome::CheckFailed;
        }
    };

    let client = match reqwest::Client::builder().timeout(timeout).build() {
        Ok(c) => c,
        Err(e) => {
            warn!("Failed to build update-check client: {e}");
            return UpdateOutcome::CheckFailed;
        }
    };

    let resp = match client.get(manifest_url).send().await {
        Ok(r) => r,
        Err(e) => {
            warn!("Update check failed: {e}");
            return UpdateOutcome::CheckFailed;
        }
    };

    if !resp.status().is_success() {
        warn!(status = %resp.status(), "Update check returned non-success status");
        return UpdateOutcome::CheckFailed;
    }

    let manifest: VersionManifest = match resp.json().await {
        Ok(m) => m,
        Err(e) => {
            warn!("Malformed version manifest: {e}");
            return UpdateOutcome::CheckFailed;
        }
    };

    let latest = match Version::parse(manifest.latest_version.trim_start_matches('v')) {
        Ok(v) => v,
        Err(e) => {
            warn!(
                "Cannot parse manifest version {:?}: {e}",
                manifest.latest_version
            );
            return UpdateOutcome::CheckFailed;
        }
    };

    if latest > current {
        info!(from = %current, to = %latest, "Update available");
        UpdateOutcome::UpdateAvailable {
            latest_version: manifest.latest_version,
            download_url: manifest.download_url,
        }
    } else {
        UpdateOutcome::NoUpdate
    }
}
