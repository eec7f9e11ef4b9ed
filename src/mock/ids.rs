//! Identifier and timestamp helpers shared by both response paths.

use rand::Rng;
use uuid::Uuid;

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Generate a fresh completion id with the wire-compatible `chatcmpl-` prefix.
///
/// The suffix is opaque; clients must not depend on its format.
pub fn completion_id() -> String {
    format!("chatcmpl-{}", Uuid::new_v4().simple())
}

/// Generate an `fp_`-prefixed system fingerprint.
///
/// Real providers keep this stable for a deployment; the upstream this mock
/// imitates regenerates it on every frame, and we preserve that quirk.
pub fn system_fingerprint() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..14)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect();
    format!("fp_{suffix}")
}

/// Current time as Unix seconds, captured once per request.
pub fn unix_timestamp() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}
