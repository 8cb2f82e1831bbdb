//! Fabricated Mux objects for development without credentials.

use chrono::Utc;
use rand::Rng;

use super::{Asset, PlaybackId, Upload, UploadStatusView};

pub const UPLOAD_PREFIX: &str = "simulated_";
pub const ASSET_PREFIX: &str = "simulated_asset_";
pub const PLAYBACK_PREFIX: &str = "simulated_playback_";

const SIMULATED_DURATION_SECS: f64 = 120.0;
const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

fn random_base36(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect()
}

/// `simulated_<unix millis>_<9 base36 chars>`
pub fn upload_id() -> String {
    format!("{}{}_{}", UPLOAD_PREFIX, Utc::now().timestamp_millis(), random_base36(9))
}

pub fn is_simulated_upload(upload_id: &str) -> bool {
    upload_id.starts_with(UPLOAD_PREFIX) && !upload_id.starts_with(ASSET_PREFIX)
}

pub fn is_simulated_asset(asset_id: &str) -> bool {
    asset_id.starts_with(ASSET_PREFIX)
}

pub fn upload(upload_url: &str, cors_origin: &str) -> Upload {
    Upload {
        id: upload_id(),
        url: Some(upload_url.to_string()),
        status: "waiting".to_string(),
        asset_id: None,
        error: None,
        cors_origin: Some(cors_origin.to_string()),
    }
}

/// A simulated upload has always "finished" and produced an asset carrying its suffix.
pub fn upload_status(upload_id: &str) -> UploadStatusView {
    let suffix = upload_id.strip_prefix(UPLOAD_PREFIX).unwrap_or(upload_id);
    UploadStatusView {
        status: "asset_created".to_string(),
        asset_id: Some(format!("{}{}", ASSET_PREFIX, suffix)),
        error: None,
    }
}

pub fn asset(asset_id: &str) -> Asset {
    let suffix = asset_id.strip_prefix(ASSET_PREFIX).unwrap_or(asset_id);
    Asset {
        id: asset_id.to_string(),
        status: "ready".to_string(),
        playback_ids: vec![PlaybackId {
            id: format!("{}{}", PLAYBACK_PREFIX, suffix),
            policy: "public".to_string(),
        }],
        duration: Some(SIMULATED_DURATION_SECS),
        aspect_ratio: Some("16:9".to_string()),
        created_at: Some(Utc::now().to_rfc3339()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_id_shape() {
        let id = upload_id();
        let rest = id.strip_prefix(UPLOAD_PREFIX).expect("prefix");
        let (millis, random) = rest.split_once('_').expect("two parts");

        assert!(millis.parse::<i64>().is_ok());
        assert_eq!(random.len(), 9);
        assert!(random.chars().all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
        assert!(is_simulated_upload(&id));
        assert!(!is_simulated_asset(&id));
    }

    #[test]
    fn test_upload_ids_differ() {
        assert_ne!(upload_id(), upload_id());
    }

    #[test]
    fn test_status_and_asset_carry_suffix() {
        let status = upload_status("simulated_1700000000000_abc123xyz");
        assert_eq!(status.status, "asset_created");
        assert_eq!(status.asset_id.as_deref(), Some("simulated_asset_1700000000000_abc123xyz"));

        let asset = asset("simulated_asset_1700000000000_abc123xyz");
        assert_eq!(asset.status, "ready");
        assert_eq!(asset.playback_ids[0].id, "simulated_playback_1700000000000_abc123xyz");
        assert_eq!(asset.playback_ids[0].policy, "public");
        assert_eq!(asset.duration, Some(120.0));
        assert_eq!(asset.aspect_ratio.as_deref(), Some("16:9"));
    }

    #[test]
    fn test_asset_ids_are_not_uploads() {
        assert!(is_simulated_asset("simulated_asset_1_x"));
        assert!(!is_simulated_upload("simulated_asset_1_x"));
        assert!(!is_simulated_upload("abc"));
    }
}
