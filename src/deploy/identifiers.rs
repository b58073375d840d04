//! Generated object identifiers
//!
//! Objects that need an id chosen by the client (automations, documents, SLOs,
//! buckets, settings external ids) get one derived from the config coordinate,
//! so deploying the same config again addresses the same object.

use uuid::Uuid;

use crate::domain::Coordinate;

const MAX_BUCKET_NAME_LEN: usize = 100;

/// Stable UUID for an arbitrary seed
pub fn uuid_from(seed: &str) -> String {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, seed.as_bytes()).to_string()
}

/// Stable UUID for a coordinate
pub fn uuid_for(coordinate: &Coordinate) -> String {
    uuid_from(&coordinate.to_string())
}

/// External id marking a settings object as managed by this tool
pub fn settings_external_id(coordinate: &Coordinate) -> String {
    let hash = blake3::hash(coordinate.to_string().as_bytes());
    let hex = hash.to_hex();
    format!("cac:{}", &hex[..32])
}

/// Bucket name for a coordinate: `{project}_{config-id}`, lowercase `[a-z0-9_-]`
pub fn bucket_name(coordinate: &Coordinate) -> String {
    let raw = format!("{}_{}", coordinate.project, coordinate.config_id);
    raw.to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .take(MAX_BUCKET_NAME_LEN)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uuid_is_stable_per_coordinate() {
        let a = Coordinate::new("p", "workflow", "w1");
        assert_eq!(uuid_for(&a), uuid_for(&a));
        assert_ne!(uuid_for(&a), uuid_for(&Coordinate::new("p", "workflow", "w2")));
        assert!(Uuid::parse_str(&uuid_for(&a)).is_ok());
    }

    #[test]
    fn external_id_format() {
        let id = settings_external_id(&Coordinate::new("p", "builtin:tags", "t"));
        assert!(id.starts_with("cac:"));
        assert_eq!(id.len(), 4 + 32);
    }

    #[test]
    fn bucket_name_is_sanitized() {
        let c = Coordinate::new("My Project", "bucket", "Logs.Errors");
        assert_eq!(bucket_name(&c), "my_project_logs_errors");

        let long = Coordinate::new("p", "bucket", "x".repeat(300));
        assert_eq!(bucket_name(&long).len(), MAX_BUCKET_NAME_LEN);
    }
}
