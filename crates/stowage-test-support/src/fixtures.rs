//! Sample settings trees shared by unit and integration tests.

use serde_json::{Map, Value, json};

/// Storage types that must share the consolidated credential.
pub const WORKHORSE_TYPES: [&str; 7] = [
    "artifacts",
    "external_diffs",
    "lfs",
    "uploads",
    "packages",
    "dependency_proxy",
    "terraform_state",
];

/// Storage types allowed to stay on their own storage.
pub const ALLOWED_INCOMPLETE_TYPES: [&str; 2] = ["pages", "ci_secure_files"];

/// Provider connection used by the consolidated fixtures.
#[must_use]
pub fn minio_connection() -> Value {
    json!({
        "provider": "AWS",
        "aws_access_key_id": "minio",
        "aws_secret_access_key": "gdk-minio",
        "region": "gdk",
        "endpoint": "http://127.0.0.1:9000",
        "path_style": true
    })
}

/// One bucket override per Workhorse-accelerated type, named after the type.
#[must_use]
pub fn bucket_per_type() -> Value {
    let objects: Map<String, Value> = WORKHORSE_TYPES
        .iter()
        .map(|store| ((*store).to_string(), json!({ "bucket": *store })))
        .collect();
    Value::Object(objects)
}

/// Settings tree with an enabled consolidated block, the given `objects`
/// overrides, and an empty section for every Workhorse-accelerated type.
#[must_use]
pub fn consolidated_settings(objects: Value) -> Value {
    let mut root = Map::new();
    root.insert(
        "object_store".to_string(),
        json!({
            "enabled": true,
            "proxy_download": true,
            "connection": minio_connection(),
            "storage_options": { "server_side_encryption": "AES256" },
            "objects": objects
        }),
    );
    for store in WORKHORSE_TYPES {
        root.insert(store.to_string(), json!({}));
    }
    Value::Object(root)
}

/// Settings tree using only legacy per-type blocks.
#[must_use]
pub fn legacy_settings() -> Value {
    json!({
        "artifacts": {
            "enabled": true,
            "path": "/var/opt/artifacts",
            "object_store": {
                "enabled": true,
                "remote_directory": "artifacts/ci",
                "direct_upload": false,
                "connection": minio_connection()
            }
        },
        "lfs": {
            "enabled": true,
            "object_store": {
                "enabled": false,
                "remote_directory": "lfs-objects",
                "proxy_download": true
            }
        },
        "uploads": {
            "object_store": {
                "enabled": true,
                "remote_directory": "uploads",
                "bucket_prefix": "tenant",
                "storage_options": { "server_side_encryption": "aws:kms" },
                "connection": minio_connection()
            }
        },
        "pages": {
            "enabled": true,
            "path": "/var/opt/pages"
        }
    })
}

/// Replace or insert a top-level section in a settings tree.
#[must_use]
pub fn with_section(mut tree: Value, name: &str, section: Value) -> Value {
    if let Some(root) = tree.as_object_mut() {
        root.insert(name.to_string(), section);
    }
    tree
}

/// Remove a top-level section from a settings tree.
#[must_use]
pub fn without_section(mut tree: Value, name: &str) -> Value {
    if let Some(root) = tree.as_object_mut() {
        root.remove(name);
    }
    tree
}
