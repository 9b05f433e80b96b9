//! Index mappings, asserted at init time.

use serde_json::{Value, json};

use mgr_domain::constants::search::{KNN_EF_CONSTRUCTION, KNN_M};
use mgr_domain::constants::storage::{
    INDEX_AGENTS, INDEX_EMBEDDINGS, INDEX_FEDERATION_CONFIG, INDEX_SCOPES, INDEX_SECURITY_SCANS,
    INDEX_SERVERS,
};

/// Mapping body for an index base; embeddings need the vector dimension.
#[must_use]
pub fn mapping_for(base: &str, dimensions: usize) -> Value {
    match base {
        INDEX_SERVERS => servers_mapping(),
        INDEX_AGENTS => agents_mapping(),
        INDEX_SCOPES => scopes_mapping(),
        INDEX_EMBEDDINGS => embeddings_mapping(dimensions),
        INDEX_SECURITY_SCANS => scans_mapping(),
        INDEX_FEDERATION_CONFIG => federation_mapping(),
        _ => json!({"mappings": {"dynamic": true}}),
    }
}

fn servers_mapping() -> Value {
    json!({
        "mappings": {
            "properties": {
                "path": {"type": "keyword"},
                "server_name": {"type": "text", "fields": {"raw": {"type": "keyword"}}},
                "description": {"type": "text"},
                "proxy_pass_url": {"type": "keyword"},
                "supported_transports": {"type": "keyword"},
                "auth_type": {"type": "keyword"},
                "tags": {"type": "keyword"},
                "tool_list": {
                    "type": "nested",
                    "properties": {
                        "name": {"type": "text", "fields": {"raw": {"type": "keyword"}}},
                        "description": {"type": "text"},
                        "input_schema": {"type": "object", "enabled": false}
                    }
                },
                "is_enabled": {"type": "boolean"},
                "visibility": {"type": "keyword"},
                "versions": {
                    "type": "nested",
                    "properties": {
                        "version": {"type": "keyword"},
                        "proxy_pass_url": {"type": "keyword"},
                        "status": {"type": "keyword"},
                        "is_default": {"type": "boolean"},
                        "released": {"type": "date"},
                        "sunset_date": {"type": "date"}
                    }
                },
                "backend_paths": {"type": "keyword"},
                "origin_peer": {"type": "keyword"},
                "origin_type": {"type": "keyword"},
                "generation": {"type": "long"},
                "created_at": {"type": "date"},
                "updated_at": {"type": "date"}
            }
        }
    })
}

fn agents_mapping() -> Value {
    json!({
        "mappings": {
            "properties": {
                "path": {"type": "keyword"},
                "name": {"type": "text", "fields": {"raw": {"type": "keyword"}}},
                "description": {"type": "text"},
                "proxy_pass_url": {"type": "keyword"},
                "protocol_version": {"type": "keyword"},
                "capabilities": {"type": "keyword"},
                "skills": {
                    "type": "nested",
                    "properties": {
                        "id": {"type": "keyword"},
                        "name": {"type": "text"},
                        "description": {"type": "text"},
                        "tags": {"type": "keyword"}
                    }
                },
                "trust_level": {"type": "keyword"},
                "visibility": {"type": "keyword"},
                "tags": {"type": "keyword"},
                "is_enabled": {"type": "boolean"},
                "origin_peer": {"type": "keyword"},
                "origin_type": {"type": "keyword"},
                "generation": {"type": "long"},
                "created_at": {"type": "date"},
                "updated_at": {"type": "date"}
            }
        }
    })
}

fn scopes_mapping() -> Value {
    json!({
        "mappings": {
            "properties": {
                "scope_type": {"type": "keyword"},
                "scope_name": {"type": "keyword"},
                "group_name": {"type": "keyword"},
                "group_mappings": {"type": "keyword"},
                "server_access": {
                    "type": "nested",
                    "properties": {
                        "server": {"type": "keyword"},
                        "methods": {"type": "keyword"},
                        "tools": {"type": "keyword"}
                    }
                },
                "ui_permissions": {"type": "object", "enabled": false}
            }
        }
    })
}

fn embeddings_mapping(dimensions: usize) -> Value {
    json!({
        "settings": {
            "index": {"knn": true}
        },
        "mappings": {
            "properties": {
                "entity_type": {"type": "keyword"},
                "path": {"type": "keyword"},
                "name": {"type": "text", "fields": {"raw": {"type": "keyword"}}},
                "description": {"type": "text"},
                "tags": {"type": "keyword"},
                "is_enabled": {"type": "boolean"},
                "text_for_embedding": {"type": "text"},
                "embedding": {
                    "type": "knn_vector",
                    "dimension": dimensions,
                    "method": {
                        "name": "hnsw",
                        "space_type": "cosinesimil",
                        "engine": "lucene",
                        "parameters": {
                            "ef_construction": KNN_EF_CONSTRUCTION,
                            "m": KNN_M
                        }
                    }
                },
                "tools": {
                    "type": "nested",
                    "properties": {
                        "name": {"type": "text"},
                        "description": {"type": "text"}
                    }
                },
                "skills": {
                    "type": "nested",
                    "properties": {
                        "name": {"type": "text"},
                        "description": {"type": "text"}
                    }
                },
                "metadata": {"type": "object", "enabled": false},
                "indexed_at": {"type": "date"}
            }
        }
    })
}

fn scans_mapping() -> Value {
    json!({
        "mappings": {
            "properties": {
                "server_path": {"type": "keyword"},
                "scan_timestamp": {"type": "date"},
                "scan_status": {"type": "keyword"},
                "vulnerabilities": {
                    "type": "nested",
                    "properties": {
                        "severity": {"type": "keyword"},
                        "title": {"type": "text"},
                        "description": {"type": "text"},
                        "cve_id": {"type": "keyword"},
                        "package_name": {"type": "keyword"},
                        "package_version": {"type": "keyword"},
                        "fixed_version": {"type": "keyword"}
                    }
                },
                "risk_score": {"type": "double"},
                "critical_count": {"type": "integer"},
                "high_count": {"type": "integer"},
                "medium_count": {"type": "integer"},
                "low_count": {"type": "integer"},
                "total_vulnerabilities": {"type": "integer"},
                "scan_metadata": {"type": "object", "enabled": false}
            }
        }
    })
}

fn federation_mapping() -> Value {
    json!({
        "mappings": {
            "properties": {
                "doc_kind": {"type": "keyword"},
                "peer_id": {"type": "keyword"},
                "config_id": {"type": "keyword"},
                "enabled": {"type": "boolean"},
                "sync_mode": {"type": "keyword"},
                "is_healthy": {"type": "boolean"},
                "current_generation": {"type": "long"},
                "document": {"type": "object", "enabled": false}
            }
        }
    })
}
