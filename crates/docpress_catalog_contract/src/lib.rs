use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::sync::OnceLock;

pub const CONTRACT_ID: &str = "docpress.catalog_contract";
pub const CONTRACT_VERSION: &str = "1";

const CATALOG_REGISTRY_ID: &str = "docpress.catalog_registry.v1";

/// One entry in the document catalog. The exporter and the storage side
/// both hold this table; `catalog_fingerprint` lets them verify agreement
/// before attaching generated files to business records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocTypeDef {
    pub code: &'static str,
    pub title: &'static str,
    pub storage_folder: &'static str,
    pub filename_code: &'static str,
}

pub const DOC_TYPES_V1: [DocTypeDef; 4] = [
    DocTypeDef {
        code: "purchase_order",
        title: "발주서",
        storage_folder: "purchase-orders",
        filename_code: "발주서",
    },
    DocTypeDef {
        code: "contract_self_pay",
        title: "IoT 장비 설치 계약서 (자비)",
        storage_folder: "contracts",
        filename_code: "계약서",
    },
    DocTypeDef {
        code: "contract_subsidy",
        title: "IoT 장비 설치 계약서 (보조금)",
        storage_folder: "contracts",
        filename_code: "계약서",
    },
    DocTypeDef {
        code: "air_permit",
        title: "대기배출시설 허가증",
        storage_folder: "permits",
        filename_code: "대기필증",
    },
];

pub fn doc_type(code: &str) -> Option<&'static DocTypeDef> {
    DOC_TYPES_V1.iter().find(|def| def.code == code)
}

fn catalog_value() -> Value {
    let mut root = Map::new();
    root.insert("id".to_string(), Value::from(CATALOG_REGISTRY_ID));
    root.insert("contract".to_string(), Value::from(CONTRACT_ID));
    root.insert("version".to_string(), Value::from(CONTRACT_VERSION));
    let types: Vec<Value> = DOC_TYPES_V1
        .iter()
        .map(|def| {
            let mut entry = Map::new();
            entry.insert("code".to_string(), Value::from(def.code));
            entry.insert("title".to_string(), Value::from(def.title));
            entry.insert(
                "storage_folder".to_string(),
                Value::from(def.storage_folder),
            );
            entry.insert(
                "filename_code".to_string(),
                Value::from(def.filename_code),
            );
            Value::Object(entry)
        })
        .collect();
    root.insert("types".to_string(), Value::Array(types));
    Value::Object(root)
}

pub fn catalog_json() -> String {
    // serde_json object maps preserve insertion order only with the
    // preserve_order feature; Map is a BTreeMap by default, which is
    // already deterministic. Either way the output is stable per build.
    catalog_value().to_string()
}

pub fn catalog_fingerprint() -> &'static str {
    static FINGERPRINT: OnceLock<String> = OnceLock::new();
    FINGERPRINT.get_or_init(|| {
        let mut hasher = Sha256::new();
        hasher.update(catalog_json().as_bytes());
        let digest = hasher.finalize();
        let mut out = String::with_capacity(64);
        for byte in digest {
            out.push_str(&format!("{byte:02x}"));
        }
        out
    })
}
