use serde_json::Value;

use crate::compute::ResourceKind;

#[derive(Clone, Copy, Debug)]
enum Zero {
    Bool,
    Number,
}

impl Zero {
    fn value(self) -> Value {
        match self {
            Zero::Bool => Value::Bool(false),
            Zero::Number => Value::from(0),
        }
    }
}

/// A field written whenever its parent object is present, even at its zero
/// value.
#[derive(Clone, Copy, Debug)]
struct ForceSend {
    kind: ResourceKind,
    parent: &'static [&'static str],
    field: &'static str,
    zero: Zero,
}

const FORCE_SEND: &[ForceSend] = &[
    ForceSend {
        kind: ResourceKind::BackendService,
        parent: &["cdnPolicy", "cacheKeyPolicy"],
        field: "includeHost",
        zero: Zero::Bool,
    },
    ForceSend {
        kind: ResourceKind::BackendService,
        parent: &["cdnPolicy", "cacheKeyPolicy"],
        field: "includeProtocol",
        zero: Zero::Bool,
    },
    ForceSend {
        kind: ResourceKind::BackendService,
        parent: &["cdnPolicy", "cacheKeyPolicy"],
        field: "includeQueryString",
        zero: Zero::Bool,
    },
    ForceSend {
        kind: ResourceKind::BackendService,
        parent: &["iap"],
        field: "enabled",
        zero: Zero::Bool,
    },
    ForceSend {
        kind: ResourceKind::BackendService,
        parent: &["connectionDraining"],
        field: "drainingTimeoutSec",
        zero: Zero::Number,
    },
    ForceSend {
        kind: ResourceKind::BackendService,
        parent: &["logConfig"],
        field: "enable",
        zero: Zero::Bool,
    },
];

pub(crate) fn apply_force_send(kind: ResourceKind, document: &mut Value) {
    for entry in FORCE_SEND.iter().filter(|entry| entry.kind == kind) {
        let parent = entry.parent.iter().try_fold(&mut *document, |node, segment| node.get_mut(*segment));
        if let Some(Value::Object(object)) = parent {
            object.entry(entry.field).or_insert_with(|| entry.zero.value());
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_fields_added_under_present_parents() {
        let mut document = json!({
            "name": "bs",
            "cdnPolicy": {"cacheKeyPolicy": {"includeHost": true}},
            "iap": {},
            "connectionDraining": {},
        });
        apply_force_send(ResourceKind::BackendService, &mut document);
        assert_eq!(
            document,
            json!({
                "name": "bs",
                "cdnPolicy": {"cacheKeyPolicy": {"includeHost": true, "includeProtocol": false, "includeQueryString": false}},
                "iap": {"enabled": false},
                "connectionDraining": {"drainingTimeoutSec": 0},
            })
        );
    }

    #[test]
    fn test_absent_parents_untouched() {
        let mut document = json!({"name": "bs", "cdnPolicy": {}});
        apply_force_send(ResourceKind::BackendService, &mut document);
        assert_eq!(document, json!({"name": "bs", "cdnPolicy": {}}));

        let mut document = json!({"name": "um", "iap": {}});
        apply_force_send(ResourceKind::UrlMap, &mut document);
        assert_eq!(document, json!({"name": "um", "iap": {}}));
    }
}
