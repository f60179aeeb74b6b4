//! Build results and their wire encodings.
//!
//! A result is a single ref, or a name → ref map, plus metadata and
//! attestations. Four wire encodings exist for the ref part; which pair
//! is legal depends on the negotiated capability set, so conversion in
//! both directions lives here, in one place, instead of being repeated
//! at the solve-decode and return-encode sites.

use crate::caps::{frontend, CapSet};
use crate::client::GatewayClient;
use crate::error::Result;
use crate::reference::Reference;
use gangway_api::bridge;
use std::collections::HashMap;

/// A typed assertion about a ref (signature, SBOM, ...) accompanying a
/// result.
#[derive(Debug, Clone, Default)]
pub struct Attestation {
    pub kind: i32,
    pub metadata: HashMap<String, Vec<u8>>,
    pub r#ref: Option<Reference>,
    pub path: String,
    pub in_toto_predicate_type: String,
    pub in_toto_subjects: Vec<bridge::InTotoSubject>,
}

/// The outcome of a solve: refs plus metadata plus attestations.
///
/// A result is either in single-ref mode or in map mode; map mode is
/// entered by the first [`add_ref`](Self::add_ref) call (or by decoding
/// a map encoding) and is sticky, even when the map ends up with zero
/// or one entries. Map entries may be vacant.
#[derive(Debug, Clone, Default)]
pub struct BuildResult {
    single: Option<Reference>,
    refs: Option<HashMap<String, Option<Reference>>>,
    pub metadata: HashMap<String, Vec<u8>>,
    pub attestations: HashMap<String, Vec<Attestation>>,
}

impl BuildResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_ref(&mut self, r: Option<Reference>) {
        self.single = r;
    }

    /// Add a named ref, switching the result into map mode.
    pub fn add_ref(&mut self, name: impl Into<String>, r: Option<Reference>) {
        self.refs.get_or_insert_with(HashMap::new).insert(name.into(), r);
    }

    pub fn add_attestation(&mut self, name: impl Into<String>, a: Attestation) {
        self.attestations.entry(name.into()).or_default().push(a);
    }

    pub fn single_ref(&self) -> Option<&Reference> {
        self.single.as_ref()
    }

    pub fn refs(&self) -> Option<&HashMap<String, Option<Reference>>> {
        self.refs.as_ref()
    }

    pub(crate) fn ref_count(&self) -> usize {
        self.refs.as_ref().map_or(0, |m| m.len())
    }

    /// Every present reference: the single ref, map entries, and
    /// attestation refs.
    pub fn all_refs(&self) -> Vec<&Reference> {
        let mut out = Vec::new();
        if let Some(r) = &self.single {
            out.push(r);
        }
        if let Some(refs) = &self.refs {
            out.extend(refs.values().flatten());
        }
        for atts in self.attestations.values() {
            out.extend(atts.iter().filter_map(|a| a.r#ref.as_ref()));
        }
        out
    }
}

/// Convert a reference for the wire, verifying it belongs to `client`.
/// An absent reference encodes as an empty ref.
pub(crate) fn convert_ref(r: Option<&Reference>, client: &GatewayClient) -> Result<bridge::Ref> {
    match r {
        None => Ok(bridge::Ref::default()),
        Some(r) if !r.client.same_client(client) => Err(crate::GatewayError::InvalidReference),
        Some(r) => Ok(bridge::Ref { id: r.id.clone(), def: r.def.clone() }),
    }
}

fn attestation_to_wire(a: &Attestation, client: &GatewayClient) -> Result<bridge::Attestation> {
    Ok(bridge::Attestation {
        kind: a.kind,
        metadata: a.metadata.clone(),
        r#ref: Some(convert_ref(a.r#ref.as_ref(), client)?),
        path: a.path.clone(),
        in_toto_predicate_type: a.in_toto_predicate_type.clone(),
        in_toto_subjects: a.in_toto_subjects.clone(),
    })
}

fn attestation_from_wire(a: bridge::Attestation, client: &GatewayClient) -> Attestation {
    let r = a
        .r#ref
        .filter(|r| !r.id.is_empty())
        .map(|r| Reference::new(client, r.id, r.def));
    Attestation {
        kind: a.kind,
        metadata: a.metadata,
        r#ref: r,
        path: a.path,
        in_toto_predicate_type: a.in_toto_predicate_type,
        in_toto_subjects: a.in_toto_subjects,
    }
}

/// Encode a result for the wire, picking the typed or the deprecated
/// id-only ref encoding by the peer's capabilities.
pub(crate) fn result_to_wire(
    res: &BuildResult,
    caps: &CapSet,
    client: &GatewayClient,
) -> Result<bridge::Result> {
    let mut wire = bridge::Result { metadata: res.metadata.clone(), ..Default::default() };

    let typed = caps.supports(frontend::PROTO_REF_ARRAY).is_ok();
    if let Some(refs) = res.refs() {
        if typed {
            let mut m = HashMap::new();
            for (k, r) in refs {
                m.insert(k.clone(), convert_ref(r.as_ref(), client)?);
            }
            wire.result = Some(bridge::result::Result::Refs(bridge::RefMap { refs: m }));
        } else {
            let mut m = HashMap::new();
            for (k, r) in refs {
                m.insert(k.clone(), convert_ref(r.as_ref(), client)?.id);
            }
            wire.result =
                Some(bridge::result::Result::RefsDeprecated(bridge::RefMapDeprecated { refs: m }));
        }
    } else {
        let r = convert_ref(res.single_ref(), client)?;
        wire.result = Some(if typed {
            bridge::result::Result::Ref(r)
        } else {
            bridge::result::Result::RefDeprecated(r.id)
        });
    }

    if !res.attestations.is_empty() {
        let mut attestations = HashMap::new();
        for (k, atts) in &res.attestations {
            let mut list = bridge::Attestations::default();
            for a in atts {
                list.attestation.push(attestation_to_wire(a, client)?);
            }
            attestations.insert(k.clone(), list);
        }
        wire.attestations = attestations;
    }

    Ok(wire)
}

/// Decode a wire result in any of its encodings.
pub(crate) fn result_from_wire(wire: bridge::Result, client: &GatewayClient) -> Result<BuildResult> {
    let mut res = BuildResult::new();
    res.metadata = wire.metadata;

    match wire.result {
        None => {}
        Some(bridge::result::Result::RefDeprecated(id)) => {
            if !id.is_empty() {
                res.set_ref(Some(Reference::new(client, id, None)));
            }
        }
        Some(bridge::result::Result::RefsDeprecated(map)) => {
            for (k, id) in map.refs {
                let r = if id.is_empty() { None } else { Some(Reference::new(client, id, None)) };
                res.add_ref(k, r);
            }
        }
        Some(bridge::result::Result::Ref(r)) => {
            if !r.id.is_empty() {
                res.set_ref(Some(Reference::new(client, r.id, r.def)));
            }
        }
        Some(bridge::result::Result::Refs(map)) => {
            for (k, r) in map.refs {
                let r = if r.id.is_empty() {
                    None
                } else {
                    Some(Reference::new(client, r.id, r.def))
                };
                res.add_ref(k, r);
            }
        }
    }

    for (k, atts) in wire.attestations {
        for a in atts.attestation {
            res.add_attestation(k.clone(), attestation_from_wire(a, client));
        }
    }

    Ok(res)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::test_client;
    use gangway_api::bridge::ApiCap;
    use gangway_api::ops;

    fn typed_caps() -> CapSet {
        CapSet::from_list(&[ApiCap {
            id: frontend::PROTO_REF_ARRAY.to_string(),
            enabled: true,
        }])
    }

    fn def(blob: &[u8]) -> Option<ops::Definition> {
        Some(ops::Definition { def: vec![blob.to_vec()], ..Default::default() })
    }

    #[tokio::test]
    async fn test_single_ref_round_trip_typed() {
        let client = test_client(typed_caps(), CapSet::default());

        let mut wire = bridge::Result::default();
        wire.result =
            Some(bridge::result::Result::Ref(bridge::Ref { id: "x".to_string(), def: def(b"d1") }));
        wire.metadata.insert("m".to_string(), b"bytes".to_vec());

        let res = result_from_wire(wire, &client).unwrap();
        assert_eq!(res.single_ref().unwrap().id(), "x");
        assert!(res.refs().is_none());
        assert_eq!(res.metadata["m"], b"bytes");

        let back = result_to_wire(&res, client.caps(), &client).unwrap();
        match back.result {
            Some(bridge::result::Result::Ref(r)) => {
                assert_eq!(r.id, "x");
                assert_eq!(r.def, def(b"d1"));
            }
            other => panic!("expected typed ref encoding, got {other:?}"),
        }
        assert_eq!(back.metadata["m"], b"bytes");
    }

    #[tokio::test]
    async fn test_single_ref_round_trip_deprecated() {
        let client = test_client(CapSet::default(), CapSet::default());

        let mut wire = bridge::Result::default();
        wire.result = Some(bridge::result::Result::RefDeprecated("x".to_string()));

        let res = result_from_wire(wire, &client).unwrap();
        assert_eq!(res.single_ref().unwrap().id(), "x");

        let back = result_to_wire(&res, client.caps(), &client).unwrap();
        assert!(matches!(
            back.result,
            Some(bridge::result::Result::RefDeprecated(id)) if id == "x"
        ));
    }

    #[tokio::test]
    async fn test_ref_map_round_trip_typed() {
        let client = test_client(typed_caps(), CapSet::default());

        let mut refs = HashMap::new();
        refs.insert("a".to_string(), bridge::Ref { id: "x".to_string(), def: def(b"d1") });
        refs.insert("b".to_string(), bridge::Ref { id: "y".to_string(), def: def(b"d2") });
        let mut wire = bridge::Result::default();
        wire.result = Some(bridge::result::Result::Refs(bridge::RefMap { refs }));

        let res = result_from_wire(wire, &client).unwrap();
        let decoded = res.refs().unwrap();
        assert_eq!(decoded.len(), 2);
        assert_eq!(decoded["a"].as_ref().unwrap().id(), "x");
        assert_eq!(decoded["b"].as_ref().unwrap().id(), "y");

        let back = result_to_wire(&res, client.caps(), &client).unwrap();
        match back.result {
            Some(bridge::result::Result::Refs(m)) => {
                assert_eq!(m.refs["a"].id, "x");
                assert_eq!(m.refs["a"].def, def(b"d1"));
                assert_eq!(m.refs["b"].id, "y");
            }
            other => panic!("expected typed map encoding, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_ref_map_round_trip_deprecated_with_vacant_entry() {
        let client = test_client(CapSet::default(), CapSet::default());

        let mut refs = HashMap::new();
        refs.insert("a".to_string(), "x".to_string());
        refs.insert("b".to_string(), String::new());
        let mut wire = bridge::Result::default();
        wire.result =
            Some(bridge::result::Result::RefsDeprecated(bridge::RefMapDeprecated { refs }));

        let res = result_from_wire(wire, &client).unwrap();
        let decoded = res.refs().unwrap();
        assert_eq!(decoded["a"].as_ref().unwrap().id(), "x");
        assert!(decoded["b"].is_none());

        let back = result_to_wire(&res, client.caps(), &client).unwrap();
        match back.result {
            Some(bridge::result::Result::RefsDeprecated(m)) => {
                assert_eq!(m.refs["a"], "x");
                assert_eq!(m.refs["b"], "");
            }
            other => panic!("expected deprecated map encoding, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_empty_ref_id_decodes_vacant() {
        let client = test_client(typed_caps(), CapSet::default());

        let mut wire = bridge::Result::default();
        wire.result = Some(bridge::result::Result::Ref(bridge::Ref::default()));
        let res = result_from_wire(wire, &client).unwrap();
        assert!(res.single_ref().is_none());
    }

    #[tokio::test]
    async fn test_attestations_keep_arrival_order() {
        let client = test_client(typed_caps(), CapSet::default());

        let att = |path: &str, ref_id: &str| bridge::Attestation {
            kind: bridge::attestation_kind::IN_TOTO,
            path: path.to_string(),
            r#ref: Some(bridge::Ref { id: ref_id.to_string(), def: None }),
            ..Default::default()
        };
        let mut wire = bridge::Result::default();
        wire.result = Some(bridge::result::Result::Ref(bridge::Ref {
            id: "x".to_string(),
            def: None,
        }));
        wire.attestations.insert(
            "linux/amd64".to_string(),
            bridge::Attestations {
                attestation: vec![att("first", "r1"), att("second", ""), att("third", "r2")],
            },
        );

        let res = result_from_wire(wire, &client).unwrap();
        let atts = &res.attestations["linux/amd64"];
        assert_eq!(
            atts.iter().map(|a| a.path.as_str()).collect::<Vec<_>>(),
            vec!["first", "second", "third"]
        );
        assert_eq!(atts[0].r#ref.as_ref().unwrap().id(), "r1");
        assert!(atts[1].r#ref.is_none());

        let back = result_to_wire(&res, client.caps(), &client).unwrap();
        let wire_atts = &back.attestations["linux/amd64"].attestation;
        assert_eq!(
            wire_atts.iter().map(|a| a.path.as_str()).collect::<Vec<_>>(),
            vec!["first", "second", "third"]
        );
        // a vacant attestation ref encodes as an empty ref
        assert_eq!(wire_atts[1].r#ref.as_ref().unwrap().id, "");
        assert_eq!(wire_atts[2].r#ref.as_ref().unwrap().id, "r2");
    }

    #[tokio::test]
    async fn test_encode_rejects_foreign_reference() {
        let a = test_client(typed_caps(), CapSet::default());
        let b = test_client(typed_caps(), CapSet::default());

        let mut res = BuildResult::new();
        res.set_ref(Some(Reference::new(&b, "x".to_string(), None)));

        assert!(matches!(
            result_to_wire(&res, a.caps(), &a).unwrap_err(),
            crate::GatewayError::InvalidReference
        ));
    }

    #[tokio::test]
    async fn test_all_refs_visits_everything() {
        let client = test_client(typed_caps(), CapSet::default());

        let mut res = BuildResult::new();
        res.add_ref("a", Some(Reference::new(&client, "x".to_string(), None)));
        res.add_ref("b", None);
        res.add_attestation(
            "a",
            Attestation {
                r#ref: Some(Reference::new(&client, "att".to_string(), None)),
                ..Default::default()
            },
        );

        let ids: Vec<&str> = res.all_refs().iter().map(|r| r.id()).collect();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&"x"));
        assert!(ids.contains(&"att"));
    }
}
