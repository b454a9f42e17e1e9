//! # Federation Flows
//!
//! Three CSEs wired through the in-process bridge: an IN at the top, an MN
//! registered below it, an ASN below the MN. Covers registrar bootstrap
//! through real coordinators, descendant propagation up the tree, transit
//! routing down the tree, and subtree pruning on deregistration.

#[cfg(test)]
mod tests {
    use crate::support::{test_cse, BridgeTransport, TestCse};
    use cse_federation::{RegistrarConfig, RegistrationState};
    use cse_types::{
        attr, CseRequest, Operation, Resource, ResourceStore, ResourceType, ResponseStatusCode,
    };
    use serde_json::json;
    use std::sync::Arc;

    struct Tree {
        cse_in: TestCse,
        cse_mn: TestCse,
        cse_asn: TestCse,
    }

    /// IN ← MN ← ASN, fully registered through the bridge.
    async fn registered_tree() -> Tree {
        let bridge = Arc::new(BridgeTransport::new());
        let cse_in = test_cse("/id-in", "cse-in", "http://in:8080", &bridge, None);
        let cse_mn = test_cse(
            "/id-mn",
            "cse-mn",
            "http://mn:8080",
            &bridge,
            Some(RegistrarConfig {
                address: "http://in:8080".into(),
                cse_id: "/id-in".into(),
                cse_base_rn: "cse-in".into(),
            }),
        );
        let cse_asn = test_cse(
            "/id-asn",
            "cse-asn",
            "http://asn:8080",
            &bridge,
            Some(RegistrarConfig {
                address: "http://mn:8080".into(),
                cse_id: "/id-mn".into(),
                cse_base_rn: "cse-mn".into(),
            }),
        );

        // Bottom of the tree registers last: the MN must already be
        // registered for its descendant push to reach the IN.
        cse_mn.federation.run_monitor_once().await;
        cse_asn.federation.run_monitor_once().await;

        Tree {
            cse_in,
            cse_mn,
            cse_asn,
        }
    }

    #[tokio::test]
    async fn bootstrap_registers_every_level_of_the_tree() {
        let tree = registered_tree().await;

        assert_eq!(
            tree.cse_mn.federation.registration_state(),
            RegistrationState::Registered
        );
        assert_eq!(
            tree.cse_asn.federation.registration_state(),
            RegistrationState::Registered
        );

        // Each registrar holds a real CSR created through its coordinator.
        let mn_csr = tree.cse_in.store.retrieve("id-mn").await.unwrap();
        assert_eq!(mn_csr.ty, ResourceType::Csr);
        assert_eq!(mn_csr.attr_str(attr::CSI), Some("/id-mn"));
        let asn_csr = tree.cse_mn.store.retrieve("id-asn").await.unwrap();
        assert_eq!(asn_csr.attr_str(attr::CSI), Some("/id-asn"));

        // Each registree mirrors its registrar's base locally.
        assert!(tree.cse_mn.store.retrieve("id-in").await.is_ok());
        assert!(tree.cse_asn.store.retrieve("id-mn").await.is_ok());
    }

    #[tokio::test]
    async fn descendants_propagate_to_the_top_of_the_tree() {
        let tree = registered_tree().await;

        // The ASN registration at the MN was pushed upstream: the IN routes
        // the ASN through the MN link.
        let link = tree.cse_in.federation.get_link("/id-asn").unwrap();
        assert_eq!(link.cse_id, "/id-mn");
        assert_eq!(link.first_point_of_access(), Some("http://mn:8080"));
    }

    #[tokio::test]
    async fn requests_are_routed_down_the_tree_to_the_hosting_cse() {
        let tree = registered_tree().await;
        tree.cse_asn.store.seed(
            Resource::new(
                ResourceType::Other(3),
                "sensor",
                "sensor",
                Some("cse-asn".into()),
            )
            .with_attr("lbl", json!(["temperature"])),
        );

        // An AE talks to its local IN; the resource lives two hops down.
        let request = CseRequest::new(Operation::Retrieve, "/id-asn/cse-asn/sensor", "CmyAe");
        let envelope = tree.cse_in.coordinator.handle(&request).await;

        assert_eq!(envelope.rsc, ResponseStatusCode::Ok);
        let content = envelope.content.unwrap();
        assert_eq!(content["rn"], "sensor");
        assert_eq!(content["lbl"], json!(["temperature"]));
    }

    #[tokio::test]
    async fn remote_errors_pass_through_verbatim() {
        let tree = registered_tree().await;
        let request = CseRequest::new(Operation::Retrieve, "/id-asn/cse-asn/ghost", "CmyAe");
        let envelope = tree.cse_in.coordinator.handle(&request).await;
        assert_eq!(envelope.rsc, ResponseStatusCode::NotFound);
        assert_eq!(envelope.request_identifier, request.request_identifier);
    }

    #[tokio::test]
    async fn deregistration_prunes_the_whole_subtree() {
        let tree = registered_tree().await;
        assert!(tree.cse_in.federation.get_link("/id-asn").is_ok());

        // The MN deregisters: DELETE of its CSR on the IN.
        let recall = CseRequest::new(Operation::Delete, "/id-in/id-mn", "/id-mn");
        let envelope = tree.cse_in.coordinator.handle(&recall).await;
        assert_eq!(envelope.rsc, ResponseStatusCode::Deleted);

        assert!(tree.cse_in.federation.get_link("/id-mn").is_err());
        assert!(tree.cse_in.federation.get_link("/id-asn").is_err());

        let request = CseRequest::new(Operation::Retrieve, "/id-asn/cse-asn/sensor", "CmyAe");
        let envelope = tree.cse_in.coordinator.handle(&request).await;
        assert_eq!(envelope.rsc, ResponseStatusCode::NotFound);
    }

    #[tokio::test]
    async fn a_leaf_routes_unknown_targets_through_its_registrar() {
        let tree = registered_tree().await;
        tree.cse_in.store.seed(
            Resource::new(
                ResourceType::Other(3),
                "policies",
                "policies",
                Some("cse-in".into()),
            )
            .with_attr("lbl", json!(["shared"])),
        );

        // The ASN knows nothing about the IN's CSE-ID; its registrar link is
        // the default route up the tree.
        let request = CseRequest::new(Operation::Retrieve, "/id-in/cse-in/policies", "CmyAe");
        let envelope = tree.cse_asn.coordinator.handle(&request).await;

        assert_eq!(envelope.rsc, ResponseStatusCode::Ok);
        assert_eq!(envelope.content.unwrap()["rn"], "policies");
    }
}
