//! # Request Flows
//!
//! Single-CSE lifecycles through a fully wired coordinator: blocking AE
//! registration, non-blocking execution against the `<request>` resource,
//! recall rules, and asynchronous result notification.

#[cfg(test)]
mod tests {
    use crate::support::{await_request_completion, test_cse, BridgeTransport, TestCse};
    use cse_types::{
        attr, CseRequest, Operation, RequestStatus, Resource, ResourceStore, ResourceType,
        ResponseStatusCode, ResponseType,
    };
    use serde_json::json;
    use std::sync::Arc;

    fn single_cse() -> TestCse {
        let bridge = Arc::new(BridgeTransport::new());
        test_cse("/id-in", "cse-in", "http://in:8080", &bridge, None)
    }

    fn create_ae(rn: &str, originator: &str) -> CseRequest {
        CseRequest::new(Operation::Create, "/id-in", originator)
            .with_content(ResourceType::Ae, json!({ "rn": rn, "api": "Napp.example" }))
    }

    #[tokio::test]
    async fn ae_registration_mints_an_originator() {
        let cse = single_cse();

        let envelope = cse.coordinator.handle(&create_ae("myAe", "C")).await;

        assert_eq!(envelope.rsc, ResponseStatusCode::Created);
        let aei = envelope.content.unwrap()["aei"].as_str().unwrap().to_string();
        assert!(aei.starts_with('C') && aei.len() > 1);

        let stored = cse.store.retrieve("myAe").await.unwrap();
        assert_eq!(stored.ty, ResourceType::Ae);
        assert_eq!(stored.attr_str(attr::AEI), Some(aei.as_str()));
    }

    #[tokio::test]
    async fn duplicate_ae_originator_is_rejected() {
        let cse = single_cse();
        let first = cse.coordinator.handle(&create_ae("aeOne", "CmyAe")).await;
        assert_eq!(first.rsc, ResponseStatusCode::Created);

        let second = cse.coordinator.handle(&create_ae("aeTwo", "CmyAe")).await;

        assert_eq!(
            second.rsc,
            ResponseStatusCode::OriginatorHasAlreadyRegistered
        );
        assert!(cse.store.retrieve("aeTwo").await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn non_blocking_sync_executes_through_the_request_resource() {
        let cse = single_cse();
        let request = create_ae("myAe", "C").with_response_type(ResponseType::NonBlockingSync);

        let envelope = cse.coordinator.handle(&request).await;

        assert_eq!(envelope.rsc, ResponseStatusCode::AcceptedNonBlockingSync);
        let request_ri = envelope.content.unwrap()["m2m:uri"]
            .as_str()
            .unwrap()
            .to_string();
        assert_eq!(request_ri, format!("req-{}", request.request_identifier));

        let record = await_request_completion(cse.store.as_ref(), &request_ri).await;
        assert_eq!(record.request_status(), Some(RequestStatus::Completed));
        let ors = record.attr(attr::ORS).unwrap();
        assert_eq!(ors["rsc"], ResponseStatusCode::Created.code());
        assert_eq!(ors["rqi"], request.request_identifier.as_str());

        // The actual AE landed in the tree, and nothing was notified.
        assert!(cse.store.retrieve("myAe").await.is_ok());
        assert!(cse.notifier.deliveries().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn a_failed_deferred_operation_is_recorded_in_the_request() {
        let cse = single_cse();
        let request = CseRequest::new(Operation::Retrieve, "/id-in/cse-in/ghost", "CmyAe")
            .with_response_type(ResponseType::NonBlockingSync);

        let envelope = cse.coordinator.handle(&request).await;
        assert_eq!(envelope.rsc, ResponseStatusCode::AcceptedNonBlockingSync);

        let record = await_request_completion(
            cse.store.as_ref(),
            &format!("req-{}", request.request_identifier),
        )
        .await;
        assert_eq!(record.request_status(), Some(RequestStatus::Failed));
        assert_eq!(
            record.attr(attr::ORS).unwrap()["rsc"],
            ResponseStatusCode::NotFound.code()
        );
    }

    #[tokio::test]
    async fn a_pending_request_cannot_be_recalled() {
        let cse = single_cse();
        let mut record = Resource::new(ResourceType::Req, "req-x", "req-x", Some("cse-in".into()))
            .with_attr(attr::CR, "CmyAe");
        record.set_request_status(RequestStatus::Pending);
        cse.store.seed(record);

        let recall = CseRequest::new(Operation::Delete, "/id-in/req-x", "CmyAe");
        let refused = cse.coordinator.handle(&recall).await;
        assert_eq!(refused.rsc, ResponseStatusCode::OperationNotAllowed);
        assert!(cse.store.retrieve("req-x").await.is_ok());

        // Once the request terminates, the creator may recall it.
        let mut record = cse.store.retrieve("req-x").await.unwrap();
        record.set_request_status(RequestStatus::Completed);
        cse.store.update(record).await.unwrap();

        let deleted = cse.coordinator.handle(&recall).await;
        assert_eq!(deleted.rsc, ResponseStatusCode::Deleted);
        assert!(cse.store.retrieve("req-x").await.is_err());
    }

    #[tokio::test]
    async fn only_the_creator_may_recall_a_request() {
        let cse = single_cse();
        let mut record = Resource::new(ResourceType::Req, "req-x", "req-x", Some("cse-in".into()))
            .with_attr(attr::CR, "CmyAe");
        record.set_request_status(RequestStatus::Completed);
        cse.store.seed(record);

        let recall = CseRequest::new(Operation::Delete, "/id-in/req-x", "Cintruder");
        let refused = cse.coordinator.handle(&recall).await;

        assert_eq!(refused.rsc, ResponseStatusCode::OperationNotAllowed);
        assert!(cse.store.retrieve("req-x").await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn async_results_are_pushed_to_the_response_targets() {
        let cse = single_cse();
        let request = create_ae("myAe", "C")
            .with_response_type(ResponseType::NonBlockingAsync)
            .with_response_targets(vec!["http://app:9000/cb".into()]);

        let envelope = cse.coordinator.handle(&request).await;
        assert_eq!(envelope.rsc, ResponseStatusCode::AcceptedNonBlockingAsync);

        await_request_completion(
            cse.store.as_ref(),
            &format!("req-{}", request.request_identifier),
        )
        .await;

        let deliveries = cse.notifier.deliveries();
        assert_eq!(deliveries.len(), 1);
        let (targets, payload) = &deliveries[0];
        assert_eq!(targets, &["http://app:9000/cb".to_string()]);
        assert_eq!(payload["m2m:rsp"]["rqi"], request.request_identifier.as_str());
        assert_eq!(
            payload["m2m:rsp"]["rsc"],
            ResponseStatusCode::Created.code()
        );
    }
}
