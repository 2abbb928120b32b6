//! End-to-end transfer and hangup flows through the HTTP surface

mod common;

use callbridge::domain::carrier::CallUpdate;
use callbridge::domain::session::{ActiveCallRegistry, CallDirection, CallSession};
use common::{form, get, json, FakeBackend, FakeCarrier, TestBridge, BASE_URL};
use serde_json::{json as json_value, Value};

fn transfer_body(forwarding: bool) -> Value {
    json_value!({
        "callId": "uv-1",
        "isCallForwarding": forwarding,
        "forwardingMobileNumber": "+15550300",
        "fromNumber": "+15550100",
        "toNumber": "+15550199",
        "firstname": "Ada",
        "lastname": "Lovelace",
        "transferReason": "billing dispute",
        "conversationSummary": "Caller disputes an invoice",
        "companyid": "ACME"
    })
}

#[tokio::test]
async fn test_inbound_call_transfer_and_teardown() {
    let bridge = TestBridge::new(FakeBackend::configured(), FakeCarrier::with_participants(1));

    // inbound call reaches the AI agent
    let (status, _) = bridge
        .send(form("/twilio/incoming", "CallSid=CA-MAIN&Called=%2B15550100"))
        .await;
    assert_eq!(status, 200);
    assert_eq!(bridge.active_calls().await, 1);

    // agent asks for a human
    let (status, body) = bridge
        .send(json("/twilio/transferCall", transfer_body(true)))
        .await;
    assert_eq!(status, 200);
    let outcome: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(outcome["status"], "success");

    {
        let updates = bridge.carrier.updates.lock().unwrap();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].0, "CA-MAIN");
        match &updates[0].1 {
            CallUpdate::Redirect { url } => {
                assert!(url.starts_with(&format!(
                    "{}/twilio/transfer-conference-entry-point?",
                    BASE_URL
                )));
                assert!(url.contains("conferenceName=conference_CA-MAIN"));
            }
            other => panic!("unexpected update {:?}", other),
        }

        let created = bridge.carrier.created.lock().unwrap();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].to, "+15550300");
        assert!(created[0].twiml.contains("Caller disputes an invoice"));
        assert!(created[0]
            .status_callback
            .ends_with("/twilio/transfer-status?mainCallSid=CA-MAIN"));
    }
    assert_eq!(bridge.backend.transfer_attempts.lock().unwrap().len(), 1);

    // agent hangs up, leaving the caller alone
    let (status, body) = bridge
        .send(form(
            "/twilio/conference-status?conferenceName=conference_CA-MAIN&mainCallSid=CA-MAIN&companyid=ACME",
            "StatusCallbackEvent=participant-leave&ConferenceSid=CF1&CallSid=CA-AGENT",
        ))
        .await;
    assert_eq!(status, 200);
    assert_eq!(body, "OK");
    assert_eq!(
        *bridge.carrier.completed_conferences.lock().unwrap(),
        vec!["CF1".to_string()]
    );

    // conference end is summarized
    let (status, _) = bridge
        .send(form(
            "/twilio/conference-status?conferenceName=conference_CA-MAIN&mainCallSid=CA-MAIN&companyid=ACME",
            "StatusCallbackEvent=conference-end&ConferenceSid=CF1",
        ))
        .await;
    assert_eq!(status, 200);
    assert_eq!(bridge.backend.conference_ends.lock().unwrap().len(), 1);

    // the original leg finishes
    let (status, _) = bridge
        .send(form(
            "/twilio/callStatus?callId=uv-1",
            "CallSid=CA-MAIN&CallStatus=completed",
        ))
        .await;
    assert_eq!(status, 200);

    let (_, body) = bridge.send(get("/twilio/health")).await;
    let health: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(health["activeCalls"], 0);
}

#[tokio::test]
async fn test_disabled_transfer_touches_nothing() {
    let bridge = TestBridge::new(FakeBackend::configured(), FakeCarrier::default());
    bridge
        .registry
        .put(CallSession::new("uv-1", "CA-MAIN", CallDirection::Inbound))
        .await;

    let (status, body) = bridge
        .send(json("/twilio/transferCall", transfer_body(false)))
        .await;

    assert_eq!(status, 200);
    let outcome: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(outcome["status"], "false");
    assert!(bridge.carrier.updates.lock().unwrap().is_empty());
    assert!(bridge.backend.transfer_attempts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_transfer_of_unknown_call_fails() {
    let bridge = TestBridge::new(FakeBackend::configured(), FakeCarrier::default());

    let (status, body) = bridge
        .send(json("/twilio/transferCall", transfer_body(true)))
        .await;

    assert_eq!(status, 500);
    let outcome: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(outcome["status"], "error");
    assert!(bridge.carrier.created.lock().unwrap().is_empty());
    assert_eq!(bridge.backend.audits.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_hangup_unknown_call() {
    let bridge = TestBridge::new(FakeBackend::configured(), FakeCarrier::default());

    let (status, body) = bridge
        .send(json(
            "/twilio/hangUpCall",
            json_value!({ "callId": "uv-404", "toNumber": "+15550100" }),
        ))
        .await;

    assert_eq!(status, 404);
    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["success"], false);
    assert_eq!(json["error"], "Call not found or invalid Twilio SID");
}

#[tokio::test]
async fn test_hangup_completes_carrier_leg() {
    let bridge = TestBridge::new(FakeBackend::configured(), FakeCarrier::default());
    bridge
        .registry
        .put(CallSession::new("uv-1", "CA-MAIN", CallDirection::Inbound))
        .await;

    let (status, body) = bridge
        .send(json(
            "/twilio/hangUpCall",
            json_value!({
                "callId": "uv-1",
                "companyid": "ACME",
                "toNumber": "+15550100",
                "fromNumber": "+15550199"
            }),
        ))
        .await;

    assert_eq!(status, 200);
    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["success"], true);
    assert_eq!(json["message"], "Call ended successfully");

    let updates = bridge.carrier.updates.lock().unwrap();
    assert_eq!(*updates, vec![("CA-MAIN".to_string(), CallUpdate::Complete)]);
    assert_eq!(bridge.backend.calls_ended.lock().unwrap().len(), 1);
    // removal waits for the carrier's terminal status callback
    assert_eq!(bridge.active_calls().await, 1);
}

#[tokio::test]
async fn test_loosely_typed_scores_do_not_block_transfer() {
    for score in [json_value!(3), json_value!(3.0), json_value!("3")] {
        let bridge = TestBridge::new(FakeBackend::configured(), FakeCarrier::default());
        bridge
            .registry
            .put(CallSession::new("uv-1", "CA-MAIN", CallDirection::Inbound))
            .await;

        let mut body = transfer_body(true);
        body["ResponseAccuracy"] = score.clone();
        body["OverallConversationQuality"] = json_value!("4");
        let (status, response) = bridge.send(json("/twilio/transferCall", body)).await;

        assert_eq!(status, 200, "score {} answered {}", score, response);
        assert_eq!(bridge.carrier.created.lock().unwrap().len(), 1);
        let attempts = bridge.backend.transfer_attempts.lock().unwrap();
        assert_eq!(attempts[0].assessment.response_accuracy, Some(3));
        assert_eq!(attempts[0].assessment.overall_conversation_quality, Some(4));
    }
}

#[tokio::test]
async fn test_loosely_typed_scores_do_not_block_hangup() {
    for score in [json_value!(3.0), json_value!("3")] {
        let bridge = TestBridge::new(FakeBackend::configured(), FakeCarrier::default());
        bridge
            .registry
            .put(CallSession::new("uv-1", "CA-MAIN", CallDirection::Inbound))
            .await;

        let (status, response) = bridge
            .send(json(
                "/twilio/hangUpCall",
                json_value!({
                    "callId": "uv-1",
                    "companyid": "ACME",
                    "toNumber": "+15550100",
                    "fromNumber": "+15550199",
                    "CustomerBehavior": score,
                    "ToneandEmpathy": "not sure"
                }),
            ))
            .await;

        assert_eq!(status, 200, "answered {}", response);
        let ended = bridge.backend.calls_ended.lock().unwrap();
        assert_eq!(ended.len(), 1);
        assert_eq!(ended[0].assessment.customer_behavior, Some(3));
        assert_eq!(ended[0].assessment.tone_and_empathy, None);
    }
}
